/// API path prefix
pub const API_PREFIX: &str = "/api/v1";

/// Header carrying the per-server secret issued at registration
pub const KEY_HEADER: &str = "x-chiv2-server-browser-key";

/// Header carrying the admin secret for ban/verified list management
pub const ADMIN_KEY_HEADER: &str = "x-chiv2-server-browser-admin-key";

/// Header set by reverse proxies with the originating client address
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
