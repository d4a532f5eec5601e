use std::net::IpAddr;
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use uuid::Uuid;

/// Ports a game server exposes to players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ports {
    pub game: u16,
    pub ping: u16,
    /// Steam A2S query port
    pub a2s: u16,
}

/// A mod a server is running, as advertised at registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModRef {
    pub name: String,
    pub organization: String,
    pub version: String,
}

/// A registered game server.
/// This is the canonical data model used by the daemon, API, and clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerRecord {
    /// Assigned by the registry, never by the client
    #[serde(rename = "unique_id")]
    pub id: Uuid,

    /// Address the registration request came from
    #[serde(rename = "ip_address")]
    pub source_address: IpAddr,

    /// LAN address, offered to clients joining from the same public address
    #[serde(rename = "local_ip_address")]
    pub local_address: Option<IpAddr>,

    pub ports: Ports,

    pub password_protected: bool,

    /// Liveness clock, refreshed by heartbeats
    #[serde(with = "epoch_seconds")]
    pub last_heartbeat: DateTime<Utc>,

    pub name: String,

    pub description: String,

    pub current_map: String,

    pub player_count: u32,

    pub max_players: u32,

    /// Whether the registering address is on the verified (allow) list
    pub verified: bool,

    pub mods: Vec<ModRef>,
}

impl ServerRecord {
    /// Copy of this record with the liveness clock set to `at`.
    pub fn with_heartbeat(self, at: DateTime<Utc>) -> Self {
        Self { last_heartbeat: at, ..self }
    }

    /// Copy of this record with the mutable game state replaced.
    /// The liveness clock is left untouched.
    pub fn with_update(self, update: &ServerUpdate) -> Self {
        Self {
            current_map: update.current_map.clone(),
            player_count: update.player_count,
            max_players: update.max_players,
            ..self
        }
    }
}

/// Body of a registration request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub name: String,
    pub description: String,
    pub current_map: String,
    pub player_count: u32,
    pub max_players: u32,
    pub ports: Ports,
    #[serde(default)]
    pub mods: Vec<ModRef>,
    #[serde(default)]
    pub local_ip_address: Option<IpAddr>,
    #[serde(default)]
    pub password_protected: bool,
}

/// Body of an update request. Replaces the mutable game state of a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerUpdate {
    pub current_map: String,
    pub player_count: u32,
    pub max_players: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationResponse {
    /// Deadline for the next heartbeat
    #[serde(with = "epoch_seconds")]
    pub refresh_before: DateTime<Utc>,
    pub key: String,
    pub server: ServerRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateResponse {
    #[serde(with = "epoch_seconds")]
    pub refresh_before: DateTime<Utc>,
    pub server: ServerRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerListResponse {
    pub servers: Vec<ServerRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BanStatusResponse {
    pub banned: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BanListResponse {
    pub banned_ips: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedListResponse {
    pub verified_ips: Vec<String>,
}

/// Body of a ban/verified list mutation. Each endpoint reads its own field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IpListRequest {
    #[serde(default)]
    pub banned_ips: Option<Vec<String>>,
    #[serde(default)]
    pub verified_ips: Option<Vec<String>>,
}

/// Timestamps travel as float seconds since the Unix epoch.
pub mod epoch_seconds {
    use chrono::{DateTime, Utc};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(at.timestamp_micros() as f64 / 1_000_000.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        let micros = (secs * 1_000_000.0).round() as i64;
        DateTime::<Utc>::from_timestamp_micros(micros)
            .ok_or_else(|| D::Error::custom(format!("timestamp out of range: {}", secs)))
    }
}
