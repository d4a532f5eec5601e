use std::sync::Arc;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use shared::protocol::{ADMIN_KEY_HEADER, API_PREFIX, KEY_HEADER};
use shared::types::{
    BanListResponse, BanStatusResponse, IpListRequest, Registration, RegistrationResponse,
    ServerListResponse, ServerRecord, ServerUpdate, StatusResponse, UpdateResponse,
    VerifiedListResponse,
};
use crate::acl::{self, NetworkRangeStore};
use crate::api::client_ip::{ban_gate, ClientIp};
use crate::api::error::ApiError;
use crate::error::{StoreError, StoreResult};
use crate::registry::{ServerDraft, ServerRegistry};

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ServerRegistry>,
    pub ban_list: Arc<NetworkRangeStore>,
    /// Servers registering from these addresses are marked verified
    pub allow_list: Arc<NetworkRangeStore>,
    pub trust_forwarded_for: bool,
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/servers", get(list_servers).post(register_server))
        .route("/servers/:id", put(update_server).delete(delete_server))
        .route("/servers/:id/heartbeat", post(heartbeat))
        .route("/check-banned/:ip", get(check_banned))
        .route(
            "/admin/ban-list",
            get(get_ban_list).put(add_to_ban_list).delete(remove_from_ban_list),
        )
        .route(
            "/admin/verified-list",
            get(get_verified_list).put(add_to_verified_list).delete(remove_from_verified_list),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), ban_gate))
        .with_state(state);

    Router::new().nest(API_PREFIX, api)
}

async fn list_servers(State(state): State<AppState>) -> Json<ServerListResponse> {
    Json(ServerListResponse {
        servers: state.registry.get_all(),
    })
}

async fn register_server(
    State(state): State<AppState>,
    Extension(ClientIp(ip)): Extension<ClientIp>,
    body: Result<Json<Registration>, JsonRejection>,
) -> Result<(StatusCode, Json<RegistrationResponse>), ApiError> {
    let Json(registration) = body?;

    let draft = ServerDraft {
        source_address: ip,
        verified: state.allow_list.contains_addr(ip),
        registration,
    };
    let (id, secret, server) = state.registry.register(draft);

    tracing::info!(
        "Registered server \"{}\" ({}) at {}:{}{}",
        server.name,
        id,
        server.source_address,
        server.ports.game,
        if server.verified { " [verified]" } else { "" }
    );

    Ok((
        StatusCode::CREATED,
        Json(RegistrationResponse {
            refresh_before: state.registry.refresh_before(&server),
            key: secret.expose().to_string(),
            server,
        }),
    ))
}

async fn heartbeat(
    State(state): State<AppState>,
    Path(server_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<UpdateResponse>, ApiError> {
    let key = header_secret(&headers, KEY_HEADER)?;
    let result = parse_server_id(&server_id)
        .and_then(|id| state.registry.heartbeat(id, key));

    updated_response(&state, &server_id, result)
}

async fn update_server(
    State(state): State<AppState>,
    Path(server_id): Path<String>,
    headers: HeaderMap,
    body: Result<Json<ServerUpdate>, JsonRejection>,
) -> Result<Json<UpdateResponse>, ApiError> {
    let key = header_secret(&headers, KEY_HEADER)?;
    let Json(update) = body?;
    let result = parse_server_id(&server_id)
        .and_then(|id| state.registry.apply_update(id, key, &update));

    updated_response(&state, &server_id, result)
}

async fn delete_server(
    State(state): State<AppState>,
    Path(server_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<StatusResponse>, ApiError> {
    let key = header_secret(&headers, KEY_HEADER)?;
    let server = parse_server_id(&server_id)
        .and_then(|id| state.registry.delete(id, key))
        .map_err(|e| {
            tracing::warn!("Deletion of server {} failed: {}", server_id, e);
            e
        })?;

    tracing::info!(
        "Deleted server \"{}\" ({}) at {}:{}",
        server.name,
        server.id,
        server.source_address,
        server.ports.game
    );

    Ok(Json(StatusResponse {
        status: "deleted".to_string(),
        message: "The server has been deleted".to_string(),
    }))
}

async fn check_banned(
    State(state): State<AppState>,
    Path(ip): Path<String>,
) -> Json<BanStatusResponse> {
    Json(BanStatusResponse {
        banned: state.ban_list.contains(&ip),
    })
}

async fn get_ban_list(
    State(state): State<AppState>,
    Extension(client): Extension<ClientIp>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    list_entries(IpList::Ban, &state, client, &headers)
}

async fn add_to_ban_list(
    State(state): State<AppState>,
    Extension(client): Extension<ClientIp>,
    headers: HeaderMap,
    body: Result<Json<IpListRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    modify_entries(IpList::Ban, Change::Add, &state, client, &headers, body)
}

async fn remove_from_ban_list(
    State(state): State<AppState>,
    Extension(client): Extension<ClientIp>,
    headers: HeaderMap,
    body: Result<Json<IpListRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    modify_entries(IpList::Ban, Change::Remove, &state, client, &headers, body)
}

async fn get_verified_list(
    State(state): State<AppState>,
    Extension(client): Extension<ClientIp>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    list_entries(IpList::Verified, &state, client, &headers)
}

async fn add_to_verified_list(
    State(state): State<AppState>,
    Extension(client): Extension<ClientIp>,
    headers: HeaderMap,
    body: Result<Json<IpListRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    modify_entries(IpList::Verified, Change::Add, &state, client, &headers, body)
}

async fn remove_from_verified_list(
    State(state): State<AppState>,
    Extension(client): Extension<ClientIp>,
    headers: HeaderMap,
    body: Result<Json<IpListRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    modify_entries(IpList::Verified, Change::Remove, &state, client, &headers, body)
}

/// Which admin-managed list an endpoint operates on.
#[derive(Debug, Clone, Copy)]
enum IpList {
    Ban,
    Verified,
}

#[derive(Debug, Clone, Copy)]
enum Change {
    Add,
    Remove,
}

impl IpList {
    fn store(self, state: &AppState) -> &NetworkRangeStore {
        match self {
            IpList::Ban => state.ban_list.as_ref(),
            IpList::Verified => state.allow_list.as_ref(),
        }
    }

    fn field(self) -> &'static str {
        match self {
            IpList::Ban => "banned_ips",
            IpList::Verified => "verified_ips",
        }
    }

    fn requested(self, request: IpListRequest) -> Option<Vec<String>> {
        match self {
            IpList::Ban => request.banned_ips,
            IpList::Verified => request.verified_ips,
        }
    }

    fn respond(self, entries: Vec<String>) -> Response {
        match self {
            IpList::Ban => Json(BanListResponse { banned_ips: entries }).into_response(),
            IpList::Verified => Json(VerifiedListResponse { verified_ips: entries }).into_response(),
        }
    }
}

fn list_entries(
    list: IpList,
    state: &AppState,
    ClientIp(client): ClientIp,
    headers: &HeaderMap,
) -> Result<Response, ApiError> {
    let store = list.store(state);
    let key = header_secret(headers, ADMIN_KEY_HEADER)?;

    let entries = store.get_all(key).map_err(|e| {
        tracing::warn!("Rejected {} listing from {}: {}", store.label(), client, e);
        ApiError::from_admin(e)
    })?;

    Ok(list.respond(entries.iter().map(ToString::to_string).collect()))
}

fn modify_entries(
    list: IpList,
    change: Change,
    state: &AppState,
    ClientIp(client): ClientIp,
    headers: &HeaderMap,
    body: Result<Json<IpListRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let store = list.store(state);
    let key = header_secret(headers, ADMIN_KEY_HEADER)?;
    if !store.validate(key) {
        tracing::warn!("Rejected {} change from {}: invalid admin key", store.label(), client);
        return Err(ApiError::InvalidAdminKey);
    }

    let Json(request) = body?;
    let entries = list
        .requested(request)
        .ok_or(ApiError::MissingField(list.field()))?;

    let summary = acl::summarize(&entries);
    let result = match change {
        Change::Add => {
            tracing::info!("{} requested to add to {}: {}", client, store.label(), summary);
            store.add_all(key, &entries)
        }
        Change::Remove => {
            tracing::info!("{} requested to remove from {}: {}", client, store.label(), summary);
            store.remove_all(key, &entries)
        }
    };

    let count = result.map_err(|e| {
        tracing::warn!("Failed to change {} for {}: {}", store.label(), client, e);
        ApiError::from_admin(e)
    })?;
    tracing::info!("{} now holds {} entries", store.label(), count);

    list_entries(list, state, ClientIp(client), headers)
}

fn header_secret<'a>(headers: &'a HeaderMap, name: &str) -> StoreResult<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .ok_or(StoreError::MissingCredential)
}

// An id that is not even a UUID cannot be registered.
fn parse_server_id(server_id: &str) -> StoreResult<Uuid> {
    server_id.parse().map_err(|_| StoreError::NotFound)
}

fn updated_response(
    state: &AppState,
    server_id: &str,
    result: StoreResult<ServerRecord>,
) -> Result<Json<UpdateResponse>, ApiError> {
    let server = result.map_err(|e| {
        tracing::warn!("Update of server {} failed: {}", server_id, e);
        e
    })?;

    tracing::debug!(
        "Update/heartbeat from server \"{}\" ({}) at {}:{}",
        server.name,
        server.id,
        server.source_address,
        server.ports.game
    );

    Ok(Json(UpdateResponse {
        refresh_before: state.registry.refresh_before(&server),
        server,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::{Duration, Utc};
    use serde_json::{json, Value};
    use tempfile::{tempdir, TempDir};
    use tower::ServiceExt;
    use crate::secured::Secret;

    const ADMIN_KEY: &str = "admin";
    const CLIENT: &str = "203.0.113.7";

    struct TestApp {
        app: Router,
        state: AppState,
        _dir: TempDir,
    }

    fn test_app() -> TestApp {
        let dir = tempdir().unwrap();
        let ban_list = NetworkRangeStore::open(
            "ban_list",
            dir.path().join("ban_list.txt"),
            Secret::new(ADMIN_KEY),
        )
        .unwrap();
        let allow_list = NetworkRangeStore::open(
            "verified_list",
            dir.path().join("allow_list.txt"),
            Secret::new(ADMIN_KEY),
        )
        .unwrap();

        let state = AppState {
            registry: Arc::new(ServerRegistry::new(Duration::seconds(65))),
            ban_list: Arc::new(ban_list),
            allow_list: Arc::new(allow_list),
            trust_forwarded_for: true,
        };

        TestApp {
            app: router(state.clone()),
            state,
            _dir: dir,
        }
    }

    fn registration() -> Value {
        json!({
            "name": "Test",
            "description": "Test description",
            "current_map": "Map",
            "player_count": 0,
            "max_players": 100,
            "ports": {"game": 1234, "ping": 1235, "a2s": 1236},
            "mods": []
        })
    }

    fn request(method: &str, uri: &str, headers: &[(&str, &str)], body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", CLIENT);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn register(app: &Router) -> (String, String) {
        let (status, body) = send(app, request("POST", "/api/v1/servers", &[], Some(registration()))).await;
        assert_eq!(status, StatusCode::CREATED);
        (
            body["server"]["unique_id"].as_str().unwrap().to_string(),
            body["key"].as_str().unwrap().to_string(),
        )
    }

    #[tokio::test]
    async fn test_register() {
        let t = test_app();
        let (status, body) = send(&t.app, request("POST", "/api/v1/servers", &[], Some(registration()))).await;

        assert_eq!(status, StatusCode::CREATED);
        assert!(body["key"].as_str().is_some());
        assert_eq!(body["server"]["ip_address"], CLIENT);
        assert_eq!(body["server"]["verified"], false);
        assert!(body["refresh_before"].as_f64().unwrap() > Utc::now().timestamp() as f64);

        let id: Uuid = body["server"]["unique_id"].as_str().unwrap().parse().unwrap();
        assert!(t.state.registry.exists(id));
    }

    #[tokio::test]
    async fn test_register_from_allow_list_is_verified() {
        let t = test_app();
        t.state.allow_list.add_all(ADMIN_KEY, ["203.0.113.0/24"]).unwrap();

        let (status, body) = send(&t.app, request("POST", "/api/v1/servers", &[], Some(registration()))).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["server"]["verified"], true);
    }

    #[tokio::test]
    async fn test_register_bad_json() {
        let t = test_app();
        let mut body = registration();
        body["player_count"] = json!("ten");

        let (status, response) = send(&t.app, request("POST", "/api/v1/servers", &[], Some(body))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["status"], "invalid_json_body");
        assert!(response["message"].as_str().unwrap().contains("player_count"));
    }

    #[tokio::test]
    async fn test_register_missing_key_in_body() {
        let t = test_app();
        let mut body = registration();
        body.as_object_mut().unwrap().remove("name");

        let (status, response) = send(&t.app, request("POST", "/api/v1/servers", &[], Some(body))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(response["message"].as_str().unwrap().contains("name"));
    }

    #[tokio::test]
    async fn test_update() {
        let t = test_app();
        let (id, key) = register(&t.app).await;
        let update = json!({"current_map": "Other", "player_count": 10, "max_players": 100});

        let (status, body) = send(
            &t.app,
            request("PUT", &format!("/api/v1/servers/{}", id), &[(KEY_HEADER, key.as_str())], Some(update)),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["server"]["player_count"], 10);

        let (_, listing) = send(&t.app, request("GET", "/api/v1/servers", &[], None)).await;
        assert_eq!(listing["servers"][0]["current_map"], "Other");
    }

    #[tokio::test]
    async fn test_update_no_key() {
        let t = test_app();
        let (id, _) = register(&t.app).await;
        let update = json!({"current_map": "Other", "player_count": 10, "max_players": 100});

        let (status, body) = send(
            &t.app,
            request("PUT", &format!("/api/v1/servers/{}", id), &[], Some(update)),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "no_key");
    }

    #[tokio::test]
    async fn test_update_invalid_key() {
        let t = test_app();
        let (id, key) = register(&t.app).await;
        let update = json!({"current_map": "Other", "player_count": 10, "max_players": 100});
        let wrong = format!("{}Invalid", key);

        let (status, body) = send(
            &t.app,
            request("PUT", &format!("/api/v1/servers/{}", id), &[(KEY_HEADER, wrong.as_str())], Some(update)),
        )
        .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["status"], "forbidden");
    }

    #[tokio::test]
    async fn test_heartbeat() {
        let t = test_app();
        let (id, key) = register(&t.app).await;

        let (status, body) = send(
            &t.app,
            request("POST", &format!("/api/v1/servers/{}/heartbeat", id), &[(KEY_HEADER, key.as_str())], None),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["refresh_before"].as_f64().unwrap() > Utc::now().timestamp() as f64);
    }

    #[tokio::test]
    async fn test_heartbeat_errors() {
        let t = test_app();
        let (id, _) = register(&t.app).await;
        let uri = format!("/api/v1/servers/{}/heartbeat", id);

        let (status, _) = send(&t.app, request("POST", &uri, &[], None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&t.app, request("POST", &uri, &[(KEY_HEADER, "invalid")], None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let unknown = format!("/api/v1/servers/{}/heartbeat", Uuid::new_v4());
        let (status, body) = send(&t.app, request("POST", &unknown, &[(KEY_HEADER, "invalid")], None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], "not_registered");
    }

    #[tokio::test]
    async fn test_delete() {
        let t = test_app();
        let (id, key) = register(&t.app).await;
        let uri = format!("/api/v1/servers/{}", id);

        let (status, _) = send(&t.app, request("DELETE", &uri, &[], None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let wrong = format!("{}Invalid", key);
        let (status, _) = send(&t.app, request("DELETE", &uri, &[(KEY_HEADER, wrong.as_str())], None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(&t.app, request("DELETE", &uri, &[(KEY_HEADER, key.as_str())], None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "deleted");
        assert!(!t.state.registry.exists(id.parse().unwrap()));

        let (status, _) = send(&t.app, request("DELETE", &uri, &[(KEY_HEADER, key.as_str())], None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_nonexistent_server() {
        let t = test_app();
        let (status, _) = send(
            &t.app,
            request("DELETE", "/api/v1/servers/not-a-server", &[(KEY_HEADER, "Invalid-unused")], None),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_servers() {
        let t = test_app();
        let (status, body) = send(&t.app, request("GET", "/api/v1/servers", &[], None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["servers"].as_array().unwrap().len(), 0);

        register(&t.app).await;

        let (_, body) = send(&t.app, request("GET", "/api/v1/servers", &[], None)).await;
        assert_eq!(body["servers"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_heartbeat_timeout() {
        let t = test_app();
        let (id, key) = register(&t.app).await;
        t.state
            .registry
            .update(id.parse().unwrap(), &key, |server| {
                let at = server.last_heartbeat - Duration::seconds(66);
                server.with_heartbeat(at)
            })
            .unwrap();

        let (status, body) = send(&t.app, request("GET", "/api/v1/servers", &[], None)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["servers"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_banned_client_is_rejected() {
        let t = test_app();
        t.state.ban_list.add_all(ADMIN_KEY, ["203.0.113.0/24"]).unwrap();

        let (status, body) = send(&t.app, request("GET", "/api/v1/servers", &[], None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "You are banned");

        let (status, _) = send(&t.app, request("POST", "/api/v1/servers", &[], Some(registration()))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(t.state.registry.len(), 0);
    }

    #[tokio::test]
    async fn test_banned_client_cannot_prepend_forwarded_hop() {
        let t = test_app();
        t.state.ban_list.add_all(ADMIN_KEY, ["203.0.113.0/24"]).unwrap();

        let req = Request::builder()
            .method("GET")
            .uri("/api/v1/servers")
            .header("x-forwarded-for", format!("8.8.8.8, {}", CLIENT))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&t.app, req).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "You are banned");
    }

    #[tokio::test]
    async fn test_check_banned() {
        let t = test_app();
        t.state.ban_list.add_all(ADMIN_KEY, ["10.0.0.0/24"]).unwrap();

        let (status, body) = send(&t.app, request("GET", "/api/v1/check-banned/10.0.0.5", &[], None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["banned"], true);

        let (_, body) = send(&t.app, request("GET", "/api/v1/check-banned/10.0.1.5", &[], None)).await;
        assert_eq!(body["banned"], false);
    }

    #[tokio::test]
    async fn test_add_to_ban_list() {
        let t = test_app();
        let (status, body) = send(
            &t.app,
            request(
                "PUT",
                "/api/v1/admin/ban-list",
                &[(ADMIN_KEY_HEADER, ADMIN_KEY)],
                Some(json!({"banned_ips": ["127.0.0.1"]})),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["banned_ips"], json!(["127.0.0.1/32"]));
        assert_eq!(t.state.ban_list.len(), 1);
    }

    #[tokio::test]
    async fn test_add_to_ban_list_invalid_key() {
        let t = test_app();
        let (status, body) = send(
            &t.app,
            request(
                "PUT",
                "/api/v1/admin/ban-list",
                &[(ADMIN_KEY_HEADER, "beep")],
                Some(json!({"banned_ips": ["127.0.0.1"]})),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["status"], "forbidden");
        assert_eq!(body["message"], "Invalid admin key");
        assert!(t.state.ban_list.is_empty());
    }

    #[tokio::test]
    async fn test_add_to_ban_list_invalid_ip() {
        let t = test_app();
        let (status, body) = send(
            &t.app,
            request(
                "PUT",
                "/api/v1/admin/ban-list",
                &[(ADMIN_KEY_HEADER, ADMIN_KEY)],
                Some(json!({"banned_ips": ["1.2.3.4", "not-an-ip"]})),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "invalid_ip");
        assert!(t.state.ban_list.is_empty());
    }

    #[tokio::test]
    async fn test_ban_list_requires_field() {
        let t = test_app();
        let (status, body) = send(
            &t.app,
            request(
                "PUT",
                "/api/v1/admin/ban-list",
                &[(ADMIN_KEY_HEADER, ADMIN_KEY)],
                Some(json!({"verified_ips": ["127.0.0.1"]})),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "invalid_request");
    }

    #[tokio::test]
    async fn test_get_ban_list() {
        let t = test_app();
        t.state.ban_list.add_all(ADMIN_KEY, ["10.0.0.0/8"]).unwrap();

        let (status, _) = send(&t.app, request("GET", "/api/v1/admin/ban-list", &[], None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &t.app,
            request("GET", "/api/v1/admin/ban-list", &[(ADMIN_KEY_HEADER, "beep")], None),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Invalid admin key");

        let (status, body) = send(
            &t.app,
            request("GET", "/api/v1/admin/ban-list", &[(ADMIN_KEY_HEADER, ADMIN_KEY)], None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["banned_ips"], json!(["10.0.0.0/8"]));
    }

    #[tokio::test]
    async fn test_remove_from_verified_list() {
        let t = test_app();
        t.state
            .allow_list
            .add_all(ADMIN_KEY, ["192.0.2.1", "192.0.2.2"])
            .unwrap();

        let (status, body) = send(
            &t.app,
            request(
                "DELETE",
                "/api/v1/admin/verified-list",
                &[(ADMIN_KEY_HEADER, ADMIN_KEY)],
                Some(json!({"verified_ips": ["192.0.2.1"]})),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["verified_ips"], json!(["192.0.2.2/32"]));
        assert!(!t.state.allow_list.contains("192.0.2.1"));
    }

    #[tokio::test]
    async fn test_add_to_verified_list_invalid_key() {
        let t = test_app();
        let (status, _) = send(
            &t.app,
            request(
                "PUT",
                "/api/v1/admin/verified-list",
                &[(ADMIN_KEY_HEADER, "beep")],
                Some(json!({"verified_ips": ["127.0.0.1"]})),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(t.state.allow_list.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_client_address() {
        let mut t = test_app();
        t.state.trust_forwarded_for = false;
        let app = router(t.state.clone());

        let (status, body) = send(&app, request("GET", "/api/v1/servers", &[], None)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "no_client_address");
    }
}
