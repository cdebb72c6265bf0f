use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use uuid::Uuid;

/// Caller identity for tenant-scoped routes. The upstream identity layer
/// terminates authentication and injects these headers; this service treats
/// them as trusted input and only checks that they are present and well
/// formed.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub business_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let business_id = header_uuid(&parts.headers, "x-business-id")?;
        let user_id = header_uuid(&parts.headers, "x-user-id")?;
        let role = header_value(&parts.headers, "x-role")?;

        Ok(Self {
            business_id,
            user_id,
            role,
        })
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Result<String, (StatusCode, String)> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(missing_context)
}

fn header_uuid(headers: &HeaderMap, name: &str) -> Result<Uuid, (StatusCode, String)> {
    let raw = header_value(headers, name)?;
    Uuid::parse_str(&raw).map_err(|_| missing_context())
}

fn missing_context() -> (StatusCode, String) {
    (
        StatusCode::UNAUTHORIZED,
        "Missing or invalid tenant context".to_string(),
    )
}

/// First entry of `x-forwarded-for`, or a placeholder when the edge proxy
/// did not supply one.
pub fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .unwrap_or_else(|| "0.0.0.0".to_string())
}
