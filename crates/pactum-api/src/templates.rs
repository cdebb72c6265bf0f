use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use pactum_core::{AuditRecord, ContractTemplate, DomainError, DomainResult};
use pactum_platform::{CreateTemplateRequest, TemplateView};
use serde_json::json;
use uuid::Uuid;

use crate::auth::{client_ip, AuthContext};
use crate::error::error_response;
use crate::state::AppState;

pub async fn create_template(
    State(state): State<AppState>,
    auth: AuthContext,
    headers: HeaderMap,
    Json(payload): Json<CreateTemplateRequest>,
) -> Result<(StatusCode, Json<TemplateView>), (StatusCode, String)> {
    let ip = client_ip(&headers);
    create_template_inner(&state, &auth, ip, payload)
        .await
        .map(|view| (StatusCode::CREATED, Json(view)))
        .map_err(error_response)
}

pub async fn list_templates(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<TemplateView>>, (StatusCode, String)> {
    list_templates_inner(&state, &auth)
        .await
        .map(Json)
        .map_err(error_response)
}

async fn create_template_inner(
    state: &AppState,
    auth: &AuthContext,
    ip: String,
    payload: CreateTemplateRequest,
) -> DomainResult<TemplateView> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(DomainError::bad_request("Template name is required"));
    }
    if payload.body.trim().is_empty() {
        return Err(DomainError::bad_request("Template body is required"));
    }

    let now = Utc::now();
    let template = ContractTemplate {
        id: Uuid::new_v4(),
        business_id: auth.business_id,
        name: name.to_string(),
        body: payload.body,
        version: 1,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    state.store.insert_template(&template).await?;

    state.audit.record(AuditRecord {
        action: "TEMPLATE_CREATE".to_string(),
        entity_type: "contract_template".to_string(),
        entity_id: Some(template.id.to_string()),
        business_id: Some(auth.business_id),
        user_id: Some(auth.user_id),
        ip: Some(ip),
        metadata: json!({ "name": template.name }),
    });

    Ok(template_view(template))
}

async fn list_templates_inner(
    state: &AppState,
    auth: &AuthContext,
) -> DomainResult<Vec<TemplateView>> {
    let templates = state.store.list_templates(auth.business_id).await?;
    Ok(templates.into_iter().map(template_view).collect())
}

fn template_view(template: ContractTemplate) -> TemplateView {
    TemplateView {
        id: template.id,
        name: template.name,
        body: template.body,
        version: template.version,
        is_active: template.is_active,
        created_at: template.created_at,
    }
}
