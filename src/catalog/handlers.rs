// HTTP handlers for the service catalog

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::auth::models::Language;
use crate::catalog::models::{ServiceCategory, ServiceResponse};
use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListServicesQuery {
    /// Filter by category
    pub category: Option<ServiceCategory>,
    /// Response language (nl/fr/en), defaults to nl
    pub lang: Option<Language>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct GetServiceQuery {
    pub lang: Option<Language>,
}

/// List active services
/// GET /api/services
#[utoipa::path(
    get,
    path = "/api/services",
    params(ListServicesQuery),
    responses(
        (status = 200, description = "Active services in display order", body = Vec<ServiceResponse>)
    ),
    tag = "catalog"
)]
pub async fn list_services_handler(
    State(state): State<AppState>,
    Query(query): Query<ListServicesQuery>,
) -> Result<Json<Vec<ServiceResponse>>, ApiError> {
    let language = query.lang.unwrap_or_default();
    let today = state.clock.now().date_naive();

    let services = state.catalog_repo.list_active(query.category).await?;
    let response = services
        .into_iter()
        .map(|service| ServiceResponse::from_service(service, language, today))
        .collect();

    Ok(Json(response))
}

/// Get a single service
/// GET /api/services/:id
#[utoipa::path(
    get,
    path = "/api/services/{id}",
    params(
        ("id" = i32, Path, description = "Service ID"),
        GetServiceQuery
    ),
    responses(
        (status = 200, description = "Service details", body = ServiceResponse),
        (status = 404, description = "Service not found")
    ),
    tag = "catalog"
)]
pub async fn get_service_handler(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<GetServiceQuery>,
) -> Result<Json<ServiceResponse>, ApiError> {
    let language = query.lang.unwrap_or_default();
    let today = state.clock.now().date_naive();

    let service = state
        .catalog_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound {
            resource: "service".to_string(),
            id: id.to_string(),
        })?;

    Ok(Json(ServiceResponse::from_service(service, language, today)))
}
