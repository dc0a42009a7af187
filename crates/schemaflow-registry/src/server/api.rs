//! Confluent-compatible REST routes over [`RegistryStore`].

use super::store::{RegistryStore, StoreError};
use crate::types::*;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

type ApiResult<T> = std::result::Result<Json<T>, StoreError>;

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = serde_json::json!({
            "error_code": self.error_code,
            "message": self.message,
        });
        (status, Json(body)).into_response()
    }
}

/// Build the registry router
pub fn router(store: Arc<RegistryStore>) -> Router {
    Router::new()
        // Subjects
        .route("/subjects", get(list_subjects))
        .route("/subjects/:subject", post(lookup_schema).delete(delete_subject))
        .route(
            "/subjects/:subject/versions",
            get(list_versions).post(register_schema),
        )
        .route(
            "/subjects/:subject/versions/:version",
            get(get_schema_by_version).delete(delete_schema_version),
        )
        // Schemas by ID
        .route("/schemas/ids/:id", get(get_schema_by_id))
        // Compatibility
        .route(
            "/compatibility/subjects/:subject/versions/:version",
            post(test_compatibility),
        )
        // Config
        .route("/config", get(get_global_config).put(set_global_config))
        .route(
            "/config/:subject",
            get(get_subject_config).put(set_subject_config),
        )
        .layer(CorsLayer::permissive())
        .with_state(store)
}

#[derive(Deserialize)]
struct DeleteParams {
    #[serde(default)]
    permanent: bool,
}

/// `PUT /config` body; the level stays a string so bad values get a registry error code
#[derive(Deserialize)]
struct ConfigBody {
    compatibility: String,
}

impl ConfigBody {
    fn level(&self) -> std::result::Result<CompatibilityLevel, StoreError> {
        self.compatibility
            .parse()
            .map_err(|_| StoreError::invalid_compatibility_level(&self.compatibility))
    }
}

async fn list_subjects(State(store): State<Arc<RegistryStore>>) -> Json<Vec<String>> {
    Json(store.subjects().await)
}

async fn list_versions(
    State(store): State<Arc<RegistryStore>>,
    Path(subject): Path<String>,
) -> ApiResult<Vec<i32>> {
    Ok(Json(store.versions(&subject).await?))
}

async fn register_schema(
    State(store): State<Arc<RegistryStore>>,
    Path(subject): Path<String>,
    Json(request): Json<RegisterSchemaRequest>,
) -> ApiResult<RegisterSchemaResponse> {
    let (id, version) = store.register(&subject, &request.schema).await?;
    Ok(Json(RegisterSchemaResponse {
        id,
        version: Some(version),
    }))
}

async fn lookup_schema(
    State(store): State<Arc<RegistryStore>>,
    Path(subject): Path<String>,
    Json(request): Json<RegisterSchemaRequest>,
) -> ApiResult<SchemaVersion> {
    Ok(Json(store.lookup(&subject, &request.schema).await?))
}

async fn get_schema_by_version(
    State(store): State<Arc<RegistryStore>>,
    Path((subject, version)): Path<(String, String)>,
) -> ApiResult<SchemaVersion> {
    Ok(Json(store.get_version(&subject, &version).await?))
}

async fn get_schema_by_id(
    State(store): State<Arc<RegistryStore>>,
    Path(id): Path<u32>,
) -> ApiResult<SchemaDefinition> {
    Ok(Json(store.get_by_id(id).await?))
}

async fn test_compatibility(
    State(store): State<Arc<RegistryStore>>,
    Path((subject, version)): Path<(String, String)>,
    Json(request): Json<RegisterSchemaRequest>,
) -> ApiResult<CompatibilityResponse> {
    let messages = store
        .test_compatibility(&subject, &version, &request.schema)
        .await?;
    Ok(Json(CompatibilityResponse {
        is_compatible: messages.is_empty(),
        messages,
    }))
}

async fn delete_subject(
    State(store): State<Arc<RegistryStore>>,
    Path(subject): Path<String>,
    Query(params): Query<DeleteParams>,
) -> ApiResult<Vec<i32>> {
    Ok(Json(store.delete_subject(&subject, params.permanent).await?))
}

async fn delete_schema_version(
    State(store): State<Arc<RegistryStore>>,
    Path((subject, version)): Path<(String, String)>,
) -> ApiResult<i32> {
    Ok(Json(store.delete_version(&subject, &version).await?))
}

async fn get_global_config(State(store): State<Arc<RegistryStore>>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        compatibility_level: store.global_level().await,
    })
}

async fn set_global_config(
    State(store): State<Arc<RegistryStore>>,
    Json(body): Json<ConfigBody>,
) -> ApiResult<ConfigUpdate> {
    let level = body.level()?;
    store.set_global_level(level).await;
    Ok(Json(ConfigUpdate {
        compatibility: level,
    }))
}

async fn get_subject_config(
    State(store): State<Arc<RegistryStore>>,
    Path(subject): Path<String>,
) -> ApiResult<ConfigResponse> {
    Ok(Json(ConfigResponse {
        compatibility_level: store.subject_level(&subject).await?,
    }))
}

async fn set_subject_config(
    State(store): State<Arc<RegistryStore>>,
    Path(subject): Path<String>,
    Json(body): Json<ConfigBody>,
) -> ApiResult<ConfigUpdate> {
    let level = body.level()?;
    store.set_subject_level(&subject, level).await;
    Ok(Json(ConfigUpdate {
        compatibility: level,
    }))
}
