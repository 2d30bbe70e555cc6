//! HTTP 路由
//!
//! - `POST /parse/`、`POST /upload/`：multipart 字段 `file`
//! - `POST /parse_from_url/?url=...`
//! - `GET /health`

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use cadparse_core::document::CadDocument;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::service::ParseService;

/// 成功响应
#[derive(Debug, Serialize)]
pub struct ParseResponse {
    pub success: bool,
    pub data: CadDocument,
}

impl ParseResponse {
    fn ok(data: CadDocument) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UrlParams {
    #[serde(default)]
    pub url: String,
}

pub fn router(service: Arc<ParseService>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/parse/", post(parse_upload))
        .route("/upload/", post(parse_upload))
        .route("/parse_from_url/", post(parse_from_url))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

async fn parse_upload(
    State(service): State<Arc<ParseService>>,
    mut multipart: Multipart,
) -> Result<Json<ParseResponse>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::Validation(e.body_text()))?;

        let document = service.parse_upload(&file_name, &bytes).await?;
        return Ok(ParseResponse::ok(document));
    }

    Err(ApiError::Validation("缺少上传文件字段 file".to_string()))
}

async fn parse_from_url(
    State(service): State<Arc<ParseService>>,
    Query(params): Query<UrlParams>,
) -> Result<Json<ParseResponse>, ApiError> {
    let document = service.parse_from_url(&params.url).await?;
    Ok(ParseResponse::ok(document))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
