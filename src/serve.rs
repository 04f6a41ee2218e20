use axum::{
    body::Body,
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, QueryRejection},
        DefaultBodyLimit, Multipart, Query, State,
    },
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc as StdArc;
use tower_http::cors::{Any, CorsLayer};

use crate::app::AppContext;
use crate::config::ServiceConfig;
use crate::db::DynError;
use crate::error::{ServiceError, ServiceResult};
use crate::ingest::Upload;
use crate::retrieve;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: String,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub id: Option<String>,
    pub user: Option<String>,
}

/// Build the HTTP router over a started context
pub fn router(ctx: StdArc<AppContext>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/users", post(register_handler))
        .route("/audio", post(upload_handler).get(download_handler))
        // Legacy route names
        .route("/add_user", post(register_handler))
        .route("/add_audio", post(upload_handler))
        .route("/record", get(download_handler))
        .layer(DefaultBodyLimit::max(ctx.settings.max_upload_bytes))
        .layer(cors)
        .with_state(ctx)
}

/// Run the service until Ctrl-C (for the serve command)
pub fn serve(config: ServiceConfig) -> Result<(), DynError> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let ctx = StdArc::new(AppContext::start(&config).await?);

        let bind_addr = if config.listen_host.contains(':') {
            format!("[{}]:{}", config.listen_host, config.port)
        } else {
            format!("{}:{}", config.listen_host, config.port)
        };

        info!("Listening on: http://{}", bind_addr);
        info!("Public URL: {}", ctx.settings.public_url);
        info!("Endpoints:");
        info!("  POST /users  - Register a user (JSON {{\"username\"}})");
        info!("  POST /audio  - Upload a wav file (multipart: file, user_id, token)");
        info!("  GET  /audio?id=<audio_id>&user=<user_id>  - Download mp3");
        info!("  GET  /health  - Health check");

        let app = router(StdArc::clone(&ctx));

        let listener = tokio::net::TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| format!("Failed to bind to {}: {}", bind_addr, e))?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| format!("Server error: {}", e))?;

        ctx.stop().await;

        Ok::<(), DynError>(())
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

// Health check endpoint - returns 200 OK if server is running
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn register_handler(
    State(ctx): State<StdArc<AppContext>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ServiceResult<(StatusCode, Json<RegisterResponse>)> {
    let Json(request) = payload.map_err(|e| ServiceError::validation(e.body_text()))?;

    let registration = ctx.identities.register(&request.username).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: registration.user_id,
            token: registration.token,
        }),
    ))
}

async fn upload_handler(
    State(ctx): State<StdArc<AppContext>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ServiceResult<(StatusCode, Json<UploadResponse>)> {
    let multipart = multipart.map_err(|e| ServiceError::validation(e.body_text()))?;
    let upload = read_upload(multipart).await?;
    let url = ctx.pipeline.ingest(upload).await?;
    Ok((StatusCode::CREATED, Json(UploadResponse { url })))
}

/// Collect the `file`, `user_id` and `token` parts of an upload form
async fn read_upload(mut multipart: Multipart) -> ServiceResult<Upload> {
    let mut file: Option<(String, Bytes)> = None;
    let mut user_id: Option<String> = None;
    let mut token: Option<String> = None;

    let invalid = |e: axum::extract::multipart::MultipartError| {
        ServiceError::validation(format!("invalid upload: {}", e.body_text()))
    };

    while let Some(field) = multipart.next_field().await.map_err(invalid)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| ServiceError::validation("file part has no file name"))?;
                let data = field.bytes().await.map_err(invalid)?;
                file = Some((file_name, data));
            }
            // user_uuid is the legacy field name
            Some("user_id") | Some("user_uuid") => {
                user_id = Some(field.text().await.map_err(invalid)?);
            }
            Some("token") => token = Some(field.text().await.map_err(invalid)?),
            _ => {}
        }
    }

    let (file_name, data) = file.ok_or_else(|| ServiceError::validation("missing field: file"))?;

    Ok(Upload {
        file_name,
        data,
        user_id: user_id.ok_or_else(|| ServiceError::validation("missing field: user_id"))?,
        token: token.ok_or_else(|| ServiceError::validation("missing field: token"))?,
    })
}

async fn download_handler(
    State(ctx): State<StdArc<AppContext>>,
    query: Result<Query<DownloadQuery>, QueryRejection>,
) -> ServiceResult<Response> {
    let Query(query) = query.map_err(|e| ServiceError::validation(e.body_text()))?;
    let (Some(audio_id), Some(user_id)) = (query.id, query.user) else {
        return Err(ServiceError::validation(
            "both id and user query parameters are required",
        ));
    };

    let download =
        retrieve::retrieve(&ctx.audio, &audio_id, &user_id, ctx.settings.chunk_size).await?;

    let disposition = HeaderValue::from_str(&download.content_disposition())
        .map_err(|_| ServiceError::validation("invalid file name"))?;
    let content_length = download.chunks.remaining();

    // The body owns the iterator; a client disconnect drops both
    let body = Body::from_stream(tokio_stream::iter(
        download.chunks.map(Ok::<Bytes, Infallible>),
    ));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("audio/mpeg")),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CONTENT_LENGTH, HeaderValue::from(content_length)),
        ],
        body,
    )
        .into_response())
}
