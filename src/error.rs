use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::{error, warn};
use thiserror::Error;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Error type shared by the stores, the ingestion pipeline and the retrieval service.
///
/// Every request-path failure ends up here and is turned into a JSON
/// `{"error": ...}` body at the HTTP boundary.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed or disallowed input (empty file, wrong extension, missing field)
    #[error("{0}")]
    Validation(String),

    /// The (user_id, token) pair does not resolve to a user.
    /// The message is the same whichever half was wrong.
    #[error("user with this token and id doesn't exist")]
    Auth,

    /// The transcoder rejected a file that passed the extension check
    #[error("couldn't decode audio: {0}")]
    Decode(String),

    /// Store unavailable or a constraint was violated
    #[error("storage failure")]
    Persistence(#[from] sqlx::Error),

    /// No audio with this (audio_id, owner_id) pair
    #[error("audio with this id and user doesn't exist")]
    NotFound,
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    fn as_status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Auth | Self::NotFound => StatusCode::BAD_REQUEST,
            Self::Decode(_) | Self::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match &self {
            Self::Persistence(source) => error!("Storage error: {}", source),
            Self::Decode(reason) => {
                warn!("Upload passed the wav extension check but failed to decode: {}", reason)
            }
            _ => {}
        }

        (
            self.as_status_code(),
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}
