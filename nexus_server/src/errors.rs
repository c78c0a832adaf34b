use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use nexus_engine::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid request. {0}")]
    InvalidRequest(String),
    #[error("{0}")]
    AuthenticationError(#[from] AuthError),
    #[error("Forbidden. {0}")]
    Forbidden(String),
    #[error("Not found. {0}")]
    NotFound(String),
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Conflict. {0}")]
    Conflict(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("The identity provider could not complete the request. {0}")]
    UpstreamError(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::NoCredential => StatusCode::UNAUTHORIZED,
                AuthError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
                AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            },
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::UpstreamError(_) => StatusCode::BAD_GATEWAY,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).insert_header(ContentType::plaintext()).body(self.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("No valid credential was supplied. Log in and try again.")]
    NoCredential,
    #[error("The identity token is not valid. {0}")]
    InvalidToken(String),
    #[error("Insufficient permissions. {0}")]
    InsufficientPermissions(String),
}

impl From<StoreError> for ServerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ItemNotFound(_) | StoreError::OrderNotFound(_) => Self::NotFound(e.to_string()),
            StoreError::DuplicateItemName(_) | StoreError::InsufficientStock { .. } | StoreError::ItemInUse(_) => {
                Self::Conflict(e.to_string())
            },
            StoreError::InvalidQuantity { .. } | StoreError::EmptyItemName | StoreError::NegativeStock(_) => {
                Self::InvalidRequest(e.to_string())
            },
            StoreError::DatabaseError(_) => Self::BackendError("The request could not be completed.".into()),
        }
    }
}
