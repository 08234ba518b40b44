//! JSON error responses shared by every API and page handler.
//!
//! Handlers return `Result<_, ApiError>`. Store failures arrive as
//! `anyhow::Error` and are classified by downcasting: validation and duplicate
//! favorite errors keep their own kind, SQLite constraint failures become
//! integrity errors and everything else is an internal error.
//!
//! `detail` is withheld from the serialized body. The full [`ErrorBody`] is
//! attached to the response extensions so the `error_details` layer can add it
//! back for privileged callers.

use crate::archive_store::{ValidationError, NON_FIELD_ERRORS};
use crate::search::SearchError;
use crate::user::FavoriteError;
use axum::{
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Path, Request},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, error};

pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message_en}")]
    NotFound {
        message_en: String,
        message_fa: String,
    },
    #[error("{message_en}")]
    Validation {
        message_en: String,
        message_fa: String,
        errors: Option<FieldErrors>,
    },
    #[error("This verse has already been added to favorites.")]
    DuplicateFavorite,
    #[error("Data integrity error: {0}")]
    Integrity(String),
    #[error("Authentication error. Please login.")]
    Authentication,
    #[error("You do not have permission to access this resource.")]
    PermissionDenied,
    #[error("Method {0} is not allowed for this request.")]
    MethodNotAllowed(String),
    #[error("Internal server error: {0:#}")]
    Internal(anyhow::Error),
}

#[derive(Clone, Debug, Serialize)]
pub struct ErrorDebug {
    pub path: String,
    pub method: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    pub message_en: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
    #[serde(rename = "_debug", skip_serializing_if = "Option::is_none")]
    pub debug: Option<ErrorDebug>,
}

impl ApiError {
    fn not_found(message_en: String, message_fa: String) -> Self {
        ApiError::NotFound {
            message_en,
            message_fa,
        }
    }

    pub fn item_not_found() -> Self {
        Self::not_found(
            "The requested item was not found.".to_string(),
            "آیتم درخواستی یافت نشد.".to_string(),
        )
    }

    pub fn poet_not_found(id: i64) -> Self {
        Self::not_found(
            format!("Poet with ID {} not found.", id),
            format!("شاعر با شناسه {} یافت نشد.", id),
        )
    }

    pub fn category_not_found(id: i64) -> Self {
        Self::not_found(
            format!("Category with ID {} not found.", id),
            format!("دسته‌بندی با شناسه {} یافت نشد.", id),
        )
    }

    pub fn poem_not_found(id: i64) -> Self {
        Self::not_found(
            format!("Poem with ID {} not found.", id),
            format!("شعر با شناسه {} یافت نشد.", id),
        )
    }

    pub fn settings_not_found() -> Self {
        Self::not_found(
            "Settings not found for this user.".to_string(),
            "تنظیماتی برای این کاربر یافت نشد.".to_string(),
        )
    }

    /// A 400 with a specific message and no field errors.
    pub fn bad_request(message_en: impl Into<String>, message_fa: impl Into<String>) -> Self {
        ApiError::Validation {
            message_en: message_en.into(),
            message_fa: message_fa.into(),
            errors: None,
        }
    }

    /// A 400 listing `message` under `field`.
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.into()]);
        ApiError::Validation {
            message_en: "Validation error.".to_string(),
            message_fa: "خطا در اعتبارسنجی داده‌ها.".to_string(),
            errors: Some(errors),
        }
    }

    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::invalid_field(NON_FIELD_ERRORS, message)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::NotFound { .. } => "not_found",
            ApiError::Validation { .. } => "validation_error",
            ApiError::DuplicateFavorite | ApiError::Integrity(_) => "integrity_error",
            ApiError::Authentication => "authentication_error",
            ApiError::PermissionDenied => "permission_denied",
            ApiError::MethodNotAllowed(_) => "method_not_allowed",
            ApiError::Internal(_) => "server_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Validation { .. } | ApiError::Integrity(_) => StatusCode::BAD_REQUEST,
            ApiError::DuplicateFavorite => StatusCode::CONFLICT,
            ApiError::Authentication | ApiError::PermissionDenied => StatusCode::FORBIDDEN,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The full body, including the privileged `detail`.
    pub fn body(&self) -> ErrorBody {
        let (message_fa, message_en, errors, detail) = match self {
            ApiError::NotFound {
                message_en,
                message_fa,
            } => (message_fa.clone(), message_en.clone(), None, None),
            ApiError::Validation {
                message_en,
                message_fa,
                errors,
            } => (message_fa.clone(), message_en.clone(), errors.clone(), None),
            ApiError::DuplicateFavorite => (
                FavoriteError::Duplicate.message_fa().to_string(),
                FavoriteError::Duplicate.to_string(),
                None,
                None,
            ),
            ApiError::Integrity(detail) => (
                "خطا در ذخیره‌سازی اطلاعات. ممکن است این آیتم قبلاً وجود داشته باشد.".to_string(),
                "Data integrity error. The item may already exist.".to_string(),
                None,
                Some(detail.clone()),
            ),
            ApiError::Authentication => (
                "خطا در احراز هویت. لطفاً وارد شوید.".to_string(),
                "Authentication error. Please login.".to_string(),
                None,
                None,
            ),
            ApiError::PermissionDenied => (
                "شما اجازه دسترسی به این بخش را ندارید.".to_string(),
                "You do not have permission to access this resource.".to_string(),
                None,
                None,
            ),
            ApiError::MethodNotAllowed(method) => (
                format!("متد {} برای این درخواست مجاز نیست.", method),
                format!("Method {} is not allowed for this request.", method),
                None,
                None,
            ),
            ApiError::Internal(err) => (
                "خطای سرور. لطفاً بعداً تلاش کنید.".to_string(),
                "Internal server error. Please try again later.".to_string(),
                None,
                Some(format!("{:#}", err)),
            ),
        };
        ErrorBody {
            error: self.kind(),
            message: message_fa,
            message_en,
            detail,
            errors,
            debug: None,
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(err.field().to_string(), vec![err.message_en()]);
        let (message_en, message_fa) = match err {
            ValidationError::InvalidVerseOrder { .. } => (err.message_en(), err.message_fa()),
            ValidationError::Invalid { .. } => (
                "Validation error.".to_string(),
                "خطا در اعتبارسنجی داده‌ها.".to_string(),
            ),
        };
        ApiError::Validation {
            message_en,
            message_fa,
            errors: Some(errors),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(validation) = err.downcast_ref::<ValidationError>() {
            return validation.clone().into();
        }
        if let Some(FavoriteError::Duplicate) = err.downcast_ref::<FavoriteError>() {
            return ApiError::DuplicateFavorite;
        }
        if let Some(rusqlite::Error::SqliteFailure(failure, _)) = err.downcast_ref::<rusqlite::Error>() {
            if failure.code == rusqlite::ErrorCode::ConstraintViolation {
                return ApiError::Integrity(format!("{:#}", err));
            }
        }
        ApiError::Internal(err)
    }
}

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::EmptyQuery => ApiError::bad_request(
                "Please provide a search query.",
                "لطفاً عبارت جستجو را وارد کنید.",
            ),
            SearchError::Store(err) => err.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::invalid_payload(rejection.body_text())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::invalid_payload(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(err) = &self {
            error!("Internal error while serving request: {:#}", err);
        }

        let full_body = self.body();
        let public_body = ErrorBody {
            detail: None,
            ..full_body.clone()
        };
        let mut response = (self.status(), Json(public_body)).into_response();
        response.extensions_mut().insert(full_body);
        response
    }
}

/// `Json` whose rejection is reported through [`ApiError`].
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

/// `Path` that answers unparsable segments with a not-found error.
pub struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(ApiPath(value)),
            Err(rejection) => {
                debug!("Rejected path {}: {}", parts.uri.path(), rejection.body_text());
                Err(ApiError::item_not_found())
            }
        }
    }
}
