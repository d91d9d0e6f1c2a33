use crate::{auth::AuthError, db::RepositoryError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::{ValidationErrors, ValidationErrorsKind};

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

/// API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// One failed field check, as reported to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub tag: String,
    pub message: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl ApiError {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// HTTP status this error is reported with
    pub fn status(&self) -> StatusCode {
        match self.error.as_str() {
            "BadRequest" | "InvalidCredentials" => StatusCode::BAD_REQUEST,
            "ValidationError" => StatusCode::UNPROCESSABLE_ENTITY,
            "AuthenticationError" => StatusCode::UNAUTHORIZED,
            "NotFoundError" => StatusCode::NOT_FOUND,
            "ConflictError" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BadRequest", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("ValidationError", message)
    }

    /// Wrong username or password. Unknown users are reported the same way.
    pub fn invalid_credentials() -> Self {
        Self::new("InvalidCredentials", "incorrect username or password")
    }

    pub fn authentication_error(message: impl Into<String>) -> Self {
        Self::new("AuthenticationError", message)
    }

    /// The only message a rejected bearer token ever gets
    pub fn invalid_authorization() -> Self {
        Self::authentication_error("Invalid authorization")
    }

    pub fn not_found_error(message: impl Into<String>) -> Self {
        Self::new("NotFoundError", message)
    }

    pub fn conflict_error(message: impl Into<String>) -> Self {
        Self::new("ConflictError", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("InternalError", message)
    }
}

/// Flatten `validator` output into a list the client can render field by field
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out = Vec::new();
    for (field, kind) in errors.errors() {
        if let ValidationErrorsKind::Field(list) = kind {
            for err in list {
                out.push(FieldError {
                    field: field.to_string(),
                    tag: err.code.to_string(),
                    message: field_message(field, err),
                });
            }
        }
    }
    out.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.tag.cmp(&b.tag)));
    out
}

fn field_message(field: &str, err: &validator::ValidationError) -> String {
    if let Some(message) = &err.message {
        return message.to_string();
    }
    let param = |name: &str| err.params.get(name).and_then(|v| v.as_u64());
    match err.code.as_ref() {
        "required" => format!("The {field} field is required."),
        "length" => {
            let len = err
                .params
                .get("value")
                .and_then(|v| v.as_str())
                .map(|v| v.chars().count() as u64);
            match (len, param("min"), param("max")) {
                (Some(0), _, _) => format!("The {field} field is required."),
                (Some(len), Some(min), _) if len < min => {
                    format!("The {field} must be at least {min}.")
                }
                (_, _, Some(max)) => format!("The {field} may not be greater than {max}."),
                _ => format!("The {field} has an invalid length."),
            }
        }
        "email" => format!("The {field} must be a valid email address."),
        code => format!("Field validation for '{field}' failed on the '{code}'"),
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::validation_error("Unprocessable Entity")
            .with_details(serde_json::json!(field_errors(&errors)))
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::not_found_error("Not Found"),
            RepositoryError::Conflict(message) => Self::conflict_error(message),
            RepositoryError::Backend(detail) => {
                tracing::error!("Repository error: {}", detail);
                Self::internal_error("Internal Server Error")
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials | AuthError::InvalidClient => Self::invalid_credentials(),
            AuthError::MalformedToken | AuthError::ExpiredToken | AuthError::UnknownToken => {
                Self::invalid_authorization()
            }
            AuthError::RepositoryFailure(detail) | AuthError::Internal(detail) => {
                tracing::error!("Authentication backend error: {}", detail);
                Self::internal_error("Internal Server Error")
            }
            AuthError::MisconfiguredSigning(detail) => {
                tracing::error!("Signing misconfigured: {}", detail);
                Self::internal_error("Internal Server Error")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct LoginForm {
        #[validate(length(min = 1))]
        username: String,
        #[validate(length(min = 1, max = 5))]
        password: String,
    }

    #[test]
    fn validation_errors_are_flattened_per_field() {
        let form = LoginForm {
            username: String::new(),
            password: "too-long".to_string(),
        };
        let errors = field_errors(&form.validate().unwrap_err());

        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "password");
        assert_eq!(errors[0].message, "The password may not be greater than 5.");
        assert_eq!(errors[1].field, "username");
        assert_eq!(errors[1].message, "The username field is required.");
    }

    #[test]
    fn status_mapping() {
        assert_eq!(ApiError::invalid_credentials().status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::invalid_authorization().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::validation_error("x").status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(ApiError::not_found_error("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::internal_error("x").status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn backend_detail_is_not_leaked() {
        let err = ApiError::from(RepositoryError::Backend("connection refused on 10.0.0.3".into()));
        assert_eq!(err.message, "Internal Server Error");
        assert!(err.details.is_none());
    }
}
