use aws_sdk_dynamodb::error::SdkError;
use lambda_http::{http::StatusCode, Body, Response};
use thiserror::Error;

/// Request-handling errors.
///
/// Every handler returns `Result<_, ApiError>`; the single boundary in the
/// API lambda maps the variant to a status code and serializes the message
/// as `{"error": message}`. None of these are retried at that boundary.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed JSON body or a missing/invalid body field.
    #[error("{0}")]
    BadRequest(String),

    /// No usable credential on a route that requires an identity.
    #[error("Unauthorized")]
    Unauthorized,

    /// The credential could not be verified, or a verified caller failed
    /// the route's access predicate.
    #[error("{0}")]
    AccessDenied(String),

    /// The addressed record does not exist.
    #[error("{0}")]
    NotFound(String),

    /// HTTP method with no store operation mapped to it.
    #[error("Unsupported method \"{0}\"")]
    UnsupportedOperation(String),

    /// Store call failed; carries the store-reported status when present.
    #[error("{message}")]
    Store { status: Option<u16>, message: String },

    /// Anything else.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn access_denied() -> Self {
        Self::AccessDenied("Access denied.".to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::AccessDenied(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::UnsupportedOperation(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::Store { status, .. } => status
                .and_then(|s| StatusCode::from_u16(s).ok())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn into_response(self) -> Result<Response<Body>, lambda_http::Error> {
        Ok(Response::builder()
            .status(self.status_code())
            .header("Content-Type", "application/json")
            .header("Access-Control-Allow-Origin", "*")
            .body(
                serde_json::json!({"error": self.to_string()})
                    .to_string()
                    .into(),
            )
            .map_err(Box::new)?)
    }
}

/// Map a DynamoDB SDK failure onto the taxonomy, keeping the HTTP status
/// the service returned when there is one.
pub fn store_error<E>(err: SdkError<E>) -> ApiError
where
    E: std::error::Error + Send + Sync + 'static,
{
    match &err {
        SdkError::ServiceError(ctx) => ApiError::Store {
            status: Some(ctx.raw().status().as_u16()),
            message: ctx.err().to_string(),
        },
        _ => ApiError::Internal(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_the_taxonomy() {
        assert_eq!(
            ApiError::BadRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::access_denied().status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::UnsupportedOperation("PATCH".into()).status_code(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            ApiError::Internal("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn store_status_is_propagated_when_present() {
        let err = ApiError::Store {
            status: Some(409),
            message: "conflict".into(),
        };
        assert_eq!(err.status_code(), StatusCode::CONFLICT);

        let err = ApiError::Store {
            status: None,
            message: "broken".into(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn response_body_is_an_error_envelope() {
        let response = ApiError::NotFound("Event not found".into())
            .into_response()
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body: serde_json::Value =
            serde_json::from_slice(&response.body().to_vec()).unwrap();
        assert_eq!(body, serde_json::json!({"error": "Event not found"}));
    }

    #[test]
    fn unsupported_operation_names_the_method() {
        assert_eq!(
            ApiError::UnsupportedOperation("PATCH".into()).to_string(),
            "Unsupported method \"PATCH\""
        );
    }
}
