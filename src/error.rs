//! Error types shared by the apply engine, the cluster passthroughs and the
//! HTTP service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required request field is missing or has an unusable value.
    #[error("{0}")]
    Validation(String),

    /// The manifest payload is not well-formed YAML.
    #[error("invalid YAML: {0}")]
    InvalidYaml(String),

    /// The supplied kubeconfig could not be turned into a client.
    #[error("invalid kubeconfig: {0}")]
    Kubeconfig(String),

    /// The API server rejected the call.
    #[error("{0}")]
    Cluster(String),

    /// The API server could not be reached.
    #[error("{0}")]
    Transport(String),

    #[error("request body too large: {0}")]
    BodyTooLarge(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("operation timed out after {0}s")]
    Timeout(u64),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::BodyTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Error::InvalidYaml(_)
            | Error::Kubeconfig(_)
            | Error::Cluster(_)
            | Error::Transport(_)
            | Error::Cancelled => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<kube::Error> for Error {
    fn from(e: kube::Error) -> Self {
        match e {
            kube::Error::Api(_) => Error::Cluster(e.to_string()),
            other => Error::Transport(other.to_string()),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::InvalidYaml(e.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_bad_request() {
        let response = Error::validation("kubeconfig and type are required").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn cluster_failures_map_to_internal_error() {
        for err in [
            Error::Cluster("forbidden".into()),
            Error::Transport("connection refused".into()),
            Error::Kubeconfig("no contexts".into()),
            Error::InvalidYaml("bad indent".into()),
        ] {
            assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn timeout_maps_to_gateway_timeout() {
        let err = Error::Timeout(30);
        assert_eq!(err.to_string(), "operation timed out after 30s");
        assert_eq!(err.into_response().status(), StatusCode::GATEWAY_TIMEOUT);
    }
}
