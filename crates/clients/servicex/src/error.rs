//! Error response types shared by the ServiceX endpoints.

use monitoring::logging;

/// Error body returned by the ServiceX REST API.
///
/// Every endpoint reports failures as `{"message": "..."}`, typically with a 400 status for
/// malformed requests and 404 for unknown request identifiers.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ErrorResponse {
    /// Human-readable description of the failure
    pub message: String,
}

/// An error reported by the ServiceX API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("ServiceX returned {status}: {message}")]
pub struct ApiError {
    /// HTTP status code of the response
    pub status: u16,
    /// The `message` field of the error body
    pub message: String,
}

impl ErrorResponse {
    pub fn into_api_error(self, status: u16) -> ApiError {
        ApiError {
            status,
            message: self.message,
        }
    }
}

/// Reads the body of a non-success response.
///
/// Returns the service's [`ApiError`] when the body is an [`ErrorResponse`] document, or the
/// raw body text otherwise.
pub(crate) async fn read_error_body(response: reqwest::Response) -> Result<ApiError, String> {
    let status = response.status();

    let text = match response.text().await {
        Ok(text) => text,
        Err(err) => {
            tracing::error!(status = %status, error = %err, error_source = logging::error_source(&err), "Failed to read error response");
            return Err(format!("Failed to read error response: {err}"));
        }
    };

    match serde_json::from_str::<ErrorResponse>(&text) {
        Ok(error_response) => Ok(error_response.into_api_error(status.as_u16())),
        Err(err) => {
            tracing::debug!(status = %status, error = %err, "Error response is not a ServiceX error document");
            Err(text)
        }
    }
}
