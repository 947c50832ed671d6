//! Transformation API client.
//!
//! Provides methods for interacting with the `/transformation` endpoints of the ServiceX API.

use monitoring::logging;

use super::{
    Client,
    error::{ApiError, read_error_body},
    request::{
        InvalidRequestError, RequestId, ResultDestination, ResultFormat, TransformationRequest,
    },
    status::TransformationStatus,
};

/// Build URL path for submitting a transformation.
///
/// POST `/transformation`
fn transformation_submit() -> &'static str {
    "transformation"
}

/// Build URL path for getting a transformation by ID.
///
/// GET `/transformation/{id}`
fn transformation_get_by_id(id: &RequestId) -> String {
    format!("transformation/{id}")
}

/// Build URL path for getting the status of a transformation.
///
/// GET `/transformation/{id}/status`
fn transformation_status(id: &RequestId) -> String {
    format!("transformation/{id}/status")
}

/// Client for transformation-related API operations.
///
/// Created via [`Client::transformations`](crate::Client::transformations).
#[derive(Debug, Clone, Copy)]
pub struct TransformationsClient<'a> {
    client: &'a Client,
}

impl<'a> TransformationsClient<'a> {
    /// Create a new transformations client.
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Submit a transformation request.
    ///
    /// POSTs to `/transformation` endpoint. The request is validated first and sent once; a
    /// rejected submission is not retried.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError`] for invalid requests, network errors, rejections by the
    /// service, or responses without a request identifier.
    #[tracing::instrument(skip(self, request), fields(did = %request.did))]
    pub async fn submit(&self, request: &TransformationRequest) -> Result<RequestId, SubmitError> {
        request.validate().map_err(SubmitError::InvalidRequest)?;

        let url = self
            .client
            .base_url()
            .join(transformation_submit())
            .expect("valid URL");

        tracing::debug!("Sending POST request");

        let response = self
            .client
            .http()
            .post(url.as_str())
            .json(request)
            .send()
            .await
            .map_err(|err| SubmitError::Network {
                url: url.to_string(),
                source: err,
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "Received API response");

        if status.is_success() {
            let text = response.text().await.map_err(|err| {
                tracing::error!(error = %err, error_source = logging::error_source(&err), "Failed to read submit response");
                SubmitError::UnexpectedResponse {
                    status: status.as_u16(),
                    message: format!("Failed to read response: {}", err),
                }
            })?;

            let body: serde_json::Value = serde_json::from_str(&text).map_err(|err| {
                tracing::error!(error = %err, error_source = logging::error_source(&err), "Failed to parse submit response");
                SubmitError::UnexpectedResponse {
                    status: status.as_u16(),
                    message: text.clone(),
                }
            })?;

            let request_id = body
                .get("request_id")
                .and_then(serde_json::Value::as_str)
                .and_then(|id| RequestId::new(id).ok())
                .ok_or(SubmitError::MissingRequestId { body: text })?;

            tracing::info!(request_id = %request_id, "Transformation submitted");
            return Ok(request_id);
        }

        match read_error_body(response).await {
            Ok(api_error) if status.is_client_error() || status.is_server_error() => {
                tracing::warn!(status = %status, message = %api_error.message, "Transformation rejected");
                Err(SubmitError::Rejected(api_error))
            }
            Ok(api_error) => Err(SubmitError::UnexpectedResponse {
                status: status.as_u16(),
                message: api_error.message,
            }),
            Err(text) => Err(SubmitError::UnexpectedResponse {
                status: status.as_u16(),
                message: text,
            }),
        }
    }

    /// Get a transformation request by ID.
    ///
    /// GETs from `/transformation/{id}` endpoint.
    ///
    /// Returns `None` if the request does not exist (404).
    ///
    /// # Errors
    ///
    /// Returns [`GetError`] for network errors, API errors (400/500),
    /// or unexpected responses.
    #[tracing::instrument(skip(self, id), fields(request_id = %id))]
    pub async fn get(&self, id: &RequestId) -> Result<Option<TransformationDetail>, GetError> {
        let url = self
            .client
            .base_url()
            .join(&transformation_get_by_id(id))
            .expect("valid URL");

        tracing::debug!("Sending GET request");

        let response = self
            .client
            .http()
            .get(url.as_str())
            .send()
            .await
            .map_err(|err| GetError::Network {
                url: url.to_string(),
                source: err,
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "Received API response");

        match status.as_u16() {
            200 => {
                let detail: TransformationDetail = response.json().await.map_err(|err| {
                    tracing::error!(error = %err, error_source = logging::error_source(&err), "Failed to parse transformation response");
                    GetError::UnexpectedResponse {
                        status: status.as_u16(),
                        message: format!("Failed to parse response: {}", err),
                    }
                })?;
                Ok(Some(detail))
            }
            404 => {
                tracing::debug!("Transformation not found");
                Ok(None)
            }
            400 | 500 => match read_error_body(response).await {
                Ok(api_error) => Err(GetError::Api(api_error)),
                Err(text) => Err(GetError::UnexpectedResponse {
                    status: status.as_u16(),
                    message: text,
                }),
            },
            _ => {
                let text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| String::from("Failed to read response body"));
                Err(GetError::UnexpectedResponse {
                    status: status.as_u16(),
                    message: text,
                })
            }
        }
    }

    /// Get the status of a transformation request.
    ///
    /// GETs from `/transformation/{id}/status` endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`StatusError`] for network errors, unknown requests (404), API errors
    /// (400/500), or status documents that cannot be parsed.
    #[tracing::instrument(skip(self, id), fields(request_id = %id))]
    pub async fn status(&self, id: &RequestId) -> Result<TransformationStatus, StatusError> {
        let url = self
            .client
            .base_url()
            .join(&transformation_status(id))
            .expect("valid URL");

        tracing::debug!("Sending GET request");

        let response = self
            .client
            .http()
            .get(url.as_str())
            .send()
            .await
            .map_err(|err| StatusError::Network {
                url: url.to_string(),
                source: err,
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "Received API response");

        match status.as_u16() {
            200 => {
                let document: TransformationStatus = response.json().await.map_err(|err| {
                    tracing::error!(error = %err, error_source = logging::error_source(&err), "Failed to parse status response");
                    StatusError::InvalidStatus {
                        message: format!("Failed to parse response: {}", err),
                    }
                })?;
                Ok(document)
            }
            404 => {
                tracing::debug!("Transformation not found");
                Err(StatusError::NotFound {
                    request_id: id.clone(),
                })
            }
            400 | 500 => match read_error_body(response).await {
                Ok(api_error) => Err(StatusError::Api(api_error)),
                Err(text) => Err(StatusError::UnexpectedResponse {
                    status: status.as_u16(),
                    message: text,
                }),
            },
            _ => {
                let text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| String::from("Failed to read response body"));
                Err(StatusError::UnexpectedResponse {
                    status: status.as_u16(),
                    message: text,
                })
            }
        }
    }
}

/// Response body for GET /transformation/{id} endpoint.
///
/// Only the fields needed to locate results are required; the rest are informational and
/// vary between ServiceX releases.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TransformationDetail {
    /// Identifier assigned at submission
    #[serde(rename = "request_id")]
    pub request_id: RequestId,
    pub result_destination: ResultDestination,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_format: Option<ResultFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub did: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<u32>,
}

/// Errors that can occur when submitting a transformation.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// The request failed validation and was not sent
    #[error("invalid transformation request")]
    InvalidRequest(#[source] InvalidRequestError),

    /// The service refused the request (4xx/5xx with an error document)
    ///
    /// This occurs when:
    /// - The dataset identifier or selection is rejected
    /// - The transformer image is not allowed by the deployment
    /// - The service failed internally while recording the request
    #[error("transformation rejected")]
    Rejected(#[source] ApiError),

    /// The service accepted the request but returned no usable `request_id`
    #[error("response carries no request id: {body}")]
    MissingRequestId { body: String },

    /// Network or connection error
    #[error("network error connecting to {url}")]
    Network { url: String, source: reqwest::Error },

    /// Unexpected response from API
    #[error("unexpected response (status {status}): {message}")]
    UnexpectedResponse { status: u16, message: String },
}

/// Errors that can occur when getting a transformation.
#[derive(Debug, thiserror::Error)]
pub enum GetError {
    /// The service reported an error (400/500)
    #[error("failed to get transformation")]
    Api(#[source] ApiError),

    /// Network or connection error
    #[error("network error connecting to {url}")]
    Network { url: String, source: reqwest::Error },

    /// Unexpected response from API
    #[error("unexpected response (status {status}): {message}")]
    UnexpectedResponse { status: u16, message: String },
}

/// Errors that can occur when getting a transformation status.
#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    /// No request with this identifier exists (404)
    #[error("transformation {request_id} not found")]
    NotFound { request_id: RequestId },

    /// The service reported an error (400/500)
    #[error("failed to get transformation status")]
    Api(#[source] ApiError),

    /// The status document could not be parsed
    #[error("invalid status document: {message}")]
    InvalidStatus { message: String },

    /// Network or connection error
    #[error("network error connecting to {url}")]
    Network { url: String, source: reqwest::Error },

    /// Unexpected response from API
    #[error("unexpected response (status {status}): {message}")]
    UnexpectedResponse { status: u16, message: String },
}
