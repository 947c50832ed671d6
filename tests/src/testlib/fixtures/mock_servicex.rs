//! A mocked ServiceX REST API.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use anyhow::Context as _;
use mockito::{Matcher, Mock, Server, ServerGuard};
use servicex_client::{Client, status::TransformationStatus};

/// Mock ServiceX deployment serving `/servicex/transformation` endpoints.
///
/// Mocks registered through this fixture stay active until it is dropped.
pub struct MockServiceX {
    server: ServerGuard,
    mocks: Vec<Mock>,
}

impl MockServiceX {
    pub async fn start() -> Self {
        Self {
            server: Server::new_async().await,
            mocks: Vec::new(),
        }
    }

    /// The `/servicex` base URL of the mock.
    pub fn url(&self) -> String {
        format!("{}/servicex", self.server.url())
    }

    pub fn client(&self) -> anyhow::Result<Client> {
        let url = self.url().parse().context("mock server URL")?;
        Client::new(url).context("ServiceX client for mock server")
    }

    /// Accept submissions for `did` and answer with `request_id`.
    pub async fn accept_submission(&mut self, did: &str, request_id: &str) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/servicex/transformation")
            .match_body(Matcher::PartialJson(serde_json::json!({ "did": did })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(serde_json::json!({ "request_id": request_id }).to_string())
            .create_async()
            .await;
        self.mocks.push(mock);
        self
    }

    /// Reject every submission with a ServiceX error document.
    pub async fn reject_submissions(&mut self, status: usize, message: &str) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/servicex/transformation")
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(serde_json::json!({ "message": message }).to_string())
            .create_async()
            .await;
        self.mocks.push(mock);
        self
    }

    /// Report the request as held in the object store.
    pub async fn describe_request(&mut self, request_id: &str) -> &mut Self {
        let mock = self
            .server
            .mock("GET", format!("/servicex/transformation/{request_id}").as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "request_id": request_id,
                    "did": "mc15_13TeV:toy.dataset",
                    "result-destination": "object-store",
                    "result-format": "parquet",
                })
                .to_string(),
            )
            .create_async()
            .await;
        self.mocks.push(mock);
        self
    }

    /// Answer status checks with `statuses` in order, repeating the last one.
    ///
    /// Returns a counter of the status checks served.
    pub async fn status_sequence(
        &mut self,
        request_id: &str,
        statuses: Vec<TransformationStatus>,
    ) -> Arc<AtomicUsize> {
        let served = Arc::new(AtomicUsize::new(0));
        let counter = served.clone();
        let mock = self
            .server
            .mock(
                "GET",
                format!("/servicex/transformation/{request_id}/status").as_str(),
            )
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body_from_request(move |_request| {
                let call = counter.fetch_add(1, Ordering::SeqCst);
                let status = statuses
                    .get(call)
                    .or(statuses.last())
                    .cloned()
                    .unwrap_or_default();
                serde_json::to_vec(&status).unwrap_or_default()
            })
            .create_async()
            .await;
        self.mocks.push(mock);
        served
    }
}

/// A status document with only the `status` field set.
pub fn status(name: &str) -> TransformationStatus {
    TransformationStatus {
        status: Some(name.to_string()),
        ..Default::default()
    }
}
