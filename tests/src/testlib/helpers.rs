//! Helper functions for running transformations in tests.
//!
//! Every scenario follows the same cycle: submit the request, wait for ServiceX to finish
//! it, then read the result files back. [`run_transformation`] performs the whole cycle and
//! keeps the error of whichever step failed.

use servicex_client::{
    poll::{Clock, PollError, Poller},
    request::{RequestId, TransformationRequest},
    results::FetchError,
    table::ResultTable,
    transformation::SubmitError,
};

use super::harness::Harness;

/// Submit a request, wait for it to finish and fetch its results.
///
/// Waits on the wall clock with the harness poll policy.
///
/// # Errors
///
/// Returns [`HarnessError`] wrapping the error of the step that failed.
pub async fn run_transformation(
    harness: &Harness,
    request: &TransformationRequest,
) -> Result<ResultTable, HarnessError> {
    let poller = Poller::new(*harness.poll_policy());
    run_transformation_with_poller(harness, &poller, request).await
}

/// Same as [`run_transformation`], waiting with the given poller.
pub async fn run_transformation_with_poller<C: Clock>(
    harness: &Harness,
    poller: &Poller<C>,
    request: &TransformationRequest,
) -> Result<ResultTable, HarnessError> {
    let transformations = harness.client().transformations();

    let request_id = transformations.submit(request).await?;
    let outcome = poller.wait(&transformations, &request_id).await?;
    tracing::info!(request_id = %request_id, polls = outcome.polls, status = %outcome.status, "Transformation finished");

    fetch_results(harness, &request_id).await
}

/// Fetch the results of a finished request.
pub async fn fetch_results(
    harness: &Harness,
    request_id: &RequestId,
) -> Result<ResultTable, HarnessError> {
    let table = harness
        .fetcher()
        .fetch(&harness.client().transformations(), request_id)
        .await?;
    Ok(table)
}

/// The step of a transformation run that failed.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("failed to submit transformation")]
    Submit(#[from] SubmitError),

    #[error("transformation did not complete")]
    Poll(#[from] PollError),

    #[error("failed to fetch transformation results")]
    Fetch(#[from] FetchError),
}
