//! Submit, wait and fetch against a mocked ServiceX.

use std::{sync::atomic::Ordering, time::Duration};

use servicex_client::{
    poll::{ManualClock, PollError, PollPolicy, PollState, Poller},
    request::Selection,
    status::TransformationStatus,
    transformation::SubmitError,
};
use servicex_config::TransformationDefaults;

use crate::testlib::{
    assert::expect_row_count,
    fixtures::{LocalResultStore, MockServiceX, jet_pt_batch, status},
    harness::Harness,
    helpers::{HarnessError, run_transformation, run_transformation_with_poller},
};

const TOY_DATASET: &str = "mc15_13TeV:toy.dataset";
const TOY_QUERY: &str = "(call ResultParquet (call Select (call EventDataset (list 'localds:bogus')) (lambda (list e) (call (attr e 'pt')))) (list 'JetPt') 'junk.parquet')";

fn fast_policy() -> PollPolicy {
    PollPolicy {
        interval: Duration::from_millis(10),
        max_interval: Duration::from_millis(50),
        factor: 1.5,
        timeout: Duration::from_secs(10),
    }
}

fn toy_defaults() -> TransformationDefaults {
    TransformationDefaults {
        image: "sslhep/servicex_func_adl_xaod_transformer:v0.4".to_string(),
        chunk_size: 1000,
        workers: 5,
    }
}

fn harness(servicex: &MockServiceX, store: &LocalResultStore, policy: PollPolicy) -> Harness {
    Harness::new(
        servicex.client().expect("client for mock ServiceX"),
        store.fetcher().expect("fetcher for local store"),
        policy,
        toy_defaults(),
    )
}

fn toy_selection() -> Selection {
    Selection::parse(TOY_QUERY).expect("toy query parses")
}

#[tokio::test]
async fn request_done_after_two_polls_yields_toy_table() {
    //* Given
    let mut servicex = MockServiceX::start().await;
    servicex.accept_submission(TOY_DATASET, "abc123").await;
    servicex.describe_request("abc123").await;
    let polls = servicex
        .status_sequence("abc123", vec![status("Running"), status("Complete")])
        .await;

    let store = LocalResultStore::new().expect("result store");
    store
        .write_parquet(
            "abc123",
            "part-0.parquet",
            &[jet_pt_batch(&[12.5, 40.25, 73.0]).expect("toy batch")],
        )
        .expect("write toy results");

    let harness = harness(&servicex, &store, fast_policy());
    let request = harness.request(TOY_DATASET, toy_selection());

    //* When
    let table = run_transformation(&harness, &request).await;

    //* Then
    let table = table.expect("transformation succeeds");
    expect_row_count(&table, 3).expect("toy table has three rows");
    assert_eq!(polls.load(Ordering::SeqCst), 2);
    assert_eq!(
        table.f64_column("JetPt").expect("JetPt column"),
        [12.5, 40.25, 73.0]
    );
}

#[tokio::test]
async fn results_split_across_files_are_concatenated_in_key_order() {
    //* Given
    let mut servicex = MockServiceX::start().await;
    servicex.accept_submission(TOY_DATASET, "abc123").await;
    servicex.describe_request("abc123").await;
    servicex
        .status_sequence(
            "abc123",
            vec![TransformationStatus {
                status: None,
                files_processed: Some(2),
                files_remaining: Some(0),
                files_skipped: Some(0),
            }],
        )
        .await;

    let store = LocalResultStore::new().expect("result store");
    store
        .write_parquet("abc123", "part-1.parquet", &[jet_pt_batch(&[3.0]).expect("batch")])
        .expect("write results");
    store
        .write_parquet("abc123", "part-0.parquet", &[jet_pt_batch(&[1.0, 2.0]).expect("batch")])
        .expect("write results");

    let harness = harness(&servicex, &store, fast_policy());
    let request = harness.request(TOY_DATASET, toy_selection());

    //* When
    let table = run_transformation(&harness, &request)
        .await
        .expect("transformation succeeds");

    //* Then
    assert_eq!(table.f64_column("JetPt").expect("JetPt column"), [1.0, 2.0, 3.0]);
}

#[tokio::test]
async fn failed_status_fails_the_run_instead_of_waiting() {
    //* Given
    let mut servicex = MockServiceX::start().await;
    servicex.accept_submission(TOY_DATASET, "abc123").await;
    let polls = servicex
        .status_sequence("abc123", vec![status("Running"), status("Failed")])
        .await;
    let store = LocalResultStore::new().expect("result store");
    let harness = harness(&servicex, &store, fast_policy());
    let request = harness.request(TOY_DATASET, toy_selection());

    //* When
    let result = run_transformation(&harness, &request).await;

    //* Then
    assert!(
        matches!(
            result,
            Err(HarnessError::Poll(PollError::TransformationFailed { .. }))
        ),
        "expected TransformationFailed, got {result:?}"
    );
    assert_eq!(polls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn request_that_never_finishes_times_out() {
    //* Given
    let mut servicex = MockServiceX::start().await;
    servicex.accept_submission(TOY_DATASET, "abc123").await;
    servicex
        .status_sequence("abc123", vec![status("Running")])
        .await;
    let store = LocalResultStore::new().expect("result store");
    let policy = PollPolicy {
        interval: Duration::from_secs(1),
        max_interval: Duration::from_secs(10),
        factor: 1.5,
        timeout: Duration::from_secs(60),
    };
    let harness = harness(&servicex, &store, policy);
    let clock = ManualClock::new();
    let poller = Poller::with_clock(policy, clock.clone());
    let request = harness.request(TOY_DATASET, toy_selection());

    //* When
    let result = run_transformation_with_poller(&harness, &poller, &request).await;

    //* Then
    match result {
        Err(HarnessError::Poll(PollError::TimedOut {
            elapsed,
            last_state,
            ..
        })) => {
            assert_eq!(elapsed, Duration::from_secs(60));
            assert_eq!(last_state, PollState::Running);
        }
        other => panic!("expected TimedOut, got {other:?}"),
    }
    assert_eq!(clock.elapsed(), Duration::from_secs(60));
    assert!(
        clock
            .sleeps()
            .iter()
            .all(|delay| *delay > Duration::ZERO && *delay <= Duration::from_secs(10))
    );
}

#[tokio::test]
async fn rejected_submission_is_reported_with_service_message() {
    //* Given
    let mut servicex = MockServiceX::start().await;
    servicex
        .reject_submissions(400, "Dataset does not exist")
        .await;
    let store = LocalResultStore::new().expect("result store");
    let harness = harness(&servicex, &store, fast_policy());
    let request = harness.request(TOY_DATASET, toy_selection());

    //* When
    let result = run_transformation(&harness, &request).await;

    //* Then
    match result {
        Err(HarnessError::Submit(SubmitError::Rejected(api_error))) => {
            assert_eq!(api_error.status, 400);
            assert_eq!(api_error.message, "Dataset does not exist");
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn harness_requests_carry_configured_transformer_settings() {
    //* Given
    let servicex = MockServiceX::start().await;
    let store = LocalResultStore::new().expect("result store");
    let defaults = TransformationDefaults {
        image: "sslhep/servicex_func_adl_xaod_transformer:develop".to_string(),
        chunk_size: 250,
        workers: 2,
    };
    let harness = Harness::new(
        servicex.client().expect("client"),
        store.fetcher().expect("fetcher"),
        fast_policy(),
        defaults,
    );

    //* When
    let request = harness.request(TOY_DATASET, toy_selection());

    //* Then
    assert_eq!(request.image, "sslhep/servicex_func_adl_xaod_transformer:develop");
    assert_eq!(request.chunk_size, 250);
    assert_eq!(request.workers, 2);
    assert_eq!(request.selection.as_str(), TOY_QUERY);
}
