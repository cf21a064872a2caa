//! Scheduler behavior: admission gating, FIFO order, cancellation paths,
//! hard timeout and slot release.

mod common;

use std::time::Duration;

use common::{TestBackend, setup, submit, wait_for_status};
use dockd::core::JobStatus;

#[tokio::test]
async fn concurrency_limit_is_respected() {
    let service = setup(
        2,
        Duration::from_secs(10),
        TestBackend::with_duration(Duration::from_millis(300)),
    );

    let a = submit(&service, "a").await;
    let b = submit(&service, "b").await;
    let c = submit(&service, "c").await;

    wait_for_status(&service, &a, JobStatus::Running, Duration::from_secs(1)).await;
    wait_for_status(&service, &b, JobStatus::Running, Duration::from_secs(1)).await;

    // Both slots taken: the third job must still be pending.
    let job_c = service.get(&c).await.unwrap();
    assert_eq!(job_c.status, JobStatus::Pending);
    assert!(job_c.started_at.is_none());

    let running = service.list(Some(JobStatus::Running), 100, 0).await;
    assert!(running.len() <= 2);

    let job_a = wait_for_status(&service, &a, JobStatus::Completed, Duration::from_secs(2)).await;
    let job_b = wait_for_status(&service, &b, JobStatus::Completed, Duration::from_secs(2)).await;
    let job_c = wait_for_status(&service, &c, JobStatus::Completed, Duration::from_secs(2)).await;

    // The third job could only start once a slot freed up.
    let first_free = job_a
        .completed_at
        .unwrap()
        .min(job_b.completed_at.unwrap());
    assert!(job_c.started_at.unwrap() >= first_free);
}

#[tokio::test]
async fn admission_is_fifo() {
    let service = setup(1, Duration::from_secs(10), TestBackend::quick());

    let first = submit(&service, "1").await;
    let second = submit(&service, "2").await;
    let third = submit(&service, "3").await;

    let first = wait_for_status(&service, &first, JobStatus::Completed, Duration::from_secs(2)).await;
    let second =
        wait_for_status(&service, &second, JobStatus::Completed, Duration::from_secs(2)).await;
    let third = wait_for_status(&service, &third, JobStatus::Completed, Duration::from_secs(2)).await;

    assert!(first.started_at.unwrap() <= second.started_at.unwrap());
    assert!(second.started_at.unwrap() <= third.started_at.unwrap());
}

#[tokio::test]
async fn cancelling_a_pending_job_skips_execution() {
    let service = setup(
        1,
        Duration::from_secs(10),
        TestBackend::with_duration(Duration::from_secs(5)),
    );

    let blocker = submit(&service, "blocker").await;
    wait_for_status(&service, &blocker, JobStatus::Running, Duration::from_secs(1)).await;

    let queued = submit(&service, "queued").await;
    assert_eq!(service.get(&queued).await.unwrap().status, JobStatus::Pending);

    service.cancel(&queued).await.unwrap();

    let job = wait_for_status(&service, &queued, JobStatus::Cancelled, Duration::from_secs(1)).await;
    assert!(job.started_at.is_none(), "cancelled-before-admission job must never run");
    assert!(job.completed_at.is_some());

    // Unblock the slot so the scheduler can wind down cleanly.
    service.cancel(&blocker).await.unwrap();
    wait_for_status(&service, &blocker, JobStatus::Cancelled, Duration::from_secs(2)).await;
}

#[tokio::test]
async fn cancelling_a_running_job_finalizes_as_cancelled() {
    let service = setup(
        1,
        Duration::from_secs(10),
        TestBackend::with_duration(Duration::from_secs(5)),
    );

    let id = submit(&service, "x").await;
    wait_for_status(&service, &id, JobStatus::Running, Duration::from_secs(1)).await;

    service.cancel(&id).await.unwrap();

    let job = wait_for_status(&service, &id, JobStatus::Cancelled, Duration::from_secs(2)).await;
    assert!(job.completed_at.is_some());
    assert!(job.results.is_empty());
    assert!(job.error_message.is_none());
}

#[tokio::test]
async fn accepted_cancellations_are_never_lost() {
    // Cancel right after submit, so the request lands at an arbitrary
    // point around admission: before dispatch, while the job is being
    // flipped to running, or once the backend is underway. Whichever
    // window it hits, an accepted cancel must settle the job as
    // cancelled, never completed.
    let service = setup(
        2,
        Duration::from_secs(10),
        TestBackend::with_duration(Duration::from_millis(30)),
    );

    for i in 0..50 {
        let id = submit(&service, &format!("w{i}")).await;
        tokio::task::yield_now().await;
        service.cancel(&id).await.unwrap();
        wait_for_status(&service, &id, JobStatus::Cancelled, Duration::from_secs(1)).await;
    }
}

#[tokio::test]
async fn backend_failure_is_recorded() {
    let service = setup(1, Duration::from_secs(10), TestBackend::failing("grid maps corrupted"));

    let id = submit(&service, "f").await;
    let job = wait_for_status(&service, &id, JobStatus::Failed, Duration::from_secs(2)).await;

    assert_eq!(job.error_message.as_deref(), Some("grid maps corrupted"));
    assert!(job.results.is_empty());
    assert!(job.completed_at.is_some());
}

#[tokio::test]
async fn timeout_fails_the_job_and_frees_the_slot() {
    let service = setup(
        1,
        Duration::from_millis(200),
        TestBackend {
            duration: Duration::from_secs(30),
            outcome: common::Outcome::Succeed,
            ignore_cancellation: true,
        },
    );

    let stuck = submit(&service, "stuck").await;
    let job = wait_for_status(&service, &stuck, JobStatus::Failed, Duration::from_secs(2)).await;
    assert!(
        job.error_message.as_deref().unwrap_or_default().contains("timed out"),
        "timeout failure must be distinguishable: {:?}",
        job.error_message
    );

    // The slot must have been released: a follow-up job gets admitted.
    let next = submit(&service, "next").await;
    wait_for_status(&service, &next, JobStatus::Running, Duration::from_secs(1)).await;
}

#[tokio::test]
async fn progress_readings_never_decrease() {
    let service = setup(
        1,
        Duration::from_secs(10),
        TestBackend::with_duration(Duration::from_millis(300)),
    );

    let id = submit(&service, "p").await;

    let mut readings = Vec::new();
    loop {
        let job = service.get(&id).await.unwrap();
        readings.push(job.progress);
        if job.status == JobStatus::Completed {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    for pair in readings.windows(2) {
        assert!(pair[0] <= pair[1], "progress went backwards: {readings:?}");
    }
    assert_eq!(*readings.last().unwrap(), 100.0);
}

#[tokio::test]
async fn every_job_sees_at_most_one_terminal_transition() {
    // Cancel racing natural completion: whatever wins, the job settles in
    // exactly one terminal state and stays there.
    let service = setup(
        1,
        Duration::from_secs(10),
        TestBackend::with_duration(Duration::from_millis(40)),
    );

    let id = submit(&service, "race").await;
    tokio::time::sleep(Duration::from_millis(35)).await;
    let _ = service.cancel(&id).await;

    tokio::time::sleep(Duration::from_millis(200)).await;
    let first = service.get(&id).await.unwrap();
    assert!(first.status.is_terminal(), "job should have settled, was {}", first.status);

    tokio::time::sleep(Duration::from_millis(100)).await;
    let second = service.get(&id).await.unwrap();
    assert_eq!(first.status, second.status);
    assert_eq!(first.completed_at, second.completed_at);
}
