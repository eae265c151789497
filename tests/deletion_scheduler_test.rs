//! Integration tests for `DeletionScheduler`.
//!
//! Time is paused, so sleeping in a test advances the clock straight to the
//! next timer and deadlines can be asserted exactly.

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, sleep};

use common::mock_api::MockApi;
use community_link_bot::scheduler::DeletionScheduler;

fn scheduler() -> (Arc<MockApi>, DeletionScheduler<MockApi>) {
    let api = Arc::new(MockApi::new());
    let scheduler = DeletionScheduler::new(Arc::clone(&api));
    (api, scheduler)
}

#[tokio::test(start_paused = true)]
async fn deletes_once_after_delay() {
    let (api, scheduler) = scheduler();
    let scheduled_at = Instant::now();

    assert!(scheduler.schedule_deletion(-100, 42, Duration::from_secs(30)).await);
    assert_eq!(scheduled_at.elapsed(), Duration::ZERO, "scheduling must not wait");
    assert_eq!(scheduler.pending_count().await, 1);

    sleep(Duration::from_secs(29)).await;
    assert!(api.deletes().is_empty());

    sleep(Duration::from_secs(2)).await;
    let deletes = api.deletes();
    assert_eq!(deletes.len(), 1);
    assert_eq!((deletes[0].chat_id, deletes[0].message_id), (-100, 42));
    assert!(deletes[0].at - scheduled_at >= Duration::from_secs(30));
    assert_eq!(scheduler.pending_count().await, 0);

    sleep(Duration::from_secs(600)).await;
    assert_eq!(api.deletes().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn duplicate_schedule_is_ignored() {
    let (api, scheduler) = scheduler();

    assert!(scheduler.schedule_deletion(1, 7, Duration::from_secs(10)).await);
    assert!(!scheduler.schedule_deletion(1, 7, Duration::from_secs(1)).await);
    assert_eq!(scheduler.pending_count().await, 1);

    sleep(Duration::from_secs(5)).await;
    assert!(api.deletes().is_empty(), "second call must not shorten the delay");

    sleep(Duration::from_secs(60)).await;
    assert_eq!(api.deletes().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn same_message_id_in_other_chat_is_separate() {
    let (api, scheduler) = scheduler();

    assert!(scheduler.schedule_deletion(1, 7, Duration::from_secs(10)).await);
    assert!(scheduler.schedule_deletion(2, 7, Duration::from_secs(10)).await);

    sleep(Duration::from_secs(11)).await;
    assert_eq!(api.deletes().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_delete_is_not_retried() {
    let (api, scheduler) = scheduler();
    api.fail_deletes();

    scheduler.schedule_deletion(1, 1, Duration::from_secs(15)).await;
    sleep(Duration::from_secs(16)).await;

    let deletes = api.deletes();
    assert_eq!(deletes.len(), 1);
    assert!(!deletes[0].succeeded);
    assert_eq!(scheduler.pending_count().await, 0);

    sleep(Duration::from_secs(3600)).await;
    assert_eq!(api.deletes().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn zero_delay_deletes_immediately() {
    let (api, scheduler) = scheduler();

    scheduler.schedule_deletion(1, 1, Duration::ZERO).await;
    sleep(Duration::from_millis(1)).await;

    assert_eq!(api.deletes().len(), 1);
    assert_eq!(scheduler.pending_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn independent_deletions_fire_at_their_own_deadlines() {
    let (api, scheduler) = scheduler();
    let start = Instant::now();

    scheduler.schedule_deletion(1, 1, Duration::from_secs(30)).await;
    scheduler.schedule_deletion(1, 2, Duration::from_secs(10)).await;
    scheduler.schedule_deletion(2, 3, Duration::from_secs(20)).await;

    sleep(Duration::from_secs(31)).await;

    let deletes = api.deletes();
    let order: Vec<_> = deletes.iter().map(|d| d.message_id).collect();
    assert_eq!(order, vec![2, 3, 1]);
    assert_eq!(deletes[0].at - start, Duration::from_secs(10));
    assert_eq!(deletes[1].at - start, Duration::from_secs(20));
    assert_eq!(deletes[2].at - start, Duration::from_secs(30));
    assert_eq!(scheduler.pending_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn cancelled_deletion_never_fires() {
    let (api, scheduler) = scheduler();

    scheduler.schedule_deletion(1, 1, Duration::from_secs(30)).await;
    scheduler.schedule_deletion(1, 2, Duration::from_secs(30)).await;

    assert!(scheduler.cancel(1, 1).await);
    assert!(!scheduler.cancel(1, 1).await);

    sleep(Duration::from_secs(31)).await;
    let deleted: Vec<_> = api.deletes().iter().map(|d| d.message_id).collect();
    assert_eq!(deleted, vec![2]);
}

#[tokio::test(start_paused = true)]
async fn shutdown_abandons_pending_deletions() {
    let (api, scheduler) = scheduler();

    for id in 1..=3 {
        scheduler.schedule_deletion(1, id, Duration::from_secs(30)).await;
    }

    assert_eq!(scheduler.shutdown().await, 3);
    assert_eq!(scheduler.pending_count().await, 0);

    sleep(Duration::from_secs(60)).await;
    assert!(api.deletes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn clones_share_pending_set() {
    let (api, scheduler) = scheduler();
    let other = scheduler.clone();

    scheduler.schedule_deletion(1, 1, Duration::from_secs(5)).await;
    assert!(!other.schedule_deletion(1, 1, Duration::from_secs(5)).await);
    assert_eq!(other.pending_count().await, 1);

    sleep(Duration::from_secs(6)).await;
    assert_eq!(api.deletes().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn schedule_after_shutdown_is_refused() {
    let (api, scheduler) = scheduler();
    let other = scheduler.clone();

    scheduler.shutdown().await;

    assert!(!other.schedule_deletion(1, 1, Duration::from_secs(1)).await);
    assert_eq!(scheduler.pending_count().await, 0);

    sleep(Duration::from_secs(5)).await;
    assert!(api.deletes().is_empty());
}
