use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use inventory_core::{
    config::{RetryConfig, WorkerConfig},
    models::{Task, TaskState},
    traits::{TaskQueue, TaskRegistry},
    InventoryError, ManualClock,
};
use inventory_infrastructure::InMemoryTaskQueue;
use inventory_worker::{handler_fn, Worker};
use tokio_util::sync::CancellationToken;

#[derive(serde::Deserialize)]
struct ProjectPayload {
    #[allow(dead_code)]
    project: String,
}

fn setup() -> (Arc<ManualClock>, Arc<InMemoryTaskQueue>, TaskRegistry) {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let queue = Arc::new(InMemoryTaskQueue::with_clock(
        RetryConfig::default(),
        clock.clone(),
    ));
    (clock, queue, TaskRegistry::new())
}

fn config(concurrency: usize) -> WorkerConfig {
    WorkerConfig {
        concurrency,
        poll_interval_ms: 10,
        shutdown_timeout_seconds: 1,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_missing_payload_is_archived_without_retry() {
    let (_clock, queue, registry) = setup();
    registry.must_register(
        "g:collect-shoots".to_string(),
        handler_fn(|task| async move {
            task.decode_payload::<ProjectPayload>()?;
            Ok(())
        }),
    );
    let worker = Worker::new(queue.clone(), &registry, &config(1));

    let info = queue
        .enqueue(Task::empty("g:collect-shoots").with_max_retry(5))
        .await
        .unwrap();
    assert_eq!(worker.run_once().await.unwrap(), Some(TaskState::Archived));

    let stored = queue.get(&info.id).await.unwrap().unwrap();
    assert_eq!(stored.retried, 0);
    assert!(stored.last_error.unwrap().contains("不再重试"));
}

#[tokio::test]
async fn test_network_error_retried_up_to_max_then_archived() {
    let (clock, queue, registry) = setup();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    registry.must_register(
        "aws:collect-regions".to_string(),
        handler_fn(move |_task| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(InventoryError::Network("connection reset".into()))
            }
        }),
    );
    let worker = Worker::new(queue.clone(), &registry, &config(1));

    let info = queue
        .enqueue(Task::empty("aws:collect-regions").with_max_retry(3))
        .await
        .unwrap();

    for _ in 0..3 {
        assert_eq!(worker.run_once().await.unwrap(), Some(TaskState::Retry));
        // 退避时间未到时不会再次投递
        assert_eq!(worker.run_once().await.unwrap(), None);
        clock.advance(chrono::Duration::hours(2));
    }
    assert_eq!(worker.run_once().await.unwrap(), Some(TaskState::Archived));

    assert_eq!(calls.load(Ordering::SeqCst), 4);
    let stored = queue.get(&info.id).await.unwrap().unwrap();
    assert_eq!(stored.retried, 3);
    assert_eq!(stored.id, info.id);
}

#[tokio::test]
async fn test_unknown_task_archived_immediately() {
    let (_clock, queue, registry) = setup();
    let worker = Worker::new(queue.clone(), &registry, &config(1));

    queue.enqueue(Task::empty("g:collect-nothing")).await.unwrap();
    assert_eq!(worker.run_once().await.unwrap(), Some(TaskState::Archived));
}

#[tokio::test]
async fn test_success_completes_task() {
    let (_clock, queue, registry) = setup();
    registry.must_register("g:collect-seeds".to_string(), handler_fn(|_| async { Ok(()) }));
    let worker = Worker::new(queue.clone(), &registry, &config(1));

    let info = queue.enqueue(Task::empty("g:collect-seeds")).await.unwrap();
    assert_eq!(worker.run_once().await.unwrap(), Some(TaskState::Completed));
    assert_eq!(
        queue.get(&info.id).await.unwrap().unwrap().state,
        TaskState::Completed
    );
    assert_eq!(worker.task_names(), ["g:collect-seeds".to_string()]);
}

#[tokio::test]
async fn test_run_respects_concurrency_limit() {
    let (_clock, queue, registry) = setup();
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let done = Arc::new(AtomicUsize::new(0));
    {
        let (running, peak, done) = (running.clone(), peak.clone(), done.clone());
        registry.must_register(
            "slow".to_string(),
            handler_fn(move |_| {
                let (running, peak, done) = (running.clone(), peak.clone(), done.clone());
                async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    done.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }),
        );
    }
    for _ in 0..6 {
        queue.enqueue(Task::empty("slow")).await.unwrap();
    }

    let cancel = CancellationToken::new();
    let worker = Worker::new(queue.clone(), &registry, &config(2));
    let handle = tokio::spawn(worker.run(cancel.clone()));

    for _ in 0..200 {
        if done.load(Ordering::SeqCst) == 6 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cancel.cancel();
    handle.await.unwrap().unwrap();

    assert_eq!(done.load(Ordering::SeqCst), 6);
    assert!(peak.load(Ordering::SeqCst) <= 2);
    assert_eq!(
        queue.list(None, Some(TaskState::Completed)).await.unwrap().len(),
        6
    );
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_aborts_handlers_after_grace_period() {
    let (_clock, queue, registry) = setup();
    registry.must_register(
        "stuck".to_string(),
        handler_fn(|_| async {
            tokio::time::sleep(Duration::from_secs(600)).await;
            Ok(())
        }),
    );
    queue
        .enqueue(Task::empty("stuck").with_timeout(Duration::from_secs(3600)))
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    let worker = Worker::new(queue.clone(), &registry, &config(1));
    let handle = tokio::spawn(worker.run(cancel.clone()));

    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();
    handle.await.unwrap().unwrap();

    // 被中止的任务保持 active，租约到期后会被重新投递
    let tasks = queue.list(None, Some(TaskState::Active)).await.unwrap();
    assert_eq!(tasks.len(), 1);
}
