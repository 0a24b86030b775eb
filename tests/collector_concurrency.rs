//! Concurrency tests for the collector.
//!
//! These tests drive the public API from many tasks at once and check the
//! properties the collector promises: one worker, no lost or duplicated rows,
//! no deadlock under a tiny queue, and drop-on-failure batches.

mod helpers;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use ch_collector::{row, Collector, CollectorError, Destination, WorkerState};
use futures::future::join_all;
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use helpers::{create_memory_collector, row_id};

/// Many producers racing on a fresh collector: every row lands in exactly one
/// committed batch, which only holds if a single worker drained the queue.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_adds_use_one_worker() {
    const PRODUCERS: i64 = 16;
    const PER_PRODUCER: i64 = 250;

    let (collector, dest) = create_memory_collector(64, 1000);
    assert!(!collector.is_started());

    let barrier = Arc::new(tokio::sync::Barrier::new(PRODUCERS as usize));
    let mut producers = Vec::new();
    for p in 0..PRODUCERS {
        let collector = Arc::clone(&collector);
        let barrier = Arc::clone(&barrier);
        producers.push(tokio::spawn(async move {
            barrier.wait().await;
            for i in 0..PER_PRODUCER {
                collector
                    .add(row![p * PER_PRODUCER + i, "x"])
                    .await
                    .expect("add should succeed before stop");
            }
        }));
    }
    for result in join_all(producers).await {
        result.expect("producer panicked");
    }
    collector.stop().await.expect("stop should succeed");

    let rows = dest.rows();
    let ids: HashSet<i64> = rows.iter().map(|r| row_id(r)).collect();
    assert_eq!(rows.len() as i64, PRODUCERS * PER_PRODUCER, "duplicated rows");
    assert_eq!(ids.len() as i64, PRODUCERS * PER_PRODUCER, "lost rows");
    assert_eq!(dest.close_calls(), 1);
    assert_eq!(collector.worker_state(), WorkerState::Terminated);
}

/// Rows from one producer keep their relative order across batches.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_per_producer_order_is_preserved() {
    let (collector, dest) = create_memory_collector(7, 16);

    let mut producers = FuturesUnordered::new();
    for p in 0..4i64 {
        let collector = Arc::clone(&collector);
        producers.push(tokio::spawn(async move {
            for seq in 0..100i64 {
                collector.add(row![p, seq]).await.unwrap();
            }
        }));
    }
    while let Some(result) = producers.next().await {
        result.unwrap();
    }
    collector.stop().await.unwrap();

    for p in 0..4i64 {
        let seqs: Vec<_> = dest
            .rows()
            .into_iter()
            .filter(|r| row_id(r) == p)
            .map(|r| r[1].clone())
            .collect();
        let expected: Vec<_> = (0..100i64).map(ch_collector::Value::from).collect();
        assert_eq!(seqs, expected, "producer {p} rows out of order");
    }
}

/// Queue capacity 1 and two producers before any start: both finish.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tiny_queue_two_producers_do_not_deadlock() {
    let (collector, dest) = create_memory_collector(10, 1);

    let a = {
        let collector = Arc::clone(&collector);
        tokio::spawn(async move { collector.add(row![1, "a"]).await })
    };
    let b = {
        let collector = Arc::clone(&collector);
        tokio::spawn(async move { collector.add(row![2, "b"]).await })
    };

    let both = tokio::time::timeout(Duration::from_secs(5), async {
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();
    })
    .await;
    assert!(both.is_ok(), "producers deadlocked on a full queue");

    collector.stop().await.unwrap();
    let ids: HashSet<i64> = dest.rows().iter().map(|r| row_id(r)).collect();
    assert_eq!(ids, HashSet::from([1, 2]));
}

/// With no failures, N rows and limit T give ceil(N/T) committed batches.
#[tokio::test]
async fn test_batch_count_is_ceil_n_over_t() {
    for (n, t) in [(1usize, 1usize), (5, 2), (6, 2), (10, 3), (3, 10)] {
        let (collector, dest) = create_memory_collector(t, 100);
        for i in 0..n {
            collector.add(row![i as i64, "x"]).await.unwrap();
        }
        collector.stop().await.unwrap();

        let batches = dest.batches();
        assert_eq!(batches.len(), n.div_ceil(t), "n={n} t={t}");
        assert!(batches.iter().all(|b| b.rows.len() <= t));
        let ids: Vec<i64> = dest.rows().iter().map(|r| row_id(r)).collect();
        assert_eq!(ids, (0..n as i64).collect::<Vec<_>>());
    }
}

/// A failed append mid-batch drops the whole batch; its rows never show up
/// in a later successful batch.
#[tokio::test]
async fn test_append_failure_drops_batch_without_retry() {
    let errors = Arc::new(std::sync::Mutex::new(Vec::new()));
    let errors_clone = Arc::clone(&errors);
    let dest = Arc::new(ch_collector::MemoryDestination::new());
    let destination: Arc<dyn Destination> = dest.clone();
    let collector = Collector::with_error_sink(
        destination,
        ch_collector::CollectorConfig {
            flush_limit: 3,
            ..ch_collector::CollectorConfig::new("events")
        },
        Arc::new(move |table: &str, err: &CollectorError| {
            errors_clone
                .lock()
                .unwrap()
                .push((table.to_string(), err.stage()));
        }),
    )
    .unwrap();

    dest.fail_next_append_at(1);
    for i in 0..7i64 {
        collector.add(row![i, "x"]).await.unwrap();
    }
    collector.stop().await.unwrap();

    let ids: Vec<i64> = dest.rows().iter().map(|r| row_id(r)).collect();
    assert_eq!(ids, vec![3, 4, 5, 6]);
    assert_eq!(
        *errors.lock().unwrap(),
        vec![("events".to_string(), Some("append"))]
    );
    let stats = collector.stats();
    assert_eq!(stats.rows_dropped, 3);
    assert_eq!(stats.flush_failures, 1);
    assert_eq!(stats.rows_flushed, 4);
}

/// Producers are not held up while a flush is waiting on the destination.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_slow_flush_does_not_block_producers() {
    let dest = Arc::new(
        ch_collector::MemoryDestination::new().with_send_delay(Duration::from_millis(200)),
    );
    let destination: Arc<dyn Destination> = dest.clone();
    let collector = Collector::new(
        destination,
        ch_collector::CollectorConfig {
            flush_limit: 1,
            queue_capacity: 100,
            ..ch_collector::CollectorConfig::new("events")
        },
    )
    .unwrap();

    for i in 0..10i64 {
        collector.add(row![i, "x"]).await.unwrap();
    }
    assert_eq!(collector.stats().rows_accepted, 10);
    assert!(
        dest.batches().is_empty(),
        "first flush should still be in flight"
    );

    collector.stop().await.unwrap();
    assert_eq!(dest.rows().len(), 10);
}

/// A producer blocked on a full queue when stop begins still gets its row
/// flushed before stop returns.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stop_waits_for_in_flight_adds() {
    let dest = Arc::new(
        ch_collector::MemoryDestination::new().with_send_delay(Duration::from_millis(50)),
    );
    let destination: Arc<dyn Destination> = dest.clone();
    let collector = Arc::new(
        Collector::new(
            destination,
            ch_collector::CollectorConfig {
                flush_limit: 1,
                queue_capacity: 1,
                ..ch_collector::CollectorConfig::new("events")
            },
        )
        .unwrap(),
    );

    let producer = {
        let collector = Arc::clone(&collector);
        tokio::spawn(async move {
            let mut accepted = 0;
            for i in 0..20i64 {
                match collector.add(row![i, "x"]).await {
                    Ok(()) => accepted += 1,
                    Err(CollectorError::Misuse(_)) => break,
                    Err(e) => panic!("unexpected error {e}"),
                }
            }
            accepted
        })
    };

    tokio::time::sleep(Duration::from_millis(120)).await;
    collector.stop().await.unwrap();
    let accepted = producer.await.unwrap();

    assert_eq!(dest.rows().len(), accepted);
    assert_eq!(collector.buffered(), 0);
}
