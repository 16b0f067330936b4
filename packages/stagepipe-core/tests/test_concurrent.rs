//! Integration tests for the bounded-concurrency stage
//!
//! Covers:
//! - In-flight bound under varying delays
//! - Output multiset equality regardless of completion order
//! - Failure propagation and upstream faults
//! - Work finishing while the next upstream item is still pending

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde_json::{json, Value};
use stagepipe_core::{
    AsyncLambdaProcessor, ConcurrentProcessor, LambdaProcessor, Pipeline, PipelineError, Source,
};

/// Counts units of work in flight and records the peak
#[derive(Default)]
struct Gauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl Gauge {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

fn gauged_square(gauge: Arc<Gauge>) -> AsyncLambdaProcessor<Value> {
    AsyncLambdaProcessor::new(move |v: Value| {
        let gauge = Arc::clone(&gauge);
        async move {
            gauge.enter();
            let n = v.as_u64().unwrap_or(0);
            // Varying delays so completion order differs from input order
            tokio::time::sleep(Duration::from_millis((n * 7) % 13 + 1)).await;
            gauge.exit();
            Ok(json!(n * n))
        }
    })
}

fn sorted(values: Vec<Value>) -> Vec<u64> {
    let mut out: Vec<u64> = values.into_iter().filter_map(|v| v.as_u64()).collect();
    out.sort_unstable();
    out
}

#[tokio::test]
async fn test_in_flight_never_exceeds_bound() {
    for bound in [1, 3, 8] {
        let gauge = Arc::new(Gauge::default());
        let stage = ConcurrentProcessor::new(gauged_square(Arc::clone(&gauge)), bound).unwrap();
        let pipeline = Pipeline::new().then(stage);

        let input: Vec<Value> = (0..40u64).map(|n| json!(n)).collect();
        let out = pipeline.run_and_collect(input).await.unwrap();

        assert!(gauge.peak.load(Ordering::SeqCst) <= bound);
        assert_eq!(gauge.current.load(Ordering::SeqCst), 0);
        let expected: Vec<u64> = (0..40u64).map(|n| n * n).collect();
        assert_eq!(sorted(out), expected);
    }
}

#[tokio::test]
async fn test_bound_is_used() {
    let gauge = Arc::new(Gauge::default());
    let stage = ConcurrentProcessor::new(gauged_square(Arc::clone(&gauge)), 4).unwrap();
    let input: Vec<Value> = (0..20u64).map(|n| json!(n)).collect();
    Pipeline::new().then(stage).run_and_collect(input).await.unwrap();

    // All items are available immediately, so the scheduler fills every slot
    assert_eq!(gauge.peak.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_unit_failure_propagates() {
    let failing = AsyncLambdaProcessor::new(|v: Value| async move {
        if v == json!(3) {
            Err(PipelineError::stage_failed("score", "model unavailable"))
        } else {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok(v)
        }
    });
    let stage = ConcurrentProcessor::new(failing, 2).unwrap();
    let err = Pipeline::new()
        .then(stage)
        .run_and_collect(json!([1, 2, 3, 4, 5]))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::StageExecutionFailed { .. }));
}

#[tokio::test]
async fn test_upstream_fault_drains_pending_work() {
    let gauge = Arc::new(Gauge::default());
    let stage = ConcurrentProcessor::new(gauged_square(gauge), 3).unwrap();
    let source = Source::stream(stream::iter(vec![
        Ok(json!(2)),
        Ok(json!(3)),
        Err(PipelineError::upstream("feed closed")),
        Ok(json!(4)),
    ]));

    let out = Pipeline::new().then(stage).run_and_collect(source).await.unwrap();
    assert_eq!(sorted(out), vec![4, 9]);
}

#[tokio::test]
async fn test_slow_upstream_interleaves_with_pending_work() {
    let gauge = Arc::new(Gauge::default());
    let stage = ConcurrentProcessor::new(gauged_square(Arc::clone(&gauge)), 3).unwrap();
    let pipeline = Pipeline::new()
        .then(LambdaProcessor::new(|v: Value| json!(v.as_u64().unwrap_or(0) + 1)))
        .then(stage);

    // Items trickle in, so units of work complete while a pull is outstanding
    let source = Source::stream(stream::iter(0..12u64).then(|n| async move {
        tokio::time::sleep(Duration::from_millis(3)).await;
        Ok(json!(n))
    }));

    let out = pipeline.run_and_collect(source).await.unwrap();

    assert!(gauge.peak.load(Ordering::SeqCst) <= 3);
    assert_eq!(gauge.current.load(Ordering::SeqCst), 0);
    let expected: Vec<u64> = (1..=12u64).map(|n| n * n).collect();
    assert_eq!(sorted(out), expected);
}
