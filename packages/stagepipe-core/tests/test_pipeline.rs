//! Integration tests for pipeline execution
//!
//! Covers:
//! - Result shape of run_and_return at the single/list boundary
//! - Order preservation across ordering-preserving stages
//! - Upstream faults ending a run without failing it
//! - Nested pipelines as stages

use futures::stream;
use futures::TryStreamExt;
use proptest::prelude::*;
use serde_json::{json, Value};
use stagepipe_core::{
    FilterProcessor, FlatMapProcessor, LambdaProcessor, Limit, LogProcessor, Pipeline,
    PipelineError, PipelineProcessor, RunOutput, Source, StageBuilder,
};

fn inc() -> LambdaProcessor<Value> {
    LambdaProcessor::new(|v: Value| json!(v.as_i64().unwrap_or(0) + 1))
}

fn duplicate() -> FlatMapProcessor<Value> {
    FlatMapProcessor::new(|v: Value| vec![v.clone(), v])
}

#[tokio::test]
async fn test_single_item_one_to_one_returns_bare_value() {
    let pipeline = Pipeline::new().then(inc()).then(inc());
    let out = pipeline.run_and_return(json!(1)).await.unwrap();
    assert_eq!(out, RunOutput::Single(json!(3)));
}

#[tokio::test]
async fn test_single_item_multiplied_returns_list() {
    let pipeline = Pipeline::new().then(duplicate());
    let out = pipeline.run_and_return(json!(1)).await.unwrap();
    assert_eq!(out, RunOutput::List(vec![json!(1), json!(1)]));
}

#[tokio::test]
async fn test_single_item_filtered_out_returns_empty() {
    let pipeline = Pipeline::new().then(FilterProcessor::new(|_: &Value| false));
    let out = pipeline.run_and_return(json!(1)).await.unwrap();
    assert_eq!(out, RunOutput::Empty);
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_collection_of_one_returns_list() {
    let pipeline = Pipeline::new().then(inc());
    let out = pipeline.run_and_return(vec![json!(1)]).await.unwrap();
    assert_eq!(out, RunOutput::List(vec![json!(2)]));
}

#[tokio::test]
async fn test_lazy_run_over_async_source() {
    let pipeline = Pipeline::new().then(inc()).then(Limit::first(2));
    let source = Source::stream(stream::iter(vec![Ok(json!(1)), Ok(json!(2)), Ok(json!(3))]));
    let out: Vec<Value> = pipeline.run(source).try_collect().await.unwrap();
    assert_eq!(out, vec![json!(2), json!(3)]);
}

#[tokio::test]
async fn test_upstream_fault_ends_run() {
    let pipeline = Pipeline::new().then(inc());
    let source = Source::stream(stream::iter(vec![
        Ok(json!(1)),
        Err(PipelineError::config("connection reset")),
        Ok(json!(5)),
    ]));
    let out = pipeline.run_and_collect(source).await.unwrap();
    assert_eq!(out, vec![json!(2)]);
}

#[tokio::test]
async fn test_transformation_fault_aborts_run() {
    let failing = LambdaProcessor::try_new(|v: Value| {
        if v == json!(2) {
            Err(PipelineError::stage_failed("embed", "timeout"))
        } else {
            Ok(v)
        }
    });
    let pipeline = Pipeline::new().then(failing).then(inc());
    let err = pipeline
        .run_and_collect(json!([1, 2, 3]))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::StageExecutionFailed { .. }));
}

#[tokio::test]
async fn test_nested_pipeline_over_pages() {
    let per_page = Pipeline::new()
        .then(LambdaProcessor::new(|v: Value| {
            json!(v.as_str().unwrap_or_default().to_uppercase())
        }))
        .then(LogProcessor::new().message("page {item}"));
    let stage = PipelineProcessor::new(per_page)
        .input("pages")
        .output("pages");
    let pipeline = Pipeline::new().then(stage);

    let out = pipeline
        .run_and_collect(json!([
            {"doc": 1, "pages": ["a", "b"]},
            {"doc": 2, "pages": ["c"]}
        ]))
        .await
        .unwrap();
    assert_eq!(
        out,
        vec![
            json!({"doc": 1, "pages": ["A", "B"]}),
            json!({"doc": 2, "pages": ["C"]}),
        ]
    );
}

#[tokio::test]
async fn test_shared_stage_in_two_pipelines() {
    let shared: std::sync::Arc<dyn stagepipe_core::Processor<Value>> = std::sync::Arc::new(inc());
    let mut a = Pipeline::new();
    a.add_shared(shared.clone());
    let mut b = Pipeline::new();
    b.add_shared(shared).add_processor(inc());

    assert_eq!(a.run_and_collect(json!([1])).await.unwrap(), vec![json!(2)]);
    assert_eq!(b.run_and_collect(json!([1])).await.unwrap(), vec![json!(3)]);
}

proptest! {
    #[test]
    fn prop_order_preserved(values in prop::collection::vec(-1000i64..1000, 0..64)) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let pipeline = Pipeline::new()
            .then(inc())
            .then(FilterProcessor::new(|v: &Value| v.as_i64().unwrap_or(0) % 3 != 0))
            .then(duplicate());

        let input: Vec<Value> = values.iter().map(|v| json!(v)).collect();
        let out = rt.block_on(pipeline.run_and_collect(input)).unwrap();

        let expected: Vec<Value> = values
            .iter()
            .map(|v| v + 1)
            .filter(|v| v % 3 != 0)
            .flat_map(|v| [json!(v), json!(v)])
            .collect();
        prop_assert_eq!(out, expected);
    }
}
