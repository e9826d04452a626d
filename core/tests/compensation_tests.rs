// tests/compensation_tests.rs
mod common;

use common::*;
use payhula_flow::{ContextData, FlowError, Pipeline, PipelineControl, PipelineResult};
use serial_test::serial;
use std::sync::Arc;

fn record_undo(step: &'static str) -> impl Fn(ContextData<TestContext>) -> std::future::Ready<Result<(), TestError>> {
  move |ctx: ContextData<TestContext>| {
    ctx.write().undone.push(step.to_string());
    std::future::ready(Ok(()))
  }
}

fn three_step_saga() -> Pipeline<TestContext, TestError> {
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[
    ("reserve", false, None),
    ("insert_order", false, None),
    ("pay", false, None),
  ]);
  pipeline.on_root("reserve", create_simple_handler("reserve", ""));
  pipeline.compensate_root("reserve", record_undo("reserve"));
  pipeline.on_root("insert_order", create_simple_handler("insert_order", ""));
  pipeline.compensate_root("insert_order", record_undo("insert_order"));
  pipeline
}

#[tokio::test]
#[serial]
async fn test_failure_unwinds_in_reverse_order() {
  setup_tracing();
  let mut pipeline = three_step_saga();
  pipeline.on_root("pay", create_failing_handler("pay", "gateway refused"));

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result.unwrap_err(), TestError::Handler("gateway refused".to_string()));
  assert_eq!(ctx.read().undone, vec!["insert_order", "reserve"]);
}

#[tokio::test]
#[serial]
async fn test_success_runs_no_compensation() {
  setup_tracing();
  let mut pipeline = three_step_saga();
  pipeline.on_root("pay", create_simple_handler("pay", ""));

  let ctx = ContextData::new(TestContext::default());
  assert_eq!(pipeline.run(ctx.clone()).await.unwrap(), PipelineResult::Completed);
  assert!(ctx.read().undone.is_empty());
}

#[tokio::test]
#[serial]
async fn test_stop_does_not_unwind() {
  setup_tracing();
  let mut pipeline = three_step_saga();
  pipeline.on_root("pay", create_simple_handler("pay", ""));

  let ctx = ContextData::new(TestContext {
    should_stop_at: Some("insert_order".to_string()),
    ..Default::default()
  });
  assert_eq!(pipeline.run(ctx.clone()).await.unwrap(), PipelineResult::Stopped);
  assert!(ctx.read().undone.is_empty());
}

#[tokio::test]
#[serial]
async fn test_failing_step_own_compensation_is_armed() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("first", false, None), ("reserve", false, None)]);
  pipeline.on_root("first", create_simple_handler("first", ""));
  pipeline.compensate_root("first", record_undo("first"));
  pipeline.on_root("reserve", create_failing_handler("reserve", "half done"));
  pipeline.compensate_root("reserve", record_undo("reserve"));

  let ctx = ContextData::new(TestContext::default());
  assert!(pipeline.run(ctx.clone()).await.is_err());
  assert_eq!(ctx.read().undone, vec!["reserve", "first"]);
}

#[tokio::test]
#[serial]
async fn test_skipped_step_is_not_compensated() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[
    ("issue_license", false, Some(Arc::new(|_ctx: ContextData<TestContext>| true))),
    ("insert_order", false, None),
  ]);
  pipeline.on_root("issue_license", create_simple_handler("issue_license", ""));
  pipeline.compensate_root("issue_license", record_undo("issue_license"));
  pipeline.on_root("insert_order", create_failing_handler("insert_order", "db down"));

  let ctx = ContextData::new(TestContext::default());
  assert!(pipeline.run(ctx.clone()).await.is_err());
  assert!(ctx.read().undone.is_empty());
}

#[tokio::test]
#[serial]
async fn test_optional_step_failure_does_not_unwind() {
  setup_tracing();
  let mut pipeline = three_step_saga();
  pipeline.set_optional("pay", true);
  pipeline.on_root("pay", create_failing_handler("pay", "ignored"));

  let ctx = ContextData::new(TestContext::default());
  assert_eq!(pipeline.run(ctx.clone()).await.unwrap(), PipelineResult::Completed);
  assert!(ctx.read().undone.is_empty());
}

#[tokio::test]
#[serial]
async fn test_failing_compensation_keeps_original_error() {
  setup_tracing();
  let mut pipeline = three_step_saga();
  pipeline.compensate_root("insert_order", |_ctx: ContextData<TestContext>| {
    std::future::ready(Err::<(), _>(TestError::Compensation("cancel failed".to_string())))
  });
  pipeline.on_root("pay", create_failing_handler("pay", "original failure"));

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result.unwrap_err(), TestError::Handler("original failure".to_string()));
  // Later-registered compensations for a step run first; unwinding goes on past the failure.
  assert_eq!(ctx.read().undone, vec!["insert_order", "reserve"]);
}

#[tokio::test]
#[serial]
async fn test_compensation_reads_what_the_step_did() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("reserve", false, None), ("pay", false, None)]);
  pipeline.on_root("reserve", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.write().counter = 3;
      Ok::<PipelineControl, FlowError>(PipelineControl::Continue)
    })
  });
  pipeline.compensate_root("reserve", |ctx: ContextData<TestContext>| {
    let reserved = ctx.read().counter;
    async move {
      ctx.write().counter -= reserved;
      Ok::<(), FlowError>(())
    }
  });
  pipeline.on_root("pay", create_failing_handler("pay", "declined"));

  let ctx = ContextData::new(TestContext::default());
  assert!(pipeline.run(ctx.clone()).await.is_err());
  assert_eq!(ctx.read().counter, 0);
}

#[tokio::test]
#[serial]
async fn test_scoped_pipeline_unwinds_before_parent_sees_error() {
  setup_tracing();
  let mut scoped = Pipeline::<ChildContext, TestError>::new(&[("reserve", false, None), ("confirm", false, None)]);
  scoped.on_root("reserve", |c: ContextData<ChildContext>| {
    Box::pin(async move {
      c.write().reserved = true;
      Ok::<PipelineControl, FlowError>(PipelineControl::Continue)
    })
  });
  scoped.compensate_root("reserve", |c: ContextData<ChildContext>| {
    let mut guard = c.write();
    if guard.reserved {
      guard.released = true;
    }
    std::future::ready(Ok::<(), TestError>(()))
  });
  scoped.on_root("confirm", |c: ContextData<ChildContext>| {
    let fail = c.read().fail_late;
    Box::pin(async move {
      if fail {
        return Err(TestError::Handler("confirmation failed".to_string()));
      }
      Ok(PipelineControl::Continue)
    })
  });

  let mut pipeline = Pipeline::<ParentWithChild, TestError>::new(&[]);
  pipeline
    .conditional_scopes_for_step("delegate")
    .add_static_scope(Arc::new(scoped), |p: ContextData<ParentWithChild>| {
      p.read()
        .child
        .clone()
        .ok_or_else(|| FlowError::Internal("child context not prepared".to_string()))
    })
    .on_condition(|_p: ContextData<ParentWithChild>| true)
    .finalize_conditional_step(false);

  let child = ContextData::new(ChildContext {
    fail_late: true,
    ..Default::default()
  });
  let parent = ContextData::new(ParentWithChild {
    kind: "child".to_string(),
    child: Some(child.clone()),
    log: vec![],
  });

  let result = pipeline.run(parent).await;
  assert_eq!(result.unwrap_err(), TestError::Handler("confirmation failed".to_string()));
  assert!(child.read().released);
}
