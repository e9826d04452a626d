// tests/common/mod.rs
#![allow(dead_code)]

use once_cell::sync::Lazy;
use payhula_flow::{ContextData, FlowError, Handler, PipelineControl};
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use tracing::Level;

#[derive(Clone, Debug, Default)]
pub struct TestContext {
  pub counter: i32,
  pub message: String,
  pub steps_executed: Vec<String>,
  pub should_stop_at: Option<String>,
  /// Names of compensations in the order they ran.
  pub undone: Vec<String>,
  pub route: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct ScopedContextA {
  pub input: String,
  pub processed_message: String,
}

#[derive(Clone, Debug, Default)]
pub struct ScopedContextB {
  pub input: String,
  pub alternative_message: String,
}

/// Scoped context that shares a slot with its parent so results flow back.
#[derive(Clone, Debug, Default)]
pub struct ParentWithChild {
  pub kind: String,
  pub child: Option<ContextData<ChildContext>>,
  pub log: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct ChildContext {
  pub reserved: bool,
  pub released: bool,
  pub fail_late: bool,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  /// `FlowError` is not `Clone`/`Eq`; keep its debug rendering.
  #[error("Flow framework error: {0}")]
  Flow(String),

  #[error("Test handler failed: {0}")]
  Handler(String),

  #[error("Test compensation failed: {0}")]
  Compensation(String),
}

impl From<FlowError> for TestError {
  fn from(fe: FlowError) -> Self {
    TestError::Flow(format!("{:?}", fe))
  }
}

pub fn create_simple_handler(step_name: &'static str, message_to_append: &'static str) -> Handler<TestContext, TestError> {
  Box::new(move |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.counter += 1;
      guard.message.push_str(message_to_append);
      guard.steps_executed.push(step_name.to_string());
      tracing::debug!(target: "test_handlers", step = %step_name, counter = guard.counter, "executed");
      if guard.should_stop_at.as_deref() == Some(step_name) {
        return Ok(PipelineControl::Stop);
      }
      Ok(PipelineControl::Continue)
    })
  })
}

pub fn create_failing_handler(step_name: &'static str, error_message: &'static str) -> Handler<TestContext, TestError> {
  Box::new(move |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.write().steps_executed.push(step_name.to_string());
      tracing::warn!(target: "test_handlers", step = %step_name, "failing with: '{}'", error_message);
      Err(TestError::Handler(error_message.to_string()))
    })
  })
}

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

pub static HANDLER_EXEC_COUNTER: Lazy<Arc<AtomicUsize>> = Lazy::new(|| Arc::new(AtomicUsize::new(0)));
pub static SCOPED_A_EXEC_COUNTER: Lazy<Arc<AtomicUsize>> = Lazy::new(|| Arc::new(AtomicUsize::new(0)));
pub static SCOPED_B_EXEC_COUNTER: Lazy<Arc<AtomicUsize>> = Lazy::new(|| Arc::new(AtomicUsize::new(0)));
pub static PROVIDER_EXEC_COUNTER: Lazy<Arc<AtomicUsize>> = Lazy::new(|| Arc::new(AtomicUsize::new(0)));

pub fn reset_counters() {
  HANDLER_EXEC_COUNTER.store(0, Ordering::SeqCst);
  SCOPED_A_EXEC_COUNTER.store(0, Ordering::SeqCst);
  SCOPED_B_EXEC_COUNTER.store(0, Ordering::SeqCst);
  PROVIDER_EXEC_COUNTER.store(0, Ordering::SeqCst);
}
