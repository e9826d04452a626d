// payhula-flow/src/conditional/builder.rs

//! Fluent builder for conditional scopes on one step of a `Pipeline<TData, Err>`.
//!
//! ```ignore
//! pipeline
//!   .conditional_scopes_for_step("route")
//!   .add_static_scope(digital_pipeline, |ctx| extract_digital(ctx))
//!   .on_condition(|ctx| ctx.read().kind == Kind::Digital)
//!   .add_static_scope(generic_pipeline, |ctx| extract_generic(ctx))
//!   .on_condition(|_| true)
//!   .require_match()
//!   .finalize_conditional_step(false);
//! ```

use crate::conditional::provider::{FunctionalPipelineProvider, PipelineProvider, StaticPipelineProvider};
use crate::conditional::scope::{AnyConditionalScope, ConditionalScope, Extractor};
use crate::core::context::Handler;
use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use crate::error::FlowError;
use crate::pipeline::Pipeline;

use std::future::Future;
use std::sync::Arc;
use tracing::{event, instrument, Level};

pub struct ConditionalScopeBuilder<'pipeline, TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pipeline: &'pipeline mut Pipeline<TData, Err>,
  step_name: String,
  collected_scopes: Vec<Arc<dyn AnyConditionalScope<TData, Err>>>,
  /// `None` turns "no scope matched" into `FlowError::NoConditionalScopeMatched`.
  on_no_match: Option<PipelineControl>,
}

impl<'pipeline, TData, Err> ConditionalScopeBuilder<'pipeline, TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) fn new(pipeline: &'pipeline mut Pipeline<TData, Err>, step_name: String) -> Self {
    Self {
      pipeline,
      step_name,
      collected_scopes: Vec::new(),
      on_no_match: Some(PipelineControl::Continue),
    }
  }

  /// Adds a scope running a pipeline built up front.
  pub fn add_static_scope<SData>(
    self,
    static_pipeline: Arc<Pipeline<SData, Err>>,
    extractor_fn: impl Fn(ContextData<TData>) -> Result<ContextData<SData>, FlowError> + Send + Sync + 'static,
  ) -> ConditionalScopeConfigurator<'pipeline, TData, SData, Err>
  where
    SData: 'static + Send + Sync,
  {
    ConditionalScopeConfigurator {
      builder: self,
      provider: Arc::new(StaticPipelineProvider::new(static_pipeline)),
      extractor: Arc::new(extractor_fn),
    }
  }

  /// Adds a scope whose pipeline is produced by an async factory at run time.
  pub fn add_dynamic_scope<SData, F, Fut>(
    self,
    pipeline_factory: F,
    extractor_fn: impl Fn(ContextData<TData>) -> Result<ContextData<SData>, FlowError> + Send + Sync + 'static,
  ) -> ConditionalScopeConfigurator<'pipeline, TData, SData, Err>
  where
    SData: 'static + Send + Sync,
    F: Fn(ContextData<TData>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Arc<Pipeline<SData, Err>>, FlowError>> + Send + 'static,
  {
    ConditionalScopeConfigurator {
      builder: self,
      provider: Arc::new(FunctionalPipelineProvider::new(pipeline_factory)),
      extractor: Arc::new(extractor_fn),
    }
  }

  pub fn if_no_scope_matches(mut self, behavior: PipelineControl) -> Self {
    self.on_no_match = Some(behavior);
    self
  }

  /// Makes an unmatched context a hard failure of the step.
  pub fn require_match(mut self) -> Self {
    self.on_no_match = None;
    self
  }

  #[instrument(
        name = "ConditionalScopeBuilder::finalize_conditional_step",
        skip_all,
        fields(step_name = %self.step_name, num_scopes = self.collected_scopes.len())
    )]
  pub fn finalize_conditional_step(self, optional: bool) {
    let scopes = Arc::new(self.collected_scopes);
    let on_no_match = self.on_no_match;
    let step_name = self.step_name.clone();

    let master_handler: Handler<TData, Err> = Box::new(move |main_ctx_data: ContextData<TData>| {
      let scopes = scopes.clone();
      let step_name = step_name.clone();
      Box::pin(async move {
        for scope in scopes.iter() {
          if scope.is_condition_met(main_ctx_data.clone()) {
            event!(Level::DEBUG, %step_name, "Conditional scope matched. Executing.");
            return scope.execute_scoped_pipeline(main_ctx_data.clone()).await;
          }
        }
        match on_no_match {
          Some(control) => {
            event!(Level::DEBUG, %step_name, "No conditional scope matched. Defaulting to {:?}.", control);
            Ok(control)
          }
          None => Err(Err::from(FlowError::NoConditionalScopeMatched { step_name })),
        }
      })
    });

    self.pipeline.set_optional(&self.step_name, optional);
    self.pipeline.on.insert(self.step_name.clone(), vec![master_handler]);
    event!(Level::INFO, step_name = %self.step_name, "Conditional scopes finalized.");
  }
}

/// Configures one scope; finished by `on_condition`.
pub struct ConditionalScopeConfigurator<'pipeline, TData, SData, Err>
where
  TData: 'static + Send + Sync,
  SData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  builder: ConditionalScopeBuilder<'pipeline, TData, Err>,
  provider: Arc<dyn PipelineProvider<TData, SData, Err>>,
  extractor: Extractor<TData, SData>,
}

impl<'pipeline, TData, SData, Err> ConditionalScopeConfigurator<'pipeline, TData, SData, Err>
where
  TData: 'static + Send + Sync,
  SData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn on_condition(
    mut self,
    condition_fn: impl Fn(ContextData<TData>) -> bool + Send + Sync + 'static,
  ) -> ConditionalScopeBuilder<'pipeline, TData, Err> {
    let scope = ConditionalScope::<TData, SData, Err> {
      step_name: self.builder.step_name.clone(),
      pipeline_provider: self.provider,
      extractor: self.extractor,
      condition: Arc::new(condition_fn),
    };
    self.builder.collected_scopes.push(Arc::new(scope));
    self.builder
  }
}
