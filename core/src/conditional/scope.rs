// payhula-flow/src/conditional/scope.rs

//! One conditional branch (`ConditionalScope`) and its type-erased form.

use crate::conditional::provider::PipelineProvider;
use crate::core::context_data::ContextData;
use crate::core::control::{PipelineControl, PipelineResult};
use crate::error::FlowError;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{event, instrument, Level};

pub(crate) type Extractor<TData, SData> =
  Arc<dyn Fn(ContextData<TData>) -> Result<ContextData<SData>, FlowError> + Send + Sync + 'static>;

pub(crate) type Condition<TData> = Arc<dyn Fn(ContextData<TData>) -> bool + Send + Sync + 'static>;

pub(crate) struct ConditionalScope<TData, SData, Err>
where
  TData: 'static + Send + Sync,
  SData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) step_name: String,
  pub(crate) pipeline_provider: Arc<dyn PipelineProvider<TData, SData, Err>>,
  pub(crate) extractor: Extractor<TData, SData>,
  pub(crate) condition: Condition<TData>,
}

/// Lets scopes over different `SData` types live in one list.
#[async_trait]
pub(crate) trait AnyConditionalScope<TData, Err>: Send + Sync
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn is_condition_met(&self, main_ctx_data: ContextData<TData>) -> bool;

  /// Gets the scoped pipeline, extracts its context and runs it.
  /// A scoped `Stop` becomes `PipelineControl::Stop` for the main pipeline.
  async fn execute_scoped_pipeline(&self, main_ctx_data: ContextData<TData>) -> Result<PipelineControl, Err>;
}

#[async_trait]
impl<TData, SData, Err> AnyConditionalScope<TData, Err> for ConditionalScope<TData, SData, Err>
where
  TData: 'static + Send + Sync,
  SData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn is_condition_met(&self, main_ctx_data: ContextData<TData>) -> bool {
    (self.condition)(main_ctx_data)
  }

  #[instrument(
        name = "ConditionalScope::execute_scoped_pipeline",
        skip(self, main_ctx_data),
        fields(
            step_name = %self.step_name,
            scoped_context_data_type = %std::any::type_name::<SData>(),
        ),
        err(Display)
    )]
  async fn execute_scoped_pipeline(&self, main_ctx_data: ContextData<TData>) -> Result<PipelineControl, Err> {
    let scoped_pipeline = self
      .pipeline_provider
      .get_pipeline(main_ctx_data.clone())
      .await
      .map_err(|provider_err| {
        event!(Level::ERROR, error = %provider_err, "Failed to get pipeline from provider.");
        let enriched = match provider_err {
          FlowError::HandlerError { source } | FlowError::PipelineProviderFailure { source, .. } => {
            FlowError::PipelineProviderFailure {
              step_name: self.step_name.clone(),
              source,
            }
          }
          other => other,
        };
        Err::from(enriched)
      })?;

    let sub_ctx_data = (self.extractor)(main_ctx_data).map_err(|extractor_err| {
      event!(Level::ERROR, error = %extractor_err, "Sub-context extractor failed.");
      let enriched = match extractor_err {
        FlowError::HandlerError { source } | FlowError::ExtractorFailure { source, .. } => FlowError::ExtractorFailure {
          step_name: self.step_name.clone(),
          source,
        },
        other => other,
      };
      Err::from(enriched)
    })?;

    event!(Level::DEBUG, "Running scoped pipeline.");
    match scoped_pipeline.run(sub_ctx_data).await? {
      PipelineResult::Completed => Ok(PipelineControl::Continue),
      PipelineResult::Stopped => {
        event!(Level::INFO, "Scoped pipeline was stopped by one of its handlers.");
        Ok(PipelineControl::Stop)
      }
    }
  }
}
