// payhula-flow/src/conditional/provider.rs

//! Sources of the scoped `Arc<Pipeline<SData, Err>>` executed by a conditional scope.

use crate::core::context_data::ContextData;
use crate::error::FlowError;
use crate::pipeline::Pipeline;
use async_trait::async_trait;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Provides the pipeline a conditional scope runs.
///
/// The provider's own failure is a framework-level `FlowError`; the scope
/// converts it into `Err`.
#[async_trait]
pub trait PipelineProvider<TData, SData, Err>: Send + Sync + 'static
where
  TData: 'static + Send + Sync,
  SData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  async fn get_pipeline(&self, main_ctx_data: ContextData<TData>) -> Result<Arc<Pipeline<SData, Err>>, FlowError>;
}

/// Hands out one pipeline built up front.
pub struct StaticPipelineProvider<SData, Err>
where
  SData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pipeline: Arc<Pipeline<SData, Err>>,
}

impl<SData, Err> StaticPipelineProvider<SData, Err>
where
  SData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn new(pipeline: Arc<Pipeline<SData, Err>>) -> Self {
    Self { pipeline }
  }
}

#[async_trait]
impl<TData, SData, Err> PipelineProvider<TData, SData, Err> for StaticPipelineProvider<SData, Err>
where
  TData: 'static + Send + Sync,
  SData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  async fn get_pipeline(&self, _main_ctx_data: ContextData<TData>) -> Result<Arc<Pipeline<SData, Err>>, FlowError> {
    Ok(self.pipeline.clone())
  }
}

/// Builds the pipeline on demand with an async factory that sees the main context.
pub struct FunctionalPipelineProvider<TData, SData, Err, F, Fut>
where
  TData: 'static + Send + Sync,
  SData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
  F: Fn(ContextData<TData>) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<Arc<Pipeline<SData, Err>>, FlowError>> + Send + 'static,
{
  factory: F,
  _phantom: PhantomData<fn() -> (TData, SData, Err)>,
}

impl<TData, SData, Err, F, Fut> FunctionalPipelineProvider<TData, SData, Err, F, Fut>
where
  TData: 'static + Send + Sync,
  SData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
  F: Fn(ContextData<TData>) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<Arc<Pipeline<SData, Err>>, FlowError>> + Send + 'static,
{
  pub fn new(factory: F) -> Self {
    Self {
      factory,
      _phantom: PhantomData,
    }
  }
}

#[async_trait]
impl<TData, SData, Err, F, Fut> PipelineProvider<TData, SData, Err> for FunctionalPipelineProvider<TData, SData, Err, F, Fut>
where
  TData: 'static + Send + Sync,
  SData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
  F: Fn(ContextData<TData>) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<Arc<Pipeline<SData, Err>>, FlowError>> + Send + 'static,
{
  async fn get_pipeline(&self, main_ctx_data: ContextData<TData>) -> Result<Arc<Pipeline<SData, Err>>, FlowError> {
    let sdata_type_name = std::any::type_name::<SData>();
    (self.factory)(main_ctx_data)
      .await
      .map_err(|factory_err| FlowError::PipelineProviderFailure {
        step_name: format!("functional_provider_for_{}", sdata_type_name),
        source: anyhow::anyhow!("Factory for SData='{}' failed: {}", sdata_type_name, factory_err),
      })
  }
}
