// payhula-flow/src/pipeline/execution.rs

//! `Pipeline::run()`: step execution, best-effort steps and compensation unwinding.

use crate::core::context::Handler;
use crate::core::context_data::ContextData;
use crate::core::control::{PipelineControl, PipelineResult};
use crate::core::step::StepDef;
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;
use tracing::{event, instrument, span, Instrument, Level};

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Executes the pipeline against `ctx_data`.
  ///
  /// On the first failing mandatory step, every compensation armed so far is
  /// run in reverse order and the step's error is returned unchanged.
  /// Failures in optional steps are logged and skipped.
  #[instrument(
        name = "Pipeline::run",
        skip_all,
        fields(
            pipeline_context_data_type = %std::any::type_name::<TData>(),
            num_steps = self.steps.len(),
        ),
        err(Display)
    )]
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    event!(Level::DEBUG, "Pipeline execution starting.");
    let mut armed: Vec<&str> = Vec::new();

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_span = span!(
        Level::INFO,
        "pipeline_step",
        step_name = step_def.name.as_str(),
        step_index = step_idx,
        optional = step_def.optional
      );

      let outcome = self
        .run_step(step_def, ctx_data.clone(), &mut armed)
        .instrument(step_span)
        .await;

      match outcome {
        Ok(PipelineControl::Continue) => {}
        Ok(PipelineControl::Stop) => {
          event!(Level::INFO, step_name = %step_def.name, "Pipeline stopped by a handler.");
          return Ok(PipelineResult::Stopped);
        }
        Err(e) if step_def.optional => {
          event!(Level::WARN, step_name = %step_def.name, error = %e, "Optional step failed, continuing.");
        }
        Err(e) => {
          event!(Level::ERROR, step_name = %step_def.name, error = %e, "Step failed, unwinding.");
          let failed = self.unwind(&armed, ctx_data.clone()).await;
          if failed > 0 {
            event!(Level::ERROR, failed, armed = armed.len(), "Unwind finished with failed compensations.");
          }
          return Err(e);
        }
      }
    }

    event!(Level::DEBUG, "Pipeline execution completed successfully.");
    Ok(PipelineResult::Completed)
  }

  async fn run_step<'a>(
    &'a self,
    step_def: &'a StepDef<TData>,
    ctx_data: ContextData<TData>,
    armed: &mut Vec<&'a str>,
  ) -> Result<PipelineControl, Err> {
    let step_name = step_def.name.as_str();

    if let Some(skip_cond_fn) = &step_def.skip_if {
      if skip_cond_fn(ctx_data.clone()) {
        event!(Level::INFO, "Step skipped due to 'skip_if' condition.");
        return Ok(PipelineControl::Continue);
      }
    }

    let has_handlers = [&self.before, &self.on, &self.after]
      .iter()
      .any(|phase| phase.get(step_name).is_some_and(|v| !v.is_empty()));

    if !has_handlers {
      if step_def.optional {
        event!(Level::DEBUG, "Optional step has no handlers, skipping.");
        return Ok(PipelineControl::Continue);
      }
      event!(Level::ERROR, "Non-optional step has no handlers.");
      return Err(Err::from(FlowError::HandlerMissing {
        step_name: step_def.name.clone(),
      }));
    }

    if self.compensations.get(step_name).is_some_and(|c| !c.is_empty()) {
      armed.push(step_name);
      event!(Level::TRACE, "Compensation armed.");
    }

    for (phase, handlers) in [("before", &self.before), ("on", &self.on), ("after", &self.after)] {
      if let Some(handlers) = handlers.get(step_name) {
        if Self::run_phase(phase, handlers, &ctx_data).await? == PipelineControl::Stop {
          return Ok(PipelineControl::Stop);
        }
      }
    }

    event!(Level::DEBUG, "Step processing finished successfully.");
    Ok(PipelineControl::Continue)
  }

  async fn run_phase(
    phase: &'static str,
    handlers: &[Handler<TData, Err>],
    ctx_data: &ContextData<TData>,
  ) -> Result<PipelineControl, Err> {
    for (handler_idx, handler_fn) in handlers.iter().enumerate() {
      let handler_span = span!(Level::DEBUG, "handler", phase, handler_index = handler_idx);
      match handler_fn(ctx_data.clone()).instrument(handler_span).await {
        Ok(PipelineControl::Continue) => {}
        Ok(PipelineControl::Stop) => return Ok(PipelineControl::Stop),
        Err(e) => {
          event!(Level::DEBUG, phase, error = %e, "Handler failed.");
          return Err(e);
        }
      }
    }
    Ok(PipelineControl::Continue)
  }

  /// Runs the armed compensations last-armed first. Returns how many failed.
  async fn unwind(&self, armed: &[&str], ctx_data: ContextData<TData>) -> usize {
    let mut failures = 0;
    for step_name in armed.iter().rev() {
      let Some(compensations) = self.compensations.get(*step_name) else {
        continue;
      };
      for compensation in compensations.iter().rev() {
        match compensation(ctx_data.clone()).await {
          Ok(()) => event!(Level::INFO, %step_name, "Compensation applied."),
          Err(e) => {
            failures += 1;
            event!(Level::WARN, %step_name, error = %e, "Compensation failed, continuing unwind.");
          }
        }
      }
    }
    failures
  }
}
