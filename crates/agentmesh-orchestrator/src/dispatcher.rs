//! Concurrent fan-out of a plan over the registry.

use crate::registry::ProviderRegistry;
use crate::types::{ExecutionReport, Plan, PlanStep, StepResult};
use agentmesh_core::MeshError;
use futures_util::future::join_all;
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Runs every step of a plan at once and collects an aligned report.
///
/// Steps are independent at invocation time: `sequence_id` and `depends_on`
/// are logged but never delay a step.
pub struct Dispatcher {
    registry: Arc<ProviderRegistry>,
    invoke_timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self {
            registry,
            invoke_timeout: None,
        }
    }

    /// Bounds every `invoke`; `None` waits indefinitely.
    pub fn with_invoke_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.invoke_timeout = timeout;
        self
    }

    pub async fn execute(&self, plan: Plan) -> ExecutionReport {
        let start = Instant::now();
        let steps = plan.into_steps();
        info!(steps = steps.len(), "Dispatching plan");

        let runs = steps.into_iter().map(|step| {
            let provider_name = step.provider_name.clone();
            AssertUnwindSafe(self.run_step(step))
                .catch_unwind()
                .map(move |outcome| {
                    outcome.unwrap_or_else(|panic| {
                        let reason = panic_message(panic.as_ref());
                        warn!(provider = %provider_name, reason = %reason, "Step panicked");
                        StepResult::failure(provider_name, format!("invocation panicked: {reason}"))
                    })
                })
                .boxed()
        });
        let results = join_all(runs).await;

        let report = ExecutionReport::new(results);
        info!(
            steps = report.len(),
            failed = report.failed_count(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Plan dispatched"
        );
        report
    }

    async fn run_step(&self, step: PlanStep) -> StepResult {
        debug!(
            sequence_id = step.sequence_id,
            provider = %step.provider_name,
            target = %step.target,
            depends_on = ?step.depends_on,
            "Running step"
        );

        let provider = match self.registry.get(&step.provider_name).await {
            Ok(provider) => provider,
            Err(e) => {
                warn!(provider = %step.provider_name, "Step references an unknown provider");
                return StepResult::failure(step.provider_name, e.to_string());
            }
        };

        let call = provider.invoke(&step.input, &step.target, &step.context);
        let outcome = match self.invoke_timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.unwrap_or_else(|_| {
                Err(MeshError::invoke(
                    &step.provider_name,
                    format!("timed out after {}s", limit.as_secs()),
                ))
            }),
            None => call.await,
        };

        match outcome {
            Ok(payload) => StepResult::success(step.provider_name, payload),
            Err(e) => {
                warn!(
                    sequence_id = step.sequence_id,
                    provider = %step.provider_name,
                    error = %e,
                    "Step failed"
                );
                let payload = match e {
                    MeshError::InvokeFailed { reason, .. } => reason,
                    other => other.to_string(),
                };
                StepResult::failure(step.provider_name, payload)
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
