//! Sequential execution of pipeline steps

use crate::crawler::{CrawlObserver, Crawler};
use crate::model::PropertyBag;
use crate::pipeline::PipelineStep;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How a single step run ended
#[derive(Debug)]
pub enum StepOutcome {
    Completed,
    TimedOut(Duration),
    Failed(anyhow::Error),
}

/// Runs the configured steps, one after another, over each bag
///
/// A failing, panicking or overrunning step never stops the steps after it.
#[derive(Clone, Default)]
pub struct PipelineRunner {
    steps: Vec<Arc<dyn PipelineStep>>,
}

impl PipelineRunner {
    pub fn new(steps: Vec<Arc<dyn PipelineStep>>) -> Self {
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs every step over `bag`, reporting failures to `observer`
    ///
    /// # Returns
    ///
    /// The outcome of each step, in pipeline order
    pub async fn run(
        &self,
        crawler: &Crawler,
        bag: &PropertyBag,
        observer: &dyn CrawlObserver,
    ) -> Vec<StepOutcome> {
        let mut outcomes = Vec::with_capacity(self.steps.len());

        for step in &self.steps {
            let started = Instant::now();
            let outcome = run_step(step.as_ref(), crawler, bag).await;

            match &outcome {
                StepOutcome::Completed => tracing::debug!(
                    "Step {} finished {} in {:?}",
                    step.name(),
                    bag.step().url(),
                    started.elapsed()
                ),
                StepOutcome::TimedOut(limit) => tracing::warn!(
                    "Step {} abandoned {} after {:?}",
                    step.name(),
                    bag.step().url(),
                    limit
                ),
                StepOutcome::Failed(error) => {
                    observer.processor_exception(bag, step.name(), error);
                }
            }

            outcomes.push(outcome);
        }

        outcomes
    }
}

async fn run_step(step: &dyn PipelineStep, crawler: &Crawler, bag: &PropertyBag) -> StepOutcome {
    let work = AssertUnwindSafe(step.process(crawler, bag)).catch_unwind();

    let result = match step.processor_timeout() {
        Some(limit) => match tokio::time::timeout(limit, work).await {
            Ok(result) => result,
            Err(_) => return StepOutcome::TimedOut(limit),
        },
        None => work.await,
    };

    match result {
        Ok(Ok(())) => StepOutcome::Completed,
        Ok(Err(error)) => StepOutcome::Failed(error),
        Err(panic) => StepOutcome::Failed(anyhow::anyhow!(
            "step panicked: {}",
            panic_message(panic.as_ref())
        )),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
