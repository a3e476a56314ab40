use crate::crawler::Crawler;
use crate::model::PropertyBag;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// One stage of the processing pipeline
///
/// Steps run in order over each downloaded [`PropertyBag`]. A step may read the
/// body, annotate the bag for later steps, and enqueue new URLs through the
/// [`Crawler`] handle.
#[async_trait]
pub trait PipelineStep: Send + Sync {
    async fn process(&self, crawler: &Crawler, bag: &PropertyBag) -> anyhow::Result<()>;

    /// Deadline for one `process` call; the step is abandoned if it overruns
    fn processor_timeout(&self) -> Option<Duration> {
        None
    }

    /// Name used in logs and processor-exception events
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// A pipeline step backed by a closure
pub struct FnStep<F> {
    name: String,
    action: F,
    timeout: Option<Duration>,
}

impl<F> FnStep<F>
where
    F: Fn(&Crawler, &PropertyBag) -> anyhow::Result<()> + Send + Sync,
{
    pub fn new(name: impl Into<String>, action: F) -> Self {
        Self {
            name: name.into(),
            action,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl<F> PipelineStep for FnStep<F>
where
    F: Fn(&Crawler, &PropertyBag) -> anyhow::Result<()> + Send + Sync,
{
    async fn process(&self, crawler: &Crawler, bag: &PropertyBag) -> anyhow::Result<()> {
        (self.action)(crawler, bag)
    }

    fn processor_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<F> fmt::Debug for FnStep<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStep")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .finish()
    }
}
