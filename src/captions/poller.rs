/*!
 * Bounded-wait polling for an asynchronously produced caption track.
 */

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::PipelineError;
use crate::platform::{CaptionService, CaptionTrackRef, TrackKindFilter};

/// Fixed-interval polling budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total time budget
    pub max_wait: Duration,
    /// Delay between queries
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(600), Duration::from_secs(30))
    }
}

impl RetryPolicy {
    pub fn new(max_wait: Duration, interval: Duration) -> Self {
        Self { max_wait, interval }
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.interval.is_zero() {
            return Err(PipelineError::InvalidPolicy("polling interval must be greater than zero".to_string()));
        }
        Ok(())
    }

    /// Upper bound on queries: `ceil(max_wait / interval)`
    pub fn max_attempts(&self) -> u32 {
        if self.interval.is_zero() {
            return 0;
        }
        let wait = self.max_wait.as_millis();
        let step = self.interval.as_millis();
        wait.div_ceil(step) as u32
    }
}

/// Result of a bounded poll
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Found(CaptionTrackRef),
    NotFound {
        /// Queries issued
        attempts: u32,
        /// Simulated or real time spent waiting
        waited: Duration,
    },
}

impl PollOutcome {
    pub fn track(&self) -> Option<&CaptionTrackRef> {
        match self {
            Self::Found(track) => Some(track),
            Self::NotFound { .. } => None,
        }
    }
}

/// Polls the caption listing until a matching track appears
#[derive(Debug, Clone)]
pub struct CaptionPoller {
    service: Arc<dyn CaptionService>,
    show_progress: bool,
}

impl CaptionPoller {
    pub fn new(service: Arc<dyn CaptionService>) -> Self {
        Self { service, show_progress: false }
    }

    /// Show a spinner while waiting
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    fn spinner(&self) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner
    }

    /// Query until a track with `language_tag` and an accepted kind appears,
    /// or until `policy.max_wait` has been spent waiting.
    ///
    /// Query failures are logged and retried on the next tick, except
    /// authorization failures, which end the poll immediately.
    pub async fn poll_until_found(
        &self,
        resource_id: &str,
        language_tag: &str,
        kind_filter: TrackKindFilter,
        policy: &RetryPolicy,
    ) -> Result<PollOutcome, PipelineError> {
        policy.validate()?;

        let spinner = self.spinner();
        let mut elapsed = Duration::ZERO;
        let mut attempts = 0u32;

        while elapsed < policy.max_wait {
            attempts += 1;
            spinner.set_message(format!(
                "Waiting for {} captions on {} (attempt {}/{})",
                language_tag, resource_id, attempts, policy.max_attempts()
            ));

            match self.service.list_tracks(resource_id).await {
                Ok(tracks) => {
                    let mut candidates = tracks
                        .into_iter()
                        .filter(|t| t.language_tag == language_tag && kind_filter.accepts(t.kind));

                    if let Some(track) = candidates.next() {
                        let others = candidates.count();
                        if others > 0 {
                            warn!("{} more matching {} tracks on {}; using {}", others, language_tag, resource_id, track.track_id);
                        }
                        spinner.finish_and_clear();
                        info!("Found {} caption track {} after {} attempt(s)", language_tag, track.track_id, attempts);
                        return Ok(PollOutcome::Found(track));
                    }
                    debug!("No {} track on {} yet", language_tag, resource_id);
                }
                Err(e) if e.is_authorization() => {
                    spinner.abandon();
                    return Err(e.into());
                }
                Err(e) => {
                    warn!("Caption query for {} failed (attempt {}): {}", resource_id, attempts, e);
                }
            }

            let wait = policy.interval.min(policy.max_wait - elapsed);
            tokio::time::sleep(wait).await;
            elapsed += wait;
        }

        spinner.finish_and_clear();
        warn!(
            "No {} captions on {} after {}s ({} attempts)",
            language_tag, resource_id, elapsed.as_secs(), attempts
        );
        Ok(PollOutcome::NotFound { attempts, waited: elapsed })
    }
}
