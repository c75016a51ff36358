/*!
 * Temporary visibility with guaranteed restoration.
 *
 * Auto-captioning does not run on private videos, so a private upload is
 * flipped to a captionable state for the duration of the caption poll and
 * flipped back afterwards. `VisibilityGuard` owns that restoration: call
 * `restore()` on the normal path; if the guard is dropped without it (an
 * early return or a panic in the bracketed work), `Drop` schedules the
 * restore on the current tokio runtime.
 */

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::future::Future;
use std::sync::Arc;

use crate::errors::PipelineError;
use crate::platform::{ResourceStateService, Visibility, VisibilityState};

/// Scoped temporary visibility for one resource
#[derive(Debug)]
pub struct VisibilityGuard {
    service: Arc<dyn ResourceStateService>,
    resource_id: String,
    original: Visibility,
    restore_to: Visibility,
    changed: bool,
    released: bool,
}

impl VisibilityGuard {
    /// Read the current visibility and move to `desired` if the resource is private.
    ///
    /// `restore_publish_at` overrides the schedule captured before the change.
    pub async fn acquire(
        service: Arc<dyn ResourceStateService>,
        resource_id: &str,
        desired: VisibilityState,
        restore_publish_at: Option<DateTime<Utc>>,
    ) -> Result<Self, PipelineError> {
        if !desired.allows_captioning() {
            return Err(PipelineError::InvalidPolicy(format!(
                "temporary visibility must allow captioning, got {}",
                desired
            )));
        }

        let original = service.get_visibility(resource_id).await?;
        let restore_to = Visibility::scheduled(
            original.state,
            restore_publish_at.or(original.publish_at),
        );

        let mut guard = Self {
            service,
            resource_id: resource_id.to_string(),
            original,
            restore_to,
            changed: false,
            released: false,
        };

        if original.state.allows_captioning() {
            debug!("{} is already {}; leaving visibility alone", resource_id, original.state);
            return Ok(guard);
        }

        info!("Temporarily setting {} to {} for caption generation", resource_id, desired);
        guard.service.set_visibility(resource_id, desired, None).await?;
        guard.changed = true;
        Ok(guard)
    }

    /// Visibility observed before any change
    pub fn original(&self) -> Visibility {
        self.original
    }

    /// Whether `acquire` changed the resource
    pub fn changed(&self) -> bool {
        self.changed
    }

    /// Put the original state back. Failures are logged, never returned.
    pub async fn restore(mut self) {
        self.released = true;
        if !self.changed {
            return;
        }
        restore_visibility(self.service.clone(), self.resource_id.clone(), self.restore_to).await;
    }
}

impl Drop for VisibilityGuard {
    fn drop(&mut self) {
        if self.released || !self.changed {
            return;
        }

        let service = self.service.clone();
        let resource_id = std::mem::take(&mut self.resource_id);
        let restore_to = self.restore_to;

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!("Visibility guard for {} dropped without restore; restoring in background", resource_id);
                handle.spawn(restore_visibility(service, resource_id, restore_to));
            }
            Err(_) => {
                warn!(
                    "Visibility guard for {} dropped outside a runtime; {} must be restored manually",
                    resource_id, restore_to.state
                );
            }
        }
    }
}

async fn restore_visibility(
    service: Arc<dyn ResourceStateService>,
    resource_id: String,
    restore_to: Visibility,
) {
    match service
        .set_visibility(&resource_id, restore_to.state, restore_to.publish_at)
        .await
    {
        Ok(()) => info!("Restored {} to {}", resource_id, restore_to.state),
        Err(e) => warn!("Failed to restore visibility of {} to {}: {}", resource_id, restore_to.state, e),
    }
}

/// Run `inner` with the resource temporarily in `desired` state.
///
/// The original visibility is restored whether `inner` succeeds or fails.
pub async fn with_temporary_visibility<F, Fut, T>(
    service: Arc<dyn ResourceStateService>,
    resource_id: &str,
    desired: VisibilityState,
    restore_publish_at: Option<DateTime<Utc>>,
    inner: F,
) -> Result<T, PipelineError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, PipelineError>>,
{
    let guard = VisibilityGuard::acquire(service, resource_id, desired, restore_publish_at).await?;
    let result = inner().await;
    guard.restore().await;
    result
}
