/*!
 * Caption lifecycle building blocks.
 *
 * - `visibility`: scoped temporary visibility with guaranteed restoration
 * - `poller`: bounded-wait polling for an auto-generated caption track
 */

pub mod poller;
pub mod visibility;

pub use poller::{CaptionPoller, PollOutcome, RetryPolicy};
pub use visibility::{VisibilityGuard, with_temporary_visibility};
