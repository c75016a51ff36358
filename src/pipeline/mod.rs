/*!
 * Caption lifecycle pipeline.
 *
 * `coordinator` sequences the stages; `stages` holds the per-stage outcome
 * types and the run report.
 */

pub mod coordinator;
pub mod stages;

pub use coordinator::{CaptionSettings, PipelineCoordinator, PipelineServices, RunContext, RunStart};
pub use stages::{PipelineReport, Stage, StageOutcome};
