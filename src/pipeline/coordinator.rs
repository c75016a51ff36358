/*!
 * Stage sequencing for one song.
 *
 * ImagePrep -> VideoAssembly -> Upload -> CaptionPoll (inside a
 * `VisibilityGuard`) -> Download -> Regenerate -> ReUpload.
 *
 * Every stage feeds the next one; when a stage leaves nothing usable the
 * remaining stages are reported as skipped instead of running against
 * missing inputs.
 */

use bytes::Bytes;
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::stages::{PipelineReport, Stage, StageOutcome};
use crate::captions::{CaptionPoller, PollOutcome, RetryPolicy, with_temporary_visibility};
use crate::file_utils::{FileManager, RunPaths};
use crate::media::{ImagePreparer, VideoAssembler};
use crate::metadata::Metadata;
use crate::platform::{
    CaptionService, CaptionTrackRef, ResourceStateService, TrackKindFilter, VideoPublishService,
    VisibilityState,
};
use crate::regeneration::RegenerationOrchestrator;
use crate::subtitle_processor::{SrtCanonicalizer, SubtitleDocument};

/// Where a run begins
#[derive(Debug, Clone, PartialEq)]
pub enum RunStart {
    /// Build and upload a video from these inputs
    FromMedia { image: PathBuf, audio: PathBuf },
    /// Work on an already uploaded video
    ExistingVideo { video_id: String },
}

/// Inputs shared by all stages of one run
#[derive(Debug, Clone)]
pub struct RunContext {
    pub paths: RunPaths,
    pub start: RunStart,
    pub metadata: Metadata,
    /// Output file stem (`<stem>.auto.<lang>.srt`)
    pub stem: String,
    /// Lyrics with meaning; the rewrite is skipped without it
    pub reference_text: Option<String>,
    pub rule_text: String,
}

impl RunContext {
    pub fn from_media(paths: RunPaths, image: PathBuf, audio: PathBuf, metadata: Metadata) -> Self {
        let stem = FileManager::stem_of(&audio, "captions");
        Self {
            paths,
            start: RunStart::FromMedia { image, audio },
            metadata,
            stem,
            reference_text: None,
            rule_text: String::new(),
        }
    }

    pub fn existing_video(paths: RunPaths, video_id: impl Into<String>, metadata: Metadata) -> Self {
        let video_id = video_id.into();
        Self {
            paths,
            stem: video_id.clone(),
            start: RunStart::ExistingVideo { video_id },
            metadata,
            reference_text: None,
            rule_text: String::new(),
        }
    }

    pub fn with_stem(mut self, stem: impl Into<String>) -> Self {
        self.stem = stem.into();
        self
    }

    pub fn with_reference(mut self, reference_text: Option<String>, rule_text: impl Into<String>) -> Self {
        self.reference_text = reference_text.filter(|t| !t.trim().is_empty());
        self.rule_text = rule_text.into();
        self
    }
}

/// Caption-side settings for a run
#[derive(Debug, Clone)]
pub struct CaptionSettings {
    pub language: String,
    pub track_name: String,
    pub temporary_visibility: VisibilityState,
    pub policy: RetryPolicy,
    pub kind_filter: TrackKindFilter,
}

impl Default for CaptionSettings {
    fn default() -> Self {
        Self {
            language: "te".to_string(),
            track_name: "Telugu + English Meaning".to_string(),
            temporary_visibility: VisibilityState::Unlisted,
            policy: RetryPolicy::default(),
            kind_filter: TrackKindFilter::AutoGeneratedOnly,
        }
    }
}

/// Collaborators used by the coordinator
#[derive(Debug, Clone)]
pub struct PipelineServices {
    pub image_preparer: Arc<dyn ImagePreparer>,
    pub video_assembler: Arc<dyn VideoAssembler>,
    pub publisher: Arc<dyn VideoPublishService>,
    pub resource_state: Arc<dyn ResourceStateService>,
    pub captions: Arc<dyn CaptionService>,
    /// None when no generator is configured; the rewrite is then skipped
    pub regenerator: Option<RegenerationOrchestrator>,
}

/// Runs the stages for one song
#[derive(Debug, Clone)]
pub struct PipelineCoordinator {
    services: PipelineServices,
    settings: CaptionSettings,
    show_progress: bool,
}

// Stage result: the value for the next stage, or the outcome that stops the run
type StageResult<T> = Result<(T, String), String>;

impl PipelineCoordinator {
    pub fn new(services: PipelineServices, settings: CaptionSettings) -> Self {
        Self { services, settings, show_progress: false }
    }

    /// Spinner output while polling
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Run every stage and report what happened to each
    pub async fn run(&self, ctx: &RunContext) -> PipelineReport {
        let mut report = PipelineReport::new();
        info!("Run {} started for {}", report.run_id, ctx.stem);

        let video_id = match &ctx.start {
            RunStart::ExistingVideo { video_id } => {
                for stage in [Stage::ImagePrep, Stage::VideoAssembly, Stage::Upload] {
                    report.record(stage, StageOutcome::Skipped(format!("using existing video {}", video_id)));
                }
                video_id.clone()
            }
            RunStart::FromMedia { image, audio } => {
                let prepared = ctx.paths.prepared_image(image);
                let Some(()) = Self::settle(&mut report, Stage::ImagePrep, self.image_prep(image, &prepared).await) else {
                    return report;
                };

                let video = ctx.paths.video(audio);
                let Some(()) = Self::settle(&mut report, Stage::VideoAssembly, self.assemble(&prepared, audio, &video).await) else {
                    return report;
                };

                let Some(id) = Self::settle(&mut report, Stage::Upload, self.upload(&video, &ctx.metadata).await) else {
                    return report;
                };
                id
            }
        };
        report.video_id = Some(video_id.clone());

        let Some(track) = Self::settle(&mut report, Stage::CaptionPoll, self.poll(&video_id, &ctx.metadata).await) else {
            return report;
        };

        let Some(auto_document) = Self::settle(&mut report, Stage::Download, self.download(&track).await) else {
            return report;
        };
        let auto_path = ctx.paths.auto_captions(&ctx.stem, &self.settings.language);
        match auto_document.write_to_srt(&auto_path) {
            Ok(()) => report.auto_captions_path = Some(auto_path),
            Err(e) => warn!("Could not save auto captions to {}: {}", auto_path.display(), e),
        }

        let final_document = match self.regenerate(ctx, &auto_document).await {
            Ok(Some((document, detail))) => {
                report.record(Stage::Regenerate, StageOutcome::Succeeded(detail));
                document
            }
            Ok(None) => {
                let reason = if ctx.reference_text.is_none() {
                    "no reference text"
                } else {
                    "rewrite disabled"
                };
                report.record(Stage::Regenerate, StageOutcome::Skipped(reason.to_string()));
                report.record(Stage::ReUpload, StageOutcome::Skipped("nothing regenerated".to_string()));
                return report;
            }
            Err(cause) => {
                error!("{} failed: {}", Stage::Regenerate, cause);
                report.record(Stage::Regenerate, StageOutcome::Failed(cause));
                report.skip_after(Stage::Regenerate);
                return report;
            }
        };

        let final_path = ctx.paths.final_captions(&ctx.stem, &self.settings.language);
        if let Err(e) = final_document.write_to_srt(&final_path) {
            let cause = format!("could not save {}: {}", final_path.display(), e);
            report.record(Stage::ReUpload, StageOutcome::Failed(cause));
            return report;
        }
        report.final_captions_path = Some(final_path);

        if let Some(track_id) = Self::settle(&mut report, Stage::ReUpload, self.reupload(&video_id, &final_document).await) {
            report.uploaded_track_id = Some(track_id);
        }

        info!("Run {} finished{}", report.run_id, if report.is_success() { "" } else { " with failures" });
        report
    }

    // Records the outcome; on failure also skips everything after `stage`
    fn settle<T>(report: &mut PipelineReport, stage: Stage, result: StageResult<T>) -> Option<T> {
        match result {
            Ok((value, detail)) => {
                info!("{}: {}", stage, detail);
                report.record(stage, StageOutcome::Succeeded(detail));
                Some(value)
            }
            Err(cause) => {
                error!("{} failed: {}", stage, cause);
                report.record(stage, StageOutcome::Failed(cause));
                report.skip_after(stage);
                None
            }
        }
    }

    async fn image_prep(&self, image: &Path, prepared: &Path) -> StageResult<()> {
        self.services.image_preparer
            .prepare_image(image, prepared)
            .await
            .map(|_| ((), format!("wrote {}", prepared.display())))
            .map_err(|e| format!("{:#}", e))
    }

    async fn assemble(&self, image: &Path, audio: &Path, video: &Path) -> StageResult<()> {
        self.services.video_assembler
            .assemble_video(image, audio, video)
            .await
            .map(|_| ((), format!("wrote {}", video.display())))
            .map_err(|e| format!("{:#}", e))
    }

    async fn upload(&self, video: &Path, metadata: &Metadata) -> StageResult<String> {
        let media: Bytes = FileManager::read_bytes(video).await.map_err(|e| format!("{:#}", e))?;
        let id = self.services.publisher
            .insert_video(media, metadata)
            .await
            .map_err(|e| e.to_string())?;
        Ok((id.clone(), format!("video id {}", id)))
    }

    async fn poll(&self, video_id: &str, metadata: &Metadata) -> StageResult<CaptionTrackRef> {
        let poller = CaptionPoller::new(self.services.captions.clone()).with_progress(self.show_progress);
        let poller = &poller;
        let settings = &self.settings;

        let outcome = with_temporary_visibility(
            self.services.resource_state.clone(),
            video_id,
            settings.temporary_visibility,
            metadata.restore_schedule(),
            move || async move {
                poller
                    .poll_until_found(video_id, &settings.language, settings.kind_filter, &settings.policy)
                    .await
            },
        )
        .await
        .map_err(|e| e.to_string())?;

        match outcome {
            PollOutcome::Found(track) => {
                let detail = format!("track {}", track.track_id);
                Ok((track, detail))
            }
            PollOutcome::NotFound { attempts, waited } => Err(format!(
                "no {} captions after {} attempts ({}s)",
                settings.language, attempts, waited.as_secs()
            )),
        }
    }

    async fn download(&self, track: &CaptionTrackRef) -> StageResult<SubtitleDocument> {
        let raw = self.services.captions
            .download_track(&track.track_id)
            .await
            .map_err(|e| e.to_string())?;

        let document = SrtCanonicalizer::canonicalize(&String::from_utf8_lossy(&raw));
        if document.is_empty() {
            return Err(format!("track {} has no valid cues", track.track_id));
        }
        let detail = format!("{} cues", document.len());
        Ok((document, detail))
    }

    // Ok(None) when the rewrite does not apply to this run
    async fn regenerate(
        &self,
        ctx: &RunContext,
        auto_document: &SubtitleDocument,
    ) -> Result<Option<(SubtitleDocument, String)>, String> {
        let (Some(reference), Some(regenerator)) = (&ctx.reference_text, &self.services.regenerator) else {
            return Ok(None);
        };

        let document = regenerator
            .regenerate(&auto_document.to_srt_string(), reference, &ctx.rule_text)
            .await
            .map_err(|e| e.to_string())?;

        if document.is_empty() {
            return Err(crate::errors::PipelineError::EmptyRegeneration.to_string());
        }
        let detail = format!("{} cues", document.len());
        Ok(Some((document, detail)))
    }

    async fn reupload(&self, video_id: &str, document: &SubtitleDocument) -> StageResult<String> {
        let id = self.services.captions
            .insert_track(
                video_id,
                &self.settings.language,
                &self.settings.track_name,
                Bytes::from(document.to_srt_string()),
            )
            .await
            .map_err(|e| e.to_string())?;
        Ok((id.clone(), format!("track id {}", id)))
    }
}
