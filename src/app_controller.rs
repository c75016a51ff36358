use anyhow::{Context, Result, anyhow};
use bytes::Bytes;
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::app_config::{Config, GenerationConfig, GenerationProvider};
use crate::auth::Credential;
use crate::file_utils::{FileManager, RunPaths};
use crate::media::{FfmpegMedia, ImagePreparer, VideoAssembler};
use crate::metadata::Metadata;
use crate::pipeline::{CaptionSettings, PipelineCoordinator, PipelineReport, PipelineServices, RunContext};
use crate::platform::youtube::YouTubeClient;
use crate::platform::{CaptionService, ResourceStateService, TrackKindFilter, VideoPublishService};
use crate::providers::TextGenerator;
use crate::providers::anthropic::Anthropic;
use crate::providers::gemini::Gemini;
use crate::regeneration::RegenerationOrchestrator;
use crate::subtitle_processor::{CanonicalReport, SrtCanonicalizer, SubtitleDocument};

// @module: Application controller wiring configuration to services

/// Platform collaborators, usually one object behind three traits
#[derive(Debug, Clone)]
pub struct PlatformHandles {
    pub resource_state: Arc<dyn ResourceStateService>,
    pub captions: Arc<dyn CaptionService>,
    pub publisher: Arc<dyn VideoPublishService>,
}

impl PlatformHandles {
    pub fn from_shared<T>(platform: Arc<T>) -> Self
    where
        T: ResourceStateService + CaptionService + VideoPublishService + 'static,
    {
        Self {
            resource_state: platform.clone(),
            captions: platform.clone(),
            publisher: platform,
        }
    }
}

/// Inputs of a full run for one song
#[derive(Debug, Clone)]
pub struct SongRequest {
    /// Directory name under the data and output roots
    pub song: String,
    /// Image file name inside the song's data directory
    pub image: String,
    /// Audio file name inside the song's data directory
    pub audio: String,
    /// Metadata JSON file name; `metadata.json` is used when present
    pub metadata_file: Option<String>,
    /// Stop after downloading the auto-generated captions
    pub skip_regeneration: bool,
}

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Injected platform; built from the credential when absent
    platform: Option<PlatformHandles>,
    // @field: Injected generator; built from the generation config when absent
    generator: Option<Arc<dyn TextGenerator>>,
    // @field: Injected media tools; ffmpeg when absent
    media: Option<(Arc<dyn ImagePreparer>, Arc<dyn VideoAssembler>)>,
    // @field: Spinners and progress bars
    show_progress: bool,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        Ok(Self {
            config,
            platform: None,
            generator: None,
            media: None,
            show_progress: false,
        })
    }

    pub fn with_platform(mut self, platform: PlatformHandles) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_media(mut self, preparer: Arc<dyn ImagePreparer>, assembler: Arc<dyn VideoAssembler>) -> Self {
        self.media = Some((preparer, assembler));
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn platform(&self) -> Result<PlatformHandles> {
        if let Some(platform) = &self.platform {
            return Ok(platform.clone());
        }
        let youtube = &self.config.youtube;
        let credential = Credential::resolve(&youtube.token_env, &youtube.token_file)?;
        Ok(PlatformHandles::from_shared(Arc::new(YouTubeClient::new(credential, youtube.clone()))))
    }

    fn generator(&self) -> Result<Arc<dyn TextGenerator>> {
        match &self.generator {
            Some(generator) => Ok(generator.clone()),
            None => build_generator(&self.config.generation),
        }
    }

    fn media(&self) -> (Arc<dyn ImagePreparer>, Arc<dyn VideoAssembler>) {
        match &self.media {
            Some(media) => media.clone(),
            None => {
                let ffmpeg = Arc::new(FfmpegMedia::new(self.config.media.clone()));
                (ffmpeg.clone(), ffmpeg)
            }
        }
    }

    fn caption_settings(&self) -> CaptionSettings {
        CaptionSettings {
            language: self.config.caption.language.clone(),
            track_name: self.config.caption.effective_track_name(),
            temporary_visibility: self.config.caption.temporary_visibility,
            policy: self.config.caption.retry_policy(),
            kind_filter: TrackKindFilter::AutoGeneratedOnly,
        }
    }

    fn orchestrator(&self) -> Result<RegenerationOrchestrator> {
        Ok(RegenerationOrchestrator::new(
            self.generator()?,
            &self.config.caption.language,
            &self.config.caption.translation_language,
        ))
    }

    fn coordinator(&self, regenerator: Option<RegenerationOrchestrator>) -> Result<PipelineCoordinator> {
        let platform = self.platform()?;
        let (image_preparer, video_assembler) = self.media();
        let services = PipelineServices {
            image_preparer,
            video_assembler,
            publisher: platform.publisher,
            resource_state: platform.resource_state,
            captions: platform.captions,
            regenerator,
        };
        Ok(PipelineCoordinator::new(services, self.caption_settings()).with_progress(self.show_progress))
    }

    // Reference and rules from the song's data directory
    fn load_reference(&self, paths: &RunPaths) -> Result<(Option<String>, String)> {
        let generation = &self.config.generation;
        let reference = FileManager::read_optional(paths.input(&generation.reference_file))?;
        if reference.is_none() {
            info!("No {} in {}; the rewrite will be skipped", generation.reference_file, paths.data_dir.display());
        }
        let rules = FileManager::read_optional(paths.input(&generation.rules_file))?.unwrap_or_default();
        Ok((reference, rules))
    }

    fn regenerator_for(&self, reference: &Option<String>, skip: bool) -> Result<Option<RegenerationOrchestrator>> {
        if skip || reference.is_none() {
            return Ok(None);
        }
        self.orchestrator().map(Some)
    }

    fn load_metadata(&self, paths: &RunPaths, metadata_file: Option<&str>) -> Result<Metadata> {
        let name = metadata_file.unwrap_or("metadata.json");
        let path = paths.input(name);
        if FileManager::file_exists(&path) {
            return Metadata::load(&path, &paths.data_dir);
        }
        if metadata_file.is_some() {
            return Err(anyhow!("Metadata file not found: {}", path.display()));
        }
        warn!("No metadata.json in {}; using defaults", paths.data_dir.display());
        Ok(Metadata::default())
    }

    /// Full pipeline: media, upload, captions, rewrite and caption upload
    pub async fn run_song(&self, request: &SongRequest) -> Result<PipelineReport> {
        let start_time = Instant::now();
        let paths = RunPaths::for_song(&self.config.paths.data_root, &self.config.paths.output_root, &request.song);
        FileManager::ensure_dir(&paths.output_dir)?;

        let metadata = self.load_metadata(&paths, request.metadata_file.as_deref())?;
        let (reference, rules) = self.load_reference(&paths)?;
        let regenerator = self.regenerator_for(&reference, request.skip_regeneration)?;

        let ctx = RunContext::from_media(
            paths.clone(),
            paths.input(&request.image),
            paths.input(&request.audio),
            metadata,
        )
        .with_reference(reference, rules);

        let report = self.coordinator(regenerator)?.run(&ctx).await;
        info!("{}", report);
        info!("Finished in {}", Self::format_duration(start_time.elapsed()));
        Ok(report)
    }

    /// Caption lifecycle for an already uploaded video
    pub async fn run_existing(&self, video_id: &str, song: Option<&str>, skip_regeneration: bool) -> Result<PipelineReport> {
        let start_time = Instant::now();
        let folder = song.unwrap_or(video_id);
        let paths = RunPaths::for_song(&self.config.paths.data_root, &self.config.paths.output_root, folder);
        FileManager::ensure_dir(&paths.output_dir)?;

        let (metadata, reference, rules) = match song {
            Some(_) => {
                let metadata = self.load_metadata(&paths, None)?;
                let (reference, rules) = self.load_reference(&paths)?;
                (metadata, reference, rules)
            }
            None => (Metadata::default(), None, String::new()),
        };
        let regenerator = self.regenerator_for(&reference, skip_regeneration)?;

        let ctx = RunContext::existing_video(paths, video_id, metadata)
            .with_reference(reference, rules);

        let report = self.coordinator(regenerator)?.run(&ctx).await;
        info!("{}", report);
        info!("Finished in {}", Self::format_duration(start_time.elapsed()));
        Ok(report)
    }

    /// Offline rewrite of a local caption file
    pub async fn regenerate_file(
        &self,
        input: &Path,
        reference: &Path,
        rules: Option<&Path>,
        output: &Path,
    ) -> Result<SubtitleDocument> {
        let original = FileManager::read_to_string(input)?;
        let reference_text = FileManager::read_to_string(reference)?;
        let rule_text = match rules {
            Some(path) => FileManager::read_to_string(path)?,
            None => String::new(),
        };

        let document = self.orchestrator()?
            .regenerate(&original, &reference_text, &rule_text)
            .await?;
        if document.is_empty() {
            return Err(crate::errors::PipelineError::EmptyRegeneration.into());
        }

        document.write_to_srt(output)?;
        info!("Validated subtitles saved to {}", output.display());
        Ok(document)
    }

    /// Canonicalize a local file and attach it to a video
    pub async fn upload_captions(
        &self,
        video_id: &str,
        input: &Path,
        language: Option<&str>,
        name: Option<&str>,
    ) -> Result<String> {
        let document = SrtCanonicalizer::canonicalize(&FileManager::read_to_string(input)?);
        if document.is_empty() {
            return Err(anyhow!("{} has no valid cues", input.display()));
        }

        let language = language.unwrap_or(&self.config.caption.language);
        crate::language_utils::validate_language_tag(language)?;
        let name = name.map(str::to_string).unwrap_or_else(|| self.config.caption.effective_track_name());

        let platform = self.platform()?;
        let track_id = platform.captions
            .insert_track(video_id, language, &name, Bytes::from(document.to_srt_string()))
            .await?;
        info!("Uploaded {} cues as track {}", document.len(), track_id);
        Ok(track_id)
    }

    /// Canonicalize a local file; writes to `output` when given
    pub fn clean_file(input: &Path, output: Option<&Path>) -> Result<CanonicalReport> {
        let raw = FileManager::read_to_string(input)?;
        let report = SrtCanonicalizer::inspect(&raw);

        for (block, reason) in report.rejected() {
            warn!("Dropped block ({}): {}", reason, block.lines().next().unwrap_or_default());
        }

        if let Some(output) = output {
            let document = report.clone().into_document();
            document.write_to_srt(output)?;
            info!("Wrote {} cues to {}", document.len(), output.display());
        }
        Ok(report)
    }

    /// Format a duration in a human-readable format
    pub fn format_duration(duration: std::time::Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}

/// Build the configured generative-text client
pub fn build_generator(generation: &GenerationConfig) -> Result<Arc<dyn TextGenerator>> {
    generation.validate()?;
    let provider = generation.active_or_default();
    let api_key = provider.resolve_api_key()
        .ok_or_else(|| anyhow!("No API key for {}", generation.provider.display_name()))?;
    let model = generation.get_model();
    let endpoint = generation.get_endpoint();

    let generator: Arc<dyn TextGenerator> = match generation.provider {
        GenerationProvider::Gemini => Arc::new(
            Gemini::new(api_key, endpoint, model, provider.timeout_secs)
                .with_sampling(provider.max_output_tokens, generation.temperature),
        ),
        GenerationProvider::Anthropic => Arc::new(
            Anthropic::new(api_key, endpoint, model, provider.timeout_secs)
                .with_sampling(provider.max_output_tokens, generation.temperature),
        ),
    };
    info!("Using {}", generator.describe());
    Ok(generator)
}

/// Default output path for `clean`/`regenerate` when none is given
pub fn sibling_output(input: &Path, suffix: &str) -> PathBuf {
    let stem = FileManager::stem_of(input, "captions");
    input.with_file_name(format!("{}.{}.srt", stem, suffix))
}
