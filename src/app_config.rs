use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::captions::RetryPolicy;
use crate::platform::VisibilityState;

/// Application configuration module
/// This module handles loading, validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Caption lifecycle settings
    #[serde(default)]
    pub caption: CaptionConfig,

    /// Hosting platform settings
    #[serde(default)]
    pub youtube: YouTubeConfig,

    /// Generative-text settings
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Media preparation settings
    #[serde(default)]
    pub media: MediaConfig,

    /// Input/output roots
    #[serde(default)]
    pub paths: PathsConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Caption polling and upload settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CaptionConfig {
    /// Language tag of the spoken audio and of the ASR track
    #[serde(default = "default_caption_language")]
    pub language: String,

    /// Language of the meaning line appended by the rewrite
    #[serde(default = "default_translation_language")]
    pub translation_language: String,

    /// Name given to the uploaded track; derived from the languages when empty
    #[serde(default)]
    pub track_name: String,

    /// Total polling budget in seconds
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,

    /// Fixed delay between polls in seconds
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// State the video is moved to while captions are generated
    #[serde(default = "default_temporary_visibility")]
    pub temporary_visibility: VisibilityState,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            language: default_caption_language(),
            translation_language: default_translation_language(),
            track_name: String::new(),
            max_wait_secs: default_max_wait_secs(),
            interval_secs: default_interval_secs(),
            temporary_visibility: default_temporary_visibility(),
        }
    }
}

impl CaptionConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            Duration::from_secs(self.max_wait_secs),
            Duration::from_secs(self.interval_secs),
        )
    }

    pub fn effective_track_name(&self) -> String {
        if self.track_name.trim().is_empty() {
            crate::language_utils::default_track_name(&self.language, &self.translation_language)
        } else {
            self.track_name.clone()
        }
    }
}

/// YouTube Data API settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct YouTubeConfig {
    // @field: Data API base URL
    #[serde(default = "default_youtube_api_endpoint")]
    pub api_endpoint: String,

    // @field: Upload API base URL
    #[serde(default = "default_youtube_upload_endpoint")]
    pub upload_endpoint: String,

    // @field: Stored OAuth token file
    #[serde(default = "default_token_file")]
    pub token_file: PathBuf,

    // @field: Environment variable that may carry an access token
    #[serde(default = "default_token_env")]
    pub token_env: String,

    // @field: Resumable upload chunk size in bytes (multiple of 256 KiB)
    #[serde(default = "default_upload_chunk_size")]
    pub upload_chunk_size: usize,

    // @field: Request timeout seconds
    #[serde(default = "default_youtube_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            api_endpoint: default_youtube_api_endpoint(),
            upload_endpoint: default_youtube_upload_endpoint(),
            token_file: default_token_file(),
            token_env: default_token_env(),
            upload_chunk_size: default_upload_chunk_size(),
            timeout_secs: default_youtube_timeout_secs(),
        }
    }
}

/// Generative-text provider type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GenerationProvider {
    // @provider: Google Gemini
    #[default]
    Gemini,
    // @provider: Anthropic
    Anthropic,
}

impl GenerationProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Gemini => "Gemini",
            Self::Anthropic => "Anthropic",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Gemini => "gemini".to_string(),
            Self::Anthropic => "anthropic".to_string(),
        }
    }
}

impl std::fmt::Display for GenerationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for GenerationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "anthropic" => Ok(Self::Anthropic),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key (takes precedence over api_key_env)
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Environment variable holding the API key
    #[serde(default = "String::new")]
    pub api_key_env: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Timeout seconds
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Output token ceiling
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: GenerationProvider) -> Self {
        match provider_type {
            GenerationProvider::Gemini => Self {
                provider_type: "gemini".to_string(),
                model: default_gemini_model(),
                api_key: String::new(),
                api_key_env: "GEMINI_API_KEY".to_string(),
                endpoint: default_gemini_endpoint(),
                timeout_secs: default_generation_timeout_secs(),
                max_output_tokens: default_max_output_tokens(),
            },
            GenerationProvider::Anthropic => Self {
                provider_type: "anthropic".to_string(),
                model: default_anthropic_model(),
                api_key: String::new(),
                api_key_env: "ANTHROPIC_API_KEY".to_string(),
                endpoint: default_anthropic_endpoint(),
                timeout_secs: default_generation_timeout_secs(),
                max_output_tokens: default_max_output_tokens(),
            },
        }
    }

    /// Inline key, else the configured environment variable
    pub fn resolve_api_key(&self) -> Option<String> {
        if !self.api_key.trim().is_empty() {
            return Some(self.api_key.trim().to_string());
        }
        if self.api_key_env.is_empty() {
            return None;
        }
        std::env::var(&self.api_key_env)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }
}

/// Generative-text configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GenerationConfig {
    /// Provider to use
    #[serde(default)]
    pub provider: GenerationProvider,

    /// Available providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Temperature for generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Lyrics/translation reference file name inside the song's data dir
    #[serde(default = "default_reference_file")]
    pub reference_file: String,

    /// Rule instructions file name inside the song's data dir
    #[serde(default = "default_rules_file")]
    pub rules_file: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: GenerationProvider::default(),
            available_providers: vec![
                ProviderConfig::new(GenerationProvider::Gemini),
                ProviderConfig::new(GenerationProvider::Anthropic),
            ],
            temperature: default_temperature(),
            reference_file: default_reference_file(),
            rules_file: default_rules_file(),
        }
    }
}

impl GenerationConfig {
    /// Get the active provider configuration
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        let provider_str = self.provider.to_lowercase_string();
        self.available_providers.iter()
            .find(|p| p.provider_type == provider_str)
    }

    /// Active provider config, or the built-in defaults for it
    pub fn active_or_default(&self) -> ProviderConfig {
        self.get_active_provider_config()
            .cloned()
            .unwrap_or_else(|| ProviderConfig::new(self.provider.clone()))
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        let config = self.active_or_default();
        if !config.model.is_empty() {
            return config.model;
        }

        match self.provider {
            GenerationProvider::Gemini => default_gemini_model(),
            GenerationProvider::Anthropic => default_anthropic_model(),
        }
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        let config = self.active_or_default();
        if !config.endpoint.is_empty() {
            return config.endpoint;
        }

        match self.provider {
            GenerationProvider::Gemini => default_gemini_endpoint(),
            GenerationProvider::Anthropic => default_anthropic_endpoint(),
        }
    }

    /// Validate that the active provider can be called
    pub fn validate(&self) -> Result<()> {
        let config = self.active_or_default();
        if config.resolve_api_key().is_none() {
            return Err(anyhow!(
                "API key is required for {} provider (set api_key or {})",
                self.provider.display_name(),
                if config.api_key_env.is_empty() { "api_key_env" } else { config.api_key_env.as_str() }
            ));
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(anyhow!("Temperature must be between 0.0 and 1.0, got {}", self.temperature));
        }
        Ok(())
    }
}

/// Media preparation settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MediaConfig {
    #[serde(default = "default_image_width")]
    pub image_width: u32,

    #[serde(default = "default_image_height")]
    pub image_height: u32,

    /// Seconds of still image kept after the audio ends
    #[serde(default = "default_extra_seconds")]
    pub extra_seconds: f64,

    #[serde(default = "default_fps")]
    pub fps: u32,

    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,

    #[serde(default = "default_ffprobe")]
    pub ffprobe: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            image_width: default_image_width(),
            image_height: default_image_height(),
            extra_seconds: default_extra_seconds(),
            fps: default_fps(),
            ffmpeg: default_ffmpeg(),
            ffprobe: default_ffprobe(),
        }
    }
}

/// Input/output roots
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PathsConfig {
    #[serde(default = "default_data_root")]
    pub data_root: PathBuf,

    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
            output_root: default_output_root(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

const UPLOAD_CHUNK_GRANULARITY: usize = 256 * 1024;

fn default_caption_language() -> String {
    "te".to_string()
}

fn default_translation_language() -> String {
    "en".to_string()
}

fn default_max_wait_secs() -> u64 {
    600
}

fn default_interval_secs() -> u64 {
    30
}

fn default_temporary_visibility() -> VisibilityState {
    VisibilityState::Unlisted
}

fn default_youtube_api_endpoint() -> String {
    "https://www.googleapis.com/youtube/v3".to_string()
}

fn default_youtube_upload_endpoint() -> String {
    "https://www.googleapis.com/upload/youtube/v3".to_string()
}

fn default_token_file() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("ytsubflow").join("token.json"))
        .unwrap_or_else(|| PathBuf::from("token.json"))
}

fn default_token_env() -> String {
    "YOUTUBE_ACCESS_TOKEN".to_string()
}

fn default_upload_chunk_size() -> usize {
    32 * UPLOAD_CHUNK_GRANULARITY // 8 MiB
}

fn default_youtube_timeout_secs() -> u64 {
    120
}

fn default_generation_timeout_secs() -> u64 {
    180
}

fn default_max_output_tokens() -> u32 {
    8192
}

fn default_temperature() -> f32 {
    0.3
}

fn default_gemini_endpoint() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_anthropic_endpoint() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-5-haiku-latest".to_string()
}

fn default_reference_file() -> String {
    "lyrics_meaning.txt".to_string()
}

fn default_rules_file() -> String {
    "prompt_instructions.txt".to_string()
}

fn default_image_width() -> u32 {
    1280
}

fn default_image_height() -> u32 {
    720
}

fn default_extra_seconds() -> f64 {
    2.0
}

fn default_fps() -> u32 {
    24
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

fn default_data_root() -> PathBuf {
    PathBuf::from("data")
}

fn default_output_root() -> PathBuf {
    PathBuf::from("output")
}

/// Endpoints must be absolute http(s) URLs with a host
fn validate_endpoint(endpoint: &str) -> Result<()> {
    let url = Url::parse(endpoint)
        .with_context(|| format!("Invalid endpoint URL: {}", endpoint))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(anyhow!("Endpoint must be an http(s) URL with a host: {}", endpoint));
    }
    Ok(())
}

impl Config {
    /// Load from a JSON file, or write and return defaults when it is missing
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<(Self, bool)> {
        let path = path.as_ref();
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            return Ok((config, false));
        }

        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write default config to file: {}", path.display()))?;

        Ok((config, true))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        crate::language_utils::validate_language_tag(&self.caption.language)?;
        crate::language_utils::validate_language_tag(&self.caption.translation_language)?;

        self.caption.retry_policy().validate()
            .map_err(|e| anyhow!("Invalid caption polling settings: {}", e))?;

        if self.caption.temporary_visibility == VisibilityState::Private {
            return Err(anyhow!("temporary_visibility must be unlisted or public; captions are not generated for private videos"));
        }

        if self.youtube.upload_chunk_size == 0
            || self.youtube.upload_chunk_size % UPLOAD_CHUNK_GRANULARITY != 0
        {
            return Err(anyhow!(
                "upload_chunk_size must be a positive multiple of {} bytes",
                UPLOAD_CHUNK_GRANULARITY
            ));
        }

        if self.media.image_width == 0 || self.media.image_height == 0 {
            return Err(anyhow!("Image dimensions must be non-zero"));
        }

        if self.media.extra_seconds < 0.0 {
            return Err(anyhow!("extra_seconds cannot be negative"));
        }

        validate_endpoint(&self.youtube.api_endpoint)?;
        validate_endpoint(&self.youtube.upload_endpoint)?;
        for provider in &self.generation.available_providers {
            if !provider.endpoint.is_empty() {
                validate_endpoint(&provider.endpoint)?;
            }
        }

        Ok(())
    }

    /// Validate what the regenerate stage needs on top of `validate`
    pub fn validate_generation(&self) -> Result<()> {
        self.validate()?;
        self.generation.validate()
    }
}
