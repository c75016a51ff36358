// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use std::io::Write;
use std::path::PathBuf;

use ytsubflow::app_config::{self, Config, GenerationProvider};
use ytsubflow::app_controller::{Controller, SongRequest, sibling_output};
use ytsubflow::pipeline::PipelineReport;

/// CLI Wrapper for GenerationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliProvider {
    Gemini,
    Anthropic,
}

impl From<CliProvider> for GenerationProvider {
    fn from(cli_provider: CliProvider) -> Self {
        match cli_provider {
            CliProvider::Gemini => GenerationProvider::Gemini,
            CliProvider::Anthropic => GenerationProvider::Anthropic,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build, upload and caption a song end to end
    Run {
        /// Song folder name under the data root
        song: String,

        /// Cover image file inside the song folder
        #[arg(long)]
        image: String,

        /// Audio file inside the song folder
        #[arg(long)]
        audio: String,

        /// Metadata JSON file inside the song folder
        #[arg(long)]
        metadata: Option<String>,

        /// Stop after downloading the auto-generated captions
        #[arg(long)]
        skip_regeneration: bool,
    },

    /// Fetch (and optionally rewrite) captions for an uploaded video
    Captions {
        /// Video id on the platform
        video_id: String,

        /// Song folder providing reference lyrics and rules
        #[arg(long)]
        song: Option<String>,

        /// Stop after downloading the auto-generated captions
        #[arg(long)]
        skip_regeneration: bool,
    },

    /// Rewrite a local SRT file with the reference lyrics
    Regenerate {
        /// Auto-generated SRT file
        input: PathBuf,

        /// Lyrics with meaning
        #[arg(long)]
        reference: PathBuf,

        /// Rule instructions
        #[arg(long)]
        rules: Option<PathBuf>,

        /// Output file (default: <input-stem>.regenerated.srt)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Generative-text provider to use
        #[arg(short, long, value_enum)]
        provider: Option<CliProvider>,

        /// Model name to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Upload a local SRT file as a caption track
    UploadCaptions {
        /// Video id on the platform
        video_id: String,

        /// SRT file to upload
        input: PathBuf,

        /// Caption language tag (default: config caption.language)
        #[arg(short, long)]
        language: Option<String>,

        /// Track name (default: config caption.track_name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Canonicalize a local SRT file
    Clean {
        /// SRT file to clean
        input: PathBuf,

        /// Output file (default: <input-stem>.clean.srt)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate shell completions for ytsubflow
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// ytsubflow - captioned song uploads
///
/// Turns an audio track and a cover image into a video, uploads it, waits for
/// the platform's auto-generated captions and rewrites them with lyrics and
/// their meaning before uploading the final track.
#[derive(Parser, Debug)]
#[command(name = "ytsubflow")]
#[command(version)]
#[command(about = "Caption lifecycle automation for song uploads")]
#[command(long_about = "ytsubflow builds a still-image video from a song, uploads it, fetches the auto-generated captions and uploads a rewritten caption track.

EXAMPLES:
    ytsubflow run my_song --image cover.png --audio song.mp3
    ytsubflow captions dQw4w9WgXcQ --song my_song
    ytsubflow regenerate auto.srt --reference lyrics_meaning.txt --rules prompt_instructions.txt
    ytsubflow upload-captions dQw4w9WgXcQ final.srt -l te
    ytsubflow clean model_output.srt -o clean.srt
    ytsubflow completions bash > ytsubflow.bash

CONFIGURATION:
    Configuration is stored in conf.json by default. If the file doesn't exist,
    a default one is created automatically.

    Inputs are read from <data_root>/<song>/ and outputs written to
    <output_root>/<song>/.

    The platform access token is read from $YOUTUBE_ACCESS_TOKEN or from the
    configured token file.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: String,

    /// Set logging level
    #[arg(long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\u{274C} ",
            Level::Warn => "\u{1F6A7} ",
            Level::Info => " ",
            Level::Debug => "\u{1F50D} ",
            Level::Trace => "\u{1F4CB} ",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                Self::get_emoji_for_level(record.level()),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn level_filter(level: &app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Trace lets set_max_level raise verbosity later
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Some(level) = &cli.log_level {
        log::set_max_level(level_filter(&level.clone().into()));
    }

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "ytsubflow", &mut std::io::stdout());
            Ok(())
        }
        Commands::Clean { input, output } => {
            let output = output.unwrap_or_else(|| sibling_output(&input, "clean"));
            let report = Controller::clean_file(&input, Some(&output))?;
            info!("{} cue(s) kept, {} block(s) dropped", report.accepted(), report.rejected().count());
            Ok(())
        }
        command => {
            let mut config = load_config(&cli.config_path, cli.log_level.as_ref())?;
            run_command(command, &mut config).await
        }
    }
}

fn load_config(config_path: &str, cli_level: Option<&CliLogLevel>) -> Result<Config> {
    let (mut config, created) = Config::load_or_create(config_path)?;
    if created {
        warn!("Config file not found at '{}', created default config.", config_path);
    }

    match cli_level {
        Some(level) => config.log_level = level.clone().into(),
        None => log::set_max_level(level_filter(&config.log_level)),
    }
    Ok(config)
}

async fn run_command(command: Commands, config: &mut Config) -> Result<()> {
    match command {
        Commands::Run { song, image, audio, metadata, skip_regeneration } => {
            let controller = Controller::with_config(config.clone())?.with_progress(true);
            let request = SongRequest {
                song,
                image,
                audio,
                metadata_file: metadata,
                skip_regeneration,
            };
            let report = controller.run_song(&request).await?;
            finish(report)
        }
        Commands::Captions { video_id, song, skip_regeneration } => {
            let controller = Controller::with_config(config.clone())?.with_progress(true);
            let report = controller.run_existing(&video_id, song.as_deref(), skip_regeneration).await?;
            finish(report)
        }
        Commands::Regenerate { input, reference, rules, output, provider, model } => {
            if let Some(provider) = provider {
                config.generation.provider = provider.into();
            }
            if let Some(model) = model {
                let provider_str = config.generation.provider.to_lowercase_string();
                if let Some(provider_config) = config.generation.available_providers.iter_mut()
                    .find(|p| p.provider_type == provider_str) {
                    provider_config.model = model;
                }
            }
            config.validate_generation()?;

            let output = output.unwrap_or_else(|| sibling_output(&input, "regenerated"));
            let controller = Controller::with_config(config.clone())?;
            let document = controller.regenerate_file(&input, &reference, rules.as_deref(), &output).await?;
            info!("{} cue(s) written to {}", document.len(), output.display());
            Ok(())
        }
        Commands::UploadCaptions { video_id, input, language, name } => {
            let controller = Controller::with_config(config.clone())?;
            controller.upload_captions(&video_id, &input, language.as_deref(), name.as_deref()).await?;
            Ok(())
        }
        Commands::Clean { .. } | Commands::Completions { .. } => Ok(()),
    }
}

fn finish(report: PipelineReport) -> Result<()> {
    match report.first_failure() {
        None => Ok(()),
        Some((stage, outcome)) => Err(anyhow!("Run {} failed at {}: {}", report.run_id, stage, outcome.detail())),
    }
}
