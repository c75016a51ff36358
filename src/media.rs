/*!
 * Media preparation through ffmpeg.
 *
 * The cover image is scaled to the upload size and muxed with the audio
 * into a still-image video that runs a couple of seconds past the end of
 * the audio.
 */

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use log::{debug, info};
use std::fmt::Debug;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;

use crate::app_config::MediaConfig;
use crate::file_utils::FileManager;

/// Produces the upload-ready cover image
#[async_trait]
pub trait ImagePreparer: Send + Sync + Debug {
    async fn prepare_image(&self, input: &Path, output: &Path) -> Result<()>;
}

/// Muxes a still image and an audio track into a video file
#[async_trait]
pub trait VideoAssembler: Send + Sync + Debug {
    async fn assemble_video(&self, image: &Path, audio: &Path, output: &Path) -> Result<()>;
}

/// ffmpeg/ffprobe backed media tools
#[derive(Debug, Clone)]
pub struct FfmpegMedia {
    config: MediaConfig,
    probe_timeout: Duration,
    encode_timeout: Duration,
}

impl FfmpegMedia {
    pub fn new(config: MediaConfig) -> Self {
        Self {
            config,
            probe_timeout: Duration::from_secs(60),
            encode_timeout: Duration::from_secs(30 * 60),
        }
    }

    // @returns: ffmpeg arguments for the cover resize
    fn image_args(&self, input: &Path, output: &Path) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-i".to_string(), input.to_string_lossy().to_string(),
            "-vf".to_string(), format!("scale={}:{}:flags=lanczos", self.config.image_width, self.config.image_height),
            "-q:v".to_string(), "2".to_string(),
            output.to_string_lossy().to_string(),
        ]
    }

    // @returns: ffmpeg arguments for the still-image video
    fn video_args(&self, image: &Path, audio: &Path, output: &Path, duration_secs: f64) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-loop".to_string(), "1".to_string(),
            "-framerate".to_string(), self.config.fps.to_string(),
            "-i".to_string(), image.to_string_lossy().to_string(),
            "-i".to_string(), audio.to_string_lossy().to_string(),
            "-t".to_string(), format!("{:.3}", duration_secs),
            "-c:v".to_string(), "libx264".to_string(),
            "-tune".to_string(), "stillimage".to_string(),
            "-pix_fmt".to_string(), "yuv420p".to_string(),
            "-c:a".to_string(), "aac".to_string(),
            "-r".to_string(), self.config.fps.to_string(),
            output.to_string_lossy().to_string(),
        ]
    }

    /// Audio duration in seconds
    pub async fn probe_duration(&self, audio: &Path) -> Result<f64> {
        let args = [
            "-v", "error",
            "-show_entries", "format=duration",
            "-of", "default=noprint_wrappers=1:nokey=1",
        ];
        let output = run_tool(&self.config.ffprobe, args.iter().map(|s| s.to_string())
            .chain(std::iter::once(audio.to_string_lossy().to_string())), self.probe_timeout).await?;

        parse_duration(&String::from_utf8_lossy(&output.stdout))
            .with_context(|| format!("ffprobe returned no duration for {}", audio.display()))
    }
}

/// First line of ffprobe output as seconds
fn parse_duration(stdout: &str) -> Result<f64> {
    let line = stdout.lines().map(str::trim).find(|l| !l.is_empty())
        .ok_or_else(|| anyhow!("empty ffprobe output"))?;
    let seconds: f64 = line.parse()
        .with_context(|| format!("not a duration: {}", line))?;
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(anyhow!("invalid duration: {}", seconds));
    }
    Ok(seconds)
}

async fn run_tool<I>(program: &str, args: I, timeout: Duration) -> Result<std::process::Output>
where
    I: IntoIterator<Item = String>,
{
    let args: Vec<String> = args.into_iter().collect();
    debug!("{} {}", program, args.join(" "));

    let future = Command::new(program).args(&args).kill_on_drop(true).output();

    let output = tokio::select! {
        result = future => {
            result.map_err(|e| anyhow!("Failed to execute {}: {}", program, e))?
        },
        _ = tokio::time::sleep(timeout) => {
            return Err(anyhow!("{} timed out after {} seconds", program, timeout.as_secs()));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
        return Err(anyhow!(
            "{} exited with {}: {}",
            program,
            output.status,
            tail.into_iter().rev().collect::<Vec<_>>().join(" | ")
        ));
    }

    Ok(output)
}

fn ensure_input(path: &Path, what: &str) -> Result<()> {
    if !FileManager::file_exists(path) {
        return Err(anyhow!("{} file not found: {}", what, path.display()));
    }
    Ok(())
}

#[async_trait]
impl ImagePreparer for FfmpegMedia {
    async fn prepare_image(&self, input: &Path, output: &Path) -> Result<()> {
        ensure_input(input, "Image")?;
        if let Some(parent) = output.parent() {
            FileManager::ensure_dir(parent)?;
        }

        run_tool(&self.config.ffmpeg, self.image_args(input, output), self.probe_timeout).await?;
        info!("Converted {} -> {}", input.display(), output.display());
        Ok(())
    }
}

#[async_trait]
impl VideoAssembler for FfmpegMedia {
    async fn assemble_video(&self, image: &Path, audio: &Path, output: &Path) -> Result<()> {
        ensure_input(image, "Image")?;
        ensure_input(audio, "Audio")?;
        if let Some(parent) = output.parent() {
            FileManager::ensure_dir(parent)?;
        }

        let audio_secs = self.probe_duration(audio).await?;
        let total = audio_secs + self.config.extra_seconds;
        run_tool(&self.config.ffmpeg, self.video_args(image, audio, output, total), self.encode_timeout).await?;

        info!("Video successfully created: {} ({:.1}s)", output.display(), total);
        Ok(())
    }
}
