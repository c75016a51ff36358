/*!
 * Fake media tools for testing
 *
 * Stand-ins for the ffmpeg-backed image and video steps. They write small
 * placeholder files so the upload stage has something to read, and can be
 * told to fail.
 */

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use ytsubflow::media::{ImagePreparer, VideoAssembler};

/// Fake media tools sharing one call counter
#[derive(Debug, Clone, Default)]
pub struct MockMedia {
    fail_image: bool,
    fail_video: bool,
    calls: Arc<AtomicUsize>,
}

impl MockMedia {
    pub fn new() -> Self {
        Self::default()
    }

    /// Image preparation fails
    pub fn failing_image() -> Self {
        Self { fail_image: true, ..Self::default() }
    }

    /// Video assembly fails
    pub fn failing_video() -> Self {
        Self { fail_video: true, ..Self::default() }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn write(output: &Path, content: &str) -> Result<()> {
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(output, content)?;
        Ok(())
    }
}

#[async_trait]
impl ImagePreparer for MockMedia {
    async fn prepare_image(&self, _input: &Path, output: &Path) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_image {
            return Err(anyhow!("Simulated image failure"));
        }
        Self::write(output, "jpg")
    }
}

#[async_trait]
impl VideoAssembler for MockMedia {
    async fn assemble_video(&self, _image: &Path, _audio: &Path, output: &Path) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_video {
            return Err(anyhow!("Simulated ffmpeg failure"));
        }
        Self::write(output, "mp4 video bytes")
    }
}
