use anyhow::{Result, Context};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

// @module: File and directory utilities

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {}", path.display()))?;
        }
        Ok(())
    }

    /// Read a UTF-8 file
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        let path = path.as_ref();
        fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))
    }

    /// Read a UTF-8 file that may legitimately be absent
    pub fn read_optional<P: AsRef<Path>>(path: P) -> Result<Option<String>> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read file: {}", path.display())),
        }
    }

    /// Write text, creating parent directories
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            Self::ensure_dir(parent)?;
        }
        fs::write(path, content)
            .with_context(|| format!("Failed to write file: {}", path.display()))
    }

    /// Read the whole media file into memory for upload
    pub async fn read_bytes<P: AsRef<Path>>(path: P) -> Result<bytes::Bytes> {
        let path = path.as_ref();
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        Ok(bytes::Bytes::from(data))
    }

    // @returns: File stem as a string, or a fallback
    pub fn stem_of<P: AsRef<Path>>(path: P, fallback: &str) -> String {
        path.as_ref()
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| fallback.to_string())
    }
}

/// Input and output locations for one song
#[derive(Debug, Clone, PartialEq)]
pub struct RunPaths {
    /// `<data_root>/<song>`
    pub data_dir: PathBuf,
    /// `<output_root>/<song>`
    pub output_dir: PathBuf,
}

impl RunPaths {
    pub fn for_song<P1: AsRef<Path>, P2: AsRef<Path>>(data_root: P1, output_root: P2, song_name: &str) -> Self {
        Self {
            data_dir: data_root.as_ref().join(song_name),
            output_dir: output_root.as_ref().join(song_name),
        }
    }

    pub fn input(&self, file_name: &str) -> PathBuf {
        self.data_dir.join(file_name)
    }

    /// `<image-stem>_yt.jpg`
    pub fn prepared_image(&self, image: &Path) -> PathBuf {
        self.output_dir.join(format!("{}_yt.jpg", FileManager::stem_of(image, "image")))
    }

    /// `<audio-stem>.mp4`
    pub fn video(&self, audio: &Path) -> PathBuf {
        self.output_dir.join(format!("{}.mp4", FileManager::stem_of(audio, "video")))
    }

    /// `<stem>.auto.<lang>.srt`
    pub fn auto_captions(&self, stem: &str, language: &str) -> PathBuf {
        self.output_dir.join(format!("{}.auto.{}.srt", stem, language))
    }

    /// `<stem>.<lang>.srt`
    pub fn final_captions(&self, stem: &str, language: &str) -> PathBuf {
        self.output_dir.join(format!("{}.{}.srt", stem, language))
    }
}
