/*!
 * Common test utilities for the ytsubflow test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// Re-export the fake media module
pub mod mock_media;

/// Auto-generated captions as the platform hands them out
pub const AUTO_CAPTIONS: &str = "1\n00:00:01,000 --> 00:00:04,000\nnee navvu\n\n2\n00:00:05,000 --> 00:00:09,000\n[Music]\n\n3\n00:00:10,000 --> 00:00:14,000\nnaa prema\n";

/// Lyrics with meaning for the rewrite
pub const REFERENCE_TEXT: &str = "Nee navvu - Your smile\nNaa prema - My love\n";

/// Rule instructions for the rewrite
pub const RULE_TEXT: &str = "Keep the timing lines unchanged. Add the English meaning below each line.";

/// Route library logs through env_logger; safe to call from every test
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Creates a sample subtitle file for testing
pub fn create_test_subtitle(dir: &Path, filename: &str) -> Result<PathBuf> {
    create_test_file(dir, filename, AUTO_CAPTIONS)
}

/// Lays out `<root>/data/<song>/` with an image, audio and optional reference files
pub fn create_song_dir(root: &Path, song: &str, with_reference: bool) -> Result<PathBuf> {
    let song_dir = root.join("data").join(song);
    create_test_file(&song_dir, "cover.png", "png")?;
    create_test_file(&song_dir, "song.mp3", "mp3")?;
    if with_reference {
        create_test_file(&song_dir, "lyrics_meaning.txt", REFERENCE_TEXT)?;
        create_test_file(&song_dir, "prompt_instructions.txt", RULE_TEXT)?;
    }
    Ok(song_dir)
}
