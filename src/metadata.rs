/*!
 * Upload metadata.
 *
 * Reads the per-song JSON metadata file. Long descriptions may live in a
 * separate file next to it, and a publish schedule given in India Standard
 * Time is converted to UTC.
 */

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use log::warn;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;

use crate::file_utils::FileManager;
use crate::platform::VisibilityState;

/// IST is a fixed UTC+05:30 offset with no daylight saving
const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

const DEFAULT_TITLE: &str = "Untitled Video";

/// People & Blogs
const DEFAULT_CATEGORY: &str = "22";

/// Metadata for one upload, immutable once built
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    pub title: String,
    pub description: String,
    pub tags: BTreeSet<String>,
    pub category: String,
    pub privacy: VisibilityState,
    pub scheduled_publish_utc: Option<DateTime<Utc>>,
    pub default_audio_language: Option<String>,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            description: String::new(),
            tags: BTreeSet::new(),
            category: DEFAULT_CATEGORY.to_string(),
            privacy: VisibilityState::Private,
            scheduled_publish_utc: None,
            default_audio_language: None,
        }
    }
}

// On-disk shape of the metadata file
#[derive(Debug, Deserialize)]
struct MetadataFile {
    title: Option<String>,
    description: Option<String>,
    description_file: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(rename = "categoryId")]
    category_id: Option<String>,
    #[serde(rename = "privacyStatus")]
    privacy_status: Option<String>,
    #[serde(rename = "publishAtIST")]
    publish_at_ist: Option<String>,
    #[serde(rename = "defaultAudioLanguage")]
    default_audio_language: Option<String>,
}

impl Metadata {
    /// Load metadata from a JSON file; `data_dir` resolves `description_file`.
    pub fn load<P: AsRef<Path>, D: AsRef<Path>>(metadata_file: P, data_dir: D) -> Result<Self> {
        let metadata_file = metadata_file.as_ref();
        let content = FileManager::read_to_string(metadata_file)
            .with_context(|| format!("Failed to read metadata file: {}", metadata_file.display()))?;
        Self::from_json(&content, data_dir)
    }

    /// Build metadata from JSON text
    pub fn from_json<D: AsRef<Path>>(content: &str, data_dir: D) -> Result<Self> {
        let raw: MetadataFile = serde_json::from_str(content)
            .context("Failed to parse metadata JSON")?;

        let mut description = raw.description.unwrap_or_default();
        if let Some(description_file) = &raw.description_file {
            let path = data_dir.as_ref().join(description_file);
            description = match FileManager::read_optional(&path)? {
                Some(text) => text,
                None => {
                    warn!("Description file {} not found. Using empty description.", path.display());
                    String::new()
                }
            };
        }

        let privacy = match raw.privacy_status.as_deref() {
            Some(status) => status.parse()?,
            None => VisibilityState::Private,
        };

        let scheduled_publish_utc = raw
            .publish_at_ist
            .as_deref()
            .map(convert_ist_to_utc)
            .transpose()?;

        if scheduled_publish_utc.is_some() && privacy != VisibilityState::Private {
            warn!("publishAtIST is only honoured for private uploads; privacy is {}", privacy);
        }

        Ok(Self {
            title: raw.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            description,
            tags: raw.tags.into_iter().collect(),
            category: raw.category_id.unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            privacy,
            scheduled_publish_utc,
            default_audio_language: raw.default_audio_language,
        })
    }

    /// The schedule that should be re-applied when the video goes back to private
    pub fn restore_schedule(&self) -> Option<DateTime<Utc>> {
        if self.privacy == VisibilityState::Private {
            self.scheduled_publish_utc
        } else {
            None
        }
    }
}

/// Convert `YYYY-MM-DDTHH:MM:SS` in India Standard Time to UTC
pub fn convert_ist_to_utc(ist_time: &str) -> Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(ist_time.trim(), "%Y-%m-%dT%H:%M:%S")
        .with_context(|| format!("Invalid publishAtIST value: {}", ist_time))?;

    let ist = FixedOffset::east_opt(IST_OFFSET_SECS)
        .ok_or_else(|| anyhow!("Invalid IST offset"))?;

    ist.from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| anyhow!("Ambiguous local time: {}", ist_time))
}

/// RFC 3339 with a `Z` suffix, as the platform expects
pub fn format_publish_time(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
