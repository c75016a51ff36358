/*!
 * Hosting-platform collaborators.
 *
 * The caption lifecycle only sees these traits; the concrete YouTube Data API
 * client lives in `youtube`, and `mock` offers an in-memory platform for tests
 * and dry runs.
 */

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::str::FromStr;

use crate::errors::ProviderError;
use crate::metadata::Metadata;

pub mod youtube;
pub mod mock;

/// Access level of a published resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VisibilityState {
    #[default]
    Private,
    Unlisted,
    Public,
}

impl VisibilityState {
    // @returns: API identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Unlisted => "unlisted",
            Self::Public => "public",
        }
    }

    /// Auto-captioning only runs on resources that are not private
    pub fn allows_captioning(&self) -> bool {
        !matches!(self, Self::Private)
    }
}

impl fmt::Display for VisibilityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisibilityState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "private" => Ok(Self::Private),
            "unlisted" => Ok(Self::Unlisted),
            "public" => Ok(Self::Public),
            other => Err(anyhow::anyhow!("Invalid privacy status: {}", other)),
        }
    }
}

/// Visibility plus the optional scheduled publish time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visibility {
    pub state: VisibilityState,
    /// Only meaningful while `state` is private
    pub publish_at: Option<DateTime<Utc>>,
}

impl Visibility {
    pub fn new(state: VisibilityState) -> Self {
        Self { state, publish_at: None }
    }

    /// Drops the schedule unless the state is private
    pub fn scheduled(state: VisibilityState, publish_at: Option<DateTime<Utc>>) -> Self {
        let publish_at = if state == VisibilityState::Private { publish_at } else { None };
        Self { state, publish_at }
    }
}

/// Origin of a caption track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    /// Produced by automatic speech recognition
    AutoGenerated,
    /// Uploaded or edited by a person
    Manual,
}

impl TrackKind {
    /// Map the platform's `trackKind` field
    pub fn from_api(track_kind: &str) -> Self {
        if track_kind.eq_ignore_ascii_case("asr") {
            Self::AutoGenerated
        } else {
            Self::Manual
        }
    }
}

/// Which track kinds a caption search accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackKindFilter {
    #[default]
    AutoGeneratedOnly,
    ManualOnly,
    Any,
}

impl TrackKindFilter {
    pub fn accepts(&self, kind: TrackKind) -> bool {
        match self {
            Self::AutoGeneratedOnly => kind == TrackKind::AutoGenerated,
            Self::ManualOnly => kind == TrackKind::Manual,
            Self::Any => true,
        }
    }
}

/// Identifies a caption resource on the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionTrackRef {
    pub video_id: String,
    pub language_tag: String,
    pub kind: TrackKind,
    pub track_id: String,
    pub name: Option<String>,
}

/// Reads and changes a resource's visibility
#[async_trait]
pub trait ResourceStateService: Send + Sync + Debug {
    async fn get_visibility(&self, resource_id: &str) -> Result<Visibility, ProviderError>;

    async fn set_visibility(
        &self,
        resource_id: &str,
        state: VisibilityState,
        publish_at: Option<DateTime<Utc>>,
    ) -> Result<(), ProviderError>;
}

/// Lists, downloads and uploads caption tracks
#[async_trait]
pub trait CaptionService: Send + Sync + Debug {
    async fn list_tracks(&self, resource_id: &str) -> Result<Vec<CaptionTrackRef>, ProviderError>;

    /// Raw timed-text bytes of a track, in SRT form
    async fn download_track(&self, track_id: &str) -> Result<Bytes, ProviderError>;

    /// Returns the id of the created track
    async fn insert_track(
        &self,
        resource_id: &str,
        language_tag: &str,
        name: &str,
        content: Bytes,
    ) -> Result<String, ProviderError>;
}

/// Publishes a new video resource
#[async_trait]
pub trait VideoPublishService: Send + Sync + Debug {
    /// Resumable, chunked upload; returns the new resource id
    async fn insert_video(&self, media: Bytes, metadata: &Metadata) -> Result<String, ProviderError>;
}
