/*!
 * In-memory hosting platform.
 *
 * Implements every platform trait against shared state so the caption
 * lifecycle can be driven without network access:
 * - `MockPlatform::new()` - empty platform, uploads get sequential ids
 * - `with_video` / `with_auto_track` - seed resources and an ASR track that
 *   shows up only after a number of polls on a non-private video
 * - `fail` / `fail_times` - inject authorization or transient failures
 */

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use log::debug;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{
    CaptionService, CaptionTrackRef, ResourceStateService, TrackKind, VideoPublishService,
    Visibility, VisibilityState,
};
use crate::errors::ProviderError;
use crate::metadata::Metadata;

/// Operation a failure can be injected into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    GetVisibility,
    SetVisibility,
    ListTracks,
    DownloadTrack,
    InsertTrack,
    InsertVideo,
}

/// Failure flavour for injected errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// 401 from the platform
    Unauthorized,
    /// 503 from the platform
    Unavailable,
}

impl MockFailure {
    fn to_error(self, operation: MockOperation) -> ProviderError {
        match self {
            Self::Unauthorized => ProviderError::from_status(401, format!("Simulated {:?} rejection", operation)),
            Self::Unavailable => ProviderError::from_status(503, format!("Simulated {:?} outage", operation)),
        }
    }
}

#[derive(Debug, Clone)]
struct InjectedFailure {
    failure: MockFailure,
    // None means every call fails
    remaining: Option<usize>,
}

#[derive(Debug)]
struct PendingTrack {
    track: CaptionTrackRef,
    // polls on a captionable video before the track is listed
    polls_left: usize,
}

/// A caption uploaded through `insert_track`
#[derive(Debug, Clone, PartialEq)]
pub struct InsertedTrack {
    pub video_id: String,
    pub language_tag: String,
    pub name: String,
    pub content: Bytes,
}

#[derive(Debug, Default)]
struct MockState {
    videos: HashMap<String, Visibility>,
    tracks: HashMap<String, Vec<CaptionTrackRef>>,
    pending: HashMap<String, Vec<PendingTrack>>,
    track_content: HashMap<String, Bytes>,
    failures: HashMap<MockOperation, InjectedFailure>,
    visibility_changes: Vec<(String, VisibilityState, Option<DateTime<Utc>>)>,
    inserted_tracks: Vec<InsertedTrack>,
    uploaded_videos: Vec<(String, Metadata)>,
}

/// Shared in-memory platform; clones see the same state
#[derive(Debug, Clone, Default)]
pub struct MockPlatform {
    state: Arc<Mutex<MockState>>,
    list_calls: Arc<AtomicUsize>,
    next_id: Arc<AtomicUsize>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a video with the given visibility
    pub fn with_video(self, video_id: &str, visibility: Visibility) -> Self {
        self.state.lock().videos.insert(video_id.to_string(), visibility);
        self
    }

    /// Seed an ASR track that becomes visible after `polls_before_ready`
    /// listings made while the video is captionable
    pub fn with_auto_track(self, video_id: &str, language_tag: &str, content: &str, polls_before_ready: usize) -> Self {
        let track_id = format!("asr-{}-{}", video_id, language_tag);
        let track = CaptionTrackRef {
            video_id: video_id.to_string(),
            language_tag: language_tag.to_string(),
            kind: TrackKind::AutoGenerated,
            track_id: track_id.clone(),
            name: None,
        };
        {
            let mut state = self.state.lock();
            state.track_content.insert(track_id, Bytes::from(content.to_string()));
            state.pending.entry(video_id.to_string()).or_default().push(PendingTrack {
                track,
                polls_left: polls_before_ready,
            });
        }
        self
    }

    /// Seed an already listed track of any kind
    pub fn with_track(self, track: CaptionTrackRef, content: &str) -> Self {
        {
            let mut state = self.state.lock();
            state.track_content.insert(track.track_id.clone(), Bytes::from(content.to_string()));
            state.tracks.entry(track.video_id.clone()).or_default().push(track);
        }
        self
    }

    /// Every call to `operation` fails
    pub fn fail(self, operation: MockOperation, failure: MockFailure) -> Self {
        self.state.lock().failures.insert(operation, InjectedFailure { failure, remaining: None });
        self
    }

    /// The next `times` calls to `operation` fail, later ones succeed
    pub fn fail_times(self, operation: MockOperation, failure: MockFailure, times: usize) -> Self {
        self.state.lock().failures.insert(operation, InjectedFailure { failure, remaining: Some(times) });
        self
    }

    /// Number of `list_tracks` calls so far
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Current visibility of a seeded or uploaded video
    pub fn visibility_of(&self, video_id: &str) -> Option<Visibility> {
        self.state.lock().videos.get(video_id).copied()
    }

    /// Every `set_visibility` that reached the platform, in order
    pub fn visibility_changes(&self) -> Vec<(String, VisibilityState, Option<DateTime<Utc>>)> {
        self.state.lock().visibility_changes.clone()
    }

    pub fn inserted_tracks(&self) -> Vec<InsertedTrack> {
        self.state.lock().inserted_tracks.clone()
    }

    pub fn uploaded_videos(&self) -> Vec<(String, Metadata)> {
        self.state.lock().uploaded_videos.clone()
    }

    fn check_failure(&self, operation: MockOperation) -> Result<(), ProviderError> {
        let mut state = self.state.lock();
        let Some(injected) = state.failures.get_mut(&operation) else {
            return Ok(());
        };
        let failure = injected.failure;
        let remaining = injected.remaining;
        match remaining {
            None => Err(failure.to_error(operation)),
            Some(0) => {
                state.failures.remove(&operation);
                Ok(())
            }
            Some(n) => {
                injected.remaining = Some(n - 1);
                Err(failure.to_error(operation))
            }
        }
    }

    fn allocate_id(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[async_trait]
impl ResourceStateService for MockPlatform {
    async fn get_visibility(&self, resource_id: &str) -> Result<Visibility, ProviderError> {
        self.check_failure(MockOperation::GetVisibility)?;
        self.state.lock()
            .videos
            .get(resource_id)
            .copied()
            .ok_or_else(|| ProviderError::NotFound(format!("Video {} not found", resource_id)))
    }

    async fn set_visibility(
        &self,
        resource_id: &str,
        state: VisibilityState,
        publish_at: Option<DateTime<Utc>>,
    ) -> Result<(), ProviderError> {
        self.check_failure(MockOperation::SetVisibility)?;
        let mut inner = self.state.lock();
        if !inner.videos.contains_key(resource_id) {
            return Err(ProviderError::NotFound(format!("Video {} not found", resource_id)));
        }
        inner.videos.insert(resource_id.to_string(), Visibility::scheduled(state, publish_at));
        inner.visibility_changes.push((resource_id.to_string(), state, publish_at));
        debug!("mock: {} -> {}", resource_id, state);
        Ok(())
    }
}

#[async_trait]
impl CaptionService for MockPlatform {
    async fn list_tracks(&self, resource_id: &str) -> Result<Vec<CaptionTrackRef>, ProviderError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure(MockOperation::ListTracks)?;

        let mut state = self.state.lock();
        let captionable = state.videos
            .get(resource_id)
            .map(|v| v.state.allows_captioning())
            .unwrap_or(false);

        if captionable {
            let mut ready = Vec::new();
            if let Some(pending) = state.pending.get_mut(resource_id) {
                for item in pending.iter_mut() {
                    item.polls_left = item.polls_left.saturating_sub(1);
                }
                let (done, waiting): (Vec<_>, Vec<_>) = pending.drain(..).partition(|p| p.polls_left == 0);
                *pending = waiting;
                ready.extend(done.into_iter().map(|p| p.track));
            }
            state.tracks.entry(resource_id.to_string()).or_default().extend(ready);
        }

        Ok(state.tracks.get(resource_id).cloned().unwrap_or_default())
    }

    async fn download_track(&self, track_id: &str) -> Result<Bytes, ProviderError> {
        self.check_failure(MockOperation::DownloadTrack)?;
        self.state.lock()
            .track_content
            .get(track_id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(format!("Caption track {} not found", track_id)))
    }

    async fn insert_track(
        &self,
        resource_id: &str,
        language_tag: &str,
        name: &str,
        content: Bytes,
    ) -> Result<String, ProviderError> {
        self.check_failure(MockOperation::InsertTrack)?;
        let track_id = self.allocate_id("track");
        let mut state = self.state.lock();
        state.track_content.insert(track_id.clone(), content.clone());
        state.tracks.entry(resource_id.to_string()).or_default().push(CaptionTrackRef {
            video_id: resource_id.to_string(),
            language_tag: language_tag.to_string(),
            kind: TrackKind::Manual,
            track_id: track_id.clone(),
            name: Some(name.to_string()),
        });
        state.inserted_tracks.push(InsertedTrack {
            video_id: resource_id.to_string(),
            language_tag: language_tag.to_string(),
            name: name.to_string(),
            content,
        });
        Ok(track_id)
    }
}

#[async_trait]
impl VideoPublishService for MockPlatform {
    async fn insert_video(&self, media: Bytes, metadata: &Metadata) -> Result<String, ProviderError> {
        self.check_failure(MockOperation::InsertVideo)?;
        let video_id = self.allocate_id("video");
        debug!("mock: uploaded {} bytes as {}", media.len(), video_id);
        let mut state = self.state.lock();
        state.videos.insert(
            video_id.clone(),
            Visibility::scheduled(metadata.privacy, metadata.restore_schedule()),
        );
        state.uploaded_videos.push((video_id.clone(), metadata.clone()));
        Ok(video_id)
    }
}
