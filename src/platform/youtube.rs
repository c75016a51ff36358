/*!
 * YouTube Data API v3 client.
 *
 * Implements the three platform traits over plain REST calls:
 *
 * - `videos.list` / `videos.update` with `part=status` for visibility
 * - `captions.list`, `captions.download` (`tfmt=srt`) and a multipart
 *   `captions.insert`
 * - `videos.insert` as a resumable, chunked upload
 */

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use reqwest::{Client, Response, StatusCode, header};
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::time::Duration;

use super::{
    CaptionService, CaptionTrackRef, ResourceStateService, TrackKind, VideoPublishService,
    Visibility, VisibilityState,
};
use crate::app_config::YouTubeConfig;
use crate::auth::Credential;
use crate::errors::ProviderError;
use crate::metadata::{Metadata, format_publish_time};

const MULTIPART_BOUNDARY: &str = "ytsubflow_caption_boundary";

// Resends without progress before the upload gives up
const MAX_STALLED_CHUNKS: u32 = 3;

// 403 reasons that mean "slow down", not "not allowed"
const THROTTLE_REASONS: [&str; 4] = [
    "quotaExceeded",
    "rateLimitExceeded",
    "userRateLimitExceeded",
    "dailyLimitExceeded",
];

/// Client for the YouTube Data API
pub struct YouTubeClient {
    /// HTTP client for API requests
    client: Client,
    /// Bearer credential
    credential: Credential,
    /// Endpoints, chunk size and timeouts
    config: YouTubeConfig,
}

impl fmt::Debug for YouTubeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("YouTubeClient")
            .field("api_endpoint", &self.config.api_endpoint)
            .field("upload_endpoint", &self.config.upload_endpoint)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct ListResponse<T> {
    #[serde(default)]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct VideoResource {
    status: Option<VideoStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoStatus {
    privacy_status: String,
    #[serde(default)]
    publish_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct CaptionResource {
    id: String,
    snippet: CaptionSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionSnippet {
    language: String,
    #[serde(default)]
    track_kind: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct InsertedResource {
    id: String,
}

// @struct: Google API error body, `{"error": {"errors": [{"reason": ..}]}}`
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<Box<ErrorBody>>,
    #[serde(default)]
    errors: Vec<ErrorItem>,
}

#[derive(Debug, Deserialize)]
struct ErrorItem {
    #[serde(default)]
    reason: String,
}

impl ErrorBody {
    fn reasons(&self) -> impl Iterator<Item = &str> {
        self.errors
            .iter()
            .chain(self.error.iter().flat_map(|inner| inner.errors.iter()))
            .map(|item| item.reason.as_str())
    }
}

/// Map an error response, telling quota exhaustion apart from a real 403
fn classify_error(status: u16, body: String) -> ProviderError {
    if status == 403 {
        let parsed: ErrorBody = serde_json::from_str(&body).unwrap_or_default();
        if let Some(reason) = parsed.reasons().find(|r| THROTTLE_REASONS.contains(r)) {
            return ProviderError::RateLimitExceeded(format!("HTTP 403 ({}): {}", reason, body));
        }
    }
    ProviderError::from_status(status, body)
}

impl YouTubeClient {
    /// Create a new client
    pub fn new(credential: Credential, config: YouTubeConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                // 308 is the resumable-upload "incomplete" signal, not a redirect
                .redirect(reqwest::redirect::Policy::none())
                .build()
                .unwrap_or_default(),
            credential,
            config,
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_endpoint.trim_end_matches('/'), path)
    }

    fn upload_url(&self, path: &str) -> String {
        format!("{}/{}", self.config.upload_endpoint.trim_end_matches('/'), path)
    }

    /// Turn a non-success response into the matching error
    async fn check(response: Response) -> Result<Response, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let error_text = response.text().await
            .unwrap_or_else(|_| "Failed to get error response text".to_string());
        debug!("YouTube API error ({}): {}", status, error_text);
        Err(classify_error(status.as_u16(), error_text))
    }

    async fn parse_json<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T, ProviderError> {
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ProviderError::ParseError(format!("{}: {}", e, text)))
    }

    /// Opens a resumable session and returns its upload URI
    async fn start_resumable_upload(&self, metadata: &Metadata, total: usize) -> Result<String, ProviderError> {
        let mut status = json!({
            "privacyStatus": metadata.privacy.as_str(),
            "selfDeclaredMadeForKids": false,
        });
        if let Some(publish_at) = metadata.restore_schedule() {
            status["publishAt"] = json!(format_publish_time(&publish_at));
        }

        let mut snippet = json!({
            "title": metadata.title,
            "description": metadata.description,
            "tags": metadata.tags,
            "categoryId": metadata.category,
        });
        if let Some(language) = &metadata.default_audio_language {
            snippet["defaultAudioLanguage"] = json!(language);
        }

        let response = self.client
            .post(self.upload_url("videos"))
            .query(&[("uploadType", "resumable"), ("part", "snippet,status")])
            .header(header::AUTHORIZATION, self.credential.bearer())
            .header("X-Upload-Content-Length", total.to_string())
            .header("X-Upload-Content-Type", "video/*")
            .json(&json!({ "snippet": snippet, "status": status }))
            .send()
            .await?;
        let response = Self::check(response).await?;

        response.headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .ok_or_else(|| ProviderError::ParseError("Resumable upload response has no Location header".to_string()))
    }

    /// Upload chunks until the platform answers with the created resource
    async fn upload_chunks(&self, session_uri: &str, media: &Bytes) -> Result<String, ProviderError> {
        let total = media.len();
        let chunk_size = self.config.upload_chunk_size.max(1);

        let progress_bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {bytes}/{total_bytes} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));
        progress_bar.set_message("Uploading video");

        let mut offset = 0usize;
        let mut stalled = 0u32;
        loop {
            let end = (offset + chunk_size).min(total);
            let chunk = media.slice(offset..end);
            let content_range = if total == 0 {
                "bytes */0".to_string()
            } else {
                format!("bytes {}-{}/{}", offset, end - 1, total)
            };

            let response = self.client
                .put(session_uri)
                .header(header::AUTHORIZATION, self.credential.bearer())
                .header(header::CONTENT_RANGE, content_range)
                .body(chunk)
                .send()
                .await?;

            if response.status() == StatusCode::PERMANENT_REDIRECT {
                // `Range: bytes=0-N` tells how much the server kept; no header means nothing
                let kept = response.headers()
                    .get(header::RANGE)
                    .and_then(|v| v.to_str().ok())
                    .and_then(parse_range_end)
                    .map(|last| last + 1)
                    .unwrap_or(0);
                progress_bar.set_position(kept as u64);
                if kept >= total {
                    progress_bar.abandon();
                    return Err(ProviderError::RequestFailed(
                        "Upload session still incomplete after the final chunk".to_string(),
                    ));
                }
                if kept <= offset {
                    stalled += 1;
                    if stalled > MAX_STALLED_CHUNKS {
                        progress_bar.abandon();
                        return Err(ProviderError::RequestFailed(format!(
                            "Upload stalled at byte {} of {}", kept, total
                        )));
                    }
                    warn!("Upload resumed at byte {} after sending from {}", kept, offset);
                } else {
                    stalled = 0;
                }
                offset = kept;
                continue;
            }

            let response = Self::check(response).await?;
            progress_bar.finish_with_message("Upload complete");
            let created: InsertedResource = Self::parse_json(response).await?;
            return Ok(created.id);
        }
    }
}

/// Last byte index from a `bytes=0-N` range header
fn parse_range_end(range: &str) -> Option<usize> {
    range.trim()
        .strip_prefix("bytes=")?
        .split('-')
        .nth(1)?
        .trim()
        .parse()
        .ok()
}

#[async_trait]
impl ResourceStateService for YouTubeClient {
    async fn get_visibility(&self, resource_id: &str) -> Result<Visibility, ProviderError> {
        let response = self.client
            .get(self.api_url("videos"))
            .query(&[("part", "status"), ("id", resource_id)])
            .header(header::AUTHORIZATION, self.credential.bearer())
            .send()
            .await?;
        let list: ListResponse<VideoResource> = Self::parse_json(Self::check(response).await?).await?;

        let status = list.items
            .into_iter()
            .next()
            .and_then(|v| v.status)
            .ok_or_else(|| ProviderError::NotFound(format!("Video {} not found", resource_id)))?;

        let state: VisibilityState = status.privacy_status
            .parse()
            .map_err(|e: anyhow::Error| ProviderError::ParseError(e.to_string()))?;

        Ok(Visibility::scheduled(state, status.publish_at))
    }

    async fn set_visibility(
        &self,
        resource_id: &str,
        state: VisibilityState,
        publish_at: Option<DateTime<Utc>>,
    ) -> Result<(), ProviderError> {
        let mut status = json!({ "privacyStatus": state.as_str() });
        if let (VisibilityState::Private, Some(when)) = (state, publish_at) {
            status["publishAt"] = json!(format_publish_time(&when));
        }

        let response = self.client
            .put(self.api_url("videos"))
            .query(&[("part", "status")])
            .header(header::AUTHORIZATION, self.credential.bearer())
            .json(&json!({ "id": resource_id, "status": status }))
            .send()
            .await?;
        Self::check(response).await?;

        info!("Video {} is now {}", resource_id, state);
        Ok(())
    }
}

#[async_trait]
impl CaptionService for YouTubeClient {
    async fn list_tracks(&self, resource_id: &str) -> Result<Vec<CaptionTrackRef>, ProviderError> {
        let response = self.client
            .get(self.api_url("captions"))
            .query(&[("part", "snippet"), ("videoId", resource_id)])
            .header(header::AUTHORIZATION, self.credential.bearer())
            .send()
            .await?;
        let list: ListResponse<CaptionResource> = Self::parse_json(Self::check(response).await?).await?;

        Ok(list.items
            .into_iter()
            .map(|item| CaptionTrackRef {
                video_id: resource_id.to_string(),
                language_tag: item.snippet.language,
                kind: TrackKind::from_api(&item.snippet.track_kind),
                track_id: item.id,
                name: Some(item.snippet.name).filter(|n| !n.is_empty()),
            })
            .collect())
    }

    async fn download_track(&self, track_id: &str) -> Result<Bytes, ProviderError> {
        let response = self.client
            .get(self.api_url(&format!("captions/{}", track_id)))
            .query(&[("tfmt", "srt")])
            .header(header::AUTHORIZATION, self.credential.bearer())
            .send()
            .await?;
        let response = Self::check(response).await?;
        Ok(response.bytes().await?)
    }

    async fn insert_track(
        &self,
        resource_id: &str,
        language_tag: &str,
        name: &str,
        content: Bytes,
    ) -> Result<String, ProviderError> {
        let snippet = json!({
            "snippet": {
                "videoId": resource_id,
                "language": language_tag,
                "name": name,
                "isDraft": false,
            }
        });

        // captions.insert wants multipart/related: JSON metadata, then the media part
        let mut body = Vec::with_capacity(content.len() + 512);
        body.extend_from_slice(format!(
            "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{json}\r\n--{b}\r\nContent-Type: application/octet-stream\r\n\r\n",
            b = MULTIPART_BOUNDARY,
            json = snippet,
        ).as_bytes());
        body.extend_from_slice(&content);
        body.extend_from_slice(format!("\r\n--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());

        let response = self.client
            .post(self.upload_url("captions"))
            .query(&[("uploadType", "multipart"), ("part", "snippet")])
            .header(header::AUTHORIZATION, self.credential.bearer())
            .header(
                header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", MULTIPART_BOUNDARY),
            )
            .body(body)
            .send()
            .await?;
        let created: InsertedResource = Self::parse_json(Self::check(response).await?).await?;

        info!("Uploaded caption track {} ({}) to video {}", created.id, language_tag, resource_id);
        Ok(created.id)
    }
}

#[async_trait]
impl VideoPublishService for YouTubeClient {
    async fn insert_video(&self, media: Bytes, metadata: &Metadata) -> Result<String, ProviderError> {
        if media.is_empty() {
            warn!("Uploading an empty media file");
        }
        info!("Uploading \"{}\" ({} bytes, {})", metadata.title, media.len(), metadata.privacy);

        let session_uri = self.start_resumable_upload(metadata, media.len()).await?;
        debug!("Resumable session: {}", session_uri);

        let video_id = self.upload_chunks(&session_uri, &media).await?;
        info!("Upload complete. Video ID: {}", video_id);
        Ok(video_id)
    }
}
