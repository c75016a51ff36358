/*!
 * # ytsubflow - caption lifecycle automation for song uploads
 *
 * Turns a song (audio plus cover image) into a captioned video on YouTube.
 *
 * ## Features
 *
 * - Still-image video assembly through ffmpeg
 * - Resumable video upload with scheduled publishing
 * - Auto-generated caption polling with temporary visibility changes
 * - SRT canonicalization of platform and model output
 * - Caption rewriting with a generative-text provider:
 *   - Gemini API
 *   - Anthropic API
 * - Final caption track upload
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `subtitle_processor`: SRT parsing, canonicalization and serialization
 * - `platform`: Video platform abstractions:
 *   - `platform::youtube`: YouTube Data API client
 *   - `platform::mock`: In-memory platform for tests
 * - `captions`: Caption polling and the temporary visibility guard
 * - `regeneration`: Prompt rendering and caption rewriting
 * - `pipeline`: Stage sequencing and run reports
 * - `media`: ffmpeg image and video tooling
 * - `providers`: Generative-text clients:
 *   - `providers::gemini`: Gemini API client
 *   - `providers::anthropic`: Anthropic API client
 * - `app_controller`: Main application controller
 * - `metadata`, `auth`, `file_utils`, `language_utils`: supporting utilities
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod auth;
pub mod captions;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod media;
pub mod metadata;
pub mod pipeline;
pub mod platform;
pub mod providers;
pub mod regeneration;
pub mod subtitle_processor;

// Re-export main types for easier usage
pub use app_config::Config;
pub use captions::{CaptionPoller, PollOutcome, RetryPolicy, VisibilityGuard};
pub use errors::{AppError, PipelineError, ProviderError};
pub use pipeline::{PipelineCoordinator, PipelineReport, Stage, StageOutcome};
pub use regeneration::RegenerationOrchestrator;
pub use subtitle_processor::{Cue, SrtCanonicalizer, SubtitleDocument};
