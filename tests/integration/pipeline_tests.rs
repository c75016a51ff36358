/*!
 * End-to-end pipeline tests against the in-memory platform
 *
 * The clock is paused so caption polling completes without real waits.
 */

use anyhow::Result;
use chrono::{TimeZone, Utc};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use ytsubflow::captions::RetryPolicy;
use ytsubflow::file_utils::RunPaths;
use ytsubflow::metadata::Metadata;
use ytsubflow::pipeline::{
    CaptionSettings, PipelineCoordinator, PipelineReport, PipelineServices, RunContext, Stage, StageOutcome,
};
use ytsubflow::platform::mock::{MockFailure, MockOperation, MockPlatform};
use ytsubflow::platform::{Visibility, VisibilityState};
use ytsubflow::providers::mock::MockGenerator;
use ytsubflow::regeneration::RegenerationOrchestrator;
use ytsubflow::subtitle_processor::SrtCanonicalizer;
use crate::common::{self, mock_media::MockMedia};

fn coordinator(platform: &MockPlatform, media: MockMedia, generator: Option<MockGenerator>) -> PipelineCoordinator {
    let services = PipelineServices {
        image_preparer: Arc::new(media.clone()),
        video_assembler: Arc::new(media),
        publisher: Arc::new(platform.clone()),
        resource_state: Arc::new(platform.clone()),
        captions: Arc::new(platform.clone()),
        regenerator: generator.map(|g| RegenerationOrchestrator::new(Arc::new(g), "te", "en")),
    };
    PipelineCoordinator::new(services, CaptionSettings::default())
}

fn media_context(root: &Path, metadata: Metadata) -> Result<RunContext> {
    common::init_test_logging();
    let song_dir = common::create_song_dir(root, "song", true)?;
    let paths = RunPaths::for_song(root.join("data"), root.join("output"), "song");
    Ok(RunContext::from_media(paths, song_dir.join("cover.png"), song_dir.join("song.mp3"), metadata)
        .with_reference(Some(common::REFERENCE_TEXT.to_string()), common::RULE_TEXT))
}

fn outcome(report: &PipelineReport, stage: Stage) -> StageOutcome {
    report.outcome(stage).cloned().unwrap_or_else(|| panic!("{} missing from report", stage))
}

fn assert_skipped(report: &PipelineReport, stages: &[Stage]) {
    for stage in stages {
        assert!(
            matches!(outcome(report, *stage), StageOutcome::Skipped(_)),
            "{} should be skipped: {}",
            stage,
            report
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_run_withAllStagesSucceeding_shouldUploadFinalTrackAndRestorePrivacy() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let platform = MockPlatform::new().with_auto_track("video-1", "te", common::AUTO_CAPTIONS, 2);
    let generator = MockGenerator::echo_captions();
    let ctx = media_context(temp_dir.path(), Metadata::default())?;

    let report = coordinator(&platform, MockMedia::new(), Some(generator.clone())).run(&ctx).await;

    assert!(report.is_success(), "{}", report);
    assert_eq!(report.stages.len(), Stage::ALL.len());
    for stage in Stage::ALL {
        assert!(matches!(outcome(&report, stage), StageOutcome::Succeeded(_)), "{}", report);
    }
    assert_eq!(report.video_id.as_deref(), Some("video-1"));
    assert_eq!(report.uploaded_track_id.as_deref(), Some("track-2"));
    assert_eq!(platform.list_calls(), 2);
    assert_eq!(generator.request_count(), 1);

    // Private again after the temporary unlisted window
    let states: Vec<VisibilityState> = platform.visibility_changes().into_iter().map(|(_, s, _)| s).collect();
    assert_eq!(states, vec![VisibilityState::Unlisted, VisibilityState::Private]);
    assert_eq!(platform.visibility_of("video-1").map(|v| v.state), Some(VisibilityState::Private));

    let expected = SrtCanonicalizer::canonicalize(common::AUTO_CAPTIONS);
    let inserted = platform.inserted_tracks();
    assert_eq!(inserted.len(), 1);
    assert_eq!(inserted[0].language_tag, "te");
    assert_eq!(inserted[0].name, "Telugu + English Meaning");
    assert_eq!(SrtCanonicalizer::canonicalize(&String::from_utf8_lossy(&inserted[0].content)), expected);

    let auto_path = report.auto_captions_path.clone().expect("auto captions saved");
    let final_path = report.final_captions_path.clone().expect("final captions saved");
    assert!(auto_path.ends_with("output/song/song.auto.te.srt"));
    assert!(final_path.ends_with("output/song/song.te.srt"));
    assert_eq!(SrtCanonicalizer::canonicalize(&std::fs::read_to_string(auto_path)?), expected);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_run_withScheduledPrivateUpload_shouldRestoreSchedule() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let publish_at = Utc.with_ymd_and_hms(2025, 11, 24, 4, 30, 0).unwrap();
    let metadata = Metadata {
        scheduled_publish_utc: Some(publish_at),
        ..Metadata::default()
    };
    let platform = MockPlatform::new().with_auto_track("video-1", "te", common::AUTO_CAPTIONS, 1);
    let ctx = media_context(temp_dir.path(), metadata)?;

    let report = coordinator(&platform, MockMedia::new(), Some(MockGenerator::echo_captions())).run(&ctx).await;

    assert!(report.is_success(), "{}", report);
    assert_eq!(
        platform.visibility_of("video-1"),
        Some(Visibility::scheduled(VisibilityState::Private, Some(publish_at)))
    );
    assert_eq!(platform.uploaded_videos()[0].1.scheduled_publish_utc, Some(publish_at));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_run_withUploadFailure_shouldSkipEverythingAfterUpload() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let platform = MockPlatform::new().fail(MockOperation::InsertVideo, MockFailure::Unavailable);
    let ctx = media_context(temp_dir.path(), Metadata::default())?;

    let report = coordinator(&platform, MockMedia::new(), Some(MockGenerator::echo_captions())).run(&ctx).await;

    assert!(!report.is_success());
    assert_eq!(report.first_failure().map(|(s, _)| s), Some(Stage::Upload));
    assert_skipped(&report, &[Stage::CaptionPoll, Stage::Download, Stage::Regenerate, Stage::ReUpload]);
    assert_eq!(platform.list_calls(), 0);
    assert!(platform.visibility_changes().is_empty());
    assert!(report.video_id.is_none());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_run_withImageFailure_shouldNotAssembleOrUpload() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let platform = MockPlatform::new();
    let media = MockMedia::failing_image();
    let ctx = media_context(temp_dir.path(), Metadata::default())?;

    let report = coordinator(&platform, media.clone(), None).run(&ctx).await;

    assert_eq!(report.first_failure().map(|(s, _)| s), Some(Stage::ImagePrep));
    assert_skipped(&report, &[Stage::VideoAssembly, Stage::Upload, Stage::ReUpload]);
    assert_eq!(media.calls(), 1);
    assert!(platform.uploaded_videos().is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_run_withCaptionsNeverReady_shouldFailPollAndRestorePrivacy() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let platform = MockPlatform::new();
    let ctx = media_context(temp_dir.path(), Metadata::default())?;
    let settings = CaptionSettings {
        policy: RetryPolicy::new(Duration::from_secs(90), Duration::from_secs(30)),
        ..CaptionSettings::default()
    };
    let services = PipelineServices {
        image_preparer: Arc::new(MockMedia::new()),
        video_assembler: Arc::new(MockMedia::new()),
        publisher: Arc::new(platform.clone()),
        resource_state: Arc::new(platform.clone()),
        captions: Arc::new(platform.clone()),
        regenerator: None,
    };

    let report = PipelineCoordinator::new(services, settings).run(&ctx).await;

    assert_eq!(report.first_failure().map(|(s, _)| s), Some(Stage::CaptionPoll));
    assert!(outcome(&report, Stage::CaptionPoll).detail().contains("3 attempts"));
    assert_skipped(&report, &[Stage::Download, Stage::Regenerate, Stage::ReUpload]);
    assert_eq!(platform.list_calls(), 3);
    assert_eq!(platform.visibility_of("video-1").map(|v| v.state), Some(VisibilityState::Private));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_run_withExpiredCredentialDuringPoll_shouldStopAndRestore() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let platform = MockPlatform::new().fail(MockOperation::ListTracks, MockFailure::Unauthorized);
    let ctx = media_context(temp_dir.path(), Metadata::default())?;

    let report = coordinator(&platform, MockMedia::new(), None).run(&ctx).await;

    assert_eq!(report.first_failure().map(|(s, _)| s), Some(Stage::CaptionPoll));
    assert_eq!(platform.list_calls(), 1);
    assert_eq!(platform.visibility_of("video-1").map(|v| v.state), Some(VisibilityState::Private));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_run_withoutReference_shouldStopAfterDownload() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let platform = MockPlatform::new().with_auto_track("video-1", "te", common::AUTO_CAPTIONS, 1);
    let generator = MockGenerator::echo_captions();
    let ctx = media_context(temp_dir.path(), Metadata::default())?.with_reference(None, "");

    let report = coordinator(&platform, MockMedia::new(), Some(generator.clone())).run(&ctx).await;

    assert!(report.is_success(), "{}", report);
    assert_skipped(&report, &[Stage::Regenerate, Stage::ReUpload]);
    assert!(outcome(&report, Stage::Regenerate).detail().contains("no reference"));
    assert!(report.auto_captions_path.is_some());
    assert!(report.final_captions_path.is_none());
    assert_eq!(generator.request_count(), 0);
    assert!(platform.inserted_tracks().is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_run_withUselessRewrite_shouldFailRegenerateAndSkipUpload() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let platform = MockPlatform::new().with_auto_track("video-1", "te", common::AUTO_CAPTIONS, 1);
    let generator = MockGenerator::fixed("Sorry, I cannot help with that.");
    let ctx = media_context(temp_dir.path(), Metadata::default())?;

    let report = coordinator(&platform, MockMedia::new(), Some(generator)).run(&ctx).await;

    assert_eq!(report.first_failure().map(|(s, _)| s), Some(Stage::Regenerate));
    assert!(outcome(&report, Stage::Regenerate).detail().contains("no valid cues"));
    assert_skipped(&report, &[Stage::ReUpload]);
    assert!(platform.inserted_tracks().is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_run_withEmptyAsrTrack_shouldFailDownload() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let platform = MockPlatform::new().with_auto_track("video-1", "te", "1\n00:00:01,000 --> 00:00:02,000\n[Music]\n", 1);
    let ctx = media_context(temp_dir.path(), Metadata::default())?;

    let report = coordinator(&platform, MockMedia::new(), Some(MockGenerator::echo_captions())).run(&ctx).await;

    assert_eq!(report.first_failure().map(|(s, _)| s), Some(Stage::Download));
    assert_skipped(&report, &[Stage::Regenerate, Stage::ReUpload]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_run_withExistingPublicVideo_shouldSkipMediaAndLeaveVisibility() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let platform = MockPlatform::new()
        .with_video("abc123", Visibility::new(VisibilityState::Public))
        .with_auto_track("abc123", "te", common::AUTO_CAPTIONS, 1);
    let paths = RunPaths::for_song(temp_dir.path().join("data"), temp_dir.path().join("output"), "abc123");
    let ctx = RunContext::existing_video(paths, "abc123", Metadata::default())
        .with_reference(Some(common::REFERENCE_TEXT.to_string()), "");

    let report = coordinator(&platform, MockMedia::new(), Some(MockGenerator::echo_captions())).run(&ctx).await;

    assert!(report.is_success(), "{}", report);
    assert_skipped(&report, &[Stage::ImagePrep, Stage::VideoAssembly, Stage::Upload]);
    assert!(platform.visibility_changes().is_empty());
    assert_eq!(platform.inserted_tracks()[0].video_id, "abc123");
    assert!(report.final_captions_path.unwrap().ends_with("abc123.te.srt"));
    Ok(())
}
