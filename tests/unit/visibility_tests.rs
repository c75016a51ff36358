/*!
 * Tests for temporary visibility and its restoration
 */

use chrono::{TimeZone, Utc};
use std::sync::Arc;
use ytsubflow::captions::{VisibilityGuard, with_temporary_visibility};
use ytsubflow::errors::PipelineError;
use ytsubflow::platform::mock::{MockFailure, MockOperation, MockPlatform};
use ytsubflow::platform::{Visibility, VisibilityState};

fn private_video() -> MockPlatform {
    MockPlatform::new().with_video("vid", Visibility::new(VisibilityState::Private))
}

#[tokio::test]
async fn test_with_temporary_visibility_withPrivateVideo_shouldRestoreAfterSuccess() {
    let platform = private_video();
    let observed = platform.clone();

    let result = with_temporary_visibility(
        Arc::new(platform.clone()),
        "vid",
        VisibilityState::Unlisted,
        None,
        || async move {
            Ok::<_, PipelineError>(observed.visibility_of("vid").map(|v| v.state))
        },
    )
    .await
    .unwrap();

    assert_eq!(result, Some(VisibilityState::Unlisted));
    assert_eq!(platform.visibility_of("vid").unwrap().state, VisibilityState::Private);
    let states: Vec<VisibilityState> = platform.visibility_changes().into_iter().map(|(_, s, _)| s).collect();
    assert_eq!(states, vec![VisibilityState::Unlisted, VisibilityState::Private]);
}

#[tokio::test]
async fn test_with_temporary_visibility_withFailingWork_shouldStillRestore() {
    let platform = private_video();

    let result: Result<(), PipelineError> = with_temporary_visibility(
        Arc::new(platform.clone()),
        "vid",
        VisibilityState::Unlisted,
        None,
        || async { Err(PipelineError::EmptyRegeneration) },
    )
    .await;

    assert!(matches!(result, Err(PipelineError::EmptyRegeneration)));
    assert_eq!(platform.visibility_of("vid").unwrap().state, VisibilityState::Private);
}

#[tokio::test]
async fn test_restore_withScheduledPublish_shouldReapplySchedule() {
    let publish_at = Utc.with_ymd_and_hms(2025, 11, 24, 4, 30, 0).unwrap();
    let platform = MockPlatform::new()
        .with_video("vid", Visibility::scheduled(VisibilityState::Private, Some(publish_at)));

    let guard = VisibilityGuard::acquire(Arc::new(platform.clone()), "vid", VisibilityState::Unlisted, None)
        .await
        .unwrap();
    assert!(guard.changed());
    assert_eq!(guard.original().publish_at, Some(publish_at));
    guard.restore().await;

    let changes = platform.visibility_changes();
    assert_eq!(changes[0].2, None);
    assert_eq!(changes[1], ("vid".to_string(), VisibilityState::Private, Some(publish_at)));
}

#[tokio::test]
async fn test_restore_withOverrideSchedule_shouldPreferOverride() {
    let captured = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let override_at = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
    let platform = MockPlatform::new()
        .with_video("vid", Visibility::scheduled(VisibilityState::Private, Some(captured)));

    let guard = VisibilityGuard::acquire(Arc::new(platform.clone()), "vid", VisibilityState::Public, Some(override_at))
        .await
        .unwrap();
    guard.restore().await;

    assert_eq!(platform.visibility_of("vid").unwrap().publish_at, Some(override_at));
}

#[tokio::test]
async fn test_restore_withPlatformFailure_shouldNotPropagate() {
    let platform = private_video();
    let guard = VisibilityGuard::acquire(Arc::new(platform.clone()), "vid", VisibilityState::Unlisted, None)
        .await
        .unwrap();

    // The temporary change already happened; make the restore call fail
    let platform = platform.fail(MockOperation::SetVisibility, MockFailure::Unavailable);
    guard.restore().await;

    assert_eq!(platform.visibility_of("vid").unwrap().state, VisibilityState::Unlisted);
    assert_eq!(platform.visibility_changes().len(), 1);
}

#[tokio::test]
async fn test_drop_withoutRestore_shouldRestoreInBackground() {
    let platform = private_video();
    {
        let _guard = VisibilityGuard::acquire(Arc::new(platform.clone()), "vid", VisibilityState::Unlisted, None)
            .await
            .unwrap();
        assert_eq!(platform.visibility_of("vid").unwrap().state, VisibilityState::Unlisted);
    }

    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    assert_eq!(platform.visibility_of("vid").unwrap().state, VisibilityState::Private);
}

#[tokio::test]
async fn test_acquire_withReadFailure_shouldNotChangeVisibility() {
    let platform = private_video().fail(MockOperation::GetVisibility, MockFailure::Unauthorized);

    let err = VisibilityGuard::acquire(Arc::new(platform.clone()), "vid", VisibilityState::Unlisted, None)
        .await
        .unwrap_err();

    assert!(err.is_authorization());
    assert!(platform.visibility_changes().is_empty());
}

#[tokio::test]
async fn test_acquire_withUnlistedVideo_shouldLeaveItAlone() {
    let platform = MockPlatform::new().with_video("vid", Visibility::new(VisibilityState::Unlisted));

    let guard = VisibilityGuard::acquire(Arc::new(platform.clone()), "vid", VisibilityState::Public, None)
        .await
        .unwrap();
    assert!(!guard.changed());
    drop(guard);
    tokio::task::yield_now().await;

    assert!(platform.visibility_changes().is_empty());
}
