/*!
 * Tests for error types and conversions
 */

use ytsubflow::errors::{AppError, PipelineError, ProviderError};

#[test]
fn test_providerError_apiError_shouldDisplayStatusAndMessage() {
    let error = ProviderError::ApiError {
        status_code: 500,
        message: "backend error".to_string(),
    };
    let display = format!("{}", error);
    assert!(display.contains("500"));
    assert!(display.contains("backend error"));
}

#[test]
fn test_providerError_fromStatus_shouldPickVariant() {
    assert!(matches!(ProviderError::from_status(401, "x"), ProviderError::AuthenticationError(_)));
    assert!(matches!(ProviderError::from_status(404, "x"), ProviderError::NotFound(_)));
    assert!(matches!(ProviderError::from_status(429, "x"), ProviderError::RateLimitExceeded(_)));
    assert!(matches!(
        ProviderError::from_status(400, "x"),
        ProviderError::ApiError { status_code: 400, .. }
    ));
}

#[test]
fn test_providerError_connectionError_shouldBeTransient() {
    assert!(ProviderError::ConnectionError("reset".to_string()).is_transient());
    assert!(!ProviderError::ParseError("bad json".to_string()).is_transient());
    assert!(!ProviderError::AuthenticationError("expired".to_string()).is_transient());
}

#[test]
fn test_pipelineError_fromProviderError_shouldWrap() {
    let error: PipelineError = ProviderError::NotFound("video abc".to_string()).into();
    let display = format!("{}", error);
    assert!(display.contains("Provider error"));
    assert!(display.contains("video abc"));
    assert!(!error.is_authorization());
}

#[test]
fn test_pipelineError_emptyRegeneration_shouldDisplayCorrectly() {
    assert_eq!(PipelineError::EmptyRegeneration.to_string(), "Regeneration produced no valid cues");
}

#[test]
fn test_appError_conversions_shouldPreserveMessages() {
    let from_io: AppError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
    assert!(matches!(from_io, AppError::File(ref m) if m.contains("gone")));

    let from_anyhow: AppError = anyhow::anyhow!("odd").into();
    assert!(matches!(from_anyhow, AppError::Unknown(ref m) if m == "odd"));

    let from_pipeline: AppError = PipelineError::InvalidPolicy("zero interval".to_string()).into();
    assert!(from_pipeline.to_string().contains("zero interval"));
}
