/*!
 * Tests for generative-text provider implementations
 */

use mockito::{Matcher, Server};
use ytsubflow::app_config::{GenerationConfig, GenerationProvider, ProviderConfig};
use ytsubflow::app_controller::build_generator;
use ytsubflow::errors::ProviderError;
use ytsubflow::providers::TextGenerator;
use ytsubflow::providers::mock::MockGenerator;

fn generation_config(provider: GenerationProvider, endpoint: &str, api_key: &str) -> GenerationConfig {
    GenerationConfig {
        provider: provider.clone(),
        available_providers: vec![ProviderConfig {
            api_key: api_key.to_string(),
            api_key_env: "YTSUBFLOW_TEST_UNSET_KEY".to_string(),
            endpoint: endpoint.to_string(),
            timeout_secs: 5,
            ..ProviderConfig::new(provider)
        }],
        ..GenerationConfig::default()
    }
}

#[tokio::test]
async fn test_mockGenerator_withFailingBehavior_shouldReturnTransientError() {
    let generator = MockGenerator::failing();

    let err = generator.generate("prompt").await.unwrap_err();

    assert!(err.is_transient());
    assert!(!err.is_authorization());
    assert_eq!(generator.request_count(), 1);
}

#[tokio::test]
async fn test_mockGenerator_clones_shouldShareCounters() {
    let generator = MockGenerator::fixed("text");
    let clone = generator.clone();

    clone.generate("first").await.unwrap();
    generator.generate("second").await.unwrap();

    assert_eq!(generator.request_count(), 2);
    assert_eq!(clone.last_prompt().as_deref(), Some("second"));
}

#[test]
fn test_build_generator_withoutApiKey_shouldFail() {
    let config = generation_config(GenerationProvider::Gemini, "", "");
    assert!(build_generator(&config).is_err());
}

#[tokio::test]
async fn test_build_generator_withGeminiConfig_shouldCallGenerateContent() {
    let mut server = Server::new_async().await;
    let mock = server.mock("POST", Matcher::Regex(r"^/v1beta/models/.+:generateContent$".into()))
        .match_query(Matcher::UrlEncoded("key".into(), "gemini-key".into()))
        .with_status(200)
        .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"1\n00:00:01,000 --> 00:00:02,000\nok"}]}}]}"#)
        .create_async()
        .await;

    let config = generation_config(GenerationProvider::Gemini, &server.url(), "gemini-key");
    let generator = build_generator(&config).unwrap();
    let text = generator.generate("prompt").await.unwrap();

    mock.assert_async().await;
    assert!(text.ends_with("ok"));
    assert!(generator.describe().starts_with("gemini:"));
}

#[tokio::test]
async fn test_build_generator_withAnthropicConfig_shouldCallMessages() {
    let mut server = Server::new_async().await;
    let mock = server.mock("POST", "/v1/messages")
        .match_header("x-api-key", "anthropic-key")
        .match_header("anthropic-version", "2023-06-01")
        .with_status(200)
        .with_body(r#"{"content":[{"type":"text","text":"srt"}]}"#)
        .create_async()
        .await;

    let config = generation_config(GenerationProvider::Anthropic, &server.url(), "anthropic-key");
    let generator = build_generator(&config).unwrap();

    assert_eq!(generator.generate("prompt").await.unwrap(), "srt");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_anthropic_withServerError_shouldBeTransient() {
    let mut server = Server::new_async().await;
    server.mock("POST", "/v1/messages")
        .with_status(529)
        .with_body("overloaded")
        .create_async()
        .await;

    let config = generation_config(GenerationProvider::Anthropic, &server.url(), "k");
    let err = build_generator(&config).unwrap().generate("prompt").await.unwrap_err();

    assert!(matches!(err, ProviderError::ApiError { status_code: 529, .. }));
    assert!(err.is_transient());
}
