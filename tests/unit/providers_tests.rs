/*!
 * Tests for provider implementations
 */

use tmflow::errors::ProviderError;
use tmflow::providers::huggingface::{HuggingFace, HuggingFaceResponse};
use tmflow::providers::mock::{MockBehavior, MockProvider};
use tmflow::providers::self_hosted::SelfHosted;
use tmflow::providers::{Provider, TranslationBackend};

fn texts(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Test the mock through the object-safe backend trait
#[tokio::test]
async fn test_mockProvider_asBackend_shouldTranslateInOrder() {
    let provider = MockProvider::working();
    let backend: &dyn TranslationBackend = &provider;

    let result = backend
        .translate_batch(&texts(&["Yes", "No"]), "en_XX", "it_IT")
        .await
        .unwrap();

    assert_eq!(backend.backend_name(), "mock");
    assert_eq!(result, vec![Some("[it_IT] Yes".to_string()), Some("[it_IT] No".to_string())]);
    assert_eq!(provider.received_batches(), vec![texts(&["Yes", "No"])]);
}

/// Test that an empty batch never reaches the provider
#[tokio::test]
async fn test_translateBatch_withEmptyInput_shouldSkipRequest() {
    let provider = MockProvider::working();
    let result = provider.translate_batch(&[], "en_XX", "fr_XX").await.unwrap();

    assert!(result.is_empty());
    assert_eq!(provider.call_count(), 0);
}

/// Test the intermittent mock fails on every nth call only
#[tokio::test]
async fn test_mockProvider_intermittent_shouldFailEveryNthCall() {
    let provider = MockProvider::intermittent(3);
    let mut outcomes = Vec::new();

    for _ in 0..6 {
        outcomes.push(provider.translate_batch(&texts(&["x"]), "en_XX", "fr_XX").await.is_ok());
    }

    assert_eq!(outcomes, vec![true, true, false, true, true, false]);
}

/// Test custom translation functions
#[tokio::test]
async fn test_mockProvider_withCustomTranslation_shouldUseIt() {
    let provider = MockProvider::working().with_custom_translation(|text, _| text.to_uppercase());
    let result = provider.translate_batch(&texts(&["abc"]), "en_XX", "fr_XX").await.unwrap();

    assert_eq!(result, vec![Some("ABC".to_string())]);
}

/// Test clones share request history
#[tokio::test]
async fn test_mockProvider_clone_shouldShareState() {
    let provider = MockProvider::new(MockBehavior::Working);
    let clone = provider.clone();

    clone.translate_batch(&texts(&["a"]), "en_XX", "fr_XX").await.unwrap();

    assert_eq!(provider.call_count(), 1);
    assert_eq!(provider.requests()[0].target_tag, "fr_XX");
}

/// Test connection checks of the mock
#[tokio::test]
async fn test_mockProvider_checkConnection_shouldFailOnlyWhenFailing() {
    assert!(MockProvider::working().check_connection().await.is_ok());
    assert!(MockProvider::failing().check_connection().await.is_err());
}

/// Test Hugging Face response decoding for the shapes the service produces
#[test]
fn test_huggingFace_decode_shouldAcceptKnownShapes() {
    let response = HuggingFace::decode(r#"[{"translation_text": "Bonjour"}, {"generated_text": "Salut"}]"#).unwrap();
    let translations = HuggingFace::extract_translations(response).unwrap();
    assert_eq!(translations, vec![Some("Bonjour".to_string()), Some("Salut".to_string())]);
}

/// Test an error object decodes but is not accepted as a translation
#[test]
fn test_huggingFace_decode_withErrorObject_shouldBeUnrecognized() {
    let response = HuggingFace::decode(r#"{"error": "Model is currently loading"}"#).unwrap();
    assert!(matches!(response, HuggingFaceResponse::Unrecognized(_)));

    let result = HuggingFace::extract_translations(response);
    assert!(matches!(result, Err(ProviderError::UnrecognizedResponseShape(_))));
}

/// Test that non-JSON bodies are parse errors
#[test]
fn test_huggingFace_decode_withInvalidJson_shouldFail() {
    let result = HuggingFace::decode("<html>Bad gateway</html>");
    assert!(matches!(result, Err(ProviderError::ParseError(_))));
}

/// Test request construction for both HTTP clients
#[test]
fn test_buildRequest_shouldCarryTextsAndTags() {
    let hosted = HuggingFace::new("token", "", "", 30);
    let request = serde_json::to_value(hosted.build_request(&texts(&["Hi"]), "en_XX", "de_DE")).unwrap();
    assert_eq!(
        request,
        serde_json::json!({"inputs": ["Hi"], "parameters": {"src_lang": "en_XX", "tgt_lang": "de_DE"}})
    );
    assert!(hosted.api_url().ends_with("/facebook/mbart-large-50-many-to-many-mmt"));

    let local = SelfHosted::new("http://10.1.1.1:9000", 30);
    let request = serde_json::to_value(local.build_request(&texts(&["Hi"]), "en_XX", "de_DE")).unwrap();
    assert_eq!(request["text"], serde_json::json!(["Hi"]));
    assert_eq!(local.api_url(), "http://10.1.1.1:9000/translate");
}
