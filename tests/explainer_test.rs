mod helpers;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use ai_explainer::blob::{BlobStore, MemoryBlobStore, Scope};
use ai_explainer::explainer::{
    ExplainRequest, Explainer, Provenance, Stored, Subject, DEFAULT_PROMPT_NAME,
};
use ai_explainer::history::store::LEGACY_KEY;
use ai_explainer::history::{ContextType, HistoryStore};
use ai_explainer::llm::{ContentPart, MessageContent, Role};
use ai_explainer::prompt::{GlobalSettings, PromptConfig, Tunable};
use ai_explainer::ExplainerError;
use helpers::{FakeBackend, FlakyBlobStore};

fn configured(blobs: &dyn BlobStore) {
    GlobalSettings {
        api_endpoint: Some("https://llm.example/v1/chat/completions".into()),
        api_key: Some("sk-test".into()),
        api_model: Some("gpt-4o-mini".into()),
        max_tokens: Some(300),
        system_prompt: Some("Be brief.".into()),
        user_prompt_template: None,
    }
    .save(blobs)
    .unwrap();
}

fn explainer(blobs: Arc<dyn BlobStore>, backend: Arc<FakeBackend>) -> Explainer {
    let history = Arc::new(HistoryStore::new(Arc::clone(&blobs)));
    Explainer::new(blobs, history, backend)
}

#[tokio::test]
async fn text_explanation_is_sent_and_recorded() {
    let blobs: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    configured(blobs.as_ref());
    let backend = FakeBackend::replying("It means hello.");
    let explainer = explainer(Arc::clone(&blobs), Arc::clone(&backend));

    let selection = "Bonjour tout le monde, comment allez-vous aujourd'hui?";
    let result = explainer
        .explain(ExplainRequest::new(Subject::Text(selection.into())))
        .await
        .unwrap();
    assert_eq!(result.text, "It means hello.");

    let (endpoint, request) = backend.last_request();
    assert_eq!(endpoint.url, "https://llm.example/v1/chat/completions");
    assert_eq!(endpoint.api_key, "sk-test");
    assert_eq!(request.model, "gpt-4o-mini");
    assert_eq!(request.max_tokens, 300);
    assert_eq!(request.messages.len(), 2);
    assert_eq!(request.messages[0].role, Role::System);
    assert_eq!(request.messages[0].content, MessageContent::Text("Be brief.".into()));
    assert_eq!(
        request.messages[1].content,
        MessageContent::Text(format!("Please analyze the following text:\n\n{selection}"))
    );

    let Stored::Durable(id) = result.stored else {
        panic!("expected a durable record");
    };
    let record = explainer.history().get(id).unwrap().unwrap();
    assert_eq!(record.text, selection);
    assert_eq!(record.explanation, "It means hello.");
    assert_eq!(record.prompt_name.as_deref(), Some(DEFAULT_PROMPT_NAME));
    assert_eq!(record.source_info.as_deref(), Some("Bonjour tout le monde, comment..."));
}

#[tokio::test]
async fn named_prompt_overrides_apply() {
    let blobs: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    configured(blobs.as_ref());
    let backend = FakeBackend::replying("Hello");
    let explainer = explainer(Arc::clone(&blobs), Arc::clone(&backend));

    let mut prompt = PromptConfig::new("Translate", "Translate to English:\n\n{text}");
    prompt.max_tokens = Tunable::Explicit(1000);
    prompt.model = Tunable::Inherit;

    explainer
        .explain(ExplainRequest::new(Subject::Text("Hallo".into())).with_prompt(prompt))
        .await
        .unwrap();

    let (_, request) = backend.last_request();
    assert_eq!(request.max_tokens, 1000);
    assert_eq!(request.model, "gpt-4o-mini");
    assert_eq!(
        request.messages[1].content,
        MessageContent::Text("Translate to English:\n\nHallo".into())
    );
    assert_eq!(explainer.history().search("", Some("Translate")).unwrap().len(), 1);
}

#[tokio::test]
async fn image_request_prefers_inline_data() {
    let blobs: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    configured(blobs.as_ref());
    let backend = FakeBackend::replying("A cat on a mat.");
    let explainer = explainer(Arc::clone(&blobs), Arc::clone(&backend));

    let result = explainer
        .explain(ExplainRequest::new(Subject::Image {
            url: "https://example.com/cat.png".into(),
            data: Some("data:image/png;base64,AAAA".into()),
        }))
        .await
        .unwrap();

    let (_, request) = backend.last_request();
    let MessageContent::Parts(parts) = &request.messages[1].content else {
        panic!("image request should use content parts");
    };
    assert!(matches!(&parts[0], ContentPart::Text { .. }));
    match &parts[1] {
        ContentPart::ImageUrl { image_url } => {
            assert_eq!(image_url.url, "data:image/png;base64,AAAA");
            assert_eq!(image_url.detail, "auto");
        }
        other => panic!("unexpected part {other:?}"),
    }

    let Stored::Durable(id) = result.stored else {
        panic!("expected a durable record");
    };
    let record = explainer.history().get(id).unwrap().unwrap();
    assert_eq!(record.context_type, ContextType::Image);
    assert_eq!(record.text, "https://example.com/cat.png");
    assert_eq!(record.image_data.as_deref(), Some("data:image/png;base64,AAAA"));
    assert_eq!(record.source_info.as_deref(), Some("Image analysis"));
}

#[tokio::test]
async fn page_explanation_records_provenance() {
    let blobs: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    configured(blobs.as_ref());
    let backend = FakeBackend::replying("Summary.");
    let explainer = explainer(Arc::clone(&blobs), Arc::clone(&backend));

    let result = explainer
        .explain(
            ExplainRequest::new(Subject::Page {
                markdown: "# Ownership\n\nEach value has an owner.".into(),
            })
            .with_provenance(Provenance {
                page_url: Some("https://doc.rust-lang.org/book/ch04-01.html".into()),
                page_title: Some("What is Ownership?".into()),
            }),
        )
        .await
        .unwrap();

    let Stored::Durable(id) = result.stored else {
        panic!("expected a durable record");
    };
    let record = explainer.history().get(id).unwrap().unwrap();
    assert_eq!(record.context_type, ContextType::Page);
    assert_eq!(record.source_info.as_deref(), Some("What is Ownership?"));
    assert_eq!(record.page_title.as_deref(), Some("What is Ownership?"));
    assert!(record.text.starts_with("# Ownership"));
}

#[tokio::test]
async fn missing_api_key_fails_before_any_request() {
    let blobs: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    let backend = FakeBackend::replying("unused");
    let explainer = explainer(Arc::clone(&blobs), Arc::clone(&backend));

    let err = explainer
        .explain(ExplainRequest::new(Subject::Text("hi".into())))
        .await
        .unwrap_err();
    assert!(matches!(err, ExplainerError::Validation(_)));
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn api_key_override_is_used() {
    let blobs: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    let backend = FakeBackend::replying("ok");
    let explainer = explainer(Arc::clone(&blobs), Arc::clone(&backend))
        .with_api_key(Some("sk-env".into()));

    explainer
        .explain(ExplainRequest::new(Subject::Text("hi".into())))
        .await
        .unwrap();
    let (endpoint, request) = backend.last_request();
    assert_eq!(endpoint.api_key, "sk-env");
    assert_eq!(request.model, "gpt-3.5-turbo");
    assert_eq!(request.max_tokens, 500);
}

#[tokio::test]
async fn request_failure_propagates_and_records_nothing() {
    let blobs: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    configured(blobs.as_ref());
    let backend = FakeBackend::failing(401, "HTTP 401: Incorrect API key provided");
    let explainer = explainer(Arc::clone(&blobs), Arc::clone(&backend));

    let err = explainer
        .explain(ExplainRequest::new(Subject::Text("hi".into())))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert!(err.to_string().contains("Incorrect API key"));
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    assert_eq!(explainer.history().count().unwrap(), 0);
}

#[tokio::test]
async fn template_without_placeholder_is_rejected() {
    let blobs: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    configured(blobs.as_ref());
    let backend = FakeBackend::replying("unused");
    let explainer = explainer(Arc::clone(&blobs), Arc::clone(&backend));

    let err = explainer
        .explain(
            ExplainRequest::new(Subject::Text("hi".into()))
                .with_prompt(PromptConfig::new("Broken", "Explain something")),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ExplainerError::Validation(_)));
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn storage_failure_falls_back_to_session_list() {
    let flaky = Arc::new(FlakyBlobStore::new());
    let blobs = Arc::clone(&flaky) as Arc<dyn BlobStore>;
    configured(blobs.as_ref());
    let backend = FakeBackend::replying("Still answered.");
    let explainer = explainer(Arc::clone(&blobs), Arc::clone(&backend));

    flaky.fail_writes(true);
    let result = explainer
        .explain(ExplainRequest::new(Subject::Text("hi".into())))
        .await
        .unwrap();
    assert_eq!(result.text, "Still answered.");
    assert_eq!(result.stored, Stored::SessionOnly);

    let session = explainer.session_records();
    assert_eq!(session.len(), 1);
    assert_eq!(session[0].explanation, "Still answered.");
    assert_eq!(explainer.history().count().unwrap(), 0);

    // Once writes work again, the next explanation is durable.
    flaky.fail_writes(false);
    let result = explainer
        .explain(ExplainRequest::new(Subject::Text("again".into())))
        .await
        .unwrap();
    assert!(matches!(result.stored, Stored::Durable(_)));
    assert!(blobs.get_one(Scope::Local, LEGACY_KEY).unwrap().is_none());
}

#[tokio::test]
async fn connection_test_sends_tiny_request() {
    let blobs: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    configured(blobs.as_ref());
    let backend = FakeBackend::replying("Hi!");
    let explainer = explainer(Arc::clone(&blobs), Arc::clone(&backend));

    assert_eq!(explainer.test_connection().await.unwrap(), "Hi!");
    let (_, request) = backend.last_request();
    assert_eq!(request.max_tokens, 10);
    assert_eq!(request.messages.len(), 1);
    assert_eq!(
        request.messages[0].content,
        MessageContent::Text("Hi, this is a test message.".into())
    );
    assert_eq!(explainer.history().count().unwrap(), 0);
}
