/*!
 * End-to-end workflow tests over mock providers.
 */

use std::sync::Arc;

use doctran::cache::ConversionCache;
use doctran::document::DocumentFormat;
use doctran::errors::ProviderError;
use doctran::providers::mock::{MockProvider, MockReply};
use doctran::translation::CancelToken;
use doctran::workflow::progress::{StepKind, progress_channel};
use doctran::workflow::{Workflow, WorkflowState};

use crate::common::{echo_service, mock_service, test_config};

const THREE_PARAGRAPHS: &str =
    "The quick brown fox jumps.\n\nA second paragraph of text.\n\nAnd the final words here.\n";

fn cache() -> Arc<ConversionCache> {
    Arc::new(ConversionCache::new())
}

#[tokio::test]
async fn test_three_paragraph_document_should_round_trip_through_the_pipeline() {
    crate::common::init_logging();
    // chunk_size is smaller than the document but larger than any paragraph
    let mut config = test_config("fr");
    config.chunk_size = 60;
    config.concurrent_requests = 2;

    let mut workflow = Workflow::new(config.clone(), cache()).unwrap();
    workflow
        .read_bytes("sample", DocumentFormat::Text, THREE_PARAGRAPHS.into())
        .unwrap();
    workflow.convert().await.unwrap();
    workflow
        .translate_with_service(echo_service("fr"), &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(workflow.state(), WorkflowState::Translated);
    assert!(workflow.errors().is_empty());
    // Identity translation: paragraph order and content survive exactly
    let translated = workflow.translated_document().unwrap();
    assert_eq!(translated.text().unwrap(), THREE_PARAGRAPHS);
    // One request per chunk; the size ceiling forces two or three chunks
    let requests = workflow.stats().requests;
    assert!((2..=3).contains(&requests), "got {} chunks", requests);
}

#[tokio::test]
async fn test_progress_channel_should_see_every_step() {
    let (sender, mut receiver) = progress_channel();
    let mut config = test_config("fr");
    config.chunk_size = 60;

    let out_dir = tempfile::tempdir().unwrap();
    let mut workflow = Workflow::new(config, cache()).unwrap().with_progress(sender);
    workflow
        .read_bytes("sample", DocumentFormat::Text, THREE_PARAGRAPHS.into())
        .unwrap();
    workflow.convert().await.unwrap();
    workflow
        .translate_with_service(echo_service("fr"), &CancelToken::new())
        .await
        .unwrap();
    workflow.export(out_dir.path(), false).unwrap();

    let mut steps = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        steps.push(event.step);
    }
    assert_eq!(
        steps,
        vec![
            StepKind::Convert,
            StepKind::Chunk,
            StepKind::Translate,
            StepKind::Export
        ]
    );
}

#[tokio::test]
async fn test_partial_failure_should_keep_original_text_and_report_errors() {
    // Second chunk always fails; its paragraph must survive untranslated
    let mock = MockProvider::new(|_, request| {
        if request.user.contains("second paragraph") {
            MockReply::error(ProviderError::ConnectionError("unlucky".to_string()))
        } else {
            MockReply::text(request.user.to_uppercase())
        }
    });
    let mut config = test_config("fr");
    config.chunk_size = 30;
    config.retry_count = 2;
    let service = mock_service(config.clone(), mock);

    let mut workflow = Workflow::new(config, cache()).unwrap();
    workflow
        .read_bytes("sample", DocumentFormat::Text, THREE_PARAGRAPHS.into())
        .unwrap();
    workflow.convert().await.unwrap();
    workflow
        .translate_with_service(service, &CancelToken::new())
        .await
        .unwrap();

    let text = workflow.translated_document().unwrap().text().unwrap().to_string();
    assert!(text.contains("THE QUICK BROWN FOX"));
    assert!(
        text.contains("A second paragraph of text."),
        "failed chunk degrades to pass-through"
    );
    assert!(!workflow.errors().is_empty(), "partial success is reported");
}

#[tokio::test]
async fn test_skip_translate_should_pass_the_document_through() {
    let mut config = test_config("fr");
    config.skip_translate = true;

    let out_dir = tempfile::tempdir().unwrap();
    let mut workflow = Workflow::new(config, cache()).unwrap();
    workflow
        .read_bytes("diag", DocumentFormat::Markdown, "# unchanged\n".into())
        .unwrap();
    workflow.convert().await.unwrap();
    workflow.translate().await.unwrap();
    let artifacts = workflow.export(out_dir.path(), false).unwrap();

    assert_eq!(workflow.state(), WorkflowState::Exported);
    assert_eq!(artifacts.len(), 1);
    let written = std::fs::read_to_string(&artifacts[0].path).unwrap();
    assert_eq!(written, "# unchanged\n");
}

#[tokio::test]
async fn test_state_machine_should_reject_out_of_order_operations() {
    let mut workflow = Workflow::new(test_config("fr"), cache()).unwrap();

    // Translating before reading or converting is an error
    let error = workflow.translate().await.unwrap_err();
    assert!(matches!(error, doctran::AppError::InvalidState(_)));

    workflow
        .read_bytes("doc", DocumentFormat::Text, "hello".into())
        .unwrap();
    // Reading twice is a backward transition
    let error = workflow
        .read_bytes("doc", DocumentFormat::Text, "again".into())
        .unwrap_err();
    assert!(matches!(error, doctran::AppError::InvalidState(_)));
}

#[tokio::test]
async fn test_cancellation_should_keep_completed_chunks() {
    let cancel = CancelToken::new();
    let trip = cancel.clone();
    // The first completed call trips the token
    let mock = MockProvider::new(move |_, request| {
        let reply = MockReply::text(request.user.to_uppercase());
        trip.cancel();
        reply
    });
    let mut config = test_config("fr");
    config.chunk_size = 30;
    config.concurrent_requests = 1;
    config.retry_count = 1;
    let service = mock_service(config.clone(), mock);

    let mut workflow = Workflow::new(config, cache()).unwrap();
    workflow
        .read_bytes("sample", DocumentFormat::Text, THREE_PARAGRAPHS.into())
        .unwrap();
    workflow.convert().await.unwrap();
    workflow
        .translate_with_service(service, &cancel)
        .await
        .unwrap();

    // Reassembly proceeded with whatever completed
    assert_eq!(workflow.state(), WorkflowState::Translated);
    let text = workflow.translated_document().unwrap().text().unwrap().to_string();
    assert!(text.contains("THE QUICK BROWN FOX"), "finished work is kept");
    assert!(
        text.contains("And the final words here."),
        "undispatched chunks keep original text"
    );
    assert!(!workflow.errors().is_empty());
}

#[tokio::test]
async fn test_shared_cache_should_serve_the_second_workflow() {
    let shared = cache();

    let mut first = Workflow::new(test_config("fr"), shared.clone()).unwrap();
    first
        .read_bytes("same", DocumentFormat::Text, "cache me".into())
        .unwrap();
    first.convert().await.unwrap();

    let mut second = Workflow::new(test_config("fr"), shared.clone()).unwrap();
    second
        .read_bytes("same", DocumentFormat::Text, "cache me".into())
        .unwrap();
    second.convert().await.unwrap();

    let (hits, _) = shared.stats();
    assert!(hits >= 1, "second conversion must come from the cache");
}

#[tokio::test]
async fn test_glossary_terms_should_reach_the_prompt() {
    // The mock asserts the glossary section arrives for the chunk that
    // contains the term, then echoes
    let mock = MockProvider::new(|_, request| {
        if request.user.contains("Acme") {
            assert!(
                request.system.contains("Acme => Acmé"),
                "glossary must be injected for matching chunks"
            );
        }
        MockReply::text(request.user.clone())
    });
    let mut config = test_config("fr");
    config.glossary.terms.insert("Acme".to_string(), "Acmé".to_string());
    let service = mock_service(config.clone(), mock);

    let mut workflow = Workflow::new(config, cache()).unwrap();
    workflow
        .read_bytes("doc", DocumentFormat::Text, "Acme builds widgets".into())
        .unwrap();
    workflow.convert().await.unwrap();
    workflow
        .translate_with_service(service, &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(workflow.state(), WorkflowState::Translated);
}
