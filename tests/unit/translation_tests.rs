/*!
 * Concurrent translation tests: ordering under adversarial latency, retry
 * boundaries, partial-failure isolation and token aggregation.
 */

use doctran::chunker::{Chunk, chunk_fragments};
use doctran::document::{Fragment, FragmentContext};
use doctran::errors::ProviderError;
use doctran::providers::TokenUsage;
use doctran::providers::mock::{MockProvider, MockReply};
use doctran::translation::{CancelToken, ConcurrentTranslator};

use crate::common::{mock_service, test_config};

fn fragments(texts: &[&str]) -> Vec<Fragment> {
    texts
        .iter()
        .enumerate()
        .map(|(i, t)| Fragment::new(i, *t, FragmentContext::Block { index: i }))
        .collect()
}

fn singleton_chunks(texts: &[&str]) -> Vec<Chunk> {
    // One fragment per chunk keeps the mock's call order observable
    chunk_fragments(&fragments(texts), 1)
}

#[tokio::test]
async fn test_output_order_should_match_input_order_under_reversed_latency() {
    // The earliest chunk answers slowest, the latest fastest
    let texts = ["zero", "one", "two", "three", "four"];
    let mock = MockProvider::new(move |index, request| {
        let delay = 50u64.saturating_sub(index as u64 * 10);
        MockReply::text(request.user.clone()).after_ms(delay)
    });
    let mut config = test_config("fr");
    config.concurrent_requests = 5;
    config.retry_count = 1;
    let translator = ConcurrentTranslator::new(mock_service(config, mock));

    let chunks = singleton_chunks(&texts);
    let (jobs, _) = translator
        .translate_chunks(&chunks, None, &CancelToken::new())
        .await;

    let order: Vec<usize> = jobs.iter().map(|j| j.chunk_index).collect();
    assert_eq!(order, vec![0, 1, 2, 3, 4]);

    let (translated, errors) = translator.collect_translations(&chunks, &jobs);
    assert!(errors.is_empty());
    for (i, text) in texts.iter().enumerate() {
        assert_eq!(translated[&doctran::document::FragmentId(i)], *text);
    }
}

#[tokio::test]
async fn test_final_order_should_be_identical_across_randomized_runs() {
    let texts = ["a", "b", "c", "d", "e", "f"];
    let mut outputs = Vec::new();
    for _ in 0..3 {
        // Fresh mock per run with random latency per call
        let mock = MockProvider::new(|_, request| {
            let delay = rand::random::<u64>() % 30;
            MockReply::text(request.user.clone()).after_ms(delay)
        });
        let mut config = test_config("fr");
        config.concurrent_requests = 4;
        let translator = ConcurrentTranslator::new(mock_service(config, mock));
        let chunks = singleton_chunks(&texts);
        let (jobs, _) = translator
            .translate_chunks(&chunks, None, &CancelToken::new())
            .await;
        let (translated, _) = translator.collect_translations(&chunks, &jobs);
        let ordered: Vec<String> = (0..texts.len())
            .map(|i| translated[&doctran::document::FragmentId(i)].clone())
            .collect();
        outputs.push(ordered);
    }
    assert_eq!(outputs[0], outputs[1]);
    assert_eq!(outputs[1], outputs[2]);
    assert_eq!(
        outputs[0],
        texts.iter().map(|t| t.to_string()).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_chunk_failing_below_the_limit_should_succeed() {
    // retry_count = 3 attempts; two failures then success
    let mock = MockProvider::new(|index, request| {
        if index < 2 {
            MockReply::error(ProviderError::ConnectionError("flaky".to_string()))
        } else {
            MockReply::text(request.user.clone())
        }
    });
    let mut config = test_config("fr");
    config.retry_count = 3;
    let translator = ConcurrentTranslator::new(mock_service(config, mock));
    let chunks = singleton_chunks(&["only"]);
    let (jobs, _) = translator
        .translate_chunks(&chunks, None, &CancelToken::new())
        .await;
    assert!(jobs[0].succeeded());
}

#[tokio::test]
async fn test_chunk_failing_at_the_limit_should_keep_original_text_in_output() {
    let mock = MockProvider::failing();
    let mut config = test_config("fr");
    config.retry_count = 3;
    let translator = ConcurrentTranslator::new(mock_service(config, mock));
    let chunks = singleton_chunks(&["untranslated survives"]);
    let (jobs, _) = translator
        .translate_chunks(&chunks, None, &CancelToken::new())
        .await;
    assert!(!jobs[0].succeeded());
    assert_eq!(jobs[0].attempts, 3);

    let (translated, errors) = translator.collect_translations(&chunks, &jobs);
    assert!(translated.is_empty(), "failed chunk contributes nothing");
    assert_eq!(errors.len(), 1);
    // Downstream reassembly falls back to the fragment's original text,
    // which is exactly what an empty map produces.
}

#[tokio::test]
async fn test_one_bad_chunk_should_not_abort_its_siblings() {
    // Calls for chunk payload containing "poison" always fail
    let mock = MockProvider::new(|_, request| {
        if request.user.contains("poison") {
            MockReply::error(ProviderError::ConnectionError("bad chunk".to_string()))
        } else {
            MockReply::text(request.user.clone())
        }
    });
    let mut config = test_config("fr");
    config.retry_count = 2;
    config.concurrent_requests = 3;
    let translator = ConcurrentTranslator::new(mock_service(config, mock));
    let chunks = singleton_chunks(&["good one", "poison pill", "good two"]);
    let (jobs, _) = translator
        .translate_chunks(&chunks, None, &CancelToken::new())
        .await;

    assert!(jobs[0].succeeded());
    assert!(!jobs[1].succeeded());
    assert!(jobs[2].succeeded());

    let (translated, errors) = translator.collect_translations(&chunks, &jobs);
    assert_eq!(translated.len(), 2);
    assert_eq!(errors.len(), 1);
}

#[tokio::test]
async fn test_aggregate_token_usage_should_equal_sum_of_per_chunk_usage() {
    let mock = MockProvider::echo();
    let mut config = test_config("fr");
    config.retry_count = 1;
    let translator = ConcurrentTranslator::new(mock_service(config, mock));
    let chunks = singleton_chunks(&["alpha", "longer paragraph here", "z"]);
    let (jobs, stats) = translator
        .translate_chunks(&chunks, None, &CancelToken::new())
        .await;

    let mut expected = TokenUsage::default();
    for job in &jobs {
        expected.add(&job.usage);
    }
    assert_eq!(stats.usage, expected);
    assert_eq!(stats.requests, jobs.len() as u64);
    assert!(stats.usage.input_tokens > 0);
}
