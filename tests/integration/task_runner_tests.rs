/*!
 * Task runner tests: the machine-facing request/response contract.
 */

use std::sync::Arc;

use doctran::cache::ConversionCache;
use doctran::translation::CancelToken;
use doctran::workflow::progress::{StepKind, progress_channel};
use doctran::workflow::task::{TaskExport, TaskInput, TaskRequest, TaskStatus, TaskTranslate};
use doctran::run_task;

fn dry_run_request(input_path: &str, out_dir: &str) -> TaskRequest {
    TaskRequest {
        task_id: Some("task-1".to_string()),
        input: TaskInput {
            input_type: Some("txt".to_string()),
            path: input_path.to_string(),
        },
        translate: TaskTranslate {
            to_lang: "fr".to_string(),
            skip_translate: true,
            model_id: None,
            base_url: None,
            api_key: None,
            concurrency: Some(2),
            timeout: Some(5),
            retry: Some(2),
            proxy_enable: false,
            chunk_size: None,
            glossary_generate: false,
        },
        export: TaskExport {
            out_dir: out_dir.to_string(),
            formats: vec!["native".to_string()],
            save_attachments: false,
        },
    }
}

#[tokio::test]
async fn test_dry_run_task_should_complete_with_artifacts_and_stream_steps() {
    let work_dir = tempfile::tempdir().unwrap();
    let input_path = work_dir.path().join("input.txt");
    std::fs::write(&input_path, "a paragraph\n\nand another\n").unwrap();
    let out_dir = work_dir.path().join("out");

    let (sender, mut receiver) = progress_channel();
    let request = dry_run_request(
        input_path.to_str().unwrap(),
        out_dir.to_str().unwrap(),
    );
    let response = run_task(
        request,
        Arc::new(ConversionCache::new()),
        Some(sender),
        &CancelToken::new(),
    )
    .await;

    assert_eq!(response.task_id, "task-1");
    assert_eq!(response.status, TaskStatus::Completed);
    assert!(response.errors.is_empty());
    assert_eq!(response.artifacts.len(), 1);
    assert_eq!(response.artifacts[0].mime, "text/plain");
    let written = std::fs::read_to_string(&response.artifacts[0].path).unwrap();
    assert_eq!(written, "a paragraph\n\nand another\n");

    let mut steps = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        steps.push(event.step);
    }
    assert!(steps.contains(&StepKind::Convert));
    assert!(steps.contains(&StepKind::Translate));
    assert!(steps.contains(&StepKind::Export));
}

#[tokio::test]
async fn test_unreadable_input_should_fail_fast() {
    let out_dir = tempfile::tempdir().unwrap();
    let request = dry_run_request("/nonexistent/missing.txt", out_dir.path().to_str().unwrap());
    let response = run_task(
        request,
        Arc::new(ConversionCache::new()),
        None,
        &CancelToken::new(),
    )
    .await;

    assert_eq!(response.status, TaskStatus::Failed);
    assert!(!response.errors.is_empty());
    assert!(response.artifacts.is_empty());
}

#[tokio::test]
async fn test_missing_provider_settings_should_fail_before_any_work() {
    // skip_translate off with no endpoint configured: fail fast
    let work_dir = tempfile::tempdir().unwrap();
    let input_path = work_dir.path().join("input.txt");
    std::fs::write(&input_path, "text\n").unwrap();

    let mut request = dry_run_request(
        input_path.to_str().unwrap(),
        work_dir.path().join("out").to_str().unwrap(),
    );
    request.translate.skip_translate = false;

    let response = run_task(
        request,
        Arc::new(ConversionCache::new()),
        None,
        &CancelToken::new(),
    )
    .await;
    assert_eq!(response.status, TaskStatus::Failed);
}

#[test]
fn test_blocking_driver_should_produce_the_same_outcome() {
    let work_dir = tempfile::tempdir().unwrap();
    let input_path = work_dir.path().join("input.md");
    std::fs::write(&input_path, "# title\n\nbody\n").unwrap();
    let out_dir = work_dir.path().join("out");

    let request = dry_run_request(
        input_path.to_str().unwrap(),
        out_dir.to_str().unwrap(),
    );
    let response = doctran::run_task_blocking(
        request,
        Arc::new(ConversionCache::new()),
        None,
    )
    .unwrap();

    assert_eq!(response.status, TaskStatus::Completed);
    assert_eq!(response.artifacts.len(), 1);
    assert!(response.metrics.duration_ms < 60_000);
}

#[tokio::test]
async fn test_request_should_round_trip_through_serde() {
    let request = dry_run_request("in.txt", "out");
    let json = serde_json::to_string(&request).unwrap();
    let parsed: TaskRequest = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.translate.to_lang, "fr");
    assert!(parsed.translate.skip_translate);
    assert_eq!(parsed.export.out_dir, "out");
}
