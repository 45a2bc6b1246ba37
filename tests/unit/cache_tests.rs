/*!
 * Conversion cache tests: bounded eviction and single-flight conversions.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use doctran::cache::ConversionCache;
use doctran::document::{Document, DocumentFormat, Fingerprint};

fn doc(text: &str) -> Document {
    Document::from_bytes("cached", DocumentFormat::Text, text.as_bytes().to_vec())
}

fn key(n: usize) -> Fingerprint {
    Fingerprint(format!("fingerprint-{}", n))
}

#[test]
fn test_inserting_capacity_plus_one_should_evict_exactly_the_oldest() {
    let capacity = 10;
    let cache = ConversionCache::with_capacity(capacity);
    for n in 0..=capacity {
        cache.put(key(n), doc(&format!("doc {}", n)));
    }
    assert_eq!(cache.len(), capacity);
    assert!(cache.get(&key(0)).is_none(), "first entry must be gone");
    for n in 1..=capacity {
        assert!(cache.get(&key(n)).is_some(), "entry {} must survive", n);
    }
}

#[tokio::test]
async fn test_concurrent_misses_should_run_exactly_one_conversion() {
    let cache = Arc::new(ConversionCache::new());
    let conversions = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..16 {
        let cache = cache.clone();
        let conversions = conversions.clone();
        handles.push(tokio::spawn(async move {
            cache
                .get_or_convert(key(42), || async move {
                    conversions.fetch_add(1, Ordering::SeqCst);
                    // Give the other callers time to pile up on the marker
                    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                    Ok(doc("expensive result"))
                })
                .await
        }));
    }

    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.text().unwrap(), "expensive result");
    }
    assert_eq!(
        conversions.load(Ordering::SeqCst),
        1,
        "only one conversion may run for one fingerprint"
    );
}

#[tokio::test]
async fn test_failed_conversion_should_allow_a_later_retry() {
    let cache = ConversionCache::new();
    let first = cache
        .get_or_convert(key(7), || async {
            Err(doctran::AppError::InvalidInput("broken".to_string()))
        })
        .await;
    assert!(first.is_err());

    // The in-flight marker is cleared, so a fresh attempt may convert
    let second = cache
        .get_or_convert(key(7), || async { Ok(doc("second try")) })
        .await
        .unwrap();
    assert_eq!(second.text().unwrap(), "second try");
}

#[test]
fn test_cached_documents_should_be_shared_snapshots() {
    let cache = ConversionCache::new();
    cache.put(key(1), doc("snapshot"));
    let a = cache.get(&key(1)).unwrap();
    let b = cache.get(&key(1)).unwrap();
    assert!(Arc::ptr_eq(&a, &b), "readers share one immutable snapshot");
}
