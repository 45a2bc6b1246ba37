/*!
 * Common test utilities shared across the suite.
 */

use std::sync::Arc;

use doctran::app_config::TranslationConfig;
use doctran::providers::mock::MockProvider;
use doctran::translation::TranslationService;

/// Initialize test logging once; safe to call from every test
#[allow(dead_code)]
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A translation config wired for fast, deterministic tests.
///
/// Provider settings point at localhost so validation passes; mock-backed
/// services never dial them.
pub fn test_config(target: &str) -> TranslationConfig {
    let mut config = TranslationConfig::new(target);
    config.provider.base_url = "http://localhost:11434/v1".to_string();
    config.provider.model = "test-model".to_string();
    config.concurrent_requests = 2;
    config.retry_count = 2;
    config.retry_backoff_ms = 1;
    config.timeout_secs = 5;
    config
}

/// A service over the given mock provider
pub fn mock_service(config: TranslationConfig, mock: MockProvider) -> TranslationService {
    TranslationService::with_provider(config, Arc::new(mock))
}

/// A service that echoes every chunk payload back — identity translation
pub fn echo_service(target: &str) -> TranslationService {
    mock_service(test_config(target), MockProvider::echo())
}
