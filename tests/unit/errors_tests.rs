/*!
 * Error taxonomy tests: retryability and propagation classes.
 */

use doctran::errors::{AppError, ProviderError, TranslationError};

#[test]
fn test_network_shaped_errors_should_be_retryable() {
    assert!(ProviderError::ConnectionError("reset".into()).is_retryable());
    assert!(ProviderError::Timeout(30).is_retryable());
    assert!(ProviderError::RateLimitExceeded("slow down".into()).is_retryable());
    assert!(
        ProviderError::ApiError {
            status_code: 503,
            message: "overloaded".into()
        }
        .is_retryable()
    );
}

#[test]
fn test_client_errors_should_not_be_retryable() {
    assert!(!ProviderError::AuthenticationError("bad key".into()).is_retryable());
    assert!(
        !ProviderError::ApiError {
            status_code: 400,
            message: "bad request".into()
        }
        .is_retryable()
    );
}

#[test]
fn test_http_429_should_be_retryable() {
    assert!(
        ProviderError::ApiError {
            status_code: 429,
            message: "rate limited".into()
        }
        .is_retryable()
    );
}

#[test]
fn test_translation_errors_should_wrap_into_app_error() {
    let error = TranslationError::RetriesExhausted {
        attempts: 3,
        source: ProviderError::ConnectionError("down".into()),
    };
    let app: AppError = error.into();
    let message = app.to_string();
    assert!(message.contains("3 attempts"));
}

#[test]
fn test_io_errors_should_become_invalid_input() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.md");
    let app: AppError = io.into();
    assert!(matches!(app, AppError::InvalidInput(_)));
}
