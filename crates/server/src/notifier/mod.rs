mod signer;
mod slack;
mod webhook;

pub use slack::SlackNotifier;
pub use webhook::WebhookNotifier;

use klaxon_core::error::{FailureReason, NotifyError};
use reqwest::StatusCode;

/// Maps an HTTP response status onto the retry contract: auth and other
/// client errors abort the retry loop, rate limits and server errors keep
/// it going.
pub(crate) fn classify_status(status: StatusCode) -> Result<(), NotifyError> {
    if status.is_success() {
        return Ok(());
    }
    let message = format!("unexpected status {status}");
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(NotifyError::permanent(message).with_reason(FailureReason::Auth));
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(NotifyError::retryable(message).with_reason(FailureReason::Server));
    }
    if status.is_client_error() {
        return Err(NotifyError::permanent(message).with_reason(FailureReason::Client));
    }
    Err(NotifyError::retryable(message).with_reason(FailureReason::Server))
}

pub(crate) fn classify_transport(err: reqwest::Error) -> NotifyError {
    if err.is_timeout() {
        NotifyError::retryable(err.to_string()).with_reason(FailureReason::Timeout)
    } else {
        NotifyError::retryable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_statuses_pass() {
        assert!(classify_status(StatusCode::OK).is_ok());
        assert!(classify_status(StatusCode::NO_CONTENT).is_ok());
    }

    #[test]
    fn auth_failures_abort_with_auth_reason() {
        for status in [StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN] {
            let err = classify_status(status).unwrap_err();
            assert!(!err.retryable);
            assert_eq!(err.reason, FailureReason::Auth);
        }
    }

    #[test]
    fn client_errors_abort() {
        let err = classify_status(StatusCode::BAD_REQUEST).unwrap_err();
        assert!(!err.retryable);
        assert_eq!(err.reason, FailureReason::Client);
    }

    #[test]
    fn rate_limit_retries() {
        let err = classify_status(StatusCode::TOO_MANY_REQUESTS).unwrap_err();
        assert!(err.retryable);
        assert_eq!(err.reason, FailureReason::Server);
    }

    #[test]
    fn server_errors_retry() {
        let err = classify_status(StatusCode::BAD_GATEWAY).unwrap_err();
        assert!(err.retryable);
        assert_eq!(err.reason, FailureReason::Server);
    }
}
