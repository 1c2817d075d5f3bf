//! API key validation against the portal
//!
//! The portal has no dedicated validation endpoint. The convention is to
//! probe the download endpoint with the reserved dataset key `-1`: the
//! gateway in front of it answers HTTP 502 for every outcome, and only the
//! Korean message in the body says whether the key was accepted. This
//! module turns that quirk into a typed answer.

use url::Url;

use crate::app::client::http::HttpHandler;
use crate::constants::{portal, validation};
use crate::errors::{AuthError, AuthResult};

/// Outcome of classifying a validation response body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyValidity {
    /// Body carries one of the accept phrases
    Valid,
    /// Body carries one of the reject phrases
    Invalid,
    /// Body matched neither set; the API may have changed
    Unrecognized,
}

/// Classify a validation response body by its known phrases.
///
/// Accept phrases win over reject phrases: the accept messages are full
/// sentences while the reject markers are single words that could appear
/// inside unrelated text.
pub fn classify_validation_body(body: &str) -> KeyValidity {
    if validation::SUCCESS_PHRASES.iter().any(|p| body.contains(p)) {
        KeyValidity::Valid
    } else if validation::FAILURE_PHRASES.iter().any(|p| body.contains(p)) {
        KeyValidity::Invalid
    } else {
        KeyValidity::Unrecognized
    }
}

/// Probe the portal to check whether the client's API key is accepted.
///
/// The key itself travels in the client's default headers; this only
/// drives the probe request and classifies the body.
///
/// # Errors
///
/// Returns `AuthError::KeyRejected` for a rejected key,
/// `AuthError::UnrecognizedResponse` when the body matches no known
/// phrase, and `AuthError::ValidationRequest` for transport failures.
pub async fn validate_api_key(http_handler: &HttpHandler) -> AuthResult<()> {
    let url = Url::parse(&format!("{}{}", portal::BASE_URL, portal::KEY_VALIDATE_PATH))
        .expect("validation URL should be valid");

    let (status, body) = http_handler
        .get_text(&url)
        .await
        .map_err(AuthError::ValidationRequest)?;

    tracing::debug!("Key validation probe answered {}", status);

    match classify_validation_body(&body) {
        KeyValidity::Valid => Ok(()),
        KeyValidity::Invalid => Err(AuthError::KeyRejected),
        KeyValidity::Unrecognized => Err(AuthError::UnrecognizedResponse),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_phrases() {
        assert_eq!(
            classify_validation_body("요청하신 파일을 다운로드할 수 있습니다."),
            KeyValidity::Valid
        );
        // Probing dataset -1: "no such file" still means the key passed
        assert_eq!(
            classify_validation_body("요청하신 데이터셋의 파일이 존재하지 않습니다."),
            KeyValidity::Valid
        );
    }

    #[test]
    fn test_reject_phrases() {
        assert_eq!(
            classify_validation_body("인증에 실패하였습니다."),
            KeyValidity::Invalid
        );
        assert_eq!(
            classify_validation_body("API 키가 유효하지 않습니다."),
            KeyValidity::Invalid
        );
    }

    #[test]
    fn test_accept_wins_over_reject() {
        // A success sentence that also mentions 파일/키 words must validate
        let body = "API 키 확인: 요청하신 파일을 다운로드할 수 있습니다.";
        assert_eq!(classify_validation_body(body), KeyValidity::Valid);
    }

    #[test]
    fn test_garbage_is_unrecognized() {
        assert_eq!(
            classify_validation_body("<html>Bad Gateway</html>"),
            KeyValidity::Unrecognized
        );
        assert_eq!(classify_validation_body(""), KeyValidity::Unrecognized);
    }
}
