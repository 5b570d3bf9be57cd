use axum::http::{header, HeaderMap};
use serde::Serialize;

use crate::response::AppError;

const LEARNER_COOKIE_NAME: &str = "learner_id";

/// Identity handed over by the surrounding platform. The gateway in front
/// of this service has already authenticated the learner; the bearer value
/// is the opaque learner id itself.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthLearner {
    pub id: String,
}

pub fn extract_learner(headers: &HeaderMap) -> Option<String> {
    if let Some(id) = get_cookie(headers, LEARNER_COOKIE_NAME) {
        return Some(id);
    }

    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())?;

    auth_header
        .strip_prefix("Bearer ")
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn require_learner(headers: &HeaderMap) -> Result<AuthLearner, AppError> {
    extract_learner(headers)
        .map(|id| AuthLearner { id })
        .ok_or_else(|| AppError::unauthorized("missing learner identity"))
}

fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie_header = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())?;

    for pair in cookie_header.split(';') {
        let mut parts = pair.trim().splitn(2, '=');
        if parts.next() == Some(name) {
            let value = parts.next().unwrap_or("").trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn extracts_bearer_identity() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer learner-42"),
        );
        assert_eq!(extract_learner(&headers).as_deref(), Some("learner-42"));
    }

    #[test]
    fn cookie_wins_over_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; learner_id=learner-7"),
        );
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer learner-42"),
        );
        assert_eq!(extract_learner(&headers).as_deref(), Some("learner-7"));
    }

    #[test]
    fn empty_bearer_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_learner(&headers), None);
        assert!(require_learner(&headers).is_err());
    }
}
