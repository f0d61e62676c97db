//! Response construction. Pure functions of a classified outcome; nothing
//! here logs or touches request state.

use {
    axum::{
        Json,
        http::{StatusCode, header},
        response::{IntoResponse, Response},
    },
    readproxy_common::ErrorKind,
    serde_json::{Value, json},
};

pub const ROBOTS_TXT: &str = "User-agent: *\nAllow: /";

pub const INVALID_TARGET: &str = "Visit /https://example.com/article";
pub const EXTRACTION_FAILED: &str = "Extraction failed";
pub const NO_CONTENT: &str = "Could not extract article content";

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Content => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Configuration | ErrorKind::Infrastructure | ErrorKind::Navigation => {
            StatusCode::INTERNAL_SERVER_ERROR
        },
    }
}

pub fn robots() -> Response {
    ([(header::CONTENT_TYPE, TEXT_PLAIN)], ROBOTS_TXT).into_response()
}

pub fn article(text: &str) -> Response {
    ([(header::CONTENT_TYPE, TEXT_PLAIN)], text.trim().to_string()).into_response()
}

pub fn invalid_target() -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": INVALID_TARGET }))).into_response()
}

/// Error body for a failed extraction. `detail` is omitted when `None`.
pub fn failure(kind: ErrorKind, detail: Option<String>) -> Response {
    let error = match kind {
        ErrorKind::Content => NO_CONTENT,
        _ => EXTRACTION_FAILED,
    };
    let mut body = json!({ "error": error });
    if let Some(detail) = detail {
        body["detail"] = Value::String(detail);
    }
    (status_for(kind), Json(body)).into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    async fn body_of(response: Response) -> (StatusCode, Option<String>, String) {
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, content_type, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[test]
    fn only_content_failures_are_unprocessable() {
        assert_eq!(status_for(ErrorKind::Content), StatusCode::UNPROCESSABLE_ENTITY);
        for kind in [
            ErrorKind::Configuration,
            ErrorKind::Infrastructure,
            ErrorKind::Navigation,
        ] {
            assert_eq!(status_for(kind), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[tokio::test]
    async fn robots_is_fixed_plain_text() {
        let (status, content_type, body) = body_of(robots()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some(TEXT_PLAIN));
        assert_eq!(body, "User-agent: *\nAllow: /");
    }

    #[tokio::test]
    async fn article_body_is_trimmed() {
        let (status, content_type, body) = body_of(article("\n  Hello reader.  \n")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some(TEXT_PLAIN));
        assert_eq!(body, "Hello reader.");
    }

    #[tokio::test]
    async fn invalid_target_points_at_usage() {
        let (status, _, body) = body_of(invalid_target()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            serde_json::from_str::<Value>(&body).unwrap(),
            json!({ "error": "Visit /https://example.com/article" })
        );
    }

    #[tokio::test]
    async fn infrastructure_failure_carries_detail() {
        let response = failure(
            ErrorKind::Infrastructure,
            Some("browser connection closed".into()),
        );
        let (status, _, body) = body_of(response).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            serde_json::from_str::<Value>(&body).unwrap(),
            json!({ "error": "Extraction failed", "detail": "browser connection closed" })
        );
    }

    #[tokio::test]
    async fn content_failure_omits_missing_detail() {
        let (status, _, body) = body_of(failure(ErrorKind::Content, None)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            serde_json::from_str::<Value>(&body).unwrap(),
            json!({ "error": "Could not extract article content" })
        );
    }

    #[tokio::test]
    async fn content_failure_keeps_detail_when_present() {
        let (_, _, body) = body_of(failure(ErrorKind::Content, Some("empty".into()))).await;
        assert_eq!(
            serde_json::from_str::<Value>(&body).unwrap(),
            json!({ "error": "Could not extract article content", "detail": "empty" })
        );
    }
}
