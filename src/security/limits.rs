//! Request body limits.
//!
//! # Responsibilities
//! - Enforce maximum request body size
//! - Read the whole body exactly once
//!
//! # Design Decisions
//! - A declared Content-Length above the cap is rejected without reading
//! - Return 413 Payload Too Large in both the declared and streamed case

use axum::body::Body;
use axum::http::header::CONTENT_LENGTH;
use axum::http::HeaderMap;
use futures_util::StreamExt;

use crate::error::DispatchError;

/// Reject a request whose declared length exceeds `limit`.
pub fn check_declared_length(headers: &HeaderMap, limit: u64) -> Result<(), DispatchError> {
    let declared = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());

    match declared {
        Some(length) if length > limit => Err(DispatchError::PayloadTooLarge { limit }),
        _ => Ok(()),
    }
}

/// Read the complete body, failing once more than `limit` bytes arrive.
pub async fn read_body(body: Body, limit: u64) -> Result<Vec<u8>, DispatchError> {
    let mut stream = body.into_data_stream();
    let mut buffer = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| DispatchError::BodyRead(e.to_string()))?;
        if (buffer.len() + chunk.len()) as u64 > limit {
            return Err(DispatchError::PayloadTooLarge { limit });
        }
        buffer.extend_from_slice(&chunk);
    }

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_declared_length() {
        let mut headers = HeaderMap::new();
        assert!(check_declared_length(&headers, 10).is_ok());

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("10"));
        assert!(check_declared_length(&headers, 10).is_ok());

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("11"));
        assert!(matches!(
            check_declared_length(&headers, 10),
            Err(DispatchError::PayloadTooLarge { limit: 10 })
        ));
    }

    #[tokio::test]
    async fn test_read_body_within_limit() {
        let body = read_body(Body::from("hello"), 5).await.unwrap();
        assert_eq!(body, b"hello");
    }

    #[tokio::test]
    async fn test_read_body_over_limit() {
        let chunks = futures_util::stream::iter(vec![
            Ok::<_, std::io::Error>(axum::body::Bytes::from_static(b"abc")),
            Ok(axum::body::Bytes::from_static(b"def")),
        ]);
        let result = read_body(Body::from_stream(chunks), 5).await;
        assert!(matches!(result, Err(DispatchError::PayloadTooLarge { limit: 5 })));
    }
}
