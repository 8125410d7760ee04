//! # Tampering Attacks
//!
//! ## Attack Vectors:
//!
//! 1. **Ciphertext bit flip**: alter the sealed body in transit
//! 2. **Body transplant**: move a captured envelope onto a fresh request
//! 3. **Header edits**: refresh the timestamp, redirect the path
//! 4. **Garbage body**: bytes that are not an envelope at all
//! 5. **Forged response**: alter the service's sealed answer
//!
//! ## Defense:
//!
//! The header signature covers method, path, sender and timestamp; the body
//! signature covers sender, recipient, timestamp and ciphertext. Either
//! failing rejects the message before any handler runs.

#[cfg(test)]
mod tests {
    use crate::harness::{http_from, plain_json, Harness};
    use asx_protocol::{
        format_timestamp, AsxError, Envelope, ErrorCategory, ExchangeContext, SealedExchangeApi,
        NOT_VALID_FOR_RESOURCE, TIMESTAMP_HEADER,
    };
    use bytes::Bytes;
    use http::{HeaderValue, Method, StatusCode};
    use serde_json::json;
    use std::time::Duration;
    use tower::ServiceExt;

    /// Flip one character in the middle of a qualified value.
    fn flip_middle(text: &str) -> String {
        let mut chars: Vec<char> = text.chars().collect();
        let middle = chars.len() / 2;
        chars[middle] = if chars[middle] == 'A' { 'B' } else { 'A' };
        chars.into_iter().collect()
    }

    fn envelope_of(body: &Option<Bytes>) -> Envelope {
        serde_json::from_slice(body.as_ref().unwrap()).unwrap()
    }

    // =========================================================================
    // CIPHERTEXT
    // =========================================================================

    #[tokio::test]
    async fn test_flipped_ciphertext_rejected() {
        let h = Harness::new();
        let alice = h.party("EAlice", 1);
        let mut request = alice
            .seal_request(Method::POST, "/echo", &h.service, Some(json!({"amount": 10})))
            .await;

        let mut envelope = envelope_of(&request.body);
        envelope.cipher = flip_middle(&envelope.cipher);
        request.body = Some(Bytes::from(serde_json::to_vec(&envelope).unwrap()));

        assert_eq!(
            h.exchange.open_request(request.clone(), h.now()).await,
            Err(AsxError::InvalidBodySignature)
        );

        let response = h.app.clone().oneshot(http_from(&request)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(plain_json(response).await["message"], NOT_VALID_FOR_RESOURCE);
    }

    #[tokio::test]
    async fn test_envelope_transplanted_onto_fresh_request() {
        let h = Harness::new();
        let alice = h.party("EAlice", 1);
        let old = alice
            .seal_request(Method::POST, "/echo", &h.service, Some(json!({"amount": 10})))
            .await;

        h.clock.advance(Duration::from_millis(100));
        let mut fresh = alice
            .seal_request(Method::POST, "/echo", &h.service, Some(json!({"amount": 1})))
            .await;
        fresh.body = old.body;

        let err = h.exchange.open_request(fresh, h.now()).await.unwrap_err();
        assert_eq!(err, AsxError::InvalidBodySignature);
        assert_eq!(err.category(), ErrorCategory::Authentication);
    }

    // =========================================================================
    // HEADERS
    // =========================================================================

    #[tokio::test]
    async fn test_refreshed_timestamp_breaks_header_signature() {
        let h = Harness::new();
        let alice = h.party("EAlice", 1);
        let mut request = alice
            .seal_request(Method::GET, "/ping", &h.service, None)
            .await;

        h.clock.advance(Duration::from_millis(1500));
        let refreshed = format_timestamp(h.now());
        request.headers.insert(
            TIMESTAMP_HEADER,
            HeaderValue::from_str(&refreshed).unwrap(),
        );

        assert_eq!(
            h.exchange.open_request(request, h.now()).await,
            Err(AsxError::InvalidHeaderSignature)
        );
    }

    #[tokio::test]
    async fn test_redirected_path_rejected() {
        let h = Harness::new();
        let alice = h.party("EAlice", 1);
        h.disclose(alice.id(), h.now());

        let mut request = alice
            .seal_request(Method::POST, "/login", &h.service, None)
            .await;
        request.path = "/logout".to_string();

        let response = h.app.clone().oneshot(http_from(&request)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(plain_json(response).await["message"], NOT_VALID_FOR_RESOURCE);
    }

    // =========================================================================
    // GARBAGE
    // =========================================================================

    #[tokio::test]
    async fn test_garbage_body_is_malformed() {
        let h = Harness::new();
        let alice = h.party("EAlice", 1);
        let mut request = alice
            .seal_request(Method::POST, "/echo", &h.service, None)
            .await;
        request.body = Some(Bytes::from_static(b"\x00\x01not an envelope"));

        let response = h.app.clone().oneshot(http_from(&request)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(h.exchange.inbound().replay_cache().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_body_is_refused() {
        let mut config = crate::harness::config();
        config.exchange.max_body_bytes = 256;
        let h = Harness::with_config(config);
        let alice = h.party("EAlice", 1);

        let big = "x".repeat(1024);
        let response = h
            .send(&alice, Method::POST, "/echo", Some(json!(big)))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    // =========================================================================
    // FORGED RESPONSE
    // =========================================================================

    #[tokio::test]
    async fn test_caller_refuses_altered_response() {
        let h = Harness::new();
        let alice = h.party("EAlice", 1);
        let request = alice
            .seal_request(Method::GET, "/balance", &h.service, None)
            .await;
        let opened = h.exchange.open_request(request, h.now()).await.unwrap();

        let mut response = h
            .exchange
            .seal_response(&ExchangeContext::from(&opened), Some(json!({"balance": 5})))
            .await
            .unwrap();
        if let Some(envelope) = response.body.as_mut() {
            envelope.cipher = flip_middle(&envelope.cipher);
        }

        let err = alice
            .open_response(Method::GET, "/balance", response, h.now())
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Authentication);
    }
}
