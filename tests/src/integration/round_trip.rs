//! # Round Trip Flows
//!
//! A caller seals a request, the service opens it, the handler answers and
//! the caller opens the sealed answer.
//!
//! ## Flows Tested:
//!
//! 1. **Port level**: `SealedExchangeApi` without HTTP in between
//! 2. **Router level**: sealed requests through `AsxLayer` and axum handlers
//! 3. **Many callers**: independent parties in parallel

#[cfg(test)]
mod tests {
    use crate::harness::Harness;
    use asx_protocol::{ExchangeContext, SealedExchangeApi};
    use futures::future::join_all;
    use http::{Method, StatusCode};
    use serde_json::json;
    use std::time::Duration;

    // =========================================================================
    // PORT LEVEL
    // =========================================================================

    #[tokio::test]
    async fn test_open_then_seal_through_ports() {
        let h = Harness::new();
        let alice = h.party("EAlice", 1);

        let request = alice
            .seal_request(Method::POST, "/orders", &h.service, Some(json!({"qty": 3})))
            .await;
        let opened = h.exchange.open_request(request, h.now()).await.unwrap();
        assert_eq!(opened.sender, *alice.id());
        assert_eq!(opened.body, Some(json!({"qty": 3})));

        let response = h
            .exchange
            .seal_response(&ExchangeContext::from(&opened), Some(json!({"accepted": true})))
            .await
            .unwrap();
        let answer = alice
            .open_response(Method::POST, "/orders", response, h.now())
            .await
            .unwrap();

        assert_eq!(answer.sender, h.service);
        assert_eq!(answer.body, Some(json!({"accepted": true})));
    }

    #[tokio::test]
    async fn test_response_arrives_within_window() {
        let h = Harness::new();
        let alice = h.party("EAlice", 1);

        let request = alice
            .seal_request(Method::GET, "/ping", &h.service, None)
            .await;
        let opened = h.exchange.open_request(request, h.now()).await.unwrap();
        let response = h
            .exchange
            .seal_response(&ExchangeContext::from(&opened), None)
            .await
            .unwrap();

        // Slow network: the caller still accepts an answer 900 ms old.
        h.clock.advance(Duration::from_millis(900));
        let answer = alice
            .open_response(Method::GET, "/ping", response, h.now())
            .await
            .unwrap();
        assert_eq!(answer.body, None);
    }

    // =========================================================================
    // ROUTER LEVEL
    // =========================================================================

    #[tokio::test]
    async fn test_ping_through_router() {
        let h = Harness::new();
        let alice = h.party("EAlice", 1);

        let (status, body) = h.call(&alice, Method::GET, "/ping", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!("pong"));
    }

    #[tokio::test]
    async fn test_query_string_is_not_signed_but_is_delivered() {
        let h = Harness::new();
        let alice = h.party("EAlice", 1);

        let (status, body) = h.call(&alice, Method::GET, "/ping?verbose=1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!("pong"));
    }

    #[tokio::test]
    async fn test_echo_preserves_structured_payload() {
        let h = Harness::new();
        let alice = h.party("EAlice", 1);
        h.disclose(alice.id(), h.now());
        h.call(&alice, Method::POST, "/login", None).await;

        let payload = json!({
            "text": "grüße, 世界",
            "nested": {"list": [1, 2.5, null, true]},
        });
        let (status, body) = h
            .call(&alice, Method::POST, "/echo", Some(payload.clone()))
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["from"], "EAlice");
        assert_eq!(body["echo"], payload);
    }

    #[tokio::test]
    async fn test_error_answers_are_sealed_too() {
        let h = Harness::new();
        let alice = h.party("EAlice", 1);

        let (status, body) = h.call(&alice, Method::GET, "/session", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "unauthenticated");
    }

    // =========================================================================
    // MANY CALLERS
    // =========================================================================

    #[tokio::test]
    async fn test_parallel_callers_each_get_their_own_answer() {
        let h = Harness::new();
        let parties: Vec<_> = (0..8u8)
            .map(|i| h.party(&format!("EParty{}", i), i + 1))
            .collect();

        let results = join_all(parties.iter().map(|party| async {
            let response = h.send(party, Method::GET, "/ping", None).await;
            let status = response.status();
            let opened = party
                .open_http_response(Method::GET, "/ping", response, h.now())
                .await;
            (status, opened)
        }))
        .await;

        for (status, opened) in results {
            assert_eq!(status, StatusCode::OK);
            assert_eq!(opened.unwrap().body, Some(json!("pong")));
        }
    }
}
