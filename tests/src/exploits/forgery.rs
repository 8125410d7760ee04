//! # Forgery Attacks
//!
//! ## Attack Vectors:
//!
//! 1. **Impersonation**: sign as a known identifier with the attacker's key
//! 2. **Unknown sender**: a well-formed message from a key nobody registered
//! 3. **Source spoofing**: valid outer signatures, sealed `src` naming a victim
//! 4. **Relay**: forward a victim's request to a different service
//! 5. **Key rotation**: keep using a key after its owner rotated it
//!
//! ## Defense:
//!
//! Header and body signatures are checked against the resolved key of the
//! declared sender, the seal is bound to the recipient, and the sealed source
//! must equal the declared sender. All authentication failures answer with
//! the same message.

#[cfg(test)]
mod tests {
    use crate::harness::{http_from, plain_json, Harness};
    use asx_protocol::{
        format_timestamp, AsxError, Envelope, ErrorCategory, ExchangeConfig, Identity,
        InboundPipeline, ReplayCache, ResourceId, SealedExchangeApi, SealedPayload, SignedTuple,
        NOT_VALID_FOR_RESOURCE,
    };
    use bytes::Bytes;
    use http::{Method, StatusCode};
    use serde_json::json;
    use shared_crypto::Ed25519KeyPair;
    use std::sync::Arc;
    use tower::ServiceExt;

    // =========================================================================
    // IMPERSONATION
    // =========================================================================

    #[tokio::test]
    async fn test_impersonation_with_own_key() {
        let h = Harness::new();
        let _alice = h.party("EAlice", 1);
        // Claims to be EAlice, holds a different key.
        let mallory = h.stranger("EAlice", 66);

        let forged = mallory
            .seal_request(Method::POST, "/echo", &h.service, Some(json!({"pay": "mallory"})))
            .await;
        let response = h.app.clone().oneshot(http_from(&forged)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(plain_json(response).await["message"], NOT_VALID_FOR_RESOURCE);
        assert!(h.exchange.inbound().replay_cache().is_empty());
    }

    #[tokio::test]
    async fn test_impersonation_rejected_at_header_signature() {
        let h = Harness::new();
        let _alice = h.party("EAlice", 1);
        let mallory = h.stranger("EAlice", 66);

        let forged = mallory
            .seal_request(Method::GET, "/session", &h.service, None)
            .await;
        assert_eq!(
            h.exchange.open_request(forged, h.now()).await,
            Err(AsxError::InvalidHeaderSignature)
        );
    }

    // =========================================================================
    // UNKNOWN SENDER
    // =========================================================================

    #[tokio::test]
    async fn test_unknown_sender_is_dependency_failure() {
        let h = Harness::new();
        let stranger = h.stranger("EStranger", 77);

        let response = h.send(&stranger, Method::GET, "/ping", None).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    // =========================================================================
    // SOURCE SPOOFING
    // =========================================================================

    #[tokio::test]
    async fn test_sealed_source_naming_victim() {
        let h = Harness::new();
        let _alice = h.party("EAlice", 1);
        let mallory = h.party("EMallory", 66);
        let mallory_keys = Ed25519KeyPair::from_seed([66u8; 32]);

        // Mallory's own headers, Mallory's own body signature, but the
        // payload inside the seal claims to come from EAlice.
        let service_key = Ed25519KeyPair::from_seed(crate::harness::SERVICE_SEED)
            .public_key()
            .to_encryption_key()
            .unwrap();
        let plaintext = serde_json::to_vec(&SealedPayload {
            src: ResourceId::new("EAlice"),
            data: json!({"transfer": 1000}),
        })
        .unwrap();
        let cipher = shared_crypto::seal(&service_key, &plaintext)
            .unwrap()
            .to_qb64();
        let datetime = format_timestamp(h.now());
        let tuple = SignedTuple {
            src: "EMallory",
            dest: h.service.as_str(),
            datetime: &datetime,
            cipher: &cipher,
        };
        let envelope = Envelope {
            sig: mallory_keys.sign(&tuple.to_bytes()).to_qb64(),
            cipher,
        };

        let mut request = mallory
            .seal_request(Method::POST, "/echo", &h.service, None)
            .await;
        request.body = Some(Bytes::from(serde_json::to_vec(&envelope).unwrap()));

        let err = h
            .exchange
            .open_request(request.clone(), h.now())
            .await
            .unwrap_err();
        assert_eq!(err, AsxError::SourceMismatch);
        assert_eq!(err.public_message(), NOT_VALID_FOR_RESOURCE);

        let response = h.app.clone().oneshot(http_from(&request)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(plain_json(response).await["message"], NOT_VALID_FOR_RESOURCE);
    }

    // =========================================================================
    // RELAY
    // =========================================================================

    #[tokio::test]
    async fn test_request_relayed_to_other_service() {
        let h = Harness::new();
        let alice = h.party("EAlice", 1);
        let captured = alice
            .seal_request(Method::POST, "/echo", &h.service, Some(json!("for EService")))
            .await;

        // A second service trusting the same directory.
        let other = Arc::new(Identity::new(
            ResourceId::new("EOtherService"),
            Ed25519KeyPair::from_seed([0x0f; 32]),
        ));
        let pipeline = InboundPipeline::new(
            other,
            h.directory.clone(),
            ReplayCache::new_shared(16),
            &ExchangeConfig::default(),
        );

        let err = pipeline.open(captured, h.now()).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Authentication);
        assert_eq!(err.public_message(), NOT_VALID_FOR_RESOURCE);
    }

    // =========================================================================
    // KEY ROTATION
    // =========================================================================

    #[tokio::test]
    async fn test_old_key_refused_after_rotation() {
        let h = Harness::new();
        let alice = h.party("EAlice", 1);

        let rotated = Ed25519KeyPair::from_seed([2u8; 32]).public_key();
        h.directory.rotate(alice.id(), rotated);

        let request = alice
            .seal_request(Method::GET, "/ping", &h.service, None)
            .await;
        assert_eq!(
            h.exchange.open_request(request, h.now()).await,
            Err(AsxError::InvalidHeaderSignature)
        );
    }
}
