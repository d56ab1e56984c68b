use {
    crate::domain::{
        error::PipelineError,
        event::{VerifiedPayload, WebhookDelivery},
    },
    hmac::{Hmac, Mac},
    sha2::Sha256,
};

type HmacSha256 = Hmac<Sha256>;

/// Header Cakto signs deliveries with. Value format: `sha256=<hex>` of the
/// HMAC-SHA256 over the exact raw request body.
pub const SIGNATURE_HEADER: &str = "X-Cakto-Signature";

/// Check a delivery's signature against the shared secret.
///
/// Pure function of its inputs. The MAC comparison goes through
/// `Mac::verify_slice`, which is constant-time — this endpoint is
/// internet-facing, so a byte-by-byte compare would leak match length.
/// A missing or empty secret is a `MisconfiguredSecret`, kept distinct from
/// `InvalidSignature` so operators can tell a deploy problem from a forged
/// or corrupted request.
pub fn verify(
    delivery: WebhookDelivery,
    secret: Option<&str>,
) -> Result<VerifiedPayload, PipelineError> {
    let secret = match secret {
        Some(s) if !s.is_empty() => s,
        _ => return Err(PipelineError::MisconfiguredSecret),
    };

    let header = delivery
        .signature
        .as_deref()
        .ok_or_else(|| PipelineError::InvalidSignature("missing signature header".into()))?;

    let claimed_hex = header.strip_prefix("sha256=").ok_or_else(|| {
        PipelineError::InvalidSignature("signature header missing sha256= prefix".into())
    })?;

    let claimed = hex::decode(claimed_hex)
        .map_err(|_| PipelineError::InvalidSignature("signature is not valid hex".into()))?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| PipelineError::MisconfiguredSecret)?;
    mac.update(&delivery.body);
    mac.verify_slice(&claimed)
        .map_err(|_| PipelineError::InvalidSignature("signature mismatch".into()))?;

    Ok(VerifiedPayload::new(delivery.body, delivery.received_at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const SECRET: &str = "test_secret";

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    fn delivery(body: &[u8], signature: Option<String>) -> WebhookDelivery {
        WebhookDelivery {
            body: body.to_vec(),
            signature,
            received_at: Utc::now(),
        }
    }

    #[test]
    fn valid_signature_passes() {
        let body = br#"{"eventId":"e1"}"#;
        let sig = sign(SECRET, body);
        assert!(verify(delivery(body, Some(sig)), Some(SECRET)).is_ok());
    }

    #[test]
    fn single_flipped_byte_fails() {
        let body = br#"{"eventId":"e1"}"#;
        let sig = sign(SECRET, body);
        let mut tampered = body.to_vec();
        tampered[2] ^= 1;
        let err = verify(delivery(&tampered, Some(sig)), Some(SECRET)).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidSignature(_)));
    }

    #[test]
    fn missing_header_fails() {
        let err = verify(delivery(b"{}", None), Some(SECRET)).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidSignature(_)));
    }

    #[test]
    fn malformed_header_fails() {
        for bad in ["md5=abcd", "sha256=zzzz", "abcdef"] {
            let err = verify(delivery(b"{}", Some(bad.into())), Some(SECRET)).unwrap_err();
            assert!(matches!(err, PipelineError::InvalidSignature(_)), "{bad}");
        }
    }

    #[test]
    fn absent_or_empty_secret_is_misconfiguration() {
        let body = b"{}";
        let sig = sign(SECRET, body);
        for secret in [None, Some("")] {
            let err = verify(delivery(body, Some(sig.clone())), secret).unwrap_err();
            assert!(matches!(err, PipelineError::MisconfiguredSecret));
        }
    }

    #[test]
    fn wrong_secret_fails_as_invalid_signature() {
        let body = b"{}";
        let sig = sign("other_secret", body);
        let err = verify(delivery(body, Some(sig)), Some(SECRET)).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidSignature(_)));
    }
}
