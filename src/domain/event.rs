use {
    super::{
        error::PipelineError,
        id::{EventId, SubjectId},
    },
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// One inbound webhook call, exactly as delivered: raw body bytes plus the
/// signature header (if any). Built once per request, discarded after.
#[derive(Debug)]
pub struct WebhookDelivery {
    pub body: Vec<u8>,
    pub signature: Option<String>,
    pub received_at: DateTime<Utc>,
}

/// A delivery whose signature has been checked. Constructible only through
/// `adapters::signature::verify` — holding one is the proof of validity.
#[derive(Debug)]
pub struct VerifiedPayload {
    body: Vec<u8>,
    received_at: DateTime<Utc>,
}

impl VerifiedPayload {
    pub(crate) fn new(body: Vec<u8>, received_at: DateTime<Utc>) -> Self {
        Self { body, received_at }
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }
}

/// Event kinds this pipeline routes on. Cakto adds types without notice, so
/// anything unrecognised is carried through as `Unknown` instead of being
/// rejected; the original spelling is preserved for the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    PaymentApproved,
    PaymentRefunded,
    PaymentChargeback,
    SubscriptionCancelled,
    Unknown(String),
}

impl EventType {
    /// Cakto has shipped several spellings per event over time
    /// (`payment.approved`, `payment_approved`, bare `approved`), so all
    /// observed aliases map to the canonical type.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "payment.approved" | "payment_approved" | "approved" | "completed" => {
                Self::PaymentApproved
            }
            "payment.refunded" | "payment_refunded" | "refunded" => Self::PaymentRefunded,
            "payment.chargeback" | "payment_chargeback" | "chargeback" => Self::PaymentChargeback,
            "subscription.cancelled" | "subscription_cancelled" | "cancelled" => {
                Self::SubscriptionCancelled
            }
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::PaymentApproved => "payment.approved",
            Self::PaymentRefunded => "payment.refunded",
            Self::PaymentChargeback => "payment.chargeback",
            Self::SubscriptionCancelled => "subscription.cancelled",
            Self::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Typed internal representation of one verified webhook event.
#[derive(Debug, Clone)]
pub struct NormalizedEvent {
    pub event_id: EventId,
    pub event_type: EventType,
    pub subject_id: SubjectId,
    pub occurred_at: DateTime<Utc>,
    /// Full parsed body, retained for the processed-event audit record.
    pub payload: serde_json::Value,
}

/// Parse a verified payload into a typed event.
///
/// The three routing fields (event id, event type, subject id) are required;
/// everything else degrades gracefully. Field names are looked up under the
/// aliases Cakto has used, both at the top level and inside a `data` wrapper.
/// A missing `occurredAt` falls back to the delivery's receipt time.
pub fn normalize(payload: VerifiedPayload) -> Result<NormalizedEvent, PipelineError> {
    let body: serde_json::Value = serde_json::from_slice(payload.body())
        .map_err(|e| PipelineError::MalformedPayload(format!("body is not valid JSON: {e}")))?;

    let event_type = lookup(&body, &["eventType", "event", "type"])
        .and_then(|v| v.as_str())
        .ok_or_else(|| PipelineError::MalformedPayload("missing event type".into()))?;
    let event_type = EventType::parse(event_type);

    let event_id = lookup(&body, &["eventId", "event_id", "id"])
        .and_then(|v| v.as_str())
        .ok_or_else(|| PipelineError::MalformedPayload("missing event id".into()))?;
    let event_id = EventId::new(event_id)?;

    let subject_id = lookup(&body, &["subjectId", "subject_id", "customer_id", "subscription_id"])
        .and_then(|v| v.as_str())
        .ok_or_else(|| PipelineError::MalformedPayload("missing subject id".into()))?;
    let subject_id = SubjectId::new(subject_id)?;

    let occurred_at = lookup(&body, &["occurredAt", "occurred_at", "created_at"])
        .and_then(parse_timestamp)
        .unwrap_or_else(|| payload.received_at());

    Ok(NormalizedEvent {
        event_id,
        event_type,
        subject_id,
        occurred_at,
        payload: body,
    })
}

/// First match wins: each key is tried at the top level, then inside `data`.
fn lookup<'a>(body: &'a serde_json::Value, keys: &[&str]) -> Option<&'a serde_json::Value> {
    let data = body.get("data");
    keys.iter().find_map(|key| {
        body.get(*key)
            .or_else(|| data.and_then(|d| d.get(*key)))
            .filter(|v| !v.is_null())
    })
}

/// Timestamps arrive either as RFC 3339 strings or unix seconds.
fn parse_timestamp(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    if let Some(s) = value.as_str() {
        return DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc));
    }
    value.as_i64().and_then(|secs| DateTime::from_timestamp(secs, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verified(body: &str) -> VerifiedPayload {
        VerifiedPayload::new(body.as_bytes().to_vec(), Utc::now())
    }

    #[test]
    fn normalizes_canonical_fields() {
        let event = normalize(verified(
            r#"{"eventId":"e1","eventType":"payment.approved","subjectId":"u1"}"#,
        ))
        .unwrap();
        assert_eq!(event.event_id.as_str(), "e1");
        assert_eq!(event.event_type, EventType::PaymentApproved);
        assert_eq!(event.subject_id.as_str(), "u1");
    }

    #[test]
    fn accepts_aliases_and_data_wrapper() {
        let event = normalize(verified(
            r#"{"event":"payment_refunded","data":{"id":"tx9","customer_id":"u2"}}"#,
        ))
        .unwrap();
        assert_eq!(event.event_id.as_str(), "tx9");
        assert_eq!(event.event_type, EventType::PaymentRefunded);
        assert_eq!(event.subject_id.as_str(), "u2");
    }

    #[test]
    fn unknown_type_is_preserved_not_rejected() {
        let event = normalize(verified(
            r#"{"eventId":"e2","eventType":"pix.generated","subjectId":"u1"}"#,
        ))
        .unwrap();
        assert_eq!(event.event_type, EventType::Unknown("pix.generated".into()));
        assert_eq!(event.event_type.as_str(), "pix.generated");
    }

    #[test]
    fn missing_routing_fields_are_malformed() {
        for body in [
            r#"{"eventType":"payment.approved","subjectId":"u1"}"#,
            r#"{"eventId":"e1","subjectId":"u1"}"#,
            r#"{"eventId":"e1","eventType":"payment.approved"}"#,
            r#"{"eventId":"","eventType":"payment.approved","subjectId":"u1"}"#,
            "not json",
        ] {
            let err = normalize(verified(body)).unwrap_err();
            assert!(
                matches!(err, PipelineError::MalformedPayload(_)),
                "expected MalformedPayload for {body:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn occurred_at_falls_back_to_receipt_time() {
        let received = Utc::now();
        let payload = VerifiedPayload::new(
            br#"{"eventId":"e1","eventType":"payment.approved","subjectId":"u1"}"#.to_vec(),
            received,
        );
        assert_eq!(normalize(payload).unwrap().occurred_at, received);

        let event = normalize(verified(
            r#"{"eventId":"e1","eventType":"payment.approved","subjectId":"u1","occurredAt":"2025-06-01T12:00:00Z"}"#,
        ))
        .unwrap();
        assert_eq!(event.occurred_at.timestamp(), 1748779200);

        let event = normalize(verified(
            r#"{"eventId":"e1","eventType":"payment.approved","subjectId":"u1","created_at":1700000000}"#,
        ))
        .unwrap();
        assert_eq!(event.occurred_at.timestamp(), 1700000000);
    }
}
