use {
    super::{
        error::PipelineError,
        event::{EventType, NormalizedEvent},
        id::{EventId, SubjectId},
    },
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::fmt,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriberStatus {
    Active,
    Cancelled,
    Delinquent,
}

impl SubscriberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Cancelled => "cancelled",
            Self::Delinquent => "delinquent",
        }
    }

    /// Status after absorbing one event. Total — every (status, event) pair
    /// has a defined successor:
    /// - `Cancelled` is terminal and absorbs everything;
    /// - unknown event types never change status;
    /// - an approval restores `Active` (including from `Delinquent`);
    /// - a refund or chargeback demotes to `Delinquent`;
    /// - a cancellation moves to `Cancelled` from any non-terminal status.
    pub fn next(self, event: &EventType) -> SubscriberStatus {
        match (self, event) {
            (Self::Cancelled, _) => Self::Cancelled,
            (current, EventType::Unknown(_)) => current,
            (_, EventType::PaymentApproved) => Self::Active,
            (_, EventType::PaymentRefunded) | (_, EventType::PaymentChargeback) => {
                Self::Delinquent
            }
            (_, EventType::SubscriptionCancelled) => Self::Cancelled,
        }
    }
}

impl fmt::Display for SubscriberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for SubscriberStatus {
    type Error = PipelineError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "active" => Ok(Self::Active),
            "cancelled" => Ok(Self::Cancelled),
            "delinquent" => Ok(Self::Delinquent),
            other => Err(PipelineError::Storage(format!(
                "unknown subscriber status in store: {other}"
            ))),
        }
    }
}

/// Persisted per-subject projection. Created on the first event for a
/// subject, refreshed on every accepted event after that, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberState {
    pub subject_id: SubjectId,
    pub status: SubscriberStatus,
    pub last_event_id: EventId,
    pub last_event_at: DateTime<Utc>,
}

/// What the store should do with a subscriber row for one admitted event.
/// Events apply in delivery order — `occurred_at` is audit metadata, not an
/// ordering key, because the processor does not guarantee ordered delivery.
#[derive(Debug)]
pub enum Projection {
    Create(SubscriberState),
    Update {
        state: SubscriberState,
        status_changed: bool,
    },
}

/// Pure projection step: fold one event into the current state (or into the
/// implicit initial `Active` state when the subject is new). Status moves
/// per `SubscriberStatus::next`; `last_event_id`/`last_event_at` always
/// track the event, including terminal and unknown-type cases.
pub fn project(current: Option<&SubscriberState>, event: &NormalizedEvent) -> Projection {
    match current {
        None => Projection::Create(SubscriberState {
            subject_id: event.subject_id.clone(),
            status: SubscriberStatus::Active.next(&event.event_type),
            last_event_id: event.event_id.clone(),
            last_event_at: event.occurred_at,
        }),
        Some(current) => {
            let status = current.status.next(&event.event_type);
            Projection::Update {
                status_changed: status != current.status,
                state: SubscriberState {
                    subject_id: current.subject_id.clone(),
                    status,
                    last_event_id: event.event_id.clone(),
                    last_event_at: event.occurred_at,
                },
            }
        }
    }
}

/// Outcome of running one admitted event through the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessResult {
    /// First event for this subject — row created.
    Created(SubscriberState),
    /// Status advanced on an existing subject.
    Updated(SubscriberState),
    /// Event accepted and recorded, status untouched (same status,
    /// terminal subject, or unknown event type).
    Unchanged(SubscriberState),
    /// Event id already processed (duplicate delivery) — successful no-op.
    Duplicate,
}

impl ProcessResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created(_) => "created",
            Self::Updated(_) => "updated",
            Self::Unchanged(_) => "unchanged",
            Self::Duplicate => "duplicate",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use EventType::*;
    use SubscriberStatus::*;

    #[test]
    fn transition_table() {
        let cases = [
            (Active, PaymentApproved, Active),
            (Active, PaymentRefunded, Delinquent),
            (Active, PaymentChargeback, Delinquent),
            (Active, SubscriptionCancelled, Cancelled),
            (Delinquent, PaymentApproved, Active),
            (Delinquent, PaymentRefunded, Delinquent),
            (Delinquent, SubscriptionCancelled, Cancelled),
            (Cancelled, PaymentApproved, Cancelled),
            (Cancelled, PaymentRefunded, Cancelled),
            (Cancelled, SubscriptionCancelled, Cancelled),
        ];
        for (from, ref event, to) in cases {
            assert_eq!(from.next(event), to, "{from} + {event}");
        }
    }

    #[test]
    fn unknown_event_never_changes_status() {
        let event = Unknown("pix.generated".into());
        for status in [Active, Cancelled, Delinquent] {
            assert_eq!(status.next(&event), status);
        }
    }
}
