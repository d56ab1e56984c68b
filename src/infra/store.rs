use {
    crate::domain::{
        error::PipelineError,
        event::NormalizedEvent,
        id::{EventId, SubjectId},
        subscriber::{ProcessResult, SubscriberState},
    },
    std::{future::Future, pin::Pin},
};

pub type StoreFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, PipelineError>> + Send + 'a>>;

/// The capabilities the pipeline needs from its document store: conditional
/// insert-if-absent keyed by event id, a read-modify-write on the subscriber
/// row keyed by subject id, and reads by key. A backend that cannot make the
/// event-record insert atomic with the subscriber write cannot implement
/// `project`'s contract and must not be wired in without an external lock.
pub trait SubscriberStore: Send + Sync {
    /// Has this event id already been processed? Advisory pre-check only —
    /// `project` re-checks atomically.
    fn seen<'a>(&'a self, event_id: &'a EventId) -> StoreFuture<'a, bool>;

    /// Atomically: record the event id (insert-if-absent), fold the event
    /// into the subscriber's state, and persist both — or, if the event id
    /// was already recorded, change nothing and report `Duplicate`.
    /// Concurrent calls for the same subject are serialized.
    fn project<'a>(&'a self, event: &'a NormalizedEvent) -> StoreFuture<'a, ProcessResult>;

    /// Read a subscriber's current state.
    fn subscriber<'a>(
        &'a self,
        subject_id: &'a SubjectId,
    ) -> StoreFuture<'a, Option<SubscriberState>>;

    /// Cheap reachability probe for the diagnostics endpoint.
    fn ping(&self) -> StoreFuture<'_, ()>;
}
