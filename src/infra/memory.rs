use {
    super::store::{StoreFuture, SubscriberStore},
    crate::domain::{
        error::PipelineError,
        event::NormalizedEvent,
        id::{EventId, SubjectId},
        subscriber::{self, ProcessResult, Projection, SubscriberState},
    },
    chrono::{DateTime, Utc},
    std::{
        collections::HashMap,
        sync::{Mutex, MutexGuard},
    },
};

#[derive(Default)]
struct Inner {
    processed: HashMap<EventId, DateTime<Utc>>,
    subscribers: HashMap<SubjectId, SubscriberState>,
}

/// Store backend for development runs (no `DATABASE_URL`) and tests.
/// One mutex over both maps makes the admit-and-project step trivially
/// atomic and serializes all subjects; fine at dev-traffic volumes.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, PipelineError> {
        self.inner
            .lock()
            .map_err(|_| PipelineError::Storage("memory store mutex poisoned".into()))
    }
}

impl SubscriberStore for MemoryStore {
    fn seen<'a>(&'a self, event_id: &'a EventId) -> StoreFuture<'a, bool> {
        Box::pin(async move { Ok(self.lock()?.processed.contains_key(event_id)) })
    }

    fn project<'a>(&'a self, event: &'a NormalizedEvent) -> StoreFuture<'a, ProcessResult> {
        Box::pin(async move {
            let mut inner = self.lock()?;

            // Insert-if-absent on the event id decides the race.
            if inner.processed.contains_key(&event.event_id) {
                return Ok(ProcessResult::Duplicate);
            }
            inner.processed.insert(event.event_id.clone(), Utc::now());

            let (state, result) =
                match subscriber::project(inner.subscribers.get(&event.subject_id), event) {
                    Projection::Create(state) => {
                        (state.clone(), ProcessResult::Created(state))
                    }
                    Projection::Update {
                        state,
                        status_changed: true,
                    } => (state.clone(), ProcessResult::Updated(state)),
                    Projection::Update {
                        state,
                        status_changed: false,
                    } => (state.clone(), ProcessResult::Unchanged(state)),
                };
            inner.subscribers.insert(state.subject_id.clone(), state);
            Ok(result)
        })
    }

    fn subscriber<'a>(
        &'a self,
        subject_id: &'a SubjectId,
    ) -> StoreFuture<'a, Option<SubscriberState>> {
        Box::pin(async move { Ok(self.lock()?.subscribers.get(subject_id).cloned()) })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.lock()?;
            Ok(())
        })
    }
}
