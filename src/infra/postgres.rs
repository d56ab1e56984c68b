use {
    super::store::{StoreFuture, SubscriberStore},
    crate::domain::{
        error::PipelineError,
        event::NormalizedEvent,
        id::{EventId, SubjectId},
        subscriber::{self, ProcessResult, Projection, SubscriberState, SubscriberStatus},
    },
    chrono::{DateTime, Utc},
    sqlx::PgPool,
    std::time::Duration,
};

/// Production store backend. Per-subject serialization comes from a
/// transaction-scoped advisory lock on the subject id, and duplicate
/// suppression from `ON CONFLICT (event_id) DO NOTHING` on the
/// processed-events table — the insert-if-absent acts as the lock surrogate
/// for concurrent deliveries of the same event.
pub struct PgStore {
    pool: PgPool,
    op_timeout: Duration,
}

impl PgStore {
    pub fn new(pool: PgPool, op_timeout: Duration) -> Self {
        Self { pool, op_timeout }
    }

    /// Store outages must fail the request (so the processor retries), not
    /// hang it. Every store call is bounded by `op_timeout`.
    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, PipelineError>>,
    ) -> Result<T, PipelineError> {
        tokio::time::timeout(self.op_timeout, fut)
            .await
            .map_err(|_| PipelineError::Storage("store operation timed out".into()))?
    }

    async fn project_tx(&self, event: &NormalizedEvent) -> Result<ProcessResult, PipelineError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SET LOCAL lock_timeout = '5s'")
            .execute(&mut *tx)
            .await?;

        // Serialize all processing for this subject. Advisory lock works
        // even when the subscriber row doesn't exist yet — no insert race.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(event.subject_id.as_str())
            .execute(&mut *tx)
            .await?;

        // Record the event. If already seen, bail before touching state.
        let inserted = sqlx::query_scalar::<_, bool>(
            r#"
            INSERT INTO processed_events (event_id, subject_id, event_type, payload)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (event_id) DO NOTHING
            RETURNING true
            "#,
        )
        .bind(event.event_id.as_str())
        .bind(event.subject_id.as_str())
        .bind(event.event_type.as_str())
        .bind(&event.payload)
        .fetch_optional(&mut *tx)
        .await?;

        if inserted.is_none() {
            tx.commit().await?;
            return Ok(ProcessResult::Duplicate);
        }

        let existing = sqlx::query_as::<_, (String, String, DateTime<Utc>)>(
            "SELECT status, last_event_id, last_event_at FROM subscribers WHERE subject_id = $1",
        )
        .bind(event.subject_id.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let existing = existing
            .map(|(status, last_event_id, last_event_at)| {
                Ok::<_, PipelineError>(SubscriberState {
                    subject_id: event.subject_id.clone(),
                    status: SubscriberStatus::try_from(status.as_str())?,
                    last_event_id: EventId::new(last_event_id)?,
                    last_event_at,
                })
            })
            .transpose()?;

        let result = match subscriber::project(existing.as_ref(), event) {
            Projection::Create(state) => {
                sqlx::query(
                    r#"
                    INSERT INTO subscribers (subject_id, status, last_event_id, last_event_at)
                    VALUES ($1, $2, $3, $4)
                    "#,
                )
                .bind(state.subject_id.as_str())
                .bind(state.status.as_str())
                .bind(state.last_event_id.as_str())
                .bind(state.last_event_at)
                .execute(&mut *tx)
                .await?;
                ProcessResult::Created(state)
            }
            Projection::Update {
                state,
                status_changed,
            } => {
                sqlx::query(
                    r#"
                    UPDATE subscribers
                    SET status = $1, last_event_id = $2, last_event_at = $3, updated_at = now()
                    WHERE subject_id = $4
                    "#,
                )
                .bind(state.status.as_str())
                .bind(state.last_event_id.as_str())
                .bind(state.last_event_at)
                .bind(state.subject_id.as_str())
                .execute(&mut *tx)
                .await?;
                if status_changed {
                    ProcessResult::Updated(state)
                } else {
                    ProcessResult::Unchanged(state)
                }
            }
        };

        tx.commit().await?;
        Ok(result)
    }
}

impl SubscriberStore for PgStore {
    fn seen<'a>(&'a self, event_id: &'a EventId) -> StoreFuture<'a, bool> {
        Box::pin(self.bounded(async move {
            let found = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM processed_events WHERE event_id = $1)",
            )
            .bind(event_id.as_str())
            .fetch_one(&self.pool)
            .await?;
            Ok(found)
        }))
    }

    fn project<'a>(&'a self, event: &'a NormalizedEvent) -> StoreFuture<'a, ProcessResult> {
        Box::pin(self.bounded(self.project_tx(event)))
    }

    fn subscriber<'a>(
        &'a self,
        subject_id: &'a SubjectId,
    ) -> StoreFuture<'a, Option<SubscriberState>> {
        Box::pin(self.bounded(async move {
            let row = sqlx::query_as::<_, (String, String, DateTime<Utc>)>(
                "SELECT status, last_event_id, last_event_at FROM subscribers WHERE subject_id = $1",
            )
            .bind(subject_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

            row.map(|(status, last_event_id, last_event_at)| {
                Ok(SubscriberState {
                    subject_id: subject_id.clone(),
                    status: SubscriberStatus::try_from(status.as_str())?,
                    last_event_id: EventId::new(last_event_id)?,
                    last_event_at,
                })
            })
            .transpose()
        }))
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(self.bounded(async move {
            sqlx::query("SELECT 1").execute(&self.pool).await?;
            Ok(())
        }))
    }
}
