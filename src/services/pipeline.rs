use {
    crate::{
        adapters::signature,
        domain::{
            error::PipelineError,
            event::{self, WebhookDelivery},
            subscriber::ProcessResult,
        },
        infra::store::SubscriberStore,
    },
    tracing::field,
};

/// Run one delivery through the whole pipeline:
/// verify → normalize → admit → project + record.
///
/// A `Duplicate` outcome is a success — the processor redelivers webhooks
/// and must always get a 2xx for an event we have already absorbed,
/// otherwise it keeps retrying. Any error leaves no observable state: the
/// processed-event record and the subscriber write commit together or not
/// at all, so a failed request is safe to redeliver.
pub async fn ingest(
    store: &dyn SubscriberStore,
    secret: Option<&str>,
    delivery: WebhookDelivery,
) -> Result<ProcessResult, PipelineError> {
    let verified = signature::verify(delivery, secret)?;
    let event = event::normalize(verified)?;

    tracing::Span::current()
        .record("event_id", field::display(&event.event_id))
        .record("event_type", field::display(&event.event_type));

    // Cheap pre-check; the projection re-checks under the store's lock, so
    // a racing duplicate that slips past here still resolves to Duplicate.
    if store.seen(&event.event_id).await? {
        tracing::info!("duplicate delivery, already processed");
        return Ok(ProcessResult::Duplicate);
    }

    let result = store.project(&event).await?;
    match &result {
        ProcessResult::Created(state) | ProcessResult::Updated(state) => {
            tracing::info!(
                subject_id = %state.subject_id,
                status = %state.status,
                outcome = result.as_str(),
                "event projected"
            );
        }
        ProcessResult::Unchanged(state) => {
            tracing::info!(
                subject_id = %state.subject_id,
                status = %state.status,
                "event recorded, status unchanged"
            );
        }
        ProcessResult::Duplicate => {
            tracing::info!("duplicate delivery, lost projection race");
        }
    }
    Ok(result)
}
