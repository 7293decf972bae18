use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::error;
use uuid::Uuid;

use crate::models::{Actor, CheckInStats, Event, ScanOutcome, ScanRecord};
use crate::services::lookup::clip_for_audit;
use crate::store::TicketStore;
use crate::utils::AppError;

pub const DEFAULT_SCAN_PAGE: i64 = 50;
pub const MAX_SCAN_PAGE: i64 = 500;

/// Everything known about a scan attempt once its outcome is decided.
#[derive(Debug, Clone)]
pub struct ScanAttempt<'a> {
    pub actor: &'a Actor,
    pub event_id: Uuid,
    pub ticket_number: &'a str,
    pub ticket_id: Option<Uuid>,
    pub outcome: ScanOutcome,
    pub at: DateTime<Utc>,
}

impl ScanAttempt<'_> {
    fn to_record(&self) -> ScanRecord {
        ScanRecord {
            id: Uuid::new_v4(),
            event_id: self.event_id,
            ticket_number: clip_for_audit(self.ticket_number),
            ticket_id: self.ticket_id,
            actor_id: self.actor.id,
            actor_role: self.actor.role,
            outcome: self.outcome,
            scanned_at: self.at,
        }
    }
}

/// Appends the attempt to the audit log.
///
/// The scan outcome is already final at this point, so a failed append is
/// logged and swallowed rather than turned into a failed scan.
pub async fn record(store: &dyn TicketStore, attempt: ScanAttempt<'_>) {
    let record = attempt.to_record();
    if let Err(e) = store.append_scan(&record).await {
        error!(
            error = ?e,
            event_id = %record.event_id,
            ticket_number = %record.ticket_number,
            actor_id = %record.actor_id,
            outcome = %record.outcome,
            "Failed to append scan audit entry"
        );
    }
}

pub async fn recent(
    store: &dyn TicketStore,
    event_id: Uuid,
    limit: Option<i64>,
) -> Result<Vec<ScanRecord>, AppError> {
    let limit = limit.unwrap_or(DEFAULT_SCAN_PAGE).clamp(1, MAX_SCAN_PAGE);
    Ok(store.list_scans(event_id, limit).await?)
}

pub async fn stats(store: &dyn TicketStore, event: &Event) -> Result<CheckInStats, AppError> {
    let tickets = store.ticket_counts(event.id).await?;
    let scan_outcomes: BTreeMap<ScanOutcome, i64> =
        store.scan_outcome_counts(event.id).await?.into_iter().collect();

    Ok(CheckInStats {
        event_id: event.id,
        capacity: event.capacity,
        tickets_sold: event.tickets_sold,
        tickets,
        scan_outcomes,
    })
}
