//! Persistence seam for the ticketing core.
//!
//! Every mutation that has to be safe under concurrent requests is expressed
//! as a single conditional update here, so callers never read-then-write.
//! Conditional operations return `Ok(None)` when their precondition did not
//! hold; the caller re-reads to find out why.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Event, EventStatus, NewEvent, NewUser, ScanOutcome, ScanRecord, Ticket, TicketCounts, User,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("duplicate {0}")]
    Duplicate(&'static str),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn create_user(&self, input: NewUser, now: DateTime<Utc>) -> Result<User, StoreError>;

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn create_event(&self, input: NewEvent, now: DateTime<Utc>) -> Result<Event, StoreError>;

    async fn get_event(&self, id: Uuid) -> Result<Option<Event>, StoreError>;

    /// Moves the event to `to` only if its current status is one of `from`.
    async fn transition_event(
        &self,
        id: Uuid,
        from: &[EventStatus],
        to: EventStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Event>, StoreError>;

    async fn set_event_staff(
        &self,
        id: Uuid,
        staff: &[Uuid],
        now: DateTime<Utc>,
    ) -> Result<Option<Event>, StoreError>;

    /// Marks every published event whose end time has passed as completed.
    async fn complete_elapsed_events(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;

    /// Bumps `tickets_sold` by `tickets.len()` if the event is published and
    /// has room, then inserts the tickets. Both happen or neither does.
    async fn reserve_and_issue(
        &self,
        event_id: Uuid,
        tickets: Vec<Ticket>,
        now: DateTime<Utc>,
    ) -> Result<Option<Vec<Ticket>>, StoreError>;

    async fn find_ticket(&self, ticket_number: &str) -> Result<Option<Ticket>, StoreError>;

    async fn get_ticket(&self, id: Uuid) -> Result<Option<Ticket>, StoreError>;

    /// issued -> checked-in. Applies only while the ticket is active and not
    /// yet checked in.
    async fn check_in_ticket(
        &self,
        ticket_id: Uuid,
        scanned_by: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<Ticket>, StoreError>;

    /// issued -> cancelled, releasing one unit of event capacity.
    async fn cancel_ticket(
        &self,
        ticket_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Ticket>, StoreError>;

    async fn ticket_counts(&self, event_id: Uuid) -> Result<TicketCounts, StoreError>;

    async fn append_scan(&self, record: &ScanRecord) -> Result<(), StoreError>;

    /// Newest first.
    async fn list_scans(&self, event_id: Uuid, limit: i64) -> Result<Vec<ScanRecord>, StoreError>;

    async fn scan_outcome_counts(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<(ScanOutcome, i64)>, StoreError>;
}
