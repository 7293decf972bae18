use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use uuid::Uuid;

use super::{StoreError, TicketStore};
use crate::models::{
    CheckInStatus, Event, EventStatus, NewEvent, NewUser, Pricing, ScanOutcome, ScanRecord, Ticket,
    TicketCounts, User,
};

const EVENT_COLUMNS: &str = "id, host_id, title, description, location, start_time, end_time, \
     capacity, tickets_sold, is_free, price_amount, price_currency, assigned_staff, status, \
     created_at, updated_at";

const TICKET_COLUMNS: &str = "id, ticket_number, event_id, attendee_id, status, is_checked_in, \
     check_in_time, scanned_by, created_at, updated_at";

#[derive(Debug, FromRow)]
struct EventRow {
    id: Uuid,
    host_id: Uuid,
    title: String,
    description: Option<String>,
    location: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    capacity: i32,
    tickets_sold: i32,
    is_free: bool,
    price_amount: Option<Decimal>,
    price_currency: Option<String>,
    assigned_staff: Vec<Uuid>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = StoreError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let pricing = match (row.is_free, row.price_amount, row.price_currency) {
            (true, _, _) => Pricing::Free,
            (false, Some(amount), Some(currency)) => Pricing::Paid { amount, currency },
            (false, _, _) => {
                return Err(StoreError::Corrupt(format!(
                    "event {} is paid but has no price",
                    row.id
                )))
            }
        };

        Ok(Event {
            id: row.id,
            host_id: row.host_id,
            title: row.title,
            description: row.description,
            location: row.location,
            start_time: row.start_time,
            end_time: row.end_time,
            capacity: row.capacity,
            tickets_sold: row.tickets_sold,
            pricing,
            assigned_staff: row.assigned_staff,
            status: row
                .status
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("{e}")))?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct TicketRow {
    id: Uuid,
    ticket_number: String,
    event_id: Uuid,
    attendee_id: Uuid,
    status: String,
    is_checked_in: bool,
    check_in_time: Option<DateTime<Utc>>,
    scanned_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TicketRow> for Ticket {
    type Error = StoreError;

    fn try_from(row: TicketRow) -> Result<Self, Self::Error> {
        Ok(Ticket {
            id: row.id,
            ticket_number: row.ticket_number,
            event_id: row.event_id,
            attendee_id: row.attendee_id,
            status: row
                .status
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("{e}")))?,
            check_in_status: CheckInStatus {
                is_checked_in: row.is_checked_in,
                check_in_time: row.check_in_time,
                scanned_by: row.scanned_by,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ScanRow {
    id: Uuid,
    event_id: Uuid,
    ticket_number: String,
    ticket_id: Option<Uuid>,
    actor_id: Uuid,
    actor_role: String,
    outcome: String,
    scanned_at: DateTime<Utc>,
}

impl TryFrom<ScanRow> for ScanRecord {
    type Error = StoreError;

    fn try_from(row: ScanRow) -> Result<Self, Self::Error> {
        Ok(ScanRecord {
            id: row.id,
            event_id: row.event_id,
            ticket_number: row.ticket_number,
            ticket_id: row.ticket_id,
            actor_id: row.actor_id,
            actor_role: row
                .actor_role
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("{e}")))?,
            outcome: row
                .outcome
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("{e}")))?,
            scanned_at: row.scanned_at,
        })
    }
}

fn map_unique_violation(err: sqlx::Error, what: &'static str) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return StoreError::Duplicate(what);
        }
    }
    StoreError::Database(err)
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects and brings the schema up to date.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        tracing::info!("Successfully connected to database");

        sqlx::migrate!().run(&pool).await?;

        tracing::info!("Migrations run successfully");

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl TicketStore for PgStore {
    async fn create_user(&self, input: NewUser, now: DateTime<Utc>) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING id, name, email, created_at, updated_at
            "#,
        )
        .bind(input.id)
        .bind(&input.name)
        .bind(&input.email)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "user"))
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create_event(&self, input: NewEvent, now: DateTime<Utc>) -> Result<Event, StoreError> {
        let (is_free, amount, currency) = match &input.pricing {
            Pricing::Free => (true, None, None),
            Pricing::Paid { amount, currency } => (false, Some(*amount), Some(currency.clone())),
        };

        let row = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            INSERT INTO events (id, host_id, title, description, location, start_time, end_time,
                                capacity, tickets_sold, is_free, price_amount, price_currency,
                                assigned_staff, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 0, $9, $10, $11, '{{}}', 'draft', $12, $12)
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(input.host_id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.location)
        .bind(input.start_time)
        .bind(input.end_time)
        .bind(input.capacity)
        .bind(is_free)
        .bind(amount)
        .bind(currency)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn get_event(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Event::try_from).transpose()
    }

    async fn transition_event(
        &self,
        id: Uuid,
        from: &[EventStatus],
        to: EventStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Event>, StoreError> {
        let from: Vec<&str> = from.iter().map(EventStatus::as_str).collect();

        let row = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            UPDATE events
            SET status = $2, updated_at = $3
            WHERE id = $1 AND status = ANY($4)
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(to.as_str())
        .bind(now)
        .bind(&from)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Event::try_from).transpose()
    }

    async fn set_event_staff(
        &self,
        id: Uuid,
        staff: &[Uuid],
        now: DateTime<Utc>,
    ) -> Result<Option<Event>, StoreError> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            UPDATE events
            SET assigned_staff = $2, updated_at = $3
            WHERE id = $1
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(staff)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Event::try_from).transpose()
    }

    async fn complete_elapsed_events(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE events
            SET status = 'completed', updated_at = $1
            WHERE status = 'published' AND end_time <= $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn reserve_and_issue(
        &self,
        event_id: Uuid,
        tickets: Vec<Ticket>,
        now: DateTime<Utc>,
    ) -> Result<Option<Vec<Ticket>>, StoreError> {
        let requested = i32::try_from(tickets.len())
            .map_err(|_| StoreError::Corrupt("ticket batch too large".to_string()))?;

        let mut tx = self.pool.begin().await?;

        let reserved = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE events
            SET tickets_sold = tickets_sold + $2, updated_at = $3
            WHERE id = $1 AND status = 'published' AND tickets_sold + $2 <= capacity
            RETURNING id
            "#,
        )
        .bind(event_id)
        .bind(requested)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        if reserved.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }

        let mut issued = Vec::with_capacity(tickets.len());
        for ticket in tickets {
            let row = sqlx::query_as::<_, TicketRow>(&format!(
                r#"
                INSERT INTO tickets (id, ticket_number, event_id, attendee_id, status,
                                     is_checked_in, created_at, updated_at)
                VALUES ($1, $2, $3, $4, 'active', FALSE, $5, $5)
                RETURNING {TICKET_COLUMNS}
                "#
            ))
            .bind(ticket.id)
            .bind(&ticket.ticket_number)
            .bind(ticket.event_id)
            .bind(ticket.attendee_id)
            .bind(ticket.created_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_unique_violation(e, "ticket number"))?;

            issued.push(Ticket::try_from(row)?);
        }

        tx.commit().await?;

        Ok(Some(issued))
    }

    async fn find_ticket(&self, ticket_number: &str) -> Result<Option<Ticket>, StoreError> {
        let row = sqlx::query_as::<_, TicketRow>(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE ticket_number = $1"
        ))
        .bind(ticket_number)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Ticket::try_from).transpose()
    }

    async fn get_ticket(&self, id: Uuid) -> Result<Option<Ticket>, StoreError> {
        let row = sqlx::query_as::<_, TicketRow>(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Ticket::try_from).transpose()
    }

    async fn check_in_ticket(
        &self,
        ticket_id: Uuid,
        scanned_by: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<Ticket>, StoreError> {
        let row = sqlx::query_as::<_, TicketRow>(&format!(
            r#"
            UPDATE tickets
            SET is_checked_in = TRUE, check_in_time = $3, scanned_by = $2, updated_at = $3
            WHERE id = $1 AND status = 'active' AND is_checked_in = FALSE
            RETURNING {TICKET_COLUMNS}
            "#
        ))
        .bind(ticket_id)
        .bind(scanned_by)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Ticket::try_from).transpose()
    }

    async fn cancel_ticket(
        &self,
        ticket_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Ticket>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, TicketRow>(&format!(
            r#"
            UPDATE tickets
            SET status = 'cancelled', updated_at = $2
            WHERE id = $1 AND status = 'active' AND is_checked_in = FALSE
            RETURNING {TICKET_COLUMNS}
            "#
        ))
        .bind(ticket_id)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query(
            r#"
            UPDATE events
            SET tickets_sold = tickets_sold - 1, updated_at = $2
            WHERE id = $1 AND tickets_sold > 0
            "#,
        )
        .bind(row.event_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ticket::try_from(row).map(Some)
    }

    async fn ticket_counts(&self, event_id: Uuid) -> Result<TicketCounts, StoreError> {
        let counts = sqlx::query_as::<_, TicketCounts>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = 'active' AND is_checked_in) AS checked_in,
                COUNT(*) FILTER (WHERE status = 'active' AND NOT is_checked_in) AS not_checked_in,
                COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled
            FROM tickets
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(counts)
    }

    async fn append_scan(&self, record: &ScanRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO scan_audit (id, event_id, ticket_number, ticket_id, actor_id, actor_role,
                                    outcome, scanned_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(record.id)
        .bind(record.event_id)
        .bind(&record.ticket_number)
        .bind(record.ticket_id)
        .bind(record.actor_id)
        .bind(record.actor_role.as_str())
        .bind(record.outcome.as_str())
        .bind(record.scanned_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_scans(&self, event_id: Uuid, limit: i64) -> Result<Vec<ScanRecord>, StoreError> {
        let rows = sqlx::query_as::<_, ScanRow>(
            r#"
            SELECT id, event_id, ticket_number, ticket_id, actor_id, actor_role, outcome, scanned_at
            FROM scan_audit
            WHERE event_id = $1
            ORDER BY scanned_at DESC, seq DESC
            LIMIT $2
            "#,
        )
        .bind(event_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ScanRecord::try_from).collect()
    }

    async fn scan_outcome_counts(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<(ScanOutcome, i64)>, StoreError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT outcome, COUNT(*) AS count
            FROM scan_audit
            WHERE event_id = $1
            GROUP BY outcome
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(outcome, count)| {
                outcome
                    .parse::<ScanOutcome>()
                    .map(|o| (o, count))
                    .map_err(|e| StoreError::Corrupt(format!("{e}")))
            })
            .collect()
    }
}
