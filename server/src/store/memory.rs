// In-memory store used when no DATABASE_URL is configured, and by tests.
// Every conditional update holds the write lock for the whole check-and-set,
// which gives the same single-record atomicity the Postgres store gets from
// `UPDATE ... WHERE`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use super::{StoreError, TicketStore};
use crate::models::{
    Event, EventStatus, NewEvent, NewUser, ScanOutcome, ScanRecord, Ticket, TicketCounts,
    TicketState, TicketStatus, User,
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    events: HashMap<Uuid, Event>,
    tickets: HashMap<Uuid, Ticket>,
    ticket_numbers: HashMap<String, Uuid>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    scans: RwLock<Vec<ScanRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TicketStore for MemoryStore {
    async fn create_user(&self, input: NewUser, now: DateTime<Utc>) -> Result<User, StoreError> {
        let mut tables = self.tables.write();
        if tables.users.contains_key(&input.id) {
            return Err(StoreError::Duplicate("user"));
        }
        if tables
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&input.email))
        {
            return Err(StoreError::Duplicate("email"));
        }
        let user = User {
            id: input.id,
            name: input.name,
            email: input.email,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().users.get(&id).cloned())
    }

    async fn create_event(&self, input: NewEvent, now: DateTime<Utc>) -> Result<Event, StoreError> {
        let event = Event {
            id: Uuid::new_v4(),
            host_id: input.host_id,
            title: input.title,
            description: input.description,
            location: input.location,
            start_time: input.start_time,
            end_time: input.end_time,
            capacity: input.capacity,
            tickets_sold: 0,
            pricing: input.pricing,
            assigned_staff: Vec::new(),
            status: EventStatus::Draft,
            created_at: now,
            updated_at: now,
        };
        self.tables.write().events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn get_event(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
        Ok(self.tables.read().events.get(&id).cloned())
    }

    async fn transition_event(
        &self,
        id: Uuid,
        from: &[EventStatus],
        to: EventStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Event>, StoreError> {
        let mut tables = self.tables.write();
        match tables.events.get_mut(&id) {
            Some(event) if from.contains(&event.status) => {
                event.status = to;
                event.updated_at = now;
                Ok(Some(event.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn set_event_staff(
        &self,
        id: Uuid,
        staff: &[Uuid],
        now: DateTime<Utc>,
    ) -> Result<Option<Event>, StoreError> {
        let mut tables = self.tables.write();
        Ok(tables.events.get_mut(&id).map(|event| {
            event.assigned_staff = staff.to_vec();
            event.updated_at = now;
            event.clone()
        }))
    }

    async fn complete_elapsed_events(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut tables = self.tables.write();
        let mut completed = 0;
        for event in tables.events.values_mut() {
            if event.status == EventStatus::Published && event.end_time <= now {
                event.status = EventStatus::Completed;
                event.updated_at = now;
                completed += 1;
            }
        }
        Ok(completed)
    }

    async fn reserve_and_issue(
        &self,
        event_id: Uuid,
        tickets: Vec<Ticket>,
        now: DateTime<Utc>,
    ) -> Result<Option<Vec<Ticket>>, StoreError> {
        let mut guard = self.tables.write();
        let tables = &mut *guard;
        let requested = i32::try_from(tickets.len())
            .map_err(|_| StoreError::Corrupt("ticket batch too large".to_string()))?;

        let Some(event) = tables.events.get_mut(&event_id) else {
            return Ok(None);
        };
        if event.status != EventStatus::Published || event.tickets_sold + requested > event.capacity {
            return Ok(None);
        }
        if tickets
            .iter()
            .any(|t| tables.ticket_numbers.contains_key(&t.ticket_number))
        {
            return Err(StoreError::Duplicate("ticket number"));
        }

        event.tickets_sold += requested;
        event.updated_at = now;
        for ticket in &tickets {
            tables
                .ticket_numbers
                .insert(ticket.ticket_number.clone(), ticket.id);
            tables.tickets.insert(ticket.id, ticket.clone());
        }
        Ok(Some(tickets))
    }

    async fn find_ticket(&self, ticket_number: &str) -> Result<Option<Ticket>, StoreError> {
        let tables = self.tables.read();
        Ok(tables
            .ticket_numbers
            .get(ticket_number)
            .and_then(|id| tables.tickets.get(id))
            .cloned())
    }

    async fn get_ticket(&self, id: Uuid) -> Result<Option<Ticket>, StoreError> {
        Ok(self.tables.read().tickets.get(&id).cloned())
    }

    async fn check_in_ticket(
        &self,
        ticket_id: Uuid,
        scanned_by: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<Ticket>, StoreError> {
        let mut tables = self.tables.write();
        match tables.tickets.get_mut(&ticket_id) {
            Some(ticket) if ticket.state() == TicketState::Issued => {
                ticket.check_in_status.is_checked_in = true;
                ticket.check_in_status.check_in_time = Some(at);
                ticket.check_in_status.scanned_by = Some(scanned_by);
                ticket.updated_at = at;
                Ok(Some(ticket.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn cancel_ticket(
        &self,
        ticket_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Ticket>, StoreError> {
        let mut guard = self.tables.write();
        let tables = &mut *guard;
        let ticket = match tables.tickets.get_mut(&ticket_id) {
            Some(ticket) if ticket.state() == TicketState::Issued => ticket,
            _ => return Ok(None),
        };
        ticket.status = TicketStatus::Cancelled;
        ticket.updated_at = now;
        let cancelled = ticket.clone();

        if let Some(event) = tables.events.get_mut(&cancelled.event_id) {
            event.tickets_sold = (event.tickets_sold - 1).max(0);
            event.updated_at = now;
        }
        Ok(Some(cancelled))
    }

    async fn ticket_counts(&self, event_id: Uuid) -> Result<TicketCounts, StoreError> {
        let tables = self.tables.read();
        let mut counts = TicketCounts::default();
        for ticket in tables.tickets.values().filter(|t| t.event_id == event_id) {
            match ticket.state() {
                TicketState::Issued => counts.not_checked_in += 1,
                TicketState::CheckedIn => counts.checked_in += 1,
                TicketState::Cancelled => counts.cancelled += 1,
            }
        }
        Ok(counts)
    }

    async fn append_scan(&self, record: &ScanRecord) -> Result<(), StoreError> {
        self.scans.write().push(record.clone());
        Ok(())
    }

    async fn list_scans(&self, event_id: Uuid, limit: i64) -> Result<Vec<ScanRecord>, StoreError> {
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(self
            .scans
            .read()
            .iter()
            .rev()
            .filter(|r| r.event_id == event_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn scan_outcome_counts(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<(ScanOutcome, i64)>, StoreError> {
        let mut counts: HashMap<ScanOutcome, i64> = HashMap::new();
        for record in self.scans.read().iter().filter(|r| r.event_id == event_id) {
            *counts.entry(record.outcome).or_default() += 1;
        }
        Ok(counts.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Pricing, Role};
    use chrono::Duration;
    use std::sync::Arc;

    async fn published_event(store: &MemoryStore, capacity: i32) -> Event {
        let now = Utc::now();
        let event = store
            .create_event(
                NewEvent {
                    host_id: Uuid::new_v4(),
                    title: "Gig".to_string(),
                    description: None,
                    location: "Dock 4".to_string(),
                    start_time: now + Duration::hours(1),
                    end_time: now + Duration::hours(4),
                    capacity,
                    pricing: Pricing::Free,
                },
                now,
            )
            .await
            .unwrap();
        store
            .transition_event(event.id, &[EventStatus::Draft], EventStatus::Published, now)
            .await
            .unwrap()
            .unwrap()
    }

    fn ticket_for(event: &Event, number: &str) -> Ticket {
        Ticket::issue(number.to_string(), event.id, Uuid::new_v4(), Utc::now())
    }

    #[tokio::test]
    async fn test_reserve_respects_capacity() {
        let store = MemoryStore::new();
        let event = published_event(&store, 2).await;

        let issued = store
            .reserve_and_issue(event.id, vec![ticket_for(&event, "A"), ticket_for(&event, "B")], Utc::now())
            .await
            .unwrap();
        assert_eq!(issued.map(|t| t.len()), Some(2));

        let overflow = store
            .reserve_and_issue(event.id, vec![ticket_for(&event, "C")], Utc::now())
            .await
            .unwrap();
        assert!(overflow.is_none());
        assert!(store.find_ticket("C").await.unwrap().is_none());
        assert_eq!(store.get_event(event.id).await.unwrap().unwrap().tickets_sold, 2);
    }

    #[tokio::test]
    async fn test_concurrent_reservations_never_oversell() {
        let store = Arc::new(MemoryStore::new());
        let event = published_event(&store, 5).await;

        let mut handles = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            let ticket = ticket_for(&event, &format!("T-{i}"));
            handles.push(tokio::spawn(async move {
                store
                    .reserve_and_issue(ticket.event_id, vec![ticket], Utc::now())
                    .await
                    .unwrap()
                    .is_some()
            }));
        }

        let mut accepted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 5);
        assert_eq!(store.get_event(event.id).await.unwrap().unwrap().tickets_sold, 5);
    }

    #[tokio::test]
    async fn test_check_in_applies_once() {
        let store = MemoryStore::new();
        let event = published_event(&store, 10).await;
        let ticket = ticket_for(&event, "TCK-001");
        store
            .reserve_and_issue(event.id, vec![ticket.clone()], Utc::now())
            .await
            .unwrap();

        let scanner = Uuid::new_v4();
        let first = store.check_in_ticket(ticket.id, scanner, Utc::now()).await.unwrap();
        assert!(first.is_some());

        let second = store
            .check_in_ticket(ticket.id, Uuid::new_v4(), Utc::now())
            .await
            .unwrap();
        assert!(second.is_none());

        let stored = store.get_ticket(ticket.id).await.unwrap().unwrap();
        assert_eq!(stored.check_in_status.scanned_by, Some(scanner));
    }

    #[tokio::test]
    async fn test_cancel_releases_capacity_and_blocks_check_in() {
        let store = MemoryStore::new();
        let event = published_event(&store, 1).await;
        let ticket = ticket_for(&event, "TCK-002");
        store
            .reserve_and_issue(event.id, vec![ticket.clone()], Utc::now())
            .await
            .unwrap();

        let cancelled = store.cancel_ticket(ticket.id, Utc::now()).await.unwrap().unwrap();
        assert_eq!(cancelled.status, TicketStatus::Cancelled);
        assert_eq!(store.get_event(event.id).await.unwrap().unwrap().tickets_sold, 0);

        let scan = store
            .check_in_ticket(ticket.id, Uuid::new_v4(), Utc::now())
            .await
            .unwrap();
        assert!(scan.is_none());
    }

    #[tokio::test]
    async fn test_list_scans_is_newest_first_and_scoped() {
        let store = MemoryStore::new();
        let event_id = Uuid::new_v4();
        let other_event = Uuid::new_v4();
        let base = Utc::now();

        for (i, event) in [event_id, other_event, event_id].into_iter().enumerate() {
            store
                .append_scan(&ScanRecord {
                    id: Uuid::new_v4(),
                    event_id: event,
                    ticket_number: format!("TCK-{i}"),
                    ticket_id: None,
                    actor_id: Uuid::new_v4(),
                    actor_role: Role::Staff,
                    outcome: ScanOutcome::RejectedNotFound,
                    scanned_at: base + Duration::seconds(i as i64),
                })
                .await
                .unwrap();
        }

        let scans = store.list_scans(event_id, 10).await.unwrap();
        let numbers: Vec<_> = scans.iter().map(|s| s.ticket_number.as_str()).collect();
        assert_eq!(numbers, vec!["TCK-2", "TCK-0"]);

        let counts = store.scan_outcome_counts(event_id).await.unwrap();
        assert_eq!(counts, vec![(ScanOutcome::RejectedNotFound, 2)]);
    }

    #[tokio::test]
    async fn test_completion_sweep_only_touches_elapsed_published_events() {
        let store = MemoryStore::new();
        let event = published_event(&store, 1).await;

        assert_eq!(store.complete_elapsed_events(Utc::now()).await.unwrap(), 0);
        let later = event.end_time + Duration::minutes(1);
        assert_eq!(store.complete_elapsed_events(later).await.unwrap(), 1);
        assert_eq!(
            store.get_event(event.id).await.unwrap().unwrap().status,
            EventStatus::Completed
        );
    }
}
