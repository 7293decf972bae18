//! issued -> checked-in.
//!
//! The transition itself is one conditional update in the store. A snapshot
//! read beforehand only lets us answer obvious duplicates without a write;
//! the update is what decides.

use chrono::{DateTime, Utc};

use crate::models::{Actor, Ticket, TicketState};
use crate::store::TicketStore;
use crate::utils::{AppError, ScanRejection};

/// The rejection a ticket in this state earns, or `None` if it can be checked in.
pub fn rejection_for(ticket: &Ticket) -> Option<ScanRejection> {
    match ticket.state() {
        TicketState::Issued => None,
        TicketState::CheckedIn => Some(ScanRejection::AlreadyCheckedIn {
            checked_in_at: ticket.check_in_status.check_in_time,
        }),
        TicketState::Cancelled => Some(ScanRejection::Cancelled),
    }
}

pub async fn check_in(
    store: &dyn TicketStore,
    ticket: &Ticket,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<Ticket, AppError> {
    if let Some(rejection) = rejection_for(ticket) {
        return Err(rejection.into());
    }

    if let Some(checked_in) = store.check_in_ticket(ticket.id, actor.id, now).await? {
        return Ok(checked_in);
    }

    // Lost the race, or the ticket changed since the snapshot.
    let current = store
        .get_ticket(ticket.id)
        .await?
        .ok_or(ScanRejection::NotFound)?;

    match rejection_for(&current) {
        Some(rejection) => Err(rejection.into()),
        None => Err(AppError::InternalServerError(format!(
            "check-in of ticket {} did not apply",
            ticket.id
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::store::MemoryStore;
    use crate::test_support::{book_one, published_event};
    use chrono::Duration;
    use std::sync::Arc;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_issued_ticket_is_checked_in_with_time_and_actor() {
        let store = MemoryStore::new();
        let event = published_event(&store, Uuid::new_v4(), 10, vec![]).await;
        let ticket = book_one(&store, &event, "TCK-001").await;
        let actor = Actor::new(event.host_id, Role::Host);
        let now = Utc::now();

        let checked_in = check_in(&store, &ticket, &actor, now).await.unwrap();
        assert!(checked_in.check_in_status.is_checked_in);
        assert_eq!(checked_in.check_in_status.check_in_time, Some(now));
        assert_eq!(checked_in.check_in_status.scanned_by, Some(actor.id));
    }

    #[tokio::test]
    async fn test_second_scan_keeps_original_record() {
        let store = MemoryStore::new();
        let event = published_event(&store, Uuid::new_v4(), 10, vec![]).await;
        let ticket = book_one(&store, &event, "TCK-001").await;
        let first_actor = Actor::new(event.host_id, Role::Host);
        let first_time = Utc::now();
        check_in(&store, &ticket, &first_actor, first_time).await.unwrap();

        // Stale snapshot: the second scanner read the ticket before the first write.
        let later = first_time + Duration::seconds(5);
        let err = check_in(&store, &ticket, &Actor::new(Uuid::new_v4(), Role::Staff), later)
            .await
            .unwrap_err();
        assert_eq!(
            err.as_scan_rejection(),
            Some(&ScanRejection::AlreadyCheckedIn {
                checked_in_at: Some(first_time)
            })
        );

        let stored = store.get_ticket(ticket.id).await.unwrap().unwrap();
        assert_eq!(stored.check_in_status.check_in_time, Some(first_time));
        assert_eq!(stored.check_in_status.scanned_by, Some(first_actor.id));
    }

    #[tokio::test]
    async fn test_cancelled_ticket_is_rejected() {
        let store = MemoryStore::new();
        let event = published_event(&store, Uuid::new_v4(), 10, vec![]).await;
        let ticket = book_one(&store, &event, "TCK-001").await;
        let cancelled = store.cancel_ticket(ticket.id, Utc::now()).await.unwrap().unwrap();

        let err = check_in(&store, &cancelled, &Actor::new(event.host_id, Role::Host), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.as_scan_rejection(), Some(&ScanRejection::Cancelled));
    }

    #[tokio::test]
    async fn test_concurrent_check_ins_succeed_exactly_once() {
        let store = Arc::new(MemoryStore::new());
        let event = published_event(store.as_ref(), Uuid::new_v4(), 10, vec![]).await;
        let ticket = book_one(store.as_ref(), &event, "TCK-001").await;

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            let ticket = ticket.clone();
            handles.push(tokio::spawn(async move {
                let actor = Actor::new(Uuid::new_v4(), Role::Staff);
                check_in(store.as_ref(), &ticket, &actor, Utc::now()).await
            }));
        }

        let mut accepted = 0;
        let mut duplicates = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(AppError::Scan(ScanRejection::AlreadyCheckedIn { .. })) => duplicates += 1,
                Err(other) => panic!("unexpected outcome: {other:?}"),
            }
        }
        assert_eq!(accepted, 1);
        assert_eq!(duplicates, 15);
    }
}
