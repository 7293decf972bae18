use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::models::{Event, EventStatus, NewEvent, Pricing, Ticket};
use crate::store::TicketStore;

pub fn draft_input(host_id: Uuid, capacity: i32) -> NewEvent {
    let start = Utc::now() + Duration::hours(1);
    NewEvent {
        host_id,
        title: "Warehouse session".to_string(),
        description: Some("Doors at eight".to_string()),
        location: "Unit 7".to_string(),
        start_time: start,
        end_time: start + Duration::hours(4),
        capacity,
        pricing: Pricing::Free,
    }
}

pub async fn published_event(
    store: &dyn TicketStore,
    host_id: Uuid,
    capacity: i32,
    staff: Vec<Uuid>,
) -> Event {
    let now = Utc::now();
    let event = store
        .create_event(draft_input(host_id, capacity), now)
        .await
        .unwrap();
    store
        .transition_event(event.id, &[EventStatus::Draft], EventStatus::Published, now)
        .await
        .unwrap()
        .unwrap();
    store
        .set_event_staff(event.id, &staff, now)
        .await
        .unwrap()
        .unwrap()
}

/// Issues a single ticket with a fixed number to a fresh attendee.
pub async fn book_one(store: &dyn TicketStore, event: &Event, ticket_number: &str) -> Ticket {
    let ticket = Ticket::issue(ticket_number.to_string(), event.id, Uuid::new_v4(), Utc::now());
    store
        .reserve_and_issue(event.id, vec![ticket], Utc::now())
        .await
        .unwrap()
        .expect("event has room")
        .remove(0)
}
