use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::create_cors_layer;
use crate::handlers::{events, health_check, scan, tickets, users};
use crate::store::TicketStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TicketStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn TicketStore>) -> Self {
        Self { store }
    }
}

pub fn create_routes(state: AppState, cors_origins: &[String]) -> Router {
    let api = Router::new()
        .route("/users", post(users::create_profile))
        .route("/events", post(events::create_event))
        .route("/events/:event_id", get(events::get_event))
        .route("/events/:event_id/publish", post(events::publish_event))
        .route("/events/:event_id/cancel", post(events::cancel_event))
        .route("/events/:event_id/staff", put(events::assign_staff))
        .route("/events/:event_id/tickets", post(events::book_tickets))
        .route("/events/:event_id/checkins", get(events::checkin_stats))
        .route("/events/:event_id/scans", get(events::list_scans))
        .route("/tickets/:ticket_number", get(tickets::get_ticket))
        .route("/tickets/:ticket_number/cancel", post(tickets::cancel_ticket))
        .route("/scan", post(scan::scan));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(create_cors_layer(cors_origins))
}
