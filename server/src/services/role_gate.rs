//! Single capability check for event-scoped actions.
//!
//! Handlers ask the gate once per request instead of comparing role strings
//! at each call site.

use crate::models::{Actor, Event, Role};
use crate::utils::{AppError, ScanRejection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Check a ticket in at the door.
    Scan,
    /// Publish, cancel or re-staff the event.
    Manage,
    /// Read check-in statistics and the scan audit log.
    ViewCheckins,
}

impl Role {
    /// Whether an actor holding this role may perform `action` on `event`.
    pub fn permits(&self, actor_id: uuid::Uuid, event: &Event, action: Action) -> bool {
        match (self, action) {
            (Role::Attendee, _) => false,
            (Role::Host, _) => event.is_host(actor_id),
            (Role::Staff, Action::Scan | Action::ViewCheckins) => {
                event.is_host(actor_id) || event.is_assigned_staff(actor_id)
            }
            (Role::Staff, Action::Manage) => false,
        }
    }
}

pub struct RoleGate;

impl RoleGate {
    pub fn permits(actor: &Actor, event: &Event, action: Action) -> bool {
        actor.role.permits(actor.id, event, action)
    }

    pub fn authorize(actor: &Actor, event: &Event, action: Action) -> Result<(), AppError> {
        if Self::permits(actor, event, action) {
            return Ok(());
        }

        tracing::warn!(
            actor_id = %actor.id,
            role = %actor.role,
            event_id = %event.id,
            ?action,
            "Role gate denied action"
        );

        match action {
            Action::Scan => Err(ScanRejection::Unauthorized.into()),
            Action::Manage => Err(AppError::Forbidden(
                "Only the event host can manage this event".to_string(),
            )),
            Action::ViewCheckins => Err(AppError::Forbidden(
                "Only the event host or assigned staff can view check-ins".to_string(),
            )),
        }
    }
}
