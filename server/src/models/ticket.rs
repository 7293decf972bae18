use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::UnknownVariant;

/// Longest ticket number we will ever look up. Issued numbers are far shorter.
pub const MAX_TICKET_NUMBER_LEN: usize = 128;

const TICKET_NUMBER_PREFIX: &str = "TCK-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Active,
    Cancelled,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Active => "active",
            TicketStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(TicketStatus::Active),
            "cancelled" => Ok(TicketStatus::Cancelled),
            _ => Err(UnknownVariant::new("ticket status", s)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInStatus {
    pub is_checked_in: bool,
    pub check_in_time: Option<DateTime<Utc>>,
    pub scanned_by: Option<Uuid>,
}

/// Position of a ticket in the check-in state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketState {
    Issued,
    CheckedIn,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: Uuid,
    pub ticket_number: String,
    pub event_id: Uuid,
    pub attendee_id: Uuid,
    pub status: TicketStatus,
    pub check_in_status: CheckInStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    pub fn issue(ticket_number: String, event_id: Uuid, attendee_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            ticket_number,
            event_id,
            attendee_id,
            status: TicketStatus::Active,
            check_in_status: CheckInStatus::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn state(&self) -> TicketState {
        match (self.status, self.check_in_status.is_checked_in) {
            (TicketStatus::Cancelled, _) => TicketState::Cancelled,
            (TicketStatus::Active, true) => TicketState::CheckedIn,
            (TicketStatus::Active, false) => TicketState::Issued,
        }
    }
}

/// Opaque, unguessable ticket number printed into the QR code.
pub fn generate_ticket_number() -> String {
    let raw = Uuid::new_v4().simple().to_string();
    format!("{}{}", TICKET_NUMBER_PREFIX, raw[..12].to_ascii_uppercase())
}
