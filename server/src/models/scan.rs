use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{Role, UnknownVariant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanOutcome {
    Accepted,
    RejectedAlreadyUsed,
    RejectedWrongEvent,
    RejectedNotFound,
    RejectedCancelled,
    RejectedUnauthorized,
    RejectedEventNotOpen,
}

impl ScanOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanOutcome::Accepted => "accepted",
            ScanOutcome::RejectedAlreadyUsed => "rejected_already_used",
            ScanOutcome::RejectedWrongEvent => "rejected_wrong_event",
            ScanOutcome::RejectedNotFound => "rejected_not_found",
            ScanOutcome::RejectedCancelled => "rejected_cancelled",
            ScanOutcome::RejectedUnauthorized => "rejected_unauthorized",
            ScanOutcome::RejectedEventNotOpen => "rejected_event_not_open",
        }
    }
}

impl fmt::Display for ScanOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanOutcome {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accepted" => Ok(ScanOutcome::Accepted),
            "rejected_already_used" => Ok(ScanOutcome::RejectedAlreadyUsed),
            "rejected_wrong_event" => Ok(ScanOutcome::RejectedWrongEvent),
            "rejected_not_found" => Ok(ScanOutcome::RejectedNotFound),
            "rejected_cancelled" => Ok(ScanOutcome::RejectedCancelled),
            "rejected_unauthorized" => Ok(ScanOutcome::RejectedUnauthorized),
            "rejected_event_not_open" => Ok(ScanOutcome::RejectedEventNotOpen),
            _ => Err(UnknownVariant::new("scan outcome", s)),
        }
    }
}

/// One entry of the append-only scan audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRecord {
    pub id: Uuid,
    pub event_id: Uuid,
    pub ticket_number: String,
    pub ticket_id: Option<Uuid>,
    pub actor_id: Uuid,
    pub actor_role: Role,
    pub outcome: ScanOutcome,
    pub scanned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TicketCounts {
    pub checked_in: i64,
    pub not_checked_in: i64,
    pub cancelled: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInStats {
    pub event_id: Uuid,
    pub capacity: i32,
    pub tickets_sold: i32,
    #[serde(flatten)]
    pub tickets: TicketCounts,
    pub scan_outcomes: BTreeMap<ScanOutcome, i64>,
}
