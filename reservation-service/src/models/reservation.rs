//! Reservation model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Reservation lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Cancelled,
    Finished,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Finished => "finished",
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Reservation {
    pub id: i32,
    pub client_id: i32,
    pub room_id: i32,
    pub start_date: NaiveDate,
    /// None while the stay is ongoing.
    pub end_date: Option<NaiveDate>,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateReservation {
    pub client_id: i32,
    pub room_id: i32,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: Option<ReservationStatus>,
}

/// Partial update. An absent `end_date` leaves the stored value unchanged;
/// closing out an open-ended stay is done by setting it.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateReservation {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<ReservationStatus>,
}
