//! Room model.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Room availability status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Available,
    Occupied,
    Maintenance,
}

impl RoomStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Occupied => "occupied",
            Self::Maintenance => "maintenance",
        }
    }
}

impl std::fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Room {
    pub id: i32,
    pub number: String,
    pub room_type: String,
    pub price_per_night: Decimal,
    pub status: RoomStatus,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRoom {
    #[validate(length(min = 1, max = 10))]
    pub number: String,
    #[validate(length(min = 1, max = 50))]
    pub room_type: String,
    pub price_per_night: Decimal,
    pub status: Option<RoomStatus>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateRoom {
    #[validate(length(min = 1, max = 50))]
    pub room_type: Option<String>,
    pub price_per_night: Option<Decimal>,
    pub status: Option<RoomStatus>,
}
