use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::Charger;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: i64,
    pub user_id: i64,
    pub charger_id: i64,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub amount: f64,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum BookingStatus {
    Active,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Active => "ACTIVE",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "CANCELLED" => BookingStatus::Cancelled,
            _ => BookingStatus::Active,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "PAID" => PaymentStatus::Paid,
            _ => PaymentStatus::Pending,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub user_id: i64,
    pub charger_id: i64,
    pub created_at: NaiveDateTime,
}

/// A booking joined with the charger it reserves, as listed on "my bookings".
#[derive(Debug, Clone)]
pub struct BookingWithCharger {
    pub booking: Booking,
    pub charger: Charger,
}
