//! Slot accounting for charger bookings.
//!
//! Every mutation that touches `available_slots` runs inside one
//! [`Store::transaction`], so the slot change and the booking change commit
//! together or not at all.

use chrono::Utc;

use crate::db::{Store, StoreError};
use crate::models::{Booking, BookingStatus, Charger, NewBooking, NewCharger, PaymentStatus};

/// Amount charged by [`pay_booking`] when no rate is configured.
pub const DEFAULT_FLAT_RATE: f64 = 200.0;

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Charger inactive")]
    ChargerInactive,

    #[error("No slots available")]
    NoSlotsAvailable,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Unauthorized action")]
    Unauthorized,

    #[error("Booking already cancelled")]
    AlreadyCancelled,

    #[error("Booking already paid")]
    AlreadyPaid,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub fn create_booking<S: Store>(
    store: &S,
    user_id: i64,
    charger_id: i64,
) -> Result<Booking, BookingError> {
    let booking = store.transaction(|tx| -> Result<Booking, BookingError> {
        let charger = tx
            .charger(charger_id)?
            .ok_or(BookingError::NotFound("charger"))?;

        if !charger.is_active {
            return Err(BookingError::ChargerInactive);
        }

        // The conditional update is the real guard; the read above only
        // picks the error to report.
        if !tx.take_slot(charger_id)? {
            return Err(BookingError::NoSlotsAvailable);
        }

        Ok(tx.insert_booking(&NewBooking {
            user_id,
            charger_id,
            created_at: Utc::now().naive_utc(),
        })?)
    })?;

    tracing::info!(booking_id = booking.id, user_id, charger_id, "booking created");
    Ok(booking)
}

pub fn cancel_booking<S: Store>(
    store: &S,
    booking_id: i64,
    user_id: i64,
) -> Result<Booking, BookingError> {
    let booking = store.transaction(|tx| -> Result<Booking, BookingError> {
        let mut booking = tx
            .booking(booking_id)?
            .ok_or(BookingError::NotFound("booking"))?;

        if booking.user_id != user_id {
            return Err(BookingError::Unauthorized);
        }
        if booking.status == BookingStatus::Cancelled || !tx.cancel_booking(booking_id)? {
            return Err(BookingError::AlreadyCancelled);
        }

        if !tx.release_slot(booking.charger_id)? {
            tracing::warn!(
                booking_id,
                charger_id = booking.charger_id,
                "charger already at full capacity, slot not released"
            );
        }

        booking.status = BookingStatus::Cancelled;
        Ok(booking)
    })?;

    tracing::info!(booking_id, user_id, "booking cancelled, slot released");
    Ok(booking)
}

/// Marks a booking paid at the flat rate. Payment is one-way: a booking that
/// is already paid is rejected rather than charged again.
pub fn pay_booking<S: Store>(
    store: &S,
    booking_id: i64,
    user_id: i64,
    flat_rate: f64,
) -> Result<Booking, BookingError> {
    let booking = store.transaction(|tx| -> Result<Booking, BookingError> {
        let mut booking = tx
            .booking(booking_id)?
            .ok_or(BookingError::NotFound("booking"))?;

        if booking.user_id != user_id {
            return Err(BookingError::Unauthorized);
        }
        if booking.payment_status == PaymentStatus::Paid || !tx.mark_paid(booking_id, flat_rate)? {
            return Err(BookingError::AlreadyPaid);
        }

        booking.payment_status = PaymentStatus::Paid;
        booking.amount = flat_rate;
        Ok(booking)
    })?;

    tracing::info!(booking_id, user_id, amount = flat_rate, "booking paid");
    Ok(booking)
}

pub fn add_charger<S: Store>(
    store: &S,
    name: &str,
    location: &str,
    total_slots: i64,
) -> Result<Charger, BookingError> {
    let name = name.trim();
    let location = location.trim();

    if name.is_empty() || location.is_empty() {
        return Err(BookingError::Validation(
            "Name and location are required".to_string(),
        ));
    }
    if total_slots < 1 {
        return Err(BookingError::Validation(
            "Total slots must be a positive whole number".to_string(),
        ));
    }

    let charger = store.create_charger(&NewCharger {
        name: name.to_string(),
        location: location.to_string(),
        total_slots,
    })?;

    tracing::info!(charger_id = charger.id, total_slots, "charger added");
    Ok(charger)
}

/// Parses the raw `total_slots` form field.
pub fn parse_total_slots(raw: &str) -> Result<i64, BookingError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| {
            BookingError::Validation("Total slots must be a positive whole number".to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{self, MemoryStore, SqliteStore};
    use crate::models::NewUser;

    fn make_user<S: Store>(store: &S, email: &str) -> i64 {
        store
            .create_user(&NewUser {
                name: "Driver".to_string(),
                email: email.to_string(),
                password_hash: "x".to_string(),
            })
            .unwrap()
            .id
    }

    fn slots<S: Store>(store: &S, charger_id: i64) -> i64 {
        store
            .charger_by_id(charger_id)
            .unwrap()
            .unwrap()
            .available_slots
    }

    #[test]
    fn test_single_slot_scenario() {
        let store = MemoryStore::new();
        let user = make_user(&store, "a@example.com");
        let charger = add_charger(&store, "Depot", "Main St", 1).unwrap();
        assert_eq!(charger.available_slots, 1);

        let booking = create_booking(&store, user, charger.id).unwrap();
        assert_eq!(booking.status, BookingStatus::Active);
        assert_eq!(booking.payment_status, PaymentStatus::Pending);
        assert_eq!(booking.amount, 0.0);
        assert_eq!(slots(&store, charger.id), 0);

        let err = create_booking(&store, user, charger.id).unwrap_err();
        assert!(matches!(err, BookingError::NoSlotsAvailable));
        assert_eq!(slots(&store, charger.id), 0);
        assert_eq!(store.dashboard_stats().unwrap().total_bookings, 1);

        let cancelled = cancel_booking(&store, booking.id, user).unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(slots(&store, charger.id), 1);
    }

    #[test]
    fn test_double_cancel_rejected() {
        let store = MemoryStore::new();
        let user = make_user(&store, "a@example.com");
        let charger = add_charger(&store, "Depot", "Main St", 2).unwrap();
        let booking = create_booking(&store, user, charger.id).unwrap();

        cancel_booking(&store, booking.id, user).unwrap();
        let err = cancel_booking(&store, booking.id, user).unwrap_err();
        assert!(matches!(err, BookingError::AlreadyCancelled));
        assert_eq!(slots(&store, charger.id), 2);
    }

    #[test]
    fn test_inactive_charger_rejected() {
        let store = MemoryStore::new();
        let user = make_user(&store, "a@example.com");
        let charger = add_charger(&store, "Depot", "Main St", 2).unwrap();
        store.set_charger_active(charger.id, false).unwrap();

        let err = create_booking(&store, user, charger.id).unwrap_err();
        assert!(matches!(err, BookingError::ChargerInactive));
        assert_eq!(slots(&store, charger.id), 2);
    }

    #[test]
    fn test_missing_entities() {
        let store = MemoryStore::new();
        let user = make_user(&store, "a@example.com");

        assert!(matches!(
            create_booking(&store, user, 99),
            Err(BookingError::NotFound("charger"))
        ));
        assert!(matches!(
            cancel_booking(&store, 99, user),
            Err(BookingError::NotFound("booking"))
        ));
        assert!(matches!(
            pay_booking(&store, 99, user, DEFAULT_FLAT_RATE),
            Err(BookingError::NotFound("booking"))
        ));
    }

    #[test]
    fn test_other_user_cannot_cancel_or_pay() {
        let store = MemoryStore::new();
        let owner = make_user(&store, "owner@example.com");
        let intruder = make_user(&store, "intruder@example.com");
        let charger = add_charger(&store, "Depot", "Main St", 1).unwrap();
        let booking = create_booking(&store, owner, charger.id).unwrap();

        assert!(matches!(
            cancel_booking(&store, booking.id, intruder),
            Err(BookingError::Unauthorized)
        ));
        assert!(matches!(
            pay_booking(&store, booking.id, intruder, DEFAULT_FLAT_RATE),
            Err(BookingError::Unauthorized)
        ));

        let unchanged = store.booking_by_id(booking.id).unwrap().unwrap();
        assert_eq!(unchanged, booking);
        assert_eq!(slots(&store, charger.id), 0);
    }

    #[test]
    fn test_payment_is_one_way() {
        let store = MemoryStore::new();
        let user = make_user(&store, "a@example.com");
        let charger = add_charger(&store, "Depot", "Main St", 1).unwrap();
        let booking = create_booking(&store, user, charger.id).unwrap();

        let paid = pay_booking(&store, booking.id, user, DEFAULT_FLAT_RATE).unwrap();
        assert_eq!(paid.payment_status, PaymentStatus::Paid);
        assert_eq!(paid.amount, 200.0);
        assert_eq!(store.dashboard_stats().unwrap().total_revenue, 200.0);

        let err = pay_booking(&store, booking.id, user, DEFAULT_FLAT_RATE).unwrap_err();
        assert!(matches!(err, BookingError::AlreadyPaid));
        assert_eq!(store.dashboard_stats().unwrap().total_revenue, 200.0);
    }

    #[test]
    fn test_add_charger_validation() {
        let store = MemoryStore::new();
        assert!(matches!(
            add_charger(&store, "Depot", "Main St", 0),
            Err(BookingError::Validation(_))
        ));
        assert!(matches!(
            add_charger(&store, " ", "Main St", 3),
            Err(BookingError::Validation(_))
        ));
        assert_eq!(store.dashboard_stats().unwrap().total_chargers, 0);
    }

    #[test]
    fn test_parse_total_slots() {
        assert_eq!(parse_total_slots(" 4 ").unwrap(), 4);
        assert!(parse_total_slots("0").is_err());
        assert!(parse_total_slots("-2").is_err());
        assert!(parse_total_slots("two").is_err());
        assert!(parse_total_slots("").is_err());
    }

    #[test]
    fn test_failed_insert_rolls_back_slot() {
        let store = SqliteStore::new(db::init_db(":memory:").unwrap());
        let charger = add_charger(&store, "Depot", "Main St", 1).unwrap();

        // No such user: the insert violates the foreign key after the slot
        // was taken, and the whole transaction must roll back.
        assert!(create_booking(&store, 404, charger.id).is_err());
        assert_eq!(slots(&store, charger.id), 1);
    }

    #[test]
    fn test_sqlite_scenario_matches_memory() {
        let store = SqliteStore::new(db::init_db(":memory:").unwrap());
        let user = make_user(&store, "a@example.com");
        let charger = add_charger(&store, "Depot", "Main St", 1).unwrap();

        let booking = create_booking(&store, user, charger.id).unwrap();
        assert!(matches!(
            create_booking(&store, user, charger.id),
            Err(BookingError::NoSlotsAvailable)
        ));
        cancel_booking(&store, booking.id, user).unwrap();
        assert!(matches!(
            cancel_booking(&store, booking.id, user),
            Err(BookingError::AlreadyCancelled)
        ));
        assert_eq!(slots(&store, charger.id), 1);

        pay_booking(&store, booking.id, user, DEFAULT_FLAT_RATE).unwrap();
        assert_eq!(store.dashboard_stats().unwrap().total_revenue, 200.0);
    }
}
