use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDateTime;

use rusqlite::{Connection, TransactionBehavior};

use super::{queries, StoreError};
use crate::models::{
    Booking, BookingWithCharger, Charger, DashboardStats, NewBooking, NewCharger, NewUser, Role,
    User,
};

/// Operations available inside a single atomic unit of work.
///
/// Everything done through a `Tx` commits together when the closure passed
/// to [`Store::transaction`] returns `Ok`, and is discarded otherwise.
pub trait Tx {
    fn charger(&mut self, id: i64) -> Result<Option<Charger>, StoreError>;

    /// Conditional decrement: succeeds only for an active charger with a free slot.
    fn take_slot(&mut self, charger_id: i64) -> Result<bool, StoreError>;

    /// Conditional increment bounded by the charger's total slots.
    fn release_slot(&mut self, charger_id: i64) -> Result<bool, StoreError>;

    fn insert_booking(&mut self, booking: &NewBooking) -> Result<Booking, StoreError>;

    fn booking(&mut self, id: i64) -> Result<Option<Booking>, StoreError>;

    /// ACTIVE → CANCELLED; false when the booking was not ACTIVE.
    fn cancel_booking(&mut self, id: i64) -> Result<bool, StoreError>;

    /// PENDING → PAID; false when the booking was already paid.
    fn mark_paid(&mut self, id: i64, amount: f64) -> Result<bool, StoreError>;
}

/// Data access for users, chargers, bookings and sessions.
pub trait Store: Send + Sync {
    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn Tx) -> Result<T, E>,
        E: From<StoreError>;

    fn create_user(&self, user: &NewUser) -> Result<User, StoreError>;
    fn user_by_id(&self, id: i64) -> Result<Option<User>, StoreError>;
    fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    fn set_user_role(&self, email: &str, role: Role) -> Result<bool, StoreError>;

    fn create_charger(&self, charger: &NewCharger) -> Result<Charger, StoreError>;
    fn charger_by_id(&self, id: i64) -> Result<Option<Charger>, StoreError>;
    fn list_chargers(&self) -> Result<Vec<Charger>, StoreError>;

    fn booking_by_id(&self, id: i64) -> Result<Option<Booking>, StoreError>;
    fn bookings_with_charger(&self, user_id: i64) -> Result<Vec<BookingWithCharger>, StoreError>;
    fn dashboard_stats(&self) -> Result<DashboardStats, StoreError>;

    fn create_session(
        &self,
        id: &str,
        user_id: i64,
        expires_at: NaiveDateTime,
    ) -> Result<(), StoreError>;
    /// The session's user, unless the session is unknown or expired at `now`.
    fn session_user(&self, id: &str, now: NaiveDateTime) -> Result<Option<i64>, StoreError>;
    fn delete_session(&self, id: &str) -> Result<bool, StoreError>;
    fn prune_sessions(&self, now: NaiveDateTime) -> Result<usize, StoreError>;
}

/// SQLite-backed store sharing one connection behind a mutex.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

struct SqliteTx<'a> {
    conn: &'a Connection,
}

impl Tx for SqliteTx<'_> {
    fn charger(&mut self, id: i64) -> Result<Option<Charger>, StoreError> {
        queries::get_charger(self.conn, id)
    }

    fn take_slot(&mut self, charger_id: i64) -> Result<bool, StoreError> {
        queries::take_slot(self.conn, charger_id)
    }

    fn release_slot(&mut self, charger_id: i64) -> Result<bool, StoreError> {
        queries::release_slot(self.conn, charger_id)
    }

    fn insert_booking(&mut self, booking: &NewBooking) -> Result<Booking, StoreError> {
        queries::insert_booking(self.conn, booking)
    }

    fn booking(&mut self, id: i64) -> Result<Option<Booking>, StoreError> {
        queries::get_booking(self.conn, id)
    }

    fn cancel_booking(&mut self, id: i64) -> Result<bool, StoreError> {
        queries::cancel_booking(self.conn, id)
    }

    fn mark_paid(&mut self, id: i64, amount: f64) -> Result<bool, StoreError> {
        queries::mark_booking_paid(self.conn, id, amount)
    }
}

impl Store for SqliteStore {
    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn Tx) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut conn = self.conn()?;
        // IMMEDIATE takes the write lock before the first read, so the slot
        // check and the slot update see the same row state.
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;

        let out = work(&mut SqliteTx { conn: &tx })?;

        tx.commit().map_err(StoreError::from)?;
        Ok(out)
    }

    fn create_user(&self, user: &NewUser) -> Result<User, StoreError> {
        let conn = self.conn()?;
        queries::insert_user(&conn, user)
    }

    fn user_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let conn = self.conn()?;
        queries::get_user(&conn, id)
    }

    fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let conn = self.conn()?;
        queries::get_user_by_email(&conn, email)
    }

    fn set_user_role(&self, email: &str, role: Role) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        queries::set_user_role(&conn, email, role)
    }

    fn create_charger(&self, charger: &NewCharger) -> Result<Charger, StoreError> {
        let conn = self.conn()?;
        queries::insert_charger(&conn, charger)
    }

    fn charger_by_id(&self, id: i64) -> Result<Option<Charger>, StoreError> {
        let conn = self.conn()?;
        queries::get_charger(&conn, id)
    }

    fn list_chargers(&self) -> Result<Vec<Charger>, StoreError> {
        let conn = self.conn()?;
        queries::list_chargers(&conn)
    }

    fn booking_by_id(&self, id: i64) -> Result<Option<Booking>, StoreError> {
        let conn = self.conn()?;
        queries::get_booking(&conn, id)
    }

    fn bookings_with_charger(&self, user_id: i64) -> Result<Vec<BookingWithCharger>, StoreError> {
        let conn = self.conn()?;
        queries::get_bookings_with_charger(&conn, user_id)
    }

    fn dashboard_stats(&self) -> Result<DashboardStats, StoreError> {
        let conn = self.conn()?;
        queries::get_dashboard_stats(&conn)
    }

    fn create_session(
        &self,
        id: &str,
        user_id: i64,
        expires_at: NaiveDateTime,
    ) -> Result<(), StoreError> {
        let conn = self.conn()?;
        queries::insert_session(&conn, id, user_id, &expires_at)
    }

    fn session_user(&self, id: &str, now: NaiveDateTime) -> Result<Option<i64>, StoreError> {
        let conn = self.conn()?;
        queries::get_session_user(&conn, id, &now)
    }

    fn delete_session(&self, id: &str) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        queries::delete_session(&conn, id)
    }

    fn prune_sessions(&self, now: NaiveDateTime) -> Result<usize, StoreError> {
        let conn = self.conn()?;
        queries::delete_expired_sessions(&conn, &now)
    }
}
