use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDateTime;

use super::{StoreError, Tx};
use crate::db::Store;
use crate::models::{
    Booking, BookingStatus, BookingWithCharger, Charger, DashboardStats, NewBooking, NewCharger,
    NewUser, PaymentStatus, Role, User,
};

/// In-memory store used to exercise the booking engine without SQLite.
///
/// Transactions run against a copy of the data that replaces the live copy
/// only when the unit of work succeeds.
#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<MemoryData>,
}

#[derive(Default, Clone)]
struct MemoryData {
    users: Vec<User>,
    chargers: Vec<Charger>,
    bookings: Vec<Booking>,
    /// session id → (user id, expires at)
    sessions: HashMap<String, (i64, NaiveDateTime)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips a charger's active flag. Chargers are never deactivated through
    /// the web surface.
    #[cfg(test)]
    pub fn set_charger_active(&self, id: i64, active: bool) -> Result<bool, StoreError> {
        let mut data = self.data()?;
        match data.chargers.iter_mut().find(|c| c.id == id) {
            Some(charger) => {
                charger.is_active = active;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn data(&self) -> Result<MutexGuard<'_, MemoryData>, StoreError> {
        self.data.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

impl MemoryData {
    fn charger_mut(&mut self, id: i64) -> Option<&mut Charger> {
        self.chargers.iter_mut().find(|c| c.id == id)
    }

    fn booking_mut(&mut self, id: i64) -> Option<&mut Booking> {
        self.bookings.iter_mut().find(|b| b.id == id)
    }
}

fn next_id(ids: impl Iterator<Item = i64>) -> i64 {
    ids.max().unwrap_or(0) + 1
}

struct MemoryTx<'a> {
    data: &'a mut MemoryData,
}

impl Tx for MemoryTx<'_> {
    fn charger(&mut self, id: i64) -> Result<Option<Charger>, StoreError> {
        Ok(self.data.chargers.iter().find(|c| c.id == id).cloned())
    }

    fn take_slot(&mut self, charger_id: i64) -> Result<bool, StoreError> {
        match self.data.charger_mut(charger_id) {
            Some(c) if c.is_active && c.available_slots > 0 => {
                c.available_slots -= 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn release_slot(&mut self, charger_id: i64) -> Result<bool, StoreError> {
        match self.data.charger_mut(charger_id) {
            Some(c) if c.available_slots < c.total_slots => {
                c.available_slots += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn insert_booking(&mut self, booking: &NewBooking) -> Result<Booking, StoreError> {
        if !self.data.users.iter().any(|u| u.id == booking.user_id) {
            return Err(StoreError::NotFound("user"));
        }
        if !self.data.chargers.iter().any(|c| c.id == booking.charger_id) {
            return Err(StoreError::NotFound("charger"));
        }

        let created = Booking {
            id: next_id(self.data.bookings.iter().map(|b| b.id)),
            user_id: booking.user_id,
            charger_id: booking.charger_id,
            status: BookingStatus::Active,
            payment_status: PaymentStatus::Pending,
            amount: 0.0,
            created_at: booking.created_at,
        };
        self.data.bookings.push(created.clone());
        Ok(created)
    }

    fn booking(&mut self, id: i64) -> Result<Option<Booking>, StoreError> {
        Ok(self.data.bookings.iter().find(|b| b.id == id).cloned())
    }

    fn cancel_booking(&mut self, id: i64) -> Result<bool, StoreError> {
        match self.data.booking_mut(id) {
            Some(b) if b.status == BookingStatus::Active => {
                b.status = BookingStatus::Cancelled;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn mark_paid(&mut self, id: i64, amount: f64) -> Result<bool, StoreError> {
        match self.data.booking_mut(id) {
            Some(b) if b.payment_status == PaymentStatus::Pending => {
                b.payment_status = PaymentStatus::Paid;
                b.amount = amount;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

impl Store for MemoryStore {
    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn Tx) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut data = self.data()?;
        let mut scratch = data.clone();
        let out = work(&mut MemoryTx { data: &mut scratch })?;
        *data = scratch;
        Ok(out)
    }

    fn create_user(&self, user: &NewUser) -> Result<User, StoreError> {
        let mut data = self.data()?;
        if data.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        let created = User {
            id: next_id(data.users.iter().map(|u| u.id)),
            name: user.name.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            role: Role::User,
        };
        data.users.push(created.clone());
        Ok(created)
    }

    fn user_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.data()?.users.iter().find(|u| u.id == id).cloned())
    }

    fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.data()?.users.iter().find(|u| u.email == email).cloned())
    }

    fn set_user_role(&self, email: &str, role: Role) -> Result<bool, StoreError> {
        let mut data = self.data()?;
        match data.users.iter_mut().find(|u| u.email == email) {
            Some(user) => {
                user.role = role;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn create_charger(&self, charger: &NewCharger) -> Result<Charger, StoreError> {
        let mut data = self.data()?;
        let created = Charger {
            id: next_id(data.chargers.iter().map(|c| c.id)),
            name: charger.name.clone(),
            location: charger.location.clone(),
            total_slots: charger.total_slots,
            available_slots: charger.total_slots,
            is_active: true,
        };
        data.chargers.push(created.clone());
        Ok(created)
    }

    fn charger_by_id(&self, id: i64) -> Result<Option<Charger>, StoreError> {
        Ok(self.data()?.chargers.iter().find(|c| c.id == id).cloned())
    }

    fn list_chargers(&self) -> Result<Vec<Charger>, StoreError> {
        Ok(self.data()?.chargers.clone())
    }

    fn booking_by_id(&self, id: i64) -> Result<Option<Booking>, StoreError> {
        Ok(self.data()?.bookings.iter().find(|b| b.id == id).cloned())
    }

    fn bookings_with_charger(&self, user_id: i64) -> Result<Vec<BookingWithCharger>, StoreError> {
        let data = self.data()?;
        let mut joined: Vec<BookingWithCharger> = data
            .bookings
            .iter()
            .filter(|b| b.user_id == user_id)
            .filter_map(|b| {
                data.chargers
                    .iter()
                    .find(|c| c.id == b.charger_id)
                    .map(|c| BookingWithCharger {
                        booking: b.clone(),
                        charger: c.clone(),
                    })
            })
            .collect();
        joined.sort_by(|a, b| b.booking.id.cmp(&a.booking.id));
        Ok(joined)
    }

    fn dashboard_stats(&self) -> Result<DashboardStats, StoreError> {
        let data = self.data()?;
        Ok(DashboardStats {
            total_users: data.users.len() as i64,
            total_chargers: data.chargers.len() as i64,
            total_bookings: data.bookings.len() as i64,
            total_revenue: data
                .bookings
                .iter()
                .filter(|b| b.payment_status == PaymentStatus::Paid)
                .map(|b| b.amount)
                .sum(),
        })
    }

    fn create_session(
        &self,
        id: &str,
        user_id: i64,
        expires_at: NaiveDateTime,
    ) -> Result<(), StoreError> {
        self.data()?
            .sessions
            .insert(id.to_string(), (user_id, expires_at));
        Ok(())
    }

    fn session_user(&self, id: &str, now: NaiveDateTime) -> Result<Option<i64>, StoreError> {
        Ok(self
            .data()?
            .sessions
            .get(id)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(user_id, _)| *user_id))
    }

    fn delete_session(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.data()?.sessions.remove(id).is_some())
    }

    fn prune_sessions(&self, now: NaiveDateTime) -> Result<usize, StoreError> {
        let mut data = self.data()?;
        let before = data.sessions.len();
        data.sessions.retain(|_, (_, expires_at)| *expires_at > now);
        Ok(before - data.sessions.len())
    }
}
