use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection, ErrorCode};

use super::StoreError;
use crate::models::{
    Booking, BookingStatus, BookingWithCharger, Charger, DashboardStats, NewBooking, NewCharger,
    NewUser, PaymentStatus, Role, User,
};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const BOOKING_COLUMNS: &str =
    "b.id, b.user_id, b.charger_id, b.status, b.payment_status, b.amount, b.created_at";
const CHARGER_COLUMNS: &str =
    "c.id, c.name, c.location, c.total_slots, c.available_slots, c.is_active";

// ── Users ──

pub fn insert_user(conn: &Connection, user: &NewUser) -> Result<User, StoreError> {
    let result = conn.execute(
        "INSERT INTO users (name, email, password_hash, role) VALUES (?1, ?2, ?3, ?4)",
        params![user.name, user.email, user.password_hash, Role::User.as_str()],
    );

    match result {
        Ok(_) => Ok(User {
            id: conn.last_insert_rowid(),
            name: user.name.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            role: Role::User,
        }),
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
            Err(StoreError::DuplicateEmail)
        }
        Err(e) => Err(e.into()),
    }
}

pub fn get_user(conn: &Connection, id: i64) -> Result<Option<User>, StoreError> {
    let result = conn.query_row(
        "SELECT id, name, email, password_hash, role FROM users WHERE id = ?1",
        params![id],
        parse_user_row,
    );

    match result {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>, StoreError> {
    let result = conn.query_row(
        "SELECT id, name, email, password_hash, role FROM users WHERE email = ?1",
        params![email],
        parse_user_row,
    );

    match result {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn set_user_role(conn: &Connection, email: &str, role: Role) -> Result<bool, StoreError> {
    let count = conn.execute(
        "UPDATE users SET role = ?1 WHERE email = ?2",
        params![role.as_str(), email],
    )?;
    Ok(count > 0)
}

fn parse_user_row(row: &rusqlite::Row) -> rusqlite::Result<User> {
    let role: String = row.get(4)?;
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role: Role::parse(&role),
    })
}

// ── Chargers ──

pub fn insert_charger(conn: &Connection, charger: &NewCharger) -> Result<Charger, StoreError> {
    conn.execute(
        "INSERT INTO chargers (name, location, total_slots, available_slots, is_active)
         VALUES (?1, ?2, ?3, ?3, 1)",
        params![charger.name, charger.location, charger.total_slots],
    )?;

    Ok(Charger {
        id: conn.last_insert_rowid(),
        name: charger.name.clone(),
        location: charger.location.clone(),
        total_slots: charger.total_slots,
        available_slots: charger.total_slots,
        is_active: true,
    })
}

pub fn get_charger(conn: &Connection, id: i64) -> Result<Option<Charger>, StoreError> {
    let result = conn.query_row(
        &format!("SELECT {CHARGER_COLUMNS} FROM chargers c WHERE c.id = ?1"),
        params![id],
        |row| parse_charger_row(row, 0),
    );

    match result {
        Ok(charger) => Ok(Some(charger)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_chargers(conn: &Connection) -> Result<Vec<Charger>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CHARGER_COLUMNS} FROM chargers c ORDER BY c.id ASC"
    ))?;
    let rows = stmt.query_map([], |row| parse_charger_row(row, 0))?;

    let mut chargers = vec![];
    for row in rows {
        chargers.push(row?);
    }
    Ok(chargers)
}

/// Takes one slot if the charger is active and has one free.
/// Returns false when no row qualified, leaving the charger untouched.
pub fn take_slot(conn: &Connection, charger_id: i64) -> Result<bool, StoreError> {
    let count = conn.execute(
        "UPDATE chargers SET available_slots = available_slots - 1
         WHERE id = ?1 AND is_active = 1 AND available_slots > 0",
        params![charger_id],
    )?;
    Ok(count > 0)
}

/// Gives one slot back, never above `total_slots`.
pub fn release_slot(conn: &Connection, charger_id: i64) -> Result<bool, StoreError> {
    let count = conn.execute(
        "UPDATE chargers SET available_slots = available_slots + 1
         WHERE id = ?1 AND available_slots < total_slots",
        params![charger_id],
    )?;
    Ok(count > 0)
}

fn parse_charger_row(row: &rusqlite::Row, offset: usize) -> rusqlite::Result<Charger> {
    Ok(Charger {
        id: row.get(offset)?,
        name: row.get(offset + 1)?,
        location: row.get(offset + 2)?,
        total_slots: row.get(offset + 3)?,
        available_slots: row.get(offset + 4)?,
        is_active: row.get::<_, i32>(offset + 5)? != 0,
    })
}

// ── Bookings ──

pub fn insert_booking(conn: &Connection, booking: &NewBooking) -> Result<Booking, StoreError> {
    let created_at = booking.created_at.format(TIMESTAMP_FORMAT).to_string();

    conn.execute(
        "INSERT INTO bookings (user_id, charger_id, status, payment_status, amount, created_at)
         VALUES (?1, ?2, ?3, ?4, 0, ?5)",
        params![
            booking.user_id,
            booking.charger_id,
            BookingStatus::Active.as_str(),
            PaymentStatus::Pending.as_str(),
            created_at,
        ],
    )?;

    Ok(Booking {
        id: conn.last_insert_rowid(),
        user_id: booking.user_id,
        charger_id: booking.charger_id,
        status: BookingStatus::Active,
        payment_status: PaymentStatus::Pending,
        amount: 0.0,
        created_at: booking.created_at,
    })
}

pub fn get_booking(conn: &Connection, id: i64) -> Result<Option<Booking>, StoreError> {
    let result = conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings b WHERE b.id = ?1"),
        params![id],
        |row| parse_booking_row(row, 0),
    );

    match result {
        Ok(booking) => Ok(Some(booking)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// ACTIVE → CANCELLED. Returns false if the booking was not ACTIVE.
pub fn cancel_booking(conn: &Connection, id: i64) -> Result<bool, StoreError> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1 WHERE id = ?2 AND status = ?3",
        params![
            BookingStatus::Cancelled.as_str(),
            id,
            BookingStatus::Active.as_str()
        ],
    )?;
    Ok(count > 0)
}

/// PENDING → PAID with the charged amount. Returns false if already paid.
pub fn mark_booking_paid(conn: &Connection, id: i64, amount: f64) -> Result<bool, StoreError> {
    let count = conn.execute(
        "UPDATE bookings SET payment_status = ?1, amount = ?2 WHERE id = ?3 AND payment_status = ?4",
        params![
            PaymentStatus::Paid.as_str(),
            amount,
            id,
            PaymentStatus::Pending.as_str()
        ],
    )?;
    Ok(count > 0)
}

pub fn get_bookings_with_charger(
    conn: &Connection,
    user_id: i64,
) -> Result<Vec<BookingWithCharger>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS}, {CHARGER_COLUMNS}
         FROM bookings b
         INNER JOIN chargers c ON b.charger_id = c.id
         WHERE b.user_id = ?1
         ORDER BY b.id DESC"
    ))?;

    let rows = stmt.query_map(params![user_id], |row| {
        Ok(BookingWithCharger {
            booking: parse_booking_row(row, 0)?,
            charger: parse_charger_row(row, 7)?,
        })
    })?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row?);
    }
    Ok(bookings)
}

fn parse_booking_row(row: &rusqlite::Row, offset: usize) -> rusqlite::Result<Booking> {
    let status_str: String = row.get(offset + 3)?;
    let payment_str: String = row.get(offset + 4)?;
    let created_at_str: String = row.get(offset + 6)?;

    let created_at = NaiveDateTime::parse_from_str(&created_at_str, TIMESTAMP_FORMAT)
        .unwrap_or_else(|_| Utc::now().naive_utc());

    Ok(Booking {
        id: row.get(offset)?,
        user_id: row.get(offset + 1)?,
        charger_id: row.get(offset + 2)?,
        status: BookingStatus::parse(&status_str),
        payment_status: PaymentStatus::parse(&payment_str),
        amount: row.get(offset + 5)?,
        created_at,
    })
}

// ── Dashboard ──

pub fn get_dashboard_stats(conn: &Connection) -> Result<DashboardStats, StoreError> {
    let total_users: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
    let total_chargers: i64 =
        conn.query_row("SELECT COUNT(*) FROM chargers", [], |row| row.get(0))?;
    let total_bookings: i64 =
        conn.query_row("SELECT COUNT(*) FROM bookings", [], |row| row.get(0))?;
    let total_revenue: f64 = conn.query_row(
        "SELECT COALESCE(SUM(amount), 0.0) FROM bookings WHERE payment_status = ?1",
        params![PaymentStatus::Paid.as_str()],
        |row| row.get(0),
    )?;

    Ok(DashboardStats {
        total_users,
        total_chargers,
        total_bookings,
        total_revenue,
    })
}

// ── Sessions ──

pub fn insert_session(
    conn: &Connection,
    id: &str,
    user_id: i64,
    expires_at: &NaiveDateTime,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO sessions (id, user_id, expires_at) VALUES (?1, ?2, ?3)",
        params![id, user_id, expires_at.format(TIMESTAMP_FORMAT).to_string()],
    )?;
    Ok(())
}

/// Timestamps share one fixed-width format, so text comparison orders them.
pub fn get_session_user(
    conn: &Connection,
    id: &str,
    now: &NaiveDateTime,
) -> Result<Option<i64>, StoreError> {
    let result = conn.query_row(
        "SELECT user_id FROM sessions WHERE id = ?1 AND expires_at > ?2",
        params![id, now.format(TIMESTAMP_FORMAT).to_string()],
        |row| row.get(0),
    );

    match result {
        Ok(user_id) => Ok(Some(user_id)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn delete_session(conn: &Connection, id: &str) -> Result<bool, StoreError> {
    let count = conn.execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

pub fn delete_expired_sessions(
    conn: &Connection,
    now: &NaiveDateTime,
) -> Result<usize, StoreError> {
    let count = conn.execute(
        "DELETE FROM sessions WHERE expires_at <= ?1",
        params![now.format(TIMESTAMP_FORMAT).to_string()],
    )?;
    Ok(count)
}
