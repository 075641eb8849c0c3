//! Server-rendered pages. Every page shares one layout carrying the
//! signed-in user's name and any pending flash message.

use std::fmt::Write;

use crate::models::{
    BookingStatus, BookingWithCharger, Charger, DashboardStats, PaymentStatus, User,
};

pub const LIVENESS: &str = "EV Charging App Running";

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn layout(title: &str, user: Option<&User>, flash: Option<&str>, body: &str) -> String {
    let nav = match user {
        Some(u) => {
            let admin = if u.is_admin() {
                r#"<a href="/admin/dashboard">Admin</a> <a href="/admin/add-charger">Add charger</a> "#
            } else {
                ""
            };
            format!(
                r#"<span class="user">Signed in as {}</span> <a href="/dashboard">Dashboard</a> <a href="/chargers">Chargers</a> <a href="/my-bookings">My bookings</a> {admin}<a href="/logout">Log out</a>"#,
                escape(&u.name)
            )
        }
        None => r#"<a href="/login">Log in</a> <a href="/signup">Sign up</a>"#.to_string(),
    };
    let flash = flash
        .map(|m| format!(r#"<p class="flash">{}</p>"#, escape(m)))
        .unwrap_or_default();

    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{title}</title></head>\
         <body><nav>{nav}</nav>{flash}<main><h1>{title}</h1>{body}</main></body></html>",
        title = escape(title),
    )
}

pub fn signup_form() -> String {
    r#"<form method="post" action="/signup">
<label>Name <input name="name" required></label>
<label>Email <input name="email" type="email" required></label>
<label>Password <input name="password" type="password" required></label>
<button type="submit">Create account</button>
</form>"#
        .to_string()
}

pub fn login_form() -> String {
    r#"<form method="post" action="/login">
<label>Email <input name="email" type="email" required></label>
<label>Password <input name="password" type="password" required></label>
<button type="submit">Log in</button>
</form>"#
        .to_string()
}

pub fn dashboard(user: &User) -> String {
    format!(
        r#"<p>Welcome, {}.</p><p><a href="/chargers">Find a charger</a> or <a href="/my-bookings">review your bookings</a>.</p>"#,
        escape(&user.name)
    )
}

pub fn admin_dashboard(stats: &DashboardStats) -> String {
    format!(
        "<dl>\
         <dt>Users</dt><dd id=\"total-users\">{}</dd>\
         <dt>Chargers</dt><dd id=\"total-chargers\">{}</dd>\
         <dt>Bookings</dt><dd id=\"total-bookings\">{}</dd>\
         <dt>Revenue</dt><dd id=\"total-revenue\">{:.2}</dd>\
         </dl>",
        stats.total_users, stats.total_chargers, stats.total_bookings, stats.total_revenue
    )
}

pub fn add_charger_form() -> String {
    r#"<form method="post" action="/admin/add-charger">
<label>Name <input name="name" required></label>
<label>Location <input name="location" required></label>
<label>Total slots <input name="total_slots" type="number" min="1" required></label>
<button type="submit">Add charger</button>
</form>"#
        .to_string()
}

pub fn chargers(chargers: &[Charger]) -> String {
    if chargers.is_empty() {
        return "<p>No chargers yet.</p>".to_string();
    }

    let mut rows = String::new();
    for c in chargers {
        let action = if c.has_free_slot() {
            format!(
                r#"<form method="post" action="/book/{}"><button type="submit">Book</button></form>"#,
                c.id
            )
        } else if !c.is_active {
            "Inactive".to_string()
        } else {
            "Full".to_string()
        };
        let _ = write!(
            rows,
            "<tr><td>{}</td><td>{}</td><td>{}/{}</td><td>{action}</td></tr>",
            escape(&c.name),
            escape(&c.location),
            c.available_slots,
            c.total_slots,
        );
    }

    format!(
        "<table><tr><th>Name</th><th>Location</th><th>Free slots</th><th></th></tr>{rows}</table>"
    )
}

pub fn my_bookings(bookings: &[BookingWithCharger]) -> String {
    if bookings.is_empty() {
        return "<p>You have no bookings.</p>".to_string();
    }

    let mut rows = String::new();
    for entry in bookings {
        let b = &entry.booking;
        let mut actions = String::new();
        if b.status == BookingStatus::Active {
            let _ = write!(
                actions,
                r#"<form method="post" action="/cancel-booking/{}"><button type="submit">Cancel</button></form>"#,
                b.id
            );
        }
        if b.payment_status == PaymentStatus::Pending {
            let _ = write!(
                actions,
                r#"<form method="post" action="/pay/{}"><button type="submit">Pay</button></form>"#,
                b.id
            );
        }
        let _ = write!(
            rows,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{:.2}</td><td>{}</td><td>{actions}</td></tr>",
            escape(&entry.charger.name),
            escape(&entry.charger.location),
            b.status.as_str(),
            b.payment_status.as_str(),
            b.amount,
            b.created_at.format("%Y-%m-%d %H:%M"),
        );
    }

    format!(
        "<table><tr><th>Charger</th><th>Location</th><th>Status</th><th>Payment</th><th>Amount</th><th>Booked</th><th></th></tr>{rows}</table>"
    )
}
