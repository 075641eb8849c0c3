pub mod booking;
pub mod charger;
pub mod stats;
pub mod user;

pub use booking::{Booking, BookingStatus, BookingWithCharger, NewBooking, PaymentStatus};
pub use charger::{Charger, NewCharger};
pub use stats::DashboardStats;
pub use user::{NewUser, Role, User};
