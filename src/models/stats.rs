#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardStats {
    pub total_users: i64,
    pub total_chargers: i64,
    pub total_bookings: i64,
    pub total_revenue: f64,
}
