use crate::views;

// GET /
pub async fn home() -> &'static str {
    views::LIVENESS
}
