#[derive(Debug, Clone, PartialEq)]
pub struct Charger {
    pub id: i64,
    pub name: String,
    pub location: String,
    pub total_slots: i64,
    pub available_slots: i64,
    pub is_active: bool,
}

impl Charger {
    pub fn has_free_slot(&self) -> bool {
        self.is_active && self.available_slots > 0
    }
}

#[derive(Debug, Clone)]
pub struct NewCharger {
    pub name: String,
    pub location: String,
    pub total_slots: i64,
}
