use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub id: String,
    pub merchant_id: String,
    pub name: String,
    pub category: String,
    pub price_min: i64,
    pub price_max: i64,
    pub duration_minutes: i32,
    pub is_active: bool,
}
