use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub id: i64,
    pub name: String,
    pub price_per_hour: i64,
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Field payload for create and update.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldInput {
    pub name: String,
    pub price_per_hour: i64,
    pub location: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldSummary {
    pub id: i64,
    pub name: String,
    pub price_per_hour: i64,
    pub location: String,
}
