use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An account in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}
