use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A car registered under a neighbor.
///
/// Plates are not unique: the same plate can legitimately appear under
/// more than one neighbor (shared family cars, re-registrations).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: i64,
    pub neighbor_id: i64,
    pub license_plate: String,
    pub make: String,
    pub model: String,
    pub control_number: String,
    pub created_at: DateTime<Utc>,
}
