use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A resident registered in the parking program.
///
/// Root entity: owns zero or more vehicles and payments, which are
/// removed by cascade when the neighbor is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Neighbor {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
}

impl Neighbor {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Neighbor plus aggregated counts, for the dashboard and portal search.
#[derive(Debug, Clone, Serialize)]
pub struct NeighborSummary {
    pub neighbor: Neighbor,
    pub vehicle_count: i64,
    pub payment_count: i64,
}
