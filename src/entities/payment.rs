use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A recorded cash or deposit payment for a neighbor.
///
/// `receipt_file` is the stored filename of the uploaded proof, if any;
/// the physical file lives in the upload directory and is removed when
/// the payment (or its neighbor) is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub neighbor_id: i64,
    pub method: String,
    pub amount: f64,
    pub deposit_account: Option<String>,
    pub receipt_file: Option<String>,
    pub created_at: DateTime<Utc>,
}
