// Entity models - row structs for the three tables
//
// Neighbor is the root entity; vehicles and payments exist only while
// their neighbor does (ON DELETE CASCADE in the schema).

pub mod neighbor;
pub mod payment;
pub mod vehicle;

pub use neighbor::{Neighbor, NeighborSummary};
pub use payment::Payment;
pub use vehicle::Vehicle;
