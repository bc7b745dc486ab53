//! Order assignment for items within a stage.

pub mod assigner;
pub mod sequential;

pub use assigner::{OrderAssigner, OrderDecision, OrderSlot};
pub use sequential::SequentialOrder;
