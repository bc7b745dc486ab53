//! Conformity links between board items and companies / customers.

pub mod differ;
pub mod linker;
pub mod types;

pub use differ::{diff, AssignmentDiff};
pub use linker::ConformityLinker;
pub use types::{ConformityLink, ConformityType};
