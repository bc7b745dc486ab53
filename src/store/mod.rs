//! Persistence seam for the board core.

pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod traits;

pub use in_memory::InMemoryBoardStore;
#[cfg(feature = "postgres")]
pub use postgres::PgBoardStore;
pub use traits::{BoardStore, ImportHistoryStore, ItemFilter};
