// Status lifecycle for board items: active <-> archived.

pub mod events;
pub mod item_state_machine;
pub mod states;

pub use events::ItemEvent;
pub use item_state_machine::{ItemStateMachine, StatusTransition};
pub use states::ItemStatus;
