pub mod window;

pub use window::{ConversationTurn, ConversationWindow, Role, WindowConfig};
