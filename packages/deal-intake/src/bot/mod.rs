//! Chat front end: turns messages and button presses into review steps.

pub mod callback;
pub mod event;
pub mod handler;
pub mod poll;
pub mod render;
pub mod transport;

pub use callback::Callback;
pub use event::InboundEvent;
pub use handler::{BotLimits, DealBot};
pub use poll::{PollerConfig, UpdatePoller, UpdateSource};
pub use transport::{Button, ChatTransport, Keyboard, MessageRef, TelegramTransport};
