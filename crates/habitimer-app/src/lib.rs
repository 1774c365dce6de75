//! Habitimer application layer
//!
//! Timer state persistence, history records and the event bus views use
//! to refresh when records change.

pub mod app;
pub mod config;
pub mod event_bus;
pub mod events;
pub mod history;
pub mod routes;
pub mod timer;

pub use app::App;
pub use config::ConfigManager;
pub use event_bus::{listener, EventBus, Listener, Subscription};
pub use events::{EventKind, RecordEvent};
pub use history::RecordManager;
pub use routes::View;
pub use timer::{SessionStatus, TimerSession, TimerStore};
