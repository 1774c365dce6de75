pub mod session;
pub mod store;

pub use session::{SessionError, SessionStatus, TimerSession};
pub use store::{TimerStore, TimerStoreError, START_TIME_KEY};
