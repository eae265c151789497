//! Event dispatch and update loop supervision.

mod dispatcher;
mod supervisor;

pub use dispatcher::Dispatcher;
pub use supervisor::{Supervisor, SupervisorError, SupervisorMessage, restart_delay};
