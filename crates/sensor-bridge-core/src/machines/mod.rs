//! Pure per-sensor state machines.
//!
//! Each machine is a small `(state, event) -> (state, ops)` function with no
//! I/O of its own; the stack routes the ops and the driver executes them.
//! Parent machines start and reset their children through `Start*`/`Reset*`
//! ops so a failure anywhere tears down everything below it.

pub mod connection;
pub mod plugin;
pub mod reporting;
pub mod service;
pub mod session;
pub mod standby;

pub use connection::{Connection, ConnectionState};
pub use plugin::{Plugin, PluginState};
pub use reporting::{Reporting, ReportingState};
pub use service::{Service, ServiceOp, ServiceState};
pub use session::{Session, SessionState, SESSION_ID_INVALID, SESSION_ID_UNKNOWN};
pub use standby::{Standby, StandbyState};
