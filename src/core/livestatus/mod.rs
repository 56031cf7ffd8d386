//! Client for the Nagios livestatus socket.
//!
//! Only the two tables the exporter needs are modelled: `status` (global
//! daemon counters) and `services` (one row per service check).

pub mod connection;
pub mod error;
pub mod session;
pub mod types;

pub use connection::{connect, MAX_SOCKET_WAIT};
pub use error::{ErrorKind, LivestatusError, LivestatusResult};
pub use session::{ResponseHeader, Rows, Session};
pub use types::{ServiceRecord, StatusSnapshot, SERVICE_COLUMNS};
