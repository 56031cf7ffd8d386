//! Connection factory for the livestatus Unix socket.

use std::{io, path::Path, time::Duration};

use tokio::{net::UnixStream, time::timeout};
use tracing::debug;

use super::error::{LivestatusError, LivestatusResult};

/// Default bound on connect and data-arrival waits.
pub const MAX_SOCKET_WAIT: Duration = Duration::from_secs(15);

/// Opens a fresh connection to the livestatus socket at `path`.
///
/// The returned stream is owned by the caller and closed when dropped.
///
/// # Errors
///
/// Returns `LivestatusError::Connect` if the path does not exist, is not a
/// socket, refuses the connection, or does not accept it within `wait`.
pub async fn connect(path: &Path, wait: Duration) -> LivestatusResult<UnixStream> {
    match timeout(wait, UnixStream::connect(path)).await {
        Ok(Ok(stream)) => {
            debug!("Connected to livestatus at {}", path.display());
            Ok(stream)
        }
        Ok(Err(source)) => Err(LivestatusError::Connect {
            path: path.display().to_string(),
            source,
        }),
        Err(_) => Err(LivestatusError::Connect {
            path: path.display().to_string(),
            source: io::Error::new(
                io::ErrorKind::TimedOut,
                format!("no connection within {}s", wait.as_secs_f64()),
            ),
        }),
    }
}
