//! Request/response framing for a single livestatus query.
//!
//! Each query appends the output directives, sends the text, half-closes the
//! write side and then reads the `fixed16` response:
//!
//! ```text
//! <code> <length, right aligned in 11 columns>\n
//! <length bytes of payload>
//! ```
//!
//! A `200` payload is a JSON array of rows; any other code carries the error
//! text as its payload.

use std::time::Duration;

use serde_json::Value;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    time::timeout,
};
use tracing::{debug, trace};

use super::error::{LivestatusError, LivestatusResult};

/// Directives appended to every outgoing query.
const QUERY_SUFFIX: &str = "\nOutputFormat: json\nResponseHeader: fixed16\n";

/// Size of the `fixed16` response header in bytes.
pub const HEADER_LEN: usize = 16;

/// Rows returned by a successful query.
pub type Rows = Vec<Vec<Value>>;

/// Parsed `fixed16` response header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHeader {
    pub code: u16,
    pub length: usize,
}

impl ResponseHeader {
    pub fn parse(raw: &[u8]) -> LivestatusResult<Self> {
        let text = std::str::from_utf8(raw)
            .map_err(|_| LivestatusError::Malformed("header is not valid UTF-8".into()))?;

        let mut fields = text.split_whitespace();
        let (Some(code), Some(length), None) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(LivestatusError::Malformed(format!(
                "unexpected header {:?}",
                text
            )));
        };

        let code = code
            .parse::<u16>()
            .map_err(|_| LivestatusError::Malformed(format!("invalid status code {:?}", code)))?;
        let length = length
            .parse::<usize>()
            .map_err(|_| LivestatusError::Malformed(format!("invalid length {:?}", length)))?;

        Ok(ResponseHeader { code, length })
    }

    pub fn is_success(&self) -> bool {
        self.code == 200
    }
}

/// One livestatus exchange over an owned stream.
///
/// `query` consumes the session, so a connection can never carry a second
/// query. The stream is dropped, and therefore closed, on every return path.
pub struct Session<S> {
    stream: S,
    wait: Duration,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, wait: Duration) -> Self {
        Self { stream, wait }
    }

    /// Sends `query` and returns the decoded rows.
    ///
    /// Do not include `OutputFormat` or `ResponseHeader` directives, the
    /// session adds them. Example: `"GET services\nColumns: host_name"`.
    ///
    /// # Errors
    ///
    /// * `LivestatusError::Query` if sending fails.
    /// * `LivestatusError::Receive` if reading fails, times out or the peer
    ///   closes the stream before the announced length was read.
    /// * `LivestatusError::Status` for a non-200 response code.
    /// * `LivestatusError::Malformed` for an unparseable header or payload.
    pub async fn query(mut self, query: &str) -> LivestatusResult<Rows> {
        let request = format!("{}{}", query, QUERY_SUFFIX);
        debug!("Sending livestatus query: {:?}", query);
        self.send(request.as_bytes()).await?;

        let header = ResponseHeader::parse(&self.receive(HEADER_LEN).await?)?;
        trace!(
            "Livestatus header: code={} length={}",
            header.code,
            header.length
        );
        let payload = self.receive(header.length).await?;

        if !header.is_success() {
            return Err(LivestatusError::Status {
                code: header.code,
                message: String::from_utf8_lossy(&payload).trim().to_string(),
            });
        }

        serde_json::from_slice(&payload)
            .map_err(|e| LivestatusError::Malformed(format!("invalid JSON payload: {}", e)))
    }

    /// Writes the whole request, then signals end of input by shutting down
    /// the write half.
    async fn send(&mut self, request: &[u8]) -> LivestatusResult<()> {
        let wait = self.wait;
        let stream = &mut self.stream;
        let sending = async move {
            stream.write_all(request).await?;
            stream.shutdown().await
        };

        match timeout(wait, sending).await {
            Ok(result) => result.map_err(|source| LivestatusError::Query { source }),
            Err(_) => Err(LivestatusError::Query {
                source: std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("query not sent within {}s", wait.as_secs_f64()),
                ),
            }),
        }
    }

    /// Reads exactly `count` bytes.
    async fn receive(&mut self, count: usize) -> LivestatusResult<Vec<u8>> {
        let mut buf = vec![0u8; count];
        let mut filled = 0;

        while filled < count {
            let read = match timeout(self.wait, self.stream.read(&mut buf[filled..])).await {
                Ok(Ok(read)) => read,
                Ok(Err(source)) => {
                    return Err(LivestatusError::Receive {
                        reason: source.to_string(),
                        source: Some(source),
                    })
                }
                Err(_) => {
                    return Err(LivestatusError::Receive {
                        reason: format!("no data within {}s", self.wait.as_secs_f64()),
                        source: None,
                    })
                }
            };

            if read == 0 {
                return Err(LivestatusError::Receive {
                    reason: format!("connection closed after {} of {} bytes", filled, count),
                    source: None,
                });
            }
            filled += read;
        }

        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::{io::DuplexStream, task::JoinHandle};

    use super::*;
    use crate::core::livestatus::error::ErrorKind;

    const WAIT: Duration = Duration::from_secs(5);

    fn fixed16(code: &str, length: usize) -> String {
        format!("{} {:>11}\n", code, length)
    }

    /// Plays the livestatus side: reads the request until the client
    /// half-closes, then writes `response` and hangs up.
    fn fake_livestatus(response: Vec<u8>) -> (DuplexStream, JoinHandle<String>) {
        let (client, mut server) = tokio::io::duplex(64 * 1024);
        let handle = tokio::spawn(async move {
            let mut request = Vec::new();
            server.read_to_end(&mut request).await.unwrap();
            server.write_all(&response).await.unwrap();
            String::from_utf8(request).unwrap()
        });
        (client, handle)
    }

    fn sample_rows() -> Value {
        json!([[
            "localhost",
            "Current Load",
            0,
            0.078,
            "load1=0.560;5.000;10.000;0;",
            1,
            "check_load!5.0!4.0!3.0!10.0!6.0!4.0",
            0,
            0.011084,
            0
        ]])
    }

    #[test]
    fn header_parses_code_and_length() {
        let header = ResponseHeader::parse(fixed16("200", 1234).as_bytes()).unwrap();
        assert_eq!(
            header,
            ResponseHeader {
                code: 200,
                length: 1234
            }
        );
        assert!(header.is_success());
    }

    #[test]
    fn header_rejects_garbage() {
        let err = ResponseHeader::parse(b"HTTP/1.1 200 OK\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Response);

        let err = ResponseHeader::parse(b"200 twelve     \n").unwrap_err();
        assert!(matches!(err, LivestatusError::Malformed(_)));
    }

    #[tokio::test]
    async fn query_returns_rows() {
        let payload = sample_rows().to_string();
        let response = format!("{}{}", fixed16("200", payload.len()), payload);
        let (client, server) = fake_livestatus(response.into_bytes());

        let rows = Session::new(client, WAIT).query("blah").await.unwrap();

        assert_eq!(Value::from(rows), sample_rows());
        assert_eq!(
            server.await.unwrap(),
            "blah\nOutputFormat: json\nResponseHeader: fixed16\n"
        );
    }

    #[tokio::test]
    async fn query_when_response_is_empty() {
        let (client, _server) = fake_livestatus(Vec::new());

        let err = Session::new(client, WAIT).query("blah").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Response);
        assert!(matches!(err, LivestatusError::Receive { .. }));
    }

    #[tokio::test]
    async fn query_when_payload_is_truncated() {
        // Announce ten bytes that are never sent.
        let (client, _server) = fake_livestatus(fixed16("400", 10).into_bytes());

        let err = Session::new(client, WAIT).query("blah").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Response);
        assert!(err.to_string().contains("0 of 10 bytes"));
    }

    #[tokio::test]
    async fn query_when_response_code_is_error() {
        let message = "error message\n";
        let response = format!("{}{}", fixed16("400", message.len()), message);
        let (client, _server) = fake_livestatus(response.into_bytes());

        let err = Session::new(client, WAIT).query("blah").await.unwrap_err();

        match err {
            LivestatusError::Status { code, message } => {
                assert_eq!(code, 400);
                assert_eq!(message, "error message");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn query_when_payload_is_not_json() {
        let payload = "not json";
        let response = format!("{}{}", fixed16("200", payload.len()), payload);
        let (client, _server) = fake_livestatus(response.into_bytes());

        let err = Session::new(client, WAIT).query("blah").await.unwrap_err();

        assert!(matches!(err, LivestatusError::Malformed(_)));
    }

    #[tokio::test]
    async fn query_when_send_fails() {
        let (client, server) = tokio::io::duplex(64);
        drop(server);

        let err = Session::new(client, WAIT).query("blah").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Query);
    }

    #[tokio::test]
    async fn query_times_out_when_livestatus_is_silent() {
        let (client, mut server) = tokio::io::duplex(1024);
        let handle = tokio::spawn(async move {
            let mut request = Vec::new();
            server.read_to_end(&mut request).await.unwrap();
            tokio::time::sleep(Duration::from_secs(2)).await;
            drop(server);
        });

        let err = Session::new(client, Duration::from_millis(100))
            .query("GET status")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Response);
        assert!(err.to_string().contains("no data within"));
        handle.abort();
    }
}
