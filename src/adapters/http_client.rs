//! HTTP client adapter: implements [`HttpTransport`].
//!
//! - **`target_os = "espidf"`**: [`EspHttpTransport`] wraps
//!   `esp_idf_svc::http::client::EspHttpConnection` behind the
//!   `embedded_svc` blocking client, one connection per request.
//! - **`not(target_os = "espidf")`**: [`SimHttpTransport`] answers
//!   from a table of canned Prometheus bodies keyed by query selector,
//!   with failure injection for tests and simulation.

use crate::app::ports::{HttpReply, HttpTransport};
use crate::error::TelemetryError;

/// Response bodies larger than this are treated as a transport failure.
pub const MAX_BODY_BYTES: usize = 16 * 1024;

// ───────────────────────────────────────────────────────────────
// ESP-IDF
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub use esp::EspHttpTransport;

#[cfg(target_os = "espidf")]
mod esp {
    use core::time::Duration;

    use embedded_svc::http::client::Client;
    use esp_idf_svc::http::client::{Configuration, EspHttpConnection};
    use esp_idf_svc::io::Read;
    use log::warn;

    use super::{HttpReply, HttpTransport, MAX_BODY_BYTES, TelemetryError};

    pub struct EspHttpTransport {
        timeout: Duration,
    }

    impl EspHttpTransport {
        pub fn new(timeout_ms: u32) -> Self {
            Self {
                timeout: Duration::from_millis(u64::from(timeout_ms)),
            }
        }
    }

    impl HttpTransport for EspHttpTransport {
        fn get(&mut self, url: &str) -> Result<HttpReply, TelemetryError> {
            let conn = EspHttpConnection::new(&Configuration {
                timeout: Some(self.timeout),
                ..Default::default()
            })
            .map_err(|e| {
                warn!("HTTP: connection setup failed: {:?}", e);
                TelemetryError::TransportFailure
            })?;
            let mut client = Client::wrap(conn);

            let request = client.get(url).map_err(|e| {
                warn!("HTTP: GET {} failed: {:?}", url, e);
                TelemetryError::TransportFailure
            })?;
            let mut response = request.submit().map_err(|e| {
                warn!("HTTP: GET {} failed: {:?}", url, e);
                TelemetryError::TransportFailure
            })?;
            let status = response.status();

            let mut body = Vec::new();
            let mut chunk = [0u8; 512];
            loop {
                let n = response
                    .read(&mut chunk)
                    .map_err(|_| TelemetryError::TransportFailure)?;
                if n == 0 {
                    break;
                }
                if body.len() + n > MAX_BODY_BYTES {
                    warn!("HTTP: response from {} exceeds {} bytes", url, MAX_BODY_BYTES);
                    return Err(TelemetryError::TransportFailure);
                }
                body.extend_from_slice(&chunk[..n]);
            }

            Ok(HttpReply { status, body })
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Host simulation
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
pub use sim::SimHttpTransport;

#[cfg(not(target_os = "espidf"))]
mod sim {
    use std::collections::HashMap;

    use super::{HttpReply, HttpTransport, MAX_BODY_BYTES, TelemetryError};

    /// Canned backend.  Requests are matched by the decoded `query=`
    /// parameter; unmatched queries get an empty success result.
    #[derive(Default)]
    pub struct SimHttpTransport {
        replies: HashMap<String, HttpReply>,
        offline: bool,
        requests: Vec<String>,
    }

    impl SimHttpTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Serve `value` as a single instant-vector sample for `query`.
        pub fn set_reading(&mut self, query: &str, value: f32) {
            let body = format!(
                r#"{{"status":"success","data":{{"resultType":"vector","result":[{{"metric":{{}},"value":[1700000000.0,"{}"]}}]}}}}"#,
                value
            );
            self.set_reply(query, 200, body.into_bytes());
        }

        /// Serve an arbitrary status and body for `query`.
        pub fn set_reply(&mut self, query: &str, status: u16, body: Vec<u8>) {
            self.replies
                .insert(query.to_owned(), HttpReply { status, body });
        }

        pub fn clear(&mut self, query: &str) {
            self.replies.remove(query);
        }

        /// While offline every request fails at the transport.
        pub fn set_offline(&mut self, offline: bool) {
            self.offline = offline;
        }

        /// URLs requested so far, oldest first.
        pub fn requests(&self) -> &[String] {
            &self.requests
        }
    }

    fn decode_query(url: &str) -> Option<String> {
        let encoded = url.split_once("query=")?.1;
        let bytes = encoded.as_bytes();
        let mut out = Vec::with_capacity(bytes.len());
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'%' && i + 2 < bytes.len() {
                let hex = core::str::from_utf8(&bytes[i + 1..=i + 2]).ok()?;
                out.push(u8::from_str_radix(hex, 16).ok()?);
                i += 3;
            } else {
                out.push(bytes[i]);
                i += 1;
            }
        }
        String::from_utf8(out).ok()
    }

    impl HttpTransport for SimHttpTransport {
        fn get(&mut self, url: &str) -> Result<HttpReply, TelemetryError> {
            self.requests.push(url.to_owned());
            if self.offline {
                return Err(TelemetryError::TransportFailure);
            }
            let query = decode_query(url).unwrap_or_default();
            let reply = self.replies.get(&query).cloned().unwrap_or_else(|| HttpReply {
                status: 200,
                body: br#"{"status":"success","data":{"resultType":"vector","result":[]}}"#
                    .to_vec(),
            });
            if reply.body.len() > MAX_BODY_BYTES {
                return Err(TelemetryError::TransportFailure);
            }
            Ok(reply)
        }
    }
}
