//! Telemetry gateway: zone readings from a Prometheus-compatible backend.
//!
//! ```text
//!  read_zones ──▶ TelemetryGateway::fetch(query)
//!                     │  GET <base>/api/v1/query?query=<percent-encoded>
//!                     ▼
//!                 HttpTransport ──▶ HttpReply { status, body }
//!                     │
//!                     ▼
//!                 parse_query_response ──▶ f32 | TelemetryError
//! ```
//!
//! Response handling:
//!
//! | Backend answer                              | Result              |
//! |---------------------------------------------|---------------------|
//! | transport error / timeout                   | `TransportFailure`  |
//! | non-2xx status                              | `BackendError`      |
//! | body is not JSON / `status != "success"`    | `BackendError`      |
//! | success, empty result / no finite sample    | `NoData`            |
//! | success, one or more samples                | latest timestamp    |

use heapless::Vec as HVec;
use log::debug;
use serde::Deserialize;

use crate::app::ports::{HttpTransport, TelemetrySource};
use crate::error::TelemetryError;
use crate::thresholds::{ThresholdTable, Zone, ZoneReadings};

/// Selector used to probe backend reachability at startup.
pub const PROBE_QUERY: &str = "up";

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

/// `[<unix seconds>, "<value>"]`
type RawSample = (f64, String);

#[derive(Debug, Deserialize)]
struct QueryResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(default)]
    result: Option<QueryResult>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum QueryResult {
    /// `vector` / `matrix`: one entry per series.
    Series(Vec<Series>),
    /// `scalar` / `string`: a bare sample.
    Scalar(RawSample),
}

#[derive(Debug, Deserialize)]
struct Series {
    #[serde(default)]
    value: Option<RawSample>,
    #[serde(default)]
    values: Vec<RawSample>,
}

// Values outside f32 range parse to infinity and are dropped here.
fn finite_sample((ts, raw): &RawSample) -> Option<(f64, f32)> {
    let v: f32 = raw.trim().parse().ok()?;
    (v.is_finite() && ts.is_finite()).then_some((*ts, v))
}

/// Parse a `/api/v1/query` body into the most recent numeric reading.
pub fn parse_query_response(body: &[u8]) -> Result<f32, TelemetryError> {
    let resp: QueryResponse =
        serde_json::from_slice(body).map_err(|_| TelemetryError::BackendError)?;

    if resp.status != "success" {
        debug!(
            "telemetry: backend status={} error={}",
            resp.status,
            resp.error.as_deref().unwrap_or("-")
        );
        return Err(TelemetryError::BackendError);
    }

    let latest = match resp.data.and_then(|d| d.result) {
        None => None,
        Some(QueryResult::Scalar(s)) => finite_sample(&s),
        Some(QueryResult::Series(series)) => series
            .iter()
            .flat_map(|s| s.value.iter().chain(s.values.iter()))
            .filter_map(finite_sample)
            .fold(None, |best: Option<(f64, f32)>, cur| match best {
                Some(b) if b.0 >= cur.0 => Some(b),
                _ => Some(cur),
            }),
    };
    latest.map(|(_, v)| v).ok_or(TelemetryError::NoData)
}

// ---------------------------------------------------------------------------
// URL building
// ---------------------------------------------------------------------------

/// Percent-encode everything outside the RFC 3986 unreserved set.
pub fn percent_encode(input: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(input.len() * 3);
    for &b in input.as_bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~') {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(HEX[(b >> 4) as usize] as char);
            out.push(HEX[(b & 0x0F) as usize] as char);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

pub struct TelemetryGateway<T> {
    base_url: String,
    transport: T,
}

impl<T: HttpTransport> TelemetryGateway<T> {
    pub fn new(base_url: &str, transport: T) -> Self {
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            transport,
        }
    }

    pub fn query_url(&self, query: &str) -> String {
        format!("{}/api/v1/query?query={}", self.base_url, percent_encode(query))
    }

    /// One reachability check.  A well-formed answer of any kind,
    /// including an empty result, counts as reachable.
    pub fn probe(&mut self) -> Result<(), TelemetryError> {
        match self.fetch(PROBE_QUERY) {
            Ok(_) | Err(TelemetryError::NoData) => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

impl<T: HttpTransport> TelemetrySource for TelemetryGateway<T> {
    fn fetch(&mut self, query: &str) -> Result<f32, TelemetryError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(TelemetryError::QueryInvalid);
        }
        let url = self.query_url(query);
        let reply = self.transport.get(&url)?;
        if !reply.is_success() {
            debug!("telemetry: HTTP {} for {}", reply.status, query);
            return Err(TelemetryError::BackendError);
        }
        parse_query_response(&reply.body)
    }
}

// ---------------------------------------------------------------------------
// Zone sweep
// ---------------------------------------------------------------------------

/// Result of reading every zone once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneSweep {
    pub readings: ZoneReadings,
    /// Zones that failed, in `Zone::ALL` order.
    pub faults: HVec<(Zone, TelemetryError), { Zone::COUNT }>,
}

impl ZoneSweep {
    pub fn fault_for(&self, zone: Zone) -> Option<TelemetryError> {
        self.faults.iter().find(|(z, _)| *z == zone).map(|(_, e)| *e)
    }
}

/// Fetch all four zones.  A failing zone yields `None` and a fault entry;
/// the others are still read.
pub fn read_zones(source: &mut impl TelemetrySource, table: &ThresholdTable) -> ZoneSweep {
    let mut sweep = ZoneSweep::default();
    for zone in Zone::ALL {
        match source.fetch(&table.get(zone).query) {
            Ok(v) => sweep.readings.set(zone, Some(v)),
            Err(e) => {
                sweep.readings.set(zone, None);
                // Capacity equals Zone::COUNT; cannot overflow.
                let _ = sweep.faults.push((zone, e));
            }
        }
    }
    sweep
}
