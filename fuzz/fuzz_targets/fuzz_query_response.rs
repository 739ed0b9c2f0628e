//! Fuzz target: `parse_query_response`
//!
//! Drives arbitrary bytes through the metrics backend response parser and
//! asserts that it never panics and never yields a non-finite reading.
//!
//! cargo fuzz run fuzz_query_response

#![no_main]

use envirozen::error::TelemetryError;
use envirozen::telemetry::parse_query_response;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    match parse_query_response(data) {
        Ok(v) => assert!(v.is_finite(), "parser yielded {v}"),
        Err(TelemetryError::BackendError | TelemetryError::NoData) => {}
        // The parser never sees the transport or the query.
        Err(e) => panic!("unexpected parser error: {e}"),
    }
});
