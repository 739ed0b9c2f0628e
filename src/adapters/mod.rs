//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements         | Connects to                  |
//! |---------------|--------------------|------------------------------|
//! | `hardware`    | ActuatorPort       | Relay board (GPIO)           |
//! | `http_client` | HttpTransport      | Metrics backend over HTTP    |
//! | `http_server` | -                  | Override routes (HTTP GET)   |
//! | `log_sink`    | EventSink          | Serial log output            |
//! | `nvs`         | ConfigPort         | NVS / in-memory store        |
//! |               | StoragePort        |                              |
//! | `time`        | -                  | ESP32 system timer           |

pub mod hardware;
pub mod http_client;
pub mod http_server;
pub mod log_sink;
pub mod nvs;
pub mod time;
