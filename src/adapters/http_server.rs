//! Override surface: HTTP request handling for operator overrides.
//!
//! ```text
//!  GET /ac ─▶ OverrideCommand::from_route ─▶ OverrideHandler::handle
//!                                               │ 1. rate limit (429)
//!                                               │ 2. ModeFlag::set + persist
//!                                               │ 3. ActuatorPort::apply
//!                                               ▼
//!                                          HttpResponse
//! ```
//!
//! The handler is plain Rust and runs on the host; only [`start_server`]
//! touches `esp_idf_svc::http::server`.  The flag is written and the
//! relays driven inside one actuator critical section; the control loop
//! re-checks the flag inside that same section before it applies, so
//! whichever side locks second sees the other's result.

use core::time::Duration;

use burster::Limiter;
use log::warn;
use serde::Serialize;

use crate::app::commands::OverrideCommand;
use crate::app::events::{AppEvent, StatusBoard};
use crate::app::mode_flag::ModeFlag;
use crate::app::ports::{ActuatorPort, EventSink, StoragePort};
use crate::engine::modes::{CoolingMode, OperationMode};

/// Override requests allowed back to back.
pub const RATE_LIMIT_BURST: u64 = 5;
/// Tokens restored per second.
pub const RATE_LIMIT_PER_SEC: u64 = 1;

/// A response ready to hand to the HTTP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl HttpResponse {
    fn json(status: u16, body: String) -> Self {
        Self {
            status,
            content_type: "application/json",
            body,
        }
    }

    fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/plain",
            body: body.to_owned(),
        }
    }
}

#[derive(Serialize)]
struct OverrideAck {
    operation_mode: OperationMode,
    mode: Option<CoolingMode>,
}

// ───────────────────────────────────────────────────────────────
// OverrideHandler
// ───────────────────────────────────────────────────────────────

pub struct OverrideHandler<A, S> {
    flag: ModeFlag,
    actuator: A,
    storage: S,
    status: StatusBoard,
    limiter: burster::TokenBucket<fn() -> Duration>,
    events: Option<Box<dyn EventSink + Send>>,
}

impl<A: ActuatorPort, S: StoragePort> OverrideHandler<A, S> {
    pub fn new(flag: ModeFlag, actuator: A, storage: S, status: StatusBoard) -> Self {
        Self::with_time_provider(flag, actuator, storage, status, platform_now)
    }

    /// Same as [`new`](Self::new) with an explicit clock for the limiter.
    pub fn with_time_provider(
        flag: ModeFlag,
        actuator: A,
        storage: S,
        status: StatusBoard,
        now: fn() -> Duration,
    ) -> Self {
        Self {
            flag,
            actuator,
            storage,
            status,
            limiter: burster::TokenBucket::new_with_time_provider(
                RATE_LIMIT_PER_SEC,
                RATE_LIMIT_BURST, // 1 token per second, 5 burst capacity
                now,
            ),
            events: None,
        }
    }

    /// Also report applied overrides to `sink`.
    pub fn with_events(mut self, sink: Box<dyn EventSink + Send>) -> Self {
        self.events = Some(sink);
        self
    }

    /// Serve one request target (path plus optional query).
    pub fn handle(&mut self, target: &str) -> HttpResponse {
        match OverrideCommand::from_route(target) {
            None => HttpResponse::text(404, "not found"),
            Some(OverrideCommand::Status) => match self.status.to_json() {
                Some(json) => HttpResponse::json(200, json),
                None => HttpResponse::text(500, "status unavailable"),
            },
            Some(cmd) => {
                if self.limiter.try_consume(1).is_err() {
                    warn!("override: rate limited ({})", target);
                    return HttpResponse::text(429, "too many requests");
                }
                match cmd {
                    OverrideCommand::Force(mode) => self.force(mode),
                    _ => self.resume(),
                }
            }
        }
    }

    fn force(&mut self, mode: CoolingMode) -> HttpResponse {
        let operation = mode.override_operation();
        let flag = &self.flag;
        let applied = self.actuator.apply_guarded(mode, &mut || {
            flag.set(operation, Some(mode));
            true
        });
        if applied.is_err() {
            // Idempotent; covers a poisoned lock where the gate never ran.
            flag.set(operation, Some(mode));
        }
        self.persist();

        if let Err(e) = applied {
            warn!("override: applying {} failed: {}", mode, e);
            self.emit(&AppEvent::ActuatorFault(e));
            return HttpResponse::text(500, "actuator fault");
        }
        self.flag.note_applied(mode);
        self.acknowledge(operation, Some(mode))
    }

    fn resume(&mut self) -> HttpResponse {
        self.flag.set(OperationMode::Automatic, None);
        self.persist();
        self.flag.request_reevaluation();
        self.acknowledge(OperationMode::Automatic, None)
    }

    fn acknowledge(&mut self, operation: OperationMode, mode: Option<CoolingMode>) -> HttpResponse {
        self.emit(&AppEvent::OverrideApplied { operation, mode });
        match serde_json::to_string(&OverrideAck {
            operation_mode: operation,
            mode,
        }) {
            Ok(body) => HttpResponse::json(200, body),
            Err(_) => HttpResponse::text(200, operation.as_str()),
        }
    }

    // A flag that fails to persist still holds until reboot.
    fn persist(&mut self) {
        if let Err(e) = self.flag.persist(&mut self.storage) {
            warn!("override: operation mode not persisted: {}", e);
        }
    }

    fn emit(&mut self, event: &AppEvent) {
        if let Some(sink) = self.events.as_mut() {
            sink.emit(event);
        }
    }
}

// ── Platform time for rate limiter ───────────────────────────

#[cfg(target_os = "espidf")]
fn platform_now() -> Duration {
    let us = unsafe { esp_idf_svc::sys::esp_timer_get_time() };
    Duration::from_micros(us as u64)
}

#[cfg(not(target_os = "espidf"))]
fn platform_now() -> Duration {
    use std::time::Instant;
    static START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();
    START.get_or_init(Instant::now).elapsed()
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF HTTP server
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub use esp::start_server;

#[cfg(target_os = "espidf")]
mod esp {
    use std::sync::{Arc, Mutex};

    use esp_idf_svc::http::Method;
    use esp_idf_svc::http::server::{Configuration, EspHttpServer};
    use esp_idf_svc::io::Write;
    use esp_idf_svc::sys::EspError;

    use super::{HttpResponse, OverrideHandler};
    use crate::app::commands::ROUTES;
    use crate::app::ports::{ActuatorPort, StoragePort};

    /// Start the override server on `port` and register every route.
    /// The returned server stops when dropped.
    pub fn start_server<A, S>(
        port: u16,
        handler: Arc<Mutex<OverrideHandler<A, S>>>,
    ) -> Result<EspHttpServer<'static>, EspError>
    where
        A: ActuatorPort + Send + 'static,
        S: StoragePort + Send + 'static,
    {
        let mut server = EspHttpServer::new(&Configuration {
            http_port: port,
            ..Default::default()
        })?;

        for route in ROUTES {
            let handler = Arc::clone(&handler);
            server.fn_handler(route, Method::Get, move |req| -> anyhow::Result<()> {
                let reply = match handler.lock() {
                    Ok(mut h) => h.handle(req.uri()),
                    Err(_) => HttpResponse::text(500, "handler unavailable"),
                };
                let mut resp =
                    req.into_response(reply.status, None, &[("Content-Type", reply.content_type)])?;
                resp.write_all(reply.body.as_bytes())?;
                Ok(())
            })?;
        }

        log::info!("Override server listening on port {}", port);
        Ok(server)
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;
    use crate::adapters::hardware::{RelayBank, SharedActuator, SimOutputPin};
    use crate::adapters::nvs::NvsAdapter;
    use crate::app::ports::OperationModeSource;
    use crate::thresholds::ThresholdTable;

    type Handler = OverrideHandler<SharedActuator<RelayBank<SimOutputPin>>, NvsAdapter>;

    fn frozen() -> Duration {
        Duration::from_secs(100)
    }

    fn fixture() -> (Handler, ModeFlag, SharedActuator<RelayBank<SimOutputPin>>, NvsAdapter) {
        let flag = ModeFlag::new();
        let bank = SharedActuator::new(RelayBank::new(
            SimOutputPin::new(),
            SimOutputPin::new(),
            SimOutputPin::new(),
            SimOutputPin::new(),
        ));
        let nvs = NvsAdapter::new().unwrap();
        let handler = OverrideHandler::with_time_provider(
            flag.clone(),
            bank.clone(),
            nvs.clone(),
            StatusBoard::new(ThresholdTable::default()),
            frozen,
        );
        (handler, flag, bank, nvs)
    }

    #[test]
    fn force_sets_flag_then_drives_relays() {
        let (mut h, flag, bank, nvs) = fixture();
        let resp = h.handle("/freecooling_turbo");
        assert_eq!(resp.status, 200);
        assert_eq!(flag.current(), OperationMode::Manual);
        assert_eq!(flag.forced_mode(), Some(CoolingMode::FreeCoolingTurbo));
        assert_eq!(bank.signals(), Some(CoolingMode::FreeCoolingTurbo.signals()));
        assert_eq!(ModeFlag::new().restore(&nvs), OperationMode::Manual);
    }

    #[test]
    fn emergency_route_sets_emergency_operation() {
        let (mut h, flag, bank, _) = fixture();
        let resp = h.handle("/emergency");
        assert_eq!(resp.status, 200);
        assert!(resp.body.contains(r#""operation_mode":"emergency""#));
        assert_eq!(flag.current(), OperationMode::Emergency);
        assert_eq!(bank.signals(), Some(CoolingMode::Emergency.signals()));
    }

    #[test]
    fn auto_resumes_and_requests_reevaluation() {
        let (mut h, flag, _, nvs) = fixture();
        h.handle("/ac");
        assert_eq!(h.handle("/auto").status, 200);
        assert_eq!(flag.current(), OperationMode::Automatic);
        assert_eq!(flag.forced_mode(), None);
        assert!(flag.take_reevaluation());
        assert_eq!(ModeFlag::new().restore(&nvs), OperationMode::Automatic);
    }

    #[test]
    fn status_served_as_json() {
        let (mut h, _, _, _) = fixture();
        for path in ["/", "/status", "/status?fmt=json"] {
            let resp = h.handle(path);
            assert_eq!(resp.status, 200, "{path}");
            assert_eq!(resp.content_type, "application/json");
            assert!(resp.body.contains("thresholds"));
        }
    }

    #[test]
    fn unknown_route_is_404() {
        let (mut h, flag, _, _) = fixture();
        assert_eq!(h.handle("/reboot").status, 404);
        assert_eq!(flag.current(), OperationMode::Automatic);
    }

    #[test]
    fn overrides_are_rate_limited() {
        let (mut h, _, _, _) = fixture();
        let mut accepted = 0;
        let mut limited = 0;
        for _ in 0..20 {
            match h.handle("/passive").status {
                200 => accepted += 1,
                429 => limited += 1,
                other => panic!("unexpected status {other}"),
            }
        }
        assert!(accepted > 0, "fresh handler accepts overrides");
        assert!(limited > 0, "burst must be rejected once the bucket is empty");
        // Status reads are never limited.
        assert_eq!(h.handle("/status").status, 200);
    }

    #[test]
    fn actuator_fault_is_500_but_flag_still_set() {
        let flag = ModeFlag::new();
        let fan1 = SimOutputPin::new();
        fan1.inject_failure(true);
        let bank = SharedActuator::new(RelayBank::new(
            SimOutputPin::new(),
            fan1,
            SimOutputPin::new(),
            SimOutputPin::new(),
        ));
        let mut h = OverrideHandler::with_time_provider(
            flag.clone(),
            bank,
            NvsAdapter::new().unwrap(),
            StatusBoard::new(ThresholdTable::default()),
            frozen,
        );
        assert_eq!(h.handle("/freecooling").status, 500);
        assert_eq!(flag.current(), OperationMode::Manual);
    }
}
