//! EnviroZen Firmware: Main Entry Point
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  RelayBank         LogEventSink   NvsAdapter   MonotonicClock  │
//! │  (ActuatorPort)    (EventSink)    (Config+NVS)                 │
//! │  TelemetryGateway  OverrideHandler + EspHttpServer             │
//! │  (TelemetrySource) (operator overrides, status JSON)           │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            ControlService (pure logic)                 │    │
//! │  │  decide() · rule ladder · FaultSupervisor              │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Scheduler (interval + re-evaluation) · Watchdog               │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Imports ───────────────────────────────────────────────────
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, anyhow};
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{AnyOutputPin, Output, PinDriver};
use esp_idf_hal::modem::Modem;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
use log::{debug, info, warn};

use envirozen::adapters::hardware::{RelayBank, SharedActuator};
use envirozen::adapters::http_client::EspHttpTransport;
use envirozen::adapters::http_server::{OverrideHandler, start_server};
use envirozen::adapters::log_sink::{LogEventSink, TeeSink};
use envirozen::adapters::nvs::{CONFIG_KEY, NAMESPACE, NvsAdapter};
use envirozen::adapters::time::MonotonicClock;
use envirozen::app::events::StatusBoard;
use envirozen::app::mode_flag::ModeFlag;
use envirozen::app::ports::{ActuatorPort, ConfigPort, OperationModeSource, StoragePort};
use envirozen::app::service::ControlService;
use envirozen::drivers::watchdog::Watchdog;
use envirozen::error::Error;
use envirozen::pins;
use envirozen::scheduler::{Scheduler, wait_for_backend};
use envirozen::telemetry::TelemetryGateway;
use envirozen::thresholds::Zone;

/// Main loop poll period; ticks themselves run every
/// `evaluation_interval_secs` or on a re-evaluation request.
const LOOP_PERIOD_MS: u32 = 250;
/// How long each relay is held during the boot self-test.
const SELF_TEST_DWELL_MS: u32 = 500;

const WIFI_SSID: Option<&str> = option_env!("ENVIROZEN_WIFI_SSID");
const WIFI_PASS: Option<&str> = option_env!("ENVIROZEN_WIFI_PASS");

type RelayPin = PinDriver<'static, AnyOutputPin, Output>;

fn relay_pin(gpio: i32) -> Result<RelayPin> {
    // SAFETY: each relay GPIO is claimed exactly once, here, and no other
    // driver is constructed on these pins.
    let pin = unsafe { AnyOutputPin::new(gpio) };
    PinDriver::output(pin).with_context(|| format!("relay GPIO{}", gpio))
}

/// Minimal station bring-up so the backend is reachable.
fn connect_wifi(modem: Modem, sysloop: EspSystemEventLoop) -> Result<Option<BlockingWifi<EspWifi<'static>>>> {
    let (Some(ssid), Some(pass)) = (WIFI_SSID, WIFI_PASS) else {
        warn!("WiFi: no credentials compiled in, skipping station connect");
        return Ok(None);
    };

    let mut wifi = BlockingWifi::wrap(EspWifi::new(modem, sysloop.clone(), None)?, sysloop)?;
    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: ssid.try_into().map_err(|_| anyhow!("SSID too long"))?,
        password: pass.try_into().map_err(|_| anyhow!("WiFi password too long"))?,
        auth_method: if pass.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        },
        ..Default::default()
    }))?;
    wifi.start()?;
    wifi.connect()?;
    wifi.wait_netif_up()?;
    info!("WiFi: connected to '{}'", ssid);
    Ok(Some(wifi))
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  EnviroZen v{}                       ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let nvs = NvsAdapter::new()
        .map_err(Error::from)
        .context("NVS init")?;
    let config = nvs
        .load()
        .map_err(Error::from)
        .context("loading configuration")?;
    if !nvs.exists(NAMESPACE, CONFIG_KEY) {
        // First boot: store the defaults so the site can edit them in place.
        if let Err(e) = nvs.save(&config) {
            warn!("Default config not persisted: {}", e);
        }
    }
    info!(
        "Config: backend={} interval={}s min_ac_run={}s",
        config.backend_base(),
        config.evaluation_interval_secs,
        config.min_ac_run_time_secs
    );

    // ── 3. Relays ─────────────────────────────────────────────
    let mut bank = RelayBank::new(
        relay_pin(pins::DAMPER_GPIO)?,
        relay_pin(pins::FAN1_GPIO)?,
        relay_pin(pins::FAN2_GPIO)?,
        relay_pin(pins::AC_GPIO)?,
    );
    if config.relay_self_test {
        bank.self_test(&mut FreeRtos, SELF_TEST_DWELL_MS)
            .map_err(Error::from)
            .context("relay self-test")?;
    }
    let mut actuator = SharedActuator::new(bank);

    // ── 4. Operation-mode flag ────────────────────────────────
    let flag = ModeFlag::new();
    flag.restore(&nvs);
    if let Some(mode) = flag.forced_mode() {
        info!("Re-applying persisted override: {}", mode);
        match actuator.apply(mode) {
            Ok(()) => flag.note_applied(mode),
            Err(e) => warn!("Persisted override not applied: {}", e),
        }
    }

    // ── 5. Network + backend ──────────────────────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let _wifi = connect_wifi(peripherals.modem, sysloop)?;

    let mut gateway = TelemetryGateway::new(
        config.backend_base(),
        EspHttpTransport::new(config.http_timeout_ms),
    );
    wait_for_backend(
        || gateway.probe(),
        config.startup_probe_attempts,
        |secs| FreeRtos::delay_ms(secs * 1000),
    )
    .map_err(Error::from)
    .context("metrics backend unreachable")?;

    // ── 6. Override server ────────────────────────────────────
    let status = StatusBoard::new(config.zones.clone());
    let handler = OverrideHandler::new(flag.clone(), actuator.clone(), nvs.clone(), status.clone())
        .with_events(Box::new(LogEventSink::new()));
    let _server = start_server(config.override_port, Arc::new(Mutex::new(handler)))
        .context("starting override server")?;

    // ── 7. Control service ────────────────────────────────────
    let mut sink = TeeSink(LogEventSink::new(), status);
    let mut scheduler = Scheduler::new(config.evaluation_interval_secs);
    let watchdog = Watchdog::new(Watchdog::timeout_for(
        config.http_timeout_ms,
        Zone::COUNT as u32,
    ));
    let clock = MonotonicClock::new();
    let mut service = ControlService::new(config);
    service.start(&flag, &mut sink);

    info!("System ready. Entering control loop.");

    // ── 8. Control loop ───────────────────────────────────────
    loop {
        let now = clock.uptime_secs();
        if let Some(reason) = scheduler.poll(now, flag.take_reevaluation()) {
            debug!("tick {} ({:?})", service.tick_count() + 1, reason);
            service.tick(&mut gateway, &mut actuator, &flag, &mut sink, now);
        }

        // Feed watchdog on every iteration.
        watchdog.feed();
        FreeRtos::delay_ms(LOOP_PERIOD_MS);
    }
}
