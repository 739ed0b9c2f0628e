//! Integration tests for the override surface against a live control loop.
//!
//! The handler and the service share the same `ModeFlag`, relay bank and
//! NVS store, exactly as `main` wires them; the backend is the simulated
//! HTTP transport behind a real `TelemetryGateway`.

use super::mock_hw::RecordingSink;

use envirozen::adapters::hardware::{RelayBank, SharedActuator, SimOutputPin};
use envirozen::adapters::http_client::SimHttpTransport;
use envirozen::adapters::http_server::OverrideHandler;
use envirozen::adapters::log_sink::TeeSink;
use envirozen::adapters::nvs::NvsAdapter;
use envirozen::app::events::StatusBoard;
use envirozen::app::mode_flag::ModeFlag;
use envirozen::app::ports::{ActuatorPort, OperationModeSource, TelemetrySource};
use envirozen::app::service::{ControlService, TickOutcome};
use envirozen::config::SystemConfig;
use envirozen::engine::DecisionReason;
use envirozen::engine::modes::{CoolingMode, OperationMode};
use envirozen::error::TelemetryError;
use envirozen::scheduler::{Scheduler, TickReason};
use envirozen::telemetry::TelemetryGateway;
use envirozen::thresholds::{ThresholdTable, Zone};

type Bank = SharedActuator<RelayBank<SimOutputPin>>;

struct Site {
    svc: ControlService,
    gateway: TelemetryGateway<SimHttpTransport>,
    bank: Bank,
    flag: ModeFlag,
    nvs: NvsAdapter,
    status: StatusBoard,
    handler: OverrideHandler<Bank, NvsAdapter>,
    sink: TeeSink<RecordingSink, StatusBoard>,
    /// damper, fan1, fan2, ac
    pins: [SimOutputPin; 4],
}

impl Site {
    fn new() -> Self {
        let config = SystemConfig::default();
        let pins: [SimOutputPin; 4] = Default::default();
        let bank = SharedActuator::new(RelayBank::new(
            pins[0].clone(),
            pins[1].clone(),
            pins[2].clone(),
            pins[3].clone(),
        ));
        let flag = ModeFlag::new();
        let nvs = NvsAdapter::new().unwrap();
        let status = StatusBoard::new(config.zones.clone());
        let handler =
            OverrideHandler::new(flag.clone(), bank.clone(), nvs.clone(), status.clone());
        let gateway = TelemetryGateway::new(config.backend_base(), SimHttpTransport::new());
        let sink = TeeSink(RecordingSink::new(), status.clone());
        Self {
            svc: ControlService::new(config),
            gateway,
            bank,
            flag,
            nvs,
            status,
            handler,
            sink,
            pins,
        }
    }

    fn readings(&mut self, ambient: f32, hot: f32, cold: f32) {
        let table = ThresholdTable::default();
        let sim = self.gateway.transport_mut();
        sim.set_reading(&table.ambient.query, ambient);
        sim.set_reading(&table.hot.query, hot);
        sim.set_reading(&table.cold.query, cold);
        sim.set_reading(&table.floor.query, 24.0);
    }

    fn tick(&mut self, now: u64) -> TickOutcome {
        self.svc
            .tick(&mut self.gateway, &mut self.bank, &self.flag, &mut self.sink, now)
    }
}

#[test]
fn ac_relay_is_active_low() {
    let mut site = Site::new();
    site.readings(20.0, 32.0, 15.0);
    site.tick(0);
    let [damper, fan1, fan2, ac] = &site.pins;
    assert!(!ac.is_high(), "AC on drives the pin low");
    assert!(!damper.is_high() && !fan1.is_high() && !fan2.is_high());

    site.readings(20.0, 22.0, 19.0);
    site.tick(400);
    let [damper, fan1, fan2, ac] = &site.pins;
    assert!(ac.is_high(), "AC off drives the pin high");
    assert!(damper.is_high() && fan1.is_high() && fan2.is_high());
}

#[test]
fn override_holds_outputs_against_the_engine() {
    let mut site = Site::new();
    site.readings(20.0, 32.0, 15.0);
    site.tick(0);
    assert_eq!(site.bank.signals(), Some(CoolingMode::AcOn.signals()));

    assert_eq!(site.handler.handle("/passive").status, 200);
    assert_eq!(site.bank.signals(), Some(CoolingMode::PassiveCooling.signals()));

    let fetched = site.gateway.transport_mut().requests().len();
    assert_eq!(site.tick(10), TickOutcome::Overridden(OperationMode::Manual));
    assert_eq!(site.bank.signals(), Some(CoolingMode::PassiveCooling.signals()));
    assert_eq!(site.gateway.transport_mut().requests().len(), fetched);
}

#[test]
fn auto_triggers_immediate_reevaluation() {
    let mut site = Site::new();
    let mut scheduler = Scheduler::new(site.svc.config().evaluation_interval_secs);
    site.readings(20.0, 32.0, 15.0);

    assert_eq!(scheduler.poll(0, site.flag.take_reevaluation()), Some(TickReason::First));
    site.tick(0);
    site.handler.handle("/freecooling");
    assert_eq!(scheduler.poll(1, site.flag.take_reevaluation()), None);
    site.tick(1);

    site.handler.handle("/auto");
    assert_eq!(
        scheduler.poll(2, site.flag.take_reevaluation()),
        Some(TickReason::Reevaluate)
    );
    assert!(matches!(site.tick(2), TickOutcome::Applied { mode: CoolingMode::AcOn, .. }));
    assert_eq!(site.bank.signals(), Some(CoolingMode::AcOn.signals()));
}

#[test]
fn emergency_override_survives_restart() {
    let mut site = Site::new();
    site.handler.handle("/emergency");
    assert_eq!(site.flag.current(), OperationMode::Emergency);

    // Reboot: a fresh flag restored from the same NVS.
    let restored = ModeFlag::new();
    assert_eq!(restored.restore(&site.nvs), OperationMode::Emergency);
    assert_eq!(restored.forced_mode(), Some(CoolingMode::Emergency));

    site.handler.handle("/auto");
    let restored = ModeFlag::new();
    assert_eq!(restored.restore(&site.nvs), OperationMode::Automatic);
    assert_eq!(restored.forced_mode(), None);
}

#[test]
fn status_reports_latest_tick() {
    let mut site = Site::new();
    site.readings(21.0, 29.5, 18.5);
    site.tick(42);

    let resp = site.handler.handle("/status");
    assert_eq!(resp.status, 200);
    let v: serde_json::Value = serde_json::from_str(&resp.body).unwrap();
    assert_eq!(v["telemetry"]["mode"], "free_cooling_turbo");
    assert_eq!(v["telemetry"]["readings"]["hot"], 29.5);
    assert_eq!(v["telemetry"]["readings"]["floor"], 24.0);
    assert_eq!(v["telemetry"]["uptime_secs"], 42);
    assert_eq!(v["telemetry"]["actuators"]["ac"], false);
    assert_eq!(v["thresholds"]["cold"]["thresholds"]["minimum"], 10.0);
    assert_eq!(site.status.latest().map(|t| t.mode), Some(CoolingMode::FreeCoolingTurbo));
}

#[test]
fn backend_outage_leaves_relays_untouched() {
    let mut site = Site::new();
    site.readings(20.0, 25.0, 15.0);
    site.tick(0);
    let writes: u32 = site.pins.iter().map(SimOutputPin::writes).sum();

    site.gateway.transport_mut().set_offline(true);
    assert_eq!(site.tick(10), TickOutcome::TelemetryFault(Zone::Ambient));
    let after: u32 = site.pins.iter().map(SimOutputPin::writes).sum();
    assert_eq!(writes, after);
    assert_eq!(site.bank.signals(), Some(CoolingMode::FreeCooling.signals()));
}

/// Backend whose cold-aisle read is slow enough for an operator request
/// to land halfway through the sweep.
struct SlowSweep<'a> {
    gateway: &'a mut TelemetryGateway<SimHttpTransport>,
    handler: &'a mut OverrideHandler<Bank, NvsAdapter>,
    route: &'static str,
    fired: bool,
}

impl TelemetrySource for SlowSweep<'_> {
    fn fetch(&mut self, query: &str) -> Result<f32, TelemetryError> {
        if !self.fired && query.contains("cold") {
            self.fired = true;
            assert_eq!(self.handler.handle(self.route).status, 200);
        }
        self.gateway.fetch(query)
    }
}

#[test]
fn override_during_sweep_is_not_overwritten() {
    let mut site = Site::new();
    site.readings(20.0, 25.0, 15.0);

    let mut source = SlowSweep {
        gateway: &mut site.gateway,
        handler: &mut site.handler,
        route: "/ac",
        fired: false,
    };
    let out = site
        .svc
        .tick(&mut source, &mut site.bank, &site.flag, &mut site.sink, 0);
    assert!(source.fired);
    assert_eq!(out, TickOutcome::Overridden(OperationMode::Manual));
    assert_eq!(site.bank.signals(), Some(CoolingMode::AcOn.signals()));
    assert!(!site.pins[3].is_high(), "AC relay engaged");
    assert_eq!(site.svc.mode(), CoolingMode::AcOn);
    assert_eq!(site.svc.state().ac_engaged_at, Some(0));

    // Later manual ticks keep the operator's mode and report it.
    assert_eq!(site.tick(10), TickOutcome::Overridden(OperationMode::Manual));
    assert_eq!(site.bank.signals(), Some(CoolingMode::AcOn.signals()));
    assert_eq!(site.status.latest().map(|t| t.mode), Some(CoolingMode::AcOn));
}

#[test]
fn forced_ac_then_auto_keeps_minimum_run() {
    let mut site = Site::new();
    site.readings(20.0, 25.0, 15.0);
    assert!(matches!(site.tick(0), TickOutcome::Applied { mode: CoolingMode::FreeCooling, .. }));

    // Both requests land inside one evaluation interval.
    assert_eq!(site.handler.handle("/ac").status, 200);
    assert_eq!(site.handler.handle("/auto").status, 200);

    assert_eq!(
        site.tick(3),
        TickOutcome::Applied {
            mode: CoolingMode::AcOn,
            reason: DecisionReason::DwellLocked {
                wanted: CoolingMode::FreeCooling,
                remaining_secs: 300,
            },
        }
    );
    assert_eq!(site.bank.signals(), Some(CoolingMode::AcOn.signals()));

    assert!(matches!(site.tick(303), TickOutcome::Applied { mode: CoolingMode::FreeCooling, .. }));
    assert_eq!(site.bank.signals(), Some(CoolingMode::FreeCooling.signals()));
}
