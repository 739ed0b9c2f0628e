//! Inbound commands from the override surface.
//!
//! The HTTP layer maps a request path to an [`OverrideCommand`]; the
//! [`OverrideHandler`](crate::adapters::http_server::OverrideHandler)
//! interprets it.  Only the path matters: methods and bodies are ignored.

use crate::engine::modes::CoolingMode;

/// Commands an operator can send into the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideCommand {
    /// Hold a fixed cooling mode (manual, or emergency for `/emergency`).
    Force(CoolingMode),

    /// Hand control back to the decision engine and re-evaluate now.
    Resume,

    /// Report readings, thresholds, mode and actuator state.
    Status,
}

/// Every path the override surface answers.
pub const ROUTES: [&str; 8] = [
    "/",
    "/status",
    "/ac",
    "/freecooling",
    "/freecooling_turbo",
    "/passive",
    "/emergency",
    "/auto",
];

impl OverrideCommand {
    /// Resolve a request target.  The query string and one trailing slash
    /// are ignored; unknown paths yield `None` (404).
    pub fn from_route(target: &str) -> Option<Self> {
        let path = target.split(['?', '#']).next().unwrap_or_default();
        let path = match path.strip_suffix('/') {
            Some(trimmed) if trimmed.len() > 1 => trimmed,
            _ => path,
        };
        match path {
            "/" | "/status" => Some(Self::Status),
            "/auto" => Some(Self::Resume),
            p => CoolingMode::from_route(p).map(Self::Force),
        }
    }
}
