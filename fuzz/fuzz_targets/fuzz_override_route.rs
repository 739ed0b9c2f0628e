//! Fuzz target: `OverrideCommand::from_route`
//!
//! Any request target must resolve to a known command or `None`, and a
//! resolved `Force` must round-trip through the mode's own route.
//!
//! cargo fuzz run fuzz_override_route

#![no_main]

use envirozen::app::commands::OverrideCommand;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(target) = core::str::from_utf8(data) else {
        return;
    };
    if let Some(OverrideCommand::Force(mode)) = OverrideCommand::from_route(target) {
        assert_eq!(
            OverrideCommand::from_route(mode.route()),
            Some(OverrideCommand::Force(mode))
        );
    }
});
