//! `status` subcommand — show Pi-hole blocking state and the daemon's config.

use std::path::Path;

use super::{
    Config, ConfigSummaryJson, PiholeCli, Result, ServiceState, StatusOutput, StatusProbe, kv,
    kv_indent, kv_width, print_json, state_label,
};

/// Query the service once. Failures are reported alongside the safe default.
fn collect_status(probe: &impl StatusProbe, config: &Config) -> StatusOutput {
    let (state, error) = match probe.query() {
        Ok(state) => (state, None),
        Err(e) => (ServiceState::Disabled, Some(e.to_string())),
    };
    StatusOutput {
        version: env!("CARGO_PKG_VERSION").to_string(),
        state,
        error,
        config: ConfigSummaryJson::from(config),
    }
}

/// Print or serialize the status output.
fn print_status(status: &StatusOutput, json: bool) -> Result<()> {
    if json {
        return print_json(status);
    }

    let w = kv_width(
        &["Version:", "Blocking:"],
        &["Error:", "LED pin:", "Button pin:", "Poll interval:", "Debounce:"],
    );

    kv("Version:", &status.version, w);
    println!();

    match &status.error {
        None => kv("Blocking:", state_label(status.state), w),
        Some(e) => {
            kv("Blocking:", "UNKNOWN (treated as disabled)", w);
            kv_indent("Error:", e, w);
        }
    }
    println!();

    let c = &status.config;
    println!("Config:");
    kv_indent("LED pin:", format_args!("GPIO {}", c.led_pin), w);
    kv_indent("Button pin:", format_args!("GPIO {}", c.button_pin), w);
    kv_indent("Poll interval:", format_args!("{} ms", c.poll_interval_ms), w);
    kv_indent("Debounce:", format_args!("{} ms", c.debounce_ms), w);

    Ok(())
}

pub(super) fn cmd_status(json: bool, config_path: Option<&Path>) -> Result<()> {
    let config = super::load_config(config_path);
    let status = collect_status(&PiholeCli::new(), &config);
    print_status(&status, json)
}
