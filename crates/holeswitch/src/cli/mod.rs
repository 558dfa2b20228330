//! CLI subcommands — daemon, status, blocking control, configuration.

mod config_cmd;
mod control;
mod monitor;
mod status;

use std::path::Path;

use clap::Subcommand;
use serde::Serialize;

pub(super) use holeswitch_lib::config::Config;
pub(super) use holeswitch_lib::error::Result;
pub(super) use holeswitch_lib::service::{
    PiholeCli, ServiceController, ServiceState, StatusProbe,
};

const PADDING: usize = 2;

/// Compute alignment width for a command's key-value output.
/// Ensures at least PADDING spaces after the longest key in either level,
/// with top-level and indent values aligned to the same column.
pub(super) fn kv_width(top: &[&str], indent: &[&str]) -> usize {
    let top_max = top.iter().map(|k| k.len()).max().unwrap_or(0);
    let indent_max = indent.iter().map(|k| k.len()).max().unwrap_or(0);
    let top_need = if top.is_empty() { 0 } else { top_max + PADDING };
    // Indent keys lose 2 chars of inner width to the "  " prefix
    let indent_need = if indent.is_empty() {
        0
    } else {
        indent_max + PADDING + 2
    };
    top_need.max(indent_need)
}

pub(super) fn format_kv(key: &str, value: impl std::fmt::Display, w: usize) -> String {
    format!("{key:<width$}{value}", width = w)
}

pub(super) fn kv(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("{}", format_kv(key, value, w));
}

pub(super) fn kv_indent(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("  {key:<width$}{value}", width = w - 2);
}

/// Upper-case label used in human-readable output.
pub(super) fn state_label(state: ServiceState) -> &'static str {
    match state {
        ServiceState::Enabled => "ENABLED",
        ServiceState::Disabled => "DISABLED",
    }
}

/// Print a serializable value as pretty JSON.
pub(super) fn print_json(value: &impl Serialize) -> Result<()> {
    let json_str = serde_json::to_string_pretty(value).map_err(|e| {
        holeswitch_lib::HoleswitchError::Config(format!("JSON serialization failed: {e}"))
    })?;
    println!("{json_str}");
    Ok(())
}

/// Load the config from `custom_path` if given, else from the default location.
pub(super) fn load_config(custom_path: Option<&Path>) -> Config {
    match custom_path {
        Some(path) => {
            let (config, warnings) = Config::load_from(path);
            for w in &warnings {
                log::warn!("{w}");
            }
            config
        }
        None => Config::load(),
    }
}

// ── JSON output structs ──

#[derive(Serialize)]
pub(super) struct StatusOutput {
    pub version: String,
    /// Probe result after the safe default is applied.
    pub state: ServiceState,
    /// Why the state could not be read, if it couldn't.
    pub error: Option<String>,
    pub config: ConfigSummaryJson,
}

#[derive(Serialize)]
pub(super) struct ConfigSummaryJson {
    pub led_pin: u8,
    pub button_pin: u8,
    pub poll_interval_ms: u64,
    pub debounce_ms: u64,
}

impl From<&Config> for ConfigSummaryJson {
    fn from(c: &Config) -> Self {
        ConfigSummaryJson {
            led_pin: c.led_pin,
            button_pin: c.button_pin,
            poll_interval_ms: c.poll_interval_ms,
            debounce_ms: c.debounce_ms,
        }
    }
}

#[derive(Serialize)]
pub(super) struct ControlOutput {
    /// State before the command (toggle only).
    pub from: Option<ServiceState>,
    pub requested: ServiceState,
    /// State reported by the service after the command.
    pub observed: ServiceState,
    pub command_error: Option<String>,
}

#[derive(Serialize)]
pub(super) struct ConfigOutput {
    pub config_file: Option<String>,
    pub config_file_exists: bool,
    pub settings: Config,
    pub problems: Vec<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the daemon (button toggles blocking, LED shows blocking state)
    Monitor,

    /// Show Pi-hole blocking status
    Status,

    /// Enable Pi-hole blocking
    Enable,

    /// Disable Pi-hole blocking
    Disable,

    /// Toggle Pi-hole blocking, as a button press would
    Toggle,

    /// Show current configuration and file path
    Config,
}

/// Warn if `--json` was passed to a command that doesn't support it.
fn warn_json_unsupported(cmd_name: &str) {
    log::warn!("--json is not supported for `{cmd_name}` (ignored)");
}

pub fn run(cmd: Command, json: bool, config_path: Option<&Path>) -> Result<()> {
    match cmd {
        Command::Monitor => {
            if json {
                warn_json_unsupported("monitor");
            }
            monitor::cmd_monitor(config_path)
        }
        Command::Status => status::cmd_status(json, config_path),
        Command::Enable => control::cmd_control(control::ControlAction::Enable, json),
        Command::Disable => control::cmd_control(control::ControlAction::Disable, json),
        Command::Toggle => control::cmd_control(control::ControlAction::Toggle, json),
        Command::Config => config_cmd::cmd_config(json, config_path),
    }
}


#[cfg(test)]
mod json_output_tests {
    use super::*;

    #[test]
    fn status_output_fields() {
        let output = StatusOutput {
            version: "0.1.0".into(),
            state: ServiceState::Enabled,
            error: None,
            config: ConfigSummaryJson::from(&Config::default()),
        };
        let parsed = serde_json::to_value(&output).unwrap();
        assert_eq!(parsed["state"], "enabled");
        assert!(parsed["error"].is_null());
        assert_eq!(parsed["config"]["led_pin"], 26);
        assert_eq!(parsed["config"]["button_pin"], 27);
    }

    #[test]
    fn control_output_fields() {
        let output = ControlOutput {
            from: Some(ServiceState::Enabled),
            requested: ServiceState::Disabled,
            observed: ServiceState::Enabled,
            command_error: Some("pihole timed out after 10s".into()),
        };
        let parsed = serde_json::to_value(&output).unwrap();
        let obj = parsed.as_object().unwrap();
        assert_eq!(obj.len(), 4);
        assert_eq!(parsed["from"], "enabled");
        assert_eq!(parsed["requested"], "disabled");
        assert_eq!(parsed["observed"], "enabled");
    }

    #[test]
    fn config_output_complete() {
        let output = ConfigOutput {
            config_file: Some("/root/.config/holeswitch/config.toml".into()),
            config_file_exists: false,
            settings: Config::default(),
            problems: vec![],
        };
        let parsed = serde_json::to_value(&output).unwrap();
        assert!(parsed["config_file"].is_string());
        assert_eq!(parsed["config_file_exists"], false);
        assert_eq!(parsed["settings"]["poll_interval_ms"], 1000);
        assert_eq!(parsed["settings"]["debounce_ms"], 300);
        assert!(parsed["problems"].as_array().unwrap().is_empty());
    }
}
