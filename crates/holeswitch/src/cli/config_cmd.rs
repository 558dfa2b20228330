//! `config` subcommand — show current configuration and file path.

use std::path::Path;

use super::{Config, ConfigOutput, Result, kv, kv_indent, kv_width, print_json};

pub(super) fn cmd_config(json: bool, custom_path: Option<&Path>) -> Result<()> {
    let config = super::load_config(custom_path);
    let config_path = custom_path.map(|p| p.to_path_buf()).or_else(Config::path);
    let config_exists = config_path.as_ref().is_some_and(|p| p.exists());
    let problems: Vec<String> = match config.validate() {
        Ok(()) => vec![],
        Err(errors) => errors.iter().map(ToString::to_string).collect(),
    };

    if json {
        let output = ConfigOutput {
            config_file: config_path.as_ref().map(|p| p.display().to_string()),
            config_file_exists: config_exists,
            settings: config,
            problems,
        };
        return print_json(&output);
    }

    // Human-readable output
    let w = kv_width(
        &["Config file:"],
        &["led_pin:", "button_pin:", "poll_interval_ms:", "debounce_ms:"],
    );

    match &config_path {
        Some(p) => {
            if config_exists {
                kv("Config file:", format_args!("{} (loaded)", p.display()), w);
            } else {
                kv(
                    "Config file:",
                    format_args!("{} (not found, using defaults)", p.display()),
                    w,
                );
            }
        }
        None => kv("Config file:", "(no config directory)", w),
    }
    println!();

    println!("Settings:");
    kv_indent("led_pin:", config.led_pin, w);
    kv_indent("button_pin:", config.button_pin, w);
    kv_indent("poll_interval_ms:", config.poll_interval_ms, w);
    kv_indent("debounce_ms:", config.debounce_ms, w);

    if !problems.is_empty() {
        println!();
        println!("Problems:");
        for p in &problems {
            println!("  {p}");
        }
    }
    Ok(())
}
