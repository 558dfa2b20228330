//! `monitor` subcommand — run the daemon (button toggles blocking, LED shows it).

use std::fmt;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};

use super::{Result, state_label};
use holeswitch_lib::HoleswitchError;
use holeswitch_lib::config::{PinConfig, PollConfig};
use holeswitch_lib::event_loop::LoopEvent;
use holeswitch_lib::reconcile::Transition;

/// One human-readable line per transition.
fn describe(t: &Transition) -> String {
    let led = if t.state().is_enabled() { "on" } else { "off" };
    match *t {
        Transition::Initial(s) => format!("  {:<8} (initial)  -> LED {led}", state_label(s)),
        Transition::Toggled {
            requested,
            observed,
            ..
        } if t.is_ineffective_toggle() => format!(
            "  {:<8} (button, {} had no effect) -> LED {led}",
            state_label(observed),
            state_label(requested)
        ),
        Transition::Toggled { observed, .. } => {
            format!("  {:<8} (button)   -> LED {led}", state_label(observed))
        }
        Transition::External { to, .. } => {
            format!("  {:<8} (external) -> LED {led}", state_label(to))
        }
    }
}

fn report(t: &Transition) {
    println!("{}", describe(t));
}

type EventChannel = (Sender<LoopEvent>, Receiver<LoopEvent>);

/// Create the loop's event channel and hand a sender to `install`, which
/// registers the shutdown signal handler. Failing to install is fatal: without
/// the handler a signal would skip LED cleanup.
fn shutdown_channel<E: fmt::Display>(
    install: impl FnOnce(Sender<LoopEvent>) -> std::result::Result<(), E>,
) -> Result<EventChannel> {
    let (tx, rx) = mpsc::channel();
    install(tx.clone()).map_err(|e| HoleswitchError::Signal(e.to_string()))?;
    Ok((tx, rx))
}

fn install_ctrlc(shutdown: Sender<LoopEvent>) -> std::result::Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        let _ = shutdown.send(LoopEvent::Shutdown);
    })
}

/// Claim the pins, run the loop until a signal arrives, then tear down.
///
/// The signal handler is in place before any pin is touched; a signal that
/// arrives during startup is queued and handled as soon as the loop runs.
#[cfg(target_os = "linux")]
fn run_on_gpio(pins: &PinConfig, poll: &PollConfig, events: EventChannel) -> Result<()> {
    use holeswitch_lib::event_loop::ReconciliationLoop;
    use holeswitch_lib::gpio;
    use holeswitch_lib::service::PiholeCli;

    let (led, button) = gpio::open_pins(pins, poll.debounce)?;
    println!("[gpio]   LED GPIO {}, button GPIO {}", pins.led, pins.button);

    let (mut lp, initial) = ReconciliationLoop::start_with_events(
        PiholeCli::new(),
        led,
        button,
        poll.interval,
        events,
    )?;

    println!();
    println!("Monitoring... (Ctrl+C to stop)");
    report(&initial);

    lp.run(report);

    println!();
    println!("Turning LED off...");
    lp.shutdown();
    println!("Done.");
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn run_on_gpio(_pins: &PinConfig, _poll: &PollConfig, _events: EventChannel) -> Result<()> {
    Err(holeswitch_lib::gpio::GpioError::Unsupported.into())
}

pub(super) fn cmd_monitor(config_path: Option<&Path>) -> Result<()> {
    let config = super::load_config(config_path).validated()?;
    let pins = config.pin_config();
    let poll = config.poll_config();

    // Banner
    println!("holeswitch — Pi-hole blocking on a button, blocking state on an LED.");
    println!(
        "  Poll every {} ms, debounce {} ms",
        config.poll_interval_ms, config.debounce_ms
    );
    println!("Press Ctrl+C to exit (turns the LED off).");
    println!();

    let events = shutdown_channel(install_ctrlc)?;
    run_on_gpio(&pins, &poll, events)
}
