//! GPIO access — LED output and button input traits + Raspberry Pi backend.

use std::fmt;
use std::time::Duration;

use crate::button::PressHandler;

// ── Error type ──

/// GPIO errors.
///
/// All of these surface at startup; steady-state LED writes cannot fail.
#[derive(Debug)]
pub enum GpioError {
    /// The GPIO peripheral could not be opened (not a Pi, no permissions).
    Unavailable(String),
    /// A pin could not be claimed (out of range, already in use).
    PinUnavailable { pin: u8, reason: String },
    /// Registering or clearing the button interrupt failed.
    Interrupt(String),
    /// GPIO is not supported on this platform.
    Unsupported,
}

impl fmt::Display for GpioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpioError::Unavailable(e) => write!(f, "GPIO unavailable: {e}"),
            GpioError::PinUnavailable { pin, reason } => {
                write!(f, "GPIO {pin} unavailable: {reason}")
            }
            GpioError::Interrupt(e) => write!(f, "Button interrupt failed: {e}"),
            GpioError::Unsupported => write!(f, "GPIO is not supported on this platform"),
        }
    }
}

impl std::error::Error for GpioError {}

pub type Result<T> = std::result::Result<T, GpioError>;

// ── Traits ──

/// Drives the status LED.
pub trait LedDriver {
    fn set_state(&mut self, on: bool);
}

/// Delivers debounced button presses.
pub trait ButtonWatcher {
    /// Arm the interrupt. `on_press` runs once per accepted press, on a
    /// thread owned by the backend.
    fn start(&mut self, on_press: PressHandler) -> Result<()>;
    /// Disarm the interrupt. No callback runs after this returns.
    fn stop(&mut self) -> Result<()>;
}

// ── Raspberry Pi implementation ──

#[cfg(target_os = "linux")]
mod rpi {
    use super::*;
    use std::time::Instant;

    use rppal::gpio::{Gpio, InputPin, OutputPin, Trigger};

    use crate::button;
    use crate::config::{Edge, PinConfig, Pull};

    pub struct GpioLed {
        pin: OutputPin,
    }

    impl LedDriver for GpioLed {
        fn set_state(&mut self, on: bool) {
            if on {
                self.pin.set_high();
            } else {
                self.pin.set_low();
            }
        }
    }

    pub struct GpioButton {
        pin: InputPin,
        trigger: Trigger,
        debounce: Duration,
    }

    impl ButtonWatcher for GpioButton {
        fn start(&mut self, on_press: PressHandler) -> Result<()> {
            let mut edge = button::debounced(self.debounce, on_press);
            self.pin
                .set_async_interrupt(self.trigger, None, move |_| edge(Instant::now()))
                .map_err(|e| GpioError::Interrupt(format!("set_async_interrupt: {e}")))
        }

        fn stop(&mut self) -> Result<()> {
            self.pin
                .clear_async_interrupt()
                .map_err(|e| GpioError::Interrupt(format!("clear_async_interrupt: {e}")))
        }
    }

    /// Claim the LED and button pins.
    ///
    /// The LED starts low. Both pins revert to their previous mode when dropped.
    pub fn open_pins(pins: &PinConfig, debounce: Duration) -> Result<(GpioLed, GpioButton)> {
        let gpio = Gpio::new().map_err(|e| GpioError::Unavailable(e.to_string()))?;
        let claim = |pin: u8| {
            gpio.get(pin).map_err(|e| GpioError::PinUnavailable {
                pin,
                reason: e.to_string(),
            })
        };

        let led = GpioLed {
            pin: claim(pins.led)?.into_output_low(),
        };

        let input = claim(pins.button)?;
        let input = match pins.pull {
            Pull::Up => input.into_input_pullup(),
            Pull::Down => input.into_input_pulldown(),
            Pull::Off => input.into_input(),
        };
        let trigger = match pins.edge {
            Edge::Falling => Trigger::FallingEdge,
            Edge::Rising => Trigger::RisingEdge,
        };

        Ok((
            led,
            GpioButton {
                pin: input,
                trigger,
                debounce,
            },
        ))
    }
}

#[cfg(target_os = "linux")]
pub use rpi::{GpioButton, GpioLed, open_pins};

// ── Test doubles ──

/// In-memory LED and button for unit and integration tests.
pub mod mock {
    use super::*;
    use std::sync::{Arc, Mutex, MutexGuard};
    use std::time::Instant;

    use crate::button;

    fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
        m.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Records every LED write. Clones share the history.
    #[derive(Debug, Clone, Default)]
    pub struct MockLed {
        writes: Arc<Mutex<Vec<bool>>>,
    }

    impl MockLed {
        pub fn new() -> Self {
            Self::default()
        }

        /// Last written state; `None` if never written.
        pub fn current(&self) -> Option<bool> {
            lock(&self.writes).last().copied()
        }

        pub fn is_on(&self) -> bool {
            self.current().unwrap_or(false)
        }

        pub fn writes(&self) -> Vec<bool> {
            lock(&self.writes).clone()
        }
    }

    impl LedDriver for MockLed {
        fn set_state(&mut self, on: bool) {
            lock(&self.writes).push(on);
        }
    }

    type EdgeFn = Box<dyn FnMut(Instant) + Send>;

    /// Button driven by the test. Edges go through the same debouncer as hardware.
    #[derive(Clone)]
    pub struct MockButton {
        debounce: Duration,
        handler: Arc<Mutex<Option<EdgeFn>>>,
    }

    impl MockButton {
        pub fn new(debounce: Duration) -> Self {
            Self {
                debounce,
                handler: Arc::new(Mutex::new(None)),
            }
        }

        /// Simulate a falling edge now.
        pub fn press(&self) {
            self.press_at(Instant::now());
        }

        /// Simulate a falling edge at a given instant. Ignored while stopped.
        pub fn press_at(&self, at: Instant) {
            if let Some(edge) = lock(&self.handler).as_mut() {
                edge(at);
            }
        }

        pub fn is_armed(&self) -> bool {
            lock(&self.handler).is_some()
        }
    }

    impl ButtonWatcher for MockButton {
        fn start(&mut self, on_press: PressHandler) -> Result<()> {
            *lock(&self.handler) = Some(Box::new(button::debounced(self.debounce, on_press)));
            Ok(())
        }

        fn stop(&mut self) -> Result<()> {
            *lock(&self.handler) = None;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{MockButton, MockLed};
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    #[test]
    fn display_errors() {
        assert_eq!(
            GpioError::PinUnavailable {
                pin: 26,
                reason: "Pin 26 is already in use".into()
            }
            .to_string(),
            "GPIO 26 unavailable: Pin 26 is already in use"
        );
        assert_eq!(
            GpioError::Unavailable("Permission denied".into()).to_string(),
            "GPIO unavailable: Permission denied"
        );
    }

    #[test]
    fn mock_led_records_writes() {
        let led = MockLed::new();
        let mut handle = led.clone();
        assert_eq!(led.current(), None);
        assert!(!led.is_on());
        handle.set_state(true);
        handle.set_state(false);
        assert_eq!(led.writes(), vec![true, false]);
        assert!(!led.is_on());
    }

    #[test]
    fn mock_button_ignores_presses_until_started() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut button = MockButton::new(Duration::from_millis(300));
        button.press();
        assert!(!button.is_armed());

        let c = Arc::clone(&count);
        button
            .start(Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        assert!(button.is_armed());
        button.press();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        button.stop().unwrap();
        button.press_at(Instant::now() + Duration::from_secs(5));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn mock_button_debounces() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut button = MockButton::new(Duration::from_millis(300));
        let c = Arc::clone(&count);
        button
            .start(Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        let t0 = Instant::now();
        button.press_at(t0);
        button.press_at(t0 + Duration::from_millis(20));
        button.press_at(t0 + Duration::from_millis(400));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
