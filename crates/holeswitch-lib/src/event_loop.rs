//! Main loop — serializes button presses and poll ticks on one thread.
//!
//! The button interrupt runs on a backend thread and only pushes
//! [`LoopEvent::Press`] onto a channel. The loop waits on that channel with a
//! timeout equal to the time left until the next poll, so presses, polls and
//! shutdown requests are all handled by the thread that owns the
//! [`Reconciler`]. No lock guards `last_known` or the LED.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use crate::gpio::{self, ButtonWatcher, LedDriver};
use crate::reconcile::{Reconciler, Transition};
use crate::service::{ServiceController, ServiceState, StatusProbe};

/// Messages delivered to the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopEvent {
    /// A debounced button press.
    Press,
    /// Stop the loop (signal handler, tests).
    Shutdown,
}

pub struct ReconciliationLoop<S, L, B>
where
    S: StatusProbe + ServiceController,
    L: LedDriver,
    B: ButtonWatcher,
{
    reconciler: Reconciler<S, L>,
    button: B,
    interval: Duration,
    sender: Sender<LoopEvent>,
    events: Receiver<LoopEvent>,
    released: bool,
}

impl<S, L, B> ReconciliationLoop<S, L, B>
where
    S: StatusProbe + ServiceController,
    L: LedDriver,
    B: ButtonWatcher,
{
    /// Probe once, drive the LED to match, then arm the button.
    ///
    /// If arming fails the LED is switched off before the error is returned.
    pub fn start(
        service: S,
        led: L,
        button: B,
        interval: Duration,
    ) -> gpio::Result<(Self, Transition)> {
        Self::start_with_events(service, led, button, interval, mpsc::channel())
    }

    /// Like [`start`](Self::start), but on a channel created by the caller.
    ///
    /// Lets a signal handler hold a sender before any pin is claimed. Events
    /// queued before the loop exists are handled first.
    pub fn start_with_events(
        service: S,
        led: L,
        button: B,
        interval: Duration,
        (sender, events): (Sender<LoopEvent>, Receiver<LoopEvent>),
    ) -> gpio::Result<(Self, Transition)> {
        let (reconciler, initial) = Reconciler::start(service, led);
        let mut lp = Self {
            reconciler,
            button,
            interval,
            sender,
            events,
            released: false,
        };

        let press = lp.sender.clone();
        lp.button.start(Box::new(move || {
            // Only fails once the loop is gone, when presses no longer matter.
            let _ = press.send(LoopEvent::Press);
        }))?;

        Ok((lp, initial))
    }

    /// A handle for injecting events, typically `Shutdown` from a signal handler.
    pub fn sender(&self) -> Sender<LoopEvent> {
        self.sender.clone()
    }

    /// Run until a `Shutdown` event arrives, reporting every transition.
    pub fn run(&mut self, mut report: impl FnMut(&Transition)) {
        let mut next_poll = Instant::now() + self.interval;
        loop {
            let now = Instant::now();
            if now >= next_poll {
                if let Some(t) = self.poll_tick() {
                    report(&t);
                }
                next_poll = Instant::now() + self.interval;
                continue;
            }
            match self.events.recv_timeout(next_poll - now) {
                Ok(event) => {
                    if !self.handle(event, &mut report) {
                        return;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                // Unreachable while `self.sender` exists
                Err(RecvTimeoutError::Disconnected) => return,
            }
        }
    }

    /// Single-step driver: handle every queued event without waiting.
    ///
    /// For callers that schedule polls themselves instead of using
    /// [`run`](Self::run). Returns `false` if a `Shutdown` was among the
    /// events (events after it stay queued).
    pub fn drain_events(&mut self, mut report: impl FnMut(&Transition)) -> bool {
        while let Ok(event) = self.events.try_recv() {
            if !self.handle(event, &mut report) {
                return false;
            }
        }
        true
    }

    /// Single-step driver: one poll tick. [`run`](Self::run) calls this on
    /// every interval.
    pub fn poll_tick(&mut self) -> Option<Transition> {
        self.reconciler.poll()
    }

    pub fn last_known(&self) -> ServiceState {
        self.reconciler.last_known()
    }

    /// Disarm the button, then switch the LED off. Pins are released on drop.
    pub fn shutdown(mut self) {
        self.release();
    }

    fn handle(&mut self, event: LoopEvent, report: &mut impl FnMut(&Transition)) -> bool {
        match event {
            LoopEvent::Press => {
                let t = self.reconciler.toggle();
                report(&t);
                true
            }
            LoopEvent::Shutdown => false,
        }
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = self.button.stop() {
            log::warn!("could not disarm button: {e}");
        }
        self.reconciler.quiesce();
    }
}

impl<S, L, B> Drop for ReconciliationLoop<S, L, B>
where
    S: StatusProbe + ServiceController,
    L: LedDriver,
    B: ButtonWatcher,
{
    fn drop(&mut self) {
        self.release();
    }
}
