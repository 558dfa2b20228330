//! Reconciliation step — keeps the LED in line with the service's real state.
//!
//! [`Reconciler`] owns the LED and the cached `last_known` state. Every
//! operation re-derives the state from the service at the moment of decision;
//! the cache only decides whether a poll needs to rewrite the LED. Callers must
//! serialize access (the event loop runs everything on one thread).

use crate::gpio::LedDriver;
use crate::service::{ServiceController, ServiceState, StatusProbe};

/// What a reconciliation step observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// State read at startup.
    Initial(ServiceState),
    /// A press was handled. `observed` is what the service reported afterwards,
    /// which differs from `requested` when the command did not take effect.
    Toggled {
        from: ServiceState,
        requested: ServiceState,
        observed: ServiceState,
    },
    /// A poll found that something else changed the service.
    External {
        from: ServiceState,
        to: ServiceState,
    },
}

impl Transition {
    /// The state the LED shows after this step.
    pub fn state(&self) -> ServiceState {
        match *self {
            Transition::Initial(s) => s,
            Transition::Toggled { observed, .. } => observed,
            Transition::External { to, .. } => to,
        }
    }

    /// A toggle whose command did not change the observed state.
    pub fn is_ineffective_toggle(&self) -> bool {
        matches!(*self, Transition::Toggled { requested, observed, .. } if requested != observed)
    }
}

pub struct Reconciler<S, L>
where
    S: StatusProbe + ServiceController,
    L: LedDriver,
{
    service: S,
    led: L,
    last_known: ServiceState,
}

impl<S, L> Reconciler<S, L>
where
    S: StatusProbe + ServiceController,
    L: LedDriver,
{
    /// Probe once and drive the LED to match.
    pub fn start(service: S, led: L) -> (Self, Transition) {
        let state = service.probe();
        let mut r = Self {
            service,
            led,
            last_known: state,
        };
        r.drive(state);
        (r, Transition::Initial(state))
    }

    /// Handle a button press: probe, command the opposite state, probe again.
    ///
    /// The LED and cache follow the second probe, not the requested target.
    pub fn toggle(&mut self) -> Transition {
        let from = self.service.probe();
        let requested = from.toggled();
        self.service.set_enabled(requested.is_enabled());
        let observed = self.service.probe();
        self.drive(observed);
        if observed == requested {
            log::info!("blocking {from} -> {observed}");
        } else {
            log::warn!("requested {requested} but service reports {observed}");
        }
        Transition::Toggled {
            from,
            requested,
            observed,
        }
    }

    /// Periodic check. Returns a transition only if the state changed.
    pub fn poll(&mut self) -> Option<Transition> {
        let state = self.service.probe();
        if state == self.last_known {
            return None;
        }
        let from = self.last_known;
        self.drive(state);
        log::info!("blocking changed externally: {from} -> {state}");
        Some(Transition::External { from, to: state })
    }

    /// Turn the LED off for shutdown. The cache is left as-is.
    pub fn quiesce(&mut self) {
        self.led.set_state(false);
    }

    pub fn last_known(&self) -> ServiceState {
        self.last_known
    }

    fn drive(&mut self, state: ServiceState) {
        self.led.set_state(state.is_enabled());
        self.last_known = state;
    }
}
