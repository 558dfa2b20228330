//! `enable` / `disable` / `toggle` subcommands — change Pi-hole blocking.
//!
//! The command's own exit status is not trusted; the reported state always
//! comes from a status query made afterwards.

use super::{
    ControlOutput, PiholeCli, Result, ServiceController, ServiceState, StatusProbe, print_json,
    state_label,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ControlAction {
    Enable,
    Disable,
    Toggle,
}

/// Run the action against `svc` and observe the result.
fn control<S>(svc: &S, action: ControlAction) -> ControlOutput
where
    S: StatusProbe + ServiceController,
{
    let (from, requested) = match action {
        ControlAction::Enable => (None, ServiceState::Enabled),
        ControlAction::Disable => (None, ServiceState::Disabled),
        ControlAction::Toggle => {
            let from = svc.probe();
            (Some(from), from.toggled())
        }
    };
    let command_error = svc
        .command(requested.is_enabled())
        .err()
        .map(|e| e.to_string());
    let observed = svc.probe();
    ControlOutput {
        from,
        requested,
        observed,
        command_error,
    }
}

fn print_control(out: &ControlOutput, json: bool) -> Result<()> {
    if json {
        return print_json(out);
    }
    if let Some(ref e) = out.command_error {
        log::warn!("{e}");
    }
    if out.observed == out.requested {
        println!("Pi-hole blocking: {}", state_label(out.observed));
    } else {
        println!(
            "Pi-hole blocking: {} (requested {})",
            state_label(out.observed),
            state_label(out.requested)
        );
    }
    Ok(())
}

pub(super) fn cmd_control(action: ControlAction, json: bool) -> Result<()> {
    let out = control(&PiholeCli::new(), action);
    print_control(&out, json)?;
    if out.observed != out.requested {
        return Err(holeswitch_lib::HoleswitchError::StateMismatch {
            requested: out.requested,
            observed: out.observed,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use holeswitch_lib::service::stub::StubService;

    #[test]
    fn enable_from_disabled() {
        let svc = StubService::new(ServiceState::Disabled);
        let out = control(&svc, ControlAction::Enable);
        assert_eq!(out.from, None);
        assert_eq!(out.requested, ServiceState::Enabled);
        assert_eq!(out.observed, ServiceState::Enabled);
        assert!(out.command_error.is_none());
    }

    #[test]
    fn disable_when_already_disabled_is_noop_success() {
        let svc = StubService::new(ServiceState::Disabled);
        let out = control(&svc, ControlAction::Disable);
        assert_eq!(out.observed, ServiceState::Disabled);
        assert_eq!(svc.commands(), vec![false]);
    }

    #[test]
    fn toggle_uses_fresh_probe() {
        let svc = StubService::new(ServiceState::Enabled);
        let out = control(&svc, ControlAction::Toggle);
        assert_eq!(out.from, Some(ServiceState::Enabled));
        assert_eq!(out.requested, ServiceState::Disabled);
        assert_eq!(out.observed, ServiceState::Disabled);
    }

    #[test]
    fn ignored_command_reports_observed_state() {
        let svc = StubService::new(ServiceState::Enabled);
        svc.ignore_commands(true);
        let out = control(&svc, ControlAction::Disable);
        assert_eq!(out.requested, ServiceState::Disabled);
        assert_eq!(out.observed, ServiceState::Enabled);
        assert!(print_control(&out, false).is_ok());
    }

    #[test]
    fn print_control_json_succeeds() {
        let svc = StubService::new(ServiceState::Disabled);
        let out = control(&svc, ControlAction::Toggle);
        assert!(print_control(&out, true).is_ok());
    }
}
