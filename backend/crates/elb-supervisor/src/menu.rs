use crate::{ServiceState, StateSnapshot};

/// What the tray menu shows for a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuModel {
    pub status_label: String,
    pub tooltip: String,
    pub start_enabled: bool,
    pub stop_enabled: bool,
}

impl From<&StateSnapshot> for MenuModel {
    fn from(snapshot: &StateSnapshot) -> Self {
        let status = match snapshot.state {
            ServiceState::Stopped => String::from("Stopped"),
            ServiceState::Starting => String::from("Starting..."),
            ServiceState::Running if snapshot.ready => String::from("Running"),
            ServiceState::Running => String::from("Running (loading model)"),
            ServiceState::Stopping => String::from("Stopping..."),
            ServiceState::Failed => match &snapshot.last_error {
                Some(fault) => format!("Failed: {}", fault.label()),
                None => String::from("Failed"),
            },
        };

        let tooltip = match (&snapshot.state, &snapshot.last_error) {
            (ServiceState::Failed, Some(fault)) => format!("Edge LLM Base - {fault}"),
            _ => format!("Edge LLM Base - {status}"),
        };

        Self {
            status_label: format!("Status: {status}"),
            tooltip,
            start_enabled: snapshot.state.accepts_start(),
            stop_enabled: snapshot.state == ServiceState::Running,
        }
    }
}
