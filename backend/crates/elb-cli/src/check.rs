//! `elb check`: preflight plus port status, as printable lines.

use elb_supervisor::{Launcher, ProcessLauncher, SupervisorConfig, is_available, preflight};

pub(crate) struct CheckReport {
    pub lines: Vec<String>,
    pub healthy: bool,
}

/// Run the same preflight `start()` runs, then check the port.
///
/// Every required file is listed; the verdict line names the first one
/// missing, exactly as a start attempt would record it.
pub(crate) fn check_report(config: &SupervisorConfig) -> CheckReport {
    let launcher = ProcessLauncher;
    let mut lines = Vec::new();

    for required in launcher.required_resources(config) {
        let status = if required.path.is_file() { "ok" } else { "MISSING" };
        lines.push(format!(
            "{:<9} {:<8} {}",
            required.kind.to_string(),
            status,
            required.path.display()
        ));
    }

    let preflight_ok = match preflight(&launcher, config) {
        Ok(()) => {
            lines.push(String::from("preflight ok"));
            true
        }
        Err(e) => {
            lines.push(format!("preflight failed: {}", e.fault()));
            false
        }
    };

    let free = is_available(&config.host, config.port);
    lines.push(format!(
        "{:<9} {:<8} {}",
        "port",
        if free { "ok" } else { "IN USE" },
        config.server_spec().bind_addr()
    ));

    CheckReport {
        lines,
        healthy: preflight_ok && free,
    }
}
