//! Polling the server until its HTTP surface answers.

use crate::{READINESS_REQUEST_TIMEOUT, ReadinessSettings, ServerSpec};

use std::time::Instant;

use tracing::{debug, warn};

/// URL polled for `spec` under `settings`.
pub(crate) fn probe_url(spec: &ServerSpec, settings: &ReadinessSettings) -> String {
    format!("http://{}{}", spec.bind_addr(), settings.path)
}

/// Poll until the endpoint answers with a success status or the timeout
/// passes. Returns whether the server became ready.
pub(crate) async fn wait_ready(url: &str, settings: &ReadinessSettings) -> bool {
    let client = match reqwest::Client::builder()
        .timeout(READINESS_REQUEST_TIMEOUT)
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            warn!("Cannot build readiness client: {e}");
            return false;
        }
    };

    let start = Instant::now();
    while start.elapsed() < settings.timeout {
        match client.get(url).send().await {
            Ok(resp) if resp.status().is_success() => return true,
            Ok(resp) => debug!("Readiness probe got HTTP {}", resp.status()),
            Err(e) => debug!("Readiness probe not answered yet: {e}"),
        }
        tokio::time::sleep(settings.interval).await;
    }

    false
}
