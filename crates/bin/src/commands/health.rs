//! Health command - asks a running service to ping its store.

use std::time::Duration;

use crate::cli::HealthArgs;
use crate::commands::serve::PingReport;
use crate::output::OutputFormat;

/// Run the health command. Fails unless the service reached its store.
pub async fn run(args: &HealthArgs, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let url = ping_url(&args.url);
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(args.timeout))
        .build()?;

    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| format!("cannot reach {url}: {e}"))?;
    let status = response.status();
    let report: PingReport = response
        .json()
        .await
        .map_err(|e| format!("{url} answered {status} without a ping report: {e}"))?;
    tracing::debug!(%status, store = %report.store, "Ping answered");

    match format {
        OutputFormat::Human => println!("{} store at {url}: {status}", report.store),
        OutputFormat::Json => {
            let value = serde_json::json!({
                "url": url,
                "status": status.as_u16(),
                "store": report.store,
                "error": report.error,
            });
            println!("{}", serde_json::to_string(&value)?);
        }
    }

    if !status.is_success() {
        let reason = report.error.as_deref().unwrap_or("no reason given");
        return Err(format!("{} store unavailable: {reason}", report.store).into());
    }
    Ok(())
}

/// `base` with a single `/ping` suffix.
fn ping_url(base: &str) -> String {
    let base = base.trim_end_matches('/');
    let base = base.strip_suffix("/ping").unwrap_or(base);
    format!("{base}/ping")
}
