//! `mosaic simulate`: drive the orchestrator through a list of paths.
//!
//! Applications come from the `[[apps]]` section. Scripts are fetched but not
//! evaluated, so every application mounts with no lifecycle hooks.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use mosaic_config::Config;
use mosaic_runtime::{MemoryDocument, Mosaic, RouteOutcome};
use tracing::debug;

use crate::config_bridge;
use crate::theme::Theme;

/// Register the configured applications and navigate to each path in turn.
pub(crate) async fn run_simulate(cfg: &Config, paths: &[String], json: bool) -> Result<()> {
    if cfg.apps.is_empty() {
        bail!("no applications configured; add [[apps]] entries to mosaic.toml");
    }

    let mosaic = Mosaic::builder()
        .fetch_settings(config_bridge::to_fetch_settings(cfg))
        .lifecycle_timeout(config_bridge::lifecycle_timeout(cfg))
        .event_channel_capacity(cfg.runtime.event_channel_capacity)
        .document(Arc::new(MemoryDocument::new()))
        .build()?;
    for descriptor in config_bridge::to_descriptors(cfg).context("invalid application")? {
        mosaic.register_application(descriptor)?;
    }
    mosaic.start().await;

    for path in paths {
        debug!(path = %path, "Simulating navigation");
        // Failures are part of the report, not fatal.
        let outcome = match mosaic.navigate_to(path).await {
            Ok(outcome) => outcome,
            Err(_) => mosaic
                .settle()
                .await?
                .context("route driver produced no outcome")?,
        };
        if !json {
            print_outcome(&outcome);
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&mosaic.snapshot())?);
        return Ok(());
    }

    println!("{}", Theme::separator());
    for app in mosaic.snapshot() {
        println!(
            "  {:<20} {:<12} {}",
            app.name.as_str(),
            app.rule,
            Theme::status(app.status)
        );
    }
    Ok(())
}

fn print_outcome(outcome: &RouteOutcome) {
    println!("{}", Theme::header(&format!("→ {}", outcome.path)));
    if let Some(app) = &outcome.unmounted {
        println!("  {}", Theme::info(&format!("unmounted {app}")));
    }
    if let Some(err) = &outcome.unmount_error {
        println!("  {}", Theme::warning(&err.to_string()));
    }
    match (&outcome.mounted, &outcome.activation_error, &outcome.matched) {
        (Some(app), _, _) => println!("  {}", Theme::success(&format!("mounted {app}"))),
        (None, Some(err), _) => println!("  {}", Theme::error(&err.to_string())),
        (None, None, Some(app)) => println!("  {}", Theme::dimmed(&format!("{app} already active"))),
        (None, None, None) => println!("  {}", Theme::dimmed("no application matches")),
    }
}
