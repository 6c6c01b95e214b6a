//! `mosaic inspect`: fetch an entry document and list what it references.

use std::sync::Arc;

use anyhow::{Context, Result};
use mosaic_assets::{AssetResolver, FetchSettings, HttpFetcher};
use url::Url;

use crate::theme::Theme;

/// Fetch and parse `entry`, then print its assets.
pub(crate) async fn run_inspect(entry: &str, settings: &FetchSettings) -> Result<()> {
    let url = Url::parse(entry).with_context(|| format!("'{entry}' is not an absolute URL"))?;
    let resolver = AssetResolver::new(Arc::new(HttpFetcher::new(settings)?));
    let assets = resolver
        .load(&url)
        .await
        .with_context(|| format!("failed to load {url}"))?;

    println!("{}", Theme::header(&format!("Entry {url}")));
    if assets.base != assets.entry {
        println!("{}", Theme::info(&format!("base: {}", assets.base)));
    }
    println!("{}", Theme::separator());

    println!("Scripts ({}):", assets.scripts.len());
    for script in &assets.scripts {
        println!("  {script}");
    }
    println!("Styles ({}):", assets.styles.len());
    for style in &assets.styles {
        println!("  {style}");
    }
    println!(
        "{}",
        Theme::dimmed(&format!("body: {} bytes of markup", assets.html_body.len()))
    );

    for diagnostic in &assets.diagnostics {
        println!("{}", Theme::warning(&diagnostic.to_string()));
    }
    Ok(())
}
