//! `mosaic config`: show the resolved configuration.

use anyhow::{Result, bail};
use mosaic_config::ResolvedConfig;

use crate::theme::Theme;

/// Print the resolved configuration as TOML or JSON.
pub(crate) fn run_show(resolved: &ResolvedConfig, format: &str) -> Result<()> {
    match format {
        "toml" => {
            if resolved.loaded_files.is_empty() {
                println!("{}", Theme::dimmed("# built-in defaults"));
            }
            for file in &resolved.loaded_files {
                println!("{}", Theme::dimmed(&format!("# from {file}")));
            }
            for var in &resolved.env_overrides {
                println!("{}", Theme::dimmed(&format!("# overridden by {var}")));
            }
            print!("{}", resolved.to_toml()?);
        },
        "json" => println!("{}", serde_json::to_string_pretty(resolved)?),
        other => bail!("unknown format '{other}'; expected toml or json"),
    }
    Ok(())
}
