use anyhow::{Context, Result};
use kestrel_session::SessionConfig;

pub fn run(config: &SessionConfig) -> Result<()> {
    let rendered = toml::to_string_pretty(config).context("Failed to serialize config")?;
    print!("{rendered}");
    Ok(())
}
