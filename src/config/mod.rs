//! Persistent configuration
//!
//! Everything lives as JSON under `~/.config/retune/`.

mod servers;
mod settings;

pub use servers::ServerList;
pub use settings::Settings;

use anyhow::Result;
use std::path::PathBuf;

/// `<config dir>/retune/<file>`
fn config_file(file: &str) -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    Ok(config_dir.join("retune").join(file))
}
