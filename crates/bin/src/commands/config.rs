//! Config command - prints or writes the default configuration.

use std::path::Path;

use crate::cli::ConfigArgs;
use crate::config::Config;

/// Run the config command
pub fn run(path: &Path, args: &ConfigArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::generated();
    if !args.write {
        println!("{}", config.to_json()?);
        return Ok(());
    }

    if path.exists() && !args.force {
        return Err(format!(
            "{} already exists; pass --force to overwrite it",
            path.display()
        )
        .into());
    }
    config.write(path)?;
    tracing::info!(path = %path.display(), "Wrote configuration");
    println!("Wrote {}", path.display());
    Ok(())
}
