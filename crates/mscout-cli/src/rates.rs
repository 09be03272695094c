//! Shipping rate table management.
//!
//! `update-rates` replaces the whole blob at once; a running server picks
//! the new table up on its daily rate-refresh job, or on restart.

use std::path::PathBuf;

use clap::Args;

use mscout_core::AppConfig;
use mscout_pricing::{RateBook, RateStore};

#[derive(Debug, Args)]
pub struct UpdateRatesArgs {
    /// JSON rate book to install; omit to regenerate the formula defaults
    #[arg(long)]
    pub file: Option<PathBuf>,
}

/// # Errors
///
/// Returns an error when the file cannot be read or parsed, or the blob
/// cannot be written.
pub fn update_rates(config: &AppConfig, args: &UpdateRatesArgs) -> anyhow::Result<()> {
    let store = RateStore::open(config.rates_path.clone())?;

    match &args.file {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("cannot read {}: {e}", path.display()))?;
            let book: RateBook = serde_json::from_str(&raw)
                .map_err(|e| anyhow::anyhow!("{} is not a valid rate book: {e}", path.display()))?;
            let tiers = book.tiers.keys().cloned().collect::<Vec<_>>().join(", ");
            store.replace(book)?;
            println!(
                "installed rate book from {} (tiers: {})",
                path.display(),
                tiers
            );
        }
        None => {
            store.regenerate_defaults()?;
            println!("regenerated default rate book");
        }
    }

    Ok(())
}
