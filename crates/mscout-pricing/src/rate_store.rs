//! File-backed store for the shipping rate book.
//!
//! Readers take immutable `Arc<RateBook>` snapshots; `replace` writes the
//! new document to a temp file, renames it over the blob, then swaps the
//! in-memory Arc. A reader mid-calculation keeps its snapshot and never
//! observes a half-written table.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::error::PricingError;
use crate::rates::{default_rate_book, RateBook};

#[derive(Debug)]
pub struct RateStore {
    path: PathBuf,
    current: RwLock<Arc<RateBook>>,
}

impl RateStore {
    /// Opens the store at `path`, loading the existing blob or falling back
    /// to the generated default book when none exists.
    ///
    /// # Errors
    ///
    /// Returns an error when the blob exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PricingError> {
        let path = path.into();
        let book = if path.exists() {
            load_book(&path)?
        } else {
            tracing::info!(path = %path.display(), "no rate blob found, using generated defaults");
            default_rate_book()
        };
        Ok(Self {
            path,
            current: RwLock::new(Arc::new(book)),
        })
    }

    /// Current rate book snapshot. Cheap to clone; stable for the duration
    /// of a calculation.
    #[must_use]
    pub fn snapshot(&self) -> Arc<RateBook> {
        self.current
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Replaces the whole rate document: persists it atomically, then swaps
    /// the in-memory snapshot. The swap only happens after a successful
    /// write, so a failed persist leaves the old book serving.
    ///
    /// # Errors
    ///
    /// Returns an error when the blob cannot be serialized or written.
    pub fn replace(&self, book: RateBook) -> Result<(), PricingError> {
        persist_book(&self.path, &book)?;
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = Arc::new(book);
        tracing::info!(path = %self.path.display(), "rate book replaced");
        Ok(())
    }

    /// Regenerates the formula defaults and installs them as the current
    /// book.
    ///
    /// # Errors
    ///
    /// Returns an error when the regenerated blob cannot be written.
    pub fn regenerate_defaults(&self) -> Result<(), PricingError> {
        self.replace(default_rate_book())
    }

    /// Re-reads the blob from disk and swaps it in, picking up tables
    /// installed out of band (e.g. by the CLI). Falls back to the generated
    /// defaults when the blob is missing.
    ///
    /// # Errors
    ///
    /// Returns an error when the blob exists but cannot be read or parsed;
    /// the current book keeps serving in that case.
    pub fn reload(&self) -> Result<(), PricingError> {
        let book = if self.path.exists() {
            load_book(&self.path)?
        } else {
            default_rate_book()
        };
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = Arc::new(book);
        Ok(())
    }
}

fn load_book(path: &Path) -> Result<RateBook, PricingError> {
    let raw = std::fs::read_to_string(path).map_err(|source| PricingError::RateBookIo {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| PricingError::RateBookParse {
        path: path.to_path_buf(),
        source,
    })
}

fn persist_book(path: &Path, book: &RateBook) -> Result<(), PricingError> {
    let io_err = |source| PricingError::RateBookIo {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
    }

    let json = serde_json::to_string_pretty(book).map_err(|source| PricingError::RateBookParse {
        path: path.to_path_buf(),
        source,
    })?;

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(io_err)?;
    std::fs::rename(&tmp, path).map_err(io_err)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn open_without_blob_serves_generated_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = RateStore::open(dir.path().join("rates.json")).unwrap();
        let book = store.snapshot();
        assert_eq!(book.exchange_rate_p_to_jpy, Decimal::new(100, 0));
        assert!(book.tiers.contains_key("economy"));
        assert!(book.tiers.contains_key("premium"));
    }

    #[test]
    fn replace_persists_and_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rates.json");

        let store = RateStore::open(&path).unwrap();
        let mut book = default_rate_book();
        book.exchange_rate_p_to_jpy = Decimal::new(120, 0);
        store.replace(book).unwrap();

        assert_eq!(
            store.snapshot().exchange_rate_p_to_jpy,
            Decimal::new(120, 0)
        );

        let reopened = RateStore::open(&path).unwrap();
        assert_eq!(
            reopened.snapshot().exchange_rate_p_to_jpy,
            Decimal::new(120, 0)
        );
    }

    #[test]
    fn snapshots_are_stable_across_replace() {
        let dir = tempfile::tempdir().unwrap();
        let store = RateStore::open(dir.path().join("rates.json")).unwrap();

        let before = store.snapshot();
        let mut book = default_rate_book();
        book.exchange_rate_p_to_jpy = Decimal::new(120, 0);
        store.replace(book).unwrap();

        assert_eq!(before.exchange_rate_p_to_jpy, Decimal::new(100, 0));
        assert_eq!(
            store.snapshot().exchange_rate_p_to_jpy,
            Decimal::new(120, 0)
        );
    }

    #[test]
    fn reload_picks_up_a_blob_written_out_of_band() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rates.json");
        let store = RateStore::open(&path).unwrap();

        let mut book = default_rate_book();
        book.exchange_rate_p_to_jpy = Decimal::new(120, 0);
        let writer = RateStore::open(&path).unwrap();
        writer.replace(book).unwrap();
        assert_eq!(store.snapshot().exchange_rate_p_to_jpy, Decimal::new(100, 0));

        store.reload().unwrap();
        assert_eq!(store.snapshot().exchange_rate_p_to_jpy, Decimal::new(120, 0));
    }

    #[test]
    fn corrupt_blob_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rates.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = RateStore::open(&path).expect_err("corrupt blob");
        assert!(matches!(err, PricingError::RateBookParse { .. }));
    }

    #[test]
    fn regenerate_defaults_restores_the_formula_book() {
        let dir = tempfile::tempdir().unwrap();
        let store = RateStore::open(dir.path().join("rates.json")).unwrap();
        let mut book = default_rate_book();
        book.tiers.remove("premium");
        store.replace(book).unwrap();
        assert!(!store.snapshot().tiers.contains_key("premium"));

        store.regenerate_defaults().unwrap();
        assert!(store.snapshot().tiers.contains_key("premium"));
    }
}
