//! Persistence of sequential counters.
//!
//! Counters live in the settings document itself, as the `start` value of each
//! `sequential` generated column. Updates rewrite the whole document, keeping
//! every other key. Two processes updating the same document at once can lose
//! an update; callers serialize runs themselves.

use crate::config::storage::write_atomic;
use crate::domain::model::Counters;
use crate::domain::ports::CounterStore;
use crate::utils::error::{EtlError, Result};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct TomlCounterStore {
    path: PathBuf,
}

impl TomlCounterStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_table(&self) -> Result<toml::Table> {
        if !self.path.exists() {
            return Err(EtlError::ConfigMissing {
                path: self.path.clone(),
            });
        }
        let content =
            std::fs::read_to_string(&self.path).map_err(|e| EtlError::io(&self.path, e))?;
        toml::from_str(&content)
            .map_err(|e| EtlError::malformed("toml_parsing", format!("TOML parsing error: {}", e)))
    }

    /// Persists every counter in one document rewrite.
    pub fn write_all(&self, counters: &Counters) -> Result<()> {
        if counters.is_empty() {
            return Ok(());
        }
        let mut table = self.load_table()?;
        for (key, value) in counters {
            set_start(&mut table, key, *value)?;
        }
        let rendered = toml::to_string_pretty(&table)
            .map_err(|e| EtlError::malformed("toml_rendering", e.to_string()))?;
        write_atomic(&self.path, rendered.as_bytes())?;
        for (key, value) in counters {
            tracing::info!("counter '{}' will start at {} on the next run", key, value);
        }
        Ok(())
    }
}

impl CounterStore for TomlCounterStore {
    fn read_next(&self, key: &str, default: u64) -> Result<u64> {
        let table = self.load_table()?;
        let start = table
            .get("generated_columns")
            .and_then(|g| g.get(key))
            .and_then(|c| c.get("start"));
        match start {
            None => Ok(default),
            Some(toml::Value::Integer(value)) if *value >= 0 => Ok(*value as u64),
            Some(other) => Err(EtlError::malformed(
                format!("generated_columns.{}.start", key),
                format!("expected a non-negative integer, found {}", other),
            )),
        }
    }

    fn write_next(&self, key: &str, value: u64) -> Result<()> {
        self.write_all(&Counters::from([(key.to_string(), value)]))
    }
}

fn set_start(table: &mut toml::Table, key: &str, value: u64) -> Result<()> {
    let field = format!("generated_columns.{}", key);
    let column = table
        .get_mut("generated_columns")
        .and_then(toml::Value::as_table_mut)
        .and_then(|g| g.get_mut(key))
        .and_then(toml::Value::as_table_mut)
        .ok_or_else(|| EtlError::malformed(&field, "no such generated column"))?;
    let value = i64::try_from(value).map_err(|_| {
        EtlError::malformed(format!("{}.start", field), "counter exceeds TOML integer range")
    })?;
    column.insert("start".to_string(), toml::Value::Integer(value));
    Ok(())
}

/// Largest numeric value in the first column of a previously produced file.
///
/// The first line is treated as a header. Cells that do not parse as
/// integers are skipped.
pub fn scan_max_id(path: &Path) -> Result<Option<u64>> {
    let file = std::fs::File::open(path).map_err(|e| EtlError::io(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let mut max: Option<u64> = None;
    let mut skipped = 0usize;
    for record in reader.records() {
        let record = record?;
        match record.get(0).map(str::trim).and_then(|v| v.parse::<u64>().ok()) {
            Some(id) => max = Some(max.map_or(id, |m| m.max(id))),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        tracing::debug!("{} rows without a numeric id skipped in {}", skipped, path.display());
    }
    Ok(max)
}

/// Resets counters so the next run continues after the largest id already in `products`.
///
/// Every key in `keys` gets the same next value.
pub fn reconcile_counters<S: CounterStore>(
    store: &S,
    products: &Path,
    keys: &[String],
) -> Result<u64> {
    if keys.is_empty() {
        return Err(EtlError::malformed(
            "generated_columns",
            "no sequential column to reconcile",
        ));
    }
    let max = scan_max_id(products)?.ok_or_else(|| EtlError::ProcessingError {
        message: format!("no numeric ids found in first column of '{}'", products.display()),
    })?;
    let next = max.checked_add(1).ok_or_else(|| EtlError::ProcessingError {
        message: format!(
            "largest id {} in '{}' leaves no room for a next id",
            max,
            products.display()
        ),
    })?;
    for key in keys {
        store.write_next(key, next)?;
        tracing::info!("max id in {} is {}; '{}' reset to {}", products.display(), max, key, next);
    }
    Ok(next)
}
