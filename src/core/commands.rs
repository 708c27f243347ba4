use crate::config::counter_store::{reconcile_counters, TomlCounterStore};
use crate::config::storage::LocalStorage;
use crate::config::toml_config::ResolvedConfig;
use crate::core::etl::EtlEngine;
use crate::core::pipeline::CsvPipeline;
use crate::domain::model::{Counters, RunSummary};
use crate::domain::ports::CounterStore;
use crate::utils::error::{EtlError, Result};
use std::path::PathBuf;

/// Runs the transform and, on success, persists the advanced counters.
pub fn clean(config: &ResolvedConfig) -> Result<RunSummary> {
    let store = TomlCounterStore::new(&config.config_path);
    let mut counters = Counters::new();
    for (name, start, _) in config.spec.sequential_columns() {
        counters.insert(name.to_string(), store.read_next(name, start)?);
    }

    let pipeline = CsvPipeline::new(LocalStorage::default(), config.clone());
    let result = EtlEngine::new(pipeline).run(&counters)?;
    let summary = result.summary;

    let advanced: Counters = summary
        .next_counters
        .iter()
        .filter(|(name, next)| counters.get(name.as_str()) != Some(*next))
        .map(|(name, next)| (name.clone(), *next))
        .collect();
    if !config.update_counters {
        tracing::info!("counter updates disabled; config left unchanged");
    } else if !advanced.is_empty() {
        store.write_all(&advanced)?;
    }

    Ok(summary)
}

/// Resets sequential counters to one past the largest id in `products`.
///
/// Falls back to `files.products_file` and to every sequential column when
/// `products` or `key` are not given.
pub fn maxid(
    config: &ResolvedConfig,
    products: Option<PathBuf>,
    key: Option<String>,
) -> Result<u64> {
    let products = products
        .or_else(|| config.products_path.clone())
        .ok_or_else(|| {
            EtlError::malformed(
                "files.products_file",
                "no products file given on the command line or in the config",
            )
        })?;

    let keys: Vec<String> = match key {
        Some(key) => {
            if !config.spec.sequential_columns().any(|(name, _, _)| name == key) {
                return Err(EtlError::malformed(
                    format!("generated_columns.{}", key),
                    "not a sequential generated column",
                ));
            }
            vec![key]
        }
        None => config
            .spec
            .sequential_columns()
            .map(|(name, _, _)| name.to_string())
            .collect(),
    };

    let store = TomlCounterStore::new(&config.config_path);
    reconcile_counters(&store, &products, &keys)
}
