pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::{CliConfig, Command};

pub use crate::config::{LocalStorage, ResolvedConfig, TomlConfig, TomlCounterStore};
pub use crate::core::{etl::EtlEngine, pipeline::CsvPipeline, transformer::Transformer};
pub use crate::domain::model::{ColumnSpec, Counters, FilterSpec, Generator, RunSummary, TransformSpec};
pub use crate::utils::error::{EtlError, Result};
