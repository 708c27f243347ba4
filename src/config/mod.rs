#[cfg(feature = "cli")]
pub mod cli;
pub mod counter_store;
pub mod storage;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::{CliConfig, Command};
pub use counter_store::TomlCounterStore;
pub use storage::LocalStorage;
pub use toml_config::{ResolvedConfig, TomlConfig};
