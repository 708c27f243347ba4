pub mod commands;
pub mod etl;
pub mod pipeline;
pub mod report;
pub mod transformer;

pub use crate::domain::model::{SourceTable, TransformResult};
pub use crate::domain::ports::{ConfigProvider, CounterStore, Pipeline, Storage};
pub use crate::utils::error::Result;
