use crate::domain::model::{Counters, SourceTable, TransformResult, TransformSpec};
use crate::utils::error::Result;
use std::path::Path;

pub trait Storage {
    fn read_file(&self, path: &Path) -> Result<Vec<u8>>;
    /// Replaces `path` in one step; a failed write leaves any previous file untouched.
    fn write_file(&self, path: &Path, data: &[u8]) -> Result<()>;
}

pub trait ConfigProvider {
    fn input_path(&self) -> &Path;
    fn output_path(&self) -> &Path;
    fn transform_spec(&self) -> &TransformSpec;
}

pub trait CounterStore {
    fn read_next(&self, key: &str, default: u64) -> Result<u64>;
    fn write_next(&self, key: &str, value: u64) -> Result<()>;
}

pub trait Pipeline {
    fn extract(&self) -> Result<SourceTable>;
    fn transform(&self, data: SourceTable, counters: &Counters) -> Result<TransformResult>;
    fn load(&self, result: &TransformResult) -> Result<()>;
}
