use crate::core::transformer::Transformer;
use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::domain::model::{Counters, SourceRow, SourceTable, TransformResult};
use crate::utils::error::{EtlError, Result};
use chrono::{DateTime, Local};

/// Reads the input CSV, runs the transformer, writes the output CSV.
pub struct CsvPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    started_at: DateTime<Local>,
}

impl<S: Storage, C: ConfigProvider> CsvPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self {
            storage,
            config,
            started_at: Local::now(),
        }
    }

    pub fn with_start_time(mut self, started_at: DateTime<Local>) -> Self {
        self.started_at = started_at;
        self
    }

    pub fn config(&self) -> &C {
        &self.config
    }
}

impl<S: Storage, C: ConfigProvider> Pipeline for CsvPipeline<S, C> {
    fn extract(&self) -> Result<SourceTable> {
        let path = self.config.input_path();
        tracing::debug!("reading input from {}", path.display());
        let bytes = self.storage.read_file(path)?;
        parse_source(&bytes)
    }

    fn transform(&self, data: SourceTable, counters: &Counters) -> Result<TransformResult> {
        Transformer::new(self.config.transform_spec())
            .with_start_time(self.started_at)
            .run(&data, counters)
    }

    fn load(&self, result: &TransformResult) -> Result<()> {
        let bytes = render_output(result)?;
        let path = self.config.output_path();
        tracing::debug!("writing {} rows to {}", result.rows.len(), path.display());
        self.storage.write_file(path, &bytes)
    }
}

pub fn parse_source(bytes: &[u8]) -> Result<SourceTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            // Spreadsheet exports often start with a UTF-8 byte order mark.
            let h = if i == 0 { h.trim_start_matches('\u{feff}') } else { h };
            h.to_string()
        })
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: SourceRow = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.as_str(), v))
            .collect();
        rows.push(row);
    }

    Ok(SourceTable { headers, rows })
}

pub fn render_output(result: &TransformResult) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&result.headers)?;
    for row in &result.rows {
        writer.write_record(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| EtlError::ProcessingError {
            message: format!("could not finish CSV output: {}", e.error()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ColumnSpec, Generator, RunSummary, TransformSpec};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    #[derive(Default)]
    struct MockStorage {
        files: RefCell<HashMap<PathBuf, Vec<u8>>>,
    }

    impl MockStorage {
        fn with_file(path: &str, data: &str) -> Self {
            let storage = Self::default();
            storage
                .files
                .borrow_mut()
                .insert(PathBuf::from(path), data.as_bytes().to_vec());
            storage
        }

        fn get_file(&self, path: &str) -> Option<String> {
            self.files
                .borrow()
                .get(Path::new(path))
                .map(|b| String::from_utf8(b.clone()).unwrap())
        }
    }

    impl Storage for MockStorage {
        fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
            self.files.borrow().get(path).cloned().ok_or_else(|| {
                EtlError::io(
                    path,
                    std::io::Error::new(std::io::ErrorKind::NotFound, "File not found"),
                )
            })
        }

        fn write_file(&self, path: &Path, data: &[u8]) -> Result<()> {
            self.files
                .borrow_mut()
                .insert(path.to_path_buf(), data.to_vec());
            Ok(())
        }
    }

    struct MockConfig {
        spec: TransformSpec,
    }

    impl ConfigProvider for MockConfig {
        fn input_path(&self) -> &Path {
            Path::new("in.csv")
        }

        fn output_path(&self) -> &Path {
            Path::new("out.csv")
        }

        fn transform_spec(&self) -> &TransformSpec {
            &self.spec
        }
    }

    fn mock_config() -> MockConfig {
        MockConfig {
            spec: TransformSpec {
                columns: vec![
                    ColumnSpec::generated("id", Generator::Sequential { start: 1, step: 1 }),
                    ColumnSpec::mapped("title", "name"),
                    ColumnSpec::mapped("price", "cost"),
                ],
                filters: Default::default(),
            },
        }
    }

    #[test]
    fn test_parse_source_handles_quoting_bom_and_short_rows() {
        let table = parse_source(
            "\u{feff}name,cost,notes\n\"Lens, 50mm\",12.5,ok\nTripod,8\n".as_bytes(),
        )
        .unwrap();

        assert_eq!(table.headers, vec!["name", "cost", "notes"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].get("name"), Some("Lens, 50mm"));
        assert_eq!(table.rows[1].get("cost"), Some("8"));
        assert_eq!(table.rows[1].get("notes"), None);
    }

    #[test]
    fn test_extract_transform_load() {
        let storage = MockStorage::with_file("in.csv", "cost,name\n10,\"Lens, 50mm\"\n,Tripod\n");
        let pipeline = CsvPipeline::new(storage, mock_config());

        let table = pipeline.extract().unwrap();
        let result = pipeline.transform(table, &Counters::new()).unwrap();
        pipeline.load(&result).unwrap();

        assert_eq!(result.summary.kept, 1);
        assert_eq!(
            pipeline.storage.get_file("out.csv").unwrap(),
            "id,title,price\n1,\"Lens, 50mm\",10\n"
        );
    }

    #[test]
    fn test_render_header_only_for_empty_result() {
        let result = TransformResult {
            headers: vec!["id".to_string(), "title".to_string()],
            rows: vec![],
            summary: RunSummary::default(),
        };
        assert_eq!(render_output(&result).unwrap(), b"id,title\n");
    }

    #[test]
    fn test_extract_missing_input() {
        let pipeline = CsvPipeline::new(MockStorage::default(), mock_config());
        assert!(matches!(pipeline.extract(), Err(EtlError::IoError { .. })));
    }
}
