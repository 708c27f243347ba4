//! Human readable output for runs and for an already written output file.

use crate::config::toml_config::ResolvedConfig;
use crate::domain::model::{ColumnSource, Generator, RunSummary};
use crate::utils::error::{EtlError, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

const RULE_WIDTH: usize = 60;

/// A CSV file produced by `clean`, loaded for inspection.
#[derive(Debug, Clone)]
pub struct OutputArtifact {
    path: PathBuf,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl OutputArtifact {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| EtlError::io(path, e))?;
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(file);
        let headers = reader.headers()?.iter().map(str::to_string).collect();
        let rows = reader
            .records()
            .map(|r| r.map(|record| record.iter().map(str::to_string).collect()))
            .collect::<std::result::Result<Vec<Vec<String>>, csv::Error>>()?;
        Ok(Self {
            path: path.to_path_buf(),
            headers,
            rows,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn first_rows(&self, n: usize) -> &[Vec<String>] {
        &self.rows[..n.min(self.rows.len())]
    }

    /// First `n` values of `column`.
    pub fn column_sample(&self, column: &str, n: usize) -> Result<Vec<&str>> {
        let index = self
            .headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| EtlError::MissingRequiredColumns {
                missing: vec![column.to_string()],
                available: self.headers.clone(),
            })?;
        Ok(self
            .rows
            .iter()
            .take(n)
            .map(|row| row.get(index).map(String::as_str).unwrap_or_default())
            .collect())
    }
}

fn rule(out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out, "{}", "=".repeat(RULE_WIDTH))
}

fn describe(generator: &Generator) -> String {
    match generator {
        Generator::Sequential { start, step } if *step == 1 => {
            format!("sequential from {}", start)
        }
        Generator::Sequential { start, step } => format!("sequential from {} by {}", start, step),
        Generator::RandomHex { length } => format!("random {}-char hex", length),
        Generator::Uuid => "uuid v4".to_string(),
        Generator::Static { value } => format!("static '{}'", value),
        Generator::Timestamp { format } => format!("run timestamp ({})", format),
    }
}

pub fn write_summary(
    out: &mut impl Write,
    summary: &RunSummary,
    config: &ResolvedConfig,
) -> std::io::Result<()> {
    writeln!(out)?;
    rule(out)?;
    writeln!(out, "PROCESSING SUMMARY")?;
    rule(out)?;
    writeln!(out, "Input file:       {}", config.input_path.display())?;
    writeln!(out, "Output file:      {}", config.output_path.display())?;
    writeln!(out, "Total rows:       {}", summary.total)?;
    writeln!(out, "Kept rows:        {}", summary.kept)?;
    writeln!(out, "Dropped rows:     {}", summary.dropped)?;
    writeln!(out, "  blank:          {}", summary.blank_rows)?;
    if config.spec.filters.remove_duplicates {
        writeln!(out, "  duplicate:      {}", summary.duplicate_rows)?;
    }
    for (name, _, _) in config.spec.sequential_columns() {
        match summary.id_range(name) {
            Some(range) => writeln!(out, "{} range: {} - {}", name, range.first, range.last)?,
            None => writeln!(out, "{} range: none assigned", name)?,
        }
        if let Some(next) = summary.next_counters.get(name) {
            writeln!(out, "{} next:  {}", name, next)?;
        }
    }
    if summary.is_empty_input() {
        writeln!(out, "WARNING: input had no data rows; wrote header only")?;
    }
    rule(out)?;

    if config.verbose_report {
        writeln!(out, "\nColumn Mapping:")?;
        for (name, header) in config.spec.mapped_columns() {
            writeln!(out, "  '{}' -> '{}'", header, name)?;
        }
        writeln!(out, "\nGenerated Columns:")?;
        for column in &config.spec.columns {
            if let ColumnSource::Generated(generator) = &column.source {
                match &column.description {
                    Some(text) => writeln!(out, "  {} ({}) - {}", column.name, describe(generator), text)?,
                    None => writeln!(out, "  {} ({})", column.name, describe(generator))?,
                }
            }
        }
        rule(out)?;
    }
    Ok(())
}

pub fn write_summary_json(out: &mut impl Write, summary: &RunSummary) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, summary)?;
    writeln!(out).map_err(|e| EtlError::io("<stdout>", e))
}

pub fn write_preview(out: &mut impl Write, artifact: &OutputArtifact, n: usize) -> std::io::Result<()> {
    writeln!(
        out,
        "Preview of {} (first {} of {} rows)",
        artifact.path().display(),
        artifact.first_rows(n).len(),
        artifact.row_count()
    )?;
    rule(out)?;
    writeln!(out, "{}", artifact.headers().join(" | "))?;
    writeln!(out, "{}", "-".repeat(RULE_WIDTH))?;
    for row in artifact.first_rows(n) {
        writeln!(out, "{}", row.join(" | "))?;
    }
    rule(out)
}

pub fn write_stats(
    out: &mut impl Write,
    artifact: &OutputArtifact,
    column: Option<&str>,
    sample: usize,
) -> Result<()> {
    let io = |e: std::io::Error| EtlError::io("<stdout>", e);
    writeln!(out, "Statistics for {}", artifact.path().display()).map_err(io)?;
    rule(out).map_err(io)?;
    writeln!(out, "Rows:    {}", artifact.row_count()).map_err(io)?;
    writeln!(out, "Columns: {}", artifact.headers().len()).map_err(io)?;
    for (i, header) in artifact.headers().iter().enumerate() {
        writeln!(out, "  {:>2}. {}", i + 1, header).map_err(io)?;
    }

    if let Some(column) = column.or_else(|| artifact.headers().first().map(String::as_str)) {
        let values = artifact.column_sample(column, sample)?;
        writeln!(out, "\nSample of '{}':", column).map_err(io)?;
        for value in values {
            writeln!(out, "  {}", value).map_err(io)?;
        }
    }
    rule(out).map_err(io)?;
    Ok(())
}
