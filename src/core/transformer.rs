use crate::domain::model::{
    ColumnSource, Counters, Generator, IdRange, RunSummary, SourceTable, TransformResult,
    TransformSpec,
};
use crate::utils::error::{EtlError, Result};
use chrono::{DateTime, Local};
use rand::Rng;
use std::collections::{BTreeMap, HashSet};
use std::fmt::Write;

/// Applies a [`TransformSpec`] to a whole [`SourceTable`].
///
/// The transformer never touches the filesystem. Sequential counters come in
/// through [`Counters`] and the values to persist come back in
/// [`RunSummary::next_counters`].
pub struct Transformer<'a> {
    spec: &'a TransformSpec,
    started_at: DateTime<Local>,
}

/// Per-run state shared by the generators.
struct GenerationContext<R: Rng> {
    started_at: DateTime<Local>,
    sequences: BTreeMap<String, u64>,
    rng: R,
}

impl<'a> Transformer<'a> {
    pub fn new(spec: &'a TransformSpec) -> Self {
        Self {
            spec,
            started_at: Local::now(),
        }
    }

    /// Pins the instant every `timestamp` column reports.
    pub fn with_start_time(mut self, started_at: DateTime<Local>) -> Self {
        self.started_at = started_at;
        self
    }

    pub fn run(&self, table: &SourceTable, counters: &Counters) -> Result<TransformResult> {
        self.run_with_rng(table, counters, rand::thread_rng())
    }

    pub fn run_with_rng<R: Rng>(
        &self,
        table: &SourceTable,
        counters: &Counters,
        rng: R,
    ) -> Result<TransformResult> {
        check_required_columns(self.spec, &table.headers)?;

        let mapped_headers: Vec<&str> = self.spec.mapped_columns().map(|(_, h)| h).collect();
        let duplicate_index = self.duplicate_index()?;
        let filters = &self.spec.filters;

        let initial: BTreeMap<String, u64> = self
            .spec
            .sequential_columns()
            .map(|(name, start, _)| {
                let value = counters.get(name).copied().unwrap_or(start);
                (name.to_string(), value)
            })
            .collect();

        let mut ctx = GenerationContext {
            started_at: self.started_at,
            sequences: initial.clone(),
            rng,
        };
        let mut summary = RunSummary::default();
        let mut seen = HashSet::new();
        let mut rows = Vec::with_capacity(table.rows.len());

        for (index, row) in table.rows.iter().enumerate() {
            summary.total += 1;
            let line = index + 2;

            let mapped: Vec<String> = mapped_headers
                .iter()
                .map(|header| row.get(header).unwrap_or_default().trim().to_string())
                .collect();

            if filters.remove_blank_rows && mapped.iter().any(String::is_empty) {
                tracing::debug!(line, "dropping row with blank mapped value");
                summary.blank_rows += 1;
                continue;
            }

            if let Some(dup) = duplicate_index {
                if !seen.insert(mapped[dup].clone()) {
                    tracing::debug!(line, value = %mapped[dup], "dropping duplicate row");
                    summary.duplicate_rows += 1;
                    continue;
                }
            }

            let mut mapped_values = mapped.into_iter();
            let mut output = Vec::with_capacity(self.spec.columns.len());
            for column in &self.spec.columns {
                let value = match &column.source {
                    ColumnSource::Mapped(_) => mapped_values.next().unwrap_or_default(),
                    ColumnSource::Generated(generator) => {
                        generate_value(&column.name, generator, &mut ctx)?
                    }
                };
                output.push(value);
            }

            rows.push(output);
            summary.kept += 1;
        }

        summary.dropped = summary.total - summary.kept;
        summary.next_counters = ctx.sequences;
        for (name, _, step) in self.spec.sequential_columns() {
            let first = initial[name];
            if summary.kept > 0 {
                let last = first + (summary.kept as u64 - 1) * step;
                summary
                    .id_ranges
                    .insert(name.to_string(), IdRange { first, last });
            }
        }

        if summary.is_empty_input() {
            tracing::warn!("input has no data rows; output will contain only the header line");
        }
        tracing::info!(
            total = summary.total,
            kept = summary.kept,
            dropped = summary.dropped,
            "transform finished"
        );

        Ok(TransformResult {
            headers: self.spec.output_headers(),
            rows,
            summary,
        })
    }

    /// Position of the duplicate check column among the mapped values.
    fn duplicate_index(&self) -> Result<Option<usize>> {
        let filters = &self.spec.filters;
        if !filters.remove_duplicates {
            return Ok(None);
        }
        let column = filters.duplicate_check_column.as_deref().ok_or_else(|| {
            EtlError::malformed(
                "filters.duplicate_check_column",
                "required when remove_duplicates is enabled",
            )
        })?;
        self.spec
            .mapped_columns()
            .position(|(name, _)| name == column)
            .map(Some)
            .ok_or_else(|| {
                EtlError::malformed(
                    "filters.duplicate_check_column",
                    format!("'{}' is not a mapped output column", column),
                )
            })
    }
}

/// Fails once, before any row is looked at, if a mapped source header is absent.
pub fn check_required_columns(spec: &TransformSpec, headers: &[String]) -> Result<()> {
    let present: HashSet<&str> = headers.iter().map(String::as_str).collect();
    let mut missing: Vec<String> = Vec::new();
    for (_, header) in spec.mapped_columns() {
        if !present.contains(header) && !missing.iter().any(|m| m == header) {
            missing.push(header.to_string());
        }
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(EtlError::MissingRequiredColumns {
            missing,
            available: headers.to_vec(),
        })
    }
}

fn generate_value<R: Rng>(
    column: &str,
    generator: &Generator,
    ctx: &mut GenerationContext<R>,
) -> Result<String> {
    match generator {
        Generator::Sequential { step, .. } => {
            let current = ctx.sequences.get_mut(column).ok_or_else(|| {
                EtlError::ProcessingError {
                    message: format!("no counter initialised for column '{}'", column),
                }
            })?;
            let value = *current;
            *current = value.checked_add(*step).ok_or_else(|| EtlError::ProcessingError {
                message: format!("counter for column '{}' overflowed", column),
            })?;
            Ok(value.to_string())
        }
        Generator::RandomHex { length } => Ok(random_hex(&mut ctx.rng, *length)),
        Generator::Uuid => Ok(uuid::Uuid::new_v4().to_string()),
        Generator::Static { value } => Ok(value.clone()),
        Generator::Timestamp { format } => {
            let mut out = String::new();
            write!(out, "{}", ctx.started_at.format(format)).map_err(|_| {
                EtlError::malformed(
                    format!("generated_columns.{}.format", column),
                    format!("invalid timestamp format '{}'", format),
                )
            })?;
            Ok(out)
        }
    }
}

pub fn random_hex<R: Rng>(rng: &mut R, length: usize) -> String {
    (0..length)
        .map(|_| {
            let digit = rng.gen_range(0..16u32);
            std::char::from_digit(digit, 16).unwrap_or('0')
        })
        .collect()
}
