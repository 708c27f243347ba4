use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DEFAULT_HEX_LENGTH: usize = 12;
pub const DEFAULT_SEQUENCE_START: u64 = 1;

/// One input line, keyed by the header it appeared under.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceRow {
    pub data: HashMap<String, String>,
}

impl SourceRow {
    pub fn get(&self, header: &str) -> Option<&str> {
        self.data.get(header).map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SourceRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            data: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Header line plus data rows of an input file.
#[derive(Debug, Clone, Default)]
pub struct SourceTable {
    pub headers: Vec<String>,
    pub rows: Vec<SourceRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Generator {
    Sequential {
        #[serde(default = "default_sequence_start")]
        start: u64,
        #[serde(default = "default_step")]
        step: u64,
    },
    RandomHex {
        #[serde(default = "default_hex_length")]
        length: usize,
    },
    Uuid,
    Static {
        #[serde(default)]
        value: String,
    },
    Timestamp {
        #[serde(default = "default_timestamp_format")]
        format: String,
    },
}

impl Generator {
    pub const KINDS: [&'static str; 5] = ["sequential", "random_hex", "uuid", "static", "timestamp"];

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Sequential { .. } => "sequential",
            Self::RandomHex { .. } => "random_hex",
            Self::Uuid => "uuid",
            Self::Static { .. } => "static",
            Self::Timestamp { .. } => "timestamp",
        }
    }
}

fn default_sequence_start() -> u64 {
    DEFAULT_SEQUENCE_START
}

fn default_step() -> u64 {
    1
}

fn default_hex_length() -> usize {
    DEFAULT_HEX_LENGTH
}

fn default_timestamp_format() -> String {
    DEFAULT_TIMESTAMP_FORMAT.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSource {
    /// Copy the value found under this source header.
    Mapped(String),
    Generated(Generator),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub source: ColumnSource,
    pub description: Option<String>,
}

impl ColumnSpec {
    pub fn mapped(name: impl Into<String>, header: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: ColumnSource::Mapped(header.into()),
            description: None,
        }
    }

    pub fn generated(name: impl Into<String>, generator: Generator) -> Self {
        Self {
            name: name.into(),
            source: ColumnSource::Generated(generator),
            description: None,
        }
    }

    pub fn source_header(&self) -> Option<&str> {
        match &self.source {
            ColumnSource::Mapped(header) => Some(header.as_str()),
            ColumnSource::Generated(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    #[serde(default = "default_true")]
    pub remove_blank_rows: bool,
    #[serde(default)]
    pub remove_duplicates: bool,
    #[serde(default)]
    pub duplicate_check_column: Option<String>,
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            remove_blank_rows: true,
            remove_duplicates: false,
            duplicate_check_column: None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Everything the transformer needs: output columns in emission order plus filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformSpec {
    pub columns: Vec<ColumnSpec>,
    pub filters: FilterSpec,
}

impl TransformSpec {
    pub fn output_headers(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn mapped_columns(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns
            .iter()
            .filter_map(|c| c.source_header().map(|h| (c.name.as_str(), h)))
    }

    pub fn sequential_columns(&self) -> impl Iterator<Item = (&str, u64, u64)> {
        self.columns.iter().filter_map(|c| match &c.source {
            ColumnSource::Generated(Generator::Sequential { start, step }) => {
                Some((c.name.as_str(), *start, *step))
            }
            _ => None,
        })
    }
}

/// Next value of every sequential column, keyed by column name.
pub type Counters = BTreeMap<String, u64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdRange {
    pub first: u64,
    pub last: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub kept: usize,
    pub dropped: usize,
    pub blank_rows: usize,
    pub duplicate_rows: usize,
    pub id_ranges: BTreeMap<String, IdRange>,
    pub next_counters: Counters,
}

impl RunSummary {
    /// Ids assigned to `column`, if it is sequential and kept any row.
    pub fn id_range(&self, column: &str) -> Option<IdRange> {
        self.id_ranges.get(column).copied()
    }

    pub fn is_empty_input(&self) -> bool {
        self.total == 0
    }
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub summary: RunSummary,
}
