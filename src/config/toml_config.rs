use crate::domain::model::{
    ColumnSource, ColumnSpec, FilterSpec, Generator, TransformSpec,
};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number,
    validate_required_field, Validate,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Raw settings document, as written by the user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub files: Option<FilesConfig>,
    pub columns: Option<ColumnsConfig>,
    pub generated_columns: Option<toml::Table>,
    pub filters: Option<FilterSpec>,
    pub output_settings: Option<OutputSettings>,
    pub processing: Option<ProcessingConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilesConfig {
    pub input_file: Option<String>,
    pub output_file: Option<String>,
    pub products_file: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnsConfig {
    pub source_mapping: Option<toml::Table>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSettings {
    pub column_order: Option<Vec<String>>,
    /// Text encoding of input and output. Only UTF-8 is supported.
    pub encoding: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingConfig {
    pub verbose_logging: Option<bool>,
    pub update_counters: Option<bool>,
}

/// Validated configuration handed to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub config_path: PathBuf,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub products_path: Option<PathBuf>,
    pub spec: TransformSpec,
    pub verbose_report: bool,
    pub update_counters: bool,
}

impl TomlConfig {
    /// Reads and parses the settings document at `path`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(EtlError::ConfigMissing {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|e| EtlError::io(path, e))?;
        Self::from_toml_str(&content)
    }

    /// Parses a settings document after `${VAR}` substitution.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = substitute_env_vars(content);

        let mut table: toml::Table = toml::from_str(&processed_content)
            .map_err(|e| EtlError::malformed("toml_parsing", format!("TOML parsing error: {}", e)))?;
        strip_comment_keys(&mut table);

        toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| EtlError::malformed("toml_schema", e.message().to_string()))
    }

    /// Output columns in emission order.
    pub fn column_specs(&self) -> Result<Vec<ColumnSpec>> {
        let mut columns = Vec::new();
        let mut names = HashSet::new();

        let mapping = self
            .columns
            .as_ref()
            .and_then(|c| c.source_mapping.as_ref());
        for (name, value) in mapping.into_iter().flatten() {
            let field = format!("columns.source_mapping.{}", name);
            let header = value
                .as_str()
                .ok_or_else(|| EtlError::malformed(&field, "source header must be a string"))?;
            validate_non_empty_string(&field, header)?;
            names.insert(name.clone());
            columns.push(ColumnSpec::mapped(name.clone(), header));
        }

        for (name, value) in self.generated_columns.iter().flatten() {
            if !names.insert(name.clone()) {
                return Err(EtlError::malformed(
                    format!("generated_columns.{}", name),
                    "column is already declared in columns.source_mapping",
                ));
            }
            columns.push(parse_generated_column(name, value)?);
        }

        match self.output_settings.as_ref().and_then(|o| o.column_order.as_ref()) {
            Some(order) if !order.is_empty() => reorder_columns(columns, order),
            _ => Ok(columns),
        }
    }

    pub fn resolve(&self, config_path: impl Into<PathBuf>) -> Result<ResolvedConfig> {
        self.validate_config()?;

        let files = validate_required_field("files", &self.files)?;
        let input = validate_required_field("files.input_file", &files.input_file)?;
        let output = validate_required_field("files.output_file", &files.output_file)?;

        let spec = TransformSpec {
            columns: self.column_specs()?,
            filters: self.filters.clone().unwrap_or_default(),
        };
        validate_filters(&spec)?;

        let processing = self.processing.clone().unwrap_or_default();
        Ok(ResolvedConfig {
            config_path: config_path.into(),
            input_path: PathBuf::from(input),
            output_path: PathBuf::from(output),
            products_path: files.products_file.as_ref().map(PathBuf::from),
            spec,
            verbose_report: processing.verbose_logging.unwrap_or(true),
            update_counters: processing.update_counters.unwrap_or(true),
        })
    }

    /// Checks the `[files]` section.
    pub fn validate_config(&self) -> Result<()> {
        let files = validate_required_field("files", &self.files)?;
        validate_path(
            "files.input_file",
            validate_required_field("files.input_file", &files.input_file)?,
        )?;
        validate_path(
            "files.output_file",
            validate_required_field("files.output_file", &files.output_file)?,
        )?;
        if let Some(products) = &files.products_file {
            validate_path("files.products_file", products)?;
        }
        if let Some(encoding) = self.output_settings.as_ref().and_then(|o| o.encoding.as_deref()) {
            validate_encoding(encoding)?;
        }
        Ok(())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

impl ResolvedConfig {
    /// Loads and validates the settings document at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!("loading configuration from {}", path.display());
        TomlConfig::from_file(path)?.resolve(path)
    }

    pub fn with_input_override(mut self, input: Option<PathBuf>) -> Self {
        if let Some(input) = input {
            tracing::info!("input file overridden to {}", input.display());
            self.input_path = input;
        }
        self
    }

    pub fn with_output_override(mut self, output: Option<PathBuf>) -> Self {
        if let Some(output) = output {
            tracing::info!("output file overridden to {}", output.display());
            self.output_path = output;
        }
        self
    }
}

impl ConfigProvider for ResolvedConfig {
    fn input_path(&self) -> &Path {
        &self.input_path
    }

    fn output_path(&self) -> &Path {
        &self.output_path
    }

    fn transform_spec(&self) -> &TransformSpec {
        &self.spec
    }
}

/// Replaces `${VAR}` references, e.g. `${INPUT_DIR}`, with the environment value.
/// Unset variables are left as written.
fn substitute_env_vars(content: &str) -> String {
    use regex::Regex;
    use std::sync::OnceLock;

    static ENV_VAR: OnceLock<Regex> = OnceLock::new();
    let re = ENV_VAR.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env var pattern"));

    re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    })
    .into_owned()
}

/// Keys starting with `_` are annotations for humans.
fn strip_comment_keys(table: &mut toml::Table) {
    let comments: Vec<String> = table
        .keys()
        .filter(|key| key.starts_with('_'))
        .cloned()
        .collect();
    for key in comments {
        table.remove(&key);
    }
    for (_, value) in table.iter_mut() {
        strip_comment_value(value);
    }
}

fn strip_comment_value(value: &mut toml::Value) {
    match value {
        toml::Value::Table(inner) => strip_comment_keys(inner),
        toml::Value::Array(items) => items.iter_mut().for_each(strip_comment_value),
        _ => {}
    }
}

fn parse_generated_column(name: &str, value: &toml::Value) -> Result<ColumnSpec> {
    let field = format!("generated_columns.{}", name);
    let mut table = value
        .as_table()
        .cloned()
        .ok_or_else(|| EtlError::malformed(&field, "expected a table"))?;

    let kind = match table.get("type") {
        None => "static".to_string(),
        Some(toml::Value::String(kind)) => kind.clone(),
        Some(_) => return Err(EtlError::malformed(format!("{}.type", field), "must be a string")),
    };
    if !Generator::KINDS.contains(&kind.as_str()) {
        return Err(EtlError::UnsupportedGeneratorKind {
            column: name.to_string(),
            kind,
        });
    }
    table.insert("type".to_string(), toml::Value::String(kind));

    let description = match table.remove("description") {
        Some(toml::Value::String(text)) => Some(text),
        Some(_) => {
            return Err(EtlError::malformed(
                format!("{}.description", field),
                "must be a string",
            ))
        }
        None => None,
    };

    let generator: Generator = toml::Value::Table(table)
        .try_into()
        .map_err(|e: toml::de::Error| EtlError::malformed(&field, e.message().to_string()))?;

    match &generator {
        Generator::RandomHex { length } => {
            validate_positive_number(&format!("{}.length", field), *length, 1)?
        }
        Generator::Sequential { step, .. } => {
            validate_positive_number(&format!("{}.step", field), *step as usize, 1)?
        }
        Generator::Timestamp { format } => validate_timestamp_format(&field, format)?,
        Generator::Uuid | Generator::Static { .. } => {}
    }

    Ok(ColumnSpec {
        name: name.to_string(),
        source: ColumnSource::Generated(generator),
        description,
    })
}

fn validate_timestamp_format(field: &str, format: &str) -> Result<()> {
    use chrono::format::{Item, StrftimeItems};

    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(EtlError::malformed(
            format!("{}.format", field),
            format!("invalid timestamp format '{}'", format),
        ));
    }
    Ok(())
}

fn reorder_columns(mut columns: Vec<ColumnSpec>, order: &[String]) -> Result<Vec<ColumnSpec>> {
    let mut ordered = Vec::with_capacity(order.len());
    for name in order {
        let position = columns.iter().position(|c| &c.name == name).ok_or_else(|| {
            EtlError::malformed(
                "output_settings.column_order",
                format!("'{}' is neither mapped nor generated (or is listed twice)", name),
            )
        })?;
        ordered.push(columns.remove(position));
    }
    for dropped in &columns {
        tracing::debug!("column '{}' not listed in column_order; it will not be emitted", dropped.name);
    }
    Ok(ordered)
}

fn validate_encoding(encoding: &str) -> Result<()> {
    let normalized = encoding.trim().to_ascii_lowercase().replace('_', "-");
    match normalized.as_str() {
        "utf-8" | "utf8" | "utf-8-sig" => Ok(()),
        _ => Err(EtlError::malformed(
            "output_settings.encoding",
            format!("unsupported encoding '{}'; input and output are read and written as UTF-8", encoding),
        )),
    }
}

fn validate_filters(spec: &TransformSpec) -> Result<()> {
    let filters = &spec.filters;
    if !filters.remove_duplicates {
        return Ok(());
    }
    let column = filters.duplicate_check_column.as_deref().ok_or_else(|| {
        EtlError::malformed(
            "filters.duplicate_check_column",
            "required when remove_duplicates is enabled",
        )
    })?;
    if !spec.mapped_columns().any(|(name, _)| name == column) {
        return Err(EtlError::malformed(
            "filters.duplicate_check_column",
            format!("'{}' is not a mapped output column", column),
        ));
    }
    Ok(())
}
