use anyhow::Result;
use csv_refinery::config::counter_store::scan_max_id;
use csv_refinery::core::commands;
use csv_refinery::core::report::OutputArtifact;
use csv_refinery::domain::ports::CounterStore;
use csv_refinery::{EtlError, ResolvedConfig, TomlCounterStore};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Result<Self> {
        Ok(Self {
            dir: TempDir::new()?,
        })
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Forward slashes keep Windows paths valid inside TOML strings.
    fn toml_path(&self, name: &str) -> String {
        self.path(name).to_string_lossy().replace('\\', "/")
    }

    fn write(&self, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.path(name);
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Writes `config.toml` pointing at `source.csv` / `cleaned.csv`, followed by `body`.
    fn config(&self, body: &str) -> Result<PathBuf> {
        let content = format!(
            "[files]\ninput_file = \"{}\"\noutput_file = \"{}\"\nproducts_file = \"{}\"\n\n{}",
            self.toml_path("source.csv"),
            self.toml_path("cleaned.csv"),
            self.toml_path("products.csv"),
            body
        );
        self.write("config.toml", &content)
    }

    fn output(&self) -> Result<String> {
        Ok(std::fs::read_to_string(self.path("cleaned.csv"))?)
    }
}

const PRODUCT_MAPPING: &str = r#"
[columns.source_mapping]
link = "url"
image = "img"
price = "cost"
title = "name"
"#;

const SOURCE: &str = "url,img,cost,name\nu1,i1,10,Lens\nu2,i2,,Tripod\nu3,i3,30,Strap\n";

#[test]
fn test_blank_row_example() -> Result<()> {
    let ws = Workspace::new()?;
    ws.write("source.csv", SOURCE)?;
    let config = ResolvedConfig::load(ws.config(PRODUCT_MAPPING)?)?;

    let summary = commands::clean(&config)?;

    assert_eq!(summary.total, 3);
    assert_eq!(summary.kept, 2);
    assert_eq!(summary.dropped, 1);
    assert_eq!(
        ws.output()?,
        "link,image,price,title\nu1,i1,10,Lens\nu3,i3,30,Strap\n"
    );
    Ok(())
}

#[test]
fn test_sequential_ids_and_persisted_counter() -> Result<()> {
    let ws = Workspace::new()?;
    ws.write("source.csv", SOURCE)?;
    let body = format!(
        "{}\n[generated_columns.product_id]\ntype = \"sequential\"\nstart = 1094100\n\n[output_settings]\ncolumn_order = [\"product_id\", \"title\", \"price\"]\n",
        PRODUCT_MAPPING
    );
    let config_path = ws.config(&body)?;
    let config = ResolvedConfig::load(&config_path)?;

    let summary = commands::clean(&config)?;

    assert_eq!(
        ws.output()?,
        "product_id,title,price\n1094100,Lens,10\n1094101,Strap,30\n"
    );
    let range = summary.id_range("product_id").unwrap();
    assert_eq!((range.first, range.last), (1094100, 1094101));

    let store = TomlCounterStore::new(&config_path);
    assert_eq!(store.read_next("product_id", 1)?, 1094102);

    // The next run continues where this one stopped.
    let config = ResolvedConfig::load(&config_path)?;
    commands::clean(&config)?;
    assert!(ws.output()?.contains("1094102,Lens,10"));
    assert_eq!(store.read_next("product_id", 1)?, 1094104);
    Ok(())
}

#[test]
fn test_counter_untouched_when_updates_disabled() -> Result<()> {
    let ws = Workspace::new()?;
    ws.write("source.csv", SOURCE)?;
    let body = format!(
        "{}\n[generated_columns.product_id]\ntype = \"sequential\"\nstart = 50\n\n[processing]\nupdate_counters = false\n",
        PRODUCT_MAPPING
    );
    let config_path = ws.config(&body)?;
    let before = std::fs::read_to_string(&config_path)?;

    commands::clean(&ResolvedConfig::load(&config_path)?)?;

    assert_eq!(std::fs::read_to_string(&config_path)?, before);
    Ok(())
}

#[test]
fn test_missing_source_column_leaves_output_untouched() -> Result<()> {
    let ws = Workspace::new()?;
    ws.write("source.csv", "url,img,name\nu1,i1,Lens\n")?;
    ws.write("cleaned.csv", "previous,run\n")?;
    let body = format!(
        "{}\n[generated_columns.product_id]\ntype = \"sequential\"\nstart = 9\n",
        PRODUCT_MAPPING
    );
    let config_path = ws.config(&body)?;
    let config = ResolvedConfig::load(&config_path)?;

    match commands::clean(&config) {
        Err(EtlError::MissingRequiredColumns { missing, .. }) => assert_eq!(missing, vec!["cost"]),
        other => panic!("unexpected: {other:?}"),
    }

    assert_eq!(ws.output()?, "previous,run\n");
    assert_eq!(TomlCounterStore::new(&config_path).read_next("product_id", 1)?, 9);
    Ok(())
}

#[test]
fn test_missing_source_column_creates_no_output() -> Result<()> {
    let ws = Workspace::new()?;
    ws.write("source.csv", "url\nu1\n")?;
    let config = ResolvedConfig::load(ws.config(PRODUCT_MAPPING)?)?;

    assert!(commands::clean(&config).is_err());
    assert!(!ws.path("cleaned.csv").exists());
    Ok(())
}

#[test]
fn test_empty_input_writes_header_only() -> Result<()> {
    let ws = Workspace::new()?;
    ws.write("source.csv", "url,img,cost,name\n")?;
    let config = ResolvedConfig::load(ws.config(PRODUCT_MAPPING)?)?;

    let summary = commands::clean(&config)?;

    assert!(summary.is_empty_input());
    assert_eq!(ws.output()?, "link,image,price,title\n");
    Ok(())
}

#[test]
fn test_output_order_independent_of_input_order() -> Result<()> {
    let ws = Workspace::new()?;
    ws.write(
        "source.csv",
        "name,extra,cost,img,url\nLens,x,10,i1,u1\n",
    )?;
    let config = ResolvedConfig::load(ws.config(PRODUCT_MAPPING)?)?;

    commands::clean(&config)?;

    assert_eq!(ws.output()?, "link,image,price,title\nu1,i1,10,Lens\n");
    Ok(())
}

#[test]
fn test_rerun_without_generators_is_byte_identical() -> Result<()> {
    let ws = Workspace::new()?;
    ws.write("source.csv", SOURCE)?;
    let body = format!(
        "{}\n[generated_columns.category]\ntype = \"static\"\nvalue = \"Camera Accessories\"\n",
        PRODUCT_MAPPING
    );
    let config = ResolvedConfig::load(ws.config(&body)?)?;

    commands::clean(&config)?;
    let first = ws.output()?;
    commands::clean(&config)?;

    assert_eq!(ws.output()?, first);
    Ok(())
}

#[test]
fn test_duplicates_removed_first_wins() -> Result<()> {
    let ws = Workspace::new()?;
    ws.write(
        "source.csv",
        "url,img,cost,name\nu1,i1,10,first\nu2,i2,20,other\nu1,i3,30,second\n",
    )?;
    let body = format!(
        "{}\n[filters]\nremove_blank_rows = true\nremove_duplicates = true\nduplicate_check_column = \"link\"\n",
        PRODUCT_MAPPING
    );
    let config = ResolvedConfig::load(ws.config(&body)?)?;

    let summary = commands::clean(&config)?;

    assert_eq!(summary.duplicate_rows, 1);
    assert_eq!(summary.kept + summary.dropped, summary.total);
    let artifact = OutputArtifact::open(ws.path("cleaned.csv"))?;
    assert_eq!(artifact.column_sample("title", 10)?, vec!["first", "other"]);
    Ok(())
}

#[test]
fn test_cli_paths_override_config() -> Result<()> {
    let ws = Workspace::new()?;
    let alt_input = ws.write("alt.csv", "url,img,cost,name\nu9,i9,90,Bag\n")?;
    let alt_output = ws.path("alt_out.csv");
    let config = ResolvedConfig::load(ws.config(PRODUCT_MAPPING)?)?
        .with_input_override(Some(alt_input))
        .with_output_override(Some(alt_output.clone()));

    commands::clean(&config)?;

    assert_eq!(
        std::fs::read_to_string(alt_output)?,
        "link,image,price,title\nu9,i9,90,Bag\n"
    );
    assert!(!ws.path("cleaned.csv").exists());
    Ok(())
}

#[test]
fn test_maxid_reconciliation() -> Result<()> {
    let ws = Workspace::new()?;
    let body = format!(
        "{}\n[generated_columns.product_id]\ntype = \"sequential\"\nstart = 1\n",
        PRODUCT_MAPPING
    );
    let config_path = ws.config(&body)?;
    ws.write("products.csv", "product_id,title\n5,a\n12,b\n7,c\n")?;
    assert_eq!(scan_max_id(&ws.path("products.csv"))?, Some(12));

    let next = commands::maxid(&ResolvedConfig::load(&config_path)?, None, None)?;

    assert_eq!(next, 13);
    assert_eq!(TomlCounterStore::new(&config_path).read_next("product_id", 1)?, 13);
    let reloaded = ResolvedConfig::load(&config_path)?;
    assert_eq!(reloaded.spec.output_headers().len(), 5);
    Ok(())
}

#[test]
fn test_maxid_rejects_non_sequential_key() -> Result<()> {
    let ws = Workspace::new()?;
    let body = format!(
        "{}\n[generated_columns.product_id]\ntype = \"sequential\"\n\n[generated_columns.sku]\ntype = \"random_hex\"\n",
        PRODUCT_MAPPING
    );
    let config = ResolvedConfig::load(ws.config(&body)?)?;
    ws.write("products.csv", "id\n3\n")?;

    let result = commands::maxid(&config, None, Some("sku".to_string()));

    assert!(matches!(result, Err(EtlError::ConfigMalformed { .. })));
    Ok(())
}

#[test]
fn test_missing_config_file() {
    let missing = Path::new("definitely/not/here/config.toml");
    assert!(matches!(
        ResolvedConfig::load(missing),
        Err(EtlError::ConfigMissing { .. })
    ));
}
