use std::path::{Path, PathBuf};

use stockscan_core::config::{load_config, AppConfig};
use stockscan_core::error::StockscanError;
use stockscan_core::extraction::calamine_reader::CalamineWorkbookReader;
use stockscan_core::model::FieldLabelMap;
use stockscan_core::oracle::openai::OpenAiOracle;
use stockscan_core::oracle::{HeaderOracle, StaticOracle};

use crate::{logging, output};

/// Header labels given on the command line.
pub struct LabelArgs {
    pub barcode: Option<String>,
    pub quantity: Option<String>,
    pub product: Option<String>,
    pub price: Option<String>,
}

impl LabelArgs {
    fn to_labels(&self) -> Option<FieldLabelMap> {
        let given = [&self.barcode, &self.quantity, &self.product, &self.price];
        if given.iter().all(|l| l.is_none()) {
            return None;
        }
        let label = |l: &Option<String>| l.clone().unwrap_or_default();
        Some(FieldLabelMap::from_labels(
            &label(&self.barcode),
            &label(&self.quantity),
            &label(&self.product),
            &label(&self.price),
        ))
    }
}

pub fn run(
    input_file: PathBuf,
    labels: LabelArgs,
    config_path: &Path,
    output_format: &str,
) -> Result<(), StockscanError> {
    let bytes = std::fs::read(&input_file)?;
    let name = input_file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| input_file.display().to_string());

    let oracle: Box<dyn HeaderOracle> = match labels.to_labels() {
        Some(fixed) => {
            logging::init(None)?;
            Box::new(StaticOracle::new(fixed))
        }
        None => {
            let config = load_optional(config_path)?;
            logging::init(config.app.log_dir.as_deref())?;
            Box::new(OpenAiOracle::new(
                &config.oracle.base_url,
                config.secrets.openai_api_key()?,
                &config.oracle.model,
                config.oracle.timeout(),
            )?)
        }
    };

    let reader = CalamineWorkbookReader::new();
    let sheets = stockscan_core::extract_workbook(&name, &bytes, &reader, oracle.as_ref(), &name)?;

    match output_format {
        "json" => output::json::print(&sheets)?,
        _ => output::table::print(&name, &sheets),
    }
    Ok(())
}

/// The configuration file, or defaults when it does not exist.
fn load_optional(path: &Path) -> Result<AppConfig, StockscanError> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(AppConfig::default())
    }
}
