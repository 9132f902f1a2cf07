use std::path::Path;

use stockscan_core::config::load_config;
use stockscan_core::error::StockscanError;
use stockscan_core::extraction::calamine_reader::CalamineWorkbookReader;
use stockscan_core::mail::graph::{GraphMessageSource, RefreshTokenProvider};
use stockscan_core::mail::TokenProvider;
use stockscan_core::oracle::openai::OpenAiOracle;
use stockscan_core::pricing::pricerunner::PriceRunnerClient;
use stockscan_core::report::xlsx::XlsxReportWriter;
use stockscan_core::{run_pipeline, Collaborators, RunContext};

use crate::logging;

pub fn run(config_path: &Path) -> Result<(), StockscanError> {
    let config = load_config(config_path)?;
    config.secrets.require_for_run()?;
    logging::init(config.app.log_dir.as_deref())?;

    let secrets = &config.secrets;
    let refresher: Option<Box<dyn TokenProvider>> =
        match (secrets.client_id.as_deref(), secrets.mail_refresh_token.as_deref()) {
            (Some(client_id), Some(refresh)) if !refresh.trim().is_empty() => {
                Some(Box::new(RefreshTokenProvider::new(client_id, refresh)?))
            }
            _ => None,
        };
    let source = GraphMessageSource::new(
        secrets.mail_access_token.as_deref().unwrap_or_default(),
        refresher,
        config.app.days,
    )?;
    let oracle = OpenAiOracle::new(
        &config.oracle.base_url,
        secrets.openai_api_key()?,
        &config.oracle.model,
        config.oracle.timeout(),
    )?;
    let prices = PriceRunnerClient::new(
        &config.pricing.base_url,
        &config.pricing.country,
        secrets.price_runner_token.as_deref().unwrap_or_default(),
    )?;
    let reader = CalamineWorkbookReader::new();

    let ctx = RunContext::create(config.clone())?;
    let writer = XlsxReportWriter::in_dir(&ctx.run_dir);

    eprintln!("Downloading messages from the last {} day(s)", config.app.days);
    let written = run_pipeline(
        &ctx,
        &Collaborators {
            source: &source,
            reader: &reader,
            oracle: &oracle,
            prices: &prices,
            writer: &writer,
        },
    )?;

    match written {
        Some(path) => eprintln!("Report written to {}", path.display()),
        None => eprintln!("No messages with Excel attachments found"),
    }
    Ok(())
}
