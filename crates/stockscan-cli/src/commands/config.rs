use std::path::Path;

use stockscan_core::config::load_config;
use stockscan_core::error::StockscanError;

pub fn check(config_path: &Path) -> Result<(), StockscanError> {
    let config = load_config(config_path)?;

    let missing = config.secrets.missing_for_run();
    for name in &missing {
        eprintln!("  missing: secrets.{name}");
    }
    config.secrets.require_for_run()?;

    println!("{}: OK", config_path.display());
    println!("  lookback:   {} day(s)", config.app.days);
    println!("  output dir: {}", config.app.output_dir.display());
    match &config.app.log_dir {
        Some(dir) => println!("  log dir:    {}", dir.display()),
        None => println!("  log dir:    (stderr only)"),
    }
    println!("  oracle:     {} ({}s timeout)", config.oracle.model, config.oracle.timeout_secs);
    println!(
        "  pricing:    {} in batches of {}",
        config.pricing.country, config.pricing.batch_size
    );
    Ok(())
}
