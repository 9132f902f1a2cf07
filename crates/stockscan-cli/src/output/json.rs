use stockscan_core::error::StockscanError;
use stockscan_core::SheetResult;

pub fn print(sheets: &[SheetResult]) -> Result<(), StockscanError> {
    let json = serde_json::to_string_pretty(sheets)?;
    println!("{json}");
    Ok(())
}
