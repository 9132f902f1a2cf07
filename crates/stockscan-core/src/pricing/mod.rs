pub mod pricerunner;

use std::collections::HashMap;

use tracing::{debug, info};

use crate::error::StockscanError;
use crate::model::{CellValue, ConsolidatedSheetItem, PricingDetails};

/// Barcodes per lookup request.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Third-party price lookup keyed by GTIN-14.
pub trait PriceLookupService {
    /// Look up at most one batch of normalized GTIN-14 barcodes. Barcodes
    /// without offers are absent from the result.
    fn lookup(&self, gtin14s: &[String]) -> Result<HashMap<String, PricingDetails>, StockscanError>;
}

/// A single offer: item price plus shipping, and who sells it.
#[derive(Debug, Clone, PartialEq)]
pub struct Offer {
    pub total_price: f64,
    pub merchant: String,
}

/// Normalize a barcode cell to 14 digits: dashes removed, left-padded with
/// zeros. Blank cells have no GTIN.
pub fn normalize_gtin14(barcode: &CellValue) -> Option<String> {
    let raw = match barcode {
        CellValue::Empty => return None,
        CellValue::Int(i) => i.to_string(),
        CellValue::Float(f) if f.fract() == 0.0 => format!("{f:.0}"),
        CellValue::Float(f) => f.to_string(),
        CellValue::Text(s) => s.trim().replace('-', ""),
    };
    if raw.is_empty() {
        return None;
    }
    Some(format!("{raw:0>14}"))
}

/// Summarize the offers of one product listing.
///
/// Median and average are rounded to two decimals. Lowest and highest keep
/// the first offer seen at that price.
pub fn summarize_offers(offers: &[Offer]) -> Option<PricingDetails> {
    let first = offers.first()?;

    let mut lowest = first;
    let mut highest = first;
    for offer in &offers[1..] {
        if offer.total_price < lowest.total_price {
            lowest = offer;
        }
        if offer.total_price > highest.total_price {
            highest = offer;
        }
    }

    let mut prices: Vec<f64> = offers.iter().map(|o| o.total_price).collect();
    prices.sort_by(f64::total_cmp);
    let mid = prices.len() / 2;
    let median = if prices.len() % 2 == 0 {
        (prices[mid - 1] + prices[mid]) / 2.0
    } else {
        prices[mid]
    };
    let average = prices.iter().sum::<f64>() / prices.len() as f64;

    Some(PricingDetails {
        median: Some(round2(median)),
        lowest_price: Some(lowest.total_price),
        lowest_price_retailer: Some(lowest.merchant.clone()),
        highest_price: Some(highest.total_price),
        highest_price_retailer: Some(highest.merchant.clone()),
        average_price: Some(round2(average)),
    })
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Fill `pricing_details` on every item whose barcode has offers.
///
/// Barcodes are looked up in sequential batches. A failed batch is logged
/// and its items stay unpriced. Returns the number of items priced.
pub fn enrich_prices(
    items: &mut [ConsolidatedSheetItem],
    service: &dyn PriceLookupService,
    batch_size: usize,
) -> usize {
    let mut gtins: Vec<String> = Vec::new();
    for item in items.iter() {
        if let Some(gtin) = normalize_gtin14(&item.barcode) {
            if !gtins.contains(&gtin) {
                gtins.push(gtin);
            }
        }
    }
    if gtins.is_empty() {
        return 0;
    }

    info!(barcodes = gtins.len(), "fetching price details");
    let mut found: HashMap<String, PricingDetails> = HashMap::new();
    for batch in gtins.chunks(batch_size.max(1)) {
        match service.lookup(batch) {
            Ok(details) => found.extend(details),
            Err(e) => debug!(batch = batch.len(), "price lookup failed: {e}"),
        }
    }

    let mut priced = 0;
    for item in items.iter_mut() {
        let details = normalize_gtin14(&item.barcode).and_then(|gtin| found.get(&gtin));
        if let Some(details) = details {
            item.pricing_details = details.clone();
            priced += 1;
        }
    }
    priced
}
