use std::collections::HashMap;

use serde::Deserialize;
use tracing::debug;

use crate::error::StockscanError;
use crate::model::PricingDetails;
use crate::pricing::{summarize_offers, Offer, PriceLookupService};

pub const DEFAULT_BASE_URL: &str = "https://api.pricerunner.com";

/// Price lookup against the PriceRunner public offers API.
pub struct PriceRunnerClient {
    client: reqwest::blocking::Client,
    base_url: String,
    country: String,
    token: String,
}

impl PriceRunnerClient {
    pub fn new(base_url: &str, country: &str, token: &str) -> Result<Self, StockscanError> {
        let client = reqwest::blocking::Client::builder().build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            country: country.to_string(),
            token: token.to_string(),
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/public/v2/product/offers/{}/gtin14s",
            self.base_url, self.country
        )
    }
}

impl PriceLookupService for PriceRunnerClient {
    fn lookup(&self, gtin14s: &[String]) -> Result<HashMap<String, PricingDetails>, StockscanError> {
        let params: Vec<(&str, &str)> = gtin14s.iter().map(|g| ("gtin14s", g.as_str())).collect();

        let response = self
            .client
            .get(self.url())
            .query(&params)
            .header("tokenId", &self.token)
            .send()?;

        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(StockscanError::PriceLookup(format!("{status} - {body}")));
        }

        parse_offers(&body, gtin14s)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OffersResponse {
    #[serde(default)]
    product_listings: Vec<ProductListing>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductListing {
    product_listing_product: ListingProduct,
    #[serde(default)]
    offers: Vec<RawOffer>,
}

#[derive(Debug, Deserialize)]
struct ListingProduct {
    #[serde(default)]
    gtin14s: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOffer {
    price: Money,
    shipping_cost: Option<Money>,
    #[serde(default)]
    merchant_name: String,
}

#[derive(Debug, Deserialize)]
struct Money {
    value: Amount,
}

/// The API sends amounts as decimal strings; plain numbers are accepted too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Amount {
    Number(f64),
    Text(String),
}

impl Amount {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Amount::Number(n) => Some(*n),
            Amount::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Map a response body to pricing details for each requested GTIN that
/// appears in a listing.
fn parse_offers(
    body: &str,
    requested: &[String],
) -> Result<HashMap<String, PricingDetails>, StockscanError> {
    let response: OffersResponse = serde_json::from_str(body)?;

    let mut out = HashMap::new();
    for listing in response.product_listings {
        let offers: Vec<Offer> = listing
            .offers
            .iter()
            .filter_map(|raw| {
                let price = raw.price.value.as_f64()?;
                let shipping = match &raw.shipping_cost {
                    Some(cost) => cost.value.as_f64()?,
                    None => 0.0,
                };
                Some(Offer {
                    total_price: price + shipping,
                    merchant: raw.merchant_name.clone(),
                })
            })
            .collect();

        let Some(details) = summarize_offers(&offers) else {
            continue;
        };

        for gtin in requested {
            if listing.product_listing_product.gtin14s.contains(gtin) {
                out.insert(gtin.clone(), details.clone());
            }
        }
    }
    debug!(requested = requested.len(), found = out.len(), "price lookup batch");
    Ok(out)
}
