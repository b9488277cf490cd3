//! Token price table and currency conversion

use bigdecimal::{BigDecimal, One};
use std::collections::HashMap;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::fees::to_native_token_symbol;
use crate::models::TokenAmount;
use crate::numeric;

pub const COINGECKO_API: &str = "https://api.coingecko.com/api/v3";

/// Native symbol (uppercase) -> currency code (lowercase) -> price
pub type TokenPrices = HashMap<String, HashMap<String, f64>>;

/// Reference assets used to derive cross rates, in order of preference
const REFERENCE_ASSETS: [&str; 2] = ["ETH", "BTC"];

/// CoinGecko ids of the assets RenVM bridges
pub fn coingecko_id(symbol: &str) -> Option<&'static str> {
    match symbol {
        "BTC" => Some("bitcoin"),
        "ETH" => Some("ethereum"),
        "ZEC" => Some("zcash"),
        "BCH" => Some("bitcoin-cash"),
        "DOGE" => Some("dogecoin"),
        "FIL" => Some("filecoin"),
        "LUNA" => Some("terra-luna"),
        "DGB" => Some("digibyte"),
        "REN" => Some("republic-protocol"),
        _ => None,
    }
}

pub fn price_to_decimal(price: f64) -> Option<BigDecimal> {
    if !price.is_finite() {
        return None;
    }
    BigDecimal::from_str(&price.to_string()).ok()
}

fn price_of(prices: &TokenPrices, symbol: &str, currency: &str) -> Option<BigDecimal> {
    prices
        .get(symbol)
        .and_then(|quotes| quotes.get(currency))
        .copied()
        .and_then(price_to_decimal)
}

/// Rate converting an amount in `from` into `to`, derived through a
/// reference asset quoted in both currencies
pub fn get_conversion_rate(from: &str, to: &str, prices: &TokenPrices) -> Option<BigDecimal> {
    let from = from.to_lowercase();
    let to = to.to_lowercase();
    if from == to {
        return Some(BigDecimal::one());
    }

    REFERENCE_ASSETS.iter().find_map(|asset| {
        let numerator = price_of(prices, asset, &to)?;
        let denominator = price_of(prices, asset, &from)?;
        if denominator == BigDecimal::from(0) {
            return None;
        }
        Some(numerator / denominator)
    })
}

/// Fill in the ETH and USD values of `amount` from the price table
pub fn update_price(mut amount: TokenAmount, symbol: &str, prices: &TokenPrices) -> TokenAmount {
    let native = to_native_token_symbol(symbol).to_uppercase();
    let standard = numeric::to_standard_amount(&amount.amount, amount.asset.decimals);

    if let Some(usd) = price_of(prices, &native, "usd") {
        amount.amount_in_usd = standard.clone() * usd;
    }
    if let Some(eth) = price_of(prices, &native, "eth") {
        amount.amount_in_eth = standard * eth;
    }
    amount
}

/// Value of a priced token amount in `currency`. USD and ETH are read off
/// the amount; any other currency is converted from USD.
pub fn quote_amount(
    amount: &TokenAmount,
    currency: &str,
    prices: Option<&TokenPrices>,
) -> Option<BigDecimal> {
    match currency.to_lowercase().as_str() {
        "usd" => Some(amount.amount_in_usd.clone()),
        "eth" => Some(amount.amount_in_eth.clone()),
        code => {
            let rate = get_conversion_rate("usd", code, prices?)?;
            Some(amount.amount_in_usd.clone() * rate)
        }
    }
}

/// Fetch prices for `symbols` quoted in `currencies` from CoinGecko
pub async fn fetch_token_prices(
    api: &str,
    symbols: &[String],
    currencies: &[String],
) -> Result<TokenPrices> {
    let mut ids: HashMap<&'static str, String> = HashMap::new();
    for symbol in symbols {
        let native = to_native_token_symbol(symbol).to_uppercase();
        if let Some(id) = coingecko_id(&native) {
            ids.insert(id, native);
        }
    }
    // ETH is the reference asset for cross rates
    ids.insert("ethereum", "ETH".to_string());

    let id_list = ids.keys().copied().collect::<Vec<_>>().join(",");
    let mut quote_list: Vec<String> = vec!["usd".into(), "eth".into(), "btc".into()];
    for currency in currencies {
        let code = currency.to_lowercase();
        if !quote_list.contains(&code) {
            quote_list.push(code);
        }
    }

    let url = format!(
        "{}/simple/price?ids={}&vs_currencies={}",
        api.trim_end_matches('/'),
        urlencoding::encode(&id_list),
        urlencoding::encode(&quote_list.join(","))
    );
    tracing::debug!("Fetching token prices: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .map_err(|source| Error::Http {
            endpoint: api.to_string(),
            source,
        })?;

    let response = client.get(&url).send().await.map_err(|source| Error::Http {
        endpoint: api.to_string(),
        source,
    })?;

    if !response.status().is_success() {
        return Err(Error::Status {
            endpoint: api.to_string(),
            status: response.status(),
        });
    }

    let body: HashMap<String, HashMap<String, f64>> =
        response.json().await.map_err(|source| Error::Http {
            endpoint: api.to_string(),
            source,
        })?;

    Ok(body
        .into_iter()
        .filter_map(|(id, quotes)| ids.get(id.as_str()).map(|symbol| (symbol.clone(), quotes)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::Zero;

    fn table() -> TokenPrices {
        let mut prices = TokenPrices::new();
        prices.insert(
            "ETH".to_string(),
            HashMap::from([
                ("usd".to_string(), 2000.0),
                ("eur".to_string(), 1800.0),
                ("eth".to_string(), 1.0),
            ]),
        );
        prices.insert(
            "BTC".to_string(),
            HashMap::from([("usd".to_string(), 40000.0), ("eth".to_string(), 20.0)]),
        );
        prices
    }

    #[test]
    fn test_conversion_rate_through_reference_asset() {
        let prices = table();
        assert_eq!(
            get_conversion_rate("USD", "EUR", &prices),
            Some(BigDecimal::from_str("0.9").unwrap())
        );
        assert_eq!(get_conversion_rate("usd", "usd", &prices), Some(BigDecimal::one()));
        assert_eq!(get_conversion_rate("usd", "jpy", &prices), None);
    }

    #[test]
    fn test_update_price_uses_native_symbol() {
        let prices = table();
        let amount = TokenAmount::new("renBTC", 8, BigDecimal::from(50_000_000));
        let priced = update_price(amount, "renBTC", &prices);

        assert_eq!(priced.amount_in_usd, BigDecimal::from(20000));
        assert_eq!(priced.amount_in_eth, BigDecimal::from(10));
    }

    #[test]
    fn test_update_price_unknown_asset_stays_zero() {
        let prices = table();
        let amount = TokenAmount::new("DGB", 8, BigDecimal::from(1));
        let priced = update_price(amount, "DGB", &prices);
        assert!(priced.amount_in_usd.is_zero());
    }

    #[test]
    fn test_quote_amount() {
        let prices = table();
        let amount = update_price(
            TokenAmount::new("BTC", 8, BigDecimal::from(100_000_000)),
            "BTC",
            &prices,
        );

        assert_eq!(quote_amount(&amount, "USD", None), Some(BigDecimal::from(40000)));
        assert_eq!(quote_amount(&amount, "eth", None), Some(BigDecimal::from(20)));
        assert_eq!(
            quote_amount(&amount, "eur", Some(&prices)),
            Some(BigDecimal::from(36000))
        );
        assert_eq!(quote_amount(&amount, "eur", None), None);
    }

    #[tokio::test]
    async fn test_fetch_token_prices_maps_ids_back_to_symbols() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"bitcoin":{"usd":40000.0,"eth":20.0},"ethereum":{"usd":2000.0}}"#)
            .create_async()
            .await;

        let prices = fetch_token_prices(&server.url(), &["renBTC".to_string()], &[])
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(prices["BTC"]["usd"], 40000.0);
        assert_eq!(prices["ETH"]["usd"], 2000.0);
    }
}
