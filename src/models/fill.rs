use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize};

/// Length of the `0DYYMMDD` expiry suffix carried by every product symbol.
pub const PRODUCT_SUFFIX_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TakerSide {
    #[serde(alias = "Buy", alias = "BUY", alias = "bid")]
    Buy,
    #[serde(alias = "Sell", alias = "SELL", alias = "ask")]
    Sell,
}

impl TakerSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TakerSide::Buy => "buy",
            TakerSide::Sell => "sell",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "buy" | "bid" => Some(TakerSide::Buy),
            "sell" | "ask" => Some(TakerSide::Sell),
            _ => None,
        }
    }
}

/// One matched trade as reported by the fills endpoint.
///
/// Identifiers are kept as strings so that large integer ids survive the
/// round trip through JSON and SQLite unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub base_size: Decimal,
    pub block_timestamp: String,
    pub inserted_at: String,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub maker_client_order_id: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub maker_order_id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub maker_order_nonce: String,
    pub maker_trg: String,
    pub mpg: String,
    pub price: Decimal,
    pub product: String,
    pub quote_size: Decimal,
    pub slot: u64,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub taker_client_order_id: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub taker_order_nonce: String,
    pub taker_side: TakerSide,
    pub taker_trg: String,
    pub tx_sig: String,
}

impl Fill {
    /// Minimal fill for a product; remaining fields get placeholder values.
    pub fn new(
        product: impl Into<String>,
        block_timestamp: impl Into<String>,
        price: Decimal,
        base_size: Decimal,
    ) -> Self {
        let block_timestamp = block_timestamp.into();
        Self {
            base_size,
            inserted_at: block_timestamp.clone(),
            block_timestamp,
            maker_client_order_id: None,
            maker_order_id: String::new(),
            maker_order_nonce: "0".to_string(),
            maker_trg: String::new(),
            mpg: String::new(),
            price,
            product: product.into(),
            quote_size: notional(price, base_size).unwrap_or_default(),
            slot: 0,
            taker_client_order_id: None,
            taker_order_nonce: "0".to_string(),
            taker_side: TakerSide::Buy,
            taker_trg: String::new(),
            tx_sig: String::new(),
        }
    }

    pub fn with_key(
        mut self,
        maker_order_id: impl Into<String>,
        taker_order_nonce: impl Into<String>,
    ) -> Self {
        self.maker_order_id = maker_order_id.into();
        self.taker_order_nonce = taker_order_nonce.into();
        self
    }

    pub fn with_side(mut self, side: TakerSide) -> Self {
        self.taker_side = side;
        self
    }

    pub fn with_slot(mut self, slot: u64) -> Self {
        self.slot = slot;
        self
    }
}

/// Notional value of a fill, `price * base_size`. `None` on overflow.
pub fn notional(price: Decimal, base_size: Decimal) -> Option<Decimal> {
    price.checked_mul(base_size)
}

/// Underlying asset of a product symbol: the symbol minus its expiry suffix.
///
/// `"BITCOIN0D230615"` maps to `"BITCOIN"`. Symbols no longer than the
/// suffix map to an empty string.
pub fn underlying(product: &str) -> &str {
    let keep = product.chars().count().saturating_sub(PRODUCT_SUFFIX_LEN);
    match product.char_indices().nth(keep) {
        Some((end, _)) => &product[..end],
        None => product,
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(s) => Ok(Some(s)),
        serde_json::Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(de::Error::custom(format!(
            "expected string, number or null, got {other}"
        ))),
    }
}
