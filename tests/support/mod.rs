use std::collections::{HashMap, VecDeque};
use std::str::FromStr;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use fillbook::fetch::FillSource;
use fillbook::models::Fill;
use rust_decimal::Decimal;

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn fill(product: &str, ts: &str, price: &str, size: &str, key: (&str, &str)) -> Fill {
    Fill::new(product, ts, dec(price), dec(size)).with_key(key.0, key.1)
}

/// Fill source that replays canned pages per product and records every request.
///
/// Once a product's pages run out it returns empty pages.
#[derive(Default)]
pub struct ScriptedFillSource {
    pages: Mutex<HashMap<String, VecDeque<Vec<Fill>>>>,
    calls: Mutex<Vec<(String, Option<i64>)>>,
}

impl ScriptedFillSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, product: &str, page: Vec<Fill>) -> Self {
        self.pages
            .lock()
            .unwrap()
            .entry(product.to_string())
            .or_default()
            .push_back(page);
        self
    }

    pub fn calls(&self) -> Vec<(String, Option<i64>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FillSource for ScriptedFillSource {
    async fn fetch_page(&self, product: &str, before: Option<i64>) -> Result<Vec<Fill>> {
        self.calls
            .lock()
            .unwrap()
            .push((product.to_string(), before));
        let page = self
            .pages
            .lock()
            .unwrap()
            .get_mut(product)
            .and_then(VecDeque::pop_front)
            .unwrap_or_default();
        Ok(page)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
