mod orchestrator;

pub use orchestrator::FillSync;

/// Outcome of paging through one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSyncResult {
    pub product: String,
    /// Non-empty pages stored.
    pub pages: u32,
    pub fills: usize,
    /// True when the page limit stopped pagination before an empty page.
    pub truncated: bool,
}

impl ProductSyncResult {
    pub fn new(product: impl Into<String>) -> Self {
        Self {
            product: product.into(),
            pages: 0,
            fills: 0,
            truncated: false,
        }
    }
}

/// Totals across a fetch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncResult {
    pub products: usize,
    pub pages: u64,
    pub fills: usize,
    pub truncated: Vec<String>,
}

impl SyncResult {
    pub fn record(&mut self, product: ProductSyncResult) {
        self.products += 1;
        self.pages += u64::from(product.pages);
        self.fills += product.fills;
        if product.truncated {
            self.truncated.push(product.product);
        }
    }
}
