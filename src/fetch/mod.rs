mod dexterity;

pub use dexterity::{DexterityFillSource, DEXTERITY_API_BASE};

use anyhow::Result;

use crate::models::Fill;

/// A paginated source of fills for one product.
#[async_trait::async_trait]
pub trait FillSource: Send + Sync {
    /// Fetch one page of fills for `product`, newest first.
    ///
    /// `before` is a Unix timestamp; only fills strictly older are returned.
    /// An empty page means there is nothing older.
    async fn fetch_page(&self, product: &str, before: Option<i64>) -> Result<Vec<Fill>>;

    fn name(&self) -> &str;
}
