//! Drives paginated fetching of fills into the store.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::fetch::FillSource;
use crate::store::FillStore;
use crate::timestamp::parse_block_timestamp;

use super::{ProductSyncResult, SyncResult};

/// Walks each product's fills from newest to oldest, one page at a time.
pub struct FillSync {
    source: Arc<dyn FillSource>,
    /// Stop a product after this many non-empty pages. None means unbounded.
    max_pages: Option<u32>,
    progress: bool,
}

impl FillSync {
    pub fn new(source: Arc<dyn FillSource>) -> Self {
        Self {
            source,
            max_pages: None,
            progress: false,
        }
    }

    pub fn with_max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Print per-page progress lines to stdout.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Fetch every page for `product`, committing each page before the next request.
    ///
    /// The cursor for the next page is the block timestamp of the last (oldest)
    /// fill of the current one. Stops on the first empty page.
    pub async fn sync_product(
        &self,
        store: &mut FillStore,
        product: &str,
    ) -> Result<ProductSyncResult> {
        let mut result = ProductSyncResult::new(product);
        let mut before: Option<i64> = None;

        loop {
            if let Some(max_pages) = self.max_pages {
                if result.pages >= max_pages {
                    warn!(product, max_pages, "Page limit reached; stopping early");
                    result.truncated = true;
                    break;
                }
            }

            self.report_request(product, before);
            let page = self
                .source
                .fetch_page(product, before)
                .await
                .with_context(|| format!("Failed to fetch fills for {product}"))?;
            self.report_success();

            let Some(oldest) = page.last() else {
                break;
            };

            store.insert(&page)?;
            result.pages += 1;
            result.fills += page.len();

            let next = parse_block_timestamp(&oldest.block_timestamp)
                .with_context(|| format!("Invalid pagination cursor for {product}"))?;
            if self.progress {
                println!(
                    "oldest timestamp = {}. before = {}",
                    oldest.block_timestamp, next
                );
            }

            if let Some(previous) = before {
                if next >= previous {
                    warn!(product, previous, next, "Pagination cursor did not move back");
                }
            }
            debug!(product, page = result.pages, fills = page.len(), before = next, "Stored page");
            before = Some(next);
        }

        Ok(result)
    }

    /// Sync each product in order.
    pub async fn sync_products(
        &self,
        store: &mut FillStore,
        products: &[String],
    ) -> Result<SyncResult> {
        let mut result = SyncResult::default();

        for product in products {
            let product_result = self.sync_product(store, product).await?;
            if product_result.fills > 0 {
                info!(
                    product = %product_result.product,
                    pages = product_result.pages,
                    fills = product_result.fills,
                    source = self.source.name(),
                    "Synced product"
                );
            }
            result.record(product_result);
        }

        info!(
            products = result.products,
            pages = result.pages,
            fills = result.fills,
            "Fetch complete"
        );
        Ok(result)
    }

    fn report_request(&self, product: &str, before: Option<i64>) {
        if !self.progress {
            return;
        }
        let before = before.map_or_else(|| "None".to_string(), |b| b.to_string());
        print!("getting fills for {product} before {before}...");
        let _ = std::io::stdout().flush();
    }

    fn report_success(&self) {
        if self.progress {
            println!("success!");
        }
    }
}
