mod support;

use std::sync::Arc;

use anyhow::Result;
use fillbook::store::FillStore;
use fillbook::sync::FillSync;
use support::{dec, fill, ScriptedFillSource};

const PRODUCT: &str = "BITCOIN0D230102";

fn two_page_source() -> ScriptedFillSource {
    ScriptedFillSource::new()
        .with_page(
            PRODUCT,
            vec![
                fill(PRODUCT, "Mon, 02 Jan 2023 12:00:00 GMT", "16000", "1", ("m1", "1")),
                fill(PRODUCT, "Mon, 02 Jan 2023 10:00:00 GMT", "16000", "0.5", ("m2", "2")),
            ],
        )
        .with_page(
            PRODUCT,
            vec![
                // Boundary fill repeated from the previous page.
                fill(PRODUCT, "Mon, 02 Jan 2023 10:00:00 GMT", "16000", "0.5", ("m2", "2")),
                fill(PRODUCT, "Sun, 01 Jan 2023 10:00:00 GMT", "15000", "2", ("m3", "3")),
            ],
        )
}

#[tokio::test]
async fn sync_walks_pages_until_empty() -> Result<()> {
    let source = Arc::new(two_page_source());
    let mut store = FillStore::open_in_memory()?;

    let result = FillSync::new(source.clone())
        .sync_product(&mut store, PRODUCT)
        .await?;

    assert_eq!(result.pages, 2);
    assert_eq!(result.fills, 4);
    assert!(!result.truncated);
    assert_eq!(
        source.calls(),
        vec![
            (PRODUCT.to_string(), None),
            (PRODUCT.to_string(), Some(1672653600)),
            (PRODUCT.to_string(), Some(1672567200)),
        ]
    );

    assert_eq!(store.count()?, 4);
    assert_eq!(store.deduplicate()?, 1);
    assert_eq!(store.count()?, 3);
    assert_eq!(store.total_volume()?, Some(dec("54000")));
    Ok(())
}

#[tokio::test]
async fn sync_stops_at_page_limit() -> Result<()> {
    let source = Arc::new(two_page_source());
    let mut store = FillStore::open_in_memory()?;

    let result = FillSync::new(source.clone())
        .with_max_pages(Some(1))
        .sync_product(&mut store, PRODUCT)
        .await?;

    assert_eq!(result.pages, 1);
    assert!(result.truncated);
    assert_eq!(source.calls().len(), 1);
    assert_eq!(store.count()?, 2);
    Ok(())
}

#[tokio::test]
async fn sync_products_visits_each_product_in_order() -> Result<()> {
    let source = Arc::new(
        two_page_source().with_page(
            "ETH0D230102",
            vec![fill("ETH0D230102", "Mon, 02 Jan 2023 09:00:00 GMT", "1200", "1", ("e1", "1"))],
        ),
    );
    let mut store = FillStore::open_in_memory()?;
    let products = vec![
        "OPOS0D230102".to_string(),
        PRODUCT.to_string(),
        "ETH0D230102".to_string(),
    ];

    let result = FillSync::new(source.clone())
        .sync_products(&mut store, &products)
        .await?;

    assert_eq!(result.products, 3);
    assert_eq!(result.pages, 3);
    assert_eq!(result.fills, 5);
    assert!(result.truncated.is_empty());

    let requested: Vec<String> = source.calls().into_iter().map(|(p, _)| p).collect();
    assert_eq!(
        requested,
        vec![
            "OPOS0D230102",
            PRODUCT,
            PRODUCT,
            PRODUCT,
            "ETH0D230102",
            "ETH0D230102",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn sync_rejects_unparseable_cursor() -> Result<()> {
    let source = Arc::new(ScriptedFillSource::new().with_page(
        PRODUCT,
        vec![fill(PRODUCT, "2023-01-02T10:00:00Z", "16000", "1", ("m1", "1"))],
    ));
    let mut store = FillStore::open_in_memory()?;

    let err = FillSync::new(source)
        .sync_product(&mut store, PRODUCT)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("Invalid pagination cursor"));
    // The page is committed before the cursor is derived.
    assert_eq!(store.count()?, 1);
    Ok(())
}
