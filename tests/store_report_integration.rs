mod support;

use anyhow::Result;
use fillbook::config::DisplayConfig;
use fillbook::report::VolumeReport;
use fillbook::store::{DailyVolume, FillStore, ProductVolume};
use support::{dec, fill};
use tempfile::TempDir;

#[test]
fn fills_persist_across_runs_and_dedupe() -> Result<()> {
    let dir = TempDir::new()?;
    let db = dir.path().join("data").join("fills.sqlite");

    {
        let mut store = FillStore::open(&db)?;
        store.insert(&[
            fill("OPOS0D230301", "Wed, 01 Mar 2023 09:00:00 GMT", "0.5", "100", ("o1", "1")),
            fill("ETH0D230301", "Wed, 01 Mar 2023 10:00:00 GMT", "1600", "1", ("e1", "1")),
        ])?;
        store.deduplicate()?;
    }

    // A second run over the same product range re-fetches the same fills.
    let mut store = FillStore::open(&db)?;
    store.insert(&[
        fill("ETH0D230301", "Wed, 01 Mar 2023 10:00:00 GMT", "1600", "1", ("e1", "1")),
        fill("ETH0D230302", "Thu, 02 Mar 2023 10:00:00 GMT", "1650", "2", ("e2", "1")),
    ])?;
    assert_eq!(store.count()?, 4);
    assert_eq!(store.deduplicate()?, 1);
    assert_eq!(store.count()?, 3);

    let report = VolumeReport::from_store(&store, 7)?;
    assert_eq!(report.total_volume, dec("4950"));
    assert_eq!(
        report.volume_per_product,
        vec![
            ProductVolume {
                underlying: "ETH".to_string(),
                volume: dec("4900"),
            },
            ProductVolume {
                underlying: "OPOS".to_string(),
                volume: dec("50"),
            },
        ]
    );
    assert_eq!(
        report.best_days,
        vec![
            DailyVolume {
                date: "02 Mar 2023".to_string(),
                volume: dec("3300"),
            },
            DailyVolume {
                date: "01 Mar 2023".to_string(),
                volume: dec("1650"),
            },
        ]
    );
    assert_eq!(report.average_daily_volume, dec("2475"));
    Ok(())
}

#[test]
fn report_text_matches_console_layout() -> Result<()> {
    let dir = TempDir::new()?;
    let mut store = FillStore::open(dir.path().join("fills.sqlite"))?;
    store.insert(&[fill(
        "BITCOIN0D230615",
        "Thu, 15 Jun 2023 14:03:11 GMT",
        "25000",
        "50",
        ("b1", "9"),
    )])?;

    let report = VolumeReport::from_store(&store, 7)?;
    let mut out = Vec::new();
    report.render_text(&DisplayConfig::default(), &mut out)?;
    let text = String::from_utf8(out)?;

    assert!(text.contains("\nTotal Volume: $1,250,000.00\n"));
    assert!(text.contains("\nBest Days:\n15 Jun 2023 $1,250,000.00\n"));
    assert!(text.contains("\nAverage Notional Volume Per Day Per Product:\nBITCOIN $1,250,000.00\n"));
    Ok(())
}
