use std::time::Duration;

use anyhow::Result;
use fillbook::fetch::{DexterityFillSource, FillSource};
use fillbook::models::TakerSide;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PAGE_BODY: &str = r#"{
    "fills": [
        {
            "base_size": 0.25,
            "block_timestamp": "Mon, 02 Jan 2023 12:00:00 GMT",
            "inserted_at": "Mon, 02 Jan 2023 12:00:02 GMT",
            "maker_client_order_id": null,
            "maker_order_id": "1001",
            "maker_order_nonce": 7,
            "maker_trg": "maker-trg",
            "mpg": "mpg",
            "price": 16500.5,
            "product": "BITCOIN0D230102",
            "quote_size": 4125.125,
            "slot": 170000001,
            "taker_client_order_id": null,
            "taker_order_nonce": 12,
            "taker_side": "buy",
            "taker_trg": "taker-trg",
            "tx_sig": "sig-1"
        },
        {
            "base_size": "1",
            "block_timestamp": "Mon, 02 Jan 2023 10:00:00 GMT",
            "inserted_at": "Mon, 02 Jan 2023 10:00:01 GMT",
            "maker_order_id": "1002",
            "maker_order_nonce": "8",
            "maker_trg": "maker-trg",
            "mpg": "mpg",
            "price": "16400",
            "product": "BITCOIN0D230102",
            "quote_size": "16400",
            "slot": 170000000,
            "taker_order_nonce": "13",
            "taker_side": "sell",
            "taker_trg": "taker-trg",
            "tx_sig": "sig-2"
        }
    ]
}"#;

fn source(server: &MockServer) -> DexterityFillSource {
    DexterityFillSource::new()
        .with_base_url(server.uri())
        .with_retry_backoff(Duration::ZERO)
}

#[tokio::test]
async fn first_page_omits_before() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fills"))
        .and(query_param("product", "BITCOIN0D230102"))
        .and(query_param_is_missing("before"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(PAGE_BODY, "application/json"))
        .expect(1)
        .mount(&server)
        .await;

    let fills = source(&server).fetch_page("BITCOIN0D230102", None).await?;

    assert_eq!(fills.len(), 2);
    assert_eq!(fills[0].maker_order_id, "1001");
    assert_eq!(fills[0].taker_order_nonce, "12");
    assert_eq!(fills[0].taker_side, TakerSide::Buy);
    assert_eq!(fills[1].taker_side, TakerSide::Sell);
    assert_eq!(fills[1].block_timestamp, "Mon, 02 Jan 2023 10:00:00 GMT");
    Ok(())
}

#[tokio::test]
async fn later_pages_send_before_cursor() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fills"))
        .and(query_param("product", "ETH0D230102"))
        .and(query_param("before", "1672653600"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(r#"{"fills": []}"#, "application/json"))
        .expect(1)
        .mount(&server)
        .await;

    let fills = source(&server)
        .fetch_page("ETH0D230102", Some(1672653600))
        .await?;

    assert!(fills.is_empty());
    Ok(())
}

#[tokio::test]
async fn server_errors_are_retried_when_configured() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fills"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fills"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(PAGE_BODY, "application/json"))
        .expect(1)
        .mount(&server)
        .await;

    let fills = source(&server)
        .with_max_retries(2)
        .fetch_page("BITCOIN0D230102", None)
        .await?;

    assert_eq!(fills.len(), 2);
    Ok(())
}

#[tokio::test]
async fn server_error_without_retries_fails() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fills"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .expect(1)
        .mount(&server)
        .await;

    let err = source(&server)
        .fetch_page("BITCOIN0D230102", None)
        .await
        .unwrap_err();

    assert!(format!("{err:#}").contains("502"));
    Ok(())
}

#[tokio::test]
async fn client_errors_are_not_retried() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fills"))
        .respond_with(ResponseTemplate::new(404).set_body_string("unknown product"))
        .expect(1)
        .mount(&server)
        .await;

    let result = source(&server)
        .with_max_retries(3)
        .fetch_page("NOPE0D230102", None)
        .await;

    assert!(result.is_err());
    Ok(())
}

#[tokio::test]
async fn malformed_body_is_an_error() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fills"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(r#"{"data": []}"#, "application/json"))
        .expect(1)
        .mount(&server)
        .await;

    let err = source(&server)
        .with_max_retries(3)
        .fetch_page("BITCOIN0D230102", None)
        .await
        .unwrap_err();

    assert!(format!("{err:#}").contains("Failed to parse fills response"));
    Ok(())
}
