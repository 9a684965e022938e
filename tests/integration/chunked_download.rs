//! Integration tests for the chunked download loop

use chrono::{DateTime, NaiveDate, Utc};
use feed_downloader::cancel::{CancelSignal, DownloadContext};
use feed_downloader::feed::{FeedConfig, FeedError, FeedRequest, FeedScope, ReqwestTransport};
use feed_downloader::FeedDownloader;
use std::sync::Arc;
use std::time::Duration;

use crate::support::{FailingSink, RangeServer, ScriptedTransport, Step};

const HELLO: &[u8] = b"Hello World!";

fn config(chunk_size: u64) -> FeedConfig {
    FeedConfig::sandbox()
        .with_base_url("https://feed.test/buy/feed/")
        .with_chunk_size(chunk_size)
}

fn bootstrap() -> FeedRequest {
    FeedRequest::item_bootstrap("EBAY_US", "1")
}

fn error_body() -> &'static str {
    r#"{"errors":[{"errorId":13000,"domain":"API_BROWSE","category":"REQUEST","message":"The category id is invalid","parameters":[{"name":"category_id","value":"abc"}]}]}"#
}

#[tokio::test]
async fn test_three_partial_chunks() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        Step::partial("0-11/36", HELLO),
        Step::partial("12-23/36", HELLO),
        Step::partial("24-35/36", HELLO),
    ]));
    let downloader = FeedDownloader::new(transport.clone(), config(12));
    let mut sink = Vec::new();

    let info = downloader
        .download(&DownloadContext::background(), &bootstrap(), &mut sink)
        .await
        .unwrap();

    assert_eq!(sink, HELLO.repeat(3));
    assert_eq!(info.size, 36);
    assert_eq!(info.category_id, "1");
    assert_eq!(info.marketplace_id, "EBAY_US");
    assert_eq!(info.scope, Some(FeedScope::AllActive));
    assert_eq!(info.last_modified, None);
    assert_eq!(
        transport.ranges(),
        vec!["bytes=0-12", "bytes=12-23", "bytes=24-35"]
    );
}

#[tokio::test]
async fn test_requests_carry_feed_parameters() {
    let transport = Arc::new(ScriptedTransport::new(vec![Step::partial("0-11/12", HELLO)]));
    let downloader = FeedDownloader::new(transport.clone(), config(12));

    downloader
        .download(&DownloadContext::background(), &bootstrap(), &mut Vec::new())
        .await
        .unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].url,
        "https://feed.test/buy/feed/v1_beta/item?category_id=1&feed_scope=ALL_ACTIVE"
    );
    assert_eq!(requests[0].marketplace.as_deref(), Some("EBAY_US"));
}

#[tokio::test]
async fn test_single_full_response() {
    let body = vec![b'x'; 2000];
    let transport = Arc::new(ScriptedTransport::new(vec![Step::Respond {
        status: 200,
        headers: vec![("content-range", "0-1999/2000".to_string())],
        body: body.clone(),
    }]));
    let downloader = FeedDownloader::new(transport.clone(), config(10_485_760));
    let mut sink = Vec::new();

    let info = downloader
        .download(&DownloadContext::background(), &bootstrap(), &mut sink)
        .await
        .unwrap();

    assert_eq!(info.size, 2000);
    assert_eq!(sink, body);
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn test_full_response_stops_even_if_total_is_larger() {
    let transport = Arc::new(ScriptedTransport::new(vec![Step::Respond {
        status: 200,
        headers: vec![("content-range", "0-11/36".to_string())],
        body: HELLO.to_vec(),
    }]));
    let downloader = FeedDownloader::new(transport.clone(), config(12));

    let info = downloader
        .download(&DownloadContext::background(), &bootstrap(), &mut Vec::new())
        .await
        .unwrap();

    assert_eq!(info.size, 36);
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn test_no_content() {
    let transport = Arc::new(ScriptedTransport::new(vec![Step::status(204, "")]));
    let downloader = FeedDownloader::new(transport.clone(), config(12));
    let mut sink = Vec::new();

    let info = downloader
        .download(&DownloadContext::background(), &bootstrap(), &mut sink)
        .await
        .unwrap();

    assert_eq!(info.size, 0);
    assert!(info.is_empty());
    assert!(sink.is_empty());
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn test_no_content_after_partial_chunk() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        Step::partial("0-11/36", HELLO),
        Step::status(204, ""),
    ]));
    let downloader = FeedDownloader::new(transport.clone(), config(12));
    let mut sink = Vec::new();

    let info = downloader
        .download(&DownloadContext::background(), &bootstrap(), &mut sink)
        .await
        .unwrap();

    assert_eq!(info.size, 0);
    assert_eq!(sink, HELLO);
    assert_eq!(transport.requests().len(), 2);
}

#[tokio::test]
async fn test_api_error_mid_stream() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        Step::partial("0-11/36", HELLO),
        Step::status(400, error_body()),
    ]));
    let downloader = FeedDownloader::new(transport.clone(), config(12));
    let mut sink = Vec::new();

    let err = downloader
        .download(&DownloadContext::background(), &bootstrap(), &mut sink)
        .await
        .unwrap_err();

    // Bytes of the first chunk stay in the sink
    assert_eq!(sink, HELLO);
    assert_eq!(transport.requests().len(), 2);

    let api = err.api_error().expect("structured API error");
    assert_eq!(api.status.as_u16(), 400);
    assert_eq!(api.message, "API error");
    assert_eq!(api.errors.len(), 1);
    assert_eq!(api.errors[0].error_id, 13000);
    assert_eq!(api.errors[0].parameters[0].name, "category_id");
    assert!(api.warnings.is_empty());
    assert_eq!(api.url.path(), "/buy/feed/v1_beta/item");

    let rendered = err.to_string();
    assert!(rendered.contains("400"));
    assert!(rendered.contains("errorId: 13000"));
}

#[tokio::test]
async fn test_api_error_with_plain_body() {
    let transport = Arc::new(ScriptedTransport::new(vec![Step::status(
        500,
        "upstream unavailable",
    )]));
    let downloader = FeedDownloader::new(transport, config(12));

    let err = downloader
        .download(&DownloadContext::background(), &bootstrap(), &mut Vec::new())
        .await
        .unwrap_err();

    let api = err.api_error().unwrap();
    assert_eq!(api.status.as_u16(), 500);
    assert_eq!(api.message, "upstream unavailable");
    assert!(api.errors.is_empty());
}

#[tokio::test]
async fn test_unexpected_success_status_fails() {
    let transport = Arc::new(ScriptedTransport::new(vec![Step::status(202, "")]));
    let downloader = FeedDownloader::new(transport, config(12));

    let err = downloader
        .download(&DownloadContext::background(), &bootstrap(), &mut Vec::new())
        .await
        .unwrap_err();

    let api = err.api_error().unwrap();
    assert_eq!(api.status.as_u16(), 202);
    // An empty body is not a JSON document, so it becomes the message as is
    assert_eq!(api.message, "");
}

#[tokio::test]
async fn test_malformed_content_range() {
    let transport = Arc::new(ScriptedTransport::new(vec![Step::partial(
        "bytes 0-11/36",
        HELLO,
    )]));
    let downloader = FeedDownloader::new(transport, config(12));

    let err = downloader
        .download(&DownloadContext::background(), &bootstrap(), &mut Vec::new())
        .await
        .unwrap_err();

    assert!(matches!(err, FeedError::MalformedRangeHeader(ref v) if v == "bytes 0-11/36"));
}

#[tokio::test]
async fn test_missing_content_range() {
    let transport = Arc::new(ScriptedTransport::new(vec![Step::status(206, "Hello World!")]));
    let downloader = FeedDownloader::new(transport, config(12));

    let err = downloader
        .download(&DownloadContext::background(), &bootstrap(), &mut Vec::new())
        .await
        .unwrap_err();

    assert!(matches!(err, FeedError::MalformedRangeHeader(_)));
}

#[tokio::test]
async fn test_last_modified_from_final_chunk() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        Step::partial("0-11/24", HELLO).with_header("last-modified", "Tue, 20 Oct 2015 07:28:00 GMT"),
        Step::partial("12-23/24", HELLO).with_header("last-modified", "Wed, 21 Oct 2015 07:28:00 GMT"),
    ]));
    let downloader = FeedDownloader::new(transport, config(12));

    let info = downloader
        .download(&DownloadContext::background(), &bootstrap(), &mut Vec::new())
        .await
        .unwrap();

    let expected: DateTime<Utc> = "2015-10-21T07:28:00Z".parse().unwrap();
    assert_eq!(info.last_modified, Some(expected));
}

#[tokio::test]
async fn test_invalid_last_modified() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        Step::partial("0-11/12", HELLO).with_header("last-modified", "last tuesday"),
    ]));
    let downloader = FeedDownloader::new(transport, config(12));

    let err = downloader
        .download(&DownloadContext::background(), &bootstrap(), &mut Vec::new())
        .await
        .unwrap_err();

    assert!(matches!(err, FeedError::InvalidLastModified(_)));
}

#[tokio::test]
async fn test_transport_failure_writes_nothing() {
    // Port 1 on loopback refuses connections
    let downloader = FeedDownloader::new(
        ReqwestTransport::default(),
        FeedConfig::sandbox().with_base_url("http://127.0.0.1:1/buy/feed/"),
    );
    let mut sink = Vec::new();

    let err = downloader
        .download(&DownloadContext::background(), &bootstrap(), &mut sink)
        .await
        .unwrap_err();

    assert!(matches!(err, FeedError::Transport(_)));
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_collaborator_error_propagates() {
    let transport = Arc::new(ScriptedTransport::new(vec![Step::Fail(
        "token endpoint unreachable".to_string(),
    )]));
    let downloader = FeedDownloader::new(transport, config(12));

    let err = downloader
        .download(&DownloadContext::background(), &bootstrap(), &mut Vec::new())
        .await
        .unwrap_err();

    assert!(matches!(err, FeedError::Auth(_)));
}

#[tokio::test]
async fn test_sink_failure() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        Step::partial("0-11/36", HELLO),
        Step::partial("12-23/36", HELLO),
    ]));
    let downloader = FeedDownloader::new(transport.clone(), config(12));

    let err = downloader
        .download(&DownloadContext::background(), &bootstrap(), &mut FailingSink)
        .await
        .unwrap_err();

    assert!(matches!(err, FeedError::Sink(_)));
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn test_cancellation_interrupts_request() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        Step::partial("0-11/36", HELLO),
        Step::Hang,
    ]));
    let downloader = FeedDownloader::new(transport.clone(), config(12));
    let cancel = CancelSignal::shared();
    let ctx = DownloadContext::background().with_cancel(cancel.clone());

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
    });

    let mut sink = Vec::new();
    let err = downloader
        .download(&ctx, &bootstrap(), &mut sink)
        .await
        .unwrap_err();

    assert!(matches!(err, FeedError::Cancelled));
    assert_eq!(sink, HELLO);
    assert_eq!(transport.requests().len(), 2);
}

#[tokio::test]
async fn test_cancelled_before_start_sends_nothing() {
    let transport = Arc::new(ScriptedTransport::new(Vec::new()));
    let downloader = FeedDownloader::new(transport.clone(), config(12));
    let cancel = CancelSignal::shared();
    cancel.cancel();

    let err = downloader
        .download(
            &DownloadContext::background().with_cancel(cancel),
            &bootstrap(),
            &mut Vec::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, FeedError::Cancelled));
    // The request is built but the context refuses to run it
    assert!(transport.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_deadline_exceeded() {
    let transport = Arc::new(ScriptedTransport::new(vec![Step::Hang]));
    let downloader = FeedDownloader::new(transport, config(12));
    let ctx = DownloadContext::background().with_timeout(Duration::from_secs(30));

    let err = downloader
        .download(&ctx, &bootstrap(), &mut Vec::new())
        .await
        .unwrap_err();

    assert!(matches!(err, FeedError::DeadlineExceeded));
}

#[tokio::test]
async fn test_zero_chunk_size_rejected() {
    let transport = Arc::new(ScriptedTransport::new(Vec::new()));
    let downloader = FeedDownloader::new(transport.clone(), config(0));

    let err = downloader
        .download(&DownloadContext::background(), &bootstrap(), &mut Vec::new())
        .await
        .unwrap_err();

    assert!(matches!(err, FeedError::InvalidRequest(_)));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_request_count_is_ceiling_of_total_over_chunk() {
    let data: Vec<u8> = (0..100u8).collect();

    for (chunk, expected_requests) in [(30u64, 4usize), (25, 4), (100, 1), (7, 15)] {
        let server = Arc::new(RangeServer::new(data.clone(), chunk));
        let downloader = FeedDownloader::new(server.clone(), config(chunk));
        let mut sink = Vec::new();

        let info = downloader
            .download(&DownloadContext::background(), &bootstrap(), &mut sink)
            .await
            .unwrap();

        assert_eq!(sink, data, "chunk size {chunk}");
        assert_eq!(info.size, 100);
        assert_eq!(server.request_count(), expected_requests, "chunk size {chunk}");
    }
}

#[tokio::test]
async fn test_daily_entry_point() {
    let transport = Arc::new(ScriptedTransport::new(vec![Step::partial("0-11/12", HELLO)]));
    let downloader = FeedDownloader::new(transport.clone(), config(12));
    let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();

    let info = downloader
        .daily_newly_listed(&DownloadContext::background(), "EBAY_GB", "220", date, &mut Vec::new())
        .await
        .unwrap();

    assert_eq!(info.scope, Some(FeedScope::NewlyListed));
    assert_eq!(info.marketplace_id, "EBAY_GB");

    let requests = transport.requests();
    assert!(requests[0].url.ends_with("?category_id=220&date=20240309&feed_scope=NEWLY_LISTED"));
    assert_eq!(requests[0].marketplace.as_deref(), Some("EBAY_GB"));
}

#[tokio::test]
async fn test_snapshot_entry_point() {
    let transport = Arc::new(ScriptedTransport::new(vec![Step::status(204, "")]));
    let downloader = FeedDownloader::new(transport.clone(), config(12));
    let at: DateTime<Utc> = "2024-03-09T14:00:00Z".parse().unwrap();

    let info = downloader
        .item_snapshot(&DownloadContext::background(), "EBAY_US", "1", at, &mut Vec::new())
        .await
        .unwrap();

    assert_eq!(info.scope, None);
    assert!(info.is_empty());

    let url = &transport.requests()[0].url;
    assert!(url.starts_with("https://feed.test/buy/feed/v1_beta/item_snapshot?"));
    assert!(url.contains("snapshot_date=2024-03-09T14%3A00%3A00.000Z"));
}

#[tokio::test]
async fn test_concurrent_downloads_share_downloader() {
    let downloader = Arc::new(FeedDownloader::new(
        Arc::new(RangeServer::new(vec![7u8; 50], 10)),
        config(10),
    ));

    let mut handles = Vec::new();
    for category in ["1", "2", "3"] {
        let downloader = downloader.clone();
        handles.push(tokio::spawn(async move {
            let feed = FeedRequest::item_bootstrap("EBAY_US", category);
            let mut sink = Vec::new();
            let info = downloader
                .download(&DownloadContext::background(), &feed, &mut sink)
                .await
                .unwrap();
            (info, sink.len())
        }));
    }

    for handle in handles {
        let (info, written) = handle.await.unwrap();
        assert_eq!(info.size, 50);
        assert_eq!(written, 50);
    }
}
