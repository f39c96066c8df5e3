//! Integration tests for the delivery client against a fake delivery API.

mod common;

use axum::http::StatusCode;
use common::{spawn_downstream, API_KEY};
use lib::delivery::{DeliveryClient, DeliverySettings, ForwardError};
use lib::sms::NormalizedInboundSms;
use std::time::Duration;

fn client_for(url: &str, timeout: Duration) -> DeliveryClient {
    DeliveryClient::new(DeliverySettings {
        api_key: Some(API_KEY.to_string()),
        base_url: url.to_string(),
        timeout,
        ..DeliverySettings::default()
    })
    .expect("valid settings")
}

// No dedupe store exists: forwarding the same message twice is two downstream sends.
#[tokio::test]
async fn identical_messages_are_forwarded_twice() {
    let downstream = spawn_downstream(StatusCode::OK, "", Duration::ZERO).await;
    let client = client_for(&downstream.url, Duration::from_secs(10));
    let sms = NormalizedInboundSms::new("+1555", "+1666", "same", None).unwrap();

    client.forward(&sms).await.unwrap();
    client.forward(&sms).await.unwrap();

    let hits = downstream.hits();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].query, hits[1].query);
}

#[tokio::test]
async fn query_values_arrive_decoded() {
    let downstream = spawn_downstream(StatusCode::OK, "", Duration::ZERO).await;
    let client = client_for(&downstream.url, Duration::from_secs(10));
    let sms = NormalizedInboundSms::new("+1 555", "Acme&Co", "50% off? a=b #1", None).unwrap();

    client.forward(&sms).await.unwrap();

    let hits = downstream.hits();
    assert_eq!(hits[0].query["from"], "+1 555");
    assert_eq!(hits[0].query["to"], "Acme&Co");
    assert_eq!(hits[0].query["message"], "50% off? a=b #1");
}

#[tokio::test]
async fn rejected_status_and_body_are_reported() {
    let downstream =
        spawn_downstream(StatusCode::SERVICE_UNAVAILABLE, "overloaded", Duration::ZERO).await;
    let client = client_for(&downstream.url, Duration::from_secs(10));
    let sms = NormalizedInboundSms::new("a", "b", "c", None).unwrap();

    match client.forward(&sms).await {
        Err(ForwardError::Rejected { status, body }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "overloaded");
        }
        other => panic!("expected Rejected, got {:?}", other),
    }
}

#[tokio::test]
async fn slow_downstream_times_out() {
    let downstream = spawn_downstream(StatusCode::OK, "", Duration::from_secs(5)).await;
    let client = client_for(&downstream.url, Duration::from_millis(300));
    let sms = NormalizedInboundSms::new("a", "b", "c", None).unwrap();

    let err = client.forward(&sms).await.unwrap_err();
    match err {
        ForwardError::Transport(ref e) => {
            assert!(e.is_timeout(), "error: {}", e);
            assert!(e.url().is_none());
            assert!(!err.to_string().contains("message="), "error: {}", err);
        }
        other => panic!("expected Transport timeout, got {:?}", other),
    }
}
