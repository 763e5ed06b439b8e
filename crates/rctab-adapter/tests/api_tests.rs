/*
[INPUT]:  Mock accounting API responses
[OUTPUT]: Test results for the RCTab HTTP client
[POS]:    Integration tests - accounting endpoints
[UPDATE]: When accounting endpoints change
*/

mod common;

use chrono::NaiveDate;
use common::{setup_mock_server, test_auth};
use rctab_adapter::{
    AllSubscriptionStatus,
    AllUsage,
    RctabClient,
    RctabError,
    SubscriptionState,
    SubscriptionStatus,
    Usage,
};
use tokio_test::assert_ok;
use wiremock::matchers::{body_partial_json, header_exists, method, path};
use wiremock::{Mock, ResponseTemplate};

fn usage_batch() -> AllUsage {
    let date = NaiveDate::from_ymd_opt(2021, 9, 1).unwrap();
    let subscription_id = "00000000-0000-0000-0000-000000000016".parse().unwrap();
    AllUsage {
        usage_list: vec![Usage::new("some-id", subscription_id, date, 1.5)],
        start_date: date,
        end_date: date,
    }
}

#[tokio::test]
async fn test_post_usage_sends_bearer_and_body() {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/accounting/all-usage"))
        .and(header_exists("authorization"))
        .and(body_partial_json(serde_json::json!({
            "start_date": "2021-09-01",
            "end_date": "2021-09-01",
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = assert_ok!(RctabClient::new(&server.uri(), test_auth("usage-app")));
    assert_ok!(client.post_usage(&usage_batch()).await);
}

#[tokio::test]
async fn test_post_usage_retries_then_succeeds() {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/accounting/all-usage"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/accounting/all-usage"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = assert_ok!(RctabClient::new(&server.uri(), test_auth("usage-app")));
    assert_ok!(client.post_usage(&usage_batch()).await);
}

#[tokio::test]
async fn test_post_usage_gives_up_after_two_attempts() {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/accounting/all-usage"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let client = assert_ok!(RctabClient::new(&server.uri(), test_auth("usage-app")));
    let err = client.post_usage(&usage_batch()).await.unwrap_err();
    match err {
        RctabError::Upload { what, attempts } => {
            assert_eq!(what, "Usage");
            assert_eq!(attempts, 2);
        }
        other => panic!("Expected Upload error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_post_cm_usage_retries_five_times() {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/accounting/all-cm-usage"))
        .respond_with(ResponseTemplate::new(503))
        .expect(5)
        .mount(&server)
        .await;

    let client = assert_ok!(RctabClient::new(&server.uri(), test_auth("usage-app")));
    let batch = rctab_adapter::AllCMUsage { cm_usage_list: vec![] };
    let err = client.post_cm_usage(&batch).await.unwrap_err();
    assert!(matches!(err, RctabError::Upload { attempts: 5, .. }));
}

#[tokio::test]
async fn test_post_status() {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/accounting/all-status"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let batch = AllSubscriptionStatus {
        status_list: vec![SubscriptionStatus {
            subscription_id: "00000000-0000-0000-0000-000000000001".parse().unwrap(),
            display_name: "sub one".to_string(),
            state: SubscriptionState::Enabled,
            role_assignments: vec![],
        }],
    };

    let client = assert_ok!(RctabClient::new(&server.uri(), test_auth("status-app")));
    assert_ok!(client.post_status(&batch).await);
}

#[tokio::test]
async fn test_get_desired_states() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/accounting/desired-states"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {
                "subscription_id": "00000000-0000-0000-0000-000000000001",
                "desired_state": "Disabled",
            },
            {
                "subscription_id": "00000000-0000-0000-0000-000000000002",
                "desired_state": "Enabled",
            },
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = assert_ok!(RctabClient::new(&server.uri(), test_auth("controller-app")));
    let states = assert_ok!(client.get_desired_states().await);
    assert_eq!(states.len(), 2);
    assert_eq!(states[0].desired_state, SubscriptionState::Disabled);
    assert_eq!(states[1].desired_state, SubscriptionState::Enabled);
}

#[tokio::test]
async fn test_get_desired_states_error_is_not_retried() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/accounting/desired-states"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let client = assert_ok!(RctabClient::new(&server.uri(), test_auth("controller-app")));
    let err = client.get_desired_states().await.unwrap_err();
    assert!(matches!(err, RctabError::Api { status: 500, .. }));
}

#[tokio::test]
async fn test_base_url_without_trailing_slash() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/accounting/desired-states"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&server)
        .await;

    // MockServer::uri has no trailing slash; the client must still hit the
    // accounting route rather than clobbering the path.
    let client = assert_ok!(RctabClient::new(&server.uri(), test_auth("controller-app")));
    let states = assert_ok!(client.get_desired_states().await);
    assert!(states.is_empty());
}
