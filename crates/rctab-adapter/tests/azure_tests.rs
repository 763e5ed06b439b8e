/*
[INPUT]:  Mock Azure management-plane and Graph responses
[OUTPUT]: Test results for the Azure client
[POS]:    Integration tests - Azure endpoints
[UPDATE]: When Azure endpoints or pagination handling change
*/

mod common;

use chrono::NaiveDate;
use common::{mount_token_endpoint, setup_mock_server, test_azure_client};
use rctab_adapter::{RctabError, UsageScope};
use tokio_test::assert_ok;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

fn midnight(year: i32, month: u32, day: u32) -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

#[tokio::test]
async fn test_usage_details_filter_and_token() {
    let server = setup_mock_server().await;
    mount_token_endpoint(&server).await;

    Mock::given(method("GET"))
        .and(path(
            "/providers/Microsoft.Management/managementGroups/some-mgmt-group/providers/Microsoft.Consumption/usageDetails",
        ))
        .and(query_param("metric", "AmortizedCost"))
        .and(query_param(
            "$filter",
            "properties/usageEnd ge '2021-01-05T01:01:01Z' and properties/usageEnd le '2021-01-10T01:01:01Z'",
        ))
        .and(header("authorization", "Bearer mock-azure-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_azure_client(&server);
    let scope = UsageScope::ManagementGroup("some-mgmt-group".to_string());
    let from = NaiveDate::from_ymd_opt(2021, 1, 5)
        .unwrap()
        .and_hms_opt(1, 1, 1)
        .unwrap();
    let to = NaiveDate::from_ymd_opt(2021, 1, 10)
        .unwrap()
        .and_hms_opt(1, 1, 1)
        .unwrap();

    let details = assert_ok!(client.list_usage_details(&scope, from, to).await);
    assert!(details.is_empty());
}

#[tokio::test]
async fn test_usage_details_follows_next_link() {
    let server = setup_mock_server().await;
    mount_token_endpoint(&server).await;

    let row = |id: &str| {
        serde_json::json!({
            "id": id,
            "properties": {
                "subscriptionId": "00000000-0000-0000-0000-000000000016",
                "date": "2021-09-01T00:00:00Z",
                "cost": 1.0,
            },
        })
    };

    Mock::given(method("GET"))
        .and(path(
            "/providers/Microsoft.Billing/billingAccounts/111111/providers/Microsoft.Consumption/usageDetails",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [row("page1-row")],
            "nextLink": format!("{}/next-page", server.uri()),
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/next-page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [row("page2-row")],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_azure_client(&server);
    let scope = UsageScope::BillingAccount("111111".to_string());
    let details = assert_ok!(
        client
            .list_usage_details(&scope, midnight(2021, 9, 1), midnight(2021, 9, 1))
            .await
    );

    let ids: Vec<&str> = details.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["page1-row", "page2-row"]);
}

#[tokio::test]
async fn test_token_is_cached_across_calls() {
    let server = setup_mock_server().await;

    // The token endpoint must only be hit once for two management calls.
    Mock::given(method("POST"))
        .and(path(
            "/00000000-0000-0000-0000-0000000000aa/oauth2/v2.0/token",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "token_type": "Bearer",
            "expires_in": 3599,
            "access_token": "mock-azure-token",
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/subscriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [],
        })))
        .expect(2)
        .mount(&server)
        .await;

    let client = test_azure_client(&server);
    assert_ok!(client.list_subscriptions().await);
    assert_ok!(client.list_subscriptions().await);
}

#[tokio::test]
async fn test_cost_query_parses_rows() {
    let server = setup_mock_server().await;
    mount_token_endpoint(&server).await;

    Mock::given(method("POST"))
        .and(path(
            "/providers/Microsoft.Management/managementGroups/ea/providers/Microsoft.CostManagement/query",
        ))
        .and(body_partial_json(serde_json::json!({
            "type": "ActualCost",
            "timeframe": "Custom",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "properties": {
                "columns": [
                    {"name": "Cost", "type": "Number"},
                    {"name": "SubscriptionId", "type": "String"},
                    {"name": "SubscriptionName", "type": "String"},
                    {"name": "Currency", "type": "String"},
                ],
                "rows": [
                    [12.5, "00000000-0000-0000-0000-000000000001", "sub one", "GBP"],
                ],
            },
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_azure_client(&server);
    let rows = assert_ok!(
        client
            .query_cost("ea", midnight(2022, 1, 1), midnight(2022, 6, 30))
            .await
    );
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].cost, 12.5);
    assert_eq!(rows[0].currency, "GBP");
}

#[tokio::test]
async fn test_cost_query_rejects_paged_results() {
    let server = setup_mock_server().await;
    mount_token_endpoint(&server).await;

    Mock::given(method("POST"))
        .and(path(
            "/providers/Microsoft.Management/managementGroups/ea/providers/Microsoft.CostManagement/query",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "properties": {
                "nextLink": "https://management.azure.com/page-2",
                "rows": [],
            },
        })))
        .mount(&server)
        .await;

    let client = test_azure_client(&server);
    let err = client
        .query_cost("ea", midnight(2022, 1, 1), midnight(2022, 6, 30))
        .await
        .unwrap_err();
    assert!(matches!(err, RctabError::CostPagingUnsupported));
}

#[tokio::test]
async fn test_enable_tolerates_already_active() {
    let server = setup_mock_server().await;
    mount_token_endpoint(&server).await;

    let subscription_id: uuid::Uuid = "00000000-0000-0000-0000-000000000001".parse().unwrap();
    Mock::given(method("POST"))
        .and(path(format!(
            "/subscriptions/{subscription_id}/providers/Microsoft.Subscription/enable"
        )))
        .respond_with(ResponseTemplate::new(409).set_body_json(serde_json::json!({
            "error": {
                "code": "Conflict",
                "message": "The subscription is not in suspended state.",
            },
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_azure_client(&server);
    assert_ok!(client.enable_subscription(subscription_id).await);
}

#[tokio::test]
async fn test_cancel_tolerates_already_inactive() {
    let server = setup_mock_server().await;
    mount_token_endpoint(&server).await;

    let subscription_id: uuid::Uuid = "00000000-0000-0000-0000-000000000002".parse().unwrap();
    Mock::given(method("POST"))
        .and(path(format!(
            "/subscriptions/{subscription_id}/providers/Microsoft.Subscription/cancel"
        )))
        .respond_with(ResponseTemplate::new(409).set_body_json(serde_json::json!({
            "error": {
                "code": "Conflict",
                "message": "Subscription is not in active state and is hence marked as read-only.",
            },
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_azure_client(&server);
    assert_ok!(client.cancel_subscription(subscription_id).await);
}

#[tokio::test]
async fn test_cancel_surfaces_other_errors() {
    let server = setup_mock_server().await;
    mount_token_endpoint(&server).await;

    let subscription_id: uuid::Uuid = "00000000-0000-0000-0000-000000000003".parse().unwrap();
    Mock::given(method("POST"))
        .and(path(format!(
            "/subscriptions/{subscription_id}/providers/Microsoft.Subscription/cancel"
        )))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "error": {"code": "AuthorizationFailed", "message": "No permission."},
        })))
        .mount(&server)
        .await;

    let client = test_azure_client(&server);
    let err = client.cancel_subscription(subscription_id).await.unwrap_err();
    assert!(matches!(err, RctabError::Azure { status: 403, .. }));
}

#[tokio::test]
async fn test_role_assignments_and_definitions() {
    let server = setup_mock_server().await;
    mount_token_endpoint(&server).await;

    let subscription_id: uuid::Uuid = "00000000-0000-0000-0000-000000000001".parse().unwrap();
    let definition_id = format!(
        "/subscriptions/{subscription_id}/providers/Microsoft.Authorization/roleDefinitions/def-1"
    );

    Mock::given(method("GET"))
        .and(path(format!(
            "/subscriptions/{subscription_id}/providers/Microsoft.Authorization/roleAssignments"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [{
                "id": "assignment-1",
                "properties": {
                    "roleDefinitionId": definition_id,
                    "principalId": "principal-1",
                    "scope": format!("/subscriptions/{subscription_id}"),
                },
            }],
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!(
            "/subscriptions/{subscription_id}/providers/Microsoft.Authorization/roleDefinitions"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [{
                "id": definition_id,
                "properties": {"roleName": "Contributor"},
            }],
        })))
        .mount(&server)
        .await;

    let client = test_azure_client(&server);
    let assignments = assert_ok!(client.role_assignments(subscription_id).await);
    let definitions = assert_ok!(client.role_definitions(subscription_id).await);

    assert_eq!(assignments.len(), 1);
    assert_eq!(assignments[0].principal_id, "principal-1");
    assert_eq!(
        definitions.get(&assignments[0].role_definition_id).map(String::as_str),
        Some("Contributor")
    );
}

#[tokio::test]
async fn test_graph_lookup_and_group_members() {
    let server = setup_mock_server().await;
    mount_token_endpoint(&server).await;

    Mock::given(method("POST"))
        .and(path("/v1.0/directoryObjects/getByIds"))
        .and(body_partial_json(serde_json::json!({"ids": ["group-1"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [{
                "@odata.type": "#microsoft.graph.group",
                "id": "group-1",
                "displayName": "My Team",
            }],
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1.0/groups/group-1/members"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [
                {
                    "@odata.type": "#microsoft.graph.user",
                    "id": "user-1",
                    "displayName": "A User",
                    "mail": "user@my.org",
                },
            ],
        })))
        .mount(&server)
        .await;

    let client = test_azure_client(&server);
    let principal = assert_ok!(client.get_directory_object("group-1").await)
        .expect("principal should resolve");
    assert!(principal.is_group());

    let members = assert_ok!(client.group_members(&principal.id).await);
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].mail.as_deref(), Some("user@my.org"));
}

#[tokio::test]
async fn test_graph_lookup_missing_principal() {
    let server = setup_mock_server().await;
    mount_token_endpoint(&server).await;

    Mock::given(method("POST"))
        .and(path("/v1.0/directoryObjects/getByIds"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [],
        })))
        .mount(&server)
        .await;

    let client = test_azure_client(&server);
    let principal = assert_ok!(client.get_directory_object("gone").await);
    assert!(principal.is_none());
}
