/*
[INPUT]:  A management group and a custom time period
[OUTPUT]: Per-subscription cost totals from the CostManagement query API
[POS]:    Azure layer - cost management query endpoint
[UPDATE]: When the query shape or api-version changes
*/

use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::azure::AzureClient;
use crate::http::{RctabError, Result};

const COST_API_VERSION: &str = "2023-11-01";

/// One aggregated row: total actual cost for one subscription
#[derive(Debug, Clone, PartialEq)]
pub struct CostRow {
    pub cost: f64,
    pub subscription_id: Uuid,
    pub subscription_name: Option<String>,
    pub currency: String,
}

#[derive(Debug, Deserialize)]
struct CostQueryResult {
    properties: CostQueryProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CostQueryProperties {
    #[serde(default)]
    next_link: Option<String>,
    #[serde(default)]
    rows: Vec<Vec<Value>>,
}

impl AzureClient {
    /// Query total actual cost per subscription over the time period.
    ///
    /// Grouping by SubscriptionId and SubscriptionName with a Sum(Cost)
    /// aggregation fixes the row layout to
    /// [cost, subscription id, subscription name, currency].
    /// The period must be short enough for a single result page; a paged
    /// response is an error.
    pub async fn query_cost(
        &self,
        mgmt_group: &str,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<CostRow>> {
        let body = json!({
            "type": "ActualCost",
            "timeframe": "Custom",
            "timePeriod": {
                "from": from.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
                "to": to.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            },
            "dataset": {
                "granularity": null,
                "grouping": [
                    {"type": "Dimension", "name": "SubscriptionId"},
                    {"type": "Dimension", "name": "SubscriptionName"},
                ],
                "aggregation": {
                    "totalCost": {"name": "Cost", "function": "Sum"},
                },
            },
        });

        let url = self.management_url(&format!(
            "/providers/Microsoft.Management/managementGroups/{mgmt_group}/providers/Microsoft.CostManagement/query"
        ));
        let result: CostQueryResult = self
            .post_management(&url, &[("api-version", COST_API_VERSION)], &body)
            .await?;

        if result
            .properties
            .next_link
            .as_deref()
            .is_some_and(|link| !link.is_empty())
        {
            return Err(RctabError::CostPagingUnsupported);
        }

        result.properties.rows.iter().map(parse_row).collect()
    }
}

fn parse_row(row: &Vec<Value>) -> Result<CostRow> {
    let invalid = || RctabError::InvalidResponse(format!("malformed cost query row: {row:?}"));

    let cost = row.first().and_then(Value::as_f64).ok_or_else(invalid)?;
    let subscription_id = row
        .get(1)
        .and_then(Value::as_str)
        .and_then(|raw| raw.parse().ok())
        .ok_or_else(invalid)?;
    let subscription_name = row.get(2).and_then(Value::as_str).map(str::to_string);
    let currency = row
        .get(3)
        .and_then(Value::as_str)
        .ok_or_else(invalid)?
        .to_string();

    Ok(CostRow {
        cost,
        subscription_id,
        subscription_name,
        currency,
    })
}
