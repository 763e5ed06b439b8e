/*
[INPUT]:  A billing scope and an inclusive usage-end date window
[OUTPUT]: Raw consumption rows converted to accounting Usage records
[POS]:    Azure layer - Consumption usageDetails endpoint
[UPDATE]: When the consumption api-version or filter format changes
*/

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use uuid::Uuid;

use crate::azure::AzureClient;
use crate::http::Result;
use crate::types::Usage;

const CONSUMPTION_API_VERSION: &str = "2023-05-01";

/// Billing scope to query usage for.
///
/// Exactly one of a billing account or a management group, mirroring the
/// MGMT_GROUP / BILLING_ACCOUNT_ID setting pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsageScope {
    BillingAccount(String),
    ManagementGroup(String),
}

impl UsageScope {
    /// ARM resource id prefix for this scope
    pub fn resource_id(&self) -> String {
        match self {
            UsageScope::BillingAccount(id) => {
                format!("/providers/Microsoft.Billing/billingAccounts/{id}")
            }
            UsageScope::ManagementGroup(group) => {
                format!("/providers/Microsoft.Management/managementGroups/{group}")
            }
        }
    }
}

/// One page of usage details
#[derive(Debug, Deserialize)]
struct UsageDetailsPage {
    #[serde(default)]
    value: Vec<UsageDetail>,
    #[serde(rename = "nextLink", default)]
    next_link: Option<String>,
}

/// A usage details row as returned by the REST API
#[derive(Debug, Clone, Deserialize)]
pub struct UsageDetail {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub record_type: Option<String>,
    #[serde(default)]
    pub tags: Option<HashMap<String, String>>,
    pub properties: UsageDetailProperties,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageDetailProperties {
    #[serde(default)]
    pub billing_account_id: Option<String>,
    #[serde(default)]
    pub billing_account_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_date_opt")]
    pub billing_period_start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_date_opt")]
    pub billing_period_end_date: Option<NaiveDate>,
    #[serde(default)]
    pub billing_profile_id: Option<String>,
    #[serde(default)]
    pub billing_profile_name: Option<String>,
    #[serde(default)]
    pub account_owner_id: Option<String>,
    #[serde(default)]
    pub account_name: Option<String>,
    pub subscription_id: Uuid,
    #[serde(default)]
    pub subscription_name: Option<String>,
    #[serde(deserialize_with = "lenient_date")]
    pub date: NaiveDate,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub part_number: Option<String>,
    #[serde(default)]
    pub meter_id: Option<String>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub effective_price: Option<f64>,
    pub cost: f64,
    #[serde(default)]
    pub unit_price: Option<f64>,
    #[serde(default)]
    pub billing_currency: Option<String>,
    #[serde(default)]
    pub resource_location: Option<String>,
    #[serde(default)]
    pub consumed_service: Option<String>,
    #[serde(default)]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub resource_name: Option<String>,
    #[serde(default)]
    pub service_info1: Option<String>,
    #[serde(default)]
    pub service_info2: Option<String>,
    #[serde(default)]
    pub additional_info: Option<String>,
    #[serde(default)]
    pub invoice_section: Option<String>,
    #[serde(default)]
    pub cost_center: Option<String>,
    #[serde(default)]
    pub resource_group: Option<String>,
    #[serde(default)]
    pub reservation_id: Option<String>,
    #[serde(default)]
    pub reservation_name: Option<String>,
    #[serde(default)]
    pub product_order_id: Option<String>,
    #[serde(default)]
    pub offer_id: Option<String>,
    #[serde(default)]
    pub is_azure_credit_eligible: Option<bool>,
    #[serde(default)]
    pub term: Option<String>,
    #[serde(default)]
    pub publisher_name: Option<String>,
    #[serde(default)]
    pub publisher_type: Option<String>,
    #[serde(default)]
    pub plan_name: Option<String>,
    #[serde(default)]
    pub charge_type: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
}

impl UsageDetail {
    /// Flatten the REST envelope into an accounting Usage record.
    ///
    /// Amortised/total cost stay unset here; the usage job assigns them
    /// during AmortizedCost normalization.
    pub fn into_usage(self) -> Usage {
        let props = self.properties;
        let mut usage = Usage::new(self.id, props.subscription_id, props.date, props.cost);
        usage.name = self.name;
        usage.record_type = self.record_type;
        usage.tags = self.tags;
        usage.billing_account_id = props.billing_account_id;
        usage.billing_account_name = props.billing_account_name;
        usage.billing_period_start_date = props.billing_period_start_date;
        usage.billing_period_end_date = props.billing_period_end_date;
        usage.billing_profile_id = props.billing_profile_id;
        usage.billing_profile_name = props.billing_profile_name;
        usage.account_owner_id = props.account_owner_id;
        usage.account_name = props.account_name;
        usage.subscription_name = props.subscription_name;
        usage.product = props.product;
        usage.part_number = props.part_number;
        usage.meter_id = props.meter_id;
        usage.quantity = props.quantity;
        usage.effective_price = props.effective_price;
        usage.unit_price = props.unit_price;
        usage.billing_currency = props.billing_currency;
        usage.resource_location = props.resource_location;
        usage.consumed_service = props.consumed_service;
        usage.resource_id = props.resource_id;
        usage.resource_name = props.resource_name;
        usage.service_info1 = props.service_info1;
        usage.service_info2 = props.service_info2;
        usage.additional_info = props.additional_info;
        usage.invoice_section = props.invoice_section;
        usage.cost_center = props.cost_center;
        usage.resource_group = props.resource_group;
        usage.reservation_id = props.reservation_id;
        usage.reservation_name = props.reservation_name;
        usage.product_order_id = props.product_order_id;
        usage.offer_id = props.offer_id;
        usage.is_azure_credit_eligible = props.is_azure_credit_eligible;
        usage.term = props.term;
        usage.publisher_name = props.publisher_name;
        usage.publisher_type = props.publisher_type;
        usage.plan_name = props.plan_name;
        usage.charge_type = props.charge_type;
        usage.frequency = props.frequency;
        usage
    }
}

impl AzureClient {
    /// List usage details whose usage end falls inside the window.
    ///
    /// The window is inclusive at both ends; the API ignores the time part
    /// and returns whole days. Follows nextLink until all pages are read.
    pub async fn list_usage_details(
        &self,
        scope: &UsageScope,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<UsageDetail>> {
        let filter = format!(
            "properties/usageEnd ge '{}' and properties/usageEnd le '{}'",
            from.format("%Y-%m-%dT%H:%M:%SZ"),
            to.format("%Y-%m-%dT%H:%M:%SZ"),
        );
        let url = self.management_url(&format!(
            "{}/providers/Microsoft.Consumption/usageDetails",
            scope.resource_id()
        ));

        let mut page: UsageDetailsPage = self
            .get_management(
                &url,
                &[
                    ("api-version", CONSUMPTION_API_VERSION),
                    ("metric", "AmortizedCost"),
                    ("$filter", filter.as_str()),
                ],
            )
            .await?;

        let mut details = page.value;
        while let Some(link) = page.next_link.take() {
            page = self.get_management(&link, &[]).await?;
            details.append(&mut page.value);
        }
        Ok(details)
    }
}

/// Accept both date-only and full RFC 3339 timestamp strings.
fn parse_lenient_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(date) = raw.parse::<NaiveDate>() {
        return Some(date);
    }
    raw.get(..10).and_then(|prefix| prefix.parse().ok())
}

fn lenient_date<'de, D>(deserializer: D) -> std::result::Result<NaiveDate, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_lenient_date(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognized date: {raw}")))
}

fn lenient_date_opt<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(raw) => parse_lenient_date(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("unrecognized date: {raw}"))),
    }
}
