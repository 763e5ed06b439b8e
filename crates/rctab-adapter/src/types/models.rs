/*
[INPUT]:  API schema definitions and serde requirements
[OUTPUT]: Typed Rust structs with serialization support
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{Currency, SubscriptionState};

/// One day of consumption for one meter of one resource.
///
/// Field names match the accounting API wire format; most fields are
/// optional because the consumption API populates them unevenly across
/// offer types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub record_type: Option<String>,
    #[serde(default)]
    pub tags: Option<HashMap<String, String>>,
    #[serde(default)]
    pub billing_account_id: Option<String>,
    #[serde(default)]
    pub billing_account_name: Option<String>,
    #[serde(default)]
    pub billing_period_start_date: Option<NaiveDate>,
    #[serde(default)]
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
    #[serde(deserialize_with = "deserialize_non_negative")]
    pub cost: f64,
    #[serde(default)]
    pub amortised_cost: Option<f64>,
    #[serde(default)]
    pub total_cost: Option<f64>,
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
    /// Date stamp applied by the monthly upload job
    #[serde(default)]
    pub monthly_upload: Option<NaiveDate>,
}

impl Usage {
    /// Minimal record with only the required fields populated.
    ///
    /// Everything optional starts as None; callers fill in what they have.
    pub fn new(id: impl Into<String>, subscription_id: Uuid, date: NaiveDate, cost: f64) -> Self {
        Self {
            id: id.into(),
            name: None,
            record_type: None,
            tags: None,
            billing_account_id: None,
            billing_account_name: None,
            billing_period_start_date: None,
            billing_period_end_date: None,
            billing_profile_id: None,
            billing_profile_name: None,
            account_owner_id: None,
            account_name: None,
            subscription_id,
            subscription_name: None,
            date,
            product: None,
            part_number: None,
            meter_id: None,
            quantity: None,
            effective_price: None,
            cost,
            amortised_cost: None,
            total_cost: None,
            unit_price: None,
            billing_currency: None,
            resource_location: None,
            consumed_service: None,
            resource_id: None,
            resource_name: None,
            service_info1: None,
            service_info2: None,
            additional_info: None,
            invoice_section: None,
            cost_center: None,
            resource_group: None,
            reservation_id: None,
            reservation_name: None,
            product_order_id: None,
            offer_id: None,
            is_azure_credit_eligible: None,
            term: None,
            publisher_name: None,
            publisher_type: None,
            plan_name: None,
            charge_type: None,
            frequency: None,
            monthly_upload: None,
        }
    }
}

/// POST body for the all-usage and monthly-usage routes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllUsage {
    pub usage_list: Vec<Usage>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Per-subscription total from the cost management query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CMUsage {
    pub subscription_id: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    pub start_datetime: NaiveDate,
    pub end_datetime: NaiveDate,
    #[serde(deserialize_with = "deserialize_non_negative")]
    pub cost: f64,
    pub billing_currency: String,
}

/// POST body for the all-cm-usage route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllCMUsage {
    pub cm_usage_list: Vec<CMUsage>,
}

/// One principal's role on a subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub role_definition_id: String,
    pub role_name: String,
    pub principal_id: String,
    pub display_name: String,
    #[serde(default)]
    pub mail: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Name, state and role assignments of one subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionStatus {
    pub subscription_id: Uuid,
    pub display_name: String,
    pub state: SubscriptionState,
    pub role_assignments: Vec<RoleAssignment>,
}

/// POST body for the all-status route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllSubscriptionStatus {
    pub status_list: Vec<SubscriptionStatus>,
}

/// State a subscription should be moved to, as directed by the API
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DesiredState {
    pub subscription_id: Uuid,
    pub desired_state: SubscriptionState,
}

/// A spending allocation for a subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub currency: Currency,
    pub amount: f64,
}

/// Reject negative costs at the boundary, as the accounting API does.
fn deserialize_non_negative<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if value < 0.0 {
        return Err(serde::de::Error::custom(format!(
            "cost must be non-negative, got {value}"
        )));
    }
    Ok(value)
}
