/*
[INPUT]:  Subscription identifiers
[OUTPUT]: Subscription listings and enable/cancel operations
[POS]:    Azure layer - Microsoft.Subscription endpoints
[UPDATE]: When api-versions or tolerated error phrases change
*/

use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use crate::azure::AzureClient;
use crate::http::{RctabError, Result};
use crate::types::SubscriptionState;

const SUBSCRIPTIONS_API_VERSION: &str = "2022-12-01";
const SUBSCRIPTION_OPS_API_VERSION: &str = "2021-10-01";

/// Phrase Azure returns when enabling a subscription that is already active
const ALREADY_ENABLED: &str = "not in suspended state";
/// Phrase Azure returns when cancelling a subscription that is not active
const ALREADY_DISABLED: &str = "Subscription is not in active state and is hence marked as read-only";

/// A subscription as returned by the list API.
///
/// All fields are optional on the wire; callers skip incomplete entries.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureSubscription {
    #[serde(default)]
    pub subscription_id: Option<Uuid>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub state: Option<SubscriptionState>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionsPage {
    #[serde(default)]
    value: Vec<AzureSubscription>,
    #[serde(rename = "nextLink", default)]
    next_link: Option<String>,
}

impl AzureClient {
    /// List every subscription visible to the identity
    pub async fn list_subscriptions(&self) -> Result<Vec<AzureSubscription>> {
        let url = self.management_url("/subscriptions");
        let mut page: SubscriptionsPage = self
            .get_management(&url, &[("api-version", SUBSCRIPTIONS_API_VERSION)])
            .await?;

        let mut subscriptions = page.value;
        while let Some(link) = page.next_link.take() {
            page = self.get_management(&link, &[]).await?;
            subscriptions.append(&mut page.value);
        }
        Ok(subscriptions)
    }

    /// Re-enable a suspended subscription.
    ///
    /// A subscription that is already active is not an error.
    pub async fn enable_subscription(&self, subscription_id: Uuid) -> Result<()> {
        let url = self.management_url(&format!(
            "/subscriptions/{subscription_id}/providers/Microsoft.Subscription/enable"
        ));
        match self
            .post_management_empty(&url, &[("api-version", SUBSCRIPTION_OPS_API_VERSION)])
            .await
        {
            Err(RctabError::Azure { message, .. }) if message.contains(ALREADY_ENABLED) => {
                warn!(
                    %subscription_id,
                    "didn't need to be enabled as it was already active"
                );
                Ok(())
            }
            other => other,
        }
    }

    /// Cancel a subscription, stopping all spending on it.
    ///
    /// A subscription that is already inactive is not an error.
    pub async fn cancel_subscription(&self, subscription_id: Uuid) -> Result<()> {
        let url = self.management_url(&format!(
            "/subscriptions/{subscription_id}/providers/Microsoft.Subscription/cancel"
        ));
        match self
            .post_management_empty(&url, &[("api-version", SUBSCRIPTION_OPS_API_VERSION)])
            .await
        {
            Err(RctabError::Azure { message, .. }) if message.contains(ALREADY_DISABLED) => {
                warn!(
                    %subscription_id,
                    "didn't need to be disabled as it wasn't active"
                );
                Ok(())
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_deserializes_partial_entries() {
        let sub: AzureSubscription = serde_json::from_value(serde_json::json!({
            "subscriptionId": "00000000-0000-0000-0000-000000000001",
        }))
        .unwrap();
        assert!(sub.subscription_id.is_some());
        assert!(sub.display_name.is_none());
        assert!(sub.state.is_none());
    }

    #[test]
    fn test_subscription_state_parses() {
        let sub: AzureSubscription = serde_json::from_value(serde_json::json!({
            "subscriptionId": "00000000-0000-0000-0000-000000000001",
            "displayName": "sub one",
            "state": "Enabled",
        }))
        .unwrap();
        assert_eq!(sub.state, Some(SubscriptionState::Enabled));
    }
}
