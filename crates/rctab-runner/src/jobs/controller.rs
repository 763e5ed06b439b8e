/*
[INPUT]:  Desired subscription states from the accounting API
[OUTPUT]: Azure subscriptions enabled or cancelled to match
[POS]:    Jobs layer - subscription controller
[UPDATE]: When partitioning or failure tolerance changes
*/

use anyhow::Result;
use chrono::Utc;
use rctab_adapter::{AzureClient, DesiredState, RctabClient, SubscriptionState};
use tracing::{info, warn};
use uuid::Uuid;

use crate::settings::Settings;

/// Enable or disable subscriptions as directed by the API.
pub async fn run(_settings: &Settings, azure: &AzureClient, rctab: &RctabClient) -> Result<()> {
    warn!("controller job starting");

    let desired_states = rctab.get_desired_states().await?;
    let (subs_to_disable, subs_to_enable) = partition_desired_states(&desired_states);

    disable_subscriptions(azure, &subs_to_disable).await;
    enable_subscriptions(azure, &subs_to_enable).await;
    Ok(())
}

/// Split desired states into (to disable, to enable).
///
/// Only the Disabled and Enabled states are actionable; anything else is
/// ignored.
pub fn partition_desired_states(desired_states: &[DesiredState]) -> (Vec<Uuid>, Vec<Uuid>) {
    let subs_to_disable = desired_states
        .iter()
        .filter(|state| state.desired_state == SubscriptionState::Disabled)
        .map(|state| state.subscription_id)
        .collect();
    let subs_to_enable = desired_states
        .iter()
        .filter(|state| state.desired_state == SubscriptionState::Enabled)
        .map(|state| state.subscription_id)
        .collect();
    (subs_to_disable, subs_to_enable)
}

/// Disable Azure subscriptions, which will stop all spending.
///
/// Failures are logged per subscription and do not stop the pass.
async fn disable_subscriptions(azure: &AzureClient, subs_to_disable: &[Uuid]) {
    info!(?subs_to_disable, "disabling subscriptions");
    let started_at = Utc::now();

    for &subscription_id in subs_to_disable {
        warn!(%subscription_id, "disabling");
        if let Err(err) = azure.cancel_subscription(subscription_id).await {
            warn!(%subscription_id, error = %err, "could not disable subscription");
        }
    }

    info!(elapsed = %(Utc::now() - started_at), "disabling subscriptions finished");
}

/// Enable Azure subscriptions.
async fn enable_subscriptions(azure: &AzureClient, subs_to_enable: &[Uuid]) {
    info!(?subs_to_enable, "enabling subscriptions");
    let started_at = Utc::now();

    for &subscription_id in subs_to_enable {
        warn!(%subscription_id, "enabling");
        if let Err(err) = azure.enable_subscription(subscription_id).await {
            warn!(%subscription_id, error = %err, "could not enable subscription");
        }
    }

    info!(elapsed = %(Utc::now() - started_at), "enabling subscriptions finished");
}
