/*
[INPUT]:  Subscriptions, role assignments and directory principals
[OUTPUT]: Subscription status uploaded to the accounting API
[POS]:    Jobs layer - status collection
[UPDATE]: When principal resolution or degradation rules change
*/

use std::collections::HashMap;

use anyhow::Result;
use chrono::Utc;
use rctab_adapter::{
    AllSubscriptionStatus,
    AzureClient,
    AzureRoleAssignment,
    DirectoryObject,
    RctabClient,
    RoleAssignment,
    SubscriptionStatus,
};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::settings::Settings;

/// Principal lookups already answered during this run.
///
/// Misses are cached too, so a principal deleted from the directory is
/// only chased once per run.
type PrincipalCache = HashMap<String, Option<DirectoryObject>>;

/// Collect status and role assignments for every visible subscription and
/// upload them.
pub async fn run(_settings: &Settings, azure: &AzureClient, rctab: &RctabClient) -> Result<()> {
    warn!("status job starting");

    let status_list = collect_status(azure).await?;

    warn!("sending status data");
    let batch = AllSubscriptionStatus { status_list };
    rctab.post_status(&batch).await?;
    Ok(())
}

/// Get status and role assignments for all subscriptions.
pub async fn collect_status(azure: &AzureClient) -> Result<Vec<SubscriptionStatus>> {
    warn!("getting all status data");
    let started_at = Utc::now();

    let subscriptions = azure.list_subscriptions().await?;
    let mut principal_cache: PrincipalCache = HashMap::new();

    let mut data = Vec::new();
    for (i, subscription) in subscriptions.into_iter().enumerate() {
        if i % 10 == 0 {
            info!(processed = i, "subscriptions processed");
        }

        let (Some(subscription_id), Some(display_name), Some(state)) = (
            subscription.subscription_id,
            subscription.display_name,
            subscription.state,
        ) else {
            continue;
        };

        let role_assignments =
            match subscription_role_assignments(azure, subscription_id, &mut principal_cache).await
            {
                Ok(assignments) => assignments,
                Err(err) => {
                    error!("could not retrieve role assignments, do we have Graph permissions?");
                    error!(error = %err);
                    Vec::new()
                }
            };

        data.push(SubscriptionStatus {
            subscription_id,
            display_name,
            state,
            role_assignments,
        });
    }

    warn!(elapsed = %(Utc::now() - started_at), "status data retrieved");
    Ok(data)
}

/// Resolve all role assignments of one subscription to principal details.
async fn subscription_role_assignments(
    azure: &AzureClient,
    subscription_id: Uuid,
    principal_cache: &mut PrincipalCache,
) -> Result<Vec<RoleAssignment>> {
    let role_definitions = azure.role_definitions(subscription_id).await?;
    let assignments = azure.role_assignments(subscription_id).await?;

    let mut models = Vec::new();
    for assignment in assignments {
        let role_name = role_definitions
            .get(&assignment.role_definition_id)
            .cloned()
            .unwrap_or_else(|| "Unknown".to_string());
        models.extend(assignment_models(azure, &assignment, &role_name, principal_cache).await?);
    }
    Ok(models)
}

/// Expand one role assignment into entries, one per resolved principal.
///
/// A group principal contributes an entry per member; an unresolvable
/// principal contributes nothing.
async fn assignment_models(
    azure: &AzureClient,
    assignment: &AzureRoleAssignment,
    role_name: &str,
    principal_cache: &mut PrincipalCache,
) -> Result<Vec<RoleAssignment>> {
    let principal = match principal_cache.get(&assignment.principal_id) {
        Some(cached) => cached.clone(),
        None => {
            let fetched = azure.get_directory_object(&assignment.principal_id).await?;
            principal_cache.insert(assignment.principal_id.clone(), fetched.clone());
            fetched
        }
    };

    let mut principal_details = Vec::new();
    match principal {
        Some(principal) if principal.is_group() => {
            for member in azure.group_members(&principal.id).await? {
                principal_details.push(principal_display(&member));
            }
        }
        Some(principal) => principal_details.push(principal_display(&principal)),
        None => {
            warn!(
                principal_id = %assignment.principal_id,
                "could not retrieve principal data"
            );
        }
    }

    Ok(principal_details
        .into_iter()
        .map(|(display_name, mail)| RoleAssignment {
            role_definition_id: assignment.role_definition_id.clone(),
            role_name: role_name.to_string(),
            principal_id: assignment.principal_id.clone(),
            display_name,
            mail,
            scope: assignment.scope.clone(),
        })
        .collect())
}

fn principal_display(principal: &DirectoryObject) -> (String, Option<String>) {
    let display_name = principal
        .display_name
        .clone()
        .unwrap_or_else(|| "Unknown".to_string());
    (display_name, principal.mail.clone())
}
