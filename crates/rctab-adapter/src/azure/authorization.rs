/*
[INPUT]:  A subscription id
[OUTPUT]: Role assignments and a role-definition-id to name mapping
[POS]:    Azure layer - Microsoft.Authorization endpoints
[UPDATE]: When the authorization api-version changes
*/

use std::collections::HashMap;

use serde::Deserialize;
use uuid::Uuid;

use crate::azure::AzureClient;
use crate::http::Result;

const AUTHORIZATION_API_VERSION: &str = "2022-04-01";

/// A role assignment scoped to (or inherited by) a subscription
#[derive(Debug, Clone, Deserialize)]
pub struct AzureRoleAssignment {
    #[serde(rename = "roleDefinitionId")]
    pub role_definition_id: String,
    #[serde(rename = "principalId")]
    pub principal_id: String,
    #[serde(default)]
    pub scope: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RoleAssignmentEnvelope {
    properties: AzureRoleAssignment,
}

#[derive(Debug, Deserialize)]
struct RoleAssignmentsPage {
    #[serde(default)]
    value: Vec<RoleAssignmentEnvelope>,
    #[serde(rename = "nextLink", default)]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RoleDefinitionProperties {
    #[serde(rename = "roleName")]
    role_name: String,
}

#[derive(Debug, Deserialize)]
struct RoleDefinitionEnvelope {
    id: String,
    properties: RoleDefinitionProperties,
}

#[derive(Debug, Deserialize)]
struct RoleDefinitionsPage {
    #[serde(default)]
    value: Vec<RoleDefinitionEnvelope>,
    #[serde(rename = "nextLink", default)]
    next_link: Option<String>,
}

impl AzureClient {
    /// List all role assignments for a subscription
    pub async fn role_assignments(&self, subscription_id: Uuid) -> Result<Vec<AzureRoleAssignment>> {
        let url = self.management_url(&format!(
            "/subscriptions/{subscription_id}/providers/Microsoft.Authorization/roleAssignments"
        ));
        let mut page: RoleAssignmentsPage = self
            .get_management(&url, &[("api-version", AUTHORIZATION_API_VERSION)])
            .await?;

        let mut assignments: Vec<AzureRoleAssignment> =
            page.value.drain(..).map(|e| e.properties).collect();
        while let Some(link) = page.next_link.take() {
            page = self.get_management(&link, &[]).await?;
            assignments.extend(page.value.drain(..).map(|e| e.properties));
        }
        Ok(assignments)
    }

    /// Map role definition ids to role names for a subscription scope
    pub async fn role_definitions(&self, subscription_id: Uuid) -> Result<HashMap<String, String>> {
        let url = self.management_url(&format!(
            "/subscriptions/{subscription_id}/providers/Microsoft.Authorization/roleDefinitions"
        ));
        let mut page: RoleDefinitionsPage = self
            .get_management(&url, &[("api-version", AUTHORIZATION_API_VERSION)])
            .await?;

        let mut definitions = HashMap::new();
        loop {
            for entry in page.value.drain(..) {
                definitions.insert(entry.id, entry.properties.role_name);
            }
            match page.next_link.take() {
                Some(link) => page = self.get_management(&link, &[]).await?,
                None => break,
            }
        }
        Ok(definitions)
    }
}
