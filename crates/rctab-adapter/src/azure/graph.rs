/*
[INPUT]:  Principal and group object ids
[OUTPUT]: Directory objects (users, groups, service principals)
[POS]:    Azure layer - Microsoft Graph endpoints
[UPDATE]: When changing Graph queries or the odata types we care about
*/

use serde::Deserialize;
use serde_json::json;

use crate::azure::AzureClient;
use crate::http::Result;

const GRAPH_GROUP_TYPE: &str = "#microsoft.graph.group";

/// A directory object as returned by Graph getByIds / group member listings
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryObject {
    #[serde(rename = "@odata.type", default)]
    pub odata_type: Option<String>,
    pub id: String,
    #[serde(rename = "displayName", default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub mail: Option<String>,
}

impl DirectoryObject {
    /// Whether this principal is an AD group (whose members carry the
    /// actual role)
    pub fn is_group(&self) -> bool {
        self.odata_type.as_deref() == Some(GRAPH_GROUP_TYPE)
    }
}

#[derive(Debug, Deserialize)]
struct DirectoryObjectsPage {
    #[serde(default)]
    value: Vec<DirectoryObject>,
    #[serde(rename = "@odata.nextLink", default)]
    next_link: Option<String>,
}

impl AzureClient {
    /// Look up a single directory object by principal id.
    ///
    /// Returns None when the directory has no object for the id (for
    /// example a deleted principal still referenced by an assignment).
    pub async fn get_directory_object(&self, principal_id: &str) -> Result<Option<DirectoryObject>> {
        let url = self.graph_url("/v1.0/directoryObjects/getByIds");
        let body = json!({"ids": [principal_id], "types": []});
        let page: DirectoryObjectsPage = self.post_graph(&url, &body).await?;
        Ok(page.value.into_iter().next())
    }

    /// List the direct members of a group
    pub async fn group_members(&self, group_id: &str) -> Result<Vec<DirectoryObject>> {
        let url = self.graph_url(&format!("/v1.0/groups/{group_id}/members"));
        let mut page: DirectoryObjectsPage = self.get_graph(&url).await?;

        let mut members = page.value;
        while let Some(link) = page.next_link.take() {
            page = self.get_graph(&link).await?;
            members.append(&mut page.value);
        }
        Ok(members)
    }
}
