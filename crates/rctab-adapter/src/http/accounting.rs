/*
[INPUT]:  Usage, status and desired-state payloads plus bearer auth
[OUTPUT]: Accounting API uploads and desired-state queries
[POS]:    HTTP layer - accounting endpoints (require bearer auth)
[UPDATE]: When adding new accounting routes or changing retry counts
*/

use chrono::Utc;
use reqwest::Method;
use serde::Serialize;
use tracing::{info, warn};

use crate::http::{RctabClient, RctabError, Result};
use crate::types::{AllCMUsage, AllSubscriptionStatus, AllUsage, DesiredState};

/// Attempts for routine usage/status uploads
const UPLOAD_ATTEMPTS: u32 = 2;
/// Attempts for cost-management uploads, which are larger and rarer
const CM_UPLOAD_ATTEMPTS: u32 = 5;

impl RctabClient {
    /// Upload a batch of daily usage records
    ///
    /// POST accounting/all-usage
    pub async fn post_usage(&self, batch: &AllUsage) -> Result<()> {
        self.post_with_attempts("accounting/all-usage", batch, UPLOAD_ATTEMPTS, "Usage")
            .await?;
        Ok(())
    }

    /// Upload a batch of usage records stamped as a monthly upload
    ///
    /// POST accounting/monthly-usage
    pub async fn post_monthly_usage(&self, batch: &AllUsage) -> Result<()> {
        self.post_with_attempts("accounting/monthly-usage", batch, UPLOAD_ATTEMPTS, "Usage")
            .await?;
        Ok(())
    }

    /// Upload per-subscription cost management totals
    ///
    /// POST accounting/all-cm-usage
    pub async fn post_cm_usage(&self, batch: &AllCMUsage) -> Result<()> {
        self.post_with_attempts(
            "accounting/all-cm-usage",
            batch,
            CM_UPLOAD_ATTEMPTS,
            "CMUsage",
        )
        .await?;
        Ok(())
    }

    /// Upload subscription status and role assignments
    ///
    /// POST accounting/all-status
    pub async fn post_status(&self, batch: &AllSubscriptionStatus) -> Result<()> {
        self.post_with_attempts("accounting/all-status", batch, UPLOAD_ATTEMPTS, "status")
            .await?;
        Ok(())
    }

    /// Fetch the subscriptions whose state should change
    ///
    /// GET accounting/desired-states
    pub async fn get_desired_states(&self) -> Result<Vec<DesiredState>> {
        let started_at = Utc::now();

        let builder = self
            .api_request(Method::GET, "accounting/desired-states")?
            .timeout(self.config().query_timeout);
        let desired_states: Vec<DesiredState> = self.send_json(builder).await?;

        info!(
            count = desired_states.len(),
            elapsed = %(Utc::now() - started_at),
            "fetched desired states"
        );
        Ok(desired_states)
    }

    /// POST a JSON body, retrying on non-200 responses.
    ///
    /// Failed attempts log the status and body; exhausting the attempts is
    /// an `Upload` error.
    async fn post_with_attempts<T: Serialize>(
        &self,
        route: &str,
        body: &T,
        attempts: u32,
        what: &'static str,
    ) -> Result<()> {
        let started_at = Utc::now();
        let payload = serde_json::to_vec(body)?;

        for _ in 0..attempts {
            let builder = self
                .api_request(Method::POST, route)?
                .timeout(self.config().post_timeout)
                .header("content-type", "application/json")
                .body(payload.clone());

            let response = match builder.send().await {
                Ok(response) => response,
                Err(err) => {
                    warn!(route, error = %err, "upload request failed");
                    continue;
                }
            };

            if response.status().is_success() {
                info!(
                    route,
                    elapsed = %(Utc::now() - started_at),
                    "{what} batch uploaded"
                );
                return Ok(());
            }

            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            warn!(
                route,
                status = status.as_u16(),
                response = %text,
                "failed to send {what}"
            );
        }

        Err(RctabError::Upload { what, attempts })
    }
}
