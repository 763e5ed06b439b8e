/*
[INPUT]:  A management group and the current date
[OUTPUT]: Year-to-date cost totals per subscription, uploaded in one batch
[POS]:    Jobs layer - cost management collection
[UPDATE]: When the window chunking or accumulation rules change
*/

use std::collections::HashMap;

use anyhow::Result;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Utc};
use rctab_adapter::{AllCMUsage, AzureClient, CMUsage, RctabClient};
use tracing::warn;
use uuid::Uuid;

use crate::settings::Settings;

/// The longest period the cost management API accepts in one query
pub const MAX_QUERY_DAYS: i64 = 364;

/// Collect actual cost since the start of the calendar year and upload it.
pub async fn run(settings: &Settings, azure: &AzureClient, rctab: &RctabClient) -> Result<()> {
    let mgmt_group = settings.cm_mgmt_group()?;

    warn!("cost management job starting");

    let now = Utc::now().naive_utc();
    let end = truncate_date(now);
    let start = NaiveDate::from_ymd_opt(now.year(), 1, 1)
        .expect("January 1st is always valid")
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always valid");
    warn!(%start, %end, "requesting data");

    let mut totals: HashMap<(Uuid, Option<String>, String), f64> = HashMap::new();
    for (window_start, window_end) in chunk_windows(start, end) {
        let rows = azure.query_cost(mgmt_group, window_start, window_end).await?;
        for row in rows {
            *totals
                .entry((row.subscription_id, row.subscription_name, row.currency))
                .or_default() += row.cost;
        }
    }

    let batch = AllCMUsage {
        cm_usage_list: totals
            .into_iter()
            .map(|((subscription_id, name, currency), cost)| CMUsage {
                subscription_id,
                name,
                start_datetime: start.date(),
                end_datetime: end.date(),
                cost,
                billing_currency: currency,
            })
            .collect(),
    };

    rctab.post_cm_usage(&batch).await?;
    Ok(())
}

/// Cover an inclusive date range with windows the query API will accept.
///
/// Each window spans at most `MAX_QUERY_DAYS` extra days and windows tile
/// the range without gaps or overlap.
pub fn chunk_windows(
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Vec<(NaiveDateTime, NaiveDateTime)> {
    let mut windows = Vec::new();
    let mut covered_to = start - Duration::days(1);
    while covered_to < end {
        let window_start = covered_to + Duration::days(1);
        let window_end = (window_start + Duration::days(MAX_QUERY_DAYS)).min(end);
        windows.push((window_start, window_end));
        covered_to = window_end;
    }
    windows
}

/// Truncate a datetime to the same date but 00:00:00 hours.
fn truncate_date(value: NaiveDateTime) -> NaiveDateTime {
    value.date().and_hms_opt(0, 0, 0).expect("midnight is always valid")
}
