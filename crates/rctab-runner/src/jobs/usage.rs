/*
[INPUT]:  A collection window and raw consumption rows
[OUTPUT]: Compressed usage records uploaded day by day
[POS]:    Jobs layer - daily usage collection
[UPDATE]: When window arithmetic or compression rules change
*/

use anyhow::Result;
use chrono::{Duration, NaiveDateTime, Utc};
use rctab_adapter::{AllUsage, AzureClient, RctabClient, Usage, UsageDetail, UsageScope};
use tracing::{error, info, warn};

use crate::settings::Settings;

const MAX_ATTEMPTS: u32 = 5;
const RETRY_PAUSE_SECONDS: u64 = 60;

/// Collect usage for the configured window and upload it day by day.
///
/// Days are processed in reverse so the most recent data lands first.
/// Azure-side failures for a day are retried with a pause and, if the
/// attempts run out, that day is skipped; an exhausted upload is fatal.
pub async fn run(settings: &Settings, azure: &AzureClient, rctab: &RctabClient) -> Result<()> {
    let scope = settings.usage_scope()?;

    warn!("usage job starting");

    let now = Utc::now().naive_utc();
    let (start, end) = collection_window(
        now,
        settings.usage_history_days,
        settings.usage_history_days_offset,
    );
    warn!(%start, %end, "requesting all data in reverse order");

    for day in date_range(start, end).into_iter().rev() {
        collect_and_send_day(azure, rctab, &scope, day).await?;
    }
    Ok(())
}

async fn collect_and_send_day(
    azure: &AzureClient,
    rctab: &RctabClient,
    scope: &UsageScope,
    day: NaiveDateTime,
) -> Result<()> {
    for _ in 0..MAX_ATTEMPTS {
        warn!(%day, "requesting all usage data");
        let details = match azure.list_usage_details(scope, day, day).await {
            Ok(details) => details,
            Err(err) if err.is_retryable() => {
                error!(error = %err, "request to azure failed, trying again in 60 seconds");
                tokio::time::sleep(std::time::Duration::from_secs(RETRY_PAUSE_SECONDS)).await;
                continue;
            }
            Err(err) => return Err(err.into()),
        };

        let usage_list = to_usage_rows(details);
        let batch = AllUsage {
            usage_list,
            start_date: day.date(),
            end_date: day.date(),
        };
        rctab.post_usage(&batch).await?;
        return Ok(());
    }

    warn!(%day, "giving up on this day after {MAX_ATTEMPTS} attempts");
    Ok(())
}

/// The window of days to collect, derived from now.
///
/// Now is truncated to midnight; the window covers `history_days` days and
/// is shifted back by `offset_days`. Both ends are inclusive.
pub fn collection_window(
    now: NaiveDateTime,
    history_days: i64,
    offset_days: i64,
) -> (NaiveDateTime, NaiveDateTime) {
    let midnight = truncate_to_midnight(now);
    let start = midnight - Duration::days(history_days - 1) - Duration::days(offset_days);
    let end = midnight - Duration::days(offset_days);
    (start, end)
}

/// A midnight for every day between start and end, inclusive.
pub fn date_range(start: NaiveDateTime, end: NaiveDateTime) -> Vec<NaiveDateTime> {
    let days = (end - start).num_days();
    (0..=days)
        .map(|n| truncate_to_midnight(start) + Duration::days(n))
        .collect()
}

fn truncate_to_midnight(value: NaiveDateTime) -> NaiveDateTime {
    value.date().and_hms_opt(0, 0, 0).expect("midnight is always valid")
}

/// Convert raw consumption rows and compress them.
///
/// With the AmortizedCost metric, reserved-instance rows carry their
/// amortised spend in `cost`; move it to `amortised_cost` so that `cost`
/// only ever holds on-demand spend. `total_cost` keeps the original value
/// either way.
pub fn to_usage_rows(details: Vec<UsageDetail>) -> Vec<Usage> {
    warn!("retrieve items");
    let started_at = Utc::now();

    let mut all_items = Vec::with_capacity(details.len());
    for (i, detail) in details.into_iter().enumerate() {
        if i % 200 == 0 {
            warn!(item = i, "requesting item");
        }

        let mut usage = detail.into_usage();
        usage.total_cost = Some(usage.cost);
        if usage.reservation_id.is_some() {
            usage.amortised_cost = Some(usage.cost);
            usage.cost = 0.0;
        } else {
            usage.amortised_cost = Some(0.0);
        }
        all_items.push(usage);
    }

    let combined_items = compress_items(all_items);
    info!(
        count = combined_items.len(),
        elapsed = %(Utc::now() - started_at),
        "usage records retrieved"
    );
    combined_items
}

/// Update one usage record with the cost, etc. of another.
pub fn combine_items(item_to_update: &mut Usage, other_item: &Usage) {
    item_to_update.quantity =
        Some(item_to_update.quantity.unwrap_or(0.0) + other_item.quantity.unwrap_or(0.0));
    item_to_update.effective_price = Some(
        item_to_update.effective_price.unwrap_or(0.0) + other_item.effective_price.unwrap_or(0.0),
    );
    item_to_update.amortised_cost = Some(
        item_to_update.amortised_cost.unwrap_or(0.0) + other_item.amortised_cost.unwrap_or(0.0),
    );
    item_to_update.total_cost =
        Some(item_to_update.total_cost.unwrap_or(0.0) + other_item.total_cost.unwrap_or(0.0));
    item_to_update.unit_price =
        Some(item_to_update.unit_price.unwrap_or(0.0) + other_item.unit_price.unwrap_or(0.0));
    item_to_update.cost += other_item.cost;
}

/// Merge records that differ only in their accumulator fields.
///
/// Two records combine when every field except cost, amortised_cost,
/// total_cost and quantity is equal.
pub fn compress_items(items: Vec<Usage>) -> Vec<Usage> {
    let mut ret_list: Vec<Usage> = Vec::new();
    for item in items {
        let key = merge_key(&item);
        match ret_list
            .iter_mut()
            .find(|existing| merge_key(existing) == key)
        {
            Some(existing) => combine_items(existing, &item),
            None => ret_list.push(item),
        }
    }
    ret_list
}

/// Copy of a record with the accumulator fields blanked for comparison
fn merge_key(item: &Usage) -> Usage {
    let mut key = item.clone();
    key.cost = 0.0;
    key.amortised_cost = None;
    key.total_cost = None;
    key.quantity = None;
    key
}
