/*
[INPUT]:  The current date and hour, plus raw consumption rows
[OUTPUT]: Previous-month usage stamped and uploaded as a monthly batch
[POS]:    Jobs layer - monthly usage collection
[UPDATE]: When the day mapping or stamping rules change
*/

use anyhow::{Result, bail};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike, Utc};
use rctab_adapter::{AllUsage, AzureClient, RctabClient};
use tracing::{error, warn};

use crate::jobs::usage::to_usage_rows;
use crate::settings::Settings;

const MAX_ATTEMPTS: u32 = 5;
const RETRY_PAUSE_SECONDS: u64 = 60;

/// Collect and upload finalized usage for a slice of the previous month.
///
/// Designed to run bi-hourly on the 7th and 8th of each month; each
/// invocation covers up to two days of the previous month, so the whole
/// month is covered across the two days of runs.
pub async fn run(settings: &Settings, azure: &AzureClient, rctab: &RctabClient) -> Result<()> {
    let scope = settings.usage_scope()?;

    warn!("monthly usage job starting");

    let dates = monthly_dates(Utc::now().naive_utc());
    if dates.is_empty() {
        warn!("no dates to process");
        return Ok(());
    }
    warn!(?dates, "requesting all data");

    let date_from = dates[0];
    let date_to = *dates.last().expect("dates is non-empty");

    for attempt in 1..=MAX_ATTEMPTS {
        warn!(attempt, "attempt");

        let details = match azure
            .list_usage_details(&scope, midnight(date_from), midnight(date_to))
            .await
        {
            Ok(details) => details,
            Err(err) if err.is_retryable() => {
                if attempt == MAX_ATTEMPTS {
                    error!("could not retrieve usage data");
                    bail!("Could not retrieve usage data.");
                }
                error!(error = %err, "request to azure failed, trying again in 60 seconds");
                tokio::time::sleep(std::time::Duration::from_secs(RETRY_PAUSE_SECONDS)).await;
                continue;
            }
            Err(err) => return Err(err.into()),
        };

        let mut usage_list = to_usage_rows(details);
        let today = Utc::now().date_naive();
        for usage_item in &mut usage_list {
            usage_item.monthly_upload = Some(today);
        }

        warn!(?dates, "sending usage");
        let batch = AllUsage {
            usage_list,
            start_date: date_from,
            end_date: date_to,
        };
        rctab.post_monthly_usage(&batch).await?;

        warn!("monthly usage job finished");
        return Ok(());
    }

    unreachable!("loop either returns or bails on the final attempt")
}

/// Map the current day and hour to up to two days of the previous month.
///
/// Runs on the 7th and 8th at even hours tile days 1..=48; days that
/// overflow the previous month produce fewer (or no) dates.
pub fn monthly_dates(now: NaiveDateTime) -> Vec<NaiveDate> {
    let day_of_month = ((i64::from(now.day()) - 7) * 24) + i64::from(now.hour()) + 1;
    let end_of_last_month = now.date() - Duration::days(i64::from(now.day()));

    if day_of_month < 1 {
        return Vec::new();
    }

    let Some(day1) = NaiveDate::from_ymd_opt(
        end_of_last_month.year(),
        end_of_last_month.month(),
        day_of_month as u32,
    ) else {
        return Vec::new();
    };

    match NaiveDate::from_ymd_opt(
        end_of_last_month.year(),
        end_of_last_month.month(),
        day_of_month as u32 + 1,
    ) {
        Some(day2) => vec![day1, day2],
        None => vec![day1],
    }
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(0, 0, 0).expect("midnight is always valid")
}
