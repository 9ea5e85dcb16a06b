//! Run-once or wall-clock scheduling of reporting cycles.
//!
//! The schedule is a list of local HH:MM times in a configured timezone.
//! `RUN_ONCE=true` bypasses the loop for container one-shot jobs; in loop
//! mode a failed cycle is logged and the loop sleeps until the next slot.

use std::time::Duration as StdDuration;

use anyhow::{anyhow, bail, Context};
use chrono::{DateTime, Days, NaiveTime};
use chrono_tz::Tz;
use stockbot_market_data::ProviderChain;
use tracing::{error, info};

use crate::config::Config;
use crate::job;

pub async fn run_scheduled(config: &Config, chain: &ProviderChain) -> anyhow::Result<()> {
    if run_once() {
        info!("RUN_ONCE=true, executing single run");
        return job::run_report_cycle(config, chain).await;
    }

    let tz: Tz = config
        .schedule
        .timezone
        .parse()
        .map_err(|e| anyhow!("invalid timezone '{}': {}", config.schedule.timezone, e))?;
    let times = parse_times(&config.schedule.times)?;
    if times.is_empty() {
        bail!("no schedule times configured");
    }

    info!("Schedule: {:?} ({})", config.schedule.times, tz);

    loop {
        let now = chrono::Utc::now().with_timezone(&tz);
        let next = next_run(&times, now)
            .ok_or_else(|| anyhow!("could not compute a next run from {:?}", times))?;
        let wait = (next - now)
            .to_std()
            .unwrap_or(StdDuration::from_secs(1))
            .max(StdDuration::from_secs(1));

        info!(
            "Next run: {} (in {:.0} min)",
            next.format("%Y-%m-%d %H:%M %Z"),
            wait.as_secs_f64() / 60.0
        );
        tokio::time::sleep(wait).await;

        info!("Running scheduled job");
        if let Err(e) = job::run_report_cycle(config, chain).await {
            error!("Scheduled job failed: {:#}", e);
        }
    }
}

fn run_once() -> bool {
    std::env::var("RUN_ONCE")
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn parse_times(times: &[String]) -> anyhow::Result<Vec<NaiveTime>> {
    times
        .iter()
        .map(|t| {
            NaiveTime::parse_from_str(t.trim(), "%H:%M")
                .with_context(|| format!("invalid schedule time '{}'", t))
        })
        .collect()
}

/// The earliest configured slot strictly after `now`, today or tomorrow.
///
/// Slots that fall into a DST gap resolve to the earliest valid local time;
/// a slot with no valid mapping at all is skipped for that day.
fn next_run(times: &[NaiveTime], now: DateTime<Tz>) -> Option<DateTime<Tz>> {
    let tz = now.timezone();
    let mut candidates = Vec::new();
    for day_offset in 0..=1u64 {
        let date = now.date_naive().checked_add_days(Days::new(day_offset))?;
        for time in times {
            if let Some(slot) = date.and_time(*time).and_local_timezone(tz).earliest() {
                if slot > now {
                    candidates.push(slot);
                }
            }
        }
    }
    candidates.into_iter().min()
}
