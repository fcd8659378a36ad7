use std::cmp::Reverse;

use serde::Serialize;
use tracing::instrument;

use super::{round_to, Measured};
use crate::model::{Creator, HourCount};
use crate::store::Telemetry;
use crate::time::Lookback;

const HOURS_PER_DAY: usize = 24;

/// The published day starts at this hour; earlier hours are moved to the end.
pub const DAY_START_HOUR: usize = 6;

/// Named parts of the day, each six hours wide, in hour order.
pub const PERIODS: [&str; 4] = ["dawn", "morning", "afternoon", "evening"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HourShare {
    pub hours: u32,
    pub sumtime: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchedulePattern {
    /// the two busiest periods, e.g. `"evening, afternoon"`
    pub label: String,
    /// 24 scaled values, starting at [DAY_START_HOUR]
    pub distribution: Vec<HourShare>,
}

pub fn pattern(hours: &[HourCount]) -> Measured<SchedulePattern> {
    if hours.is_empty() {
        return Measured::NoData;
    }

    let mut day = [0u64; HOURS_PER_DAY];
    for count in hours {
        match day.get_mut(count.hour as usize) {
            Some(slot) => *slot += count.samples,
            None => tracing::warn!(hour = count.hour, "ignoring sample count outside of the day"),
        }
    }

    Measured::Value(SchedulePattern {
        label: busiest_periods(&day),
        distribution: normalize(&day),
    })
}

fn busiest_periods(day: &[u64; HOURS_PER_DAY]) -> String {
    let mut periods: Vec<(&str, u64)> = PERIODS
        .iter()
        .zip(day.chunks(HOURS_PER_DAY / PERIODS.len()))
        .map(|(name, hours)| (*name, hours.iter().sum()))
        .collect();
    periods.sort_by_key(|(_, samples)| Reverse(*samples));

    format!("{}, {}", periods[0].0, periods[1].0)
}

/// Min-max scale the day to `[0, 1]` and rotate it to start at [DAY_START_HOUR].
///
/// A flat day has no spread to scale by: it becomes all ones, or all zeros when nothing was sampled.
fn normalize(day: &[u64; HOURS_PER_DAY]) -> Vec<HourShare> {
    let min = day.iter().copied().min().unwrap_or_default();
    let max = day.iter().copied().max().unwrap_or_default();

    let mut shares: Vec<HourShare> = day
        .iter()
        .enumerate()
        .map(|(hour, &samples)| {
            let sumtime = if max == min {
                if max > 0 { 1.0 } else { 0.0 }
            } else {
                round_to((samples - min) as f64 / (max - min) as f64, 2)
            };

            HourShare {
                hours: hour as u32,
                sumtime,
            }
        })
        .collect();

    shares.rotate_left(DAY_START_HOUR);
    shares
}

#[instrument(skip(telemetry), fields(creator_id = %creator.creator_id, platform_id = %creator.platform_id))]
pub async fn extract<T: Telemetry>(
    telemetry: &T,
    creator: &Creator,
    lookback: Lookback,
) -> Measured<SchedulePattern> {
    match telemetry.hourly_counts(&creator.platform_id, lookback).await {
        Ok(hours) => pattern(&hours),
        Err(error) => {
            tracing::error!(%error, "could not compute the broadcast schedule");
            Measured::NoData
        }
    }
}
