use tracing::instrument;

use super::{mean, round_to, Measured};
use crate::model::{Creator, SessionSummary};
use crate::store::Telemetry;
use crate::time::Lookback;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewingVolume {
    /// average broadcast length in hours, one decimal
    pub airtime: f64,
    /// average of the per-session mean viewer counts
    pub viewer: i64,
    pub peakview: i64,
}

/// Reduce per-session statistics, discarding sessions that lasted an hour or less.
///
/// A session with `samples <= samples_per_hour` ended too early to be representative.
pub fn summarize(sessions: &[SessionSummary], samples_per_hour: u32) -> Measured<ViewingVolume> {
    let qualifying: Vec<&SessionSummary> = sessions
        .iter()
        .filter(|session| session.samples > u64::from(samples_per_hour))
        .collect();

    let Some(samples) = mean(qualifying.iter().map(|session| session.samples as f64)) else {
        return Measured::NoData;
    };
    let Some(viewer) = mean(qualifying.iter().map(|session| session.viewer)) else {
        return Measured::NoData;
    };
    let Some(peakview) = qualifying.iter().map(|session| session.peak).max() else {
        return Measured::NoData;
    };

    Measured::Value(ViewingVolume {
        airtime: round_to(samples / f64::from(samples_per_hour), 1),
        viewer: viewer.round() as i64,
        peakview,
    })
}

#[instrument(skip(telemetry), fields(creator_id = %creator.creator_id, platform_id = %creator.platform_id))]
pub async fn extract<T: Telemetry>(
    telemetry: &T,
    creator: &Creator,
    samples_per_hour: u32,
    lookback: Lookback,
) -> Measured<ViewingVolume> {
    match telemetry.session_summaries(&creator.platform_id, lookback).await {
        Ok(sessions) => summarize(&sessions, samples_per_hour),
        Err(error) => {
            tracing::error!(%error, "could not fetch viewer counts and airtime");
            Measured::NoData
        }
    }
}
