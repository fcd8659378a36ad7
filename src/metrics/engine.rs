use serde::Serialize;
use serde_json::json;
use tracing::instrument;

use super::content::{self, ContentMix};
use super::schedule::{self, SchedulePattern};
use super::viewing::{self, ViewingVolume};
use super::{clicks, impression, Measured};
use crate::model::{Creator, MetricsSnapshot, SnapshotChanges};
use crate::platform::Platform;
use crate::store::{Snapshots, Telemetry};
use crate::time::Lookback;

/// Ten-minute slots per hour, used to turn airtime into an impression estimate.
const SLOTS_PER_HOUR: f64 = 6.0;
const COST_PER_SLOT: f64 = 2.0;

/// What reconciling a creator's candidate against the stored snapshot requires.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Insert(MetricsSnapshot),
    Update(SnapshotChanges),
    Delete,
    Nothing,
}

/// How one creator's evaluation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Inserted,
    Updated,
    Deleted,
    /// Did not qualify and had no snapshot to remove.
    Unchanged,
    /// No qualifying session in the lookback window, nothing was looked up or written.
    NoData,
    /// The snapshot lookup or the write failed; retried on the next run.
    Failed,
}

fn graph<T: Serialize>(points: &[T]) -> String {
    json!({ "data": points }).to_string()
}

/// Combine the extractor outputs into the snapshot a creator should have, if they qualify at all.
///
/// A creator without viewers, airtime or logged impressions does not qualify.
pub fn candidate(
    creator: &Creator,
    volume: ViewingVolume,
    content: ContentMix,
    schedule: SchedulePattern,
    click_rate: f64,
    rip: f64,
) -> Option<MetricsSnapshot> {
    if volume.viewer == 0 || volume.airtime == 0.0 || rip == 0.0 {
        return None;
    }

    let viewer = volume.viewer as f64;
    Some(MetricsSnapshot {
        creator_id: creator.creator_id.clone(),
        followers: 0,
        ctr: click_rate.ceil() as i64,
        airtime: volume.airtime,
        viewer: volume.viewer,
        impression: (volume.airtime * viewer * SLOTS_PER_HOUR * rip).ceil() as i64,
        cost: (viewer * SLOTS_PER_HOUR * COST_PER_SLOT * rip).ceil() as i64,
        content: content.dominant,
        open_hour: schedule.label,
        time_graph_data: graph(&schedule.distribution),
        contents_graph_data: graph(&content.distribution),
        peakview: volume.peakview,
        rip,
    })
}

pub fn decide(candidate: Option<MetricsSnapshot>, exists: bool) -> Action {
    match (candidate, exists) {
        (Some(snapshot), true) => Action::Update(snapshot.changes()),
        (Some(snapshot), false) => Action::Insert(snapshot),
        (None, true) => Action::Delete,
        (None, false) => Action::Nothing,
    }
}

/// Evaluate one creator and reconcile the result with their stored snapshot.
///
/// Viewing volume is measured first; without it nothing else is queried. Extractor failures degrade
/// to empty values, only the snapshot lookup and the write can fail the creator.
#[instrument(skip_all, fields(platform = platform.name, creator_id = %creator.creator_id))]
pub async fn process<C>(connection: &C, platform: &Platform, lookback: Lookback, creator: &Creator) -> Outcome
where
    C: Telemetry + Snapshots,
{
    let Measured::Value(volume) = viewing::extract(connection, creator, platform.samples_per_hour, lookback).await
    else {
        tracing::debug!("no qualifying broadcast in the lookback window");
        return Outcome::NoData;
    };

    let (click_rate, schedule, content, rip) = futures::join!(
        clicks::extract(connection, creator),
        schedule::extract(connection, creator, lookback),
        content::extract(connection, creator, platform.content_cut, lookback),
        impression::extract(connection, creator, lookback),
    );

    let candidate = candidate(
        creator,
        volume,
        content.unwrap_or_default(),
        schedule.unwrap_or_default(),
        click_rate.unwrap_or_default(),
        rip,
    );

    let exists = match connection.snapshot_exists(&creator.creator_id).await {
        Ok(exists) => exists,
        Err(error) => {
            tracing::error!(%error, "could not look up the existing snapshot");
            return Outcome::Failed;
        }
    };

    reconcile(connection, &creator.creator_id, decide(candidate, exists)).await
}

async fn reconcile<C: Snapshots>(connection: &C, creator_id: &str, action: Action) -> Outcome {
    let (result, outcome) = match action {
        Action::Insert(snapshot) => (connection.insert_snapshot(&snapshot).await, Outcome::Inserted),
        Action::Update(changes) => (
            connection.update_snapshot(creator_id, &changes).await,
            Outcome::Updated,
        ),
        Action::Delete => (connection.delete_snapshot(creator_id).await, Outcome::Deleted),
        Action::Nothing => (Ok(()), Outcome::Unchanged),
    };

    match result {
        Ok(()) => {
            tracing::info!(?outcome, "reconciled the metrics snapshot");
            outcome
        }
        Err(error) => {
            tracing::error!(%error, ?outcome, "could not write the metrics snapshot");
            Outcome::Failed
        }
    }
}
