//! The external collaborators the pipeline consumes, expressed as traits so the core never depends on a query dialect.

use std::future::Future;

use crate::database::DatabaseError;
use crate::model::{CategoryCount, Creator, HourCount, MetricsSnapshot, SessionSummary, SnapshotChanges};
use crate::time::{Lookback, Timestamp};

pub type Result<T, E = DatabaseError> = std::result::Result<T, E>;

/// Landing clicks of this kind count towards the click rate.
pub const LANDING_CLICK_KIND: i64 = 2;

/// Logged impressions of this campaign type count towards the impression ratio.
pub const IMPRESSION_CAMPAIGN: &str = "CPM";

/// Read-only queries over the session sample store.
pub trait Telemetry {
    /// Per-session sample statistics of the creator's sessions started after the lookback.
    fn session_summaries(
        &self,
        platform_id: &str,
        lookback: Lookback,
    ) -> impl Future<Output = Result<Vec<SessionSummary>>> + Send;

    /// Sample count per content category across the creator's sessions started after the lookback.
    fn category_counts(
        &self,
        platform_id: &str,
        lookback: Lookback,
    ) -> impl Future<Output = Result<Vec<CategoryCount>>> + Send;

    /// Sample count per hour of day across the creator's sessions started after the lookback.
    fn hourly_counts(
        &self,
        platform_id: &str,
        lookback: Lookback,
    ) -> impl Future<Output = Result<Vec<HourCount>>> + Send;

    /// Number of landing clicks per day on which the creator had any, over all history.
    fn daily_clicks(&self, creator_id: &str) -> impl Future<Output = Result<Vec<u64>>> + Send;

    /// Number of samples taken after the lookback in the creator's sessions.
    fn sample_count(
        &self,
        platform_id: &str,
        lookback: Lookback,
    ) -> impl Future<Output = Result<u64>> + Send;

    /// Number of impressions logged for the creator after the lookback.
    fn impression_count(
        &self,
        creator_id: &str,
        lookback: Lookback,
    ) -> impl Future<Output = Result<u64>> + Send;
}

/// Persistence of the one metrics snapshot per creator.
pub trait Snapshots {
    fn snapshot_exists(&self, creator_id: &str) -> impl Future<Output = Result<bool>> + Send;

    fn insert_snapshot(&self, snapshot: &MetricsSnapshot) -> impl Future<Output = Result<()>> + Send;

    /// Overwrite the metrics fields of an existing snapshot, leaving `followers` untouched.
    fn update_snapshot(
        &self,
        creator_id: &str,
        changes: &SnapshotChanges,
    ) -> impl Future<Output = Result<()>> + Send;

    fn delete_snapshot(&self, creator_id: &str) -> impl Future<Output = Result<()>> + Send;

    fn set_followers(&self, creator_id: &str, followers: i64) -> impl Future<Output = Result<()>> + Send;
}

/// Which creators a job should look at.
pub trait Directory {
    /// Creators who agreed to the contract, linked a platform account and were onboarded before `cutoff`.
    fn eligible_creators(&self, cutoff: Timestamp) -> impl Future<Output = Result<Vec<Creator>>> + Send;

    /// Creators who currently have a metrics snapshot.
    fn snapshot_holders(&self) -> impl Future<Output = Result<Vec<Creator>>> + Send;
}

/// A source of connections that serve every query of the pipeline.
///
/// The returned connection is released when it is dropped.
pub trait Pool {
    type Connection: Telemetry + Snapshots + Directory;

    fn acquire(&self) -> impl Future<Output = Result<Self::Connection>> + Send;
}
