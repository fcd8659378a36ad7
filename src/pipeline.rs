//! The "run metrics pipeline" entry point.

use serde::Serialize;
use snafu::ResultExt as _;
use tracing::instrument;

use crate::batch::{partition, AcquireListingSnafu, BatchError, Batcher, Work};
use crate::metrics::{self, Outcome};
use crate::model::Creator;
use crate::platform::Platform;
use crate::store::{Directory, Pool, Snapshots, Telemetry};
use crate::time::{eligibility_cutoff, Lookback, Timestamp};

/// What one metrics run did, by creator outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsReport {
    pub creators: usize,
    pub chunks: usize,
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
    pub no_data: usize,
    pub failed: usize,
}

impl MetricsReport {
    fn tally(creators: usize, chunks: usize, outcomes: &[Outcome]) -> Self {
        let mut report = Self {
            creators,
            chunks,
            ..Default::default()
        };

        for outcome in outcomes {
            match outcome {
                Outcome::Inserted => report.inserted += 1,
                Outcome::Updated => report.updated += 1,
                Outcome::Deleted => report.deleted += 1,
                Outcome::Unchanged => report.unchanged += 1,
                Outcome::NoData => report.no_data += 1,
                Outcome::Failed => report.failed += 1,
            }
        }

        report
    }
}

#[derive(Debug, Clone, Copy)]
struct MetricsWork<'a> {
    platform: &'a Platform,
    lookback: Lookback,
}

impl<C> Work<C> for MetricsWork<'_>
where
    C: Telemetry + Snapshots,
{
    type Item = Creator;
    type Output = Outcome;

    async fn perform(&self, connection: &C, creator: &Creator) -> Outcome {
        metrics::process(connection, self.platform, self.lookback, creator).await
    }
}

/// Recompute and reconcile the metrics snapshot of every eligible creator.
///
/// Only failing to check out a connection stops the run; everything else is logged and counted.
#[instrument(skip_all, fields(platform = platform.name, lookback = %lookback.start()))]
pub async fn run_metrics<P: Pool>(
    pool: &P,
    platform: &Platform,
    lookback: Lookback,
    now: Timestamp,
) -> Result<MetricsReport, BatchError> {
    let creators = eligible_creators(pool, now).await?;
    let chunks = partition(&creators, platform.chunk_size).len();
    tracing::info!(creators = creators.len(), chunks, "starting the metrics run");

    let work = MetricsWork { platform, lookback };
    let outcomes = Batcher::new(pool, platform.chunk_size, platform.metrics_cooldown)
        .run(&creators, &work)
        .await?;

    let report = MetricsReport::tally(creators.len(), chunks, &outcomes);
    tracing::info!(?report, "finished the metrics run");
    Ok(report)
}

/// A failed listing is an empty run, not an error: the next scheduled run tries again.
async fn eligible_creators<P: Pool>(pool: &P, now: Timestamp) -> Result<Vec<Creator>, BatchError> {
    let connection = pool.acquire().await.context(AcquireListingSnafu { job: "metrics" })?;

    match connection.eligible_creators(eligibility_cutoff(now)).await {
        Ok(creators) => Ok(creators),
        Err(error) => {
            tracing::error!(%error, "could not list the eligible creators");
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing::{creator, snapshot, Call, FakeStore};

    fn now() -> Timestamp {
        "2024-10-19T09:00:00Z".parse().unwrap()
    }

    fn lookback() -> Lookback {
        Lookback::starting(now(), 2).unwrap()
    }

    fn platform() -> Platform {
        Platform {
            chunk_size: 2,
            metrics_cooldown: Duration::from_secs(10),
            ..Platform::twitch()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn every_eligible_creator_is_reconciled() {
        let creators: Vec<Creator> = (0..5).map(creator).collect();
        let store = FakeStore::default()
            .with_creators(creators.clone())
            .with_streamer(&creators[0])
            .with_streamer(&creators[1])
            .with_snapshot(snapshot(&creators[1].creator_id, 42))
            .with_snapshot(snapshot(&creators[2].creator_id, 7))
            .with_streamer(&creators[2])
            .with_streamer(&creators[3]);
        store.state().impressions.remove(&creators[2].creator_id);
        store.state().impressions.remove(&creators[3].creator_id);

        let report = run_metrics(&store, &platform(), lookback(), now())
            .await
            .unwrap();

        assert_eq!(
            report,
            MetricsReport {
                creators: 5,
                chunks: 3,
                inserted: 1,
                updated: 1,
                deleted: 1,
                unchanged: 1,
                no_data: 1,
                failed: 0,
            }
        );

        // one listing connection, then one per chunk
        assert_eq!(store.state().acquired.len(), 4);
        assert_eq!(store.state().snapshots[&creators[1].creator_id].followers, 42);
        assert!(!store.state().snapshots.contains_key(&creators[2].creator_id));
    }

    #[tokio::test]
    async fn failing_listing_is_an_empty_run() {
        let store = FakeStore::default().with_creators(vec![creator(1)]).failing("eligible");

        let report = run_metrics(&store, &platform(), lookback(), now())
            .await
            .unwrap();

        assert_eq!(report, MetricsReport::default());
        assert_eq!(store.calls(), vec![Call::Eligible]);
    }

    #[tokio::test]
    async fn closed_pool_stops_the_run() {
        let store = FakeStore::default().with_creators(vec![creator(1)]).closed();

        let error = run_metrics(&store, &platform(), lookback(), now())
            .await
            .unwrap_err();

        assert!(matches!(error, BatchError::AcquireListing { job: "metrics", .. }), "{error}");
    }

    #[tokio::test]
    async fn failed_writes_are_counted() {
        let creators: Vec<Creator> = (0..2).map(creator).collect();
        let store = FakeStore::default()
            .with_creators(creators.clone())
            .with_streamer(&creators[0])
            .with_streamer(&creators[1])
            .failing_for("insert", &creators[0].creator_id);

        let report = run_metrics(&store, &platform(), lookback(), now())
            .await
            .unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.inserted, 1);
        assert!(store.state().snapshots.contains_key(&creators[1].creator_id));
    }
}
