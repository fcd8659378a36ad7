use serde::Deserialize;
use surrealdb::sql::Datetime;

use super::*;
use crate::model::{CategoryCount, Creator, HourCount, MetricsSnapshot, SessionSummary, SnapshotChanges};
use crate::store::{Directory, Snapshots, Telemetry, IMPRESSION_CAMPAIGN, LANDING_CLICK_KIND};
use crate::time::{Lookback, Timestamp};

#[derive(Debug, Deserialize)]
struct CountRow {
    count: u64,
}

#[derive(Debug, Deserialize)]
struct CategoryRow {
    category: String,
    samples: u64,
}

#[derive(Debug, Deserialize)]
struct CategoryName {
    category_id: String,
    name: Option<String>,
    localized_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DayRow {
    clicks: u64,
}

impl PooledConnection {
    /// Ids of the creator's sessions started after `$since`.
    fn recent_sessions(&self) -> String {
        format!(
            "(SELECT VALUE id FROM {sessions} WHERE creator = $creator AND started_at > $since)",
            sessions = self.tables.sessions,
        )
    }

}

/// Run a `GROUP ALL` count; no matching row counts as zero.
async fn count(query: Bindings<'_>) -> Result<u64> {
    let row: Option<CountRow> = query.fetch_first().await?;
    Ok(row.map_or(0, |row| row.count))
}

impl Telemetry for PooledConnection {
    async fn session_summaries(&self, platform_id: &str, lookback: Lookback) -> Result<Vec<SessionSummary>> {
        let query = format!(
            "SELECT session, math::mean(viewer) AS viewer, count() AS samples, math::max(viewer) AS peak \
             FROM {samples} WHERE session INSIDE {sessions} GROUP BY session",
            samples = self.tables.samples,
            sessions = self.recent_sessions(),
        );

        self.database
            .sql(&query)
            .bind(("creator", platform_id.to_string()))
            .bind(("since", Datetime::from(lookback.start())))
            .fetch_first()
            .await
    }

    async fn category_counts(&self, platform_id: &str, lookback: Lookback) -> Result<Vec<CategoryCount>> {
        let query = format!(
            "SELECT category, count() AS samples FROM {samples} WHERE session INSIDE {sessions} GROUP BY category",
            samples = self.tables.samples,
            sessions = self.recent_sessions(),
        );

        let rows: Vec<CategoryRow> = self
            .database
            .sql(&query)
            .bind(("creator", platform_id.to_string()))
            .bind(("since", Datetime::from(lookback.start())))
            .fetch_first()
            .await?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<&str> = rows.iter().map(|row| row.category.as_str()).collect();
        let names: Vec<CategoryName> = self
            .database
            .sql(&format!(
                "SELECT category_id, name, localized_name FROM {categories} WHERE category_id INSIDE $ids",
                categories = self.tables.categories,
            ))
            .bind(("ids", ids))
            .fetch_first()
            .await?;

        let counts = rows
            .into_iter()
            .map(|row| {
                let name = names.iter().find(|name| name.category_id == row.category);
                CategoryCount {
                    name: name.and_then(|name| name.name.clone()),
                    localized_name: name.and_then(|name| name.localized_name.clone()),
                    category_id: row.category,
                    samples: row.samples,
                }
            })
            .collect();

        Ok(counts)
    }

    async fn hourly_counts(&self, platform_id: &str, lookback: Lookback) -> Result<Vec<HourCount>> {
        let query = format!(
            "SELECT time::hour(sampled_at) AS hour, count() AS samples FROM {samples} \
             WHERE session INSIDE {sessions} GROUP BY hour",
            samples = self.tables.samples,
            sessions = self.recent_sessions(),
        );

        self.database
            .sql(&query)
            .bind(("creator", platform_id.to_string()))
            .bind(("since", Datetime::from(lookback.start())))
            .fetch_first()
            .await
    }

    async fn daily_clicks(&self, creator_id: &str) -> Result<Vec<u64>> {
        let days: Vec<DayRow> = self
            .database
            .sql(
                "SELECT time::floor(clicked_at, 1d) AS day, count() AS clicks FROM landing_click \
                 WHERE creator_id = $creator AND kind = $kind GROUP BY day",
            )
            .bind(("creator", creator_id.to_string()))
            .bind(("kind", LANDING_CLICK_KIND))
            .fetch_first()
            .await?;

        Ok(days.into_iter().map(|day| day.clicks).collect())
    }

    async fn sample_count(&self, platform_id: &str, lookback: Lookback) -> Result<u64> {
        let query = format!(
            "SELECT count() AS count FROM {samples} \
             WHERE session INSIDE (SELECT VALUE id FROM {sessions} WHERE creator = $creator) \
             AND sampled_at > $since GROUP ALL",
            samples = self.tables.samples,
            sessions = self.tables.sessions,
        );

        let query = self
            .database
            .sql(&query)
            .bind(("creator", platform_id.to_string()))
            .bind(("since", Datetime::from(lookback.start())));

        count(query).await
    }

    async fn impression_count(&self, creator_id: &str, lookback: Lookback) -> Result<u64> {
        let query = self
            .database
            .sql(
                "SELECT count() AS count FROM campaign_log \
                 WHERE creator_id = $creator AND campaign_type = $campaign AND logged_at > $since GROUP ALL",
            )
            .bind(("creator", creator_id.to_string()))
            .bind(("since", Datetime::from(lookback.start())))
            .bind(("campaign", IMPRESSION_CAMPAIGN));

        count(query).await
    }
}

impl Snapshots for PooledConnection {
    async fn snapshot_exists(&self, creator_id: &str) -> Result<bool> {
        let found: Vec<String> = self
            .database
            .sql(&format!(
                "SELECT VALUE creator_id FROM {snapshots} WHERE creator_id = $creator LIMIT 1",
                snapshots = self.tables.snapshots,
            ))
            .bind(("creator", creator_id.to_string()))
            .fetch_first()
            .await?;

        Ok(!found.is_empty())
    }

    async fn insert_snapshot(&self, snapshot: &MetricsSnapshot) -> Result<()> {
        self.database
            .sql(&format!("CREATE {snapshots} CONTENT $snapshot", snapshots = self.tables.snapshots))
            .bind(("snapshot", snapshot))
            .execute()
            .await?;

        Ok(())
    }

    async fn update_snapshot(&self, creator_id: &str, changes: &SnapshotChanges) -> Result<()> {
        self.database
            .sql(&format!(
                "UPDATE {snapshots} MERGE $changes WHERE creator_id = $creator",
                snapshots = self.tables.snapshots,
            ))
            .bind(("changes", changes))
            .bind(("creator", creator_id.to_string()))
            .execute()
            .await?;

        Ok(())
    }

    async fn delete_snapshot(&self, creator_id: &str) -> Result<()> {
        self.database
            .sql(&format!(
                "DELETE {snapshots} WHERE creator_id = $creator",
                snapshots = self.tables.snapshots,
            ))
            .bind(("creator", creator_id.to_string()))
            .execute()
            .await?;

        Ok(())
    }

    async fn set_followers(&self, creator_id: &str, followers: i64) -> Result<()> {
        self.database
            .sql(&format!(
                "UPDATE {snapshots} SET followers = $followers WHERE creator_id = $creator",
                snapshots = self.tables.snapshots,
            ))
            .bind(("followers", followers))
            .bind(("creator", creator_id.to_string()))
            .execute()
            .await?;

        Ok(())
    }
}

impl Directory for PooledConnection {
    async fn eligible_creators(&self, cutoff: Timestamp) -> Result<Vec<Creator>> {
        let query = format!(
            "SELECT creator_id, {platform_id} AS platform_id FROM creator_info \
             WHERE agreed = true AND onboarded_at < $cutoff AND {platform_id} != NONE AND {platform_id} != NULL",
            platform_id = self.tables.platform_id,
        );

        self.database
            .sql(&query)
            .bind(("cutoff", Datetime::from(cutoff)))
            .fetch_first()
            .await
    }

    async fn snapshot_holders(&self) -> Result<Vec<Creator>> {
        let holders: Vec<String> = self
            .database
            .sql(&format!("SELECT VALUE creator_id FROM {snapshots}", snapshots = self.tables.snapshots))
            .fetch_first()
            .await?;

        let query = format!(
            "SELECT creator_id, {platform_id} AS platform_id FROM creator_info \
             WHERE creator_id INSIDE $holders AND {platform_id} != NONE AND {platform_id} != NULL",
            platform_id = self.tables.platform_id,
        );

        self.database
            .sql(&query)
            .bind(("holders", holders))
            .fetch_first()
            .await
    }
}
