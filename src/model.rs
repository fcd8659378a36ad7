use derive_new::new;
use serde::{Deserialize, Serialize};

/// A creator picked for analysis: our internal id plus the id the streaming platform knows them by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize, new)]
pub struct Creator {
    pub creator_id: String,
    pub platform_id: String,
}

/// One broadcast session reduced to its sample statistics.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, new)]
pub struct SessionSummary {
    /// mean viewer count over the session's samples
    pub viewer: f64,
    /// number of samples collected during the session
    pub samples: u64,
    pub peak: i64,
}

/// Number of samples a creator spent in one content category.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, new)]
pub struct CategoryCount {
    pub category_id: String,
    pub name: Option<String>,
    pub localized_name: Option<String>,
    pub samples: u64,
}

impl CategoryCount {
    /// The name shown to people: localized if possible, then the raw name, then the id.
    pub fn label(&self) -> &str {
        self.localized_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or(self.name.as_deref())
            .unwrap_or(&self.category_id)
    }
}

/// Number of samples a creator collected during one hour of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, new)]
pub struct HourCount {
    pub hour: u32,
    pub samples: u64,
}

/// The persisted aggregate metrics of one creator.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MetricsSnapshot {
    pub creator_id: String,
    pub followers: i64,
    pub ctr: i64,
    pub airtime: f64,
    pub viewer: i64,
    pub impression: i64,
    pub cost: i64,
    pub content: String,
    pub open_hour: String,
    pub time_graph_data: String,
    pub contents_graph_data: String,
    pub peakview: i64,
    pub rip: f64,
}

/// Every snapshot field a metrics run owns. `followers` belongs to the follower job and is never part of it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotChanges {
    pub ctr: i64,
    pub airtime: f64,
    pub viewer: i64,
    pub impression: i64,
    pub cost: i64,
    pub content: String,
    pub open_hour: String,
    pub time_graph_data: String,
    pub contents_graph_data: String,
    pub peakview: i64,
    pub rip: f64,
}

impl MetricsSnapshot {
    pub fn changes(&self) -> SnapshotChanges {
        SnapshotChanges {
            ctr: self.ctr,
            airtime: self.airtime,
            viewer: self.viewer,
            impression: self.impression,
            cost: self.cost,
            content: self.content.clone(),
            open_hour: self.open_hour.clone(),
            time_graph_data: self.time_graph_data.clone(),
            contents_graph_data: self.contents_graph_data.clone(),
            peakview: self.peakview,
            rip: self.rip,
        }
    }

    /// Overwrite the metrics fields while keeping identity and followers.
    pub fn apply(&mut self, changes: SnapshotChanges) {
        let followers = self.followers;
        let creator_id = std::mem::take(&mut self.creator_id);

        *self = MetricsSnapshot {
            creator_id,
            followers,
            ctr: changes.ctr,
            airtime: changes.airtime,
            viewer: changes.viewer,
            impression: changes.impression,
            cost: changes.cost,
            content: changes.content,
            open_hour: changes.open_hour,
            time_graph_data: changes.time_graph_data,
            contents_graph_data: changes.contents_graph_data,
            peakview: changes.peakview,
            rip: changes.rip,
        };
    }
}
