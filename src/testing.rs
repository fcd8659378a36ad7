//! In-memory stand-ins for the database, shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use snafu::ResultExt as _;
use tokio::time::Instant;

use crate::database::DatabaseQuerySnafu;
use crate::model::{CategoryCount, Creator, HourCount, MetricsSnapshot, SessionSummary, SnapshotChanges};
use crate::store::{Directory, Pool, Result, Snapshots, Telemetry};
use crate::time::{Lookback, Timestamp};

fn throw(message: impl std::fmt::Display) -> surrealdb::Error {
    surrealdb::error::Db::Thrown(message.to_string()).into()
}

/// Every store operation a connection served, in the order they were issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Sessions(String),
    Categories(String),
    Hours(String),
    Clicks(String),
    Samples(String),
    Impressions(String),
    Exists(String),
    Insert(String),
    Update(String),
    Delete(String),
    SetFollowers(String, i64),
    Eligible,
    Holders,
}

impl Call {
    fn name(&self) -> &'static str {
        match self {
            Call::Sessions(_) => "sessions",
            Call::Categories(_) => "categories",
            Call::Hours(_) => "hours",
            Call::Clicks(_) => "clicks",
            Call::Samples(_) => "samples",
            Call::Impressions(_) => "impressions",
            Call::Exists(_) => "exists",
            Call::Insert(_) => "insert",
            Call::Update(_) => "update",
            Call::Delete(_) => "delete",
            Call::SetFollowers(..) => "set_followers",
            Call::Eligible => "eligible",
            Call::Holders => "holders",
        }
    }

    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Call::Insert(_) | Call::Update(_) | Call::Delete(_) | Call::SetFollowers(..)
        )
    }
}

#[derive(Debug, Default)]
pub struct State {
    pub sessions: HashMap<String, Vec<SessionSummary>>,
    pub categories: HashMap<String, Vec<CategoryCount>>,
    pub hours: HashMap<String, Vec<HourCount>>,
    pub clicks: HashMap<String, Vec<u64>>,
    pub samples: HashMap<String, u64>,
    pub impressions: HashMap<String, u64>,
    pub snapshots: HashMap<String, MetricsSnapshot>,
    pub creators: Vec<Creator>,

    /// Operations (by [Call] name) that fail for every creator.
    pub failing: HashSet<&'static str>,
    /// Operations (by [Call] name) that fail only for these subjects.
    pub failing_for: HashSet<(&'static str, String)>,
    pub closed: bool,

    pub calls: Vec<Call>,
    pub acquired: Vec<Instant>,
    pub released: Vec<Instant>,
}

#[derive(Debug, Clone, Default)]
pub struct FakeStore {
    state: Arc<Mutex<State>>,
}

impl FakeStore {
    pub fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_write).collect()
    }

    pub fn connection(&self) -> FakeConnection {
        FakeConnection {
            state: self.state.clone(),
        }
    }

    pub fn with_creators(self, creators: Vec<Creator>) -> Self {
        self.state().creators = creators;
        self
    }

    /// A creator with three qualifying sessions averaging 10 viewers over 5 hours of airtime, and
    /// enough logged impressions for a ratio of 0.5.
    pub fn with_streamer(self, creator: &Creator) -> Self {
        {
            let mut state = self.state();
            state.sessions.insert(
                creator.platform_id.clone(),
                vec![
                    SessionSummary::new(8.0, 90, 20),
                    SessionSummary::new(10.0, 90, 30),
                    SessionSummary::new(12.0, 90, 25),
                ],
            );
            state.categories.insert(
                creator.platform_id.clone(),
                vec![CategoryCount::new("1".into(), Some("Tetris".into()), None, 270)],
            );
            state.hours.insert(
                creator.platform_id.clone(),
                vec![HourCount::new(20, 200), HourCount::new(21, 70)],
            );
            state.clicks.insert(creator.creator_id.clone(), vec![2, 3]);
            state.samples.insert(creator.platform_id.clone(), 120);
            state.impressions.insert(creator.creator_id.clone(), 20);
        }
        self
    }

    pub fn with_snapshot(self, snapshot: MetricsSnapshot) -> Self {
        self.state().snapshots.insert(snapshot.creator_id.clone(), snapshot);
        self
    }

    pub fn failing(self, operation: &'static str) -> Self {
        self.state().failing.insert(operation);
        self
    }

    pub fn failing_for(self, operation: &'static str, subject: &str) -> Self {
        self.state().failing_for.insert((operation, subject.to_string()));
        self
    }

    pub fn closed(self) -> Self {
        self.state().closed = true;
        self
    }
}

impl Pool for FakeStore {
    type Connection = FakeConnection;

    async fn acquire(&self) -> Result<FakeConnection> {
        {
            let mut state = self.state();
            if state.closed {
                return Err(throw("pool is closed")).context(DatabaseQuerySnafu);
            }
            state.acquired.push(Instant::now());
        }

        Ok(self.connection())
    }
}

/// A checked out [FakeStore] connection. Records its release when dropped.
#[derive(Debug)]
pub struct FakeConnection {
    state: Arc<Mutex<State>>,
}

impl FakeConnection {
    fn record(&self, call: Call) -> Result<MutexGuard<'_, State>> {
        let mut state = self.state.lock().unwrap();
        let name = call.name();
        let subject = match &call {
            Call::Sessions(subject)
            | Call::Categories(subject)
            | Call::Hours(subject)
            | Call::Clicks(subject)
            | Call::Samples(subject)
            | Call::Impressions(subject)
            | Call::Exists(subject)
            | Call::Insert(subject)
            | Call::Update(subject)
            | Call::Delete(subject)
            | Call::SetFollowers(subject, _) => subject.clone(),
            Call::Eligible | Call::Holders => String::new(),
        };
        state.calls.push(call);

        if state.failing.contains(name) || state.failing_for.contains(&(name, subject)) {
            return Err(throw(format!("{name} is failing"))).context(DatabaseQuerySnafu);
        }

        Ok(state)
    }
}

impl Drop for FakeConnection {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.released.push(Instant::now());
        }
    }
}

impl Telemetry for FakeConnection {
    async fn session_summaries(&self, platform_id: &str, _: Lookback) -> Result<Vec<SessionSummary>> {
        let state = self.record(Call::Sessions(platform_id.to_string()))?;
        Ok(state.sessions.get(platform_id).cloned().unwrap_or_default())
    }

    async fn category_counts(&self, platform_id: &str, _: Lookback) -> Result<Vec<CategoryCount>> {
        let state = self.record(Call::Categories(platform_id.to_string()))?;
        Ok(state.categories.get(platform_id).cloned().unwrap_or_default())
    }

    async fn hourly_counts(&self, platform_id: &str, _: Lookback) -> Result<Vec<HourCount>> {
        let state = self.record(Call::Hours(platform_id.to_string()))?;
        Ok(state.hours.get(platform_id).cloned().unwrap_or_default())
    }

    async fn daily_clicks(&self, creator_id: &str) -> Result<Vec<u64>> {
        let state = self.record(Call::Clicks(creator_id.to_string()))?;
        Ok(state.clicks.get(creator_id).cloned().unwrap_or_default())
    }

    async fn sample_count(&self, platform_id: &str, _: Lookback) -> Result<u64> {
        let state = self.record(Call::Samples(platform_id.to_string()))?;
        Ok(state.samples.get(platform_id).copied().unwrap_or_default())
    }

    async fn impression_count(&self, creator_id: &str, _: Lookback) -> Result<u64> {
        let state = self.record(Call::Impressions(creator_id.to_string()))?;
        Ok(state.impressions.get(creator_id).copied().unwrap_or_default())
    }
}

impl Snapshots for FakeConnection {
    async fn snapshot_exists(&self, creator_id: &str) -> Result<bool> {
        let state = self.record(Call::Exists(creator_id.to_string()))?;
        Ok(state.snapshots.contains_key(creator_id))
    }

    async fn insert_snapshot(&self, snapshot: &MetricsSnapshot) -> Result<()> {
        let mut state = self.record(Call::Insert(snapshot.creator_id.clone()))?;
        state.snapshots.insert(snapshot.creator_id.clone(), snapshot.clone());
        Ok(())
    }

    async fn update_snapshot(&self, creator_id: &str, changes: &SnapshotChanges) -> Result<()> {
        let mut state = self.record(Call::Update(creator_id.to_string()))?;
        if let Some(snapshot) = state.snapshots.get_mut(creator_id) {
            snapshot.apply(changes.clone());
        }
        Ok(())
    }

    async fn delete_snapshot(&self, creator_id: &str) -> Result<()> {
        let mut state = self.record(Call::Delete(creator_id.to_string()))?;
        state.snapshots.remove(creator_id);
        Ok(())
    }

    async fn set_followers(&self, creator_id: &str, followers: i64) -> Result<()> {
        let mut state = self.record(Call::SetFollowers(creator_id.to_string(), followers))?;
        if let Some(snapshot) = state.snapshots.get_mut(creator_id) {
            snapshot.followers = followers;
        }
        Ok(())
    }
}

impl Directory for FakeConnection {
    async fn eligible_creators(&self, _: Timestamp) -> Result<Vec<Creator>> {
        let state = self.record(Call::Eligible)?;
        Ok(state.creators.clone())
    }

    async fn snapshot_holders(&self) -> Result<Vec<Creator>> {
        let state = self.record(Call::Holders)?;
        Ok(state
            .creators
            .iter()
            .filter(|creator| state.snapshots.contains_key(&creator.creator_id))
            .cloned()
            .collect())
    }
}

pub fn creator(index: usize) -> Creator {
    Creator::new(format!("creator-{index}"), format!("platform-{index}"))
}

pub fn snapshot(creator_id: &str, followers: i64) -> MetricsSnapshot {
    MetricsSnapshot {
        creator_id: creator_id.to_string(),
        followers,
        ctr: 1,
        airtime: 1.0,
        viewer: 1,
        impression: 1,
        cost: 1,
        content: "Chess".to_string(),
        open_hour: "dawn, morning".to_string(),
        time_graph_data: r#"{"data":[]}"#.to_string(),
        contents_graph_data: r#"{"data":[]}"#.to_string(),
        peakview: 1,
        rip: 0.1,
    }
}
