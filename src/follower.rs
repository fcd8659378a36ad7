//! The "run follower reconciliation" entry point and the platform APIs it reads from.

use std::future::Future;

use serde::Serialize;
use snafu::{Location, ResultExt as _, Snafu};
use tracing::instrument;

use crate::batch::{partition, AcquireListingSnafu, BatchError, Batcher, Work};
use crate::model::Creator;
use crate::platform::Platform;
use crate::store::{Directory, Pool, Snapshots};
use crate::Located;

pub use api::{FollowerClient, Helix, Session, Station};

/// HTTP clients of the follower endpoints.
mod api;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum FollowerApiError {
    #[snafu(display("failed to build the http client at {location}: {source}"))]
    BuildClient {
        source: reqwest::Error,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("request to `{url}` failed at {location}: {source}"))]
    Request {
        url: String,
        source: reqwest::Error,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("`{url}` answered with {status} at {location}"))]
    Status {
        url: String,
        status: reqwest::StatusCode,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("`{url}` answered with a malformed body at {location}: {source}"))]
    Body {
        url: String,
        source: reqwest::Error,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("twitch client id and secret are not configured at {location}"))]
    MissingCredentials {
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("token exchange returned an empty token at {location}"))]
    EmptyToken {
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("follower request was made without a token at {location}"))]
    Unauthenticated {
        #[snafu(implicit)]
        location: Location,
    },
}

impl Located for FollowerApiError {
    fn location(&self) -> Location {
        match self {
            FollowerApiError::BuildClient { location, .. }
            | FollowerApiError::Request { location, .. }
            | FollowerApiError::Status { location, .. }
            | FollowerApiError::Body { location, .. }
            | FollowerApiError::MissingCredentials { location }
            | FollowerApiError::EmptyToken { location }
            | FollowerApiError::Unauthenticated { location } => *location,
        }
    }
}

/// Where follower counts come from.
pub trait FollowerSource {
    /// Whatever every follower request of one run needs, obtained once at the start of the run.
    type Session;

    fn authenticate(&self) -> impl Future<Output = Result<Self::Session, FollowerApiError>> + Send;

    fn followers(
        &self,
        session: &Self::Session,
        platform_id: &str,
    ) -> impl Future<Output = Result<i64, FollowerApiError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    Updated,
    FetchFailed,
    WriteFailed,
}

/// What one follower run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FollowerReport {
    pub creators: usize,
    pub chunks: usize,
    pub updated: usize,
    pub failed: usize,
    /// the token exchange failed and no creator was looked at
    pub aborted: bool,
}

struct FollowerWork<'a, S: FollowerSource> {
    source: &'a S,
    session: &'a S::Session,
}

impl<C, S> Work<C> for FollowerWork<'_, S>
where
    C: Snapshots,
    S: FollowerSource,
{
    type Item = Creator;
    type Output = Refresh;

    async fn perform(&self, connection: &C, creator: &Creator) -> Refresh {
        refresh(connection, self.source, self.session, creator).await
    }
}

#[instrument(skip_all, fields(creator_id = %creator.creator_id, platform_id = %creator.platform_id))]
async fn refresh<C, S>(connection: &C, source: &S, session: &S::Session, creator: &Creator) -> Refresh
where
    C: Snapshots,
    S: FollowerSource,
{
    let followers = match source.followers(session, &creator.platform_id).await {
        Ok(followers) => followers,
        Err(error) => {
            tracing::warn!(%error, "could not fetch the follower count");
            return Refresh::FetchFailed;
        }
    };

    match connection.set_followers(&creator.creator_id, followers).await {
        Ok(()) => {
            tracing::debug!(followers, "updated the follower count");
            Refresh::Updated
        }
        Err(error) => {
            tracing::error!(%error, followers, "could not store the follower count");
            Refresh::WriteFailed
        }
    }
}

/// Refresh the follower count of every creator that has a metrics snapshot.
///
/// A failed token exchange ends the run before anything is listed or fetched.
#[instrument(skip_all, fields(platform = platform.name))]
pub async fn run_followers<P, S>(pool: &P, platform: &Platform, source: &S) -> Result<FollowerReport, BatchError>
where
    P: Pool,
    S: FollowerSource,
{
    let session = match source.authenticate().await {
        Ok(session) => session,
        Err(error) => {
            tracing::error!(%error, "could not authenticate with the follower api, skipping the follower run");
            return Ok(FollowerReport {
                aborted: true,
                ..Default::default()
            });
        }
    };

    let creators = snapshot_holders(pool).await?;
    let chunks = partition(&creators, platform.chunk_size).len();
    tracing::info!(creators = creators.len(), chunks, "starting the follower run");

    let work = FollowerWork {
        source,
        session: &session,
    };
    let refreshed = Batcher::new(pool, platform.chunk_size, platform.follower_cooldown)
        .run(&creators, &work)
        .await?;

    let updated = refreshed.iter().filter(|refresh| **refresh == Refresh::Updated).count();
    let report = FollowerReport {
        creators: creators.len(),
        chunks,
        updated,
        failed: refreshed.len() - updated,
        aborted: false,
    };

    tracing::info!(?report, "finished the follower run");
    Ok(report)
}

async fn snapshot_holders<P: Pool>(pool: &P) -> Result<Vec<Creator>, BatchError> {
    let connection = pool.acquire().await.context(AcquireListingSnafu { job: "follower" })?;

    match connection.snapshot_holders().await {
        Ok(creators) => Ok(creators),
        Err(error) => {
            tracing::error!(%error, "could not list the creators with a snapshot");
            Ok(Vec::new())
        }
    }
}
