use snafu::{Location, Snafu};

use crate::batch::BatchError;
use crate::database::DatabaseError;
use crate::follower::FollowerApiError;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ApplicationError {
    /// could not parse the configuration from the environment
    ConfigLoad {
        source: envy::Error,
        #[snafu(implicit)]
        location: Location,
    },

    /// LOOKBACK_MONTHS reaches before the earliest supported date
    #[snafu(display("a lookback of {months} months reaches past the supported calendar at {location}"))]
    InvalidLookback {
        months: u32,
        #[snafu(implicit)]
        location: Location,
    },

    /// Could not connect to the database
    ConnectDatabase {
        source: DatabaseError,
        #[snafu(implicit)]
        location: Location,
    },

    /// Could not build the follower API client
    FollowerClient {
        source: FollowerApiError,
        #[snafu(implicit)]
        location: Location,
    },

    /// The metrics pipeline stopped before finishing every chunk
    MetricsRun {
        source: BatchError,
        #[snafu(implicit)]
        location: Location,
    },

    /// The follower reconciliation stopped before finishing every chunk
    FollowerRun {
        source: BatchError,
        #[snafu(implicit)]
        location: Location,
    },

    /// Could not initialize the logger
    InitializeLogger {
        source: tracing::subscriber::SetGlobalDefaultError,
        #[snafu(implicit)]
        location: Location,
    },
}

impl crate::Located for ApplicationError {
    fn location(&self) -> Location {
        match self {
            ApplicationError::ConfigLoad { location, .. }
            | ApplicationError::InvalidLookback { location, .. }
            | ApplicationError::ConnectDatabase { location, .. }
            | ApplicationError::FollowerClient { location, .. }
            | ApplicationError::MetricsRun { location, .. }
            | ApplicationError::FollowerRun { location, .. }
            | ApplicationError::InitializeLogger { location, .. } => *location,
        }
    }
}
