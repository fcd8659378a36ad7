use std::collections::HashMap;

use derive_new::new;
use serde::Deserialize;
use snafu::{Location, OptionExt as _, ResultExt as _, Snafu};
use surrealdb::{
    engine::any::Any,
    opt::auth::{self, Credentials, Jwt, Signin},
    Surreal,
};
use url::Url;

use crate::Located;

pub use pool::{Pool, PooledConnection};
pub use query::{Bindings, Sql};

/// Bounded checkout of database connections.
mod pool;
/// Helper for executing arbitrary SurrealQL queries.
mod query;
/// SurrealQL implementation of the telemetry, snapshot and directory interfaces.
mod store;

pub type Result<T, E = DatabaseError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum DatabaseError {
    #[snafu(display("failed to query the database at {location}: {source}"))]
    DatabaseQuery {
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("failed to deserialize the database response at {location}: {source}"))]
    DatabaseDeserialize {
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("cannot connect to the database `{url}` at {location}: {source}"))]
    DatabaseConnection {
        url: Url,
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("url `{url}` is missing a namespace parameter (ns) at {location}"))]
    NoNamespace {
        url: Url,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("url `{url}` is missing a database parameter (db) at {location}"))]
    NoDatabase {
        url: Url,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("connection pool is closed at {location}"))]
    PoolClosed {
        source: tokio::sync::AcquireError,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("database did not pass the health check at {location}: {source}"))]
    Unhealthy {
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },
}

impl Located for DatabaseError {
    fn location(&self) -> Location {
        match self {
            DatabaseError::DatabaseQuery { location, .. }
            | DatabaseError::DatabaseDeserialize { location, .. }
            | DatabaseError::DatabaseConnection { location, .. }
            | DatabaseError::NoNamespace { location, .. }
            | DatabaseError::NoDatabase { location, .. }
            | DatabaseError::PoolClosed { location, .. }
            | DatabaseError::Unhealthy { location, .. } => *location,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(rename = "surreal_url")]
    pub url: Url,
}

/// Represents a type that can be used to establish a connection to a database.
pub trait Connection {
    /// The type of the connected database.
    type Database;

    /// Establishes a connection to the database.
    fn connect(&self) -> impl std::future::Future<Output = Result<Self::Database>> + Send;
}

impl Connection for Url {
    type Database = Surreal<Any>;

    /// Connects to the database using the URL. Remote URLs must carry the namespace and database via the `ns` and `db`
    /// query parameters and the credentials in the user info; `mem://` connects to an embedded in-memory database.
    async fn connect(&self) -> Result<Self::Database> {
        let db = surrealdb::engine::any::connect(self.as_str())
            .await
            .context(DatabaseConnectionSnafu { url: self.clone() })?;

        if self.scheme() == "mem" {
            db.use_ns("local")
                .use_db("metrics")
                .await
                .context(DatabaseConnectionSnafu { url: self.clone() })?;
            return Ok(db);
        }

        let auth = self.as_credentials()?;
        db.signin(auth.to_raw())
            .await
            .context(DatabaseConnectionSnafu { url: self.clone() })?;
        db.use_ns(&auth.namespace)
            .use_db(&auth.database)
            .await
            .context(DatabaseConnectionSnafu { url: self.clone() })?;

        Ok(db)
    }
}

/// A trait for converting a type into credentials.
pub trait AsCredentials {
    /// The associated type for the credentials.
    type Credentials;

    /// Converts the type into credentials.
    fn as_credentials(&self) -> Result<Self::Credentials>;
}

impl AsCredentials for Url {
    type Credentials = Auth;

    fn as_credentials(&self) -> Result<Self::Credentials> {
        let username = self.username().to_owned();
        let password = self.password().unwrap_or("").to_owned();

        let mut query: HashMap<String, String> = self
            .query_pairs()
            .map(|(key, val)| (key.to_string(), val.to_string()))
            .collect();

        let namespace = query
            .remove("ns")
            .context(NoNamespaceSnafu { url: self.clone() })?;

        let database = query
            .remove("db")
            .context(NoDatabaseSnafu { url: self.clone() })?;

        Ok(Auth {
            username,
            password,
            namespace,
            database,
        })
    }
}

/// Represents authentication information for a database connection.
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct Auth {
    pub username: String,
    pub password: String,
    pub namespace: String,
    pub database: String,
}

impl Auth {
    pub fn to_raw(&self) -> impl Credentials<Signin, Jwt> + '_ {
        auth::Database {
            username: &self.username,
            password: &self.password,
            namespace: &self.namespace,
            database: &self.database,
        }
    }
}

/// A connected database handle. Cheap to clone; every clone talks over the same client.
#[derive(Debug, Clone, new)]
pub struct Database {
    database: Surreal<Any>,
}

impl Database {
    pub async fn connect(url: &Url) -> Result<Self> {
        tracing::info!(scheme = url.scheme(), host = ?url.host_str(), "connecting to the database");
        url.connect().await.map(Database::new)
    }
}

impl std::ops::Deref for Database {
    type Target = Surreal<Any>;

    fn deref(&self) -> &Self::Target {
        &self.database
    }
}
