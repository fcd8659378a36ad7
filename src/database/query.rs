use serde::de::DeserializeOwned;
use snafu::ResultExt as _;
use surrealdb::opt::QueryResult;

use super::*;

/// An extension trait that allows you to execute raw SQL queries. Parameters can be bound using the [Bindings::bind]
/// method which takes any serializable data structure.
///
/// # Example
/// ```ignore
/// let sessions: Vec<SessionRow> = database.sql("SELECT * FROM twitch_stream WHERE creator = $creator")
///     .bind(("creator", "1234"))
///     .fetch_first()
///     .await?;
/// ```
pub trait Sql<'a> {
    fn sql(&'a self, query: &str) -> Bindings<'a>;
}

impl<'a> Sql<'a> for Database {
    fn sql(&'a self, query: &str) -> Bindings<'a> {
        Bindings::new(self.query(query))
    }
}

#[derive(Debug, new)]
pub struct Bindings<'a> {
    query: surrealdb::method::Query<'a, Any>,
}

impl Bindings<'_> {
    pub fn bind(mut self, params: impl serde::Serialize) -> Self {
        let query = self.query;
        self.query = query.bind(params);
        self
    }

    /// Execute the query and fail if any of its statements failed.
    pub async fn execute(self) -> Result<surrealdb::Response> {
        let response = self
            .query
            .await
            .context(DatabaseQuerySnafu)?
            .check()
            .context(DatabaseQuerySnafu)?;
        tracing::trace!(?response, "executed query");
        Ok(response)
    }

    /// Execute the query and return the first statement's result as a deserialized value.
    pub async fn fetch_first<T: DeserializeOwned>(self) -> Result<T>
    where
        usize: QueryResult<T>,
    {
        let mut statements = self.query.await.context(DatabaseQuerySnafu)?;
        let result = statements.take::<T>(0).context(DatabaseDeserializeSnafu)?;
        Ok(result)
    }
}
