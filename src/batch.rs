use std::future::Future;
use std::time::Duration;

use derive_new::new;
use futures::future::join_all;
use snafu::{Location, ResultExt as _, Snafu};
use tracing::instrument;

use crate::database::DatabaseError;
use crate::store::Pool;
use crate::Located;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum BatchError {
    #[snafu(display("failed to check out a connection for chunk {chunk} at {location}: {source}"))]
    AcquireChunk {
        chunk: usize,
        source: DatabaseError,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("failed to check out a connection to list the creators of the {job} job at {location}: {source}"))]
    AcquireListing {
        job: &'static str,
        source: DatabaseError,
        #[snafu(implicit)]
        location: Location,
    },
}

impl Located for BatchError {
    fn location(&self) -> Location {
        match self {
            BatchError::AcquireChunk { location, .. } | BatchError::AcquireListing { location, .. } => *location,
        }
    }
}

/// Something to do for every item of a batch, given the connection its chunk checked out.
pub trait Work<C> {
    type Item;
    type Output;

    fn perform(&self, connection: &C, item: &Self::Item) -> impl Future<Output = Self::Output>;
}

/// Runs work over a list in fixed-size chunks.
///
/// Chunks run one after another. Every item of a chunk runs concurrently on the one connection the
/// chunk checked out, which is released before the cool-down that separates it from the next chunk.
#[derive(Debug, Clone, new)]
pub struct Batcher<'p, P> {
    pool: &'p P,
    chunk_size: usize,
    cooldown: Duration,
}

impl<P: Pool> Batcher<'_, P> {
    pub async fn run<W>(&self, items: &[W::Item], work: &W) -> Result<Vec<W::Output>, BatchError>
    where
        W: Work<P::Connection>,
    {
        let chunks = partition(items, self.chunk_size);
        let total = chunks.len();
        let mut outputs = Vec::with_capacity(items.len());

        for (index, chunk) in chunks.into_iter().enumerate() {
            let number = index + 1;
            outputs.extend(self.run_chunk(number, total, chunk, work).await?);

            if number < total {
                tracing::info!(cooldown = %humantime::format_duration(self.cooldown), "cooling down before the next chunk");
                tokio::time::sleep(self.cooldown).await;
            }
        }

        Ok(outputs)
    }

    #[instrument(skip(self, chunk, work), fields(size = chunk.len()))]
    async fn run_chunk<W>(
        &self,
        number: usize,
        total: usize,
        chunk: &[W::Item],
        work: &W,
    ) -> Result<Vec<W::Output>, BatchError>
    where
        W: Work<P::Connection>,
    {
        let connection = self.pool.acquire().await.context(AcquireChunkSnafu { chunk: number })?;
        tracing::info!("processing chunk");

        let outputs = join_all(chunk.iter().map(|item| work.perform(&connection, item))).await;
        drop(connection);

        Ok(outputs)
    }
}

/// Split `items` into consecutive chunks of `size`; only the last one may be shorter.
pub fn partition<T>(items: &[T], size: usize) -> Vec<&[T]> {
    items.chunks(size.max(1)).collect()
}
