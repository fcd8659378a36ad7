use chrono::Utc;
use dotenvy::dotenv;
use snafu::ResultExt as _;

use creator_metrics::config::{self, Config};
use creator_metrics::database::{Database, Pool};
use creator_metrics::error::{
    ApplicationError, ConnectDatabaseSnafu, FollowerClientSnafu, FollowerRunSnafu, MetricsRunSnafu,
};
use creator_metrics::follower::{self, FollowerClient};
use creator_metrics::{logger, pipeline, Located};

#[tokio::main]
async fn main() -> Result<(), ApplicationError> {
    dotenv().ok();

    let config = config::load()?;

    let _guard = logger::init(&config)?;

    run(&config).await.inspect_err(|error| {
        tracing::error!(%error, location = %error.location(), "run failed");
    })
}

async fn run(config: &Config) -> Result<(), ApplicationError> {
    let platform = config.platform();

    let database = Database::connect(&config.database.url)
        .await
        .context(ConnectDatabaseSnafu)?;
    let pool = Pool::new(database, platform.tables.clone(), config.pool_size);

    if config.run.metrics() {
        let now = Utc::now();
        let lookback = config.lookback(now)?;

        pipeline::run_metrics(&pool, &platform, lookback, now)
            .await
            .context(MetricsRunSnafu)?;
    }

    if config.run.followers() {
        let client = FollowerClient::new(&platform.follower_api, &config.twitch).context(FollowerClientSnafu)?;

        follower::run_followers(&pool, &platform, &client)
            .await
            .context(FollowerRunSnafu)?;
    }

    pool.close();
    Ok(())
}
