pub mod batch;
pub mod config;
pub mod database;
pub mod error;
pub mod follower;
pub mod logger;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod platform;
pub mod store;
pub mod time;

#[cfg(test)]
mod testing;

pub trait Located {
    fn location(&self) -> snafu::Location;
}
