use anyhow::Context as _;
use lambda_runtime::{run, service_fn, tracing, Error};
use std::env;
use std::sync::Arc;

mod comment;
mod db;
mod error;
mod event_handler;
use db::PgConnector;
use event_handler::function_handler;

pub(crate) struct Config {
    /// Connection string for the database holding the `comments` table
    pub(crate) database_url: String,
}

fn parse_config() -> anyhow::Result<Config> {
    let database_url = env::var("DATABASE_URL").context("missing DATABASE_URL variable")?;

    Ok(Config { database_url })
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::init_default_subscriber();

    let config = parse_config()?;
    let connector = Arc::new(PgConnector::new(&config)?);

    run(service_fn(move |event| {
        let connector = Arc::clone(&connector);
        async move { function_handler(connector.as_ref(), event).await }
    }))
    .await
}
