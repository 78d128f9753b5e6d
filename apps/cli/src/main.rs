//! Article enhancer CLI.
//!
//! Picks the newest original article from the store, researches competing
//! pages, rewrites it with a generative provider, and saves the result as a
//! linked derived article.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    // A missing .env file is normal; credentials may come from the environment.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
