mod accounts;
mod core;
mod display;
mod engine;
mod error;
mod init;
mod link;
mod settings;
mod snapshot;
mod token;
mod upstream;

use anyhow::Result;
use clap::{arg, Command};
use tracing_subscriber::{
    filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use crate::settings::ConfigFile;

static CLIENT_NAME: &str = "burnrate";

async fn run() -> Result<()> {
    let app = Command::new(CLIENT_NAME)
        .about("The burnrate utility polls your bank accounts and reports how long \
         the money lasts at the current rate of spending, and whether it reaches payday.")
        .version("0.1.0")
        .subcommand_required(true)
        .allow_external_subcommands(false)
        .arg(arg!(CONFIG: -c --config [FILE] "Sets a custom config file"))
        .arg(arg!(verbose: -v --verbose "Logs progress and API activity"))
        .subcommand(Command::new("init").about("Writes a new config file with API credentials."))
        .subcommand(Command::new("link")
            .about("Authorizes access to your accounts and stores the refresh token.")
            .arg(arg!(reauth: --reauth "Re-authorize after the stored refresh token expired."))
            .arg(arg!(redirect: -r --redirect [URL] "The URL the bank redirected to, skips the prompt.")))
        .subcommand(Command::new("accounts").about("Prints linked accounts to stdout."))
        .subcommand(Command::new("snapshot")
            .about("Fetches balances and transactions and prints spending, runway and payday health.")
            .arg(arg!(watch: -w --watch "Keeps polling on the configured interval until interrupted.")));

    let matches = app.get_matches();

    let level = if matches.is_present("verbose") {
        LevelFilter::INFO
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::registry()
        .with(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match matches.subcommand() {
        Some(("init", _)) => {
            init::run(matches.value_of("CONFIG")).await?;
        }
        Some(("link", link_matches)) => {
            let conf = ConfigFile::read(matches.value_of("CONFIG"))?;
            link::run(link_matches, conf).await?;
        }
        Some(("accounts", account_matches)) => {
            let conf = ConfigFile::read(matches.value_of("CONFIG"))?;
            accounts::run(account_matches, conf).await?;
        }
        Some(("snapshot", snapshot_matches)) => {
            let conf = ConfigFile::read(matches.value_of("CONFIG"))?;
            snapshot::run(snapshot_matches, conf).await?;
        }
        None => unreachable!("subcommand is required"),
        _ => unreachable!(),
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}
