use anyhow::Result;
use clap::ArgMatches;

use crate::display::print_accounts;
use crate::engine::default_engine;
use crate::error::Error;
use crate::settings::ConfigFile;

async fn print(mut conf: ConfigFile) -> Result<()> {
    let mut engine = default_engine(&conf)?;

    let accounts = engine.accounts().await;
    conf.persist_rotation(engine.tokens_mut())?;

    print_accounts(std::io::stdout(), &accounts.map_err(Error::into_report)?)?;

    Ok(())
}

pub(crate) async fn run(_matches: &ArgMatches, conf: ConfigFile) -> Result<()> {
    print(conf).await
}
