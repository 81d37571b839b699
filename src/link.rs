use std::io::{stdin, stdout, Write};

use anyhow::Result;
use clap::ArgMatches;
use oauth_link::{authorize_url, code_from_redirect, LinkMode};
use tracing::info;

use crate::engine::http_client;
use crate::settings::ConfigFile;
use crate::token::{Credentials, TokenManager};

fn read_redirect() -> Result<String> {
    print!("Paste the URL you were redirected to: ");
    stdout().flush()?;

    let mut buf = String::new();
    stdin().read_line(&mut buf)?;

    Ok(buf)
}

async fn link(mut conf: ConfigFile, mode: LinkMode, redirect: Option<&str>) -> Result<()> {
    let c = conf.config().clone();
    let url = authorize_url(&c.idp_base_url, &c.client_id, &c.scopes, mode)?;

    let redirect = match redirect {
        Some(r) => r.to_string(),
        None => {
            println!("Visit {} to authorize access to your accounts.", url);
            println!(
                "After signing in you will land on {}; copy the full address from the browser.",
                oauth_link::REDIRECT_URI
            );
            read_redirect()?
        }
    };
    let code = code_from_redirect(&redirect)?;

    let mut tokens = TokenManager::new(http_client(&c)?, Credentials::from(&c));
    tokens.exchange_code(&code).await?;
    let saved = conf.persist_rotation(&mut tokens)?;

    info!(?mode, saved, "authorization code exchanged");
    if saved {
        println!("Linked, refresh token saved to {}.", conf.path().display());
    } else {
        println!("Linked, the refresh token in {} is still current.", conf.path().display());
    }

    Ok(())
}

pub(crate) async fn run(matches: &ArgMatches, conf: ConfigFile) -> Result<()> {
    let mode = if matches.is_present("reauth") {
        LinkMode::Reauth
    } else {
        LinkMode::Create
    };

    link(conf, mode, matches.value_of("redirect")).await
}
