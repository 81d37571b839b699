use anyhow::Result;
use chrono::Local;
use clap::ArgMatches;
use tokio::signal;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{info, warn};

use crate::display::print_snapshot;
use crate::engine::default_engine;
use crate::error::Error;
use crate::settings::ConfigFile;

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("signal received, stopping");
}

async fn once(mut conf: ConfigFile) -> Result<()> {
    let mut engine = default_engine(&conf)?;

    let result = engine.poll(Local::now().date_naive()).await;
    conf.persist_rotation(engine.tokens_mut())?;

    print_snapshot(std::io::stdout(), &result.map_err(Error::into_report)?)
}

async fn watch(mut conf: ConfigFile) -> Result<()> {
    let mut engine = default_engine(&conf)?;
    let period = Duration::from_secs(conf.config().update_interval_secs);

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => return Ok(()),
            _ = ticker.tick() => {
                let result = engine.poll(Local::now().date_naive()).await;
                // A failed write leaves the token pending for the next tick.
                if let Err(err) = conf.persist_rotation(engine.tokens_mut()) {
                    warn!(error = %err, "refresh token not saved");
                }

                match result {
                    Ok(snapshot) => print_snapshot(std::io::stdout(), &snapshot)?,
                    Err(err) if err.requires_reauth() => return Err(err.into_report()),
                    Err(err) => warn!(error = %err, "poll failed, retrying in {:?}", period),
                }
            }
        }
    }
}

pub(crate) async fn run(matches: &ArgMatches, conf: ConfigFile) -> Result<()> {
    if matches.is_present("watch") {
        watch(conf).await
    } else {
        once(conf).await
    }
}
