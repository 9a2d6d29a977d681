//! METY client entry point.

use mety_client::commands::{self, Command};
use mety_client::config::ClientConfig;
use mety_client::context::{AppContext, Flow};
use mety_client::error::ClientError;
use mety_client::persistence;
use mety_client::render;
use mety_client::telemetry;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    let config = ClientConfig::load()?;
    telemetry::init_tracing(&config.log)?;
    let invocation = commands::parse_args(std::env::args().skip(1))?;
    let context = AppContext::from_config(&config)?;

    match persistence::load(&config.persistence_path) {
        Ok(Some(state)) => context.store.restore(state).await,
        Ok(None) => {}
        Err(err) => tracing::warn!(error = %err, "ignoring unreadable saved session"),
    }

    let user = match invocation.user {
        Some(user) => Some(user),
        None => context.store.read().await.user_id().map(str::to_string),
    };
    if let Some(user) = user {
        if let Err(err) = context.activate_user(&user).await {
            eprintln!("Failed to load plans for {user}: {err}");
        }
    }

    match invocation.command {
        Some(command) => run_once(&context, command).await,
        None => run_session(&context).await?,
    }

    let persisted = context.store.to_persisted().await;
    if let Err(err) = persistence::save(&config.persistence_path, &persisted) {
        tracing::warn!(error = %err, "failed to save session");
    }
    Ok(())
}

async fn run_once(context: &AppContext, command: Command) {
    match context.execute(command).await {
        Ok((output, _)) => println!("{output}"),
        Err(err) => eprintln!("{err}"),
    }
    print_notifications(context).await;
}

async fn run_session(context: &AppContext) -> Result<(), ClientError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"mety> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let command = match commands::parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                eprintln!("{err}");
                continue;
            }
        };
        match context.execute(command).await {
            Ok((_, Flow::Quit)) => break,
            Ok((output, Flow::Continue)) => println!("{output}"),
            Err(err) => eprintln!("{err}"),
        }
        print_notifications(context).await;
    }
    Ok(())
}

async fn print_notifications(context: &AppContext) {
    for notification in context.store.drain_notifications().await {
        eprintln!("{}", render::notification(&notification));
    }
}
