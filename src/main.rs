//! Ledger VFS client - Entry Point
//!
//! Command line front end for encoding filesystem operations, querying the
//! filesystem and watching operation results.

use clap::{Parser, Subcommand};
use log::info;
use serde::Serialize;
use serde_json::Value;

use ledger_vfs_client::command::{self, Instruction, Operation};
use ledger_vfs_client::config::ClientConfig;
use ledger_vfs_client::error::handlers::{exit_code, handle_error};
use ledger_vfs_client::error::{QueryError, SubscriptionError, VfsClientError};
use ledger_vfs_client::query::{
    Existence, InfoResult, Listing, MetadataResult, OperationResult, QueryClient,
};
use ledger_vfs_client::submission::TransactionId;
use ledger_vfs_client::subscription::{ResultSubscriber, SubscriptionEvent, SubscriptionHandle};
use ledger_vfs_client::utils::init_logging;

#[derive(Parser)]
#[command(name = "ledger-vfs")]
#[command(about = "Client for a ledger-backed virtual filesystem")]
struct Cli {
    /// Config file, extension optional
    #[arg(long, env = "LEDGER_VFS_CONFIG", default_value = "config")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode an operation given as JSON, e.g. '{"op":"removeFile","fsid":"5","path":"/a"}'
    Encode {
        operation: String,

        /// Also assemble the instruction for this signer
        #[arg(long)]
        signer: Option<String>,
    },
    /// Check whether a path exists
    Exists { path: String },
    /// Fetch metadata for a path
    Metadata { path: String },
    /// Fetch tree placement for a path
    Info { path: String },
    /// List a directory
    List { path: String },
    /// Look up the result of a submitted operation
    Result {
        tx: String,

        /// Skip the settle delay
        #[arg(long)]
        now: bool,
    },
    /// Stream pushed results for a submitted operation
    Watch {
        tx: String,

        /// Stop after the first result
        #[arg(long)]
        once: bool,
    },
    /// Cancel a result subscription by handle
    Unsubscribe { handle: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ClientConfig::load_from(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            init_logging("info");
            let err = VfsClientError::from(e);
            handle_error(&err);
            std::process::exit(exit_code(&err));
        }
    };
    init_logging(&config.log_level);

    if let Err(err) = run(cli.command, &config).await {
        handle_error(&err);
        std::process::exit(exit_code(&err));
    }
}

async fn run(command: Commands, config: &ClientConfig) -> Result<(), VfsClientError> {
    match command {
        Commands::Encode { operation, signer } => encode_operation(&operation, signer, config),
        Commands::Exists { path } => {
            match query_client(config)?.exists(&path).await? {
                Existence::Known(exists) => println!("{}", exists),
                Existence::Unparsed(value) => print_json(&value),
            }
            Ok(())
        }
        Commands::Metadata { path } => {
            match query_client(config)?.metadata(&path).await? {
                MetadataResult::Metadata(metadata) => print_json(&metadata),
                MetadataResult::Unparsed(value) => print_json(&value),
            }
            Ok(())
        }
        Commands::Info { path } => {
            match query_client(config)?.info(&path).await? {
                InfoResult::Info(info) => print_json(&info),
                InfoResult::Unparsed(value) => print_json(&value),
            }
            Ok(())
        }
        Commands::List { path } => {
            match query_client(config)?.list_directory(&path).await? {
                Listing::Entries(entries) => print_json(&entries),
                Listing::Unparsed(value) => print_json(&value),
            }
            Ok(())
        }
        Commands::Result { tx, now } => {
            let client = query_client(config)?;
            let tx = TransactionId::new(tx);
            let result = if now {
                client.lookup_result_now(&tx).await?
            } else {
                client.operation_result(&tx).await?
            };
            match result {
                OperationResult::Pending => println!("pending"),
                OperationResult::Completed(outcome) => print_json(&outcome),
                OperationResult::Unparsed(value) => print_json(&value),
            }
            Ok(())
        }
        Commands::Watch { tx, once } => watch(config, TransactionId::new(tx), once).await,
        Commands::Unsubscribe { handle } => {
            let subscriber = ResultSubscriber::new(config).map_err(SubscriptionError::from)?;
            let removed = subscriber
                .unsubscribe(&SubscriptionHandle::new(handle))
                .await?;
            println!("{}", removed);
            Ok(())
        }
    }
}

fn encode_operation(
    operation: &str,
    signer: Option<String>,
    config: &ClientConfig,
) -> Result<(), VfsClientError> {
    let op = Operation::from_json(operation)?;

    match signer {
        Some(signer) => {
            let instruction = Instruction::build(&config.program_id, &signer, &op)?;
            print_json(&serde_json::json!({
                "programId": instruction.program_id,
                "participants": instruction.participants,
                "data": hex::encode(instruction.data.as_bytes()),
            }));
        }
        None => {
            let payload = command::encode(&op)?;
            println!("{}", hex::encode(payload.as_bytes()));
        }
    }
    Ok(())
}

async fn watch(config: &ClientConfig, tx: TransactionId, once: bool) -> Result<(), VfsClientError> {
    let subscriber = ResultSubscriber::new(config).map_err(SubscriptionError::from)?;
    let mut subscription = subscriber.subscribe(&tx).await?;
    info!("Watching {} on {}", tx, subscriber.ws_url());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                subscription.close().await;
                return Ok(());
            }
            event = subscription.next_event() => match event {
                Some(SubscriptionEvent::Result(notification)) => {
                    print_json(&serde_json::json!({
                        "subscription": notification.subscription.as_str(),
                        "outcome": notification.outcome,
                    }));
                    if once {
                        subscription.close().await;
                        return Ok(());
                    }
                }
                Some(SubscriptionEvent::Error(e)) => return Err(e.into()),
                Some(SubscriptionEvent::Closed) | None => return Ok(()),
            }
        }
    }
}

fn query_client(config: &ClientConfig) -> Result<QueryClient, VfsClientError> {
    QueryClient::new(config).map_err(|e| QueryError::from(e).into())
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(_) => println!("{}", Value::Null),
    }
}
