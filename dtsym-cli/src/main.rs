//! dtsym command-line interface.
//!
//! Thin shell around `dtsym-core`: parses arguments and environment
//! variables, initializes logging, and wires the pipeline together.

mod args;

use std::path::Path;

use anyhow::Context;
use clap::Parser;

use args::{Cli, ClientArgs, Commands, TargetOs, UploadArgs};
use dtsym_core::client::{DssClientCache, DssClientConfig};
use dtsym_core::invoke::{run_client, ClientAction, ClientInvocation};
use dtsym_core::upload::{put_symbols, zip_if_required, SymbolUpload};
use dtsym_core::{auto_link_lldb, link_custom_lldb};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    tracing::debug!("Starting dtsym v{}", dtsym_core::VERSION);

    if let Err(err) = run(cli).await {
        tracing::error!("{err:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Client(args) => {
            let path = client_cache(&args).resolve().await?;
            println!("{}", path.display());
        }
        Commands::Upload(args) => run_upload(args).await?,
    }
    Ok(())
}

async fn run_upload(args: UploadArgs) -> anyhow::Result<()> {
    match args.os {
        TargetOs::Android => {
            let symbols = zip_if_required(&args.symbols_file, args.auto_zip)?;
            let upload = SymbolUpload {
                server: args.client.server.clone(),
                api_token: args.client.api_token.clone(),
                app_id: args.app_id,
                bundle_id: args.bundle_id,
                os: args.os.as_str().to_string(),
                version: args.version,
                version_str: args.version_str,
            };
            put_symbols(&upload, &symbols).await?;
        }
        TargetOs::Ios => {
            let client = client_cache(&args.client)
                .resolve()
                .await
                .context("failed to resolve the symbolication client")?;

            if !args.no_lldb_link {
                let destination = client.parent().unwrap_or_else(|| Path::new("."));
                match &args.lldb_path {
                    Some(lldb) => link_custom_lldb(lldb, destination)?,
                    None => auto_link_lldb(destination).await?,
                }
            }

            let invocation = ClientInvocation {
                action: if args.decode {
                    ClientAction::Decode
                } else {
                    ClientAction::Upload
                },
                app_id: args.app_id,
                api_token: args.client.api_token.clone(),
                os: args.os.as_str().to_string(),
                bundle_id: args.bundle_id,
                version_str: args.version_str,
                version: args.version,
                symbols_file: args.symbols_file,
                server: args.client.server.clone(),
                debug_mode: args.debug_mode,
            };
            run_client(&client, &invocation).await?;
        }
    }
    Ok(())
}

fn client_cache(args: &ClientArgs) -> DssClientCache {
    let mut config = DssClientConfig::new(&args.server, &args.api_token);
    if let Some(path) = &args.client_path {
        config = config.with_pinned_client(path);
    }
    DssClientCache::new(config)
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new(format!(
                        "dtsym={default_level},dtsym_core={default_level}"
                    ))
                }),
        )
        .init();
}
