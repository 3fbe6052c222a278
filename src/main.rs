//! radiodns - RadioDNS command line client

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use radiodns::{
    build_targets, resolve_application, resolve_bearer_authority, HickoryResolver, NetworkConfig, RadioDns,
    ReqwestClient, ResolveOptions, DEFAULT_TRANSPORT, SPI_APP_LEGACY,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// DNS query timeout in seconds (resolver default if unset)
    #[arg(long, global = true, env = "RADIODNS_DNS_TIMEOUT")]
    dns_timeout: Option<u64>,

    /// DNS query attempts before giving up (resolver default if unset)
    #[arg(long, global = true, env = "RADIODNS_DNS_ATTEMPTS")]
    dns_attempts: Option<usize>,

    /// HTTP request timeout in seconds (no timeout if unset)
    #[arg(long, global = true, env = "RADIODNS_HTTP_TIMEOUT")]
    http_timeout: Option<u64>,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve a bearer, URL or hostname and fetch its SI document
    Si {
        /// Bearer URI (fm:ce1.c479.09580), SI URL or hostname
        source: String,

        /// Write the document here instead of standard output
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Remove bearers that do not resolve back to the serving authority
        #[arg(long)]
        remove_non_authoritative_bearers: bool,
    },

    /// Print the authoritative FQDN for a broadcast bearer
    Authority {
        /// Bearer URI
        bearer: String,
    },

    /// List hosts an authority advertises for an application, best first
    Lookup {
        /// Authoritative FQDN
        authority: String,

        #[arg(long, default_value = SPI_APP_LEGACY)]
        application: String,

        #[arg(long, default_value = DEFAULT_TRANSPORT)]
        transport: String,
    },

    /// Print the candidate SI URLs for a source without fetching them
    Targets {
        /// Bearer URI, SI URL or hostname
        source: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "radiodns=debug" } else { "radiodns=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let network = NetworkConfig {
        dns_timeout: cli.dns_timeout.map(Duration::from_secs),
        dns_attempts: cli.dns_attempts,
        http_timeout: cli.http_timeout.map(Duration::from_secs),
        ..NetworkConfig::default()
    };

    match run(cli.command, &network).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, network: &NetworkConfig) -> Result<()> {
    let resolver = HickoryResolver::new(network);

    match command {
        Commands::Si {
            source,
            output,
            remove_non_authoritative_bearers,
        } => {
            let http = ReqwestClient::new(network)?;
            let mut options = ResolveOptions::new()
                .remove_non_authoritative_bearers(remove_non_authoritative_bearers);
            if let Some(path) = output {
                options = options.output(path);
            }
            RadioDns::new(resolver, http)
                .options(options)
                .resolve_and_fetch(&source)
                .await
                .context("all attempts to obtain SI file failed")?;
        }

        Commands::Authority { bearer } => {
            let authority = resolve_bearer_authority(&resolver, &bearer).await?;
            println!("{authority}");
        }

        Commands::Lookup {
            authority,
            application,
            transport,
        } => {
            let hosts = resolve_application(&resolver, &authority, &application, &transport).await?;
            for host in hosts {
                println!("{host}");
            }
        }

        Commands::Targets { source } => {
            let targets = build_targets(&resolver, &source, SPI_APP_LEGACY, DEFAULT_TRANSPORT).await?;
            match &targets.authority {
                Some(authority) => println!("authority: {authority}"),
                None => println!("authority: (unknown)"),
            }
            for url in &targets.urls {
                println!("{url}");
            }
        }
    }

    Ok(())
}
