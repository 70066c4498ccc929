//! microhub binary entry point.
//!
//! Usage: microhub [--log-level <level>] <serve|config> [options]
//!
//! `serve` exposes a demo `echo` command behind the idempotency guard.
//! Settings come from the environment (see `microhub::config`) and can be
//! overridden by flags.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use microhub::config::HubConfig;
use microhub::idempotency::{FailurePolicy, IdempotencyGuard};
use microhub::logging::{self, LogConfig};
use microhub::microsvc::{self, Service, Transport};
use microhub::store::{AtomicStore, InMemoryStore};
use tracing::{error, info};

/// microhub: idempotent command service.
#[derive(Parser, Debug)]
#[command(name = "microhub")]
#[command(about = "Command service with at-most-once execution per idempotency key")]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit JSON log lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the demo service.
    Serve(ServeArgs),
    /// Print the resolved configuration and exit.
    Config,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Wire protocol: http or grpc.
    #[arg(long, default_value = "http")]
    transport: Transport,

    /// Listen address (overrides MICROHUB_ADDRESS).
    #[arg(long)]
    address: Option<String>,

    /// Redis connection URL. Without it the in-memory store is used.
    #[arg(long, env = "REDIS_URL")]
    redis_url: Option<String>,

    /// Idempotency window in seconds (overrides MICROHUB_IDEMPOTENCY_TTL_SECS).
    #[arg(long)]
    ttl_secs: Option<u64>,

    /// Delete the in-flight marker when a handler fails instead of waiting
    /// for it to expire.
    #[arg(long)]
    release_on_failure: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&LogConfig {
        default_level: cli.log_level.clone(),
        json: cli.log_json,
    });

    let mut config = HubConfig::from_env().context("failed to load configuration")?;

    match cli.command {
        Command::Config => {
            println!("{config:#?}");
            Ok(())
        }
        Command::Serve(args) => {
            apply_overrides(&mut config, &args);
            config.validate().context("invalid configuration")?;
            serve(config, args.transport).await
        }
    }
}

fn apply_overrides(config: &mut HubConfig, args: &ServeArgs) {
    if let Some(address) = &args.address {
        config.address = address.clone();
    }
    if let Some(url) = &args.redis_url {
        config.redis_url = Some(url.clone());
    }
    if let Some(secs) = args.ttl_secs {
        config.idempotency.ttl = Duration::from_secs(secs);
    }
    if args.release_on_failure {
        config.idempotency.failure_policy = FailurePolicy::Release;
    }
}

fn open_store(config: &HubConfig) -> anyhow::Result<Arc<dyn AtomicStore>> {
    match &config.redis_url {
        #[cfg(feature = "redis")]
        Some(url) => {
            let store = microhub::store::RedisStore::open(url)
                .with_context(|| format!("failed to open redis store at {url}"))?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "redis"))]
        Some(_) => anyhow::bail!("REDIS_URL is set but microhub was built without the `redis` feature"),
        None => Ok(Arc::new(InMemoryStore::new())),
    }
}

async fn serve(config: HubConfig, transport: Transport) -> anyhow::Result<()> {
    let store = open_store(&config)?;
    let guard = IdempotencyGuard::new(store, config.idempotency.clone())?;

    let info = config.server_info();
    let store_kind = if config.redis_url.is_some() { "redis" } else { "memory" };
    info!(
        service = %info.name,
        id = %info.id,
        version = %info.version,
        address = %config.address,
        transport = ?transport,
        store = store_kind,
        ttl_secs = config.idempotency.ttl.as_secs(),
        key_field = %config.idempotency.key_field,
        "Configuration loaded"
    );

    let service = Arc::new(
        Service::new(info)
            .wrap(guard)
            .command("echo", |ctx| Ok(ctx.raw_input().clone())),
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::select! {
        result = run_transport(service, &config.address, transport) => {
            if let Err(e) = &result {
                error!(error = %e, "Transport exited with error");
            }
            result
        }
        _ = ctrl_c => {
            info!("Received shutdown signal, exiting...");
            Ok(())
        }
    }
}

async fn run_transport(
    service: Arc<Service>,
    address: &str,
    transport: Transport,
) -> anyhow::Result<()> {
    match transport {
        Transport::Http => microsvc::serve(service, address)
            .await
            .with_context(|| format!("http transport failed on {address}")),
        #[cfg(feature = "grpc")]
        Transport::Grpc => {
            let addr = address
                .parse()
                .with_context(|| format!("invalid grpc listen address {address}"))?;
            microsvc::serve_grpc(service, addr)
                .await
                .context("grpc transport failed")
        }
        #[cfg(not(feature = "grpc"))]
        Transport::Grpc => anyhow::bail!("microhub was built without the `grpc` feature"),
    }
}
