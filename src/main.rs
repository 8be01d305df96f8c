use alloy::primitives::{Address, I256};
use anyhow::{anyhow, Result};
use clap::{Arg, ArgMatches, Command};
use ocr_bindings::bind::{CallOpts, ContractBackend, TransactOpts, WatchOpts};
use ocr_bindings::config::Config;
use ocr_bindings::contracts::offchain_aggregator::{AggregatorArgs, Billing, OffchainAggregator};
use ocr_bindings::ethereum::utils::{
    format_answer, interpret_rpc_error, validate_address, validate_block_range, validate_network,
};
use ocr_bindings::ethereum::{ArtifactStore, ProviderManager};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

fn cli() -> Command {
    let feed = Arg::new("feed")
        .required(true)
        .value_name("FEED")
        .help("Aggregator address or configured feed name");

    Command::new("ocr-feed")
        .version("0.1.0")
        .about("Read, query and watch OCR offchain aggregator feeds")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .global(true)
                .help("Path to configuration file"),
        )
        .arg(
            Arg::new("network")
                .short('n')
                .long("network")
                .value_name("NETWORK")
                .global(true)
                .help("Network to use (ethereum, sepolia)"),
        )
        .arg(
            Arg::new("rpc-url")
                .short('r')
                .long("rpc-url")
                .value_name("URL")
                .global(true)
                .help("RPC endpoint URL"),
        )
        .arg(
            Arg::new("private-key")
                .long("private-key")
                .value_name("KEY")
                .global(true)
                .help("Signing key for transactions (defaults to PRIVATE_KEY)"),
        )
        .arg(
            Arg::new("allow-writes")
                .long("allow-writes")
                .global(true)
                .help("Allow write operations (transactions)")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .help("Generate a sample configuration file and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config-path")
                .long("config-path")
                .help("Print the default configuration file path and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("round")
                .about("Show the latest round of a feed")
                .arg(feed.clone()),
        )
        .subcommand(
            Command::new("events")
                .about("List AnswerUpdated events in a block range")
                .arg(feed.clone())
                .arg(
                    Arg::new("from")
                        .long("from")
                        .value_name("BLOCK")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("0"),
                )
                .arg(
                    Arg::new("to")
                        .long("to")
                        .value_name("BLOCK")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    Arg::new("round")
                        .long("round")
                        .value_name("ROUND_ID")
                        .value_parser(clap::value_parser!(u64))
                        .action(clap::ArgAction::Append)
                        .help("Only rounds with this id (repeatable)"),
                ),
        )
        .subcommand(
            Command::new("watch")
                .about("Stream new transmissions until interrupted")
                .arg(feed.clone()),
        )
        .subcommand(
            Command::new("request-round")
                .about("Ask the oracles for a new round")
                .arg(feed),
        )
        .subcommand(
            Command::new("deploy")
                .about("Deploy an aggregator from a compiled artifact")
                .arg(
                    Arg::new("artifact")
                        .required(true)
                        .value_name("ARTIFACT")
                        .help("Artifact name under artifacts_dir, or a path to its JSON"),
                )
                .arg(
                    Arg::new("link")
                        .long("link")
                        .required(true)
                        .value_name("ADDRESS")
                        .help("LINK token address"),
                )
                .arg(
                    Arg::new("decimals")
                        .long("decimals")
                        .value_parser(clap::value_parser!(u8))
                        .default_value("8"),
                )
                .arg(
                    Arg::new("description")
                        .long("description")
                        .required(true)
                        .value_name("TEXT"),
                )
                .arg(
                    Arg::new("min-answer")
                        .long("min-answer")
                        .value_parser(clap::value_parser!(i64))
                        .allow_negative_numbers(true)
                        .default_value("1"),
                )
                .arg(
                    Arg::new("max-answer")
                        .long("max-answer")
                        .value_parser(clap::value_parser!(i64))
                        .default_value("9223372036854775807"),
                ),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let matches = cli().get_matches();

    if matches.get_flag("generate-config") {
        println!("{}", Config::generate_sample());
        return Ok(());
    }

    if matches.get_flag("config-path") {
        match Config::default_config_path() {
            Ok(path) => {
                println!("{}", path.display());
                return Ok(());
            }
            Err(e) => {
                error!("Could not determine default config path: {}", e);
                return Err(e);
            }
        }
    }

    let config_path = match matches.get_one::<String>("config") {
        Some(path) => Some(PathBuf::from(path)),
        None => Config::default_config_path()
            .ok()
            .filter(|path| path.exists()),
    };
    let mut config = Config::load_or_default(config_path).await;

    if let Some(network) = matches.get_one::<String>("network") {
        let available: Vec<String> = config.networks.keys().cloned().collect();
        validate_network(network, &available)?;
        config.default_network = network.clone();
    }

    if let Some(rpc_url) = matches.get_one::<String>("rpc-url") {
        if let Some(network_config) = config.networks.get_mut(&config.default_network) {
            network_config.rpc_url = rpc_url.clone();
        }
    }

    if matches.get_flag("allow-writes") {
        config.security.allow_write_operations = true;
    }

    info!("Using network: {}", config.default_network);

    let manager = ProviderManager::new(config.clone())?;
    if let Err(e) = manager.validate_network_connection(None).await {
        warn!("{}", e);
    }

    match matches.subcommand() {
        Some(("round", sub)) => show_round(&config, &manager, sub).await,
        Some(("events", sub)) => list_events(&config, &manager, sub).await,
        Some(("watch", sub)) => watch_transmissions(&config, &manager, sub).await,
        Some(("request-round", sub)) => {
            let feed = config.resolve_feed(required(sub, "feed")?)?;
            let backend = signing_backend(&config, &manager, &matches)?;
            request_round(&config, backend, feed).await
        }
        Some(("deploy", sub)) => {
            let backend = signing_backend(&config, &manager, &matches)?;
            deploy(&config, backend, sub).await
        }
        _ => {
            cli().print_help()?;
            Ok(())
        }
    }
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str> {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("Missing argument '{}'", name))
}

fn signing_backend(
    config: &Config,
    manager: &ProviderManager,
    matches: &ArgMatches,
) -> Result<Arc<impl ContractBackend + 'static>> {
    if !config.security.allow_write_operations {
        return Err(anyhow!(
            "Write operations are disabled. Pass --allow-writes or set security.allow_write_operations"
        ));
    }

    let private_key = match matches.get_one::<String>("private-key") {
        Some(key) => key.clone(),
        None => std::env::var("PRIVATE_KEY")
            .map_err(|_| anyhow!("No signing key: pass --private-key or set PRIVATE_KEY"))?,
    };
    manager.signing_backend(None, &private_key)
}

async fn show_round(config: &Config, manager: &ProviderManager, sub: &ArgMatches) -> Result<()> {
    let address = config.resolve_feed(required(sub, "feed")?)?;
    let feed = OffchainAggregator::new(address, manager.backend(None)?)?;
    let opts = CallOpts::default();

    let description = feed.description(&opts).await?;
    let decimals = feed.decimals(&opts).await?;
    let round = feed
        .latest_round_data(&opts)
        .await
        .map_err(|e| anyhow!(interpret_rpc_error(&e.to_string())))?;

    println!("{} ({:?})", description, address);
    println!("  round:      {}", round.round_id);
    println!("  answer:     {}", format_answer(round.answer, decimals));
    println!("  updated at: {}", round.updated_at);
    Ok(())
}

async fn list_events(config: &Config, manager: &ProviderManager, sub: &ArgMatches) -> Result<()> {
    let address = config.resolve_feed(required(sub, "feed")?)?;
    let from = sub.get_one::<u64>("from").copied().unwrap_or_default();
    let range = validate_block_range(from, sub.get_one::<u64>("to").copied())?;
    let rounds: Vec<alloy::primitives::U256> = sub
        .get_many::<u64>("round")
        .map(|ids| ids.map(|id| alloy::primitives::U256::from(*id)).collect())
        .unwrap_or_default();

    let feed = OffchainAggregator::new(address, manager.backend(None)?)?;
    let decimals = feed.decimals(&CallOpts::default()).await?;

    let mut events = feed.filter_answer_updated(&range, &[], &rounds).await?;
    let mut count = 0usize;
    while events.next().await {
        if let Some(event) = events.event() {
            println!(
                "block {:>10}  round {:>8}  answer {}",
                event.raw.block_number.unwrap_or_default(),
                event.round_id,
                format_answer(event.current, decimals)
            );
            count += 1;
        }
    }
    if let Some(e) = events.error() {
        return Err(anyhow!("Event query stopped: {}", e));
    }

    info!("{} answers found", count);
    Ok(())
}

async fn watch_transmissions(
    config: &Config,
    manager: &ProviderManager,
    sub: &ArgMatches,
) -> Result<()> {
    let address = config.resolve_feed(required(sub, "feed")?)?;
    let feed = OffchainAggregator::new(address, manager.backend(None)?)?;
    let decimals = feed.decimals(&CallOpts::default()).await?;

    let (sink, mut transmissions) = mpsc::channel(64);
    let mut subscription = feed
        .watch_new_transmission(&WatchOpts::default(), sink, &[])
        .await?;
    info!("Watching {:?}, press Ctrl-C to stop", address);

    loop {
        tokio::select! {
            Some(event) = transmissions.recv() => {
                println!(
                    "round {:>8}  answer {}  from {:?} ({} observations)",
                    event.aggregator_round_id,
                    format_answer(event.answer, decimals),
                    event.transmitter,
                    event.observations.len()
                );
            }
            err = subscription.err() => {
                return match err {
                    Some(e) => Err(anyhow!("Subscription ended: {}", e)),
                    None => Ok(()),
                };
            }
            _ = tokio::signal::ctrl_c() => {
                subscription.unsubscribe();
                info!("Stopped watching");
                return Ok(());
            }
        }
    }
}

async fn request_round<B>(config: &Config, backend: Arc<B>, address: Address) -> Result<()>
where
    B: ContractBackend + 'static,
{
    let feed = OffchainAggregator::new(address, backend)?;
    let opts = network_opts(config)?;
    let tx = feed
        .request_new_round(&opts)
        .await
        .map_err(|e| anyhow!(interpret_rpc_error(&e.to_string())))?;
    println!("{:?}", tx.hash);
    Ok(())
}

async fn deploy<B>(config: &Config, backend: Arc<B>, sub: &ArgMatches) -> Result<()>
where
    B: ContractBackend + 'static,
{
    let dir = config.artifacts_dir.clone().unwrap_or_else(|| ".".into());
    let mut store = ArtifactStore::new(dir);
    let artifact = store.get(required(sub, "artifact")?).await?;
    if !artifact.constructor_matches(&OffchainAggregator::abi()?) {
        return Err(anyhow!("Artifact constructor does not match the aggregator"));
    }

    let answer = |name: &str| -> Result<I256> {
        let value = sub.get_one::<i64>(name).copied().unwrap_or_default();
        I256::try_from(value).map_err(|_| anyhow!("Answer bound {} out of range", value))
    };
    let args = AggregatorArgs {
        billing: Billing::default(),
        link: validate_address(required(sub, "link")?)?,
        min_answer: answer("min-answer")?,
        max_answer: answer("max-answer")?,
        billing_access_controller: Address::ZERO,
        requester_access_controller: Address::ZERO,
        decimals: sub.get_one::<u8>("decimals").copied().unwrap_or(8),
        description: required(sub, "description")?.to_string(),
    };

    let opts = network_opts(config)?;
    let (address, tx, _) = OffchainAggregator::deploy(&opts, backend, artifact.bytecode, args)
        .await
        .map_err(|e| anyhow!(interpret_rpc_error(&e.to_string())))?;
    info!("Deployment transaction {:?}", tx.hash);
    println!("{:?}", address);
    Ok(())
}

fn network_opts(config: &Config) -> Result<TransactOpts> {
    let network = config
        .networks
        .get(&config.default_network)
        .ok_or_else(|| anyhow!("Network '{}' not configured", config.default_network))?;
    Ok(network.transact_opts())
}
