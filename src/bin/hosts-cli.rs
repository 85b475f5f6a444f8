use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::json;

use host_router::config::{check_config, load_config, ConfigWatcher, HostCache, Settings};
use host_router::observability::init_logging;
use host_router::routing::{HostReverser, ReverseArgs, UrlConfRegistry, UrlOptions};

#[derive(Parser)]
#[command(name = "hosts-cli")]
#[command(about = "Inspect and exercise a host routing configuration", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "hosts.toml")]
    config: PathBuf,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Match a hostname and print the host and its parameters
    Resolve { hostname: String },
    /// Reverse a host name into a hostname
    Reverse {
        host: String,
        #[command(flatten)]
        params: Params,
    },
    /// Reverse a host and a view into a full URL
    Url {
        host: String,
        view: String,
        #[arg(long = "host-arg")]
        host_args: Vec<String>,
        #[arg(long = "host-kwarg", value_parser = parse_kwarg)]
        host_kwargs: Vec<(String, String)>,
        #[command(flatten)]
        params: Params,
        #[arg(long)]
        scheme: Option<String>,
        #[arg(long)]
        port: Option<String>,
    },
    /// Load the configuration and build every table
    Check,
    /// Reload on every change of the configuration file until Ctrl-C
    Watch,
}

#[derive(clap::Args)]
struct Params {
    /// Positional parameter, repeatable
    #[arg(long = "arg")]
    args: Vec<String>,
    /// Keyword parameter as key=value, repeatable
    #[arg(long = "kwarg", value_parser = parse_kwarg)]
    kwargs: Vec<(String, String)>,
}

impl Params {
    fn reverse_args(&self) -> ReverseArgs {
        reverse_args(&self.args, &self.kwargs)
    }
}

fn reverse_args(args: &[String], kwargs: &[(String, String)]) -> ReverseArgs {
    ReverseArgs {
        args: args.to_vec(),
        kwargs: kwargs.iter().cloned().collect(),
    }
}

fn parse_kwarg(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .ok_or_else(|| format!("expected key=value, got '{s}'"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(&cli.config)?;
    let paths = Arc::new(UrlConfRegistry::from_config(&config.urlconfs)?);
    let cache = Arc::new(HostCache::new(Arc::new(Settings::new(config))));
    let reverser = HostReverser::new(cache.clone(), paths);

    match cli.command {
        Commands::Resolve { hostname } => {
            let matched = cache.match_host(&hostname.to_ascii_lowercase())?;
            let out = json!({
                "host": matched.host.name(),
                "urlconf": matched.host.urlconf(),
                "params": matched.params,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Commands::Reverse { host, params } => {
            println!("{}", reverser.reverse_host(&host, &params.reverse_args())?);
        }
        Commands::Url {
            host,
            view,
            host_args,
            host_kwargs,
            params,
            scheme,
            port,
        } => {
            let options = UrlOptions { scheme, port };
            let url = reverser.reverse_full(
                &host,
                &view,
                &reverse_args(&host_args, &host_kwargs),
                &params.reverse_args(),
                &options,
            )?;
            println!("{url}");
        }
        Commands::Check => {
            check_config(&cache.settings())?;
            let table = cache.host_patterns()?;
            println!(
                "OK: {} host(s) in '{}': {}",
                table.len(),
                cache.root_hostconf()?,
                table.names().collect::<Vec<_>>().join(", ")
            );
        }
        Commands::Watch => {
            let (watcher, mut updates) = ConfigWatcher::new(&cli.config, cache.clone());
            let _watcher = watcher.run()?;
            loop {
                tokio::select! {
                    Some(update) = updates.recv() => {
                        tracing::info!(
                            hostconfs = update.hostconfs.len(),
                            default_host = ?update.default_host,
                            "Routing configuration active"
                        );
                    }
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
        }
    }

    Ok(())
}
