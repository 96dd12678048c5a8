use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use hpecli::backend::current_hosts;
use hpecli::config::{default_config_path, ResolvedConfig};
use hpecli::rest::RestClient;
use hpecli::store::Store;
use hpecli::{greenlake, ilo, logging, oneview};
use secrecy::SecretString;

#[derive(Parser)]
#[command(name = "hpecli")]
#[command(about = "Command line client for HPE GreenLake, OneView and iLO")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(long, global = true)]
    debug: bool,

    /// Accept invalid TLS certificates
    #[arg(short = 'k', long, global = true)]
    insecure: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// HPE GreenLake
    Greenlake {
        #[command(subcommand)]
        command: GreenLakeCommand,
    },
    /// HPE OneView
    Oneview {
        #[command(subcommand)]
        command: OneViewCommand,
    },
    /// HPE iLO
    Ilo {
        #[command(subcommand)]
        command: IloCommand,
    },
    /// Show the current login for each backend
    Context,
    /// Print the version
    Version,
}

#[derive(Subcommand)]
enum GreenLakeCommand {
    /// Login to GreenLake: hpecli greenlake login
    Login(GreenLakeLoginArgs),
    /// Get data from GreenLake
    Get {
        #[command(subcommand)]
        resource: GreenLakeResource,
    },
}

#[derive(Subcommand)]
enum GreenLakeResource {
    /// Users of the tenant
    Users,
}

#[derive(Args)]
struct GreenLakeLoginArgs {
    /// GreenLake host/ip address
    #[arg(long, default_value = "https://client.greenlake.hpe.com")]
    host: String,
    /// GreenLake tenant id
    #[arg(long)]
    tenant_id: String,
    /// API client id
    #[arg(short, long)]
    user: String,
    /// API client secret
    #[arg(short, long, env = "HPECLI_GREENLAKE_SECRET", hide_env_values = true)]
    secret: String,
}

#[derive(Subcommand)]
enum OneViewCommand {
    /// Login to OneView: hpecli oneview login
    Login(OneViewLoginArgs),
    /// Get data from OneView
    Get {
        #[command(subcommand)]
        resource: OneViewResource,
    },
}

#[derive(Subcommand)]
enum OneViewResource {
    /// Get servers from OneView: hpecli oneview get servers
    Servers {
        /// Name of the server to retrieve
        #[arg(long)]
        name: Option<String>,
    },
}

#[derive(Args)]
struct OneViewLoginArgs {
    /// OneView host/ip address
    #[arg(long)]
    host: String,
    /// OneView username
    #[arg(short, long, default_value = "Administrator")]
    username: String,
    /// OneView password
    #[arg(short, long, env = "HPECLI_ONEVIEW_PASSWORD", hide_env_values = true)]
    password: String,
    /// Authentication directory
    #[arg(long)]
    domain: Option<String>,
}

#[derive(Subcommand)]
enum IloCommand {
    /// Login to iLO: hpecli ilo login
    Login(IloLoginArgs),
    /// Get data from iLO
    Get {
        #[command(subcommand)]
        resource: IloResource,
    },
}

#[derive(Subcommand)]
enum IloResource {
    /// Get service root details
    Serviceroot,
}

#[derive(Args)]
struct IloLoginArgs {
    /// iLO host/ip address
    #[arg(long)]
    host: String,
    /// iLO username
    #[arg(short, long, default_value = "Administrator")]
    username: String,
    /// iLO password
    #[arg(short, long, env = "HPECLI_ILO_PASSWORD", hide_env_values = true)]
    password: String,
}

fn secret(value: String) -> SecretString {
    SecretString::new(value.into())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ResolvedConfig::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load config: {}", cli.config.display()))?;

    if cli.debug {
        config.log_level = "debug".to_string();
    }
    if cli.insecure {
        config.http.insecure = true;
    }
    logging::init(&config.log_level);

    let store = Store::new(&config.store_path);
    let rest = RestClient::new(&config.http)?;

    match cli.command {
        Command::Greenlake { command } => {
            let cache = greenlake::BACKEND.cache(store);
            match command {
                GreenLakeCommand::Login(args) => {
                    let request = greenlake::LoginRequest {
                        host: args.host,
                        tenant_id: args.tenant_id,
                        client_id: args.user,
                        client_secret: secret(args.secret),
                    };
                    greenlake::login(&rest, &cache, &request).await?;
                }
                GreenLakeCommand::Get {
                    resource: GreenLakeResource::Users,
                } => {
                    println!("{}", greenlake::get_users(&rest, &cache).await?);
                }
            }
        }
        Command::Oneview { command } => {
            let cache = oneview::BACKEND.cache(store);
            match command {
                OneViewCommand::Login(args) => {
                    let request = oneview::LoginRequest {
                        host: args.host,
                        username: args.username,
                        password: secret(args.password),
                        domain: args.domain,
                    };
                    oneview::login(&rest, &cache, &request).await?;
                }
                OneViewCommand::Get {
                    resource: OneViewResource::Servers { name },
                } => {
                    let output = oneview::get_servers(&rest, &cache, name.as_deref()).await?;
                    println!("{output}");
                }
            }
        }
        Command::Ilo { command } => {
            let cache = ilo::BACKEND.cache(store);
            match command {
                IloCommand::Login(args) => {
                    let request = ilo::LoginRequest {
                        host: args.host,
                        username: args.username,
                        password: secret(args.password),
                    };
                    ilo::login(&rest, &cache, &request).await?;
                }
                IloCommand::Get {
                    resource: IloResource::Serviceroot,
                } => {
                    println!("{}", ilo::get_service_root(&rest, &cache).await?);
                }
            }
        }
        Command::Context => {
            for (backend, host) in current_hosts(&store) {
                if host.is_empty() {
                    println!("{:<10} (not logged in)", backend.name);
                } else {
                    println!("{:<10} {host}", backend.name);
                }
            }
        }
        Command::Version => {
            println!("hpecli {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
