use anyhow::Result;
use clap::Parser;
use gitdex::cli::{self as commands, ServeOptions};
use gitdex::runtime::RealRuntime;
use std::path::PathBuf;
use std::sync::Arc;

/// gitdex - a pip-compatible simple index for git repositories
///
/// Serves the tags and branches of local git repositories, GitHub and
/// Bitbucket repositories, and fixed link lists as installable links.
///
/// GITHUB_TOKEN, or BITBUCKET_USERNAME and BITBUCKET_APP_PASSWORD, are used
/// for private repositories and higher rate limits.
///
/// Examples:
///   gitdex serve                      # Serve the default index file on port 7890
///   pip install demo==1.1 -i http://localhost:7890
#[derive(Parser, Debug)]
#[command(author, version = env!("GITDEX_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Index file (defaults to <config dir>/gitdex/index.toml; also via GITDEX_CONFIG)
    #[arg(
        long = "config",
        short = 'c',
        env = "GITDEX_CONFIG",
        value_name = "PATH",
        global = true
    )]
    pub config: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Serve the index over HTTP
    Serve(ServeArgs),

    /// Print the links of one package
    Links(LinksArgs),

    /// Print the names of all packages
    List,
}

#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on (overrides [server] host)
    #[arg(long, value_name = "ADDR")]
    pub host: Option<String>,

    /// Port to listen on (overrides [server] port)
    #[arg(long, short = 'p')]
    pub port: Option<u16>,

    /// Start even if some packages failed to load
    #[arg(long)]
    pub allow_partial: bool,
}

#[derive(clap::Args, Debug)]
pub struct LinksArgs {
    /// Package name, matched like pip does (case-insensitive, `_` as `-`)
    #[arg(value_name = "NAME")]
    pub name: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let runtime = Arc::new(RealRuntime);

    match cli.command {
        Commands::Serve(args) => {
            commands::serve(
                runtime,
                ServeOptions {
                    config: cli.config,
                    host: args.host,
                    port: args.port,
                    allow_partial: args.allow_partial,
                },
            )
            .await?
        }
        Commands::Links(args) => {
            commands::links(
                runtime,
                cli.config.as_deref(),
                &args.name,
                &mut std::io::stdout(),
            )
            .await?
        }
        Commands::List => commands::list(runtime, cli.config.as_deref(), &mut std::io::stdout()).await?,
    }
    Ok(())
}
