use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use convoy_cli::{commands, StoreArgs};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one interactive synchronization session
    Sync {
        #[arg(long, default_value = convoy_config::DEFAULT_DATA_DIR)]
        data_dir: Utf8PathBuf,
        #[command(flatten)]
        store: StoreArgs,
        #[arg(short, long, default_value_t = convoy_config::DEFAULT_TRANSFERS)]
        transfers: usize,
        #[arg(long, help = "Editor name recorded in the ledger")]
        editor: Option<String>,
    },
    /// Remove synchronization metadata locally and on the remote
    Reset {
        #[arg(long, default_value = convoy_config::DEFAULT_DATA_DIR)]
        data_dir: Utf8PathBuf,
        #[command(flatten)]
        store: StoreArgs,
        #[arg(short, long, help = "Skip the confirmation prompt")]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).expect("default subscriber");

    match cli.command {
        Commands::Sync {
            data_dir,
            store,
            transfers,
            editor,
        } => commands::cmd_sync(data_dir, store, transfers, editor).await?,
        Commands::Reset {
            data_dir,
            store,
            yes,
        } => commands::cmd_reset(data_dir, store, yes).await?,
    }

    Ok(())
}
