use anyhow::Result;
use clap::{Parser, Subcommand};
use wallet_tracker::config::Config;
use wallet_tracker::query::commands::{
    HistoryQuery, cmd_balances, cmd_history, cmd_list, cmd_status, cmd_track, cmd_untrack,
};
use wallet_tracker::query::formatters::OutputFormat;
use wallet_tracker::repository::{
    ActivityRepository, AddressRepository, BalanceRepository, Database,
};

#[derive(Parser)]
#[command(name = "tracker")]
#[command(about = "Manage tracked wallets and inspect recorded activity", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "table")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start watching an address
    Track {
        address: String,
        #[arg(long, default_value = "0")]
        owner: i64,
    },
    /// Stop watching an address; its history is kept
    Untrack {
        address: String,
        #[arg(long, default_value = "0")]
        owner: i64,
    },
    List {
        #[arg(long)]
        owner: Option<i64>,
    },
    History {
        address: String,
        #[arg(long)]
        owner: Option<i64>,
        #[arg(long, default_value = "100")]
        limit: usize,
        #[arg(long, default_value = "0")]
        offset: usize,
    },
    Balances {
        address: String,
        #[arg(long, default_value = "0")]
        owner: i64,
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    Status,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let format = OutputFormat::from(cli.format.as_str());

    let db = Database::new(&Config::database_url_from_env())?;
    let native_symbol = Config::native_symbol_from_env();
    let conn = db.conn()?;
    let address_repo = AddressRepository::new(&conn);
    let activity_repo = ActivityRepository::new(&conn);
    let balance_repo = BalanceRepository::new(&conn);

    match cli.command {
        Commands::Track { address, owner } => {
            cmd_track(&address_repo, &address, owner)?;
        }
        Commands::Untrack { address, owner } => {
            cmd_untrack(&address_repo, &address, owner)?;
        }
        Commands::List { owner } => {
            cmd_list(&address_repo, owner, &format)?;
        }
        Commands::History {
            address,
            owner,
            limit,
            offset,
        } => {
            let query = HistoryQuery {
                address,
                owner_id: owner,
                limit,
                offset,
            };
            cmd_history(&activity_repo, query, &native_symbol, &format)?;
        }
        Commands::Balances {
            address,
            owner,
            limit,
        } => {
            cmd_balances(&balance_repo, &address, owner, limit, &native_symbol, &format)?;
        }
        Commands::Status => {
            cmd_status(&activity_repo, &address_repo, &format)?;
        }
    }

    Ok(())
}
