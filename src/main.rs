use std::path::PathBuf;

use clap::{Parser, Subcommand};

use birdspot::commands::account::{HistoryArgs, LoginArgs, RegisterArgs};
use birdspot::commands::birds::RareArgs;
use birdspot::commands::favorites::FavoritesCommand;
use birdspot::commands::locations::LocationsCommand;
use birdspot::commands::photo::PhotoArgs;
use birdspot::commands::settings::ConfigCommand;
use birdspot::commands::species::SpeciesCommand;
use birdspot::commands::{self, App};
use birdspot::config::Config;
use birdspot::consts::default_db_path;
use birdspot::logging;

#[derive(Parser)]
#[command(name = "birdspot", version, about = "Find rare birds near you.")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// SQLite database for credentials and settings
    /// (default: ~/.birdspot/birdspot.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Debug logging on stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Notable sightings near a location
    Rare(RareArgs),
    /// Look up species and their sightings
    #[command(subcommand)]
    Species(SpeciesCommand),
    /// Find a photo of a species
    Photo(PhotoArgs),
    /// Create an account and log in
    Register(RegisterArgs),
    /// Log in to the backend
    Login(LoginArgs),
    /// Forget the stored session
    Logout,
    /// Show the logged-in account
    Whoami,
    /// Recent rare-bird searches
    History(HistoryArgs),
    /// Manage favorite species
    #[command(subcommand)]
    Favorites(FavoritesCommand),
    /// Manage saved locations
    #[command(subcommand)]
    Locations(LocationsCommand),
    /// Read and change settings
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let db_path = match cli.db {
        Some(path) => path,
        None => default_db_path()?,
    };

    if let Command::Config(command) = &cli.command {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let config = Config::open(&db_path.to_string_lossy())?;
        return commands::settings::run(&config, command);
    }

    let app = App::open(&db_path)?;
    match &cli.command {
        Command::Rare(args) => commands::birds::run(&app, args).await,
        Command::Species(command) => commands::species::run(&app, command).await,
        Command::Photo(args) => commands::photo::run(app, args).await,
        Command::Register(args) => commands::account::register(&app, args).await,
        Command::Login(args) => commands::account::login(&app, args).await,
        Command::Logout => commands::account::logout(&app),
        Command::Whoami => commands::account::whoami(&app).await,
        Command::History(args) => commands::account::history(&app, args).await,
        Command::Favorites(command) => commands::favorites::run(&app, command).await,
        Command::Locations(command) => commands::locations::run(&app, command).await,
        Command::Config(_) => Ok(()),
    }
}
