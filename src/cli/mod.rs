use std::env;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::app::Session;
use crate::config::{AppConfig, ConfigLoader};

pub mod commands;

use self::commands::{
    AddArgs, CategoryArgs, ClearArgs, ConvertArgs, EditArgs, ListArgs, NewArgs, RemoveArgs,
    TagsArgs,
};

#[derive(Parser, Debug)]
#[command(
    name = "remarkdesk",
    version,
    about = "Categorized, taggable remark lists stored as plain text or JSON"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Remark file to operate on (overrides the remembered last file)
    #[arg(long, short = 'f')]
    pub file: Option<PathBuf>,

    /// Override the config file location (takes precedence over REMARKDESK_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over REMARKDESK_DATA)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show a category view, optionally filtered (default)
    List(ListArgs),
    /// Add a remark
    Add(AddArgs),
    /// Edit a remark addressed by category and position
    Edit(EditArgs),
    /// Remove remarks addressed by category and position
    Remove(RemoveArgs),
    /// Remove every remark in a category
    Clear(ClearArgs),
    /// Manage categories
    Category(CategoryArgs),
    /// List the tags used in a category view
    Tags(TagsArgs),
    /// Create a new empty document file
    New(NewArgs),
    /// Convert a document between the text and JSON formats
    Convert(ConvertArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var("REMARKDESK_CONFIG", path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var("REMARKDESK_DATA", path);
    }

    let loader = ConfigLoader::discover()?;
    loader.paths().ensure_directories()?;
    init_tracing(&cli.log_level)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;
    let mut config = loader.load_or_init()?;

    let command = cli
        .command
        .unwrap_or_else(|| Commands::List(ListArgs::default()));
    match command {
        Commands::New(args) => {
            let message = commands::new_document(&args)?;
            remember(&loader, &mut config, &args.path)?;
            println!("{message}");
        }
        Commands::Convert(args) => {
            let message = commands::convert(&args)?;
            remember(&loader, &mut config, &args.dest)?;
            println!("{message}");
        }
        Commands::List(args) => {
            let (session, path) = open_current(cli.file.as_deref(), &config)?;
            print!("{}", commands::list(&session, &config, &args)?);
            remember(&loader, &mut config, &path)?;
        }
        Commands::Add(args) => {
            let (mut session, path) = open_current(cli.file.as_deref(), &config)?;
            println!("{}", commands::add(&mut session, &args)?);
            remember(&loader, &mut config, &path)?;
        }
        Commands::Edit(args) => {
            let (mut session, path) = open_current(cli.file.as_deref(), &config)?;
            println!("{}", commands::edit(&mut session, &args)?);
            remember(&loader, &mut config, &path)?;
        }
        Commands::Remove(args) => {
            let (mut session, path) = open_current(cli.file.as_deref(), &config)?;
            println!("{}", commands::remove(&mut session, &args)?);
            remember(&loader, &mut config, &path)?;
        }
        Commands::Clear(args) => {
            let (mut session, path) = open_current(cli.file.as_deref(), &config)?;
            println!("{}", commands::clear(&mut session, &args)?);
            remember(&loader, &mut config, &path)?;
        }
        Commands::Category(args) => {
            let (mut session, path) = open_current(cli.file.as_deref(), &config)?;
            print!("{}", commands::category(&mut session, &args)?);
            remember(&loader, &mut config, &path)?;
        }
        Commands::Tags(args) => {
            let (session, path) = open_current(cli.file.as_deref(), &config)?;
            print!("{}", commands::tags(&session, &args)?);
            remember(&loader, &mut config, &path)?;
        }
    }
    Ok(())
}

/// Opens the file named on the command line, falling back to the file
/// remembered from the previous run.
fn open_current(file: Option<&Path>, config: &AppConfig) -> Result<(Session, PathBuf)> {
    let Some(path) = file
        .map(Path::to_path_buf)
        .or_else(|| config.last_file.clone())
    else {
        bail!("no remark file selected; pass --file <path> or create one with 'new <path>'");
    };
    let mut session = Session::new();
    session
        .open(&path)
        .with_context(|| format!("opening {}", path.display()))?;
    Ok((session, path))
}

fn remember(loader: &ConfigLoader, config: &mut AppConfig, path: &Path) -> Result<()> {
    if config.last_file.as_deref() != Some(path) {
        config.remember_file(path);
        loader.store(config).context("remembering last file")?;
    }
    Ok(())
}

fn init_tracing(level: &str) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
        Ok(())
    })
    .map(|_| ())
}
