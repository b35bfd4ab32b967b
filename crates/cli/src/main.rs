//! Vitrine CLI - drive the storefront client from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Sign in; the session is kept in the state dir for later commands
//! vitrine login -e ann@example.com -p 'correct horse'
//!
//! # Browse the catalog
//! vitrine catalog list --search lamp --filter brand=3 --page 2
//! vitrine catalog show 42
//!
//! # Cart
//! vitrine cart toggle 42
//! vitrine cart show
//!
//! # Sign out everywhere
//! vitrine logout --all
//! ```
//!
//! # Environment Variables
//!
//! Everything `ClientConfig::from_env` reads, plus:
//! - `VITRINE_LOG_JSON` - Set to `1` for JSON log lines
//! - `RUST_LOG` - Log filter (default: `vitrine_storefront=info,vitrine_cli=info`)

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::print_stdout)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vitrine_core::{PostId, ProductId};
use vitrine_storefront::{ClientConfig, Storefront};

mod commands;

use commands::CliError;

/// State directory used when `VITRINE_STATE_DIR` is unset.
const DEFAULT_STATE_DIR: &str = ".vitrine";

#[derive(Parser)]
#[command(name = "vitrine")]
#[command(author, version, about = "Vitrine storefront client")]
struct Cli {
    /// Directory holding the persisted session and preferences
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with email and password
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,
    },
    /// Create an account and sign in
    Register {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,

        /// Repeat of the password
        #[arg(short, long)]
        confirm: String,
    },
    /// Show the signed-in user
    Whoami,
    /// Sign out
    Logout {
        /// Revoke every session of this account, not only this one
        #[arg(long)]
        all: bool,
    },
    /// Browse products
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Inspect or change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Print the navigation menu
    Menu,
    /// Read blog posts
    Blog {
        #[command(subcommand)]
        action: BlogAction,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// List one page of products
    List {
        /// Full-text search term
        #[arg(short, long, default_value = "")]
        search: String,

        /// Page number, starting at 1
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// Filter as `field=value_id`; repeat for more values
        #[arg(short, long)]
        filter: Vec<String>,
    },
    /// Show one product
    Show { id: ProductId },
}

#[derive(Subcommand)]
enum CartAction {
    /// List cart items
    Show,
    /// Add the product if absent, remove it if present
    Toggle { id: ProductId },
}

#[derive(Subcommand)]
enum BlogAction {
    /// List one page of posts
    List {
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Print a post
    Show { slug: String },
    /// Delete a post (staff only)
    Delete { id: PostId },
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "vitrine_storefront=info,vitrine_cli=info".into());
    let json = std::env::var("VITRINE_LOG_JSON").is_ok_and(|v| v == "1");

    // Logs go to stderr so command output can be piped
    tracing_subscriber::registry()
        .with(env_filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(dir) = cli.state_dir {
        config.state_dir = Some(dir);
    } else if config.state_dir.is_none() {
        config.state_dir = Some(PathBuf::from(DEFAULT_STATE_DIR));
    }

    let app = Storefront::new(config)?;
    app.start().await;

    match cli.command {
        Commands::Login { email, password } => {
            commands::account::login(&app, &email, &password).await?;
        }
        Commands::Register {
            name,
            email,
            password,
            confirm,
        } => commands::account::register(&app, &name, &email, &password, &confirm).await?,
        Commands::Whoami => commands::account::whoami(&app)?,
        Commands::Logout { all } => commands::account::logout(&app, all).await?,
        Commands::Catalog { action } => match action {
            CatalogAction::List {
                search,
                page,
                filter,
            } => commands::shop::list_catalog(&app, &search, page, &filter).await?,
            CatalogAction::Show { id } => commands::shop::show_product(&app, id).await?,
        },
        Commands::Cart { action } => match action {
            CartAction::Show => commands::shop::show_cart(&app).await?,
            CartAction::Toggle { id } => commands::shop::toggle_cart(&app, id).await?,
        },
        Commands::Menu => commands::shop::show_menu(&app).await?,
        Commands::Blog { action } => match action {
            BlogAction::List { page } => commands::blog::list(&app, page).await?,
            BlogAction::Show { slug } => commands::blog::show(&app, &slug).await?,
            BlogAction::Delete { id } => commands::blog::delete(&app, id).await?,
        },
    }
    Ok(())
}
