//! Tienda CLI - command-line front end for the storefront.
//!
//! # Usage
//!
//! ```bash
//! # Log in (password read from stdin when --password is omitted)
//! tienda login ana@example.com
//!
//! # Browse the catalog
//! tienda products --search cafe --category Bebidas
//! tienda product 12
//!
//! # Manage the cart
//! tienda cart add 12 --quantity 2
//! tienda cart set 12 5
//! tienda cart show
//!
//! # Place an order and list history
//! tienda checkout --address "Calle 1" --card "4242 4242 4242 4242"
//! tienda orders --remote
//! ```
//!
//! # Environment Variables
//!
//! Configuration is read from the environment (and `.env`); see
//! [`tienda_storefront::StorefrontConfig::from_env`]. Log verbosity is set
//! with `RUST_LOG`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tienda_core::Category;
use tienda_storefront::backend::HttpBackend;
use tienda_storefront::db::{LocalOrderRepository, OrderRepository};
use tienda_storefront::storage::FileStore;
use tienda_storefront::{AppError, AppState, StorefrontConfig};

use crate::error::Result;

mod commands;
mod error;

#[derive(Parser)]
#[command(name = "tienda")]
#[command(author, version, about = "Tienda storefront")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Store(StoreCommand),
    /// Run database migrations
    #[cfg(feature = "postgres")]
    Migrate,
}

#[derive(Subcommand)]
enum StoreCommand {
    /// Log in with email and password
    Login {
        /// Account email
        email: String,

        /// Password (read from stdin when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Create an account
    Register {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Account email
        #[arg(short, long)]
        email: String,

        /// Password (read from stdin when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Forget the saved session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// List products
    Products {
        /// Match against name and description
        #[arg(short, long)]
        search: Option<String>,

        /// Only this category
        #[arg(short, long)]
        category: Option<Category>,

        /// Treat accented and plain letters as different
        #[arg(long)]
        exact_accents: bool,
    },
    /// Show one product
    Product {
        /// Product id
        id: i64,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Place an order for the cart
    Checkout {
        /// Customer name (defaults to the logged-in user's name)
        #[arg(long)]
        name: Option<String>,

        /// Shipping address
        #[arg(long)]
        address: String,

        /// Card number (only the last four digits are kept)
        #[arg(long)]
        card: String,
    },
    /// List order history
    Orders {
        /// Fetch purchases from the backend instead of local history
        #[arg(long)]
        remote: bool,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show lines and totals
    Show,
    /// Add a catalog product
    Add {
        /// Product id
        id: i64,

        /// Units to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a line's quantity (0 removes it)
    Set {
        /// Line id
        id: String,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a line
    Remove {
        /// Line id
        id: String,
    },
    /// Remove every line
    Clear,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tienda_storefront=info,tienda_cli=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        e.report();
        #[allow(clippy::print_stderr)]
        {
            eprintln!("error: {}", e.user_message());
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = StorefrontConfig::from_env().map_err(AppError::from)?;

    let command = match cli.command {
        Commands::Store(command) => command,
        #[cfg(feature = "postgres")]
        Commands::Migrate => return commands::migrate::run(&config).await,
    };

    let backend = HttpBackend::new(&config.backend).map_err(AppError::from)?;
    let store = FileStore::new(config.data_dir.clone());

    #[cfg(feature = "postgres")]
    if let Some(url) = &config.database_url {
        let pool = tienda_storefront::db::create_pool(url).await?;
        let repo = tienda_storefront::db::PgOrderRepository::new(pool);
        let mut state = AppState::load(&config, backend, store, repo)?;
        return dispatch(command, &mut state).await;
    }

    let repo = LocalOrderRepository::new(store.clone());
    let mut state = AppState::load(&config, backend, store, repo)?;
    dispatch(command, &mut state).await
}

async fn dispatch<R: OrderRepository>(
    command: StoreCommand,
    state: &mut AppState<HttpBackend, FileStore, R>,
) -> Result<()> {
    match command {
        StoreCommand::Login { email, password } => {
            commands::session::login(state, &email, password).await?;
        }
        StoreCommand::Register {
            name,
            email,
            password,
        } => commands::session::register(state, &name, &email, password).await?,
        StoreCommand::Logout => commands::session::logout(state)?,
        StoreCommand::Whoami => commands::session::whoami(state),
        StoreCommand::Products {
            search,
            category,
            exact_accents,
        } => commands::catalog::list(state, search, category, exact_accents).await?,
        StoreCommand::Product { id } => commands::catalog::show(state, id).await?,
        StoreCommand::Cart { action } => match action {
            CartAction::Show => commands::cart::show(state)?,
            CartAction::Add { id, quantity } => commands::cart::add(state, id, quantity).await?,
            CartAction::Set { id, quantity } => commands::cart::set(state, &id, quantity)?,
            CartAction::Remove { id } => commands::cart::remove(state, &id)?,
            CartAction::Clear => commands::cart::clear(state)?,
        },
        StoreCommand::Checkout {
            name,
            address,
            card,
        } => {
            commands::orders::checkout(state, name.unwrap_or_default(), address, card).await?;
        }
        StoreCommand::Orders { remote } => {
            if remote {
                commands::orders::remote(state).await?;
            } else {
                commands::orders::local(state).await?;
            }
        }
    }
    Ok(())
}
