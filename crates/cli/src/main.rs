//! Reklama CLI - Browse the catalog, manage the cart and check out.
//!
//! # Usage
//!
//! ```bash
//! # Browse
//! rk products list --category banners
//! rk products show 6a1e
//! rk categories
//!
//! # Cart
//! rk cart add 6a1e -q 2
//! rk cart update 6a1e 5
//! rk cart show
//!
//! # Checkout, then confirm once paid in the browser
//! rk checkout --name "Aziz" --email aziz@example.uz --phone "+998 90 123 45 67" --address Tashkent
//! rk payment confirm cs_test_123
//! ```
//!
//! # Commands
//!
//! - `products` / `categories` - Catalog reads
//! - `cart` - Cart mutations, persisted in `REKLAMA_DATA_DIR`
//! - `checkout` - Create an order and a payment page for the cart
//! - `payment confirm` - Wait for the payment and clear the cart once paid
//! - `lang` / `admin-token` - Stored preferences

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use reklama_storefront::config::StorefrontConfig;
use reklama_storefront::error::AppError;
use reklama_storefront::state::AppState;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "rk")]
#[command(author, version, about = "Reklama storefront in the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse products
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// List product categories
    Categories,
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Order the cart and get a payment link
    Checkout {
        /// Full name
        #[arg(long)]
        name: String,

        /// Email address for the receipt
        #[arg(long)]
        email: String,

        /// Contact phone number
        #[arg(long)]
        phone: String,

        /// Delivery address
        #[arg(long)]
        address: String,
    },
    /// Confirm payments
    Payment {
        #[command(subcommand)]
        action: PaymentAction,
    },
    /// Show or set the display language (en, ru, uz)
    Lang {
        /// Language code to switch to
        code: Option<String>,
    },
    /// Manage the stored admin token
    AdminToken {
        #[command(subcommand)]
        action: AdminTokenAction,
    },
}

#[derive(Subcommand)]
enum ProductsAction {
    /// List products
    List {
        /// Only products in this category
        #[arg(short, long)]
        category: Option<String>,

        /// Match against name and description
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Show one product
    Show {
        /// Product ID
        id: String,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show cart contents and total
    Show,
    /// Add a product to the cart
    Add {
        /// Product ID
        id: String,

        /// Units to add
        #[arg(short, long, default_value_t = 1, allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Set the quantity of a cart line (0 removes it)
    Update {
        /// Product ID
        id: String,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a product from the cart
    Remove {
        /// Product ID
        id: String,
    },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum PaymentAction {
    /// Wait for a payment to complete and clear the cart once paid
    Confirm {
        /// Payment session ID returned by checkout
        session_id: String,
    },
}

#[derive(Subcommand)]
enum AdminTokenAction {
    /// Store a token sent with every API request
    Set {
        /// Bearer token
        token: String,
    },
    /// Forget the stored token
    Clear,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load configuration from environment (needed for Sentry init)
    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => exit_with(&AppError::from(e)),
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Logs go to stderr so command output stays pipeable
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "reklama_storefront=info,reklama_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let state = match AppState::new(config) {
        Ok(state) => state,
        Err(e) => exit_with(&AppError::from(e)),
    };

    if let Err(e) = run(cli, &state).await {
        exit_with(&e);
    }
}

/// Report `error` and terminate with a failure status.
fn exit_with(error: &AppError) -> ! {
    error.capture();
    #[allow(clippy::print_stderr)]
    {
        eprintln!("Error: {}", error.user_message());
    }
    std::process::exit(1);
}

async fn run(cli: Cli, state: &AppState) -> Result<(), AppError> {
    match cli.command {
        Commands::Products { action } => match action {
            ProductsAction::List { category, search } => {
                commands::products::list(state, category, search).await?;
            }
            ProductsAction::Show { id } => commands::products::show(state, &id).await?,
        },
        Commands::Categories => commands::products::categories(state).await?,
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(state),
            CartAction::Add { id, quantity } => commands::cart::add(state, &id, quantity).await?,
            CartAction::Update { id, quantity } => commands::cart::update(state, &id, quantity)?,
            CartAction::Remove { id } => commands::cart::remove(state, &id)?,
            CartAction::Clear => commands::cart::clear(state),
        },
        Commands::Checkout {
            name,
            email,
            phone,
            address,
        } => commands::checkout::run(state, &name, &email, &phone, &address).await?,
        Commands::Payment { action } => match action {
            PaymentAction::Confirm { session_id } => {
                commands::payment::confirm(state, &session_id).await;
            }
        },
        Commands::Lang { code } => commands::prefs::lang(state, code.as_deref())?,
        Commands::AdminToken { action } => match action {
            AdminTokenAction::Set { token } => commands::prefs::set_admin_token(state, token)?,
            AdminTokenAction::Clear => commands::prefs::clear_admin_token(state)?,
        },
    }
    Ok(())
}
