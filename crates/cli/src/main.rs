//! Vitrine CLI - A command-line storefront.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog
//! vitrine products --search café
//!
//! # Manage the cart (persisted in $VITRINE_DATA_DIR)
//! vitrine cart add CAF-001 --quantity 2
//! vitrine cart show
//!
//! # Place the order
//! vitrine checkout --customer 3f1c9a7e-0d4b-4c55-9a62-1b2f0c6d7e81
//!
//! # Follow it
//! vitrine order watch <order-id>
//! vitrine orders <customer-id> --status PAY_PENDING --watch
//! ```
//!
//! # Commands
//!
//! - `products` - List catalog products
//! - `cart` - Show and edit the cart
//! - `checkout` - Turn the cart into an order
//! - `order` - Show, watch, pay or cancel one order
//! - `orders` - List a customer's orders
//! - `health` - Check backend connectivity

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::print_stdout)]

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vitrine_client::ClientConfig;

mod commands;

use commands::{CliError, Context, StatusFilter};

#[derive(Parser)]
#[command(name = "vitrine")]
#[command(author, version, about = "Vitrine storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog products
    Products {
        /// Free-text search
        #[arg(short, long)]
        search: Option<String>,

        /// Page number (0-based)
        #[arg(short, long, default_value_t = 0)]
        page: u32,

        /// Page size
        #[arg(long, default_value_t = 12)]
        size: u32,

        /// Include inactive products
        #[arg(long)]
        all: bool,
    },
    /// Show and edit the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Place an order for everything in the cart
    Checkout {
        /// Customer ID (UUID). A new one is generated when omitted.
        #[arg(short, long)]
        customer: Option<String>,
    },
    /// Work with a single order
    Order {
        #[command(subcommand)]
        action: OrderAction,
    },
    /// List a customer's orders
    Orders {
        /// Customer ID (UUID)
        customer: String,

        /// Status filter (`ALL`, `NEW`, `PAY_PENDING`, `PAID`, `SHIPPED`, `CANCELLED`)
        #[arg(short, long, default_value = "ALL", value_parser = commands::parse_status_filter)]
        status: StatusFilter,

        /// Only orders created on or after this date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Only orders created on or before this date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Page number (0-based)
        #[arg(short, long)]
        page: Option<u32>,

        /// Page size
        #[arg(long)]
        size: Option<u32>,

        /// Keep polling and report status changes
        #[arg(short, long)]
        watch: bool,
    },
    /// Check backend connectivity
    Health {
        /// Keep checking and report changes
        #[arg(short, long)]
        watch: bool,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart contents
    Show,
    /// Add a product by SKU
    Add {
        sku: String,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Remove a product by SKU
    Remove { sku: String },
    /// Set the quantity of a product (0 removes it)
    Update { sku: String, quantity: i64 },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum OrderAction {
    /// Show an order
    Show { id: String },
    /// Poll an order and report status changes
    Watch { id: String },
    /// Pay an order
    Pay { id: String },
    /// Cancel an order
    Cancel { id: String },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

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

    // Load configuration first; Sentry needs the DSN before tracing starts
    let config = ClientConfig::from_env();
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);

    // Quiet by default so command output stays readable
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "vitrine_client=warn,vitrine_core=warn,vitrine_cli=info".into());

    // JSON logs for machine consumption, text otherwise; both on stderr
    let is_json = std::env::var("VITRINE_LOG_FORMAT").is_ok_and(|f| f == "json");
    let json_layer = is_json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
    });
    let text_layer =
        (!is_json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        let _ = e.report(&mut std::io::stderr().lock());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: ClientConfig) -> Result<(), CliError> {
    let ctx = Context::new(config)?;

    match cli.command {
        Commands::Products {
            search,
            page,
            size,
            all,
        } => commands::products::list(&ctx, search, page, size, !all).await?,
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&ctx),
            CartAction::Add { sku, quantity } => commands::cart::add(&ctx, &sku, quantity).await?,
            CartAction::Remove { sku } => commands::cart::remove(&ctx, &sku)?,
            CartAction::Update { sku, quantity } => {
                commands::cart::update(&ctx, &sku, quantity)?;
            }
            CartAction::Clear => commands::cart::clear(&ctx),
        },
        Commands::Checkout { customer } => {
            commands::cart::checkout(&ctx, customer.as_deref()).await?;
        }
        Commands::Order { action } => match action {
            OrderAction::Show { id } => commands::orders::show(&ctx, &id).await?,
            OrderAction::Watch { id } => commands::orders::watch(&ctx, &id).await?,
            OrderAction::Pay { id } => commands::orders::pay(&ctx, &id).await?,
            OrderAction::Cancel { id } => commands::orders::cancel(&ctx, &id).await?,
        },
        Commands::Orders {
            customer,
            status,
            from,
            to,
            page,
            size,
            watch,
        } => {
            let query = vitrine_client::OrderListQuery {
                page,
                size,
                status: status.0,
                from,
                to,
            };
            commands::orders::list(&ctx, &customer, query, watch).await?;
        }
        Commands::Health { watch } => commands::health::check(&ctx, watch).await?,
    }
    Ok(())
}
