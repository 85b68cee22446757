//! Bearing Shop CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! bs-cli migrate
//!
//! # Give a signed-up user access to the admin panel
//! bs-cli role grant -e staff@example.com -r admin
//!
//! # Load catalog or home page content from YAML
//! bs-cli seed catalog -f seeds/catalog.yaml
//! bs-cli seed content -f seeds/content.yaml
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `role grant` - Set a profile's role (`customer`, `viewer`, `admin`)
//! - `seed` - Upsert catalog or home page content from YAML files

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bs-cli")]
#[command(author, version, about = "Bearing Shop CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage staff roles
    Role {
        #[command(subcommand)]
        action: RoleAction,
    },
    /// Seed the database from YAML files
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum RoleAction {
    /// Set the role of an existing profile
    Grant {
        /// Email the user signed up with
        #[arg(short, long)]
        email: String,

        /// Role (`customer`, `viewer`, `admin`)
        #[arg(short, long, default_value = "admin")]
        role: String,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Product families and products
    Catalog {
        /// Path to the YAML file
        #[arg(short, long)]
        file: String,
    },
    /// Home page sections, blocks, translations, footer and banners
    Content {
        /// Path to the YAML file
        #[arg(short, long)]
        file: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Role { action } => match action {
            RoleAction::Grant { email, role } => commands::role::grant(&email, &role).await?,
        },
        Commands::Seed { target } => match target {
            SeedTarget::Catalog { file } => commands::seed::catalog(&file).await?,
            SeedTarget::Content { file } => commands::seed::content(&file).await?,
        },
    }
    Ok(())
}
