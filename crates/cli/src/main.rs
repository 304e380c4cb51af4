//! Tindahan CLI - Database migrations and developer tooling.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! tindahan-cli migrate
//!
//! # Create a user row for local testing
//! tindahan-cli user create -e buyer@example.ph
//!
//! # Mint a bearer token for that user
//! tindahan-cli token -u 1 -e buyer@example.ph --hours 24
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `user create` - Create user rows
//! - `token` - Mint a bearer token signed with `API_JWT_SECRET`

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "tindahan-cli")]
#[command(author, version, about = "Tindahan CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Mint a bearer token for local testing
    Token {
        /// User id to embed in the token
        #[arg(short, long)]
        user_id: i32,

        /// Email to embed in the token
        #[arg(short, long)]
        email: String,

        /// Hours until the token expires
        #[arg(long, default_value_t = 24)]
        hours: i64,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new user
    Create {
        /// User email address
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() {
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
        Commands::User { action } => match action {
            UserAction::Create { email } => {
                commands::user::create_user(&email).await?;
            }
        },
        Commands::Token {
            user_id,
            email,
            hours,
        } => commands::token::mint(user_id, &email, hours)?,
    }
    Ok(())
}
