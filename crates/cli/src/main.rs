//! Task Master CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! tm-cli migrate
//!
//! # Create the first admin
//! tm-cli user create -u admin -e admin@example.com -p 'change me now' -r admin
//!
//! # Promote an existing user
//! tm-cli user promote -e alice@example.com -r admin
//!
//! # Load tasks from YAML
//! tm-cli seed tasks demo/tasks.yaml
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `user create` / `user promote` - Manage users and roles
//! - `seed tasks` - Insert tasks from a YAML file

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "tm-cli")]
#[command(author, version, about = "Task Master CLI tools")]
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
    /// Seed the database
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new user
    Create {
        /// Display name
        #[arg(short, long)]
        username: String,

        /// Login email address
        #[arg(short, long)]
        email: String,

        /// Initial password (min 6 characters)
        #[arg(short, long)]
        password: String,

        /// Role (`admin`, `user`)
        #[arg(short, long, default_value = "user")]
        role: String,
    },
    /// Change an existing user's role
    Promote {
        /// Email of the user to change
        #[arg(short, long)]
        email: String,

        /// New role (`admin`, `user`)
        #[arg(short, long, default_value = "admin")]
        role: String,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert tasks from a YAML file
    Tasks {
        /// Path to the YAML file
        file: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::User { action } => match action {
            UserAction::Create {
                username,
                email,
                password,
                role,
            } => commands::user::create(&username, &email, &password, &role).await?,
            UserAction::Promote { email, role } => {
                commands::user::promote(&email, &role).await?;
            }
        },
        Commands::Seed { target } => match target {
            SeedTarget::Tasks { file } => commands::seed::tasks(&file).await?,
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_user_create_defaults_to_user_role() {
        let cli = Cli::try_parse_from([
            "tm-cli", "user", "create", "-u", "alice", "-e", "a@x.com", "-p", "secret1",
        ]);
        assert!(matches!(
            cli,
            Ok(Cli {
                command: Commands::User {
                    action: UserAction::Create { ref role, .. }
                }
            }) if role == "user"
        ));
    }
}
