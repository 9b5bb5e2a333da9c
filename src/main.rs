use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mergington_activities::auth::{PasswordHasher, Role, User, UserStore};
use mergington_activities::{gateway, Config};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Mergington High School activities backend.
#[derive(Parser, Debug)]
#[command(name = "mergington", version, about)]
struct Cli {
    /// Config file (default: <config_dir>/mergington/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        /// Users JSON document
        #[arg(long)]
        users_file: Option<PathBuf>,
    },
    /// Print a password hash suitable for the users file
    HashPassword { password: String },
    /// Add a user to the users file
    AddUser {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        /// student, teacher, club_leader or administrator
        #[arg(long)]
        role: Role,
        #[arg(long)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve {
            host,
            port,
            users_file,
        } => {
            if let Some(host) = host {
                config.gateway.host = host;
            }
            if let Some(port) = port {
                config.gateway.port = port;
            }
            if let Some(users_file) = users_file {
                config.storage.users_file = users_file;
            }
            gateway::run_gateway(config).await
        }
        Commands::HashPassword { password } => {
            let hasher = PasswordHasher::new(config.auth.password_iterations);
            println!("{}", hasher.hash(&password));
            Ok(())
        }
        Commands::AddUser {
            email,
            name,
            role,
            password,
        } => {
            let email = email.trim().to_owned();
            anyhow::ensure!(!email.is_empty(), "Email cannot be empty");
            let store = UserStore::new(&config.storage.users_file);
            let hasher = PasswordHasher::new(config.auth.password_iterations);
            store
                .insert(User {
                    email: email.clone(),
                    name,
                    role,
                    password_hash: hasher.hash(&password),
                })
                .with_context(|| format!("Failed to add {email}"))?;
            tracing::info!(
                email = %email,
                role = %role,
                path = %store.path().display(),
                "User added"
            );
            Ok(())
        }
    }
}
