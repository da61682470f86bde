use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use foodgram::cli::{self, NewUser};
use foodgram::config::Config;
use foodgram::db;

/// Recipe sharing backend
#[derive(Parser)]
#[command(name = "foodgram", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server (default)
    Serve,
    /// Import ingredients from a `name,measurement_unit` CSV file
    ImportIngredients {
        path: PathBuf,
    },
    /// Create a user account
    CreateUser {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "")]
        first_name: String,
        #[arg(long, default_value = "")]
        last_name: String,
        /// Grant permission to edit any recipe
        #[arg(long)]
        admin: bool,
    },
    /// Create a tag; a random color is picked when none is given
    CreateTag {
        #[arg(long)]
        name: String,
        #[arg(long)]
        slug: String,
        #[arg(long)]
        color: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("foodgram=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let pool = db::init_pool(&config.database_url).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let app = foodgram::build_app(pool, config.media_root, config.secure_cookies).await?;
            let listener = TcpListener::bind(config.bind_addr).await?;

            tracing::info!("listening on {}", config.bind_addr);
            axum::serve(listener, app).await?;
        }
        Command::ImportIngredients { path } => {
            let (added, skipped) = cli::import_ingredients(&pool, &path).await?;
            println!("Imported {added} ingredients ({skipped} already present)");
        }
        Command::CreateUser {
            email,
            username,
            password,
            first_name,
            last_name,
            admin,
        } => {
            let user = cli::create_user(
                &pool,
                NewUser {
                    email: &email,
                    username: &username,
                    first_name: &first_name,
                    last_name: &last_name,
                    password: &password,
                    is_admin: admin,
                },
            )
            .await?;
            println!("Created user:");
            println!("  ID: {}", user.id);
            println!("  Username: {}", user.username);
            println!("  Admin: {}", user.is_admin);
        }
        Command::CreateTag { name, slug, color } => {
            let tag = cli::create_tag(&pool, &name, &slug, color.as_deref()).await?;
            println!("Created tag {} ({}) with color {}", tag.name, tag.slug, tag.color);
        }
    }

    Ok(())
}
