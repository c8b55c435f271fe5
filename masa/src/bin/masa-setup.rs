use clap::{Parser, Subcommand};
use colored::Colorize;
use masa::config::{Backend, DatabaseConfig};
use masa::services::admin::{provision_user, CreateUser};
use masa_core::MasaConfig;
use masa_data::Role;

#[derive(Parser)]
#[command(name = "masa-setup", version, about = "Masa setup - database migrations and platform administrators")]
struct Cli {
    /// Configuration profile (overridden by MASA_PROFILE)
    #[arg(long, default_value = "dev")]
    profile: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Create a superadmin account
    CreateSuperadmin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        name: String,
    },
}

#[tokio::main]
async fn main() {
    masa_core::init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{}", format!("Error: {e}").red());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = MasaConfig::load(&cli.profile)?;
    let database: DatabaseConfig = config.bind()?;
    if database.backend != Backend::Postgres {
        return Err("masa-setup needs database.backend = postgres".into());
    }
    let url = database.url.unwrap_or_default();
    let pool = masa_data::postgres::connect(&url, 2).await?;

    match cli.command {
        Commands::Migrate => {
            masa_data::postgres::migrate(&pool).await?;
            println!("{}", "Migrations applied".green());
        }
        Commands::CreateSuperadmin { email, password, name } => {
            masa_data::postgres::migrate(&pool).await?;
            let store = masa_data::postgres::PgStore::new(pool);
            let input = CreateUser {
                email,
                password,
                full_name: name,
                role: Role::Superadmin,
                organization_id: None,
            };
            let profile = provision_user(&store, input, chrono::Utc::now()).await?;
            println!("{} {} ({})", "Created superadmin".green(), profile.email.bold(), profile.id);
        }
    }
    Ok(())
}
