use app::config::{Cli, Command, ServeArgs, SeedArgs, prepare_sqlite_file};
use app::seed::CatalogSeed;
use app::state::AppState;
use clap::Parser;
use services::{AppServices, Clock};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

async fn serve(services: AppServices, args: &ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let router = app::build_router(AppState::new(services));
    let addr = args.addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "starting server");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown signal received");
            }
        })
        .await?;
    Ok(())
}

async fn seed(services: &AppServices, args: &SeedArgs) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = CatalogSeed::from_path(&args.catalog)?;
    let summary = catalog.apply(services.storage()).await?;
    println!(
        "seeded {} users, {} content, {} courses, {} memberships, {} notes",
        summary.users, summary.content, summary.courses, summary.memberships, summary.notes
    );
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let db_url = cli.database_url()?;

    prepare_sqlite_file(&db_url)?;
    let services = AppServices::new_sqlite(&db_url, Clock::system()).await?;
    tracing::info!(db = %db_url, "database ready");

    match cli.resolved_command() {
        Command::Serve(args) => serve(services, &args).await,
        Command::Seed(args) => seed(&services, &args).await,
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "app=debug,services=debug,storage=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(err) = run().await {
        tracing::error!(error = %err, "fatal");
        eprintln!("{err}");
        std::process::exit(2);
    }
}
