use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use keyvend::billing::yookassa::YooKassaClient;
use keyvend::billing::ChargeGateway;
use keyvend::models::NewLocation;
use keyvend::notify::telegram::TelegramNotifier;
use keyvend::notify::Notifier;
use keyvend::reconcile::ReconcileEngine;
use keyvend::reservation::ReservationManager;
use keyvend::store::postgres::PgStore;
use keyvend::store::Store;
use keyvend::{api, cli, config, jobs, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "keyvend=debug,tower_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = config::load()?;
    let args = cli::Cli::parse();

    let result = match args.command {
        Some(cli::Commands::Serve { port }) => run_server(cfg, port).await,
        Some(cli::Commands::Location { command }) => {
            let db = connect(&cfg).await?;
            handle_location_command(&db, command).await
        }
        Some(cli::Commands::Key { command }) => {
            let db = connect(&cfg).await?;
            handle_key_command(&db, command).await
        }
        None => {
            let port = cfg.port;
            run_server(cfg, port).await
        }
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

async fn connect(cfg: &config::Config) -> anyhow::Result<PgStore> {
    let db = PgStore::connect(&cfg.database_url).await?;
    db.migrate().await?;
    Ok(db)
}

async fn run_server(cfg: config::Config, port: u16) -> anyhow::Result<()> {
    tracing::info!("Connecting to database...");
    let db = PgStore::connect(&cfg.database_url).await?;

    tracing::info!("Running migrations...");
    db.migrate().await?;

    let store: Arc<dyn Store> = Arc::new(db);
    let gateway: Arc<dyn ChargeGateway> = Arc::new(YooKassaClient::from_config(&cfg));
    let notifier: Arc<dyn Notifier> = Arc::new(TelegramNotifier::new(cfg.bot_token.clone()));

    let hold = chrono::Duration::minutes(cfg.hold_minutes);
    let stale_after = chrono::Duration::minutes(cfg.stale_after_minutes);

    let engine = Arc::new(ReconcileEngine::new(
        store.clone(),
        gateway.clone(),
        notifier.clone(),
        stale_after,
        hold,
    ));
    let reservations = ReservationManager::new(store.clone(), gateway, hold);

    let state = Arc::new(AppState {
        store: store.clone(),
        reservations,
        engine: engine.clone(),
    });

    jobs::sweep::spawn(
        engine,
        std::time::Duration::from_secs(cfg.sweep_interval_secs),
    );
    tracing::info!(
        "Reconciliation sweep started (every {}s)",
        cfg.sweep_interval_secs
    );

    jobs::reminder::spawn(store, notifier);
    tracing::info!("Expiry reminder job started (daily)");

    let app = api::app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("keyvend listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn handle_location_command(db: &PgStore, cmd: cli::LocationCommands) -> anyhow::Result<()> {
    match cmd {
        cli::LocationCommands::Add {
            name,
            endpoint,
            rate,
        } => {
            let base_rate = rate
                .parse::<rust_decimal::Decimal>()
                .context("invalid rate")?;
            let loc = db
                .insert_location(&NewLocation {
                    name,
                    endpoint,
                    base_rate,
                })
                .await?;
            println!(
                "Location created:\n  Name:     {}\n  Endpoint: {}\n  Rate:     {}\n  ID:       {}",
                loc.name, loc.endpoint, loc.base_rate, loc.id
            );
        }
        cli::LocationCommands::List => {
            let rows = db.list_location_inventory().await?;
            if rows.is_empty() {
                println!("No locations found.");
            } else {
                println!(
                    "{:<38} {:<16} {:<10} {:<12} ACTIVE",
                    "ID", "NAME", "RATE", "FREE/TOTAL"
                );
                for l in rows {
                    println!(
                        "{:<38} {:<16} {:<10} {:<12} {}",
                        l.id,
                        l.name,
                        l.base_rate.to_string(),
                        format!("{}/{}", l.free_keys, l.total_keys),
                        l.is_active
                    );
                }
            }
        }
    }
    Ok(())
}

async fn handle_key_command(db: &PgStore, cmd: cli::KeyCommands) -> anyhow::Result<()> {
    match cmd {
        cli::KeyCommands::Import {
            location_id,
            token,
            file,
        } => {
            let location_id = Uuid::parse_str(&location_id).context("invalid location ID")?;

            let mut tokens = Vec::new();
            if let Some(t) = token {
                tokens.push(t);
            }
            if let Some(path) = file {
                let contents = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                tokens.extend(
                    contents
                        .lines()
                        .map(str::trim)
                        .filter(|l| !l.is_empty())
                        .map(String::from),
                );
            }
            if tokens.is_empty() {
                anyhow::bail!("provide --token or --file");
            }

            let mut imported = 0;
            let mut failed = 0;
            for t in &tokens {
                match db.insert_credential(location_id, t).await {
                    Ok(_) => imported += 1,
                    Err(e) => {
                        eprintln!("failed to import key: {:#}", e);
                        failed += 1;
                    }
                }
            }
            println!("Imported {} key(s), {} failed.", imported, failed);
        }
    }
    Ok(())
}
