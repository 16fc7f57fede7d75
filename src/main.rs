use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use schoolboard::api::router;
use schoolboard::board::AttendanceBoard;
use schoolboard::config::BoardConfig;
use schoolboard::db;
use schoolboard::preferences::SqlitePreferenceStore;
use schoolboard::realtime::PushListener;
use schoolboard::schedule::SlotGrid;
use schoolboard::school_api::{SchoolApiConfig, SchoolHttpClient};
use schoolboard::services::RefreshScheduler;
use schoolboard::state::AppState;

const PUSH_CHANNEL_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "schoolboard=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = BoardConfig::from_env()?;
    let pool = db::connect(&config.database_url).await?;

    let school = Arc::new(SchoolHttpClient::new(SchoolApiConfig::new_from_env()?)?);
    let preferences = Arc::new(SqlitePreferenceStore::new(pool.clone()));
    let board = Arc::new(Mutex::new(AttendanceBoard::new()));
    let (push_tx, push_rx) = mpsc::channel(PUSH_CHANNEL_CAPACITY);

    let state = AppState {
        db: pool.clone(),
        school,
        preferences,
        board: board.clone(),
        grid: SlotGrid::with_width(config.slot_width()),
        push_tx,
    };

    tokio::spawn(PushListener::new(board).run(push_rx));

    let attendance = state.attendance_service();
    match attendance.restore_selection().await {
        Ok(Some(snapshot)) => info!("Restored selection {:?}", snapshot.selected),
        Ok(None) => {}
        Err(e) => warn!("Could not restore last selection: {}", e),
    }

    if config.refresh_interval_secs > 0 {
        let scheduler = RefreshScheduler::new(attendance, config.refresh_interval_secs);
        tokio::spawn(scheduler.start());
    }

    let app = router(state);

    info!("listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
