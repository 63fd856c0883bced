pub mod config;
pub mod crypto;
pub mod db;
pub mod helpers;
pub mod logging;
pub mod models;
pub mod store;

pub use store::RecordsStore;

use models::StatsWindow;

/// Open the records database at its configured location, report its state
/// and close it again. Used by the `hospital-records` binary as a health
/// check of the data directory.
pub fn run() {
    let log_file = logging::init_logging(Some(&config::log_dir()));
    tracing::info!("{} records store v{}", config::APP_NAME, config::APP_VERSION);
    if let Some(path) = &log_file {
        tracing::debug!(path = %path.display(), "Writing log file");
    }

    let db_path = config::database_path();
    let store = match RecordsStore::open(&db_path) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(path = %db_path.display(), error = %e, "Cannot open records database");
            std::process::exit(1);
        }
    };

    let today = helpers::current_date();
    let summary = serde_json::json!({
        "database": db_path.display().to_string(),
        "statistics": store.get_statistics(StatsWindow::All),
        "today": store.get_daily_statistics(today),
        "this_month": store.get_statistics(StatsWindow::month_of(today)),
        "todays_appointments": store.get_todays_appointments(Some(today)).len(),
        "medicines_in_catalog": store.count_medicines_master(),
    });
    if config::backup_requested() {
        match store.create_timestamped_backup(&config::backup_dir()) {
            Some(path) => tracing::info!(path = %path.display(), "Startup backup written"),
            None => tracing::warn!("Startup backup failed"),
        }
    }

    match serde_json::to_string_pretty(&summary) {
        Ok(text) => println!("{text}"),
        Err(e) => tracing::error!(error = %e, "Cannot render summary"),
    }

    if let Err(e) = store.close() {
        tracing::error!(error = %e, "Records store did not close cleanly");
    }
}
