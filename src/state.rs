use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::services::scheduler::Scheduler;
use crate::store::SqliteStore;

pub struct AppState {
    pub config: AppConfig,
    pub scheduler: Scheduler,
}

impl AppState {
    /// Builds the scheduler over a SQLite connection, which serves as both
    /// the booking store and the service/pet directory.
    pub fn new(config: AppConfig, conn: Connection) -> Self {
        let store = Arc::new(SqliteStore::new(
            Arc::new(Mutex::new(conn)),
            config.conflict_policy,
        ));
        let scheduler = Scheduler::new(store.clone(), store, config.hours, config.conflict_policy);
        Self { config, scheduler }
    }
}
