use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::db::{SqliteStore, StoreError};
use crate::services::BookingEngine;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub bookings: BookingEngine<SqliteStore, SqliteStore>,
}

impl AppState {
    pub fn new(conn: Connection, config: AppConfig) -> Self {
        let db = Arc::new(Mutex::new(conn));
        let store = SqliteStore::new(Arc::clone(&db));
        Self {
            db,
            config,
            bookings: BookingEngine::new(store.clone(), store),
        }
    }

    pub fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.db.lock().map_err(|_| StoreError::LockPoisoned)
    }
}
