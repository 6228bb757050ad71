use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use super::{queries, StoreError};
use crate::models::{Booking, BookingDetails, BookingStatus, NewBookingRecord};
use crate::services::booking::{BookingStore, FieldDirectory};

/// SQLite-backed booking store and field directory over a shared connection.
///
/// Reads always go to the database; nothing is cached in process.
#[derive(Clone)]
pub struct SqliteStore {
    db: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    pub(crate) fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.db.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

impl BookingStore for SqliteStore {
    fn insert(&self, record: &NewBookingRecord) -> Result<Booking, StoreError> {
        let conn = self.conn()?;
        queries::insert_booking(&conn, record)
    }

    fn has_overlap(
        &self,
        field_id: i64,
        start: &DateTime<Utc>,
        end: &DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        queries::has_overlap(&conn, field_id, start, end)
    }

    fn find_by_id(&self, id: i64) -> Result<Option<BookingDetails>, StoreError> {
        let conn = self.conn()?;
        queries::get_booking_details(&conn, id)
    }

    fn update_status(
        &self,
        id: i64,
        expected: BookingStatus,
        next: BookingStatus,
    ) -> Result<Booking, StoreError> {
        let conn = self.conn()?;
        queries::update_booking_status(&conn, id, expected, next)
    }

    fn list_all(&self) -> Result<Vec<BookingDetails>, StoreError> {
        let conn = self.conn()?;
        queries::list_booking_details(&conn)
    }
}

impl FieldDirectory for SqliteStore {
    fn field_exists(&self, field_id: i64) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        queries::field_exists(&conn, field_id)
    }
}
