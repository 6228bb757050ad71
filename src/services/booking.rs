use chrono::{DateTime, Utc};

use crate::db::StoreError;
use crate::models::{
    Booking, BookingDetails, BookingStatus, NewBooking, NewBookingRecord, Principal,
};

/// Persistence contract consumed by [`BookingEngine`].
///
/// Implementations must enforce the no-overlap rule themselves on `insert`
/// (answering `StoreError::Overlap`), so that a check made by `has_overlap`
/// and the following insert cannot both pass for conflicting requests.
pub trait BookingStore: Send + Sync {
    fn insert(&self, record: &NewBookingRecord) -> Result<Booking, StoreError>;

    /// Whether a non-cancelled booking on `field_id` overlaps `[start, end)`.
    fn has_overlap(
        &self,
        field_id: i64,
        start: &DateTime<Utc>,
        end: &DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    fn find_by_id(&self, id: i64) -> Result<Option<BookingDetails>, StoreError>;

    /// Moves `id` from `expected` to `next`, failing with
    /// `StoreError::StatusChanged` if the stored status is no longer `expected`.
    fn update_status(
        &self,
        id: i64,
        expected: BookingStatus,
        next: BookingStatus,
    ) -> Result<Booking, StoreError>;

    /// Newest-created first.
    fn list_all(&self) -> Result<Vec<BookingDetails>, StoreError>;
}

/// Read access to the field catalog.
pub trait FieldDirectory: Send + Sync {
    fn field_exists(&self, field_id: i64) -> Result<bool, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("start time must be before end time")]
    InvalidTimeRange,

    #[error("field {0} not found")]
    FieldNotFound(i64),

    #[error("field is already booked at this time")]
    SlotUnavailable,

    #[error("booking {0} not found")]
    NotFound(i64),

    #[error("cannot move booking from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct BookingEngine<S, F> {
    store: S,
    fields: F,
}

impl<S, F> BookingEngine<S, F>
where
    S: BookingStore,
    F: FieldDirectory,
{
    pub fn new(store: S, fields: F) -> Self {
        Self { store, fields }
    }

    #[tracing::instrument(skip_all, fields(user_id = principal.user_id, field_id = request.field_id))]
    pub fn create_booking(
        &self,
        principal: &Principal,
        request: &NewBooking,
    ) -> Result<Booking, BookingError> {
        if !request.has_valid_range() {
            return Err(BookingError::InvalidTimeRange);
        }

        if !self.fields.field_exists(request.field_id)? {
            return Err(BookingError::FieldNotFound(request.field_id));
        }

        if self
            .store
            .has_overlap(request.field_id, &request.start_time, &request.end_time)?
        {
            tracing::debug!("requested slot overlaps an existing booking");
            return Err(BookingError::SlotUnavailable);
        }

        let record = NewBookingRecord {
            field_id: request.field_id,
            user_id: principal.user_id,
            start_time: request.start_time,
            end_time: request.end_time,
            status: BookingStatus::Pending,
        };

        let booking = self.store.insert(&record).map_err(|e| match e {
            // Lost the race against a concurrent booking.
            StoreError::Overlap => BookingError::SlotUnavailable,
            StoreError::ForeignKey => BookingError::FieldNotFound(request.field_id),
            other => BookingError::Store(other),
        })?;

        tracing::info!(booking_id = booking.id, "booking created");
        Ok(booking)
    }

    #[tracing::instrument(skip_all, fields(user_id = principal.user_id))]
    pub fn get_all_bookings(
        &self,
        principal: &Principal,
    ) -> Result<Vec<BookingDetails>, BookingError> {
        Ok(self.store.list_all()?)
    }

    #[tracing::instrument(skip_all, fields(user_id = principal.user_id, booking_id = id))]
    pub fn get_booking_by_id(
        &self,
        principal: &Principal,
        id: i64,
    ) -> Result<BookingDetails, BookingError> {
        self.store.find_by_id(id)?.ok_or(BookingError::NotFound(id))
    }

    #[tracing::instrument(skip_all, fields(user_id = principal.user_id, booking_id = id))]
    pub fn pay_booking(&self, principal: &Principal, id: i64) -> Result<Booking, BookingError> {
        self.transition(id, BookingStatus::Paid)
    }

    fn transition(&self, id: i64, next: BookingStatus) -> Result<Booking, BookingError> {
        let current = self
            .store
            .find_by_id(id)?
            .ok_or(BookingError::NotFound(id))?
            .booking
            .status;

        if !current.can_transition_to(next) {
            return Err(BookingError::InvalidTransition {
                from: current,
                to: next,
            });
        }

        let booking = self
            .store
            .update_status(id, current, next)
            .map_err(|e| match e {
                StoreError::StatusChanged { actual } => BookingError::InvalidTransition {
                    from: actual,
                    to: next,
                },
                StoreError::NotFound => BookingError::NotFound(id),
                other => BookingError::Store(other),
            })?;

        tracing::info!(from = %current, to = %next, "booking status changed");
        Ok(booking)
    }
}
