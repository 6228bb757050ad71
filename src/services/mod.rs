pub mod booking;

pub use booking::{BookingEngine, BookingError, BookingStore, FieldDirectory};
