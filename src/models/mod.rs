pub mod booking;
pub mod field;
pub mod user;

pub use booking::{Booking, BookingDetails, BookingStatus, NewBooking, NewBookingRecord};
pub use field::{Field, FieldInput, FieldSummary};
pub use user::{
    LoginRequest, NewUserRecord, Principal, RegisterRequest, Role, User, UserSummary,
};
