use std::fmt;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use super::field::FieldSummary;
use super::user::UserSummary;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: i64,
    pub field_id: i64,
    pub user_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A booking request as accepted from the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct NewBooking {
    pub field_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl NewBooking {
    /// Non-empty interval with both ends in years 0000..=9999, the span whose
    /// stored text form sorts in time order.
    pub fn has_valid_range(&self) -> bool {
        let storable = |ts: &DateTime<Utc>| (0..=9999).contains(&ts.year());
        self.start_time < self.end_time && storable(&self.start_time) && storable(&self.end_time)
    }
}

/// A validated booking ready to be persisted.
#[derive(Debug, Clone)]
pub struct NewBookingRecord {
    pub field_id: i64,
    pub user_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: BookingStatus,
}

/// Booking joined with its field and user for display.
#[derive(Debug, Clone, Serialize)]
pub struct BookingDetails {
    #[serde(flatten)]
    pub booking: Booking,
    pub field: Option<FieldSummary>,
    pub user: Option<UserSummary>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Paid,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Paid => "paid",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "paid" => Some(BookingStatus::Paid),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }

    /// Transitions allowed by the booking lifecycle. `Cancelled` is terminal.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Pending, BookingStatus::Paid)
                | (BookingStatus::Pending, BookingStatus::Cancelled)
                | (BookingStatus::Paid, BookingStatus::Cancelled)
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn new_booking(start: &str, end: &str) -> NewBooking {
        NewBooking {
            field_id: 1,
            start_time: at(start),
            end_time: at(end),
        }
    }

    #[test]
    fn test_valid_range() {
        assert!(new_booking("2024-01-01T10:00:00Z", "2024-01-01T11:00:00Z").has_valid_range());
        assert!(new_booking("9999-12-31T22:00:00Z", "9999-12-31T23:00:00Z").has_valid_range());
        assert!(!new_booking("2024-01-01T11:00:00Z", "2024-01-01T10:00:00Z").has_valid_range());
        assert!(!new_booking("2024-01-01T10:00:00Z", "2024-01-01T10:00:00Z").has_valid_range());
        assert!(!new_booking("9999-12-31T23:00:00Z", "+10000-01-01T01:00:00Z").has_valid_range());
    }

    #[test]
    fn test_status_round_trip_strings() {
        for status in [
            BookingStatus::Pending,
            BookingStatus::Paid,
            BookingStatus::Cancelled,
        ] {
            assert_eq!(BookingStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(BookingStatus::parse("confirmed"), None);
    }

    #[test]
    fn test_transitions() {
        assert!(BookingStatus::Pending.can_transition_to(BookingStatus::Paid));
        assert!(BookingStatus::Pending.can_transition_to(BookingStatus::Cancelled));
        assert!(BookingStatus::Paid.can_transition_to(BookingStatus::Cancelled));
        assert!(!BookingStatus::Paid.can_transition_to(BookingStatus::Paid));
        assert!(!BookingStatus::Paid.can_transition_to(BookingStatus::Pending));
        assert!(!BookingStatus::Cancelled.can_transition_to(BookingStatus::Paid));
        assert!(!BookingStatus::Cancelled.can_transition_to(BookingStatus::Pending));
    }
}
