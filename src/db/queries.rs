use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

use super::StoreError;
use crate::models::{
    Booking, BookingDetails, BookingStatus, Field, FieldInput, FieldSummary, NewBookingRecord,
    NewUserRecord, Role, User, UserSummary,
};

const OVERLAP_ABORT: &str = "booking_overlap";

/// Fixed-width UTC text, so string order in SQL is time order.
pub fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(column: &str, s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("{column} {s:?}: {e}")))
}

fn map_write_error(err: rusqlite::Error) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(code, Some(msg))
            if code.code == ErrorCode::ConstraintViolation =>
        {
            if msg.contains(OVERLAP_ABORT) {
                StoreError::Overlap
            } else if msg.contains("FOREIGN KEY") {
                StoreError::ForeignKey
            } else if msg.contains("UNIQUE") {
                StoreError::Duplicate
            } else {
                StoreError::Database(err)
            }
        }
        _ => StoreError::Database(err),
    }
}

// ── Bookings ──

const BOOKING_DETAILS_SELECT: &str =
    "SELECT b.id, b.field_id, b.user_id, b.start_time, b.end_time, b.status, b.created_at, b.updated_at,
            f.id, f.name, f.price_per_hour, f.location,
            u.id, u.name, u.email
     FROM bookings b
     LEFT JOIN fields f ON f.id = b.field_id
     LEFT JOIN users u ON u.id = b.user_id";

pub fn insert_booking(conn: &Connection, record: &NewBookingRecord) -> Result<Booking, StoreError> {
    let now = Utc::now();
    let now_str = format_ts(&now);

    conn.execute(
        "INSERT INTO bookings (field_id, user_id, start_time, end_time, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            record.field_id,
            record.user_id,
            format_ts(&record.start_time),
            format_ts(&record.end_time),
            record.status.as_str(),
            now_str,
            now_str,
        ],
    )
    .map_err(map_write_error)?;

    Ok(Booking {
        id: conn.last_insert_rowid(),
        field_id: record.field_id,
        user_id: record.user_id,
        start_time: record.start_time,
        end_time: record.end_time,
        status: record.status,
        created_at: now,
        updated_at: now,
    })
}

pub fn has_overlap(
    conn: &Connection,
    field_id: i64,
    start: &DateTime<Utc>,
    end: &DateTime<Utc>,
) -> Result<bool, StoreError> {
    let found: bool = conn.query_row(
        "SELECT EXISTS (
            SELECT 1 FROM bookings
            WHERE field_id = ?1 AND status != 'cancelled'
              AND start_time < ?3 AND ?2 < end_time
         )",
        params![field_id, format_ts(start), format_ts(end)],
        |row| row.get(0),
    )?;
    Ok(found)
}

pub fn get_booking(conn: &Connection, id: i64) -> Result<Option<Booking>, StoreError> {
    let row = conn
        .query_row(
            "SELECT id, field_id, user_id, start_time, end_time, status, created_at, updated_at
             FROM bookings WHERE id = ?1",
            params![id],
            read_booking_columns,
        )
        .optional()?;

    row.map(BookingRow::into_booking).transpose()
}

pub fn get_booking_details(
    conn: &Connection,
    id: i64,
) -> Result<Option<BookingDetails>, StoreError> {
    let sql = format!("{BOOKING_DETAILS_SELECT} WHERE b.id = ?1");
    let row = conn
        .query_row(&sql, params![id], read_details_columns)
        .optional()?;

    row.map(DetailsRow::into_details).transpose()
}

pub fn list_booking_details(conn: &Connection) -> Result<Vec<BookingDetails>, StoreError> {
    let sql = format!("{BOOKING_DETAILS_SELECT} ORDER BY b.created_at DESC, b.id DESC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], read_details_columns)?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row?.into_details()?);
    }
    Ok(bookings)
}

/// Compare-and-set on status. Returns the updated booking.
pub fn update_booking_status(
    conn: &Connection,
    id: i64,
    expected: BookingStatus,
    next: BookingStatus,
) -> Result<Booking, StoreError> {
    let now = format_ts(&Utc::now());
    let count = conn
        .execute(
            "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
            params![next.as_str(), now, id, expected.as_str()],
        )
        .map_err(map_write_error)?;

    let current = get_booking(conn, id)?.ok_or(StoreError::NotFound)?;
    if count == 0 {
        return Err(StoreError::StatusChanged {
            actual: current.status,
        });
    }
    Ok(current)
}

struct BookingRow {
    id: i64,
    field_id: i64,
    user_id: i64,
    start_time: String,
    end_time: String,
    status: String,
    created_at: String,
    updated_at: String,
}

impl BookingRow {
    fn into_booking(self) -> Result<Booking, StoreError> {
        let status = BookingStatus::parse(&self.status)
            .ok_or_else(|| StoreError::Corrupt(format!("status {:?}", self.status)))?;

        Ok(Booking {
            id: self.id,
            field_id: self.field_id,
            user_id: self.user_id,
            start_time: parse_ts("start_time", &self.start_time)?,
            end_time: parse_ts("end_time", &self.end_time)?,
            status,
            created_at: parse_ts("created_at", &self.created_at)?,
            updated_at: parse_ts("updated_at", &self.updated_at)?,
        })
    }
}

fn read_booking_columns(row: &rusqlite::Row) -> rusqlite::Result<BookingRow> {
    Ok(BookingRow {
        id: row.get(0)?,
        field_id: row.get(1)?,
        user_id: row.get(2)?,
        start_time: row.get(3)?,
        end_time: row.get(4)?,
        status: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

struct DetailsRow {
    booking: BookingRow,
    field: Option<FieldSummary>,
    user: Option<UserSummary>,
}

impl DetailsRow {
    fn into_details(self) -> Result<BookingDetails, StoreError> {
        Ok(BookingDetails {
            booking: self.booking.into_booking()?,
            field: self.field,
            user: self.user,
        })
    }
}

fn read_details_columns(row: &rusqlite::Row) -> rusqlite::Result<DetailsRow> {
    let booking = read_booking_columns(row)?;

    let field = match row.get::<_, Option<i64>>(8)? {
        Some(id) => Some(FieldSummary {
            id,
            name: row.get(9)?,
            price_per_hour: row.get(10)?,
            location: row.get(11)?,
        }),
        None => None,
    };

    let user = match row.get::<_, Option<i64>>(12)? {
        Some(id) => Some(UserSummary {
            id,
            name: row.get(13)?,
            email: row.get(14)?,
        }),
        None => None,
    };

    Ok(DetailsRow {
        booking,
        field,
        user,
    })
}

// ── Fields ──

pub fn create_field(conn: &Connection, input: &FieldInput) -> Result<Field, StoreError> {
    let now = Utc::now();
    let now_str = format_ts(&now);
    conn.execute(
        "INSERT INTO fields (name, price_per_hour, location, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![input.name, input.price_per_hour, input.location, now_str, now_str],
    )?;

    Ok(Field {
        id: conn.last_insert_rowid(),
        name: input.name.clone(),
        price_per_hour: input.price_per_hour,
        location: input.location.clone(),
        created_at: now,
        updated_at: now,
    })
}

pub fn field_exists(conn: &Connection, id: i64) -> Result<bool, StoreError> {
    let found: bool = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM fields WHERE id = ?1)",
        params![id],
        |row| row.get(0),
    )?;
    Ok(found)
}

pub fn get_field(conn: &Connection, id: i64) -> Result<Option<Field>, StoreError> {
    let row = conn
        .query_row(
            "SELECT id, name, price_per_hour, location, created_at, updated_at
             FROM fields WHERE id = ?1",
            params![id],
            read_field_columns,
        )
        .optional()?;

    row.map(FieldRow::into_field).transpose()
}

pub fn list_fields(conn: &Connection) -> Result<Vec<Field>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, price_per_hour, location, created_at, updated_at
         FROM fields ORDER BY id ASC",
    )?;
    let rows = stmt.query_map([], read_field_columns)?;

    let mut fields = vec![];
    for row in rows {
        fields.push(row?.into_field()?);
    }
    Ok(fields)
}

pub fn update_field(
    conn: &Connection,
    id: i64,
    input: &FieldInput,
) -> Result<Option<Field>, StoreError> {
    let count = conn.execute(
        "UPDATE fields SET name = ?1, price_per_hour = ?2, location = ?3, updated_at = ?4
         WHERE id = ?5",
        params![
            input.name,
            input.price_per_hour,
            input.location,
            format_ts(&Utc::now()),
            id
        ],
    )?;

    if count == 0 {
        return Ok(None);
    }
    get_field(conn, id)
}

/// Deletes a field. A field still referenced by bookings is refused with
/// `StoreError::ForeignKey`.
pub fn delete_field(conn: &Connection, id: i64) -> Result<bool, StoreError> {
    let count = conn
        .execute("DELETE FROM fields WHERE id = ?1", params![id])
        .map_err(map_write_error)?;
    Ok(count > 0)
}

struct FieldRow {
    id: i64,
    name: String,
    price_per_hour: i64,
    location: String,
    created_at: String,
    updated_at: String,
}

impl FieldRow {
    fn into_field(self) -> Result<Field, StoreError> {
        Ok(Field {
            id: self.id,
            name: self.name,
            price_per_hour: self.price_per_hour,
            location: self.location,
            created_at: parse_ts("created_at", &self.created_at)?,
            updated_at: parse_ts("updated_at", &self.updated_at)?,
        })
    }
}

fn read_field_columns(row: &rusqlite::Row) -> rusqlite::Result<FieldRow> {
    Ok(FieldRow {
        id: row.get(0)?,
        name: row.get(1)?,
        price_per_hour: row.get(2)?,
        location: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

// ── Users ──

pub fn create_user(conn: &Connection, record: &NewUserRecord) -> Result<User, StoreError> {
    conn.execute(
        "INSERT INTO users (name, email, password_hash, role) VALUES (?1, ?2, ?3, ?4)",
        params![
            record.name,
            record.email,
            record.password_hash,
            record.role.as_str()
        ],
    )
    .map_err(map_write_error)?;

    Ok(User {
        id: conn.last_insert_rowid(),
        name: record.name.clone(),
        email: record.email.clone(),
        role: record.role,
    })
}

/// A user together with the stored password hash, for login.
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

pub fn find_user_by_email(
    conn: &Connection,
    email: &str,
) -> Result<Option<UserCredentials>, StoreError> {
    let row = conn
        .query_row(
            "SELECT id, name, email, role, password_hash FROM users WHERE email = ?1",
            params![email],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            },
        )
        .optional()?;

    let Some((id, name, email, role, password_hash)) = row else {
        return Ok(None);
    };
    let role = Role::parse(&role).ok_or_else(|| StoreError::Corrupt(format!("role {role:?}")))?;

    Ok(Some(UserCredentials {
        user: User {
            id,
            name,
            email,
            role,
        },
        password_hash,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn setup_db() -> Connection {
        db::init_db(":memory:").unwrap()
    }

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn field_input(name: &str) -> FieldInput {
        FieldInput {
            name: name.to_string(),
            price_per_hour: 150_000,
            location: "Jakarta".to_string(),
        }
    }

    fn user_record(name: &str, email: &str) -> NewUserRecord {
        NewUserRecord {
            name: name.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role: Role::User,
        }
    }

    fn record(field_id: i64, start: &str, end: &str) -> NewBookingRecord {
        NewBookingRecord {
            field_id,
            user_id: 7,
            start_time: at(start),
            end_time: at(end),
            status: BookingStatus::Pending,
        }
    }

    #[test]
    fn test_format_ts_is_fixed_width_utc() {
        assert_eq!(
            format_ts(&at("2024-01-01T17:00:00+07:00")),
            "2024-01-01T10:00:00.000000Z"
        );
        assert_eq!(
            format_ts(&at("2024-01-01T10:00:00.5Z")),
            "2024-01-01T10:00:00.500000Z"
        );
    }

    #[test]
    fn test_insert_and_get_booking() {
        let conn = setup_db();
        let field = create_field(&conn, &field_input("Court A")).unwrap();
        let booking = insert_booking(
            &conn,
            &record(field.id, "2024-01-01T10:00:00Z", "2024-01-01T12:00:00Z"),
        )
        .unwrap();

        let loaded = get_booking(&conn, booking.id).unwrap().unwrap();
        assert_eq!(loaded.field_id, field.id);
        assert_eq!(loaded.user_id, 7);
        assert_eq!(loaded.start_time, at("2024-01-01T10:00:00Z"));
        assert_eq!(loaded.status, BookingStatus::Pending);
        assert!(get_booking(&conn, booking.id + 1).unwrap().is_none());
    }

    #[test]
    fn test_has_overlap_half_open() {
        let conn = setup_db();
        let field = create_field(&conn, &field_input("Court A")).unwrap();
        insert_booking(
            &conn,
            &record(field.id, "2024-01-01T10:00:00Z", "2024-01-01T11:00:00Z"),
        )
        .unwrap();

        let overlap = |s: &str, e: &str| has_overlap(&conn, field.id, &at(s), &at(e)).unwrap();
        assert!(overlap("2024-01-01T10:30:00Z", "2024-01-01T11:30:00Z"));
        assert!(overlap("2024-01-01T09:00:00Z", "2024-01-01T10:00:01Z"));
        assert!(!overlap("2024-01-01T11:00:00Z", "2024-01-01T12:00:00Z"));
        assert!(!overlap("2024-01-01T09:00:00Z", "2024-01-01T10:00:00Z"));
        assert!(!has_overlap(
            &conn,
            field.id + 1,
            &at("2024-01-01T10:00:00Z"),
            &at("2024-01-01T11:00:00Z")
        )
        .unwrap());
    }

    #[test]
    fn test_cancelled_bookings_do_not_block() {
        let conn = setup_db();
        let field = create_field(&conn, &field_input("Court A")).unwrap();
        let booking = insert_booking(
            &conn,
            &record(field.id, "2024-01-01T10:00:00Z", "2024-01-01T11:00:00Z"),
        )
        .unwrap();
        update_booking_status(
            &conn,
            booking.id,
            BookingStatus::Pending,
            BookingStatus::Cancelled,
        )
        .unwrap();

        assert!(!has_overlap(
            &conn,
            field.id,
            &at("2024-01-01T10:00:00Z"),
            &at("2024-01-01T11:00:00Z")
        )
        .unwrap());
        insert_booking(
            &conn,
            &record(field.id, "2024-01-01T10:00:00Z", "2024-01-01T11:00:00Z"),
        )
        .unwrap();
    }

    #[test]
    fn test_trigger_rejects_overlapping_insert() {
        let conn = setup_db();
        let field = create_field(&conn, &field_input("Court A")).unwrap();
        insert_booking(
            &conn,
            &record(field.id, "2024-01-01T10:00:00Z", "2024-01-01T12:00:00Z"),
        )
        .unwrap();

        let err = insert_booking(
            &conn,
            &record(field.id, "2024-01-01T11:00:00Z", "2024-01-01T13:00:00Z"),
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::Overlap));
    }

    #[test]
    fn test_insert_unknown_field_is_reported() {
        let conn = setup_db();
        let err = insert_booking(&conn, &record(99, "2024-01-01T10:00:00Z", "2024-01-01T11:00:00Z"))
            .unwrap_err();
        assert!(matches!(err, StoreError::ForeignKey));
    }

    #[test]
    fn test_update_status_compare_and_set() {
        let conn = setup_db();
        let field = create_field(&conn, &field_input("Court A")).unwrap();
        let booking = insert_booking(
            &conn,
            &record(field.id, "2024-01-01T10:00:00Z", "2024-01-01T11:00:00Z"),
        )
        .unwrap();

        let paid =
            update_booking_status(&conn, booking.id, BookingStatus::Pending, BookingStatus::Paid)
                .unwrap();
        assert_eq!(paid.status, BookingStatus::Paid);

        let err =
            update_booking_status(&conn, booking.id, BookingStatus::Pending, BookingStatus::Paid)
                .unwrap_err();
        assert!(matches!(
            err,
            StoreError::StatusChanged {
                actual: BookingStatus::Paid
            }
        ));

        let err = update_booking_status(&conn, 404, BookingStatus::Pending, BookingStatus::Paid)
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn test_list_details_newest_first_with_joins() {
        let conn = setup_db();
        let field = create_field(&conn, &field_input("Court A")).unwrap();
        let budi = create_user(&conn, &user_record("Budi", "budi@example.com")).unwrap();

        let first = insert_booking(
            &conn,
            &NewBookingRecord {
                user_id: budi.id,
                ..record(field.id, "2024-01-01T10:00:00Z", "2024-01-01T11:00:00Z")
            },
        )
        .unwrap();
        let second = insert_booking(
            &conn,
            &NewBookingRecord {
                user_id: budi.id,
                ..record(field.id, "2024-01-01T08:00:00Z", "2024-01-01T09:00:00Z")
            },
        )
        .unwrap();

        let list = list_booking_details(&conn).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].booking.id, second.id);
        assert_eq!(list[1].booking.id, first.id);
        assert_eq!(list[0].field.as_ref().unwrap().name, "Court A");
        assert_eq!(list[0].user.as_ref().unwrap().email, "budi@example.com");
    }

    #[test]
    fn test_details_without_user_row() {
        let conn = setup_db();
        let field = create_field(&conn, &field_input("Court A")).unwrap();
        let booking = insert_booking(
            &conn,
            &record(field.id, "2024-01-01T10:00:00Z", "2024-01-01T11:00:00Z"),
        )
        .unwrap();

        let details = get_booking_details(&conn, booking.id).unwrap().unwrap();
        assert!(details.user.is_none());
        assert_eq!(details.field.unwrap().id, field.id);
    }

    #[test]
    fn test_field_crud() {
        let conn = setup_db();
        let field = create_field(&conn, &field_input("Court A")).unwrap();
        assert!(field_exists(&conn, field.id).unwrap());
        assert!(!field_exists(&conn, field.id + 1).unwrap());

        let updated = update_field(&conn, field.id, &field_input("Court B"))
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "Court B");
        assert!(update_field(&conn, 99, &field_input("X")).unwrap().is_none());

        assert_eq!(list_fields(&conn).unwrap().len(), 1);
        assert!(delete_field(&conn, field.id).unwrap());
        assert!(!delete_field(&conn, field.id).unwrap());
        assert!(get_field(&conn, field.id).unwrap().is_none());
    }

    #[test]
    fn test_delete_field_with_bookings_refused() {
        let conn = setup_db();
        let field = create_field(&conn, &field_input("Court A")).unwrap();
        insert_booking(
            &conn,
            &record(field.id, "2024-01-01T10:00:00Z", "2024-01-01T11:00:00Z"),
        )
        .unwrap();

        let err = delete_field(&conn, field.id).unwrap_err();
        assert!(matches!(err, StoreError::ForeignKey));
    }

    #[test]
    fn test_create_and_find_user() {
        let conn = setup_db();
        let user = create_user(&conn, &user_record("Rina", "rina@example.com")).unwrap();
        assert!(user.id > 0);

        let found = find_user_by_email(&conn, "rina@example.com")
            .unwrap()
            .unwrap();
        assert_eq!(found.user.id, user.id);
        assert_eq!(found.user.name, "Rina");
        assert_eq!(found.user.role, Role::User);
        assert_eq!(found.password_hash, "hash");

        assert!(find_user_by_email(&conn, "nobody@example.com")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let conn = setup_db();
        create_user(&conn, &user_record("Siti", "siti@example.com")).unwrap();

        let err = create_user(&conn, &user_record("Other", "siti@example.com")).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate));
    }
}
