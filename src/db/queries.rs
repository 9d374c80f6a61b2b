use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::errors::AppError;
use crate::models::{Booking, BookingFilter, BookingStatus, Pet, Service};

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const BOOKING_COLUMNS: &str = "id, service_id, pet_id, customer_id, merchant_id, start_at, \
     duration_minutes, note, status, created_at, updated_at";

// ── Services ──

pub fn insert_service(conn: &Connection, service: &Service) -> Result<(), AppError> {
    conn.execute(
        "INSERT INTO services (id, merchant_id, name, category, price_min, price_max, duration_minutes, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(id) DO UPDATE SET
           merchant_id = excluded.merchant_id,
           name = excluded.name,
           category = excluded.category,
           price_min = excluded.price_min,
           price_max = excluded.price_max,
           duration_minutes = excluded.duration_minutes,
           is_active = excluded.is_active",
        params![
            service.id,
            service.merchant_id,
            service.name,
            service.category,
            service.price_min,
            service.price_max,
            service.duration_minutes,
            service.is_active,
        ],
    )?;
    Ok(())
}

pub fn get_service(conn: &Connection, id: &str) -> Result<Option<Service>, AppError> {
    let service = conn
        .query_row(
            "SELECT id, merchant_id, name, category, price_min, price_max, duration_minutes, is_active
             FROM services WHERE id = ?1",
            params![id],
            parse_service_row,
        )
        .optional()?;
    Ok(service)
}

pub fn list_services_for_merchant(conn: &Connection, merchant_id: &str) -> Result<Vec<Service>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT id, merchant_id, name, category, price_min, price_max, duration_minutes, is_active
         FROM services WHERE merchant_id = ?1 ORDER BY name ASC",
    )?;
    let rows = stmt.query_map(params![merchant_id], parse_service_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn parse_service_row(row: &Row) -> rusqlite::Result<Service> {
    Ok(Service {
        id: row.get(0)?,
        merchant_id: row.get(1)?,
        name: row.get(2)?,
        category: row.get(3)?,
        price_min: row.get(4)?,
        price_max: row.get(5)?,
        duration_minutes: row.get(6)?,
        is_active: row.get(7)?,
    })
}

// ── Pets ──

pub fn insert_pet(conn: &Connection, pet: &Pet) -> Result<(), AppError> {
    conn.execute(
        "INSERT INTO pets (id, owner_id, species, name) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
           owner_id = excluded.owner_id,
           species = excluded.species,
           name = excluded.name",
        params![pet.id, pet.owner_id, pet.species, pet.name],
    )?;
    Ok(())
}

pub fn get_pet(conn: &Connection, id: &str) -> Result<Option<Pet>, AppError> {
    let pet = conn
        .query_row(
            "SELECT id, owner_id, species, name FROM pets WHERE id = ?1",
            params![id],
            parse_pet_row,
        )
        .optional()?;
    Ok(pet)
}

pub fn list_pets_for_owner(conn: &Connection, owner_id: &str) -> Result<Vec<Pet>, AppError> {
    let mut stmt =
        conn.prepare("SELECT id, owner_id, species, name FROM pets WHERE owner_id = ?1 ORDER BY name ASC")?;
    let rows = stmt.query_map(params![owner_id], parse_pet_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn parse_pet_row(row: &Row) -> rusqlite::Result<Pet> {
    Ok(Pet {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        species: row.get(2)?,
        name: row.get(3)?,
    })
}

// ── Bookings ──

/// Inserts a booking. A clash with the active-slot unique index is reported
/// as `SlotConflict`.
pub fn create_booking(conn: &Connection, booking: &Booking) -> Result<(), AppError> {
    let result = conn.execute(
        "INSERT INTO bookings (id, service_id, pet_id, customer_id, merchant_id, start_at, duration_minutes, note, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            booking.id,
            booking.service_id,
            booking.pet_id,
            booking.customer_id,
            booking.merchant_id,
            booking.start_at.format(TS_FORMAT).to_string(),
            booking.duration_minutes,
            booking.note,
            booking.status.as_str(),
            booking.created_at.format(TS_FORMAT).to_string(),
            booking.updated_at.format(TS_FORMAT).to_string(),
        ],
    );

    match result {
        Ok(_) => Ok(()),
        Err(e) if is_unique_violation(&e) => Err(AppError::SlotConflict),
        Err(e) => Err(e.into()),
    }
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> Result<Option<Booking>, AppError> {
    let booking = conn
        .query_row(
            &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
            params![id],
            parse_booking_row,
        )
        .optional()?;
    Ok(booking)
}

/// Active bookings for a service starting within `[start, end]`.
pub fn get_active_bookings_in_range(
    conn: &Connection,
    service_id: &str,
    start: &NaiveDateTime,
    end: &NaiveDateTime,
) -> Result<Vec<Booking>, AppError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE service_id = ?1 AND start_at >= ?2 AND start_at <= ?3
           AND status IN ('pending', 'confirmed')
         ORDER BY start_at ASC"
    ))?;
    let rows = stmt.query_map(
        params![
            service_id,
            start.format(TS_FORMAT).to_string(),
            end.format(TS_FORMAT).to_string()
        ],
        parse_booking_row,
    )?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn list_bookings(conn: &Connection, filter: &BookingFilter) -> Result<Vec<Booking>, AppError> {
    let mut clauses: Vec<&str> = vec![];
    let mut values: Vec<Box<dyn ToSql>> = vec![];

    if let Some(customer_id) = &filter.customer_id {
        clauses.push("customer_id = ?");
        values.push(Box::new(customer_id.clone()));
    }
    if let Some(merchant_id) = &filter.merchant_id {
        clauses.push("merchant_id = ?");
        values.push(Box::new(merchant_id.clone()));
    }
    if let Some(service_id) = &filter.service_id {
        clauses.push("service_id = ?");
        values.push(Box::new(service_id.clone()));
    }
    if let Some(status) = filter.status {
        clauses.push("status = ?");
        values.push(Box::new(status.as_str()));
    }
    if let Some(from) = filter.from {
        clauses.push("start_at >= ?");
        values.push(Box::new(day_start(from)));
    }
    if let Some(to) = filter.to {
        clauses.push("start_at <= ?");
        values.push(Box::new(day_end(to)));
    }

    let mut sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings");
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY start_at ASC, id ASC");

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn ToSql> = values.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), parse_booking_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Compare-and-set status update: only applies while the stored status is
/// still `expected`. Returns the number of rows changed.
pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    expected: BookingStatus,
    status: BookingStatus,
    now: &NaiveDateTime,
) -> Result<usize, AppError> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
        params![
            status.as_str(),
            now.format(TS_FORMAT).to_string(),
            id,
            expected.as_str()
        ],
    )?;
    Ok(count)
}

fn day_start(date: NaiveDate) -> String {
    format!("{} 00:00:00", date.format("%Y-%m-%d"))
}

fn day_end(date: NaiveDate) -> String {
    format!("{} 23:59:59", date.format("%Y-%m-%d"))
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn parse_timestamp(idx: usize, s: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TS_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_booking_row(row: &Row) -> rusqlite::Result<Booking> {
    let start_at: String = row.get(5)?;
    let status: String = row.get(8)?;
    let created_at: String = row.get(9)?;
    let updated_at: String = row.get(10)?;

    let status = BookingStatus::parse(&status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            8,
            rusqlite::types::Type::Text,
            format!("unknown booking status: {status}").into(),
        )
    })?;

    Ok(Booking {
        id: row.get(0)?,
        service_id: row.get(1)?,
        pet_id: row.get(2)?,
        customer_id: row.get(3)?,
        merchant_id: row.get(4)?,
        start_at: parse_timestamp(5, &start_at)?,
        duration_minutes: row.get(6)?,
        note: row.get(7)?,
        status,
        created_at: parse_timestamp(9, &created_at)?,
        updated_at: parse_timestamp(10, &updated_at)?,
    })
}
