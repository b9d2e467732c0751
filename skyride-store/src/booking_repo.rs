use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use skyride_core::repository::{BookingRepository, BookingTransaction};
use skyride_core::{
    Booking, BookingView, CoreError, CoreResult, Flight, FlightWindow, User,
};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::database::map_db_error;
use crate::flight_repo::FlightRow;
use crate::user_repo::{UserRow, SELECT_USER};

#[derive(Debug, sqlx::FromRow)]
struct BookingViewRow {
    id: Uuid,
    booked_at: DateTime<Utc>,
    flight_id: Uuid,
    flight_number: String,
    customer_id: Uuid,
    customer_first_name: String,
    customer_last_name: String,
    departure: DateTime<Utc>,
    arrival: DateTime<Utc>,
}

impl From<BookingViewRow> for BookingView {
    fn from(row: BookingViewRow) -> Self {
        BookingView {
            id: row.id,
            booked_at: row.booked_at.trunc_subsecs(0),
            flight_id: row.flight_id,
            flight_number: row.flight_number,
            customer_id: row.customer_id,
            customer_first_name: row.customer_first_name,
            customer_last_name: row.customer_last_name,
            departure: row.departure,
            arrival: row.arrival,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct WindowRow {
    departure: DateTime<Utc>,
    arrival: DateTime<Utc>,
}

pub struct PostgresBookingRepository {
    pub pool: sqlx::PgPool,
}

#[async_trait]
impl BookingRepository for PostgresBookingRepository {
    async fn begin(&self) -> CoreResult<Box<dyn BookingTransaction>> {
        let tx = self.pool.begin().await.map_err(map_db_error)?;
        Ok(Box::new(PostgresBookingTransaction { tx: Some(tx) }))
    }

    async fn find_booking(&self, id: Uuid) -> CoreResult<Option<BookingView>> {
        let row = sqlx::query_as::<_, BookingViewRow>(
            r#"
            SELECT b.id, b.booked_at, b.flight_id, f.flight_number, b.customer_id,
                   b.customer_first_name, b.customer_last_name, f.departure, f.arrival
            FROM bookings b
            JOIN flights f ON f.id = b.flight_id
            WHERE b.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(row.map(BookingView::from))
    }

    async fn count_for_flight(&self, flight_id: Uuid) -> CoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE flight_id = $1")
            .bind(flight_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(count)
    }

    async fn delete_all_bookings(&self) -> CoreResult<u64> {
        let result = sqlx::query("DELETE FROM bookings")
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected())
    }
}

/// Wraps a database transaction. The flight and customer row locks are held
/// until commit; dropping the value rolls back.
pub struct PostgresBookingTransaction {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PostgresBookingTransaction {
    fn conn(&mut self) -> CoreResult<&mut Transaction<'static, Postgres>> {
        self.tx
            .as_mut()
            .ok_or_else(|| CoreError::Infrastructure("Transaction already committed".to_string()))
    }
}

#[async_trait]
impl BookingTransaction for PostgresBookingTransaction {
    async fn lock_flight(&mut self, flight_id: Uuid) -> CoreResult<Option<Flight>> {
        let tx = self.conn()?;
        let row = sqlx::query_as::<_, FlightRow>(
            r#"
            SELECT id, airline_name, flight_number, departure, arrival, available_seats
            FROM flights WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(flight_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_db_error)?;
        Ok(row.map(Flight::from))
    }

    async fn lock_customer(&mut self, customer_id: Uuid) -> CoreResult<Option<User>> {
        let tx = self.conn()?;
        // The user query outer-joins, so the row lock is taken on its own
        let locked: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(customer_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(map_db_error)?;
        if locked.is_none() {
            return Ok(None);
        }

        let row = sqlx::query_as::<_, UserRow>(SELECT_USER)
            .bind(customer_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(map_db_error)?;
        row.map(User::try_from).transpose()
    }

    async fn count_bookings(&mut self, flight_id: Uuid) -> CoreResult<i64> {
        let tx = self.conn()?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE flight_id = $1")
            .bind(flight_id)
            .fetch_one(&mut **tx)
            .await
            .map_err(map_db_error)?;
        Ok(count)
    }

    async fn customer_windows(&mut self, customer_id: Uuid) -> CoreResult<Vec<FlightWindow>> {
        let tx = self.conn()?;
        let rows = sqlx::query_as::<_, WindowRow>(
            r#"
            SELECT f.departure, f.arrival
            FROM bookings b
            JOIN flights f ON f.id = b.flight_id
            WHERE b.customer_id = $1
            "#,
        )
        .bind(customer_id)
        .fetch_all(&mut **tx)
        .await
        .map_err(map_db_error)?;
        Ok(rows
            .into_iter()
            .map(|r| FlightWindow {
                departure: r.departure,
                arrival: r.arrival,
            })
            .collect())
    }

    async fn insert_booking(&mut self, booking: &Booking) -> CoreResult<()> {
        let tx = self.conn()?;
        sqlx::query(
            r#"
            INSERT INTO bookings (id, flight_id, customer_id, booked_at,
                                  customer_first_name, customer_last_name)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(booking.id)
        .bind(booking.flight_id)
        .bind(booking.customer_id)
        .bind(booking.booked_at)
        .bind(&booking.customer_first_name)
        .bind(&booking.customer_last_name)
        .execute(&mut **tx)
        .await
        .map_err(map_db_error)?;
        Ok(())
    }

    async fn commit(&mut self) -> CoreResult<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| CoreError::Infrastructure("Transaction already committed".to_string()))?;
        tx.commit().await.map_err(map_db_error)
    }
}
