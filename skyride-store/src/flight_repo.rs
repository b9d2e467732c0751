use async_trait::async_trait;
use chrono::{DateTime, Utc};
use skyride_core::repository::FlightRepository;
use skyride_core::{CoreResult, Flight, FlightSearch};
use uuid::Uuid;

use crate::database::map_db_error;

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct FlightRow {
    pub id: Uuid,
    pub airline_name: String,
    pub flight_number: String,
    pub departure: DateTime<Utc>,
    pub arrival: DateTime<Utc>,
    pub available_seats: i32,
}

impl From<FlightRow> for Flight {
    fn from(row: FlightRow) -> Self {
        Flight {
            id: row.id,
            airline_name: row.airline_name,
            flight_number: row.flight_number,
            departure: row.departure,
            arrival: row.arrival,
            available_seats: row.available_seats,
        }
    }
}

/// `%term%` with LIKE wildcards in the term matched literally.
fn substring_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

pub struct PostgresFlightRepository {
    pub pool: sqlx::PgPool,
}

#[async_trait]
impl FlightRepository for PostgresFlightRepository {
    async fn insert_flight(&self, flight: &Flight) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO flights (id, airline_name, flight_number, departure, arrival, available_seats)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(flight.id)
        .bind(&flight.airline_name)
        .bind(&flight.flight_number)
        .bind(flight.departure)
        .bind(flight.arrival)
        .bind(flight.available_seats)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(())
    }

    async fn exists_by_flight_number(&self, flight_number: &str) -> CoreResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM flights WHERE flight_number = $1)")
                .bind(flight_number)
                .fetch_one(&self.pool)
                .await
                .map_err(map_db_error)?;
        Ok(exists)
    }

    async fn find_flight(&self, id: Uuid) -> CoreResult<Option<Flight>> {
        let row = sqlx::query_as::<_, FlightRow>(
            r#"
            SELECT id, airline_name, flight_number, departure, arrival, available_seats
            FROM flights WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(row.map(Flight::from))
    }

    async fn search_flights(&self, search: &FlightSearch) -> CoreResult<Vec<Flight>> {
        // NULL parameters disable their filter
        let rows = sqlx::query_as::<_, FlightRow>(
            r#"
            SELECT id, airline_name, flight_number, departure, arrival, available_seats
            FROM flights
            WHERE ($1::TEXT IS NULL OR flight_number ILIKE $1 ESCAPE '\')
              AND ($2::TEXT IS NULL OR airline_name ILIKE $2 ESCAPE '\')
              AND ($3::TIMESTAMPTZ IS NULL OR departure >= $3)
              AND ($4::TIMESTAMPTZ IS NULL OR departure <= $4)
            ORDER BY departure
            "#,
        )
        .bind(search.flight_number.as_deref().map(substring_pattern))
        .bind(search.airline_name.as_deref().map(substring_pattern))
        .bind(search.departure_from)
        .bind(search.departure_to)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(rows.into_iter().map(Flight::from).collect())
    }

    async fn delete_flight(&self, id: Uuid) -> CoreResult<bool> {
        // bookings cascade through the foreign key
        let result = sqlx::query("DELETE FROM flights WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_all_flights(&self) -> CoreResult<u64> {
        let result = sqlx::query("DELETE FROM flights")
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected())
    }
}
