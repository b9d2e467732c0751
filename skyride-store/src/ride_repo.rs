use async_trait::async_trait;
use chrono::{DateTime, Utc};
use skyride_core::repository::RideRepository;
use skyride_core::{
    Coordinate, CoreError, CoreResult, Page, PageRequest, Ride, RideStatus,
};
use uuid::Uuid;

use crate::database::map_db_error;

const SELECT_RIDE: &str = r#"
    SELECT
        r.id, r.passenger_id, r.driver_id, r.origin_name, r.destination_name,
        o.id AS origin_id, o.latitude AS origin_latitude, o.longitude AS origin_longitude,
        d.id AS destination_id, d.latitude AS destination_latitude, d.longitude AS destination_longitude,
        r.departure_date, r.arrival_date, r.price, r.status, r.created_at
    FROM rides r
    JOIN coordinates o ON o.id = r.origin_coordinate_id
    JOIN coordinates d ON d.id = r.destination_coordinate_id
"#;

#[derive(Debug, sqlx::FromRow)]
struct RideRow {
    id: Uuid,
    passenger_id: Uuid,
    driver_id: Uuid,
    origin_name: String,
    destination_name: String,
    origin_id: Uuid,
    origin_latitude: f64,
    origin_longitude: f64,
    destination_id: Uuid,
    destination_latitude: f64,
    destination_longitude: f64,
    departure_date: DateTime<Utc>,
    arrival_date: Option<DateTime<Utc>>,
    price: f64,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<RideRow> for Ride {
    type Error = CoreError;

    fn try_from(row: RideRow) -> Result<Self, Self::Error> {
        let status = RideStatus::parse(&row.status).ok_or_else(|| {
            CoreError::Infrastructure(format!("Unknown ride status {}", row.status))
        })?;
        Ok(Ride {
            id: row.id,
            passenger_id: row.passenger_id,
            driver_id: row.driver_id,
            origin_name: row.origin_name,
            destination_name: row.destination_name,
            origin: Coordinate {
                id: row.origin_id,
                latitude: row.origin_latitude,
                longitude: row.origin_longitude,
            },
            destination: Coordinate {
                id: row.destination_id,
                latitude: row.destination_latitude,
                longitude: row.destination_longitude,
            },
            departure_date: row.departure_date,
            arrival_date: row.arrival_date,
            price: row.price,
            status,
            created_at: row.created_at,
        })
    }
}

pub struct PostgresRideRepository {
    pub pool: sqlx::PgPool,
}

#[async_trait]
impl RideRepository for PostgresRideRepository {
    async fn insert_ride(&self, ride: &Ride) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO rides (id, passenger_id, driver_id, origin_name, destination_name,
                               origin_coordinate_id, destination_coordinate_id,
                               departure_date, arrival_date, price, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(ride.id)
        .bind(ride.passenger_id)
        .bind(ride.driver_id)
        .bind(&ride.origin_name)
        .bind(&ride.destination_name)
        .bind(ride.origin.id)
        .bind(ride.destination.id)
        .bind(ride.departure_date)
        .bind(ride.arrival_date)
        .bind(ride.price)
        .bind(ride.status.as_str())
        .bind(ride.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(())
    }

    async fn find_ride(&self, id: Uuid) -> CoreResult<Option<Ride>> {
        let query = format!("{} WHERE r.id = $1", SELECT_RIDE);
        let row = sqlx::query_as::<_, RideRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;
        row.map(Ride::try_from).transpose()
    }

    async fn update_ride(&self, ride: &Ride) -> CoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE rides SET driver_id = $2, arrival_date = $3, price = $4, status = $5
            WHERE id = $1
            "#,
        )
        .bind(ride.id)
        .bind(ride.driver_id)
        .bind(ride.arrival_date)
        .bind(ride.price)
        .bind(ride.status.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::not_found("Ride", ride.id));
        }
        Ok(())
    }

    async fn rides_by_passenger_and_status(
        &self,
        passenger_id: Uuid,
        status: RideStatus,
        page: PageRequest,
    ) -> CoreResult<Page<Ride>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM rides WHERE passenger_id = $1 AND status = $2",
        )
        .bind(passenger_id)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        let query = format!(
            "{} WHERE r.passenger_id = $1 AND r.status = $2 \
             ORDER BY r.departure_date DESC LIMIT $3 OFFSET $4",
            SELECT_RIDE
        );
        let rows = sqlx::query_as::<_, RideRow>(&query)
            .bind(passenger_id)
            .bind(status.as_str())
            .bind(page.size as i64)
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;

        let content = rows
            .into_iter()
            .map(Ride::try_from)
            .collect::<CoreResult<Vec<_>>>()?;
        Ok(Page::new(content, page, total as u64))
    }

    async fn delete_all_rides(&self) -> CoreResult<u64> {
        let result = sqlx::query("DELETE FROM rides")
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected())
    }
}
