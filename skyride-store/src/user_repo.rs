use async_trait::async_trait;
use chrono::{DateTime, Utc};
use skyride_core::repository::{CoordinateRepository, UserRepository};
use skyride_core::{
    Category, Coordinate, CoreError, CoreResult, GeoPoint, User, UserKind, Vehicle,
};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::database::map_db_error;

/// Users joined with their coordinate and, for drivers, their vehicle.
pub(crate) const SELECT_USER: &str = r#"
    SELECT
        u.id, u.role, u.first_name, u.last_name, u.email, u.phone_number,
        u.avg_rating, u.trips, u.category, u.created_at, u.updated_at,
        c.id AS coordinate_id, c.latitude, c.longitude,
        v.brand, v.model, v.license_plate, v.fabrication_year, v.capacity
    FROM users u
    LEFT JOIN coordinates c ON c.id = u.coordinate_id
    LEFT JOIN vehicles v ON v.driver_id = u.id
    WHERE u.id = $1
"#;

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserRow {
    id: Uuid,
    role: String,
    first_name: String,
    last_name: String,
    email: String,
    phone_number: Option<String>,
    avg_rating: f64,
    trips: i32,
    category: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    coordinate_id: Option<Uuid>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    brand: Option<String>,
    model: Option<String>,
    license_plate: Option<String>,
    fabrication_year: Option<i32>,
    capacity: Option<i32>,
}

impl UserRow {
    fn driver_kind(&self) -> Option<UserKind> {
        let category = Category::parse(self.category.as_deref()?)?;
        let vehicle = Vehicle {
            brand: self.brand.clone()?,
            model: self.model.clone()?,
            license_plate: self.license_plate.clone()?,
            fabrication_year: self.fabrication_year?,
            capacity: self.capacity?,
        };
        Some(UserKind::Driver { category, vehicle })
    }
}

impl TryFrom<UserRow> for User {
    type Error = CoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let kind = match row.role.as_str() {
            "CUSTOMER" => UserKind::Customer,
            "PASSENGER" => UserKind::Passenger,
            "DRIVER" => row.driver_kind().ok_or_else(|| {
                CoreError::Infrastructure(format!("Driver {} has no vehicle on record", row.id))
            })?,
            other => {
                return Err(CoreError::Infrastructure(format!("Unknown user role {}", other)))
            }
        };

        let coordinate = match (row.coordinate_id, row.latitude, row.longitude) {
            (Some(id), Some(latitude), Some(longitude)) => Some(Coordinate {
                id,
                latitude,
                longitude,
            }),
            _ => None,
        };

        Ok(User {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone_number: row.phone_number,
            coordinate,
            avg_rating: row.avg_rating,
            trips: row.trips,
            kind,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn category_of(user: &User) -> Option<&'static str> {
    match &user.kind {
        UserKind::Driver { category, .. } => Some(category.as_str()),
        _ => None,
    }
}

async fn upsert_vehicle(
    tx: &mut Transaction<'static, Postgres>,
    driver_id: Uuid,
    vehicle: &Vehicle,
) -> CoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO vehicles (driver_id, brand, model, license_plate, fabrication_year, capacity)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (driver_id) DO UPDATE SET
            brand = EXCLUDED.brand,
            model = EXCLUDED.model,
            license_plate = EXCLUDED.license_plate,
            fabrication_year = EXCLUDED.fabrication_year,
            capacity = EXCLUDED.capacity
        "#,
    )
    .bind(driver_id)
    .bind(&vehicle.brand)
    .bind(&vehicle.model)
    .bind(&vehicle.license_plate)
    .bind(vehicle.fabrication_year)
    .bind(vehicle.capacity)
    .execute(&mut **tx)
    .await
    .map_err(map_db_error)?;
    Ok(())
}

pub struct PostgresUserRepository {
    pub pool: sqlx::PgPool,
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn insert_user(&self, user: &User) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        sqlx::query(
            r#"
            INSERT INTO users (id, role, first_name, last_name, email, phone_number,
                               coordinate_id, avg_rating, trips, category, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(user.id)
        .bind(user.role().as_str())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(user.phone_number.as_deref())
        .bind(user.coordinate.map(|c| c.id))
        .bind(user.avg_rating)
        .bind(user.trips)
        .bind(category_of(user))
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        if let Some(vehicle) = user.vehicle() {
            upsert_vehicle(&mut tx, user.id, vehicle).await?;
        }

        tx.commit().await.map_err(map_db_error)?;
        Ok(())
    }

    async fn exists_by_email(&self, email: &str) -> CoreResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))")
                .bind(email)
                .fetch_one(&self.pool)
                .await
                .map_err(map_db_error)?;
        Ok(exists)
    }

    async fn find_user(&self, id: Uuid) -> CoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(SELECT_USER)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;
        row.map(User::try_from).transpose()
    }

    async fn update_user(&self, user: &User) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let result = sqlx::query(
            r#"
            UPDATE users SET
                first_name = $2, last_name = $3, email = $4, phone_number = $5,
                coordinate_id = $6, avg_rating = $7, trips = $8, category = $9, updated_at = $10
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(user.phone_number.as_deref())
        .bind(user.coordinate.map(|c| c.id))
        .bind(user.avg_rating)
        .bind(user.trips)
        .bind(category_of(user))
        .bind(user.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::not_found("User", user.id));
        }

        if let Some(vehicle) = user.vehicle() {
            upsert_vehicle(&mut tx, user.id, vehicle).await?;
        }

        tx.commit().await.map_err(map_db_error)?;
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> CoreResult<bool> {
        // vehicles and bookings cascade; rides keep the dangling id
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_all_users(&self) -> CoreResult<u64> {
        let result = sqlx::query("DELETE FROM users")
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected())
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct CoordinateRow {
    pub id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
}

impl From<CoordinateRow> for Coordinate {
    fn from(row: CoordinateRow) -> Self {
        Coordinate {
            id: row.id,
            latitude: row.latitude,
            longitude: row.longitude,
        }
    }
}

#[async_trait]
impl CoordinateRepository for PostgresUserRepository {
    async fn find_or_create(&self, point: GeoPoint) -> CoreResult<Coordinate> {
        let candidate = Coordinate::new(point);
        sqlx::query(
            r#"
            INSERT INTO coordinates (id, latitude, longitude)
            VALUES ($1, $2, $3)
            ON CONFLICT (latitude, longitude) DO NOTHING
            "#,
        )
        .bind(candidate.id)
        .bind(point.latitude)
        .bind(point.longitude)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        let row = sqlx::query_as::<_, CoordinateRow>(
            "SELECT id, latitude, longitude FROM coordinates WHERE latitude = $1 AND longitude = $2",
        )
        .bind(point.latitude)
        .bind(point.longitude)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(row.into())
    }
}
