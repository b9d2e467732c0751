use serde::{Deserialize, Serialize};
use skyride_core::repository::{CoordinateRepository, UserRepository};
use skyride_core::validation::{validate_contact, validate_registration};
use skyride_core::{
    Category, Clock, CoreError, CoreResult, GeoPoint, NewUser, Role, User, UserKind, Vehicle,
};
use skyride_shared::Masked;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPassenger {
    #[serde(flatten)]
    pub contact: NewUser,
    pub location: Option<GeoPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDriver {
    #[serde(flatten)]
    pub contact: NewUser,
    pub category: Category,
    pub vehicle: Vehicle,
    pub location: Option<GeoPoint>,
}

fn validate_vehicle(vehicle: &Vehicle) -> CoreResult<()> {
    let fields = [
        ("Brand", &vehicle.brand),
        ("Model", &vehicle.model),
        ("License plate", &vehicle.license_plate),
    ];
    for (name, value) in fields {
        if value.trim().is_empty() {
            return Err(CoreError::Validation(format!("{} is mandatory", name)));
        }
    }
    if vehicle.capacity <= 0 {
        return Err(CoreError::Validation(
            "Vehicle capacity must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

fn label(role: Role) -> &'static str {
    match role {
        Role::Customer => "Customer",
        Role::Passenger => "Passenger",
        Role::Driver => "Driver",
    }
}

/// Customers, passengers and drivers.
#[derive(Clone)]
pub struct UserRegistry {
    users: Arc<dyn UserRepository>,
    coordinates: Arc<dyn CoordinateRepository>,
    clock: Arc<dyn Clock>,
}

impl UserRegistry {
    pub fn new(
        users: Arc<dyn UserRepository>,
        coordinates: Arc<dyn CoordinateRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            coordinates,
            clock,
        }
    }

    /// Self-service sign-up for flight customers.
    pub async fn register_customer(&self, input: NewUser) -> CoreResult<User> {
        validate_registration(&input)?;
        self.store(input, UserKind::Customer, None).await
    }

    pub async fn create_passenger(&self, input: NewPassenger) -> CoreResult<User> {
        validate_contact(&input.contact)?;
        self.store(input.contact, UserKind::Passenger, input.location)
            .await
    }

    pub async fn create_driver(&self, input: NewDriver) -> CoreResult<User> {
        validate_contact(&input.contact)?;
        validate_vehicle(&input.vehicle)?;
        let kind = UserKind::Driver {
            category: input.category,
            vehicle: input.vehicle,
        };
        self.store(input.contact, kind, input.location).await
    }

    async fn store(
        &self,
        input: NewUser,
        kind: UserKind,
        location: Option<GeoPoint>,
    ) -> CoreResult<User> {
        let email = input.email.as_deref().unwrap_or_default().trim();
        if self.users.exists_by_email(email).await? {
            return Err(CoreError::Conflict(
                "User with this email already exists".to_string(),
            ));
        }

        let mut user = User::new(input, kind, self.clock.now());
        if let Some(point) = location {
            user.coordinate = Some(self.coordinates.find_or_create(point).await?);
        }

        self.users.insert_user(&user).await?;
        info!(
            user_id = %user.id,
            role = user.role().as_str(),
            email = %Masked(user.email.as_str()),
            "User created"
        );
        Ok(user)
    }

    /// A user of another role is reported as missing.
    pub async fn get_user(&self, id: Uuid, role: Role) -> CoreResult<User> {
        match self.users.find_user(id).await? {
            Some(user) if user.role() == role => Ok(user),
            _ => Err(CoreError::not_found(label(role), id)),
        }
    }

    /// Rides that reference the user are kept.
    pub async fn delete_user(&self, id: Uuid, role: Role) -> CoreResult<()> {
        self.get_user(id, role).await?;
        self.users.delete_user(id).await?;
        info!(user_id = %id, role = role.as_str(), "User deleted");
        Ok(())
    }

    pub async fn update_driver_location(&self, id: Uuid, point: GeoPoint) -> CoreResult<User> {
        let mut driver = self.get_user(id, Role::Driver).await?;
        driver.coordinate = Some(self.coordinates.find_or_create(point).await?);
        driver.updated_at = Some(self.clock.now());
        self.users.update_user(&driver).await?;
        info!(driver_id = %id, "Driver location updated");
        Ok(driver)
    }

    pub async fn update_driver_vehicle(&self, id: Uuid, vehicle: Vehicle) -> CoreResult<User> {
        validate_vehicle(&vehicle)?;
        let mut driver = self.get_user(id, Role::Driver).await?;
        if let UserKind::Driver { vehicle: current, .. } = &mut driver.kind {
            *current = vehicle;
        }
        driver.updated_at = Some(self.clock.now());
        self.users.update_user(&driver).await?;
        info!(driver_id = %id, "Driver vehicle updated");
        Ok(driver)
    }
}
