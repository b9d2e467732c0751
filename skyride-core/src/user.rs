use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Latitude/longitude pair as supplied by callers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// A stored location. Shared between users and rides; looked up by exact
/// latitude/longitude and reused rather than duplicated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinate {
    pub id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(point: GeoPoint) -> Self {
        Self {
            id: Uuid::new_v4(),
            latitude: point.latitude,
            longitude: point.longitude,
        }
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    pub fn is_at(&self, point: GeoPoint) -> bool {
        self.latitude == point.latitude && self.longitude == point.longitude
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Customer,
    Passenger,
    Driver,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "CUSTOMER",
            Role::Passenger => "PASSENGER",
            Role::Driver => "DRIVER",
        }
    }
}

/// Driver service level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    X,
    Xl,
    Black,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::X => "X",
            Category::Xl => "XL",
            Category::Black => "BLACK",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "X" => Some(Category::X),
            "XL" => Some(Category::Xl),
            "BLACK" => Some(Category::Black),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vehicle {
    pub brand: String,
    pub model: String,
    pub license_plate: String,
    pub fabrication_year: i32,
    pub capacity: i32,
}

/// Role-specific part of a user. Only drivers carry a vehicle and category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "role", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserKind {
    Customer,
    Passenger,
    Driver { category: Category, vehicle: Vehicle },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub coordinate: Option<Coordinate>,
    pub avg_rating: f64,
    pub trips: i32,
    #[serde(flatten)]
    pub kind: UserKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(input: NewUser, kind: UserKind, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            first_name: input.first_name.unwrap_or_default().trim().to_string(),
            last_name: input.last_name.unwrap_or_default().trim().to_string(),
            email: input.email.unwrap_or_default().trim().to_string(),
            phone_number: input.phone_number,
            coordinate: None,
            avg_rating: 0.0,
            trips: 0,
            kind,
            created_at: now,
            updated_at: None,
        }
    }

    pub fn role(&self) -> Role {
        match self.kind {
            UserKind::Customer => Role::Customer,
            UserKind::Passenger => Role::Passenger,
            UserKind::Driver { .. } => Role::Driver,
        }
    }

    pub fn is_driver(&self) -> bool {
        matches!(self.kind, UserKind::Driver { .. })
    }

    pub fn is_passenger(&self) -> bool {
        matches!(self.kind, UserKind::Passenger)
    }

    /// Contact address for ride notifications; only passengers have one.
    pub fn passenger_email(&self) -> Option<&str> {
        match self.kind {
            UserKind::Passenger => Some(&self.email),
            _ => None,
        }
    }

    pub fn vehicle(&self) -> Option<&Vehicle> {
        match &self.kind {
            UserKind::Driver { vehicle, .. } => Some(vehicle),
            _ => None,
        }
    }
}

/// Unvalidated user creation input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewUser {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver() -> User {
        User::new(
            NewUser {
                first_name: Some("Ana".to_string()),
                last_name: Some("Ruiz".to_string()),
                email: Some("ana@example.com".to_string()),
                phone_number: Some("999111222".to_string()),
            },
            UserKind::Driver {
                category: Category::Xl,
                vehicle: Vehicle {
                    brand: "Toyota".to_string(),
                    model: "Corolla".to_string(),
                    license_plate: "ABC-123".to_string(),
                    fabrication_year: 2020,
                    capacity: 4,
                },
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_driver_serializes_with_role_tag() {
        let json = serde_json::to_value(driver()).unwrap();
        assert_eq!(json["role"], "DRIVER");
        assert_eq!(json["category"], "XL");
        assert_eq!(json["vehicle"]["license_plate"], "ABC-123");
    }

    #[test]
    fn test_only_passengers_expose_notification_email() {
        let d = driver();
        assert_eq!(d.role(), Role::Driver);
        assert!(d.passenger_email().is_none());

        let mut p = d.clone();
        p.kind = UserKind::Passenger;
        assert_eq!(p.passenger_email(), Some("ana@example.com"));
    }
}
