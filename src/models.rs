// Wire types for the remote marketplace API. Timestamps, currency and
// distance values pass through opaquely; formatting is presentational.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stand {
    pub name: String,
    pub city: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleImage {
    pub id: i64,
    pub url: String,
    pub alt_text: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub order_index: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: i64,
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub mileage: i64,
    pub price: f64,
    pub color: Option<String>,
    pub fuel_type: Option<String>,
    pub transmission: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
    pub description: Option<String>,
    pub stand: Option<Stand>,
    pub images: Option<Vec<VehicleImage>>,
}

impl Vehicle {
    /// The image marked primary, falling back to the lowest order_index.
    pub fn primary_image(&self) -> Option<&VehicleImage> {
        let images = self.images.as_deref()?;
        images
            .iter()
            .find(|image| image.is_primary)
            .or_else(|| images.iter().min_by_key(|image| image.order_index))
    }

    /// Images in display order: primary first, then by order_index.
    pub fn ordered_images(&self) -> Vec<&VehicleImage> {
        let mut images: Vec<&VehicleImage> = self.images.as_deref().unwrap_or_default().iter().collect();
        images.sort_by_key(|image| (!image.is_primary, image.order_index));
        images
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pagination {
    pub current_page: u32,
    pub last_page: u32,
    pub per_page: u32,
    pub total: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
}

// Envelope shared by every endpoint: {success, data, message}
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

// Collection endpoints add a pagination block. No serde(default) on data:
// that would put a T: Default bound on the derive, and the element types
// have no Default.
#[derive(Debug, Deserialize)]
pub struct PaginatedEnvelope<T> {
    #[serde(default)]
    pub success: bool,
    pub data: Vec<T>,
    pub pagination: Option<Pagination>,
    pub message: Option<String>,
}

// --- Auth payloads ---

#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

// Login/register responses carry the bearer token the session persists.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthPayload {
    pub user: User,
    pub token: String,
    pub token_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FavoriteCheck {
    #[serde(default)]
    pub is_favorite: bool,
}

// --- Browser-side forms ---

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paginated_envelope_decodes_without_default_on_elements() {
        let body = serde_json::json!({
            "success": true,
            "data": [{
                "id": 1,
                "brand": "BMW",
                "model": "320d",
                "year": 2021,
                "mileage": 45000,
                "price": 28500.0,
                "color": null,
                "fuel_type": "diesel",
                "transmission": "automatic",
                "description": null,
                "stand": null,
                "images": null
            }],
            "pagination": {"current_page": 1, "last_page": 3, "per_page": 12, "total": 30},
            "message": "OK"
        });
        let envelope: PaginatedEnvelope<Vehicle> = serde_json::from_value(body).unwrap();
        assert!(envelope.success);
        assert_eq!(envelope.data.len(), 1);
        assert_eq!(envelope.pagination.unwrap().total, 30);
    }

    #[test]
    fn primary_image_prefers_the_flag_then_the_lowest_order() {
        let image = |id: i64, is_primary: bool, order_index: i32| VehicleImage {
            id,
            url: format!("https://cdn.example/{}.jpg", id),
            alt_text: None,
            is_primary,
            order_index,
        };
        let mut vehicle = Vehicle {
            id: 1,
            brand: "BMW".to_owned(),
            model: "320d".to_owned(),
            year: 2021,
            mileage: 45000,
            price: 28500.0,
            color: None,
            fuel_type: None,
            transmission: None,
            is_featured: false,
            description: None,
            stand: None,
            images: Some(vec![image(10, false, 2), image(11, true, 5), image(12, false, 1)]),
        };
        assert_eq!(vehicle.primary_image().unwrap().id, 11);

        vehicle.images = Some(vec![image(10, false, 2), image(12, false, 1)]);
        assert_eq!(vehicle.primary_image().unwrap().id, 12);
    }
}
