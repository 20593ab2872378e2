use std::sync::Arc;
use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub backend_api_url: String,
    pub search_debounce_ms: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            backend_api_url: "http://localhost:4000".to_string(),
            search_debounce_ms: 500,
        }
    }
}

impl TestConfig {
    pub fn with_backend(url: &str) -> Self {
        Self {
            backend_api_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            backend_api_url: self.backend_api_url.clone(),
            jwt_secret: self.jwt_secret.clone(),
            search_debounce_ms: self.search_debounce_ms,
            ..AppConfig::default()
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn therapist(email: &str) -> Self {
        Self::new(email, "therapist")
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({ "alg": "HS256", "typ": "JWT" });
        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());
        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }
}

/// Canned backend payloads shaped like the platform's admin endpoints.
pub struct MockBackendResponses;

impl MockBackendResponses {
    pub fn paid_appointment(id: &str, therapist_id: &str) -> serde_json::Value {
        json!({
            "_id": id,
            "status": "confirmed",
            "paymentStatus": "completed",
            "isBalance": null,
            "checkoutSessionId": format!("cs_{}", id),
            "stripeVerified": true,
            "stripeSubscriptionStatus": "none",
            "price": 100,
            "therapist": { "_id": therapist_id, "level": 1, "name": "Dr. Test" },
            "patient": { "_id": "patient-1", "name": "Test Patient", "email": "patient@example.com" },
            "date": "2024-06-01T10:00:00Z",
            "plan": "single"
        })
    }

    pub fn unpaid_appointment(id: &str) -> serde_json::Value {
        json!({
            "_id": id,
            "status": "unpaid",
            "paymentStatus": "pending",
            "isBalance": null,
            "checkoutSessionId": null,
            "price": 100
        })
    }

    pub fn appointment_page(appointments: Vec<serde_json::Value>, page: u32, limit: u32) -> serde_json::Value {
        let total = appointments.len();
        json!({
            "appointments": appointments,
            "pagination": { "total": total, "page": page, "limit": limit, "totalPages": 1 }
        })
    }

    pub fn error_response(message: &str) -> serde_json::Value {
        json!({ "message": message })
    }
}
