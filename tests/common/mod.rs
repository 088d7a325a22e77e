#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use medbook::auth::{Claims, MemoryTokenStorage, TokenStorage};
use medbook::config::ClientOptions;
use medbook::MedBook;
use serde_json::{json, Value};
use wiremock::matchers::{bearer_token, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Sign a token the way the backend would; the client never sees the secret.
pub fn mint(sub: &str, exp: i64) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        exp,
        iat: Some(Utc::now().timestamp()),
        role: None,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"backend-only-secret"),
    )
    .unwrap()
}

pub fn fresh_token(sub: &str) -> String {
    mint(sub, Utc::now().timestamp() + 3600)
}

pub fn patient(id: i64) -> Value {
    json!({
        "id": id,
        "username": format!("patient{}", id),
        "email": format!("patient{}@example.com", id),
        "firstName": "Pat",
        "lastName": "Ient",
        "role": "ROLE_PATIENT"
    })
}

pub fn doctor(id: i64) -> Value {
    json!({
        "id": id,
        "username": format!("doctor{}", id),
        "firstName": "Doc",
        "lastName": "Tor",
        "role": "ROLE_DOCTOR",
        "doctorDetails": { "doctorId": id, "doctorSpecialization": "Cardiology" }
    })
}

pub fn admin(id: i64) -> Value {
    json!({ "id": id, "username": "admin", "role": "ROLE_ADMIN" })
}

pub fn appointment(id: i64, doctor_id: i64, patient_id: i64, status: &str) -> Value {
    json!({
        "id": id,
        "doctorId": doctor_id,
        "patientId": patient_id,
        "startTime": "2024-06-03T09:20:00",
        "endTime": "2024-06-03T09:40:00",
        "reason": "Annual checkup",
        "status": status
    })
}

pub fn client(server: &MockServer, storage: Arc<MemoryTokenStorage>) -> MedBook {
    client_with_options(server, storage, ClientOptions::default())
}

pub fn client_with_options(
    server: &MockServer,
    storage: Arc<MemoryTokenStorage>,
    options: ClientOptions,
) -> MedBook {
    let storage: Arc<dyn TokenStorage> = storage;
    MedBook::with_storage(&server.uri(), options, storage).unwrap()
}

/// Answer `GET /user/me` for `token` with `identity`.
pub async fn mount_identity(server: &MockServer, token: &str, identity: &Value) {
    Mock::given(method("GET"))
        .and(path("/user/me"))
        .and(bearer_token(token))
        .respond_with(ResponseTemplate::new(200).set_body_json(identity))
        .mount(server)
        .await;
}

/// A client whose session was restored from storage as `identity`.
pub async fn signed_in(server: &MockServer, identity: Value) -> (MedBook, Arc<MemoryTokenStorage>, String) {
    let username = identity["username"].as_str().unwrap_or("user").to_string();
    let token = fresh_token(&username);
    mount_identity(server, &token, &identity).await;

    let storage = Arc::new(MemoryTokenStorage::with_token(&token));
    let client = client(server, storage.clone());
    assert!(client.session().start().await.is_authenticated());
    (client, storage, token)
}
