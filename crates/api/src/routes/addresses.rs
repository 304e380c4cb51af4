//! Shipping address route handlers.

use axum::{
    Json, Router,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    routing::get,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use tindahan_core::AddressId;

use super::{IdQuery, json_body, require_id};
use crate::db::AddressRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::address::DEFAULT_COUNTRY;
use crate::models::{Address, AddressInput};
use crate::state::AppState;

/// Build the addresses router.
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/addresses",
        get(list_addresses)
            .post(create_address)
            .put(update_address)
            .delete(delete_address),
    )
}

/// Body of `POST /addresses` and `PUT /addresses`.
#[derive(Debug, Default, Deserialize)]
pub struct AddressRequest {
    /// Only read on update; may also be given as `?id=`.
    pub id: Option<Value>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
    pub address_line_1: Option<String>,
    pub address_line_2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "deserialize_truthy")]
    pub is_default: bool,
}

/// Acknowledgement returned by `DELETE /addresses`.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: &'static str,
}

/// Loose boolean: `true`, non-zero numbers, and non-empty strings other than
/// `"false"` and `"0"` are true. Arrays and objects are true, `null` is false.
fn deserialize_truthy<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<bool, D::Error> {
    Ok(is_truthy(&Value::deserialize(deserializer)?))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "false" && s != "0",
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn trimmed(value: Option<String>) -> String {
    value.map(|s| s.trim().to_owned()).unwrap_or_default()
}

impl AddressRequest {
    /// Validate required fields and fill defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` listing every missing required field.
    pub fn into_input(self) -> Result<AddressInput> {
        let input = AddressInput {
            first_name: trimmed(self.first_name),
            last_name: trimmed(self.last_name),
            company: trimmed(self.company),
            address_line_1: trimmed(self.address_line_1),
            address_line_2: trimmed(self.address_line_2),
            city: trimmed(self.city),
            state: trimmed(self.state),
            postal_code: trimmed(self.postal_code),
            country: Some(trimmed(self.country))
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| DEFAULT_COUNTRY.to_owned()),
            phone: trimmed(self.phone),
            is_default: self.is_default,
        };

        let missing: Vec<&str> = [
            ("address_line_1", &input.address_line_1),
            ("city", &input.city),
            ("first_name", &input.first_name),
            ("last_name", &input.last_name),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(AppError::BadRequest(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        Ok(input)
    }

    /// The address id as text, from the body.
    fn body_id(&self) -> Option<String> {
        match self.id.as_ref()? {
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

/// List the caller's addresses, default first.
///
/// # Errors
///
/// Returns 500 if the database query fails.
pub async fn list_addresses(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<Vec<Address>>> {
    let addresses = AddressRepository::new(state.pool()).list(user.id).await?;
    Ok(Json(addresses))
}

/// Create an address for the caller.
///
/// # Errors
///
/// Returns 400 when a required field is missing.
pub async fn create_address(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    payload: std::result::Result<Json<AddressRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Address>)> {
    let input = json_body(payload)?.into_input()?;

    let address = AddressRepository::new(state.pool())
        .create(user.id, &input)
        .await?;

    tracing::info!(
        user_id = %user.id,
        address_id = %address.id,
        is_default = address.is_default,
        "address created"
    );

    Ok((StatusCode::CREATED, Json(address)))
}

/// Update one of the caller's addresses.
///
/// # Errors
///
/// Returns 400 without an id or required fields, 404 when the address is not
/// the caller's.
pub async fn update_address(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
    payload: std::result::Result<Json<AddressRequest>, JsonRejection>,
) -> Result<Json<Address>> {
    let request = json_body(payload)?;
    let raw_id = request.body_id().or(query.id);
    let id: AddressId = require_id(raw_id.as_deref(), "Address")?;
    let input = request.into_input()?;

    let address = AddressRepository::new(state.pool())
        .update(user.id, id, &input)
        .await?
        .ok_or_else(|| AppError::NotFound("Address not found".into()))?;

    tracing::info!(user_id = %user.id, address_id = %id, "address updated");

    Ok(Json(address))
}

/// Delete one of the caller's addresses.
///
/// # Errors
///
/// Returns 400 without `?id=`, 404 when nothing was deleted.
pub async fn delete_address(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> Result<Json<DeleteResponse>> {
    let id: AddressId = require_id(query.id.as_deref(), "Address")?;

    let deleted = AddressRepository::new(state.pool())
        .delete(user.id, id)
        .await?;
    if !deleted {
        return Err(AppError::NotFound("Address not found".into()));
    }

    tracing::info!(user_id = %user.id, address_id = %id, "address deleted");

    Ok(Json(DeleteResponse {
        success: true,
        message: "Address deleted successfully",
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::routes::test_support::{request, send};
    use serde_json::json;

    fn parse(body: Value) -> AddressRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_truthiness() {
        let truthy = [
            json!(true),
            json!(1),
            json!(-2.5),
            json!("yes"),
            json!("true"),
            json!({}),
        ];
        for truthy in truthy {
            assert!(is_truthy(&truthy), "{truthy} should be truthy");
        }

        let falsy = [
            json!(false),
            json!(0),
            json!(0.0),
            json!(""),
            json!("false"),
            json!("0"),
            Value::Null,
        ];
        for falsy in falsy {
            assert!(!is_truthy(&falsy), "{falsy} should be falsy");
        }
    }

    #[test]
    fn test_is_default_absent_is_false() {
        let request = parse(json!({"first_name": "Ana"}));
        assert!(!request.is_default);
    }

    #[test]
    fn test_into_input_fills_defaults() {
        let input = parse(json!({
            "first_name": "Ana",
            "last_name": "Reyes",
            "address_line_1": "12 Mabini St",
            "city": "Quezon City",
            "is_default": "1"
        }))
        .into_input()
        .unwrap();

        assert_eq!(input.country, "Philippines");
        assert_eq!(input.company, "");
        assert_eq!(input.phone, "");
        assert!(input.is_default);
    }

    #[test]
    fn test_into_input_lists_missing_fields() {
        let err = parse(json!({"first_name": "Ana", "city": "  "}))
            .into_input()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing required fields: address_line_1, city, last_name"
        );
    }

    #[test]
    fn test_body_id_accepts_number_or_string() {
        assert_eq!(parse(json!({"id": 7})).body_id().as_deref(), Some("7"));
        assert_eq!(parse(json!({"id": "7"})).body_id().as_deref(), Some("7"));
        assert_eq!(parse(json!({})).body_id(), None);
    }

    #[tokio::test]
    async fn test_list_requires_auth() {
        let (status, body) = send(request("GET", "/addresses", false, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({"error": "Unauthorized"}));
    }

    #[tokio::test]
    async fn test_create_rejects_missing_fields() {
        let body = json!({"first_name": "Ana"}).to_string();
        let (status, body) = send(request("POST", "/addresses", true, Some(&body))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"],
            "Missing required fields: address_line_1, city, last_name"
        );
    }

    #[tokio::test]
    async fn test_update_requires_id() {
        let body = json!({
            "first_name": "Ana",
            "last_name": "Reyes",
            "address_line_1": "12 Mabini St",
            "city": "Quezon City"
        })
        .to_string();
        let (status, body) = send(request("PUT", "/addresses", true, Some(&body))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Address ID is required");
    }

    #[tokio::test]
    async fn test_delete_requires_id() {
        let (status, body) = send(request("DELETE", "/addresses", true, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Address ID is required");
    }

    #[tokio::test]
    async fn test_delete_requires_auth() {
        let (status, _) = send(request("DELETE", "/addresses?id=3", false, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
