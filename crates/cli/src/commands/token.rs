//! Bearer token minting for local testing.
//!
//! # Usage
//!
//! ```bash
//! export TOKEN=$(tindahan-cli token -u 1 -e buyer@example.ph)
//! curl -H "Authorization: Bearer $TOKEN" localhost:3000/orders
//! ```

use chrono::Duration;

use tindahan_api::config::jwt_secret_from_env;
use tindahan_api::services::auth::{Claims, issue_token};
use tindahan_core::UserId;

/// Print a token for `user_id` that expires in `hours`.
///
/// # Errors
///
/// Returns an error if `API_JWT_SECRET` is missing or weak, or signing fails.
pub fn mint(user_id: i32, email: &str, hours: i64) -> Result<(), Box<dyn std::error::Error>> {
    if hours <= 0 {
        return Err("token lifetime must be positive".into());
    }

    let secret = jwt_secret_from_env()?;
    let claims = Claims::new(UserId::new(user_id), email, Duration::hours(hours));
    let token = issue_token(&secret, &claims)?;

    tracing::info!(user_id, hours, "Token minted");

    #[allow(clippy::print_stdout)]
    {
        println!("{token}");
    }

    Ok(())
}
