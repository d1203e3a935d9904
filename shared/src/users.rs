use aws_sdk_dynamodb::{types::AttributeValue, Client as DynamoClient};
use serde_json::{json, Value};

use crate::auth::Claims;
use crate::error::{store_error, ApiError};
use crate::types::UpdateUserRequest;

pub const USER_KEY: &str = "user-id";

/// Change a user's email address. Only the record's verified owner may do
/// this; there is no administrative override.
pub async fn update_email(
    client: &DynamoClient,
    table_name: &str,
    claims: &Claims,
    body: &[u8],
) -> Result<Value, ApiError> {
    let request: UpdateUserRequest = serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))?;

    if !claims.is_subject(&request.user_id) {
        return Err(ApiError::AccessDenied(
            "The cognito user does not have the correct user ID to modify this user.".to_string(),
        ));
    }

    client
        .update_item()
        .table_name(table_name)
        .key(USER_KEY, AttributeValue::S(request.user_id))
        .update_expression("SET #e = :e")
        .expression_attribute_names("#e", "email")
        .expression_attribute_values(":e", AttributeValue::S(request.email))
        .send()
        .await
        .map_err(store_error)?;

    Ok(json!({"message": "User email updated successfully."}))
}

/// Create the user record after the identity provider confirms a signup.
pub async fn create_user_record(
    client: &DynamoClient,
    table_name: &str,
    user_id: &str,
    email: &str,
) -> Result<(), ApiError> {
    let now = chrono::Utc::now().to_rfc3339();

    client
        .put_item()
        .table_name(table_name)
        .item(USER_KEY, AttributeValue::S(user_id.to_string()))
        .item("email", AttributeValue::S(email.to_string()))
        .item("created-at", AttributeValue::S(now))
        .send()
        .await
        .map_err(store_error)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_dynamodb::config::BehaviorVersion;

    fn claims_for(sub: &str) -> Claims {
        Claims {
            sub: sub.to_string(),
            groups: vec![],
            exp: 0,
            iat: 0,
            email: None,
        }
    }

    fn dummy_client() -> DynamoClient {
        DynamoClient::from_conf(
            aws_sdk_dynamodb::Config::builder()
                .behavior_version(BehaviorVersion::latest())
                .build(),
        )
    }

    #[tokio::test]
    async fn only_the_owner_may_update_the_email() {
        let result = update_email(
            &dummy_client(),
            "cy-feast-users",
            &claims_for("U2"),
            br#"{"user-id": "U1", "email": "u1@example.com"}"#,
        )
        .await;

        // Rejected before any store call is made
        assert!(matches!(result, Err(ApiError::AccessDenied(_))));
    }

    #[tokio::test]
    async fn body_must_carry_user_id_and_email() {
        let result = update_email(
            &dummy_client(),
            "cy-feast-users",
            &claims_for("U1"),
            br#"{"email": "u1@example.com"}"#,
        )
        .await;

        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }
}
