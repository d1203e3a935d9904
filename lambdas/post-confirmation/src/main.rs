use aws_lambda_events::event::cognito::CognitoEventUserPoolsPostConfirmation;
use aws_sdk_dynamodb::Client as DynamoClient;
use feast_shared::users;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .without_time()
        .init();

    run(service_fn(function_handler)).await
}

/// Cognito PostConfirmation trigger: mirror the confirmed user into the
/// users table. The event is always handed back to Cognito unchanged; a
/// store failure must not block the signup.
async fn function_handler(
    event: LambdaEvent<CognitoEventUserPoolsPostConfirmation>,
) -> Result<CognitoEventUserPoolsPostConfirmation, Error> {
    let payload = event.payload;

    let config = aws_config::load_from_env().await;
    let dynamo_client = DynamoClient::new(&config);
    let table_name =
        std::env::var("USERS_TABLE").unwrap_or_else(|_| "cy-feast-users".to_string());

    let user_name = payload.cognito_event_user_pools_header.user_name.clone();
    let email = payload.request.user_attributes.get("email").cloned();

    match (user_name, email) {
        (Some(user_id), Some(email)) => {
            match users::create_user_record(&dynamo_client, &table_name, &user_id, &email).await {
                Ok(()) => tracing::info!("User {} added to users table", user_id),
                Err(e) => tracing::error!("Failed to add user {} to users table: {}", user_id, e),
            }
        }
        _ => tracing::warn!("Post-confirmation event carries no user name or email"),
    }

    Ok(payload)
}
