use aws_sdk_dynamodb::Client as DynamoClient;
use feast_shared::{auth::TokenVerifier, AppState};
use lambda_http::{run, service_fn, tracing, Error, Request};
use std::env;
use std::sync::Arc;

mod http_handler;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::init_default_subscriber();

    // Initialize AWS clients and the token verifier once at startup
    let config = aws_config::load_from_env().await;

    let jwks = env::var("COGNITO_JWKS").expect("COGNITO_JWKS must be set");
    let issuer = env::var("COGNITO_ISSUER").expect("COGNITO_ISSUER must be set");
    let verifier = TokenVerifier::from_jwks(&jwks, &issuer)?;

    let state = AppState::new(
        DynamoClient::new(&config),
        verifier,
        env::var("EVENTS_TABLE").unwrap_or_else(|_| "cy-feast-events".to_string()),
        env::var("STOCKS_TABLE").unwrap_or_else(|_| "cy-feast-stocks".to_string()),
        env::var("USERS_TABLE").unwrap_or_else(|_| "cy-feast-users".to_string()),
    );

    run(service_fn(move |event: Request| {
        let state = Arc::clone(&state);
        async move { http_handler::function_handler(event, state).await }
    }))
    .await
}
