pub mod auth;
pub mod crud;
pub mod error;
pub mod events;
pub mod item;
pub mod types;
pub mod users;

use aws_sdk_dynamodb::Client as DynamoClient;
use std::sync::Arc;

use crate::auth::TokenVerifier;
use crate::crud::Collection;

/// Attributes the generic PUT may target, per collection. `participants`
/// is deliberately absent everywhere: only the membership operations
/// touch it.
pub const EVENT_PATCHABLE: &[&str] = &["name", "description", "date", "location", "capacity"];
pub const STOCK_PATCHABLE: &[&str] = &["name", "description", "quantity", "unit"];
pub const USER_PATCHABLE: &[&str] = &["email"];

pub const STOCK_KEY: &str = "stock-id";

/// Shared application state
pub struct AppState {
    pub dynamo_client: DynamoClient,
    pub verifier: TokenVerifier,
    pub events: Collection,
    pub stocks: Collection,
    pub users: Collection,
}

impl AppState {
    pub fn new(
        dynamo_client: DynamoClient,
        verifier: TokenVerifier,
        events_table: String,
        stocks_table: String,
        users_table: String,
    ) -> Arc<Self> {
        Arc::new(Self {
            dynamo_client,
            verifier,
            events: Collection::new(events_table, events::EVENT_KEY, "Event", EVENT_PATCHABLE),
            stocks: Collection::new(stocks_table, STOCK_KEY, "Stock", STOCK_PATCHABLE),
            users: Collection::new(users_table, users::USER_KEY, "User", USER_PATCHABLE),
        })
    }
}
