use feast_shared::{
    auth::Claims,
    error::ApiError,
    events, users, AppState,
};
use lambda_http::{
    http::{Method, StatusCode},
    Body, Error, Request, Response,
};
use serde_json::Value;
use std::sync::Arc;

/// Roles allowed to mutate events and read individual stocks.
const ORGANIZER_ROLES: &[&str] = &["Orga", "Admin"];

/// Main Lambda handler - routes requests and maps every error onto the
/// JSON error envelope. Callers always get a JSON body, never a bare
/// transport failure.
pub(crate) async fn function_handler(
    event: Request,
    state: Arc<AppState>,
) -> Result<Response<Body>, Error> {
    let method = event.method().clone();
    let path = event.uri().path().to_string();
    tracing::info!("API request - Method: {} Path: {}", method, path);

    // Handle CORS preflight
    if method == Method::OPTIONS {
        return Ok(Response::builder()
            .status(StatusCode::OK)
            .header("Access-Control-Allow-Origin", "*")
            .header("Access-Control-Allow-Methods", "GET,POST,PUT,DELETE,OPTIONS")
            .header("Access-Control-Allow-Headers", "Content-Type,Authorization")
            .body(Body::Empty)
            .map_err(Box::new)?);
    }

    match route(&event, &state).await {
        Ok(value) => json_response(StatusCode::OK, &value),
        Err(err) => {
            tracing::error!(
                "Request failed - Method: {} Path: {} Error: {}",
                method,
                path,
                err
            );
            err.into_response()
        }
    }
}

async fn route(event: &Request, state: &AppState) -> Result<Value, ApiError> {
    let method = event.method();
    let body = event.body();
    let auth_header = event
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok());

    let path = event.uri().path();
    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    match (method, parts.as_slice()) {
        // --- EVENTS ---
        // POST /events/sign-up-to-event - join an event's participants
        (&Method::POST, ["events", "sign-up-to-event"]) => {
            let claims = state.verifier.verify(auth_header)?;
            events::sign_up(
                &state.dynamo_client,
                &state.events.table_name,
                &claims.sub,
                body,
            )
            .await
        }
        // POST /events/sign-out-from-event - leave an event's participants
        (&Method::POST, ["events", "sign-out-from-event"]) => {
            let claims = state.verifier.verify(auth_header)?;
            events::sign_out(
                &state.dynamo_client,
                &state.events.table_name,
                &claims.sub,
                body,
            )
            .await
        }
        // GET /events/{id} - anyone may read a single event
        (&Method::GET, ["events", event_id]) => {
            state.events.get(&state.dynamo_client, event_id).await
        }
        // GET/POST/PUT/DELETE /events - list is public, mutations are
        // reserved to organizers
        (_, ["events"]) => {
            if matches!(method, &Method::POST | &Method::PUT | &Method::DELETE) {
                require_organizer(state, auth_header)?;
            }
            state.events.dispatch(&state.dynamo_client, method, body).await
        }

        // --- STOCKS ---
        // GET /stocks/{id} - organizers only
        (&Method::GET, ["stocks", stock_id]) => {
            require_organizer(state, auth_header)?;
            state.stocks.get(&state.dynamo_client, stock_id).await
        }
        (_, ["stocks"]) => state.stocks.dispatch(&state.dynamo_client, method, body).await,

        // --- USERS ---
        // PUT /users - a user may change their own email, nobody else's
        (&Method::PUT, ["users"]) => {
            let claims = state.verifier.verify(auth_header)?;
            users::update_email(
                &state.dynamo_client,
                &state.users.table_name,
                &claims,
                body,
            )
            .await
        }
        (&Method::GET, ["users", user_id]) => {
            state.users.get(&state.dynamo_client, user_id).await
        }
        (_, ["users"]) => state.users.dispatch(&state.dynamo_client, method, body).await,

        _ => Err(ApiError::NotFound("Not found".to_string())),
    }
}

fn require_organizer(state: &AppState, auth_header: Option<&str>) -> Result<Claims, ApiError> {
    let claims = state.verifier.verify(auth_header)?;
    if !claims.has_any_role(ORGANIZER_ROLES) {
        return Err(ApiError::access_denied());
    }
    Ok(claims)
}

fn json_response(status: StatusCode, value: &Value) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(value)?.into())
        .map_err(Box::new)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_dynamodb::config::BehaviorVersion;
    use aws_sdk_dynamodb::Client as DynamoClient;
    use feast_shared::auth::TokenVerifier;
    use serde_json::json;

    const TEST_ISSUER: &str = "https://cognito-idp.eu-west-3.amazonaws.com/eu-west-3_testpool";

    // Any structurally valid RSA JWKS will do here; these tests never
    // present a token that verifies against it.
    const TEST_KEY_N: &str = "zQMQmo3OtVCTVZVVzhihHVok5lrRQPgpADMQBrpj7CKNsj3kkZUJtns8eZRp85ux-NV-g8b489UQIGBBGPQ3iUsNNz3RnJsJ84NE2DIiZi-l8tOMh7FxdSMDVL3_FocxdRHGe42EFPyh3B4N8_ZuDwrWCNvuOZKssA3m3a2USnBXM0_BKU8Kf9oIIt6DmD775GjKQ6vaEDGyOux985-fRrROVqsRMBJ41ATek2Z2T88nrcyhsCj-hbIe8EyAyyYO-AacUClYGHNt21SuQT5ydT2OWNA6-mkY-RtwMZfK6Ga7-v7MjNeX_3oeZfCTYOLMLrcTNECLsvXi1rVYbI6vxQ";

    fn test_state() -> Arc<AppState> {
        let jwks = json!({
            "keys": [{
                "kid": "test-key-1",
                "kty": "RSA",
                "n": TEST_KEY_N,
                "e": "AQAB",
            }]
        })
        .to_string();

        let client = DynamoClient::from_conf(
            aws_sdk_dynamodb::Config::builder()
                .behavior_version(BehaviorVersion::latest())
                .build(),
        );

        AppState::new(
            client,
            TokenVerifier::from_jwks(&jwks, TEST_ISSUER).unwrap(),
            "cy-feast-events".to_string(),
            "cy-feast-stocks".to_string(),
            "cy-feast-users".to_string(),
        )
    }

    fn request(method: Method, path: &str) -> Request {
        let mut request = Request::default();
        *request.method_mut() = method;
        *request.uri_mut() = format!("https://api.example.com{}", path).parse().unwrap();
        request
    }

    fn error_of(response: &Response<Body>) -> String {
        let body: Value = serde_json::from_slice(&response.body().to_vec()).unwrap();
        body["error"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn preflight_is_always_ok() {
        let response = function_handler(request(Method::OPTIONS, "/events"), test_state())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let response = function_handler(request(Method::GET, "/nowhere"), test_state())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(error_of(&response), "Not found");
    }

    #[tokio::test]
    async fn event_mutations_require_a_credential() {
        for method in [Method::POST, Method::PUT, Method::DELETE] {
            let response = function_handler(request(method, "/events"), test_state())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn stock_by_id_rejects_an_unverifiable_credential() {
        let mut req = request(Method::GET, "/stocks/S1");
        req.headers_mut()
            .insert("Authorization", "Bearer not-a-jwt".parse().unwrap());

        let response = function_handler(req, test_state()).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(error_of(&response), "Access denied.");
    }

    #[tokio::test]
    async fn user_email_update_requires_a_credential() {
        let response = function_handler(request(Method::PUT, "/users"), test_state())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn membership_routes_require_a_credential() {
        for path in ["/events/sign-up-to-event", "/events/sign-out-from-event"] {
            let response = function_handler(request(Method::POST, path), test_state())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }
}
