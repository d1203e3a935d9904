use aws_sdk_dynamodb::{types::AttributeValue, Client as DynamoClient};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::error::{store_error, ApiError};
use crate::types::MembershipRequest;

pub const EVENT_KEY: &str = "event-id";

/// Append the caller once: create the list when absent, refuse when the
/// subject is already in it. One conditional call, so two concurrent
/// sign-ups by distinct subjects both land.
const SIGN_UP_EXPRESSION: &str =
    "SET participants = list_append(if_not_exists(participants, :empty), :user)";
const SIGN_UP_CONDITION: &str = "NOT contains(participants, :uid)";

/// How often sign-out re-reads and retries when the list moved under it.
const SIGN_OUT_ATTEMPTS: usize = 3;

/// Sign the authenticated caller up to an event.
///
/// Membership is a set: signing up twice is an idempotent success, the
/// conditional append simply does not fire the second time.
pub async fn sign_up(
    client: &DynamoClient,
    table_name: &str,
    subject: &str,
    body: &[u8],
) -> Result<Value, ApiError> {
    let event_id = parse_event_id(body)?;
    fetch_event(client, table_name, &event_id).await?;

    let outcome = client
        .update_item()
        .table_name(table_name)
        .key(EVENT_KEY, AttributeValue::S(event_id.clone()))
        .update_expression(SIGN_UP_EXPRESSION)
        .condition_expression(SIGN_UP_CONDITION)
        .expression_attribute_values(
            ":user",
            AttributeValue::L(vec![AttributeValue::S(subject.to_string())]),
        )
        .expression_attribute_values(":empty", AttributeValue::L(Vec::new()))
        .expression_attribute_values(":uid", AttributeValue::S(subject.to_string()))
        .send()
        .await;

    match outcome {
        Ok(_) => {}
        Err(err)
            if err
                .as_service_error()
                .is_some_and(|e| e.is_conditional_check_failed_exception()) =>
        {
            tracing::info!("Subject already signed up to event {}", event_id);
        }
        Err(err) => return Err(store_error(err)),
    }

    Ok(json!({"message": "Successfully signed up to event"}))
}

/// Sign the authenticated caller out of an event.
///
/// The remove targets the index where the subject was seen, but only fires
/// while that slot still holds the subject; when a concurrent mutation
/// moved the list, the conditional check fails and the snapshot is read
/// again. A subject absent from the list is a success no-op.
pub async fn sign_out(
    client: &DynamoClient,
    table_name: &str,
    subject: &str,
    body: &[u8],
) -> Result<Value, ApiError> {
    let event_id = parse_event_id(body)?;

    for attempt in 0..SIGN_OUT_ATTEMPTS {
        let event = fetch_event(client, table_name, &event_id).await?;

        let Some(index) = participant_index(&event, subject) else {
            return Ok(sign_out_ack());
        };

        let outcome = client
            .update_item()
            .table_name(table_name)
            .key(EVENT_KEY, AttributeValue::S(event_id.clone()))
            .update_expression(remove_expression(index))
            .condition_expression(remove_condition(index))
            .expression_attribute_values(":uid", AttributeValue::S(subject.to_string()))
            .send()
            .await;

        match outcome {
            Ok(_) => return Ok(sign_out_ack()),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception()) =>
            {
                tracing::warn!(
                    "participants of event {} changed concurrently (attempt {})",
                    event_id,
                    attempt + 1
                );
            }
            Err(err) => return Err(store_error(err)),
        }
    }

    Err(ApiError::Store {
        status: Some(409),
        message: format!("Conflicting updates to participants of event {}", event_id),
    })
}

fn sign_out_ack() -> Value {
    json!({"message": "Successfully unsubscribed from event"})
}

fn parse_event_id(body: &[u8]) -> Result<String, ApiError> {
    let request: MembershipRequest = if body.is_empty() {
        MembershipRequest { event_id: None }
    } else {
        serde_json::from_slice(body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))?
    };
    request
        .event_id
        .ok_or_else(|| ApiError::BadRequest("Missing eventId".to_string()))
}

async fn fetch_event(
    client: &DynamoClient,
    table_name: &str,
    event_id: &str,
) -> Result<HashMap<String, AttributeValue>, ApiError> {
    let result = client
        .get_item()
        .table_name(table_name)
        .key(EVENT_KEY, AttributeValue::S(event_id.to_string()))
        .send()
        .await
        .map_err(store_error)?;

    result
        .item
        .ok_or_else(|| ApiError::NotFound("Event not found".to_string()))
}

/// Position of the subject in the event's participants snapshot.
fn participant_index(event: &HashMap<String, AttributeValue>, subject: &str) -> Option<usize> {
    event
        .get("participants")?
        .as_l()
        .ok()?
        .iter()
        .position(|attr| attr.as_s().is_ok_and(|s| s == subject))
}

fn remove_expression(index: usize) -> String {
    format!("REMOVE participants[{}]", index)
}

fn remove_condition(index: usize) -> String {
    format!("participants[{}] = :uid", index)
}
