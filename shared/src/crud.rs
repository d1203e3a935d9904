use aws_sdk_dynamodb::{types::AttributeValue, Client as DynamoClient};
use lambda_http::http::Method;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

use crate::error::{store_error, ApiError};
use crate::item;

/// One record collection: a table addressed by a single partition key,
/// served by the generic method -> store-operation dispatcher.
///
/// `patchable` is the closed set of attributes the generic PUT may target.
/// Fields outside it never reach the store, which is also what keeps
/// `participants` writable only through the membership operations.
pub struct Collection {
    pub table_name: String,
    pub key_attr: &'static str,
    pub label: &'static str,
    pub patchable: &'static [&'static str],
}

/// A server-built `SET` expression with its name and value bindings.
#[derive(Debug)]
pub struct SetExpression {
    pub expression: String,
    pub names: HashMap<String, String>,
    pub values: HashMap<String, AttributeValue>,
}

/// Build `SET #f0 = :v0, ...` for the requested fields, refusing anything
/// outside the whitelist. Attribute names always go through `#` aliases so
/// reserved words like `name` cannot break the expression.
pub fn build_set_expression(
    set: &Map<String, Value>,
    patchable: &[&str],
) -> Result<SetExpression, ApiError> {
    if set.is_empty() {
        return Err(ApiError::BadRequest(
            "Update must name at least one attribute".to_string(),
        ));
    }

    let mut clauses = Vec::new();
    let mut names = HashMap::new();
    let mut values = HashMap::new();

    for (i, (field, value)) in set.iter().enumerate() {
        if !patchable.contains(&field.as_str()) {
            return Err(ApiError::BadRequest(format!(
                "Attribute \"{}\" is not updatable",
                field
            )));
        }
        let name_alias = format!("#f{}", i);
        let value_alias = format!(":v{}", i);
        clauses.push(format!("{} = {}", name_alias, value_alias));
        names.insert(name_alias, field.clone());
        values.insert(value_alias, item::to_attribute_value(value));
    }

    Ok(SetExpression {
        expression: format!("SET {}", clauses.join(", ")),
        names,
        values,
    })
}

impl Collection {
    pub fn new(
        table_name: String,
        key_attr: &'static str,
        label: &'static str,
        patchable: &'static [&'static str],
    ) -> Self {
        Self {
            table_name,
            key_attr,
            label,
            patchable,
        }
    }

    /// Route one HTTP method to its store operation.
    pub async fn dispatch(
        &self,
        client: &DynamoClient,
        method: &Method,
        body: &[u8],
    ) -> Result<Value, ApiError> {
        match method {
            &Method::GET => self.scan(client).await,
            &Method::POST => self.put(client, body).await,
            &Method::DELETE => self.delete(client, body).await,
            &Method::PUT => self.update(client, body).await,
            _ => Err(ApiError::UnsupportedOperation(method.to_string())),
        }
    }

    /// Full scan, following pagination until the table is exhausted.
    pub async fn scan(&self, client: &DynamoClient) -> Result<Value, ApiError> {
        let mut records = Vec::new();
        let mut start_key: Option<HashMap<String, AttributeValue>> = None;

        loop {
            let result = client
                .scan()
                .table_name(&self.table_name)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(store_error)?;

            records.extend(result.items().iter().map(item::item_to_json));

            match result.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        Ok(Value::Array(records))
    }

    pub async fn get(&self, client: &DynamoClient, id: &str) -> Result<Value, ApiError> {
        let result = client
            .get_item()
            .table_name(&self.table_name)
            .key(self.key_attr, AttributeValue::S(id.to_string()))
            .send()
            .await
            .map_err(store_error)?;

        match result.item() {
            Some(record) => Ok(item::item_to_json(record)),
            None => Err(ApiError::NotFound(format!("{} not found", self.label))),
        }
    }

    /// Whole-record put; an existing record under the same key is
    /// overwritten, not merged.
    pub async fn put(&self, client: &DynamoClient, body: &[u8]) -> Result<Value, ApiError> {
        let record: Value = serde_json::from_slice(body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))?;
        let item = item::json_to_item(&record)?;

        if !item.contains_key(self.key_attr) {
            return Err(ApiError::BadRequest(format!("Missing {}", self.key_attr)));
        }

        client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .send()
            .await
            .map_err(store_error)?;

        Ok(record)
    }

    pub async fn delete(&self, client: &DynamoClient, body: &[u8]) -> Result<Value, ApiError> {
        let id = self.key_from_body(body)?;

        client
            .delete_item()
            .table_name(&self.table_name)
            .key(self.key_attr, AttributeValue::S(id.clone()))
            .send()
            .await
            .map_err(store_error)?;

        Ok(json!({"deleted": id}))
    }

    /// Partial update of an existing record: body is
    /// `{"<key-attr>": id, "set": {field: value, ...}}`. The record must
    /// already exist and every field must be in the collection whitelist.
    pub async fn update(&self, client: &DynamoClient, body: &[u8]) -> Result<Value, ApiError> {
        let (id, set) = self.parse_update(body)?;
        let expr = build_set_expression(&set, self.patchable)?;

        let mut request = client
            .update_item()
            .table_name(&self.table_name)
            .key(self.key_attr, AttributeValue::S(id.clone()))
            .update_expression(expr.expression)
            .condition_expression("attribute_exists(#key)")
            .expression_attribute_names("#key", self.key_attr);

        for (alias, name) in expr.names {
            request = request.expression_attribute_names(alias, name);
        }
        for (alias, value) in expr.values {
            request = request.expression_attribute_values(alias, value);
        }

        match request.send().await {
            Ok(_) => Ok(json!({"updated": id})),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception()) =>
            {
                Err(ApiError::NotFound(format!("{} not found", self.label)))
            }
            Err(err) => Err(store_error(err)),
        }
    }

    fn key_from_body(&self, body: &[u8]) -> Result<String, ApiError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))?;
        value
            .get(self.key_attr)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest(format!("Missing {}", self.key_attr)))
    }

    fn parse_update(&self, body: &[u8]) -> Result<(String, Map<String, Value>), ApiError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))?;
        let id = value
            .get(self.key_attr)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest(format!("Missing {}", self.key_attr)))?;
        let set = value
            .get("set")
            .and_then(Value::as_object)
            .cloned()
            .ok_or_else(|| ApiError::BadRequest("Missing set".to_string()))?;
        Ok((id, set))
    }
}
