//! JSON-RPC 2.0 message shapes and validation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use vso_core::error::jsonrpc_codes;

/// A JSON-RPC error object, as it appears under `error` in a response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcErrorObj {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcErrorObj {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn parse_error() -> Self {
        Self::new(jsonrpc_codes::PARSE_ERROR, "Parse error")
    }

    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::new(jsonrpc_codes::INVALID_REQUEST, reason.into())
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            jsonrpc_codes::METHOD_NOT_FOUND,
            format!("Method not found: {method}"),
        )
    }
}

/// One fully-validated JSON-RPC message.
#[derive(Debug, Clone)]
pub enum ParsedMessage {
    Request {
        id: Value,
        method: String,
        params: Option<Value>,
    },
    Response {
        id: Value,
        result: Option<Value>,
        error: Option<RpcErrorObj>,
    },
    Notification {
        method: String,
        params: Option<Value>,
    },
}

/// A per-element validation failure within a (possibly batched) payload.
/// `id` is `None` when the offending value had no usable id to echo back.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub id: Option<Value>,
    pub error: RpcErrorObj,
}

/// Parse a raw line into one or more validated messages.
///
/// Malformed JSON and an empty batch are terminal (top-level) failures.
/// Everything else is validated per-element: a batch mixing valid and
/// invalid entries returns `Ok` with per-element `Result`s, unwrapping and
/// processing each element independently.
pub fn parse_and_validate(raw: &str) -> Result<Vec<Result<ParsedMessage, ValidationError>>, RpcErrorObj> {
    let value: Value = serde_json::from_str(raw).map_err(|_| RpcErrorObj::parse_error())?;

    match value {
        Value::Array(items) => {
            if items.is_empty() {
                return Err(RpcErrorObj::invalid_request("empty batch"));
            }
            Ok(items.iter().map(validate_single).collect())
        }
        single => Ok(vec![validate_single(&single)]),
    }
}

fn validate_single(value: &Value) -> Result<ParsedMessage, ValidationError> {
    let Some(obj) = value.as_object() else {
        return Err(ValidationError {
            id: None,
            error: RpcErrorObj::invalid_request("message must be a JSON object"),
        });
    };

    let id = obj.get("id").cloned();

    match obj.get("jsonrpc").and_then(Value::as_str) {
        Some("2.0") => {}
        _ => {
            return Err(ValidationError {
                id: valid_id_or_none(id.as_ref()),
                error: RpcErrorObj::invalid_request("jsonrpc must be \"2.0\""),
            });
        }
    }

    if let Some(id_value) = &id {
        if !is_valid_id(id_value) {
            return Err(ValidationError {
                id: None,
                error: RpcErrorObj::invalid_request(
                    "id must be a string, a number, or null",
                ),
            });
        }
    }

    if let Some(params) = obj.get("params") {
        if !params.is_object() && !params.is_array() {
            return Err(ValidationError {
                id: valid_id_or_none(id.as_ref()),
                error: RpcErrorObj::invalid_request("params must be an object or an array"),
            });
        }
    }

    let method = obj.get("method").and_then(Value::as_str);

    if let Some(method) = method {
        if method.is_empty() {
            return Err(ValidationError {
                id: valid_id_or_none(id.as_ref()),
                error: RpcErrorObj::invalid_request("method must be a non-empty string"),
            });
        }
        let params = obj.get("params").cloned();
        return Ok(match id {
            Some(id) if !id.is_null() => ParsedMessage::Request {
                id,
                method: method.to_string(),
                params,
            },
            _ => ParsedMessage::Notification {
                method: method.to_string(),
                params,
            },
        });
    }

    // No method: must be a response (result xor error, plus an id).
    let Some(id) = id else {
        return Err(ValidationError {
            id: None,
            error: RpcErrorObj::invalid_request("response is missing id"),
        });
    };

    let result = obj.get("result").cloned();
    let error = obj
        .get("error")
        .and_then(|e| serde_json::from_value::<RpcErrorObj>(e.clone()).ok());

    if result.is_none() && error.is_none() {
        return Err(ValidationError {
            id: Some(id),
            error: RpcErrorObj::invalid_request("response has neither result nor error"),
        });
    }

    Ok(ParsedMessage::Response { id, result, error })
}

fn is_valid_id(id: &Value) -> bool {
    id.is_string() || id.is_number() || id.is_null()
}

fn valid_id_or_none(id: Option<&Value>) -> Option<Value> {
    id.filter(|v| is_valid_id(v)).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn valid_request_parses() {
        let raw = json!({"jsonrpc":"2.0","id":1,"method":"tools/list"}).to_string();
        let parsed = parse_and_validate(&raw).unwrap();
        assert_eq!(parsed.len(), 1);
        assert!(matches!(parsed[0], Ok(ParsedMessage::Request { .. })));
    }

    #[test]
    fn notification_has_no_id() {
        let raw = json!({"jsonrpc":"2.0","method":"notifications/cancelled"}).to_string();
        let parsed = parse_and_validate(&raw).unwrap();
        assert!(matches!(parsed[0], Ok(ParsedMessage::Notification { .. })));
    }

    #[test]
    fn null_id_request_becomes_notification() {
        let raw = json!({"jsonrpc":"2.0","id":null,"method":"ping"}).to_string();
        let parsed = parse_and_validate(&raw).unwrap();
        assert!(matches!(parsed[0], Ok(ParsedMessage::Notification { .. })));
    }

    #[test]
    fn wrong_jsonrpc_version_is_invalid_request() {
        let raw = json!({"jsonrpc":"1.0","id":1,"method":"x"}).to_string();
        let parsed = parse_and_validate(&raw).unwrap();
        let err = parsed[0].as_ref().unwrap_err();
        assert_eq!(err.error.code, jsonrpc_codes::INVALID_REQUEST);
    }

    #[test]
    fn empty_method_is_invalid_request() {
        let raw = json!({"jsonrpc":"2.0","id":1,"method":""}).to_string();
        let parsed = parse_and_validate(&raw).unwrap();
        assert_eq!(
            parsed[0].as_ref().unwrap_err().error.code,
            jsonrpc_codes::INVALID_REQUEST
        );
    }

    #[test]
    fn scalar_params_is_invalid_request() {
        let raw = json!({"jsonrpc":"2.0","id":1,"method":"x","params":"oops"}).to_string();
        let parsed = parse_and_validate(&raw).unwrap();
        assert_eq!(
            parsed[0].as_ref().unwrap_err().error.code,
            jsonrpc_codes::INVALID_REQUEST
        );
    }

    #[test]
    fn array_params_are_allowed() {
        let raw = json!({"jsonrpc":"2.0","id":1,"method":"x","params":[1,2]}).to_string();
        let parsed = parse_and_validate(&raw).unwrap();
        assert!(matches!(parsed[0], Ok(ParsedMessage::Request { .. })));
    }

    #[test]
    fn empty_batch_is_invalid_request() {
        let raw = "[]";
        let err = parse_and_validate(raw).unwrap_err();
        assert_eq!(err.code, jsonrpc_codes::INVALID_REQUEST);
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = parse_and_validate("not json").unwrap_err();
        assert_eq!(err.code, jsonrpc_codes::PARSE_ERROR);
    }

    #[test]
    fn batch_mixes_valid_and_invalid() {
        let raw = json!([
            {"jsonrpc":"2.0","id":1,"method":"ok"},
            {"jsonrpc":"1.0","id":2,"method":"bad"}
        ])
        .to_string();
        let parsed = parse_and_validate(&raw).unwrap();
        assert_eq!(parsed.len(), 2);
        assert!(parsed[0].is_ok());
        assert!(parsed[1].is_err());
    }

    #[test]
    fn success_response_parses() {
        let raw = json!({"jsonrpc":"2.0","id":1,"result":{"ok":true}}).to_string();
        let parsed = parse_and_validate(&raw).unwrap();
        match &parsed[0] {
            Ok(ParsedMessage::Response { result, error, .. }) => {
                assert!(result.is_some());
                assert!(error.is_none());
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn error_response_parses() {
        let raw = json!({
            "jsonrpc":"2.0","id":1,
            "error":{"code":-32601,"message":"nope"}
        })
        .to_string();
        let parsed = parse_and_validate(&raw).unwrap();
        match &parsed[0] {
            Ok(ParsedMessage::Response { error: Some(e), .. }) => {
                assert_eq!(e.code, -32601);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn response_without_result_or_error_is_invalid() {
        let raw = json!({"jsonrpc":"2.0","id":1}).to_string();
        let parsed = parse_and_validate(&raw).unwrap();
        assert!(parsed[0].is_err());
    }

    #[test]
    fn non_object_message_is_invalid_request() {
        let raw = "42";
        let parsed = parse_and_validate(raw).unwrap();
        assert!(parsed[0].is_err());
    }

    #[test]
    fn object_id_is_rejected() {
        let raw = json!({"jsonrpc":"2.0","id":{"nested":true},"method":"x"}).to_string();
        let parsed = parse_and_validate(&raw).unwrap();
        assert!(parsed[0].is_err());
    }
}
