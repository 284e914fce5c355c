use actix_web::{http::StatusCode, HttpResponse};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::Result;

/// Build the `{status, code}` envelope, with `payload` under `key`
pub fn envelope<T: Serialize>(code: StatusCode, key: &str, payload: &T) -> Result<Value> {
    let mut body = Map::new();
    body.insert("status".to_string(), Value::from("success"));
    body.insert("code".to_string(), Value::from(code.as_u16()));
    body.insert(key.to_string(), serde_json::to_value(payload)?);
    Ok(Value::Object(body))
}

/// Success response with the payload under `key`
pub fn success<T: Serialize>(code: StatusCode, key: &str, payload: &T) -> Result<HttpResponse> {
    Ok(HttpResponse::build(code).json(envelope(code, key, payload)?))
}

/// 200 with the payload under `data`
pub fn ok_data<T: Serialize>(payload: &T) -> Result<HttpResponse> {
    success(StatusCode::OK, "data", payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_places_payload_under_key() {
        let body = envelope(StatusCode::CREATED, "user", &serde_json::json!({"email": "a@x.com"})).unwrap();
        assert_eq!(body["status"], "success");
        assert_eq!(body["code"], 201);
        assert_eq!(body["user"]["email"], "a@x.com");
    }
}
