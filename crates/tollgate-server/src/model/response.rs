//! HTTP response types for the Tollgate server
//!
//! Every endpoint answers with the `{code, message, data}` envelope.

use actix_web::{HttpResponse, HttpResponseBuilder, http::StatusCode};
use serde::{Deserialize, Serialize};

use tollgate_common::TollgateError;

/// Generic result wrapper for API responses
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Result<T> {
    pub code: i32,
    pub message: String,
    pub data: T,
}

impl<T> Result<T> {
    pub fn new(code: i32, message: String, data: T) -> Self {
        Result::<T> {
            code,
            message,
            data,
        }
    }

    pub fn success(data: T) -> Result<T> {
        Result::<T> {
            code: 0,
            message: "success".to_string(),
            data,
        }
    }

    pub fn http_success(data: impl Serialize) -> HttpResponse {
        HttpResponse::Ok().json(Result::success(data))
    }

    pub fn http_response(
        status: u16,
        code: i32,
        message: String,
        data: impl Serialize,
    ) -> HttpResponse {
        HttpResponseBuilder::new(
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        )
        .json(Result::new(code, message, data))
    }
}

/// Envelope for a failed review operation.
///
/// Lock conflicts carry the locked tables as data; other errors carry none.
pub fn error_response(error: &TollgateError) -> HttpResponse {
    let code = error.error_code();
    if error.is_user_facing() {
        tracing::debug!(code = code.code, "{}", error);
    } else {
        tracing::error!(code = code.code, "{}", error);
    }

    let data = match error {
        TollgateError::TableLocked(tables) => serde_json::json!(tables),
        _ => serde_json::Value::Null,
    };
    Result::<serde_json::Value>::http_response(
        error.http_status(),
        code.code,
        error.to_string(),
        data,
    )
}

/// Envelope for the outcome of a review operation
pub fn respond<T: Serialize>(result: std::result::Result<T, TollgateError>) -> HttpResponse {
    match result {
        Ok(data) => Result::<T>::http_success(data),
        Err(e) => error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    async fn body_json(response: HttpResponse) -> serde_json::Value {
        let bytes = to_bytes(response.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[actix_rt::test]
    async fn test_success_envelope() {
        let response = respond(Ok(vec![1, 2]));
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["code"], 0);
        assert_eq!(body["message"], "success");
        assert_eq!(body["data"], serde_json::json!([1, 2]));
    }

    #[actix_rt::test]
    async fn test_table_locked_envelope() {
        let response = error_response(&TollgateError::TableLocked(vec!["t1".to_string()]));
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = body_json(response).await;
        assert_eq!(body["code"], 30001);
        assert_eq!(body["data"], serde_json::json!(["t1"]));
    }

    #[actix_rt::test]
    async fn test_no_changes_is_informational() {
        let response = error_response(&TollgateError::NoChanges);
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["code"], 30002);
        assert_eq!(body["message"], "no changes detected");
        assert!(body["data"].is_null());
    }

    #[actix_rt::test]
    async fn test_persistence_error_is_server_error() {
        let response = error_response(&TollgateError::Persistence(anyhow::anyhow!("down")));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["code"], 10002);
    }
}
