//! Stateless HTTP request builder and response parser for the tasks API.
//!
//! # Design
//! `TaskClient` holds only a `base_url` and carries no mutable state between
//! calls. Each operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`.
//! The caller executes the actual HTTP round-trip, keeping the core
//! deterministic and free of I/O dependencies. Any 2xx status counts as
//! success; the backend is not consistent about 200 versus 201/204.

use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::filter::TaskFilter;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{Task, TaskCreate, TaskId, TaskUpdate};

/// Synchronous, stateless client for the tasks API.
#[derive(Debug, Clone)]
pub struct TaskClient {
    base_url: String,
}

impl TaskClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_list(&self, filter: TaskFilter) -> HttpRequest {
        let path = match filter {
            TaskFilter::All => format!("{}/", self.base_url),
            TaskFilter::Completed => format!("{}/completed", self.base_url),
            TaskFilter::Incompleted => format!("{}/incompleted", self.base_url),
        };
        get(path)
    }

    pub fn build_get(&self, id: TaskId) -> HttpRequest {
        get(format!("{}/{id}", self.base_url))
    }

    pub fn build_create(&self, input: &TaskCreate) -> Result<HttpRequest, ApiError> {
        input.validate()?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            path: format!("{}/", self.base_url),
            headers: json_headers(),
            body: Some(encode(input)?),
        })
    }

    pub fn build_update(&self, id: TaskId, input: &TaskUpdate) -> Result<HttpRequest, ApiError> {
        input.validate()?;
        Ok(HttpRequest {
            method: HttpMethod::Put,
            path: format!("{}/{id}", self.base_url),
            headers: json_headers(),
            body: Some(encode(input)?),
        })
    }

    pub fn build_delete(&self, id: TaskId) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Delete,
            path: format!("{}/{id}", self.base_url),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn build_ping(&self) -> HttpRequest {
        get(format!("{}/test", self.base_url))
    }

    pub fn parse_list(&self, response: HttpResponse) -> Result<Vec<Task>, ApiError> {
        check_status(&response)?;
        decode(&response.body)
    }

    /// A 404 is the explicit "not found" outcome, not an error.
    pub fn parse_get(&self, response: HttpResponse) -> Result<Option<Task>, ApiError> {
        if response.status == 404 {
            return Ok(None);
        }
        check_status(&response)?;
        decode(&response.body).map(Some)
    }

    pub fn parse_create(&self, response: HttpResponse) -> Result<Task, ApiError> {
        check_status(&response)?;
        decode(&response.body)
    }

    pub fn parse_update(&self, response: HttpResponse) -> Result<Task, ApiError> {
        check_status(&response)?;
        decode(&response.body)
    }

    pub fn parse_delete(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }

    /// The liveness endpoint answers with either a JSON string or plain text.
    pub fn parse_ping(&self, response: HttpResponse) -> Result<String, ApiError> {
        check_status(&response)?;
        Ok(serde_json::from_str::<String>(&response.body).unwrap_or(response.body))
    }
}

fn get(path: String) -> HttpRequest {
    HttpRequest {
        method: HttpMethod::Get,
        path,
        headers: Vec::new(),
        body: None,
    }
}

fn json_headers() -> Vec<(String, String)> {
    vec![("content-type".to_string(), "application/json".to_string())]
}

fn encode<T: serde::Serialize>(input: &T) -> Result<String, ApiError> {
    serde_json::to_string(input).map_err(|e| ApiError::unknown(format!("failed to encode request: {e}")))
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::unknown(format!("invalid response body: {e}")))
}

/// Map non-success status codes onto the `ApiError` taxonomy.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    Err(ApiError::from_response(response))
}
