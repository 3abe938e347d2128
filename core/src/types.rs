//! Domain DTOs for the tasks API.
//!
//! # Design
//! These types mirror the mock-server's schema but are defined independently.
//! Integration tests catch any schema drift between the two crates. Field
//! names travel as camelCase on the wire; optional fields the server has not
//! assigned yet are omitted rather than sent as `null`.

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Server-assigned task identifier.
pub type TaskId = u64;

/// Maximum title length, in characters.
pub const TITLE_MAX_LEN: usize = 200;

/// Maximum description length, in characters.
pub const DESCRIPTION_MAX_LEN: usize = 1000;

/// A single task returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Task {
    /// Overlay the fields present in `patch` onto a copy of this task.
    ///
    /// Used to predict the server's answer before it arrives. Server-owned
    /// fields (`id`, timestamps) are left untouched.
    pub fn merged(&self, patch: &TaskUpdate) -> Task {
        let mut task = self.clone();
        if let Some(title) = &patch.title {
            task.title = title.clone();
        }
        if let Some(description) = &patch.description {
            task.description = Some(description.clone());
        }
        if let Some(completed) = patch.completed {
            task.completed = completed;
        }
        task
    }
}

/// Request payload for creating a new task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskCreate {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
}

impl TaskCreate {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            completed: false,
        }
    }

    /// Check the payload against the same limits the server enforces.
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_title(&self.title)?;
        validate_description(self.description.as_deref())
    }
}

/// Request payload for updating an existing task. Only the fields present in
/// the JSON are applied; omitted fields remain unchanged on the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TaskUpdate {
    /// A patch that only flips the completion flag.
    pub fn toggle(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        validate_description(self.description.as_deref())
    }
}

fn validate_title(title: &str) -> Result<(), ApiError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("title", "title is required"));
    }
    if trimmed.chars().count() > TITLE_MAX_LEN {
        return Err(ApiError::validation("title", "title is too long"));
    }
    Ok(())
}

fn validate_description(description: Option<&str>) -> Result<(), ApiError> {
    match description {
        Some(text) if text.chars().count() > DESCRIPTION_MAX_LEN => Err(ApiError::validation(
            "description",
            "description is too long",
        )),
        _ => Ok(()),
    }
}
