//! The four states a page can be in.

use crate::cache::ViewData;
use crate::error::ApiError;
use crate::types::Task;

/// Exactly one of these is rendered per page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageState<T> {
    Loading,
    /// Every failed read offers a retry.
    Failed(ApiError),
    Empty,
    Populated(T),
}

impl<T> PageState<T> {
    pub fn is_retryable(&self) -> bool {
        matches!(self, PageState::Failed(_))
    }
}

impl PageState<Vec<Task>> {
    pub fn from_list(result: Result<Vec<Task>, ApiError>) -> Self {
        match result {
            Ok(tasks) if tasks.is_empty() => PageState::Empty,
            Ok(tasks) => PageState::Populated(tasks),
            Err(err) => PageState::Failed(err),
        }
    }
}

impl PageState<Task> {
    /// A task that does not exist renders as the empty (not found) page.
    pub fn from_item(result: Result<Option<Task>, ApiError>) -> Self {
        match result {
            Ok(Some(task)) => PageState::Populated(task),
            Ok(None) => PageState::Empty,
            Err(err) => PageState::Failed(err),
        }
    }
}

impl PageState<ViewData> {
    pub fn from_view(data: ViewData) -> Self {
        match &data {
            ViewData::List(tasks) if tasks.is_empty() => PageState::Empty,
            ViewData::Item(None) => PageState::Empty,
            _ => PageState::Populated(data),
        }
    }
}
