//! List filters and client-side search.

use std::fmt;
use std::str::FromStr;

use crate::cache::ViewKey;
use crate::types::Task;

/// Which server-side list a page shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TaskFilter {
    #[default]
    All,
    Completed,
    Incompleted,
}

impl TaskFilter {
    pub fn view_key(self) -> ViewKey {
        match self {
            TaskFilter::All => ViewKey::All,
            TaskFilter::Completed => ViewKey::Completed,
            TaskFilter::Incompleted => ViewKey::Incompleted,
        }
    }
}

impl fmt::Display for TaskFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskFilter::All => write!(f, "all"),
            TaskFilter::Completed => write!(f, "completed"),
            TaskFilter::Incompleted => write!(f, "incompleted"),
        }
    }
}

impl FromStr for TaskFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(TaskFilter::All),
            "completed" | "done" => Ok(TaskFilter::Completed),
            "incompleted" | "incomplete" | "open" => Ok(TaskFilter::Incompleted),
            other => Err(format!("unknown filter '{other}' (expected all, completed or incompleted)")),
        }
    }
}

/// Case-insensitive substring match on title or description.
pub fn matches(task: &Task, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    task.title.to_lowercase().contains(&needle)
        || task
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(&needle))
}

/// Tasks matching `query`, in their original order. A blank query keeps all.
pub fn search<'a>(tasks: &'a [Task], query: &str) -> Vec<&'a Task> {
    tasks.iter().filter(|task| matches(task, query)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tasks() -> Vec<Task> {
        ["Buy milk", "Walk dog", "Pay rent"]
            .iter()
            .enumerate()
            .map(|(i, title)| Task {
                id: i as u64 + 1,
                title: title.to_string(),
                description: None,
                completed: false,
                created_at: None,
                updated_at: None,
            })
            .collect()
    }

    #[test]
    fn search_finds_single_match() {
        let tasks = tasks();
        let found = search(&tasks, "milk");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Buy milk");
    }

    #[test]
    fn search_is_case_insensitive() {
        let tasks = tasks();
        assert_eq!(search(&tasks, "WALK")[0].title, "Walk dog");
    }

    #[test]
    fn search_without_match_is_empty() {
        assert!(search(&tasks(), "xyz").is_empty());
    }

    #[test]
    fn blank_query_keeps_everything() {
        assert_eq!(search(&tasks(), "   ").len(), 3);
    }

    #[test]
    fn search_looks_at_description() {
        let mut tasks = tasks();
        tasks[2].description = Some("Landlord wants it by Friday".to_string());
        let found = search(&tasks, "landlord");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 3);
    }

    #[test]
    fn filter_parses_aliases() {
        assert_eq!("Completed".parse::<TaskFilter>().unwrap(), TaskFilter::Completed);
        assert_eq!("incomplete".parse::<TaskFilter>().unwrap(), TaskFilter::Incompleted);
        assert!("later".parse::<TaskFilter>().is_err());
        assert_eq!(TaskFilter::Incompleted.to_string(), "incompleted");
    }
}
