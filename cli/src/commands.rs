//! Subcommands and how each one renders.
//!
//! # Design
//! Every command ends in exactly one [`PageState`]: loading, error with a
//! retry hint, empty, or populated. Rendering goes to any `io::Write` so tests
//! can capture it.

use std::io::Write;

use clap::{Parser, Subcommand};
use tasks_core::{search, ApiError, PageState, Task, TaskCreate, TaskFilter, TaskId, TaskStore, TaskUpdate, Transport};

use crate::config::SettingsArgs;

#[derive(Parser, Debug)]
#[command(version, about = "Terminal client for the tasks service")]
pub struct Cli {
    #[command(flatten)]
    pub settings: SettingsArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List tasks
    ///
    /// Example: tasks list --filter completed --search milk
    List {
        #[arg(short, long, default_value_t = TaskFilter::All)]
        filter: TaskFilter,
        /// Case-insensitive match on title or description
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Show one task
    Show { id: TaskId },
    /// Add a task
    ///
    /// Example: tasks add "Buy milk" --description "semi-skimmed"
    Add {
        title: String,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        completed: bool,
    },
    /// Change some fields of a task
    ///
    /// Example: tasks edit 3 --title "Pay rent" --completed true
    Edit {
        id: TaskId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        completed: Option<bool>,
    },
    /// Flip a task between done and not done
    Toggle { id: TaskId },
    /// Delete a task
    Delete { id: TaskId },
    /// Check that the API answers
    Ping,
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Already rendered to the output; only the exit code is left to set.
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

/// Run one command against `store` and render the outcome to `out`.
///
/// A failed page is rendered first and then returned as `CliError::Api`.
pub async fn run<T, W>(store: &TaskStore<T>, command: Command, out: &mut W) -> Result<(), CliError>
where
    T: Transport + 'static,
    W: Write,
{
    match command {
        Command::List { filter, search: query } => {
            let result = store.query().tasks(filter).await;
            let total = result.as_ref().map_or(0, Vec::len);
            let result = result.map(|tasks| match &query {
                Some(q) => search(&tasks, q).into_iter().cloned().collect(),
                None => tasks,
            });
            let empty = render(out, PageState::from_list(result), |out, tasks: Vec<Task>| {
                tasks.iter().try_for_each(|task| write_task_line(out, task))?;
                if query.is_some() {
                    writeln!(out, "{} of {total} tasks", tasks.len())?;
                }
                Ok(())
            })?;
            if empty {
                match (&query, filter) {
                    (Some(q), _) => writeln!(out, "no tasks match \"{q}\"")?,
                    (None, TaskFilter::All) => writeln!(out, "no tasks yet")?,
                    (None, _) => writeln!(out, "no {filter} tasks")?,
                }
            }
            Ok(())
        }
        Command::Show { id } => {
            let page = PageState::from_item(store.query().task(id).await);
            let empty = render(out, page, write_task_detail)?;
            if empty {
                writeln!(out, "task {id} not found")?;
            }
            Ok(())
        }
        Command::Add {
            title,
            description,
            completed,
        } => {
            let input = TaskCreate {
                title,
                description,
                completed,
            };
            let task = outcome(out, store.mutations().create(input).await)?;
            writeln!(out, "created task {}", task.id)?;
            write_task_line(out, &task)?;
            Ok(())
        }
        Command::Edit {
            id,
            title,
            description,
            completed,
        } => {
            let patch = TaskUpdate {
                title,
                description,
                completed,
            };
            let task = outcome(out, store.mutations().update(id, patch).await)?;
            writeln!(out, "updated task {id}")?;
            write_task_line(out, &task)?;
            Ok(())
        }
        Command::Toggle { id } => {
            let current = match store.query().task(id).await {
                Ok(Some(task)) => task,
                Ok(None) => {
                    writeln!(out, "task {id} not found")?;
                    return Err(ApiError::NotFound.into());
                }
                Err(err) => return Err(render_failure(out, err)?),
            };
            let task = outcome(out, store.mutations().toggle(id, !current.completed).await)?;
            let state = if task.completed { "done" } else { "not done" };
            writeln!(out, "task {id} marked {state}")?;
            Ok(())
        }
        Command::Delete { id } => {
            outcome(out, store.mutations().delete(id).await)?;
            writeln!(out, "deleted task {id}")?;
            Ok(())
        }
        Command::Ping => {
            let message = outcome(out, store.query().ping().await)?;
            writeln!(out, "{message}")?;
            Ok(())
        }
    }
}

/// Render a page. Returns `Ok(true)` when the page is empty so the caller
/// can word the empty state for its own context.
fn render<W, T, F>(out: &mut W, page: PageState<T>, populated: F) -> Result<bool, CliError>
where
    W: Write,
    F: FnOnce(&mut W, T) -> std::io::Result<()>,
{
    match page {
        PageState::Loading => {
            writeln!(out, "loading...")?;
            Ok(false)
        }
        PageState::Failed(err) => Err(render_failure(out, err)?),
        PageState::Empty => Ok(true),
        PageState::Populated(value) => {
            populated(out, value)?;
            Ok(false)
        }
    }
}

fn outcome<W: Write, V>(out: &mut W, result: Result<V, ApiError>) -> Result<V, CliError> {
    match result {
        Ok(value) => Ok(value),
        Err(err) => Err(render_failure(out, err)?),
    }
}

/// Write the error page and hand back the error for the exit code.
fn render_failure<W: Write>(out: &mut W, err: ApiError) -> Result<CliError, std::io::Error> {
    writeln!(out, "error: {}", err.message())?;
    if let Some(field) = err.field() {
        writeln!(out, "  field: {field}")?;
    }
    if let Some(status) = err.status() {
        writeln!(out, "  status: {status}")?;
    }
    writeln!(out, "retry: run the same command again")?;
    Ok(CliError::Api(err))
}

fn write_task_line<W: Write>(out: &mut W, task: &Task) -> std::io::Result<()> {
    let mark = if task.completed { 'x' } else { ' ' };
    writeln!(out, "{:>4} [{mark}] {}", task.id, task.title)
}

fn write_task_detail<W: Write>(out: &mut W, task: Task) -> std::io::Result<()> {
    write_task_line(out, &task)?;
    if let Some(description) = &task.description {
        writeln!(out, "       {description}")?;
    }
    if let Some(created_at) = &task.created_at {
        writeln!(out, "       created {created_at}")?;
    }
    if let Some(updated_at) = &task.updated_at {
        writeln!(out, "       updated {updated_at}")?;
    }
    Ok(())
}
