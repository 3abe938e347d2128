//! Client core for the tasks service: API client, view cache, optimistic
//! mutations and de-duplicated reads.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern). The host supplies a
//! [`Transport`]; [`TaskStore`] wires it to a shared [`ViewCache`] read through
//! [`QueryFacade`] and written through [`MutationCoordinator`].
//!
//! # Design
//! - `TaskClient` is stateless; it holds only `base_url`.
//! - Each operation is split into `build_*` (produces request) and
//!   `parse_*` (consumes response), so the I/O boundary is explicit.
//! - Cache state is owned by a `TaskStore`, never global.
//! - Every mutation is an explicit `Pending -> Committed | RolledBack` state
//!   machine over the cache (see [`mutation`]).
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod cache;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod filter;
pub mod http;
pub mod mutation;
pub mod page;
pub mod query;
pub mod remote;
pub mod store;
pub mod types;

pub use cache::{SharedCache, ViewCache, ViewData, ViewKey};
pub use client::TaskClient;
pub use config::{ClientConfig, FreshnessPolicy, RetryPolicy};
pub use coordinator::MutationCoordinator;
pub use error::{ApiError, ErrorKind};
pub use filter::{search, TaskFilter};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};
pub use mutation::MutationState;
pub use page::PageState;
pub use query::{Cached, QueryFacade};
pub use remote::RemoteTasks;
pub use store::TaskStore;
pub use types::{Task, TaskCreate, TaskId, TaskUpdate};
