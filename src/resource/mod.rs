//! Async resource state shared by every page.
//!
//! A `Resource<T>` is `Idle`, `Loading`, `Ready(T)` or `Failed`. Each fetch is
//! started with [`Resource::begin`], which hands out a generation [`Ticket`];
//! only the result carrying the current ticket is applied, so a slow response
//! for superseded parameters can never overwrite newer state.

use crate::errors::AppError;

/// What happens to already-loaded data when a fetch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Keep showing the last successful data next to the error.
    Retain,
    /// Drop the data; the page shows the error and an empty list.
    Clear,
}

/// Generation token for one fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// Lifecycle of one fetched series.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceState<T> {
    Idle,
    Loading { stale: Option<T> },
    Ready(T),
    Failed { error: String, stale: Option<T> },
}

#[derive(Debug, Clone)]
pub struct Resource<T> {
    state: ResourceState<T>,
    generation: u64,
    policy: ErrorPolicy,
}

impl<T> Resource<T> {
    pub fn new(policy: ErrorPolicy) -> Self {
        Self {
            state: ResourceState::Idle,
            generation: 0,
            policy,
        }
    }

    pub fn state(&self) -> &ResourceState<T> {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, ResourceState::Idle)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, ResourceState::Loading { .. })
    }

    /// Latest data available for rendering, fresh or stale.
    pub fn data(&self) -> Option<&T> {
        match &self.state {
            ResourceState::Idle => None,
            ResourceState::Ready(data) => Some(data),
            ResourceState::Loading { stale } | ResourceState::Failed { stale, .. } => {
                stale.as_ref()
            }
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            ResourceState::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Start a fetch cycle. Any ticket handed out earlier becomes stale.
    pub fn begin(&mut self) -> Ticket {
        self.generation += 1;
        let previous = std::mem::replace(&mut self.state, ResourceState::Idle);
        let stale = match previous {
            ResourceState::Idle => None,
            ResourceState::Ready(data) => Some(data),
            ResourceState::Loading { stale } | ResourceState::Failed { stale, .. } => stale,
        };
        self.state = ResourceState::Loading { stale };
        Ticket(self.generation)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.generation
    }

    /// Apply a fetch result. Returns `false` and leaves the state untouched
    /// when the ticket has been superseded.
    pub fn resolve(&mut self, ticket: Ticket, result: Result<T, AppError>) -> bool {
        if !self.is_current(ticket) {
            tracing::debug!(
                ticket = ticket.0,
                current = self.generation,
                "Discarding stale response"
            );
            return false;
        }

        let previous = std::mem::replace(&mut self.state, ResourceState::Idle);
        self.state = match result {
            Ok(data) => ResourceState::Ready(data),
            Err(err) => {
                let stale = match (self.policy, previous) {
                    (ErrorPolicy::Clear, _) => None,
                    (ErrorPolicy::Retain, ResourceState::Loading { stale }) => stale,
                    (ErrorPolicy::Retain, ResourceState::Ready(data)) => Some(data),
                    (ErrorPolicy::Retain, ResourceState::Failed { stale, .. }) => stale,
                    (ErrorPolicy::Retain, ResourceState::Idle) => None,
                };
                ResourceState::Failed {
                    error: err.message(),
                    stale,
                }
            }
        };
        true
    }
}

impl<T: Clone> Resource<T> {
    /// Rendered data, falling back to an empty value before the first success.
    pub fn data_or_default(&self) -> T
    where
        T: Default,
    {
        self.data().cloned().unwrap_or_default()
    }
}
