use crate::error::{FetchError, LoadError};
use std::fmt;

/// Lifecycle of a resource request.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceState<D> {
    /// No identifier supplied.
    Idle,
    /// Fetch in flight.
    Pending { identifier: String },
    Resolved { identifier: String, data: D },
    /// Terminal until the identifier changes or the loader is reset.
    Rejected { identifier: String, error: FetchError },
}

/// Discriminant of a [`ResourceState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Idle,
    Pending,
    Resolved,
    Rejected,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Idle => "idle",
            Status::Pending => "pending",
            Status::Resolved => "resolved",
            Status::Rejected => "rejected",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a consumer should display for a non-failed state.
#[derive(Debug, PartialEq)]
pub enum View<'a, D> {
    NoIdentifier,
    Loading { identifier: &'a str },
    Ready { identifier: &'a str, data: &'a D },
}

impl<D> ResourceState<D> {
    pub fn status(&self) -> Status {
        match self {
            ResourceState::Idle => Status::Idle,
            ResourceState::Pending { .. } => Status::Pending,
            ResourceState::Resolved { .. } => Status::Resolved,
            ResourceState::Rejected { .. } => Status::Rejected,
        }
    }

    /// Identifier the state refers to; `None` when idle.
    pub fn identifier(&self) -> Option<&str> {
        match self {
            ResourceState::Idle => None,
            ResourceState::Pending { identifier }
            | ResourceState::Resolved { identifier, .. }
            | ResourceState::Rejected { identifier, .. } => Some(identifier.as_str()),
        }
    }

    pub fn data(&self) -> Option<&D> {
        match self {
            ResourceState::Resolved { data, .. } => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            ResourceState::Rejected { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Map the state to what should be displayed.
    ///
    /// A rejected state is never displayed inline; its error is returned for
    /// an error boundary to handle. A state that carries an empty identifier
    /// breaks the loader's invariants and yields `ImpossibleState`.
    pub fn view(&self) -> Result<View<'_, D>, LoadError> {
        if let Some(identifier) = self.identifier() {
            if identifier.is_empty() {
                return Err(LoadError::ImpossibleState(format!(
                    "{} state without an identifier",
                    self.status()
                )));
            }
        }

        match self {
            ResourceState::Idle => Ok(View::NoIdentifier),
            ResourceState::Pending { identifier } => Ok(View::Loading {
                identifier: identifier.as_str(),
            }),
            ResourceState::Resolved { identifier, data } => Ok(View::Ready {
                identifier: identifier.as_str(),
                data,
            }),
            ResourceState::Rejected { error, .. } => Err(LoadError::Fetch(error.clone())),
        }
    }
}

impl<D> fmt::Display for ResourceState<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceState::Idle => f.write_str("no identifier"),
            ResourceState::Pending { identifier } => write!(f, "loading {identifier}"),
            ResourceState::Resolved { identifier, .. } => write!(f, "resolved {identifier}"),
            ResourceState::Rejected { identifier, error } => {
                write!(f, "failed to load {identifier}: {error}")
            }
        }
    }
}
