//! Page controllers: user actions in, view updates and redraws out.

pub mod dashboard;
pub mod route_detail;

/// What happened to one user-triggered load by the time it resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The response was applied to the view (and the map, where relevant).
    Applied,
    /// A newer request was issued meanwhile; this result was discarded
    /// without touching anything.
    Stale,
    /// The backend call failed; the view shows the failure state.
    Failed,
}

/// Alert flavor of a status line, mirroring the severity levels the pages
/// distinguish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusVariant {
    Info,
    Success,
    Secondary,
    Warning,
}
