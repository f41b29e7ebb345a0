//! Application State
//!
//! Shared state accessible by all handlers.
//! Wrapped in Arc for sharing across connection tasks.

use std::sync::Arc;
use std::time::Instant;

use crate::projects::ProjectCatalog;
use crate::websocket::Hub;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Handle to the broadcast hub
    pub hub: Hub,
    /// Live project table
    pub projects: Arc<ProjectCatalog>,
    /// Frames buffered per viewer before the hub drops it
    pub queue_capacity: usize,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new(hub: Hub, projects: Arc<ProjectCatalog>, queue_capacity: usize) -> Self {
        Self {
            hub,
            projects,
            queue_capacity,
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
