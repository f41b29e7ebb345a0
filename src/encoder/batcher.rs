//! Event batcher
//!
//! Filters the raw event feed down to map points and packs them into batches.
//! Per event, in order:
//!
//! 1. drop if the GeoIP lookup failed
//! 2. drop if the location is the (0, 0) "unknown" sentinel
//! 3. drop if the address equals the last *accepted* address
//! 4. drop if the distribution is not a configured project
//! 5. project, encode, append; every eighth message completes a batch
//!
//! Addresses are compared in canonical form, so an IPv4-mapped IPv6 address
//! matches its IPv4 address. Only accepted events update the last-address state. Incomplete batches are
//! never flushed, so a quiet feed can hold up to seven points indefinitely.

use std::fmt;
use std::net::IpAddr;
use tokio::sync::mpsc;

use super::event::GeoEvent;
use super::message::{Batch, BatchBuilder, Message};
use crate::projects::ProjectView;
use crate::websocket::Hub;

/// Why an event did not become a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Unresolved,
    UnknownLocation,
    DuplicateSource,
    UnknownProject,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Rejection::Unresolved => "unresolved",
            Rejection::UnknownLocation => "unknown location",
            Rejection::DuplicateSource => "duplicate source",
            Rejection::UnknownProject => "unknown project",
        };
        f.write_str(reason)
    }
}

/// Running totals for one batcher
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatcherStats {
    pub accepted: u64,
    pub unresolved: u64,
    pub unknown_location: u64,
    pub duplicate_source: u64,
    pub unknown_project: u64,
    pub batches: u64,
}

impl BatcherStats {
    fn record(&mut self, rejection: Rejection) {
        match rejection {
            Rejection::Unresolved => self.unresolved += 1,
            Rejection::UnknownLocation => self.unknown_location += 1,
            Rejection::DuplicateSource => self.duplicate_source += 1,
            Rejection::UnknownProject => self.unknown_project += 1,
        }
    }

    pub fn dropped(&self) -> u64 {
        self.unresolved + self.unknown_location + self.duplicate_source + self.unknown_project
    }
}

impl fmt::Display for BatcherStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} accepted, {} dropped, {} batches",
            self.accepted,
            self.dropped(),
            self.batches
        )
    }
}

/// Turns an ordered event feed into batches
pub struct Batcher {
    projects: ProjectView,
    last_accepted: Option<IpAddr>,
    builder: BatchBuilder,
    stats: BatcherStats,
}

impl Batcher {
    pub fn new(projects: ProjectView) -> Self {
        Self {
            projects,
            last_accepted: None,
            builder: BatchBuilder::new(),
            stats: BatcherStats::default(),
        }
    }

    /// Filter and encode one event without touching the batch buffer
    pub fn accept(&mut self, event: &GeoEvent) -> Result<Message, Rejection> {
        let location = event.location.ok_or(Rejection::Unresolved)?;

        if location.is_unknown() {
            return Err(Rejection::UnknownLocation);
        }

        let ip = event.ip.to_canonical();
        if self.last_accepted == Some(ip) {
            return Err(Rejection::DuplicateSource);
        }

        let project_id = self
            .projects
            .id_of(&event.distro)
            .ok_or(Rejection::UnknownProject)?;

        self.last_accepted = Some(ip);
        Ok(Message::new(project_id, location))
    }

    /// Process one event, returning a batch when one completes
    pub fn push(&mut self, event: &GeoEvent) -> Option<Batch> {
        match self.accept(event) {
            Ok(message) => {
                self.stats.accepted += 1;
                let batch = self.builder.push(message)?;
                self.stats.batches += 1;
                Some(batch)
            }
            Err(rejection) => {
                tracing::trace!(
                    ip = %event.ip,
                    distro = %event.distro,
                    reason = %rejection,
                    "Event dropped"
                );
                self.stats.record(rejection);
                None
            }
        }
    }

    pub fn stats(&self) -> BatcherStats {
        self.stats
    }

    /// Messages accepted but not yet part of a full batch
    pub fn pending(&self) -> usize {
        self.builder.pending()
    }

    /// Drain `events` into the hub until the feed ends or the hub stops
    pub async fn run(mut self, mut events: mpsc::Receiver<GeoEvent>, hub: Hub) -> BatcherStats {
        while let Some(event) = events.recv().await {
            let Some(batch) = self.push(&event) else {
                continue;
            };

            tracing::trace!(batches = self.stats.batches, "Broadcasting batch");

            if hub.broadcast(batch.into()).await.is_err() {
                tracing::warn!("Hub stopped, batcher exiting");
                break;
            }
        }

        tracing::info!(
            stats = %self.stats,
            pending = self.pending(),
            "Batcher stopped"
        );
        self.stats
    }
}
