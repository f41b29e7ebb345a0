//! # Mirror Map
//!
//! Live map of mirror traffic. Geolocated download events are filtered,
//! projected onto a 4096 x 4096 grid and packed into 40-byte frames, which a
//! broadcast hub fans out to every connected WebSocket viewer.
//!
//! ## Modules
//!
//! - [`encoder`]: event filtering, projection and batching
//! - [`websocket`]: the broadcast hub, consumer capability and WebSocket transport
//! - [`projects`]: hot-reloadable project table
//! - [`source`]: newline-delimited JSON event reader
//! - [`api`]: HTTP router with Axum
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mirror_map::{Batcher, GeoEvent, Hub, HubConfig, Project, ProjectCatalog};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let catalog = ProjectCatalog::new(vec![Project::new("ubuntu", 1)])?;
//!     let hub = Hub::spawn(HubConfig::default());
//!
//!     let (events, rx) = tokio::sync::mpsc::channel(1024);
//!     tokio::spawn(Batcher::new(catalog.subscribe()).run(rx, hub.clone()));
//!
//!     events
//!         .send(GeoEvent::located("192.0.2.1".parse()?, "ubuntu", 43.1, -75.2))
//!         .await?;
//!
//!     println!("{} viewers", hub.count().await?);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod encoder;
pub mod projects;
pub mod source;
pub mod websocket;

pub use api::{build_router, serve, ApiError, AppState};

pub use config::{Config, ConfigError, HubSettings, LoggingConfig, ServerConfig, SourceConfig};

pub use encoder::{Batch, Batcher, BatcherStats, GeoEvent, Location, Message, Rejection};

pub use projects::{Project, ProjectCatalog, ProjectError, ProjectPage, ProjectTable, ProjectView};

pub use source::{read_events, spawn_reader, SourceError};

pub use websocket::{
    websocket_handler, ChannelConsumer, Consumer, ConsumerId, EnqueueError, Hub, HubConfig,
    HubError,
};
