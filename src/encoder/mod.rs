//! Event Encoding
//!
//! Turns geolocated download events into the compact binary frames sent to
//! map viewers.
//!
//! - [`event`]: the input record produced by the GeoIP lookup
//! - [`message`]: coordinate projection and the 5-byte / 40-byte wire format
//! - [`batcher`]: filtering, de-duplication and batching

pub mod batcher;
pub mod event;
pub mod message;

pub use batcher::{Batcher, BatcherStats, Rejection};
pub use event::{GeoEvent, Location};
pub use message::{
    latitude_to_pixel, longitude_to_pixel, Batch, BatchBuilder, Message, BATCH_LEN, MAP_PIXELS,
    MESSAGES_PER_BATCH, MESSAGE_LEN,
};
