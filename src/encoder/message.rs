//! Wire format
//!
//! A message is five bytes: `[project_id][lat_hi][lat_lo][lon_hi][lon_lo]`.
//! Coordinates are projected onto a 4096 x 4096 equirectangular grid and
//! stored as big-endian `i16`. Eight messages make one 40-byte batch, which is
//! sent to viewers as a single binary frame.

use bytes::{BufMut, Bytes, BytesMut};

use super::event::Location;

/// Side length of the projection grid in pixels
pub const MAP_PIXELS: f64 = 4096.0;

/// Bytes per encoded message
pub const MESSAGE_LEN: usize = 5;

/// Messages per batch
pub const MESSAGES_PER_BATCH: usize = 8;

/// Bytes per batch
pub const BATCH_LEN: usize = MESSAGE_LEN * MESSAGES_PER_BATCH;

/// Project latitude in degrees (`[-90, 90]`) onto `[0, 4096]`
pub fn latitude_to_pixel(degrees: f64) -> i16 {
    to_pixel((degrees + 90.0) * MAP_PIXELS / 180.0)
}

/// Project longitude in degrees (`[-180, 180]`) onto `[0, 4096]`
pub fn longitude_to_pixel(degrees: f64) -> i16 {
    to_pixel((degrees + 180.0) * MAP_PIXELS / 360.0)
}

fn to_pixel(value: f64) -> i16 {
    // NaN saturates to 0 on the cast
    value.round().clamp(0.0, MAP_PIXELS) as i16
}

/// One point on the map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message {
    pub project_id: u8,
    pub lat: i16,
    pub lon: i16,
}

impl Message {
    pub fn new(project_id: u8, location: Location) -> Self {
        Self {
            project_id,
            lat: latitude_to_pixel(location.latitude),
            lon: longitude_to_pixel(location.longitude),
        }
    }

    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u8(self.project_id);
        buf.put_i16(self.lat);
        buf.put_i16(self.lon);
    }

    /// Parse one record; `None` if `bytes` is not exactly [`MESSAGE_LEN`] long
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let record: &[u8; MESSAGE_LEN] = bytes.try_into().ok()?;
        Some(Self {
            project_id: record[0],
            lat: i16::from_be_bytes([record[1], record[2]]),
            lon: i16::from_be_bytes([record[3], record[4]]),
        })
    }
}

/// A full 40-byte frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch(Bytes);

impl Batch {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn messages(&self) -> impl Iterator<Item = Message> + '_ {
        self.0.chunks_exact(MESSAGE_LEN).filter_map(Message::decode)
    }
}

impl From<Batch> for Bytes {
    fn from(batch: Batch) -> Self {
        batch.0
    }
}

/// Accumulates messages until a batch is full
#[derive(Debug)]
pub struct BatchBuilder {
    buf: BytesMut,
}

impl BatchBuilder {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(BATCH_LEN),
        }
    }

    /// Append a message, returning the batch once it holds eight
    pub fn push(&mut self, message: Message) -> Option<Batch> {
        message.encode(&mut self.buf);

        if self.buf.len() < BATCH_LEN {
            return None;
        }

        let batch = self.buf.split().freeze();
        self.buf.reserve(BATCH_LEN);
        Some(Batch(batch))
    }

    /// Messages waiting for the batch to fill
    pub fn pending(&self) -> usize {
        self.buf.len() / MESSAGE_LEN
    }
}

impl Default for BatchBuilder {
    fn default() -> Self {
        Self::new()
    }
}
