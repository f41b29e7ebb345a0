//! Live Map Streaming
//!
//! Fans encoded map batches out to every connected viewer.
//!
//! ## Architecture
//!
//! - **Hub**: single task that owns the set of registered consumers
//! - **Consumer**: capability trait the hub fans out to, plus the bounded
//!   channel implementation used by WebSocket connections
//! - **Handler**: upgrades `/map/ws` and pumps a consumer's queue into the socket
//!
//! ## Wire format
//!
//! Every binary frame is 40 bytes: eight 5-byte records of
//! `[project_id, lat_hi, lat_lo, lon_hi, lon_lo]`, big-endian pixels on a
//! 4096 x 4096 grid. Anything the viewer sends is ignored.
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:8012/map/ws');
//! ws.binaryType = 'arraybuffer';
//! ws.onmessage = (event) => {
//!   const view = new DataView(event.data);
//!   for (let i = 0; i < view.byteLength; i += 5) {
//!     plot(view.getUint8(i), view.getInt16(i + 1), view.getInt16(i + 3));
//!   }
//! };
//! ```

mod consumer;
mod handler;
mod hub;

pub use consumer::{ChannelConsumer, Consumer, ConsumerId, EnqueueError};
pub use handler::websocket_handler;
pub use hub::{Hub, HubConfig, HubError};
