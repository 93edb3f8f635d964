//! BLE peripheral link.
//!
//! # Components
//!
//! - [`transport`] - capability trait over the BLE stack, events and payloads
//! - [`link`] - connection edge handling, counter cadence, sensor pushes
//! - [`gatt`] - NimBLE GATT server (ESP32 only)

mod link;
mod transport;

#[cfg(feature = "esp32")]
mod gatt;

pub use link::{counter_payload, LinkState, LinkTransition, PeripheralLink};
pub use transport::{
    decode_fixed, encode_fixed, EventInbox, LinkError, LinkEvent, LinkTransport, SensorPayload,
};

#[cfg(feature = "esp32")]
pub use gatt::GattServer;
