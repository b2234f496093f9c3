//! CCTV frame relay.
//!
//! A single authenticated producer streams binary frames over a WebSocket;
//! viewers connect to a second WebSocket path and receive them.

pub mod hub;

pub use hub::{
    ConsumerHandle, ProducerHandle, RelayHub, RelayMessage, RelayStats, OFFLINE_SENTINEL,
};
