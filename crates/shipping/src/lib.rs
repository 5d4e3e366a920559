//! `bookstall-shipping` — shipments cut against settled orders.

pub mod shipment;

pub use shipment::{Shipment, ShipmentItem};
