//! btnlink - BLE button-to-LED link.
//!
//! A button board (peripheral) advertises a custom 128-bit service with
//! four notify characteristics, one per button; a LED board (central)
//! scans for it, subscribes to all four, and mirrors each notification
//! onto the LED with the same index. A third, scanner-only mode logs
//! every observed advertisement as `len,payload` text.
//!
//! This library is the transport-independent protocol core: the
//! advertisement filter, the discovery state machine, the subscription
//! table and notification dispatcher, the connection lifecycle
//! controller, and the scan log formatting. It is `no_std` and has no
//! radio or GPIO dependencies, so it tests on the host with plain
//! `cargo test`.
//!
//! The embedded binaries (`central`, `peripheral`, `scanner`; built
//! with `--features embedded` for the nRF52840 + SoftDevice S140) wire
//! these types to the real transport.

#![cfg_attr(not(test), no_std)]

pub mod ble;
pub mod config;
pub mod error;
