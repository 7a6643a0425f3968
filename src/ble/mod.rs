//! Bluetooth Low Energy protocol core.
//!
//! Pure logic driving the Central role against a button-board
//! peripheral:
//!
//! 1. **Advertisement filter** - decides whether a received
//!    advertisement carries the button service UUID.
//! 2. **Discovery state machine** - sequences the service-then-
//!    characteristic GATT discovery and emits subscribe requests.
//! 3. **Subscription table + dispatcher** - positional bookkeeping of
//!    the four notify subscriptions and routing of inbound
//!    notifications to LED outputs.
//! 4. **Link controller** - the connect / discover / subscribe /
//!    notify / disconnect / rescan lifecycle.
//! 5. **Scan log** - line formatting for the passive scanner mode.
//!
//! Nothing here touches the radio: every transition is an explicit
//! `(state, event) -> action` step, so the whole protocol is testable
//! on the host. The binaries wire these types to the SoftDevice.

pub mod adv_filter;
pub mod discovery;
pub mod link;
pub mod scan_log;
pub mod subscriptions;
