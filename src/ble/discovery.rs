//! GATT attribute discovery state machine.
//!
//! Discovery runs in two passes: find the button service by its
//! 128-bit UUID over the full attribute handle range, then enumerate
//! every characteristic inside the service's handle span and subscribe
//! to the ones carrying the expected 16-bit button UUIDs. The transport
//! delivers one event per matched attribute and a terminal [`Complete`]
//! event when a range is exhausted, in ascending handle order.
//!
//! Each event yields exactly one [`DiscoveryAction`], so at most one
//! request is ever outstanding and progress is monotonic.
//!
//! [`Complete`]: DiscoveryEvent::Complete

use crate::ble::subscriptions::{SubscriptionTable, SubscriptionToken};

/// First and last valid ATT handles.
pub const FIRST_ATTRIBUTE_HANDLE: u16 = 0x0001;
pub const LAST_ATTRIBUTE_HANDLE: u16 = 0xFFFF;

/// Inclusive attribute handle search range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HandleRange {
    pub start: u16,
    pub end: u16,
}

impl HandleRange {
    pub const FULL: Self = Self {
        start: FIRST_ATTRIBUTE_HANDLE,
        end: LAST_ATTRIBUTE_HANDLE,
    };
}

/// UUID of a discovered characteristic declaration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CharacteristicUuid {
    /// Short-form 16-bit UUID (the button characteristics).
    Short(u16),
    /// Full 128-bit UUID, little-endian.
    Long([u8; 16]),
}

/// One discovery callback from the transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiscoveryEvent {
    /// A primary service matching the target UUID.
    ServiceFound { start_handle: u16, end_handle: u16 },
    /// A characteristic declaration within the searched range.
    CharacteristicFound {
        uuid: CharacteristicUuid,
        value_handle: u16,
    },
    /// Terminal callback: the searched range is exhausted.
    Complete,
}

/// The single request (or non-request) to issue in response to an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiscoveryAction {
    /// Issue a primary-service discovery filtered by the target UUID.
    FindService(HandleRange),
    /// Issue an unfiltered characteristic discovery over the range.
    FindCharacteristics(HandleRange),
    /// Enable notifications for the characteristic registered under
    /// `token`.
    Subscribe {
        token: SubscriptionToken,
        value_handle: u16,
        ccc_handle: u16,
    },
    /// Attribute not usable (wrong UUID form, or table full); dropped.
    Skipped,
    /// Event ignored in the current phase.
    None,
    /// Discovery is complete; no further requests for this connection.
    Finished,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    FindService,
    FindCharacteristics(HandleRange),
    Done,
}

/// Discovery state for one connection.
///
/// Created on connect, dropped on disconnect. Subscriptions are
/// registered into the caller's [`SubscriptionTable`] as they are
/// found, output binding = slot index = discovery order.
pub struct DiscoverySession {
    phase: Phase,
}

impl DiscoverySession {
    /// Start a session; the returned action is the initial
    /// primary-service request over the full handle range.
    pub fn start() -> (Self, DiscoveryAction) {
        (
            Self {
                phase: Phase::FindService,
            },
            DiscoveryAction::FindService(HandleRange::FULL),
        )
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    /// Advance the machine by one transport event.
    pub fn on_event(
        &mut self,
        event: DiscoveryEvent,
        table: &mut SubscriptionTable,
    ) -> DiscoveryAction {
        match (self.phase, event) {
            (
                Phase::FindService,
                DiscoveryEvent::ServiceFound {
                    start_handle,
                    end_handle,
                },
            ) => {
                // The service declaration itself sits at start_handle;
                // its characteristics start right after it.
                let range = HandleRange {
                    start: start_handle.saturating_add(1),
                    end: end_handle,
                };
                self.phase = Phase::FindCharacteristics(range);
                DiscoveryAction::FindCharacteristics(range)
            }

            (
                Phase::FindCharacteristics(_),
                DiscoveryEvent::CharacteristicFound { uuid, value_handle },
            ) => match uuid {
                CharacteristicUuid::Short(_) => {
                    let ccc_handle = value_handle.saturating_add(1);
                    match table.register(value_handle, ccc_handle, table.len() as u8) {
                        Ok(token) => DiscoveryAction::Subscribe {
                            token,
                            value_handle,
                            ccc_handle,
                        },
                        Err(_) => DiscoveryAction::Skipped,
                    }
                }
                CharacteristicUuid::Long(_) => DiscoveryAction::Skipped,
            },

            (_, DiscoveryEvent::Complete) => {
                self.phase = Phase::Done;
                DiscoveryAction::Finished
            }

            // Out-of-phase events (a second service instance, a
            // characteristic before the service was found) are ignored.
            _ => DiscoveryAction::None,
        }
    }
}
