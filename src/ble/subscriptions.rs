//! Subscription bookkeeping and notification dispatch.
//!
//! The button service exposes exactly [`CHANNEL_COUNT`] notify
//! characteristics. Each one the central subscribes to occupies a slot,
//! assigned in discovery order; the slot index doubles as the LED index
//! the notification value is mirrored onto. Handles are connection-
//! scoped, so the whole table is cleared on disconnect and a stale
//! token arriving afterwards resolves to nothing.

use crate::config::CHANNEL_COUNT;
use crate::error::Error;

/// Token identifying one registered subscription.
///
/// Handed out by [`SubscriptionTable::register`] and carried as the
/// correlation context for notification delivery, replacing any
/// positional pointer tricks with an explicit identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubscriptionToken(u8);

impl SubscriptionToken {
    /// Slot index this token refers to (0-based discovery order).
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One subscription slot.
#[derive(Clone, Copy, Debug)]
pub struct SubscriptionSlot {
    /// Handle of the characteristic value attribute.
    pub value_handle: u16,
    /// Handle of the client characteristic configuration descriptor.
    pub ccc_handle: u16,
    /// Output (LED) index bound at registration time.
    pub output: u8,
    /// Cleared when the peer disables notifications or the link drops.
    pub active: bool,
}

impl SubscriptionSlot {
    const fn empty() -> Self {
        Self {
            value_handle: 0,
            ccc_handle: 0,
            output: 0,
            active: false,
        }
    }
}

/// Fixed-capacity positional registry of notify subscriptions.
pub struct SubscriptionTable {
    slots: [SubscriptionSlot; CHANNEL_COUNT],
    used: usize,
}

impl SubscriptionTable {
    pub const fn new() -> Self {
        Self {
            slots: [SubscriptionSlot::empty(); CHANNEL_COUNT],
            used: 0,
        }
    }

    /// Register the next subscription in discovery order.
    ///
    /// Fails with [`Error::CapacityExceeded`] once all slots are taken;
    /// the caller drops the extra characteristic (capacity equals the
    /// service's known characteristic count).
    pub fn register(
        &mut self,
        value_handle: u16,
        ccc_handle: u16,
        output: u8,
    ) -> Result<SubscriptionToken, Error> {
        if self.used >= CHANNEL_COUNT {
            return Err(Error::CapacityExceeded);
        }
        let index = self.used;
        self.slots[index] = SubscriptionSlot {
            value_handle,
            ccc_handle,
            output,
            active: true,
        };
        self.used += 1;
        Ok(SubscriptionToken(index as u8))
    }

    /// Resolve a token to its slot, `None` if it was never registered
    /// or is no longer active.
    pub fn lookup(&self, token: SubscriptionToken) -> Option<&SubscriptionSlot> {
        self.slots
            .get(token.index())
            .filter(|s| token.index() < self.used && s.active)
    }

    /// Invalidate every slot. Idempotent; called on disconnect since
    /// handles do not survive the connection.
    pub fn clear_all(&mut self) {
        self.slots = [SubscriptionSlot::empty(); CHANNEL_COUNT];
        self.used = 0;
    }

    /// Number of registered slots in the current connection.
    pub fn len(&self) -> usize {
        self.used
    }

    pub fn is_empty(&self) -> bool {
        self.used == 0
    }
}

impl Default for SubscriptionTable {
    fn default() -> Self {
        Self::new()
    }
}

/// What the dispatcher decided to do with one notification event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Write `value` to physical output `index`.
    Output { index: u8, value: u8 },
    /// The peer disabled notifications for this subscription; the
    /// transport should stop delivering events for it.
    Stop,
    /// Stale or unknown token, or an empty payload. Nothing routed.
    Dropped,
}

/// Route one inbound notification to its bound output.
///
/// `payload == None` is the transport's unsubscribe signal; the slot is
/// left inactive so later events for the same token are ignored.
/// Otherwise the first payload byte is the new output value. Must stay
/// non-blocking: callers apply the outcome with a plain GPIO write.
pub fn dispatch(
    table: &mut SubscriptionTable,
    token: SubscriptionToken,
    payload: Option<&[u8]>,
) -> DispatchOutcome {
    let Some(slot) = table.lookup(token) else {
        return DispatchOutcome::Dropped;
    };
    let output = slot.output;

    match payload {
        None => {
            table.slots[token.index()].active = false;
            DispatchOutcome::Stop
        }
        Some([]) => DispatchOutcome::Dropped,
        Some(bytes) => DispatchOutcome::Output {
            index: output,
            value: bytes[0],
        },
    }
}
