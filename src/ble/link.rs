//! Central connection lifecycle controller.
//!
//! Owns the one-and-only link state: scanning, connecting, or
//! connected, plus the discovery session and subscription table that
//! are scoped to the live connection. The controller never scans while
//! a connection exists; disconnection (or a failed connect) always
//! lands back in scanning with all connection-scoped state cleared.

use crate::ble::adv_filter::contains_service_uuid;
use crate::ble::discovery::{DiscoveryAction, DiscoveryEvent, DiscoverySession, HandleRange};
use crate::ble::subscriptions::{
    dispatch, DispatchOutcome, SubscriptionTable, SubscriptionToken,
};
use crate::config::BUTTON_SERVICE_UUID_LE;

/// Lifecycle states. At most one is active; `Connecting` and
/// `Connected` imply scanning is stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkState {
    Scanning,
    Connecting,
    Connected,
}

/// Transport events fed to the controller.
#[derive(Clone, Copy, Debug)]
pub enum LinkEvent<'a> {
    /// An advertisement was received while scanning.
    AdvReport { connectable: bool, data: &'a [u8] },
    /// The connection attempt succeeded.
    ConnectEstablished,
    /// The connection attempt failed.
    ConnectFailed,
    /// A discovery callback for the live connection.
    Discovery(DiscoveryEvent),
    /// A notification (or unsubscribe signal) for a subscription.
    Notification {
        token: SubscriptionToken,
        payload: Option<&'a [u8]>,
    },
    /// The link dropped, for any reason.
    Disconnected,
}

/// The single follow-up the transport should perform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkAction {
    None,
    /// Stop scanning and connect to the advertiser of the matching
    /// report.
    Connect,
    /// Issue a primary-service discovery request.
    FindService(HandleRange),
    /// Issue a characteristic discovery request.
    FindCharacteristics(HandleRange),
    /// Enable notifications on the registered characteristic.
    Subscribe {
        token: SubscriptionToken,
        value_handle: u16,
        ccc_handle: u16,
    },
    /// A discovered attribute was dropped (capacity or UUID form);
    /// worth a log line, nothing more.
    AttributeSkipped,
    /// Discovery finished; the link is idle until disconnect.
    DiscoveryFinished,
    /// Write `value` to output `index`.
    SetOutput { index: u8, value: u8 },
    /// Tell the transport to stop delivering events for a subscription.
    StopNotifications,
    /// Restart passive scanning.
    Rescan,
}

/// Application context for the central role; owns everything scoped to
/// the current connection. No ambient globals.
pub struct CentralLink {
    state: LinkState,
    discovery: Option<DiscoverySession>,
    subscriptions: SubscriptionTable,
}

impl CentralLink {
    /// A fresh controller, assumed to start with scanning active.
    pub const fn new() -> Self {
        Self {
            state: LinkState::Scanning,
            discovery: None,
            subscriptions: SubscriptionTable::new(),
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn subscriptions(&self) -> &SubscriptionTable {
        &self.subscriptions
    }

    /// Consume one transport event and produce the follow-up action.
    pub fn handle(&mut self, event: LinkEvent<'_>) -> LinkAction {
        match event {
            LinkEvent::AdvReport { connectable, data } => {
                if self.state != LinkState::Scanning || !connectable {
                    return LinkAction::None;
                }
                if !contains_service_uuid(data, &BUTTON_SERVICE_UUID_LE) {
                    return LinkAction::None;
                }
                self.state = LinkState::Connecting;
                LinkAction::Connect
            }

            LinkEvent::ConnectEstablished => {
                if self.state != LinkState::Connecting {
                    return LinkAction::None;
                }
                self.state = LinkState::Connected;
                let (session, action) = DiscoverySession::start();
                self.discovery = Some(session);
                match action {
                    DiscoveryAction::FindService(range) => LinkAction::FindService(range),
                    // start() only ever issues the service request.
                    _ => LinkAction::None,
                }
            }

            LinkEvent::ConnectFailed => {
                if self.state != LinkState::Connecting {
                    return LinkAction::None;
                }
                self.state = LinkState::Scanning;
                LinkAction::Rescan
            }

            LinkEvent::Discovery(ev) => {
                if self.state != LinkState::Connected {
                    return LinkAction::None;
                }
                let Some(session) = self.discovery.as_mut() else {
                    return LinkAction::None;
                };
                match session.on_event(ev, &mut self.subscriptions) {
                    DiscoveryAction::FindService(range) => LinkAction::FindService(range),
                    DiscoveryAction::FindCharacteristics(range) => {
                        LinkAction::FindCharacteristics(range)
                    }
                    DiscoveryAction::Subscribe {
                        token,
                        value_handle,
                        ccc_handle,
                    } => LinkAction::Subscribe {
                        token,
                        value_handle,
                        ccc_handle,
                    },
                    DiscoveryAction::Skipped => LinkAction::AttributeSkipped,
                    DiscoveryAction::Finished => {
                        self.discovery = None;
                        LinkAction::DiscoveryFinished
                    }
                    DiscoveryAction::None => LinkAction::None,
                }
            }

            LinkEvent::Notification { token, payload } => {
                match dispatch(&mut self.subscriptions, token, payload) {
                    DispatchOutcome::Output { index, value } => {
                        LinkAction::SetOutput { index, value }
                    }
                    DispatchOutcome::Stop => LinkAction::StopNotifications,
                    DispatchOutcome::Dropped => LinkAction::None,
                }
            }

            LinkEvent::Disconnected => {
                if self.state == LinkState::Scanning {
                    // Already released; keep the teardown idempotent.
                    return LinkAction::None;
                }
                self.state = LinkState::Scanning;
                self.discovery = None;
                self.subscriptions.clear_all();
                LinkAction::Rescan
            }
        }
    }
}

impl Default for CentralLink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::discovery::CharacteristicUuid;
    use crate::config::{BUTTON_CHAR_UUID_FIRST, BUTTON_SERVICE_UUID_LE, CHANNEL_COUNT};

    fn matching_adv() -> heapless::Vec<u8, 64> {
        let mut ad = heapless::Vec::new();
        ad.extend_from_slice(&[0x02, 0x01, 0x06, 0x11, 0x07]).unwrap();
        ad.extend_from_slice(&BUTTON_SERVICE_UUID_LE).unwrap();
        ad
    }

    /// Drive a link from scanning through a fully subscribed connection.
    fn connected_link() -> (CentralLink, heapless::Vec<SubscriptionToken, CHANNEL_COUNT>) {
        let mut link = CentralLink::new();
        let ad = matching_adv();
        assert_eq!(
            link.handle(LinkEvent::AdvReport {
                connectable: true,
                data: &ad,
            }),
            LinkAction::Connect
        );
        assert_eq!(
            link.handle(LinkEvent::ConnectEstablished),
            LinkAction::FindService(HandleRange::FULL)
        );
        assert_eq!(
            link.handle(LinkEvent::Discovery(DiscoveryEvent::ServiceFound {
                start_handle: 0x0010,
                end_handle: 0x0020,
            })),
            LinkAction::FindCharacteristics(HandleRange {
                start: 0x0011,
                end: 0x0020,
            })
        );

        let mut tokens = heapless::Vec::new();
        for i in 0..CHANNEL_COUNT {
            let value_handle = 0x0012 + 3 * i as u16;
            let action = link.handle(LinkEvent::Discovery(DiscoveryEvent::CharacteristicFound {
                uuid: CharacteristicUuid::Short(BUTTON_CHAR_UUID_FIRST + i as u16),
                value_handle,
            }));
            match action {
                LinkAction::Subscribe { token, .. } => tokens.push(token).unwrap(),
                other => panic!("expected subscribe, got {:?}", other),
            }
        }
        assert_eq!(
            link.handle(LinkEvent::Discovery(DiscoveryEvent::Complete)),
            LinkAction::DiscoveryFinished
        );
        assert_eq!(link.state(), LinkState::Connected);
        (link, tokens)
    }

    #[test]
    fn non_matching_advertisement_is_ignored() {
        let mut link = CentralLink::new();
        let action = link.handle(LinkEvent::AdvReport {
            connectable: true,
            data: &[0x02, 0x01, 0x06],
        });
        assert_eq!(action, LinkAction::None);
        assert_eq!(link.state(), LinkState::Scanning);
    }

    #[test]
    fn scan_response_style_report_is_ignored() {
        let mut link = CentralLink::new();
        let ad = matching_adv();
        let action = link.handle(LinkEvent::AdvReport {
            connectable: false,
            data: &ad,
        });
        assert_eq!(action, LinkAction::None);
    }

    #[test]
    fn matching_advertisement_connects_once() {
        let mut link = CentralLink::new();
        let ad = matching_adv();
        assert_eq!(
            link.handle(LinkEvent::AdvReport {
                connectable: true,
                data: &ad,
            }),
            LinkAction::Connect
        );
        assert_eq!(link.state(), LinkState::Connecting);
        // A second report while connecting must not start another attempt.
        assert_eq!(
            link.handle(LinkEvent::AdvReport {
                connectable: true,
                data: &ad,
            }),
            LinkAction::None
        );
    }

    #[test]
    fn connect_failure_resumes_scanning() {
        let mut link = CentralLink::new();
        let ad = matching_adv();
        link.handle(LinkEvent::AdvReport {
            connectable: true,
            data: &ad,
        });
        assert_eq!(link.handle(LinkEvent::ConnectFailed), LinkAction::Rescan);
        assert_eq!(link.state(), LinkState::Scanning);
    }

    #[test]
    fn notification_reaches_bound_output() {
        let (mut link, tokens) = connected_link();
        let action = link.handle(LinkEvent::Notification {
            token: tokens[1],
            payload: Some(&[1]),
        });
        assert_eq!(action, LinkAction::SetOutput { index: 1, value: 1 });
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let (mut link, tokens) = connected_link();
        assert_eq!(
            link.handle(LinkEvent::Notification {
                token: tokens[0],
                payload: None,
            }),
            LinkAction::StopNotifications
        );
        assert_eq!(
            link.handle(LinkEvent::Notification {
                token: tokens[0],
                payload: Some(&[1]),
            }),
            LinkAction::None
        );
    }

    #[test]
    fn disconnect_clears_state_and_rescans() {
        let (mut link, tokens) = connected_link();
        assert_eq!(link.handle(LinkEvent::Disconnected), LinkAction::Rescan);
        assert_eq!(link.state(), LinkState::Scanning);
        assert!(link.subscriptions().is_empty());

        // In-flight notification arriving after the disconnect is
        // dropped, not routed to a stale slot.
        assert_eq!(
            link.handle(LinkEvent::Notification {
                token: tokens[2],
                payload: Some(&[1]),
            }),
            LinkAction::None
        );

        // Double-release guard.
        assert_eq!(link.handle(LinkEvent::Disconnected), LinkAction::None);
    }

    #[test]
    fn disconnect_mid_discovery_clears_partial_state() {
        let mut link = CentralLink::new();
        let ad = matching_adv();
        link.handle(LinkEvent::AdvReport {
            connectable: true,
            data: &ad,
        });
        link.handle(LinkEvent::ConnectEstablished);
        link.handle(LinkEvent::Discovery(DiscoveryEvent::ServiceFound {
            start_handle: 0x0010,
            end_handle: 0x0020,
        }));
        // Two of four characteristics discovered, then the link drops.
        for i in 0..2u16 {
            link.handle(LinkEvent::Discovery(DiscoveryEvent::CharacteristicFound {
                uuid: CharacteristicUuid::Short(BUTTON_CHAR_UUID_FIRST + i),
                value_handle: 0x0012 + 3 * i,
            }));
        }
        assert_eq!(link.subscriptions().len(), 2);

        assert_eq!(link.handle(LinkEvent::Disconnected), LinkAction::Rescan);
        assert!(link.subscriptions().is_empty());
        assert_eq!(link.state(), LinkState::Scanning);

        // Discovery events straggling in after teardown do nothing.
        assert_eq!(
            link.handle(LinkEvent::Discovery(DiscoveryEvent::Complete)),
            LinkAction::None
        );
    }
}
