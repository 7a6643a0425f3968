//! Button board firmware (BLE peripheral).
//!
//! Advertises the button service and, once a central connects, pushes a
//! 1-byte notification on the matching characteristic every time a
//! button changes state. The connection loop owns the last-known level
//! of each button and replays it when a central enables notifications;
//! the button tasks only report edges.

#![no_std]
#![no_main]

use defmt_rtt as _; // global logger
use panic_probe as _;

use core::cell::RefCell;
use core::mem;

use defmt::{info, unwrap, warn};
use embassy_executor::Spawner;
use embassy_futures::select::{select, Either};
use embassy_nrf::gpio::{AnyPin, Input, Pin, Pull};
use embassy_nrf::interrupt::Priority;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Duration, Timer};
use nrf_softdevice::ble::advertisement_builder::{
    Flag, LegacyAdvertisementBuilder, LegacyAdvertisementPayload, ServiceList,
};
use nrf_softdevice::ble::{gatt_server, peripheral};
use nrf_softdevice::{raw, Softdevice};
use static_cell::StaticCell;

use btnlink::config::{BUTTON_DEBOUNCE_MS, BUTTON_SERVICE_UUID, CHANNEL_COUNT};

const DEVICE_NAME: &str = "btnlink-buttons";

/// One debounced button edge: which input, and its new level.
#[derive(Clone, Copy)]
struct ButtonSample {
    index: usize,
    level: u8,
}

static BUTTON_SAMPLES: Channel<CriticalSectionRawMutex, ButtonSample, 8> = Channel::new();

/// The button service: four notify-only 1-byte characteristics, short
/// UUIDs 0x0001..0x0004 in channel order.
#[nrf_softdevice::gatt_service(uuid = "bdfc9792-8234-405e-ae02-35ef4174b299")]
struct ButtonService {
    #[characteristic(uuid = "0001", notify)]
    button1: u8,
    #[characteristic(uuid = "0002", notify)]
    button2: u8,
    #[characteristic(uuid = "0003", notify)]
    button3: u8,
    #[characteristic(uuid = "0004", notify)]
    button4: u8,
}

#[nrf_softdevice::gatt_server]
struct Server {
    buttons: ButtonService,
}

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

/// Watch one button (active-low with pull-up) and report debounced
/// edges. Both press and release are reported.
#[embassy_executor::task(pool_size = CHANNEL_COUNT)]
async fn button_task(pin: AnyPin, index: usize) {
    let mut btn = Input::new(pin, Pull::Up);
    let mut last_level = 0u8;

    loop {
        btn.wait_for_any_edge().await;
        Timer::after(Duration::from_millis(BUTTON_DEBOUNCE_MS)).await;

        let level = if btn.is_low() { 1 } else { 0 };
        if level != last_level {
            last_level = level;
            BUTTON_SAMPLES.send(ButtonSample { index, level }).await;
        }
    }
}

/// Push one button's last-known level to the characteristic with the
/// same index.
fn notify_button(server: &Server, conn: &nrf_softdevice::ble::Connection, index: usize, level: u8) {
    let res = match index {
        0 => server.buttons.button1_notify(conn, &level),
        1 => server.buttons.button2_notify(conn, &level),
        2 => server.buttons.button3_notify(conn, &level),
        _ => server.buttons.button4_notify(conn, &level),
    };
    match res {
        Ok(()) => info!("notified button {}: state {}", index + 1, level),
        // Typically the central has not enabled notifications yet.
        Err(e) => warn!("notify button {} failed ({:?})", index + 1, e),
    }
}

fn softdevice_config() -> nrf_softdevice::Config {
    nrf_softdevice::Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t { att_mtu: 128 }),
        gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t {
            attr_tab_size: raw::BLE_GATTS_ATTR_TAB_SIZE_DEFAULT,
        }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 1,
            central_role_count: 0,
            central_sec_count: 0,
            _bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: DEVICE_NAME.as_ptr() as _,
            current_len: DEVICE_NAME.len() as u16,
            max_len: DEVICE_NAME.len() as u16,
            write_perm: unsafe { mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        ..Default::default()
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("button board starting");

    let mut config = embassy_nrf::config::Config::default();
    config.gpiote_interrupt_priority = Priority::P2;
    config.time_interrupt_priority = Priority::P2;
    let p = embassy_nrf::init(config);

    let sd = Softdevice::enable(&softdevice_config());
    static SERVER: StaticCell<Server> = StaticCell::new();
    let server = SERVER.init(unwrap!(Server::new(sd)));
    unwrap!(spawner.spawn(softdevice_task(sd)));

    unwrap!(spawner.spawn(button_task(p.P0_11.degrade(), 0)));
    unwrap!(spawner.spawn(button_task(p.P0_12.degrade(), 1)));
    unwrap!(spawner.spawn(button_task(p.P0_24.degrade(), 2)));
    unwrap!(spawner.spawn(button_task(p.P0_25.degrade(), 3)));

    static ADV_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
        .flags(&[Flag::GeneralDiscovery, Flag::LE_Only])
        .services_128(ServiceList::Complete, &[BUTTON_SERVICE_UUID.to_le_bytes()])
        .build();
    static SCAN_DATA: LegacyAdvertisementPayload =
        LegacyAdvertisementBuilder::new().full_name(DEVICE_NAME).build();

    // Last-known level per button, kept across connections and
    // replayed whenever a central enables notifications.
    let levels: RefCell<[u8; CHANNEL_COUNT]> = RefCell::new([0; CHANNEL_COUNT]);

    loop {
        let adv = peripheral::ConnectableAdvertisement::ScannableUndirected {
            adv_data: &ADV_DATA,
            scan_data: &SCAN_DATA,
        };
        let config = peripheral::Config::default();
        let conn = match peripheral::advertise_connectable(sd, adv, &config).await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("advertising failed ({:?}), retrying", e);
                continue;
            }
        };
        info!("central connected");

        // Serve GATT events and relay button edges until disconnect.
        // A CCCD enable replays the stored level so the central's
        // output matches the button state from the first notification.
        let server_fut = gatt_server::run(&conn, server, |e| match e {
            ServerEvent::Buttons(e) => {
                let (index, notifications) = match e {
                    ButtonServiceEvent::Button1CccdWrite { notifications } => (0, notifications),
                    ButtonServiceEvent::Button2CccdWrite { notifications } => (1, notifications),
                    ButtonServiceEvent::Button3CccdWrite { notifications } => (2, notifications),
                    ButtonServiceEvent::Button4CccdWrite { notifications } => (3, notifications),
                };
                if notifications {
                    notify_button(server, &conn, index, levels.borrow()[index]);
                } else {
                    info!("notifications disabled for button {}", index + 1);
                }
            }
        });

        let notify_fut = async {
            loop {
                let sample = BUTTON_SAMPLES.receive().await;
                levels.borrow_mut()[sample.index] = sample.level;
                notify_button(server, &conn, sample.index, sample.level);
            }
        };

        match select(server_fut, notify_fut).await {
            Either::First(e) => info!("disconnected ({:?}), advertising again", e),
            Either::Second(never) => never,
        }
    }
}
