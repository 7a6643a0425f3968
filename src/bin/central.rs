//! LED board firmware (BLE central).
//!
//! Scans for the button board's advertisement, connects, discovers the
//! button service, subscribes to all four notify characteristics and
//! mirrors every notification onto the LED with the same index. Any
//! disconnect or failed attempt falls back to scanning.
//!
//! The protocol rules live in the `btnlink` library; this binary is the
//! SoftDevice and GPIO wiring around them.

#![no_std]
#![no_main]

use defmt_rtt as _; // global logger
use panic_probe as _;

use core::cell::RefCell;
use core::mem;

use defmt::{info, unwrap, warn};
use embassy_executor::Spawner;
use embassy_nrf::gpio::{AnyPin, Level, Output, OutputDrive, Pin};
use embassy_nrf::interrupt::Priority;
use nrf_softdevice::ble::{central, gatt_client, Address};
use nrf_softdevice::{raw, Softdevice};
use static_cell::StaticCell;

use btnlink::ble::adv_filter::contains_service_uuid;
use btnlink::config::{
    BLE_CONN_INTERVAL_MAX, BLE_CONN_INTERVAL_MIN, BLE_SCAN_INTERVAL, BLE_SCAN_WINDOW,
    BLE_SLAVE_LATENCY, BLE_SUP_TIMEOUT, BUTTON_SERVICE_UUID_LE, CHANNEL_COUNT,
};
use btnlink::error::{BleError, Error};

const DEVICE_NAME: &str = "btnlink-central";

/// GATT client for the button service. The macro generates discovery,
/// CCCD write helpers and the notification event enum; characteristic
/// order here fixes the slot order (slot index = LED index).
#[nrf_softdevice::gatt_client(uuid = "bdfc9792-8234-405e-ae02-35ef4174b299")]
struct ButtonBoardClient {
    #[characteristic(uuid = "0001", notify)]
    button1: u8,
    #[characteristic(uuid = "0002", notify)]
    button2: u8,
    #[characteristic(uuid = "0003", notify)]
    button3: u8,
    #[characteristic(uuid = "0004", notify)]
    button4: u8,
}

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

/// Passive scan until a connectable advertisement carrying the button
/// service UUID is seen; returns the advertiser's address.
async fn scan_for_button_board(sd: &Softdevice) -> Result<Address, Error> {
    let config = central::ScanConfig {
        interval: BLE_SCAN_INTERVAL as u32,
        window: BLE_SCAN_WINDOW as u32,
        ..Default::default()
    };

    let addr = central::scan(sd, &config, |params| {
        if params.type_.connectable() == 0 || params.type_.scan_response() != 0 {
            return None;
        }
        let data =
            unsafe { core::slice::from_raw_parts(params.data.p_data, params.data.len as usize) };
        if contains_service_uuid(data, &BUTTON_SERVICE_UUID_LE) {
            // Returning Some stops the scan before we connect.
            Some(Address::from_raw(params.peer_addr))
        } else {
            None
        }
    })
    .await
    .map_err(|_| BleError::ScanFailed)?;

    info!("button board found at {:?}, will connect", addr);
    Ok(addr)
}

/// Set one LED from a notification value. DK LEDs are active-low.
fn set_led(leds: &RefCell<[Output<'static>; CHANNEL_COUNT]>, index: usize, state: u8) {
    info!("notif: button {} -> value {}", index + 1, state);
    let mut leds = leds.borrow_mut();
    if state != 0 {
        leds[index].set_low();
    } else {
        leds[index].set_high();
    }
}

/// One connection's lifetime: connect, discover, subscribe, then relay
/// notifications until the link drops.
async fn connect_and_mirror(
    sd: &Softdevice,
    addr: Address,
    leds: &RefCell<[Output<'static>; CHANNEL_COUNT]>,
) -> Result<(), Error> {
    let whitelist = [&addr];
    let config = central::ConnectConfig {
        scan_config: central::ScanConfig {
            whitelist: Some(&whitelist),
            ..Default::default()
        },
        conn_params: raw::ble_gap_conn_params_t {
            min_conn_interval: BLE_CONN_INTERVAL_MIN,
            max_conn_interval: BLE_CONN_INTERVAL_MAX,
            slave_latency: BLE_SLAVE_LATENCY,
            conn_sup_timeout: BLE_SUP_TIMEOUT,
        },
        ..Default::default()
    };

    let conn = central::connect(sd, &config)
        .await
        .map_err(|_| BleError::ConnectFailed)?;
    info!("connected");

    let client: ButtonBoardClient = gatt_client::discover(&conn)
        .await
        .map_err(|_| Error::ServiceNotFound)?;
    info!("button service discovered");

    // Enable notifications in slot order 0..3. A failed CCCD write on
    // one characteristic leaves the others running; a link with no
    // working subscription at all is useless and gets torn down.
    let mut subscribed = 0;
    for (i, res) in [
        client.button1_cccd_write(true).await,
        client.button2_cccd_write(true).await,
        client.button3_cccd_write(true).await,
        client.button4_cccd_write(true).await,
    ]
    .into_iter()
    .enumerate()
    {
        match res {
            Ok(()) => {
                info!("subscribed to button {}", i + 1);
                subscribed += 1;
            }
            Err(e) => warn!("subscribe to button {} failed ({:?})", i + 1, e),
        }
    }
    if subscribed == 0 {
        return Err(BleError::SubscribeFailed.into());
    }

    // Runs until disconnect; each notification is a 1-byte value.
    gatt_client::run(&conn, &client, |event| match event {
        ButtonBoardClientEvent::Button1Notification(state) => set_led(leds, 0, state),
        ButtonBoardClientEvent::Button2Notification(state) => set_led(leds, 1, state),
        ButtonBoardClientEvent::Button3Notification(state) => set_led(leds, 2, state),
        ButtonBoardClientEvent::Button4Notification(state) => set_led(leds, 3, state),
    })
    .await;

    info!("disconnected");
    Ok(())
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
            periph_role_count: 0,
            central_role_count: 1,
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
    info!("LED board starting");

    // Keep app interrupts below the SoftDevice's reserved priorities.
    let mut config = embassy_nrf::config::Config::default();
    config.gpiote_interrupt_priority = Priority::P2;
    config.time_interrupt_priority = Priority::P2;
    let p = embassy_nrf::init(config);

    let sd = Softdevice::enable(&softdevice_config());
    unwrap!(spawner.spawn(softdevice_task(sd)));

    fn led(pin: AnyPin) -> Output<'static> {
        // Inactive at boot; DK LEDs are active-low.
        Output::new(pin, Level::High, OutputDrive::Standard)
    }
    static LEDS: StaticCell<RefCell<[Output<'static>; CHANNEL_COUNT]>> = StaticCell::new();
    let leds = LEDS.init(RefCell::new([
        led(p.P0_13.degrade()),
        led(p.P0_14.degrade()),
        led(p.P0_15.degrade()),
        led(p.P0_16.degrade()),
    ]));

    loop {
        info!("scanning for button board");
        // Every failure mode recovers the same way: back to scanning.
        let addr = match scan_for_button_board(sd).await {
            Ok(addr) => addr,
            Err(e) => {
                warn!("scan failed ({:?}), retrying", e);
                continue;
            }
        };
        if let Err(e) = connect_and_mirror(sd, addr, leds).await {
            warn!("link attempt failed ({:?}), resuming scan", e);
        }
    }
}
