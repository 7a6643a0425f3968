//! Passive advertisement logger.
//!
//! No filtering, no connections: every non-scan-response advertisement
//! is printed as one `len,payload` line (decimal payload length, then
//! up to 64 payload bytes as bare uppercase hex), after a one-time
//! header naming the columns.

#![no_std]
#![no_main]

use defmt_rtt as _; // global logger
use panic_probe as _;

use core::mem;

use defmt::{info, unwrap, warn};
use embassy_executor::Spawner;
use embassy_nrf::interrupt::Priority;
use nrf_softdevice::ble::central;
use nrf_softdevice::{raw, Softdevice};

use btnlink::ble::scan_log::{format_report, SCAN_LOG_HEADER};
use btnlink::config::{BLE_SCAN_INTERVAL, BLE_SCAN_WINDOW};

const DEVICE_NAME: &str = "btnlink-scanner";

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
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
    let mut config = embassy_nrf::config::Config::default();
    config.gpiote_interrupt_priority = Priority::P2;
    config.time_interrupt_priority = Priority::P2;
    let _p = embassy_nrf::init(config);

    let sd = Softdevice::enable(&softdevice_config());
    unwrap!(spawner.spawn(softdevice_task(sd)));

    info!("{}", SCAN_LOG_HEADER);

    let config = central::ScanConfig {
        interval: BLE_SCAN_INTERVAL as u32,
        window: BLE_SCAN_WINDOW as u32,
        ..Default::default()
    };

    loop {
        let res = central::scan(sd, &config, |params| {
            // Scan responses are not advertisements; skip them.
            if params.type_.scan_response() != 0 {
                return None;
            }
            let data = unsafe {
                core::slice::from_raw_parts(params.data.p_data, params.data.len as usize)
            };
            let line = format_report(data);
            info!("{}", line.as_str());
            None::<()>
        })
        .await;

        if let Err(e) = res {
            warn!("scan ended with error {:?}, restarting", e);
        }
    }
}
