// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Trabajante agent entry point: brings up the board, wires every
//! platform adapter to its logic crate, and runs the cooperative tick
//! loop forever. Board selection is a compile-time feature
//! (`board-wroom` default, `board-c3` for the RISC-V variant) since the
//! pin map and ADC channel set differ per chip.

mod app;
mod device_factory;
mod platform;

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc;

use esp_idf_hal::adc::oneshot::AdcDriver;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::AnyIOPin;
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::ledc::config::TimerConfig;
use esp_idf_hal::ledc::LedcTimerDriver;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::prelude::*;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::log::EspLogger;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
use log::{info, warn};

use trabajante_gpio::{BoardModel, Esp32Wroom};
use trabajante_persistence::ConfigManager;
use trabajante_proto::payload::WillPayload;
use trabajante_proto::topics::publish;
use trabajante_proto::{EspId, DEFAULT_KAISER_ID};

use app::Application;
use device_factory::DeviceFactory;
use platform::{
    EspDeviceFactory, EspI2cTransport, EspMqttTransport, EspPinController, EspWifiTransport,
    NvsKvStore, PwmChannelBank, RawInbound,
};

#[cfg(feature = "board-wroom")]
const SENSOR_CAPACITY: usize = 20;
#[cfg(feature = "board-wroom")]
const ACTUATOR_CAPACITY: usize = 20;
#[cfg(feature = "board-c3")]
const SENSOR_CAPACITY: usize = 10;
#[cfg(feature = "board-c3")]
const ACTUATOR_CAPACITY: usize = 10;

fn main() -> anyhow::Result<()> {
    esp_idf_svc::sys::link_patches();
    EspLogger::initialize_default();
    info!("trabajante-firmware: booting");

    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;

    let board = Esp32Wroom;
    let (sda, scl) = board.i2c_pins();

    let nvs_store = NvsKvStore::new(nvs_partition);
    let mqtt_preview = preload_mqtt_broker_url(&nvs_store);

    let wifi = BlockingWifi::wrap(
        EspWifi::new(peripherals.modem, sys_loop.clone(), None)?,
        sys_loop,
    )?;
    let wifi_transport = EspWifiTransport::new(wifi);

    let esp_id = derive_esp_id();
    let will_topic = publish::will(DEFAULT_KAISER_ID, esp_id.as_str());
    let will_payload = serde_json::to_vec(&WillPayload::offline(0)).unwrap_or_default();

    let (inbound_tx, inbound_rx) = mpsc::channel::<RawInbound>();
    let mqtt_transport = EspMqttTransport::new(
        &mqtt_preview,
        esp_id.as_str(),
        &will_topic,
        &will_payload,
        inbound_tx,
    )?;

    let mut pins = peripherals.pins;
    let i2c_driver = I2cDriver::new(
        peripherals.i2c0,
        pins.gpio21,
        pins.gpio22,
        &I2cConfig::new().baudrate(100.kHz().into()),
    )?;
    let i2c_transport = EspI2cTransport::new(i2c_driver);
    debug_assert_eq!((sda, scl), (21, 22), "WROOM's fixed SDA/SCL pair");

    // Every remaining board-known pin is erased into the arbiter's
    // generic pool; gpio21/gpio22 (SDA/SCL) were already moved into the
    // shared I2C driver above and are never referenced again here. The
    // controller is shared with the device factory so a reservation the
    // arbiter just made can be turned into a concrete driver without
    // claiming the pin a second time.
    let erased = erase_wroom_pins(pins);
    let controller = Rc::new(RefCell::new(EspPinController::new(erased)));

    let adc = Rc::new(RefCell::new(AdcDriver::new(peripherals.adc1)?));

    let ledc = peripherals.ledc;
    let timer_config = TimerConfig::default().frequency(5.kHz().into());
    let timer = LedcTimerDriver::new(ledc.timer0, &timer_config)?;
    let pwm_bank = PwmChannelBank::new(
        timer,
        ledc.channel0,
        ledc.channel1,
        ledc.channel2,
        ledc.channel3,
        ledc.channel4,
        ledc.channel5,
    );

    let factory: Box<dyn DeviceFactory> = Box::new(EspDeviceFactory::new(
        controller.clone(),
        adc,
        i2c_transport,
        pwm_bank,
    ));

    let mut application = Application::boot(
        esp_id.clone(),
        DEFAULT_KAISER_ID.to_string(),
        board,
        controller,
        nvs_store,
        wifi_transport,
        mqtt_transport,
        factory,
        SENSOR_CAPACITY,
        ACTUATOR_CAPACITY,
    )?;

    replay_devices(&mut application);

    info!("trabajante-firmware: {esp_id} entering tick loop");
    loop {
        while let Ok(msg) = inbound_rx.try_recv() {
            application.on_inbound_mqtt(&msg.topic, msg.payload);
        }

        let heap_free = unsafe { esp_idf_sys::esp_get_free_heap_size() };
        let watchdog_ok = application.tick(uptime_seconds(), heap_free);
        if watchdog_ok {
            unsafe {
                esp_idf_sys::esp_task_wdt_reset();
            }
        } else {
            warn!("watchdog feed withheld: {:?}", application.readiness());
        }

        FreeRtos::delay_ms(1000);
    }
}

/// Reads the MQTT broker URL straight out of NVS before `Application` is
/// constructed, since the platform MQTT client must be built with a
/// broker URL at construction time rather than reconfigured later. Falls
/// back to a link-local default when the device hasn't been provisioned
/// yet; the first heartbeat will surface as unreachable until a real
/// broker config is pushed over `.../config`.
fn preload_mqtt_broker_url(store: &NvsKvStore) -> String {
    let mut cfg = ConfigManager::new();
    cfg.load(store);
    match cfg.mqtt {
        Some(mqtt) => format!("mqtt://{}:{}", mqtt.host, mqtt.port),
        None => "mqtt://localhost:1883".to_string(),
    }
}

fn derive_esp_id() -> EspId {
    let mut mac = [0u8; 6];
    unsafe {
        esp_idf_sys::esp_read_mac(mac.as_mut_ptr(), esp_idf_sys::esp_mac_type_t_ESP_MAC_WIFI_STA);
    }
    EspId::from_mac(mac)
}

fn uptime_seconds() -> u64 {
    unsafe { (esp_idf_sys::esp_timer_get_time() / 1_000_000) as u64 }
}

/// Moves every `Esp32Wroom::known_pins()` GPIO out of the typed
/// `Peripherals::pins` struct (except GPIO21/22, already moved into the
/// shared I2C driver by the caller) and erases it to `AnyIOPin`.
/// `esp-idf-hal` exposes one distinct field per physical pin rather than
/// a runtime lookup, so this enumerates the board's known pins by hand.
fn erase_wroom_pins(pins: esp_idf_hal::gpio::Pins) -> Vec<(u8, AnyIOPin)> {
    vec![
        (0, pins.gpio0.into()),
        (1, pins.gpio1.into()),
        (2, pins.gpio2.into()),
        (3, pins.gpio3.into()),
        (4, pins.gpio4.into()),
        (5, pins.gpio5.into()),
        (12, pins.gpio12.into()),
        (13, pins.gpio13.into()),
        (14, pins.gpio14.into()),
        (15, pins.gpio15.into()),
        (16, pins.gpio16.into()),
        (17, pins.gpio17.into()),
        (18, pins.gpio18.into()),
        (19, pins.gpio19.into()),
        (23, pins.gpio23.into()),
        (25, pins.gpio25.into()),
        (26, pins.gpio26.into()),
        (27, pins.gpio27.into()),
        (32, pins.gpio32.into()),
        (33, pins.gpio33.into()),
        (34, pins.gpio34.into()),
        (35, pins.gpio35.into()),
        (36, pins.gpio36.into()),
        (39, pins.gpio39.into()),
    ]
}

type Firmware = Application<
    Esp32Wroom,
    Rc<RefCell<EspPinController<'static>>>,
    EspWifiTransport<'static>,
    EspMqttTransport,
    NvsKvStore,
>;

/// Replays every persisted sensor and actuator record through the same
/// `apply_sensor_config`/`apply_actuator_config` path a runtime `.../config`
/// push uses, in zone-deterministic (ascending GPIO) order, so boot-time
/// replay and a live config push can never drift into constructing a
/// device differently.
fn replay_devices(app: &mut Firmware) {
    let sensor_cfgs: Vec<_> = app.config().sensors_in_replay_order().into_iter().cloned().collect();
    for cfg in sensor_cfgs {
        let label = cfg.gpio.map(|g| g.to_string()).unwrap_or_else(|| cfg.sensor_type.clone());
        if let Err(err) = app.apply_sensor_config(cfg) {
            warn!("sensor {label}: driver construction failed during replay ({err})");
        }
    }

    let actuator_cfgs: Vec<_> = app.config().actuators_in_replay_order().into_iter().cloned().collect();
    for cfg in actuator_cfgs {
        let gpio = cfg.gpio;
        if let Err(err) = app.apply_actuator_config(cfg) {
            warn!("actuator gpio={gpio}: driver construction failed during replay ({err})");
        }
    }
}
