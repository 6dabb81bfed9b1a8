//! Sensor registry and tick scheduling (spec §4.3).

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use log::warn;
use trabajante_proto::payload::{Quality, SensorReading};
use trabajante_proto::ErrorCode;

use crate::driver::{Interface, SensorDriver};

/// After this many consecutive read failures a sensor is considered
/// degraded and falls back to [`DEGRADED_PERIOD_MULTIPLIER`] its normal
/// sampling period until a read succeeds again.
pub const DEFAULT_DEGRADE_THRESHOLD: u32 = 5;
pub const DEGRADED_PERIOD_MULTIPLIER: u64 = 4;

/// Soft per-tick read budget (spec.md §4.3): once this much wall-clock
/// time has been spent reading due sensors in a single `tick()` call,
/// any sensors still due defer to the next tick rather than push the
/// cooperative loop's latency out further.
pub const DEFAULT_TICK_BUDGET: Duration = Duration::from_millis(20);

pub struct SensorSlot {
    pub gpio: Option<u8>,
    pub zone_id: Option<String>,
    pub raw_mode: bool,
    pub period_seconds: u64,
    pub degrade_threshold: u32,
    pub driver: Box<dyn SensorDriver>,
    last_read_ts: u64,
    consecutive_failures: u32,
    degraded: bool,
}

impl SensorSlot {
    fn effective_period(&self) -> u64 {
        if self.degraded {
            self.period_seconds * DEGRADED_PERIOD_MULTIPLIER
        } else {
            self.period_seconds
        }
    }

    fn due(&self, now: u64) -> bool {
        now.saturating_sub(self.last_read_ts) >= self.effective_period()
    }
}

/// Bounded sensor registry. `capacity` mirrors spec.md's board-dependent
/// `MAX_SENSORS` (10 on C3, 20 on WROOM).
pub struct SensorManager {
    capacity: usize,
    esp_id: String,
    slots: Vec<SensorSlot>,
}

impl SensorManager {
    pub fn new(capacity: usize, esp_id: impl Into<String>) -> Self {
        Self {
            capacity,
            esp_id: esp_id.into(),
            slots: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn register(
        &mut self,
        gpio: Option<u8>,
        zone_id: Option<String>,
        raw_mode: bool,
        period_seconds: u64,
        mut driver: Box<dyn SensorDriver>,
    ) -> Result<(), ErrorCode> {
        if self.slots.len() >= self.capacity {
            return Err(ErrorCode::SensorLimitExceeded);
        }
        driver.begin()?;
        self.slots.push(SensorSlot {
            gpio,
            zone_id,
            raw_mode,
            period_seconds,
            degrade_threshold: DEFAULT_DEGRADE_THRESHOLD,
            driver,
            last_read_ts: 0,
            consecutive_failures: 0,
            degraded: false,
        });
        Ok(())
    }

    pub fn remove(&mut self, gpio: u8) -> bool {
        if let Some(idx) = self.slots.iter().position(|s| s.gpio == Some(gpio)) {
            self.slots[idx].driver.end();
            self.slots.remove(idx);
            true
        } else {
            false
        }
    }

    pub fn degraded_sensors(&self) -> impl Iterator<Item = &SensorSlot> {
        self.slots.iter().filter(|s| s.degraded)
    }

    /// Samples every slot whose period has elapsed, in registration order,
    /// up to [`DEFAULT_TICK_BUDGET`] of wall-clock time; any sensor still
    /// due once the budget is spent is left due and picked up on the next
    /// tick instead. A failed read still produces a reading (quality
    /// `invalid`) so the server sees the miss rather than silence; it also
    /// increments the slot's failure counter and flips it into degraded
    /// mode once `degrade_threshold` consecutive misses accumulate.
    pub fn tick(&mut self, now: u64) -> Vec<SensorReading> {
        let started = Instant::now();
        let mut out = Vec::new();
        for slot in self.slots.iter_mut() {
            if !slot.due(now) {
                continue;
            }
            if started.elapsed() >= DEFAULT_TICK_BUDGET {
                break;
            }
            slot.last_read_ts = now;
            match slot.driver.read() {
                Ok(reading) => {
                    slot.consecutive_failures = 0;
                    slot.degraded = false;
                    out.push(SensorReading {
                        esp_id: self.esp_id.clone(),
                        zone_id: slot.zone_id.clone(),
                        gpio: slot.gpio,
                        sensor_type: slot.driver.sensor_type().to_string(),
                        raw: reading.raw,
                        value: 0.0,
                        unit: String::new(),
                        quality: Quality::Good,
                        ts: now,
                        raw_mode: slot.raw_mode,
                        secondary: reading.secondary,
                    });
                }
                Err(err) => {
                    slot.consecutive_failures += 1;
                    if slot.consecutive_failures >= slot.degrade_threshold {
                        slot.degraded = true;
                    }
                    warn!(
                        "sensor gpio={:?} type={}: read failed ({err}), {} consecutive",
                        slot.gpio,
                        slot.driver.sensor_type(),
                        slot.consecutive_failures
                    );
                    out.push(SensorReading {
                        esp_id: self.esp_id.clone(),
                        zone_id: slot.zone_id.clone(),
                        gpio: slot.gpio,
                        sensor_type: slot.driver.sensor_type().to_string(),
                        raw: 0.0,
                        value: 0.0,
                        unit: String::new(),
                        quality: Quality::Invalid,
                        ts: now,
                        raw_mode: slot.raw_mode,
                        secondary: BTreeMap::new(),
                    });
                }
            }
        }
        out
    }
}

/// Returns the `(interface_type, sensor_type)` pair's canonical driver
/// kind string for diagnostics and config echo — not a runtime dispatch
/// table (driver construction needs the real hardware handles, so that
/// happens in `trabajante-firmware`'s config-apply path).
pub fn driver_kind(interface: Interface, sensor_type: &str) -> &'static str {
    match (interface, sensor_type) {
        (Interface::I2c, "sht31") => "sht31",
        (Interface::I2c, "bme280") => "bme280",
        (Interface::OneWire, _) => "ds18b20",
        (Interface::I2c, _) => "generic_i2c",
        (Interface::Analog, _) => "analog_passthrough",
        (Interface::Digital, _) => "digital_passthrough",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::Reading;
    use std::cell::Cell;

    struct ScriptedDriver {
        sensor_type: &'static str,
        fail: Cell<bool>,
    }

    impl SensorDriver for ScriptedDriver {
        fn begin(&mut self) -> Result<(), ErrorCode> {
            Ok(())
        }
        fn end(&mut self) {}
        fn read(&mut self) -> Result<Reading, ErrorCode> {
            if self.fail.get() {
                Err(ErrorCode::SensorReadFailed)
            } else {
                Ok(Reading {
                    raw: 42.0,
                    secondary: Default::default(),
                })
            }
        }
        fn sensor_type(&self) -> &str {
            self.sensor_type
        }
        fn interface(&self) -> Interface {
            Interface::Analog
        }
    }

    #[test]
    fn registering_past_capacity_is_rejected() {
        let mut mgr = SensorManager::new(1, "ESP_1");
        mgr.register(
            Some(1),
            None,
            true,
            5,
            Box::new(ScriptedDriver {
                sensor_type: "ph",
                fail: Cell::new(false),
            }),
        )
        .unwrap();
        let err = mgr
            .register(
                Some(2),
                None,
                true,
                5,
                Box::new(ScriptedDriver {
                    sensor_type: "ph",
                    fail: Cell::new(false),
                }),
            )
            .unwrap_err();
        assert_eq!(err, ErrorCode::SensorLimitExceeded);
    }

    #[test]
    fn tick_samples_only_due_sensors_and_timestamps_are_monotonic() {
        let mut mgr = SensorManager::new(4, "ESP_1");
        mgr.register(
            Some(34),
            None,
            true,
            5,
            Box::new(ScriptedDriver {
                sensor_type: "ph",
                fail: Cell::new(false),
            }),
        )
        .unwrap();

        let first = mgr.tick(100);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].ts, 100);

        let too_soon = mgr.tick(102);
        assert!(too_soon.is_empty());

        let second = mgr.tick(105);
        assert_eq!(second.len(), 1);
        assert!(second[0].ts >= first[0].ts);
    }

    #[test]
    fn failed_reads_publish_invalid_quality_and_degrade_after_threshold() {
        let mut mgr = SensorManager::new(4, "ESP_1");
        mgr.register(
            Some(5),
            None,
            true,
            1,
            Box::new(ScriptedDriver {
                sensor_type: "ph",
                fail: Cell::new(true),
            }),
        )
        .unwrap();

        let mut now = 0;
        for _ in 0..DEFAULT_DEGRADE_THRESHOLD {
            let readings = mgr.tick(now);
            assert_eq!(readings[0].quality, Quality::Invalid);
            now += 1;
        }
        assert_eq!(mgr.degraded_sensors().count(), 1);
    }

    #[test]
    fn removing_an_unregistered_gpio_returns_false() {
        let mut mgr = SensorManager::new(4, "ESP_1");
        assert!(!mgr.remove(99));
    }
}
