//! Hardware driver construction, abstracted away from `Application` the
//! same way `WifiTransport`/`MqttTransport`/`KvStore` are: `Application`
//! is generic over the board model and pin controller but never names a
//! concrete `esp-idf-hal` type, so building the actual `AnalogSensor`,
//! `PwmActuator`, etc. a config record names has to be delegated to
//! something `main.rs` supplies.

use trabajante_actuators::ActuatorDriver;
use trabajante_persistence::{ActuatorConfig, SensorConfig};
use trabajante_proto::ErrorCode;
use trabajante_sensors::SensorDriver;

/// Builds the concrete driver a persisted sensor/actuator record names.
/// Implementations are expected to reach into the same `PinController`
/// the arbiter reserved the pin through (e.g. via `Rc<RefCell<_>>>`
/// sharing) to pull out the live driver handle the reservation just
/// built, rather than claiming the pin a second time.
pub trait DeviceFactory {
    fn build_sensor(&mut self, cfg: &SensorConfig) -> Result<Box<dyn SensorDriver>, ErrorCode>;
    fn build_actuator(&mut self, cfg: &ActuatorConfig) -> Result<Box<dyn ActuatorDriver>, ErrorCode>;
}
