//! The flat numeric error taxonomy from the system error-handling design:
//! a fixed category encoded in the error code's leading digit, shared by
//! every subsystem so a server or test harness can tell validation
//! rejections from hardware failures at a glance.

use thiserror::Error;

/// Broad category derived from an [`ErrorCode`]'s numeric range.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorCategory {
    Hardware,
    Service,
    Communication,
    Application,
}

/// Severity levels surfaced on `.../system/diagnostics` and `.../system/error`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

/// A single error condition recognized by the firmware. The discriminant
/// is the wire-visible numeric code; category is derived from its range
/// rather than stored separately, so the two can never drift apart.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
#[repr(u16)]
pub enum ErrorCode {
    #[error("GPIO reserved by system")]
    GpioReserved = 1001,
    #[error("GPIO already reserved by another owner")]
    GpioConflict = 1002,
    #[error("GPIO safe-mode initialization failed")]
    GpioInitFailed = 1003,
    #[error("GPIO invalid for requested role")]
    GpioInvalidMode = 1004,
    #[error("I2C device not found at configured address")]
    I2cDeviceNotFound = 1011,
    #[error("I2C bus error (SDA/SCL stuck)")]
    I2cBusError = 1014,
    #[error("OneWire device not found after retry budget")]
    OnewireDeviceNotFound = 1026,
    #[error("OneWire ROM failed CRC validation")]
    OnewireInvalidRomCrc = 1027,
    #[error("PWM channel pool exhausted")]
    PwmChannelFull = 1031,
    #[error("sensor read failed")]
    SensorReadFailed = 1040,
    #[error("sensor registry full")]
    SensorLimitExceeded = 1041,
    #[error("actuator hardware set failed")]
    ActuatorSetFailed = 1050,
    #[error("actuator driver failed to initialize")]
    ActuatorInitFailed = 1051,
    #[error("actuator registry full")]
    ActuatorLimitExceeded = 1052,

    #[error("NVS read failed")]
    NvsReadFailed = 2002,
    #[error("NVS write failed")]
    NvsWriteFailed = 2003,
    #[error("persisted configuration failed validation")]
    ConfigInvalid = 2010,
    #[error("persisted configuration missing required field")]
    ConfigMissing = 2011,
    #[error("subzone GPIO overlaps another subzone")]
    SubzoneGpioConflict = 2501,

    #[error("WiFi connect attempt timed out")]
    WifiConnectTimeout = 3002,
    #[error("WiFi connect attempt failed")]
    WifiConnectFailed = 3003,
    #[error("MQTT publish failed")]
    MqttPublishFailed = 3012,
    #[error("MQTT offline buffer full")]
    MqttBufferFull = 3015,

    #[error("command payload invalid")]
    CommandInvalid = 4020,
    #[error("payload failed to parse")]
    PayloadParseFailed = 4032,
    #[error("memory exhausted")]
    MemoryFull = 4040,
    #[error("watchdog feed timed out")]
    WatchdogTimeout = 4070,
}

impl ErrorCode {
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn category(self) -> ErrorCategory {
        match self.code() {
            1000..=1999 => ErrorCategory::Hardware,
            2000..=2999 => ErrorCategory::Service,
            3000..=3999 => ErrorCategory::Communication,
            4000..=4999 => ErrorCategory::Application,
            _ => unreachable!("error codes are partitioned by construction"),
        }
    }
}

/// String codes used specifically in `ConfigResponse.errors[].code`, per
/// the configuration acknowledgement contract. Kept distinct from
/// [`ErrorCode`] because the server-facing contract for config replies is
/// defined in terms of these names, not the numeric taxonomy.
#[derive(Copy, Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfigErrorCode {
    JsonParseError,
    ValidationFailed,
    GpioConflict,
    NvsWriteFailed,
    TypeMismatch,
    MissingField,
    OutOfRange,
    UnknownError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_ranges_match_the_taxonomy() {
        assert_eq!(ErrorCode::GpioConflict.category(), ErrorCategory::Hardware);
        assert_eq!(ErrorCode::ConfigInvalid.category(), ErrorCategory::Service);
        assert_eq!(
            ErrorCode::MqttPublishFailed.category(),
            ErrorCategory::Communication
        );
        assert_eq!(
            ErrorCode::WatchdogTimeout.category(),
            ErrorCategory::Application
        );
    }

    #[test]
    fn codes_match_the_spec_numbers() {
        assert_eq!(ErrorCode::GpioConflict.code(), 1002);
        assert_eq!(ErrorCode::SensorReadFailed.code(), 1040);
        assert_eq!(ErrorCode::NvsWriteFailed.code(), 2003);
        assert_eq!(ErrorCode::WifiConnectFailed.code(), 3003);
        assert_eq!(ErrorCode::CommandInvalid.code(), 4020);
    }
}
