//! Stable identifiers: device id, zone/subzone slugs, kaiser (server) id.

use std::fmt;

/// `ESP_` followed by 8 uppercase hex characters, derived once from the
/// station MAC address and persisted forever after (see DESIGN.md for the
/// byte-selection rule this resolves from spec.md's open question).
#[derive(Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub struct EspId(String);

impl EspId {
    /// Derives the device id from the last four bytes of a 6-byte MAC
    /// address. The first two bytes of an ESP32 MAC are the Espressif OUI
    /// and are shared by every device from the same manufacturing lot, so
    /// they contribute no entropy; the last four are unique per chip.
    pub fn from_mac(mac: [u8; 6]) -> Self {
        Self(format!(
            "ESP_{:02X}{:02X}{:02X}{:02X}",
            mac[2], mac[3], mac[4], mac[5]
        ))
    }

    /// Parses a previously-generated id, validating its shape. Used when
    /// loading the `device` namespace back out of persistent storage.
    pub fn parse(s: &str) -> Option<Self> {
        let hex = s.strip_prefix("ESP_")?;
        if hex.len() == 8 && hex.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_lowercase())
        {
            Some(Self(s.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EspId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of the central control server; defaults to `"god"` when the
/// `mqtt` namespace doesn't specify one.
pub const DEFAULT_KAISER_ID: &str = "god";

/// Validates the zone_id / subzone_id slug shape: lowercase ASCII
/// alphanumeric, underscore, or hyphen.
pub fn is_valid_slug(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| {
            b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-'
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_esp_id_from_mac_tail() {
        let id = EspId::from_mac([0x24, 0x6f, 0x12, 0xab, 0x34, 0xcd]);
        assert_eq!(id.as_str(), "ESP_12AB34CD");
    }

    #[test]
    fn parses_valid_ids_and_rejects_malformed_ones() {
        assert!(EspId::parse("ESP_12AB34CD").is_some());
        assert!(EspId::parse("esp_12ab34cd").is_none());
        assert!(EspId::parse("ESP_12AB34").is_none());
        assert!(EspId::parse("WRONG_12AB34CD").is_none());
    }

    #[test]
    fn slug_validation() {
        assert!(is_valid_slug("zelt_1"));
        assert!(is_valid_slug("main-zone"));
        assert!(!is_valid_slug("Zelt_1"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("zelt 1"));
    }
}
