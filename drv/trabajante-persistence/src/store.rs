//! The `KvStore` contract (spec §4.5). Namespaces survive independent
//! clearing and each value is expected to stay well under 4 KB; there is
//! no streaming API because nothing persisted here needs one.

use std::collections::BTreeMap;

use trabajante_proto::ErrorCode;

pub trait KvStore {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, ErrorCode>;
    fn set(&mut self, namespace: &str, key: &str, value: &[u8]) -> Result<(), ErrorCode>;
    fn remove(&mut self, namespace: &str, key: &str) -> Result<(), ErrorCode>;
    fn clear_namespace(&mut self, namespace: &str) -> Result<(), ErrorCode>;
    fn keys(&self, namespace: &str) -> Vec<String>;
}

/// In-memory `KvStore`, used in tests and as the host-side stand-in for
/// `NvsKvStore` (the real `esp_idf_svc::nvs::EspNvs`-backed implementation
/// lives in `trabajante-firmware`, which is the only crate that can
/// depend on esp-idf).
#[derive(Default)]
pub struct MemoryKvStore {
    data: BTreeMap<(String, String), Vec<u8>>,
    pub fail_writes: bool,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, ErrorCode> {
        Ok(self.data.get(&(namespace.to_string(), key.to_string())).cloned())
    }

    fn set(&mut self, namespace: &str, key: &str, value: &[u8]) -> Result<(), ErrorCode> {
        if self.fail_writes {
            return Err(ErrorCode::NvsWriteFailed);
        }
        self.data
            .insert((namespace.to_string(), key.to_string()), value.to_vec());
        Ok(())
    }

    fn remove(&mut self, namespace: &str, key: &str) -> Result<(), ErrorCode> {
        self.data.remove(&(namespace.to_string(), key.to_string()));
        Ok(())
    }

    fn clear_namespace(&mut self, namespace: &str) -> Result<(), ErrorCode> {
        self.data.retain(|(ns, _), _| ns != namespace);
        Ok(())
    }

    fn keys(&self, namespace: &str) -> Vec<String> {
        self.data
            .keys()
            .filter(|(ns, _)| ns == namespace)
            .map(|(_, key)| key.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespaces_clear_independently() {
        let mut store = MemoryKvStore::new();
        store.set("wifi", "ssid", b"home").unwrap();
        store.set("zone", "id", b"zelt_1").unwrap();
        store.clear_namespace("wifi").unwrap();
        assert!(store.get("wifi", "ssid").unwrap().is_none());
        assert_eq!(store.get("zone", "id").unwrap(), Some(b"zelt_1".to_vec()));
    }

    #[test]
    fn write_failure_is_reported_as_nvs_write_failed() {
        let mut store = MemoryKvStore::new();
        store.fail_writes = true;
        assert_eq!(
            store.set("wifi", "ssid", b"home"),
            Err(ErrorCode::NvsWriteFailed)
        );
    }

    #[test]
    fn keys_lists_only_the_requested_namespace() {
        let mut store = MemoryKvStore::new();
        store.set("sensors", "34", b"{}").unwrap();
        store.set("sensors", "35", b"{}").unwrap();
        store.set("actuators", "12", b"{}").unwrap();
        let mut keys = store.keys("sensors");
        keys.sort();
        assert_eq!(keys, vec!["34".to_string(), "35".to_string()]);
    }
}
