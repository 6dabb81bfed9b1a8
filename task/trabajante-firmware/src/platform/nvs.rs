//! `KvStore` over `esp_idf_svc::nvs::EspNvs`. Each Trabajante namespace
//! maps to its own NVS namespace so `clear_namespace` can drop exactly
//! one without disturbing the others.

use std::collections::HashMap;

use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};
use trabajante_persistence::KvStore;
use trabajante_proto::ErrorCode;

const MAX_VALUE_BYTES: usize = 4096;

pub struct NvsKvStore {
    partition: EspDefaultNvsPartition,
    namespaces: HashMap<String, EspNvs<NvsDefault>>,
}

impl NvsKvStore {
    pub fn new(partition: EspDefaultNvsPartition) -> Self {
        Self {
            partition,
            namespaces: HashMap::new(),
        }
    }

    fn namespace(&mut self, namespace: &str) -> Result<&mut EspNvs<NvsDefault>, ErrorCode> {
        if !self.namespaces.contains_key(namespace) {
            let nvs = EspNvs::new(self.partition.clone(), namespace, true)
                .map_err(|_| ErrorCode::NvsReadFailed)?;
            self.namespaces.insert(namespace.to_string(), nvs);
        }
        Ok(self.namespaces.get_mut(namespace).unwrap())
    }
}

impl KvStore for NvsKvStore {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, ErrorCode> {
        let Some(nvs) = self.namespaces.get(namespace) else {
            return Ok(None);
        };
        let mut buf = [0u8; MAX_VALUE_BYTES];
        match nvs.get_raw(key, &mut buf) {
            Ok(Some(bytes)) => Ok(Some(bytes.to_vec())),
            Ok(None) => Ok(None),
            Err(_) => Err(ErrorCode::NvsReadFailed),
        }
    }

    fn set(&mut self, namespace: &str, key: &str, value: &[u8]) -> Result<(), ErrorCode> {
        let nvs = self.namespace(namespace)?;
        nvs.set_raw(key, value).map_err(|_| ErrorCode::NvsWriteFailed)
    }

    fn remove(&mut self, namespace: &str, key: &str) -> Result<(), ErrorCode> {
        let nvs = self.namespace(namespace)?;
        nvs.remove(key).map(|_| ()).map_err(|_| ErrorCode::NvsWriteFailed)
    }

    fn clear_namespace(&mut self, namespace: &str) -> Result<(), ErrorCode> {
        let nvs = self.namespace(namespace)?;
        nvs.remove_all().map_err(|_| ErrorCode::NvsWriteFailed)
    }

    fn keys(&self, _namespace: &str) -> Vec<String> {
        // `EspNvs` does not expose key enumeration; the configuration
        // manager keeps its own per-namespace key index (the GPIO or
        // subzone id it persisted under) rather than relying on this.
        Vec::new()
    }
}
