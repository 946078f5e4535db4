//! Device registry.
//!
//! Maps device codenames to [`DeviceInfo`]. One registry is created per
//! processing run and passed by reference to the loader; it is populated as
//! reports with full build info are seen, or in bulk from a device-farm
//! fleet listing.
//!
//! Entries are write-once: pushing a codename that is already present is a
//! no-op that returns `false`. The check and the insert happen under one
//! write lock, so concurrent loaders agree on the first writer.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use parking_lot::RwLock;
use serde::Deserialize;

use crate::device::info::DeviceInfo;
use crate::error::{ReportError, Result};

#[derive(Debug, Default)]
pub struct DeviceRegistry {
    store: RwLock<HashMap<String, DeviceInfo>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `device` unless its codename is already registered.
    pub fn push(&self, device: DeviceInfo) -> bool {
        let mut store = self.store.write();
        match store.entry(device.codename().to_string()) {
            Entry::Occupied(_) => {
                log::debug!(
                    "DEVICE_PUSH_IGNORED codename={} reason=already_registered",
                    device.codename()
                );
                false
            }
            Entry::Vacant(slot) => {
                log::debug!("DEVICE_REGISTERED device={}", device);
                slot.insert(device);
                true
            }
        }
    }

    pub fn get(&self, codename: &str) -> Option<DeviceInfo> {
        self.store.read().get(codename).cloned()
    }

    pub fn contains(&self, codename: &str) -> bool {
        self.store.read().contains_key(codename)
    }

    pub fn len(&self) -> usize {
        self.store.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.read().is_empty()
    }

    /// All devices, sorted by brand then model.
    pub fn devices(&self) -> Vec<DeviceInfo> {
        let mut devices: Vec<DeviceInfo> = self.store.read().values().cloned().collect();
        devices.sort();
        devices
    }

    /// Empty the registry between independent runs.
    pub fn clear(&self) {
        self.store.write().clear();
        log::info!("DEVICE_REGISTRY_CLEARED");
    }

    /// Bulk-populate from a device-farm model listing, a JSON array of
    /// `{codename, brand, name, supportedVersionIds, tags}` objects.
    ///
    /// Each model is registered with its newest (last listed) SDK version.
    /// Entries with empty identity fields are skipped with a warning.
    /// Returns how many codenames were newly registered.
    pub fn populate_from_fleet_json(&self, listing: &str) -> Result<usize> {
        let models: Vec<FleetModel> =
            serde_json::from_str(listing).map_err(ReportError::FleetListing)?;

        let mut added = 0;
        let mut skipped = Vec::new();

        for model in models {
            let sdk = model.supported_version_ids.last().cloned().unwrap_or_default();
            match DeviceInfo::new(&model.codename, &model.brand, &model.name, sdk, model.tags) {
                Ok(device) => {
                    if self.push(device) {
                        added += 1;
                    }
                }
                Err(e) => skipped.push(e.to_string()),
            }
        }

        log::info!(
            "DEVICE_FLEET_LOADED added={} total={} skipped={}",
            added,
            self.len(),
            skipped.len()
        );
        if !skipped.is_empty() {
            log::warn!("DEVICE_FLEET_SKIPPED: {:?}", skipped);
        }

        Ok(added)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FleetModel {
    #[serde(alias = "id")]
    codename: String,
    #[serde(default)]
    brand: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    supported_version_ids: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(codename: &str, brand: &str, model: &str) -> DeviceInfo {
        DeviceInfo::new(codename, brand, model, "29", Vec::<String>::new()).unwrap()
    }

    #[test]
    fn test_push_once_per_codename() {
        let registry = DeviceRegistry::new();
        assert!(registry.push(device("1", "Brand1", "Model1")));
        assert!(!registry.push(device("1", "Brand2", "Model2")));

        assert_eq!(registry.len(), 1);
        let kept = registry.get("1").unwrap();
        assert_eq!(kept.brand(), "Brand1");
        assert_eq!(kept.model(), "Model1");
    }

    #[test]
    fn test_lookup_missing() {
        let registry = DeviceRegistry::new();
        assert!(registry.get("2").is_none());
        assert!(!registry.contains("2"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_devices_sorted_by_brand_and_model() {
        let registry = DeviceRegistry::new();
        registry.push(device("1", "YYY", "Model Y"));
        registry.push(device("2", "ZZZ", "Model Z"));
        registry.push(device("3", "XXX", "Model X"));
        registry.push(device("4", "XXX", "Model A"));

        let order: Vec<(String, String)> = registry
            .devices()
            .iter()
            .map(|d| (d.brand().to_string(), d.model().to_string()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("XXX".to_string(), "Model A".to_string()),
                ("XXX".to_string(), "Model X".to_string()),
                ("YYY".to_string(), "Model Y".to_string()),
                ("ZZZ".to_string(), "Model Z".to_string()),
            ]
        );
    }

    #[test]
    fn test_clear() {
        let registry = DeviceRegistry::new();
        registry.push(device("1", "Brand1", "Model1"));
        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.push(device("1", "Brand2", "Model2")));
    }

    #[test]
    fn test_populate_from_fleet_json() {
        let listing = r#"[
            {"codename": "blueline", "brand": "google", "name": "Pixel 3",
             "supportedVersionIds": ["28", "29"], "tags": ["default"]},
            {"codename": "beyond1", "brand": "Samsung", "name": "Samsung Galaxy S10",
             "supportedVersionIds": ["29"]},
            {"codename": "broken", "brand": "", "name": "Nameless"},
            {"codename": "blueline", "brand": "Other", "name": "Dup"}
        ]"#;

        let registry = DeviceRegistry::new();
        let added = registry.populate_from_fleet_json(listing).unwrap();
        assert_eq!(added, 2);

        let pixel = registry.get("blueline").unwrap();
        assert_eq!(pixel.brand(), "Google");
        assert_eq!(pixel.sdk_version(), "29");
        assert!(pixel.has_tag("default"));
        assert_eq!(registry.get("beyond1").unwrap().model(), "Galaxy S10");
    }

    #[test]
    fn test_populate_rejects_malformed_listing() {
        let registry = DeviceRegistry::new();
        let err = registry.populate_from_fleet_json("{not json").unwrap_err();
        assert_eq!(err.code(), "FLEET_LISTING_INVALID");
    }

    #[test]
    fn test_concurrent_push_single_winner() {
        use std::sync::Arc;
        use std::thread;

        let registry = Arc::new(DeviceRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.push(device("same", "Brand", &format!("Model {}", i))))
            })
            .collect();

        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(wins, 1);
        assert_eq!(registry.len(), 1);
    }
}
