//! Build info: line 0 of every report file.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::device::{normalize_brand_model, DeviceInfo};
use crate::extraction::{value_to_int, value_to_string};

pub const MANUFACTURER: &str = "MANUFACTURER";
pub const BRAND: &str = "BRAND";
pub const MODEL: &str = "MODEL";
pub const DEVICE: &str = "DEVICE";
pub const PRODUCT: &str = "PRODUCT";
pub const SDK_INT: &str = "SDK_INT";

/// Placeholder for identity fields that could not be recovered.
pub const UNKNOWN: &str = "Unknown";

/// Device/OS identification of the device that produced a report.
///
/// Keys are kept in file order so a report can be written back unchanged.
/// There are no mutators; homologation builds a new value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildInfo {
    fields: Map<String, Value>,
}

impl BuildInfo {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Interpret a parsed line 0. Any object is kept whole, even one that
    /// does not name a device; anything else is missing build info.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    /// Build info recovered from a file name and, if known, a registry entry.
    pub fn synthesized(codename: &str, sdk: &str, device: Option<&DeviceInfo>) -> Self {
        let (brand, model) = match device {
            Some(d) => (d.brand().to_string(), d.model().to_string()),
            None => (UNKNOWN.to_string(), UNKNOWN.to_string()),
        };

        let mut fields = Map::new();
        fields.insert(MANUFACTURER.to_string(), Value::String(brand.clone()));
        fields.insert(BRAND.to_string(), Value::String(brand));
        fields.insert(MODEL.to_string(), Value::String(model));
        Self { fields }.filled_from(&Self::identity(codename, sdk))
    }

    /// Only the device identity keys: `DEVICE`, `PRODUCT` and `SDK_INT`.
    pub fn identity(codename: &str, sdk: &str) -> Self {
        let mut fields = Map::new();
        fields.insert(DEVICE.to_string(), Value::String(codename.to_string()));
        fields.insert(PRODUCT.to_string(), Value::String(codename.to_string()));
        fields.insert(SDK_INT.to_string(), Value::String(sdk.to_string()));
        Self { fields }
    }

    /// Copy of `self` with brand and model filled from `device` where absent.
    pub fn homologated(&self, device: &DeviceInfo) -> Self {
        let mut fields = self.fields.clone();
        for (key, value) in [
            (MANUFACTURER, device.brand()),
            (BRAND, device.brand()),
            (MODEL, device.model()),
        ] {
            fields
                .entry(key.to_string())
                .or_insert_with(|| Value::String(value.to_string()));
        }
        Self { fields }
    }

    /// Copy of `self` with every key of `fallback` it lacks appended.
    /// Existing keys keep their value and position.
    pub fn filled_from(&self, fallback: &BuildInfo) -> Self {
        let mut fields = self.fields.clone();
        for (key, value) in &fallback.fields {
            fields.entry(key.clone()).or_insert_with(|| value.clone());
        }
        Self { fields }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Field rendered as a string; empty values count as missing.
    pub fn get(&self, key: &str) -> Option<String> {
        self.fields
            .get(key)
            .map(value_to_string)
            .filter(|s| !s.trim().is_empty())
    }

    pub fn codename(&self) -> Option<String> {
        self.get(DEVICE).or_else(|| self.get(PRODUCT))
    }

    pub fn brand(&self) -> Option<String> {
        self.get(BRAND).or_else(|| self.get(MANUFACTURER))
    }

    pub fn model(&self) -> Option<String> {
        self.get(MODEL)
    }

    pub fn sdk_int(&self) -> Option<i64> {
        self.fields.get(SDK_INT).and_then(value_to_int)
    }

    /// SDK level as written, `00` when absent.
    pub fn sdk_label(&self) -> String {
        self.get(SDK_INT).unwrap_or_else(|| "00".to_string())
    }

    /// Device entry described by this build info, when it is complete.
    /// `Unknown` placeholders never describe a device.
    pub fn device_info(&self) -> Option<DeviceInfo> {
        let known = |s: String| (s != UNKNOWN).then_some(s);
        let codename = self.codename().and_then(known)?;
        let brand = self.brand().and_then(known)?;
        let model = self.model().and_then(known)?;
        DeviceInfo::new(&codename, &brand, &model, self.sdk_label(), Vec::<String>::new()).ok()
    }

    /// `(Brand, Model)` as used in normalized report names.
    pub fn display_brand_model(&self) -> (String, String) {
        normalize_brand_model(
            &self.brand().unwrap_or_else(|| UNKNOWN.to_string()),
            &self.model().unwrap_or_else(|| UNKNOWN.to_string()),
        )
    }
}
