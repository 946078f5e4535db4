//! Device identity.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};

/// Brand and model of one device model, keyed by codename.
///
/// Ordering and equality look only at `(brand, model)`; the codename is the
/// registry key and deliberately excluded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    codename: String,
    brand: String,
    model: String,
    sdk_version: String,
    tags: BTreeSet<String>,
}

impl DeviceInfo {
    /// Build a device entry, capitalizing brand and model and dropping a
    /// brand prefix repeated in the model ("Samsung" / "Samsung Galaxy X"
    /// becomes "Samsung" / "Galaxy X").
    pub fn new<I, S>(
        codename: &str,
        brand: &str,
        model: &str,
        sdk_version: impl Into<String>,
        tags: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let codename = codename.trim().to_string();
        let (brand, model) = normalize_brand_model(brand, model);

        if codename.is_empty() || brand.is_empty() || model.is_empty() {
            return Err(ReportError::InvalidDevice(format!(
                "codename={:?} brand={:?} model={:?} can't have empty properties",
                codename, brand, model
            )));
        }

        Ok(Self {
            codename,
            brand,
            model,
            sdk_version: sdk_version.into(),
            tags: tags.into_iter().map(Into::into).collect(),
        })
    }

    pub fn codename(&self) -> &str {
        &self.codename
    }

    pub fn brand(&self) -> &str {
        &self.brand
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn sdk_version(&self) -> &str {
        &self.sdk_version
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

impl PartialEq for DeviceInfo {
    fn eq(&self, other: &Self) -> bool {
        self.brand == other.brand && self.model == other.model
    }
}

impl Eq for DeviceInfo {}

impl PartialOrd for DeviceInfo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DeviceInfo {
    fn cmp(&self, other: &Self) -> Ordering {
        self.brand
            .cmp(&other.brand)
            .then_with(|| self.model.cmp(&other.model))
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({}) SDK {}",
            self.brand, self.model, self.codename, self.sdk_version
        )
    }
}

/// Trim and capitalize brand and model, stripping a repeated brand prefix
/// from the model.
pub fn normalize_brand_model(brand: &str, model: &str) -> (String, String) {
    let brand = capitalize_first(brand.trim());
    let mut model = capitalize_first(model.trim());

    if model.len() > brand.len() {
        let prefix = format!("{} ", brand.to_lowercase());
        if model.to_lowercase().starts_with(&prefix) {
            if let Some(rest) = model.get(brand.len() + 1..) {
                model = rest.to_string();
            }
        }
    }

    (brand, model)
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(codename: &str, brand: &str, model: &str) -> DeviceInfo {
        DeviceInfo::new(codename, brand, model, "29", Vec::<String>::new()).unwrap()
    }

    #[test]
    fn test_capitalizes_brand_and_model() {
        let d = device("blueline", "google", "pixel 3");
        assert_eq!(d.brand(), "Google");
        assert_eq!(d.model(), "Pixel 3");
    }

    #[test]
    fn test_strips_repeated_brand() {
        let d = device("beyond1", "samsung", "Samsung Galaxy S10");
        assert_eq!(d.brand(), "Samsung");
        assert_eq!(d.model(), "Galaxy S10");

        // Brand as a bare word inside the model is left alone.
        let d = device("x", "Moto", "Motorola One");
        assert_eq!(d.model(), "Motorola One");
    }

    #[test]
    fn test_empty_properties_rejected() {
        let err = DeviceInfo::new("", "Google", "Pixel", "29", Vec::<String>::new()).unwrap_err();
        assert_eq!(err.code(), "INVALID_DEVICE");
        assert!(DeviceInfo::new("a", " ", "Pixel", "29", Vec::<String>::new()).is_err());
    }

    #[test]
    fn test_order_and_equality_ignore_codename() {
        let a = device("one", "Google", "Pixel 3");
        let b = device("two", "Google", "Pixel 3");
        let c = device("three", "Google", "Pixel 4");
        let d = device("four", "Asus", "Zenfone");

        assert_eq!(a, b);
        assert!(a < c);
        assert!(d < a);
    }

    #[test]
    fn test_tags_and_display() {
        let d = DeviceInfo::new("blueline", "Google", "Pixel 3", "29", ["default", "beta"]).unwrap();
        assert!(d.has_tag("beta"));
        assert!(!d.has_tag("reduced"));
        assert_eq!(d.to_string(), "Google Pixel 3 (blueline) SDK 29");
    }
}
