//! Leaf classification request and result types.
//!
//! The result mirrors the JSON body returned by the classification backend.
//! Nothing here validates what the backend sends: an unexpected class string
//! or an out-of-range confidence is carried through as received.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Image payload sent to the classifier.
///
/// Built once per user action and dropped after the network call.
#[derive(Clone, PartialEq, Eq)]
pub struct ClassificationRequest {
    /// Raw image bytes
    pub bytes: Vec<u8>,
    /// Filename used for the multipart part and diagnostics
    pub filename: String,
    /// MIME type hint (e.g. `image/jpeg`)
    pub mime_type: String,
}

impl ClassificationRequest {
    pub fn new(bytes: Vec<u8>, filename: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            filename: filename.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Size of the payload in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Lightweight description without the bytes.
    pub fn summary(&self) -> ImageSummary {
        ImageSummary {
            filename: self.filename.clone(),
            mime_type: self.mime_type.clone(),
            size_bytes: self.bytes.len(),
        }
    }
}

impl std::fmt::Debug for ClassificationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassificationRequest")
            .field("filename", &self.filename)
            .field("mime_type", &self.mime_type)
            .field("size_bytes", &self.bytes.len())
            .finish()
    }
}

/// Serializable description of a staged image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSummary {
    pub filename: String,
    pub mime_type: String,
    pub size_bytes: usize,
}

/// Health class reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LeafHealthClass {
    Healthy,
    Moderate,
    Unhealthy,
    /// Any other label, kept verbatim
    Other(String),
}

impl LeafHealthClass {
    pub fn as_str(&self) -> &str {
        match self {
            LeafHealthClass::Healthy => "healthy",
            LeafHealthClass::Moderate => "moderate",
            LeafHealthClass::Unhealthy => "unhealthy",
            LeafHealthClass::Other(label) => label,
        }
    }

    /// Upper-case label shown on result badges.
    pub fn display_label(&self) -> String {
        self.as_str().to_uppercase()
    }

    /// Badge tone; anything that is neither healthy nor moderate is shown as critical.
    pub fn tone(&self) -> BadgeTone {
        match self {
            LeafHealthClass::Healthy => BadgeTone::Good,
            LeafHealthClass::Moderate => BadgeTone::Warning,
            _ => BadgeTone::Critical,
        }
    }
}

impl From<String> for LeafHealthClass {
    fn from(value: String) -> Self {
        match value.as_str() {
            "healthy" => LeafHealthClass::Healthy,
            "moderate" => LeafHealthClass::Moderate,
            "unhealthy" => LeafHealthClass::Unhealthy,
            _ => LeafHealthClass::Other(value),
        }
    }
}

impl From<LeafHealthClass> for String {
    fn from(value: LeafHealthClass) -> Self {
        match value {
            LeafHealthClass::Other(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for LeafHealthClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Colour family for a result badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeTone {
    Good,
    Warning,
    Critical,
}

/// Colour ratios computed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafMetrics {
    pub green_ratio: f64,
    pub yellow_ratio: f64,
    /// Absent when the backend reports `necrosis_ratio` instead
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brown_ratio: Option<f64>,
    pub stress_ratio: f64,
    /// Number of leaf pixels analysed
    pub pixels: u64,
    /// Extra metrics (e.g. `necrosis_ratio`, `edge_ratio`)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Classification returned by `POST /classify`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    #[serde(rename = "class")]
    pub class: LeafHealthClass,
    pub confidence: f64,
    pub metrics: LeafMetrics,
    /// Extra top-level keys (e.g. `pump_action`, `arduino_command`)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ClassificationResult {
    /// Confidence with one decimal, e.g. `77.0%`.
    pub fn confidence_display(&self) -> String {
        format!("{:.1}%", self.confidence * 100.0)
    }

    /// Rounded confidence used on compact badges, e.g. `77%`.
    pub fn confidence_badge(&self) -> String {
        format!("{:.0}%", self.confidence * 100.0)
    }

    pub fn class_label(&self) -> String {
        self.class.display_label()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn moderate_body() -> Value {
        json!({
            "class": "moderate",
            "confidence": 0.77,
            "metrics": {
                "green_ratio": 0.4,
                "yellow_ratio": 0.3,
                "brown_ratio": 0.1,
                "stress_ratio": 0.3,
                "pixels": 40000
            }
        })
    }

    #[test]
    fn test_parse_backend_result() {
        let result: ClassificationResult = serde_json::from_value(moderate_body()).unwrap();
        assert_eq!(result.class, LeafHealthClass::Moderate);
        assert_eq!(result.metrics.pixels, 40000);
        assert_eq!(result.metrics.brown_ratio, Some(0.1));
        assert!(result.extra.is_empty());
    }

    #[test]
    fn test_display_formatting() {
        let result: ClassificationResult = serde_json::from_value(moderate_body()).unwrap();
        assert_eq!(result.confidence_display(), "77.0%");
        assert_eq!(result.confidence_badge(), "77%");
        assert_eq!(result.class_label(), "MODERATE");
        assert_eq!(result.class.tone(), BadgeTone::Warning);
    }

    #[test]
    fn test_unknown_class_and_range_pass_through() {
        let body = json!({
            "class": "wilted",
            "confidence": 1.7,
            "metrics": {
                "green_ratio": 0.1,
                "yellow_ratio": 0.2,
                "stress_ratio": 0.9,
                "pixels": 12
            }
        });
        let result: ClassificationResult = serde_json::from_value(body.clone()).unwrap();
        assert_eq!(result.class, LeafHealthClass::Other("wilted".into()));
        assert_eq!(result.confidence, 1.7);
        assert_eq!(result.class_label(), "WILTED");
        assert_eq!(result.class.tone(), BadgeTone::Critical);

        // Round-trips to the same JSON
        assert_eq!(serde_json::to_value(&result).unwrap(), body);
    }

    #[test]
    fn test_backend_extra_keys_preserved() {
        let body = json!({
            "class": "unhealthy",
            "confidence": 0.81,
            "metrics": {
                "green_ratio": 0.2,
                "yellow_ratio": 0.4,
                "necrosis_ratio": 0.2,
                "stress_ratio": 0.6,
                "edge_ratio": 0.31,
                "pixels": 5120
            },
            "pump_action": "on"
        });
        let result: ClassificationResult = serde_json::from_value(body).unwrap();
        assert_eq!(result.metrics.brown_ratio, None);
        assert_eq!(result.metrics.extra.get("necrosis_ratio"), Some(&json!(0.2)));
        assert_eq!(result.extra.get("pump_action"), Some(&json!("on")));
    }

    #[test]
    fn test_request_debug_omits_bytes() {
        let request = ClassificationRequest::new(vec![1, 2, 3], "leaf.jpg", "image/jpeg");
        let debug = format!("{:?}", request);
        assert!(debug.contains("size_bytes: 3"));
        assert_eq!(request.summary().size_bytes, 3);
    }
}
