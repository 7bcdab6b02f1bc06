//! UI languages and the labels used by the leaf health surfaces.

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Dashboard language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Hi,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Hi => "hi",
        }
    }

    /// The other language; the dashboard toggle flips between the two.
    pub fn toggled(&self) -> Self {
        match self {
            Language::En => Language::Hi,
            Language::Hi => Language::En,
        }
    }

    pub fn label(&self, label: UiLabel) -> &'static str {
        let (en, hi) = label.texts();
        match self {
            Language::En => en,
            Language::Hi => hi,
        }
    }

    /// All surface labels in this language, keyed by label name.
    pub fn labels(&self) -> Vec<(&'static str, &'static str)> {
        UiLabel::ALL
            .iter()
            .map(|label| (label.key(), self.label(*label)))
            .collect()
    }
}

impl std::str::FromStr for Language {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Language::En),
            "hi" | "hindi" => Ok(Language::Hi),
            other => Err(ModelError::UnsupportedLanguage(other.to_string())),
        }
    }
}

/// Labels shown on the classifier surfaces and the login form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UiLabel {
    LiveHealthDetection,
    CameraOff,
    StartCamera,
    StopCamera,
    Analyze,
    Analyzing,
    UploadPhoto,
    AnalyzeSnapshot,
    ModelMetrics,
    FarmerLogin,
    YourName,
    FarmLocation,
}

impl UiLabel {
    pub const ALL: [UiLabel; 12] = [
        UiLabel::LiveHealthDetection,
        UiLabel::CameraOff,
        UiLabel::StartCamera,
        UiLabel::StopCamera,
        UiLabel::Analyze,
        UiLabel::Analyzing,
        UiLabel::UploadPhoto,
        UiLabel::AnalyzeSnapshot,
        UiLabel::ModelMetrics,
        UiLabel::FarmerLogin,
        UiLabel::YourName,
        UiLabel::FarmLocation,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            UiLabel::LiveHealthDetection => "live_health_detection",
            UiLabel::CameraOff => "camera_off",
            UiLabel::StartCamera => "start_camera",
            UiLabel::StopCamera => "stop_camera",
            UiLabel::Analyze => "analyze",
            UiLabel::Analyzing => "analyzing",
            UiLabel::UploadPhoto => "upload_photo",
            UiLabel::AnalyzeSnapshot => "analyze_snapshot",
            UiLabel::ModelMetrics => "model_metrics",
            UiLabel::FarmerLogin => "farmer_login",
            UiLabel::YourName => "your_name",
            UiLabel::FarmLocation => "farm_location",
        }
    }

    fn texts(&self) -> (&'static str, &'static str) {
        match self {
            UiLabel::LiveHealthDetection => ("Live Plant Health Detection", "लाइव पौध स्वास्थ्य पहचान"),
            UiLabel::CameraOff => ("Camera is off", "कैमरा बंद है"),
            UiLabel::StartCamera => ("Start Camera", "कैमरा शुरू करें"),
            UiLabel::StopCamera => ("Stop Camera", "कैमरा बंद करें"),
            UiLabel::Analyze => ("Analyze", "विश्लेषण"),
            UiLabel::Analyzing => ("Analyzing…", "विश्लेषण…"),
            UiLabel::UploadPhoto => ("Upload Photo", "फोटो अपलोड करें"),
            UiLabel::AnalyzeSnapshot => ("Analyze Snapshot", "स्नैपशॉट विश्लेषण"),
            UiLabel::ModelMetrics => ("Model Metrics", "मॉडल मीट्रिक्स"),
            UiLabel::FarmerLogin => ("Farmer Login", "किसान लॉगिन"),
            UiLabel::YourName => ("Your Name", "आपका नाम"),
            UiLabel::FarmLocation => ("Farm Location", "खेत का स्थान"),
        }
    }
}
