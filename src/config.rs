//! Thresholds and defaults for the nest linking pipeline.
use crate::error::{NestError, Result};

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkerConfig {
    /// Members scoring below this are ignored when summarising a track
    #[serde(default = "LinkerConfig::default_min_score")]
    pub min_score: f64,

    /// A track with at least this many scored members becomes a nest
    #[serde(default = "LinkerConfig::default_min_detections")]
    pub min_detections: usize,

    /// A track seen on this many consecutive survey dates becomes a nest
    #[serde(default = "LinkerConfig::default_min_consec_detects")]
    pub min_consec_detects: usize,

    /// Flight predictions must score strictly above this to be combined
    #[serde(default = "LinkerConfig::default_score_thresh")]
    pub score_thresh: f64,

    /// CRS written to outputs when the input carries none, e.g. `EPSG:32617`
    #[serde(default)]
    pub default_crs: Option<String>,
}

impl LinkerConfig {
    const fn default_min_score() -> f64 {
        0.3
    }

    const fn default_min_detections() -> usize {
        3
    }

    const fn default_min_consec_detects() -> usize {
        2
    }

    const fn default_score_thresh() -> f64 {
        0.3
    }

    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn with_min_detections(mut self, min_detections: usize) -> Self {
        self.min_detections = min_detections;
        self
    }

    pub fn with_min_consec_detects(mut self, min_consec_detects: usize) -> Self {
        self.min_consec_detects = min_consec_detects;
        self
    }

    pub fn with_score_thresh(mut self, score_thresh: f64) -> Self {
        self.score_thresh = score_thresh;
        self
    }

    pub fn with_default_crs(mut self, crs: impl Into<String>) -> Self {
        self.default_crs = Some(crs.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_score) {
            return Err(NestError::InvalidConfig(format!(
                "min_score must be within [0, 1], got {}",
                self.min_score
            )));
        }

        if !(0.0..=1.0).contains(&self.score_thresh) {
            return Err(NestError::InvalidConfig(format!(
                "score_thresh must be within [0, 1], got {}",
                self.score_thresh
            )));
        }

        if self.min_consec_detects == 0 {
            log::warn!("min_consec_detects of 0 qualifies every candidate track as a nest");
        }

        if let Some(crs) = &self.default_crs
            && crs.trim().is_empty()
        {
            return Err(NestError::InvalidConfig(
                "default_crs must not be blank".to_string(),
            ));
        }

        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: LinkerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: LinkerConfig = toml::from_str(toml_str)
            .map_err(|e| NestError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| NestError::InvalidConfig(e.to_string()))
    }

    /// Load a configuration file, choosing the format from its extension.
    pub fn from_path(path: &std::path::Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            #[cfg(feature = "toml")]
            Some("toml") => Self::from_toml(&contents),
            Some("json") => Self::from_json(&contents),
            other => Err(NestError::InvalidConfig(format!(
                "unsupported configuration format: {}",
                other.unwrap_or("<none>")
            ))),
        }
    }
}

impl Default for LinkerConfig {
    fn default() -> Self {
        Self {
            min_score: Self::default_min_score(),
            min_detections: Self::default_min_detections(),
            min_consec_detects: Self::default_min_consec_detects(),
            score_thresh: Self::default_score_thresh(),
            default_crs: None,
        }
    }
}
