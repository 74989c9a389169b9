use serde::Deserialize;
use std::path::Path;

use crate::detect::ClassifierConfig;
use crate::error::{Error, Result};
use crate::geometry::Point;
use crate::zone::{Zone, ZoneKind};

/// Environment variable naming the optional config file.
pub const CONFIG_ENV: &str = "ZONE_WATCH_CONFIG";

const DEFAULT_ZONE_KIND: ZoneKind = ZoneKind::Polygon;

#[derive(Debug, Deserialize, Default)]
struct ZoneWatchConfigFile {
    input: Option<String>,
    output: Option<String>,
    zone: Option<ZoneConfigFile>,
    classifier: Option<ClassifierConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ZoneConfigFile {
    #[serde(rename = "type")]
    kind: Option<String>,
    points: Option<Vec<[i32; 2]>>,
}

#[derive(Debug, Deserialize, Default)]
struct ClassifierConfigFile {
    confidence_threshold: Option<f32>,
    min_area: Option<f64>,
    max_area: Option<f64>,
    min_aspect: Option<f64>,
    max_aspect: Option<f64>,
    min_height: Option<u32>,
    shadows_as_foreground: Option<bool>,
    history: Option<u32>,
    learning_rate: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct ZoneWatchConfig {
    pub input: Option<String>,
    pub output: Option<String>,
    pub zone_kind: ZoneKind,
    /// Empty until supplied by the file, the environment or the command line.
    pub zone_points: Vec<Point>,
    pub classifier: ClassifierConfig,
}

impl Default for ZoneWatchConfig {
    fn default() -> Self {
        Self {
            input: None,
            output: None,
            zone_kind: DEFAULT_ZONE_KIND,
            zone_points: Vec::new(),
            classifier: ClassifierConfig::default(),
        }
    }
}

impl ZoneWatchConfig {
    /// Defaults, then the file named by `ZONE_WATCH_CONFIG` (if set), then environment
    /// overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var(CONFIG_ENV).ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        Self::finish(file_cfg.unwrap_or_default())
    }

    /// Like `load`, with an explicit file instead of `ZONE_WATCH_CONFIG`.
    pub fn load_from(path: &Path) -> Result<Self> {
        Self::finish(read_config_file(path)?)
    }

    fn finish(file: ZoneWatchConfigFile) -> Result<Self> {
        let mut cfg = Self::from_file(file)?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ZoneWatchConfigFile) -> Result<Self> {
        let defaults = ClassifierConfig::default();
        let zone = file.zone.unwrap_or_default();
        let zone_kind = match zone.kind.as_deref() {
            Some(kind) => kind.parse().map_err(|e| Error::config(format!("{e}")))?,
            None => DEFAULT_ZONE_KIND,
        };
        let zone_points = zone
            .points
            .unwrap_or_default()
            .into_iter()
            .map(|[x, y]| Point::new(x, y))
            .collect();

        let c = file.classifier.unwrap_or_default();
        let mut classifier = ClassifierConfig {
            confidence_threshold: c
                .confidence_threshold
                .unwrap_or(defaults.confidence_threshold),
            min_area: c.min_area.unwrap_or(defaults.min_area),
            max_area: c.max_area.unwrap_or(defaults.max_area),
            min_aspect: c.min_aspect.unwrap_or(defaults.min_aspect),
            max_aspect: c.max_aspect.unwrap_or(defaults.max_aspect),
            min_height: c.min_height.unwrap_or(defaults.min_height),
            shadows_as_foreground: c
                .shadows_as_foreground
                .unwrap_or(defaults.shadows_as_foreground),
            ..defaults
        };
        if let Some(history) = c.history {
            classifier.background.history = history;
        }
        classifier.background.learning_rate = c.learning_rate;

        Ok(Self {
            input: file.input,
            output: file.output,
            zone_kind,
            zone_points,
            classifier,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(kind) = std::env::var("ZONE_WATCH_ZONE_TYPE") {
            if !kind.trim().is_empty() {
                self.zone_kind = kind.parse().map_err(|e| Error::config(format!("{e}")))?;
            }
        }
        if let Ok(points) = std::env::var("ZONE_WATCH_ZONE_POINTS") {
            if !points.trim().is_empty() {
                self.zone_points = parse_points(&points).map_err(|e| {
                    Error::config(format!("ZONE_WATCH_ZONE_POINTS: {e}"))
                })?;
            }
        }
        if let Ok(confidence) = std::env::var("ZONE_WATCH_CONFIDENCE") {
            self.classifier.confidence_threshold = confidence.trim().parse().map_err(|_| {
                Error::config("ZONE_WATCH_CONFIDENCE must be a number between 0 and 1")
            })?;
        }
        if let Ok(history) = std::env::var("ZONE_WATCH_HISTORY") {
            self.classifier.background.history = history.trim().parse().map_err(|_| {
                Error::config("ZONE_WATCH_HISTORY must be a positive integer")
            })?;
        }
        if let Ok(shadows) = std::env::var("ZONE_WATCH_SHADOWS") {
            self.classifier.shadows_as_foreground = parse_bool(&shadows).ok_or_else(|| {
                Error::config("ZONE_WATCH_SHADOWS must be true or false")
            })?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.classifier.validate()?;
        if !self.zone_points.is_empty() && self.zone_points.len() < self.zone_kind.min_points() {
            return Err(Error::config(format!(
                "{} zone requires at least {} points, got {}",
                self.zone_kind,
                self.zone_kind.min_points(),
                self.zone_points.len()
            )));
        }
        Ok(())
    }

    /// Build the configured zone.
    pub fn zone(&self) -> Result<Zone> {
        if self.zone_points.is_empty() {
            return Err(Error::invalid_zone("no coordinates provided"));
        }
        Zone::new(self.zone_kind, self.zone_points.clone())
    }
}

/// Parse `"x,y"`.
pub fn parse_point(value: &str) -> Result<Point> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| Error::invalid_zone(format!("'{value}' is not an x,y pair")))?;
    let parse = |s: &str| {
        s.trim()
            .parse::<i32>()
            .map_err(|_| Error::invalid_zone(format!("'{value}' is not an x,y pair")))
    };
    Ok(Point::new(parse(x)?, parse(y)?))
}

/// Parse `"x,y;x,y;..."`. Empty entries are skipped.
pub fn parse_points(value: &str) -> Result<Vec<Point>> {
    value
        .split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(parse_point)
        .collect()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn read_config_file(path: &Path) -> Result<ZoneWatchConfigFile> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        Error::config(format!("failed to read config file {}: {}", path.display(), e))
    })?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    if is_toml {
        toml::from_str(&raw)
            .map_err(|e| Error::config(format!("invalid config file {}: {}", path.display(), e)))
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| Error::config(format!("invalid config file {}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_point_lists() {
        assert_eq!(parse_point(" 10, 20 ").unwrap(), Point::new(10, 20));
        assert!(parse_point("10").is_err());
        assert!(parse_point("a,b").is_err());
        assert_eq!(
            parse_points("1,2; 3,4;;5,6").unwrap(),
            vec![Point::new(1, 2), Point::new(3, 4), Point::new(5, 6)]
        );
    }

    #[test]
    fn parses_bools() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn zone_requires_points() {
        let cfg = ZoneWatchConfig::default();
        assert!(cfg.zone().is_err());
        let cfg = ZoneWatchConfig {
            zone_kind: ZoneKind::Line,
            zone_points: vec![Point::new(0, 0), Point::new(10, 0)],
            ..ZoneWatchConfig::default()
        };
        assert_eq!(cfg.zone().unwrap().kind(), ZoneKind::Line);
    }
}
