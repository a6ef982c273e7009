//! Activation options and monitor settings.
//!
//! Options are the flat key/value map handed to `Monitor::activate`. Unknown
//! keys are ignored, missing keys fall back to the caller's default, and a
//! value of the wrong type is reported once with `warn!` and then treated as
//! missing.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;
use crate::observation::SensorDelay;

/// Accelerometer sampling rate: `fastest`, `game`, `ui` or `normal`.
pub const SENSOR_DELAY: &str = "sensor_delay";
/// Sampling or platform update period, in seconds. Fractions are accepted.
pub const UPDATE_INTERVAL_SECONDS: &str = "update_interval_seconds";
/// Minimum displacement between location updates, in meters.
pub const UPDATE_DISTANCE_METERS: &str = "update_distance_meters";
/// Window after which a location fix is considered stale, in seconds.
pub const EXPIRATION_TIME_SECONDS: &str = "expiration_time_seconds";
/// Accuracy loss a newer same-provider fix may have and still win, in meters.
pub const ACCURACY_THRESHOLD_METERS: &str = "accuracy_threshold_meters";

/// A single option value.
///
/// # Examples
///
/// ```
/// use sigmon::OptionValue;
///
/// assert_eq!(OptionValue::Int(10).as_float(), Some(10.0));
/// assert_eq!(OptionValue::from("game").as_str(), Some("game"));
/// assert!(OptionValue::Bool(true).as_int().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl OptionValue {
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Float view; integers widen.
    #[allow(clippy::cast_precision_loss)]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    const fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
        }
    }
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for OptionValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for OptionValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

/// Flat key/value configuration supplied at activation time.
///
/// # Examples
///
/// ```
/// use sigmon::Options;
/// use std::time::Duration;
///
/// let options = Options::new().with("update_interval_seconds", 10);
/// assert_eq!(
///     options.duration_seconds("update_interval_seconds", Duration::from_secs(60)),
///     Duration::from_secs(10)
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Options {
    values: BTreeMap<String, OptionValue>,
}

impl Options {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a flat JSON object. Nested values are rejected.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        Self::from_json_value(&value)
    }

    /// Converts an already parsed JSON object.
    pub fn from_json_value(value: &serde_json::Value) -> Result<Self, ConfigError> {
        let object = value.as_object().ok_or_else(|| ConfigError::NotAnObject {
            found: json_type_name(value).to_string(),
        })?;

        let mut options = Self::new();
        for (key, raw) in object {
            let value = match raw {
                serde_json::Value::Bool(b) => OptionValue::Bool(*b),
                serde_json::Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                    (Some(i), _) => OptionValue::Int(i),
                    (None, Some(f)) => OptionValue::Float(f),
                    (None, None) => {
                        return Err(ConfigError::UnsupportedValue {
                            key: key.clone(),
                            value: n.to_string(),
                        })
                    }
                },
                serde_json::Value::String(s) => OptionValue::String(s.clone()),
                other => {
                    return Err(ConfigError::UnsupportedValue {
                        key: key.clone(),
                        value: other.to_string(),
                    })
                }
            };
            options.values.insert(key.clone(), value);
        }
        Ok(options)
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Option<OptionValue> {
        self.values.insert(key.into(), value.into())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.values.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        self.typed(key, "bool", OptionValue::as_bool).unwrap_or(default)
    }

    #[must_use]
    pub fn int_or(&self, key: &str, default: i64) -> i64 {
        self.typed(key, "int", OptionValue::as_int).unwrap_or(default)
    }

    #[must_use]
    pub fn float_or(&self, key: &str, default: f64) -> f64 {
        self.typed(key, "float", OptionValue::as_float).unwrap_or(default)
    }

    #[must_use]
    pub fn str_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.typed(key, "string", OptionValue::as_str).unwrap_or(default)
    }

    /// Reads a period given in (possibly fractional) seconds.
    ///
    /// Non-positive, non-finite or unrepresentably large values are ignored.
    #[must_use]
    pub fn duration_seconds(&self, key: &str, default: Duration) -> Duration {
        let Some(secs) = self.typed(key, "float", OptionValue::as_float) else {
            return default;
        };
        if secs <= 0.0 {
            warn!(key, value = secs, "Ignoring non-positive duration option");
            return default;
        }
        match Duration::try_from_secs_f64(secs) {
            Ok(duration) => duration,
            Err(e) => {
                warn!(key, value = secs, reason = %e, "Ignoring out-of-range duration option");
                default
            }
        }
    }

    /// Reads [`SENSOR_DELAY`]; unknown spellings fall back to the default delay.
    #[must_use]
    pub fn sensor_delay(&self) -> SensorDelay {
        let Some(raw) = self.typed(SENSOR_DELAY, "string", OptionValue::as_str) else {
            return SensorDelay::default();
        };
        SensorDelay::parse(raw).unwrap_or_else(|| {
            warn!(key = SENSOR_DELAY, value = raw, "Unknown sensor delay, using default");
            SensorDelay::default()
        })
    }

    fn typed<'a, T>(&'a self, key: &str, expected: &'static str, view: impl Fn(&'a OptionValue) -> Option<T>) -> Option<T> {
        let value = self.values.get(key)?;
        let typed = view(value);
        if typed.is_none() {
            warn!(key, expected, found = value.type_name(), "Ignoring option of the wrong type");
        }
        typed
    }
}

impl<K: Into<String>, V: Into<OptionValue>> FromIterator<(K, V)> for Options {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut options = Self::new();
        for (k, v) in iter {
            options.insert(k, v);
        }
        options
    }
}

/// Construction-time settings of a monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSettings {
    /// Buffer size of streams opened without an explicit capacity.
    pub stream_capacity: usize,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self { stream_capacity: 1024 }
    }
}

const fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_json_reads_flat_object() {
        let options = Options::from_json(
            r#"{"update_interval_seconds": 10, "sensor_delay": "game", "expiration_time_seconds": 120.5, "x": true}"#,
        )
        .unwrap();
        assert_eq!(options.int_or(UPDATE_INTERVAL_SECONDS, 0), 10);
        assert_eq!(options.sensor_delay(), SensorDelay::Game);
        assert!((options.float_or(EXPIRATION_TIME_SECONDS, 0.0) - 120.5).abs() < f64::EPSILON);
        assert!(options.bool_or("x", false));
    }

    #[test]
    fn from_json_rejects_nested_and_non_objects() {
        assert!(matches!(
            Options::from_json("[1, 2]"),
            Err(ConfigError::NotAnObject { found }) if found == "array"
        ));
        assert!(matches!(
            Options::from_json(r#"{"a": {"b": 1}}"#),
            Err(ConfigError::UnsupportedValue { key, .. }) if key == "a"
        ));
        assert!(matches!(Options::from_json("{"), Err(ConfigError::Json(_))));
    }

    #[test]
    fn missing_and_mistyped_values_use_defaults() {
        let options = Options::new().with(UPDATE_INTERVAL_SECONDS, "ten");
        assert_eq!(options.int_or(UPDATE_INTERVAL_SECONDS, 10), 10);
        assert_eq!(options.int_or("absent", 7), 7);
        assert_eq!(options.str_or(SENSOR_DELAY, "normal"), "normal");
    }

    #[test]
    fn durations_accept_fractions_and_reject_non_positive() {
        let default = Duration::from_secs(10);
        let options = Options::new()
            .with("fast", 0.05)
            .with("zero", 0)
            .with("negative", -3);
        assert_eq!(options.duration_seconds("fast", default), Duration::from_millis(50));
        assert_eq!(options.duration_seconds("zero", default), default);
        assert_eq!(options.duration_seconds("negative", default), default);
        assert_eq!(options.duration_seconds("absent", default), default);
    }

    #[test]
    fn durations_too_large_for_duration_use_default() {
        let default = Duration::from_secs(10);
        let options = Options::new().with(UPDATE_INTERVAL_SECONDS, 1e30);
        assert_eq!(options.duration_seconds(UPDATE_INTERVAL_SECONDS, default), default);
    }

    #[test]
    fn unknown_sensor_delay_falls_back() {
        let options = Options::new().with(SENSOR_DELAY, "slow");
        assert_eq!(options.sensor_delay(), SensorDelay::Normal);
    }

    #[test]
    fn options_collect_from_pairs() {
        let options: Options = [("a", 1), ("b", 2)].into_iter().collect();
        assert_eq!(options.iter().count(), 2);
        assert!(options.contains("b"));
    }

    #[test]
    fn settings_default() {
        assert_eq!(MonitorSettings::default().stream_capacity, 1024);
    }
}
