//! Best-fix selection between concurrently updating location providers.

use serde::{Deserialize, Serialize};

use crate::observation::{LocationObservation, Provider};

/// Default window after which an older fix is considered stale, in seconds.
pub const DEFAULT_EXPIRATION_SECONDS: i64 = 300;

/// Default accuracy loss a same-provider newer fix may have and still win, in meters.
pub const DEFAULT_ACCURACY_THRESHOLD_METERS: f32 = 200.0;

/// A raw location fix as reported by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub bearing: f32,
    #[serde(default)]
    pub speed: f32,
    #[serde(default)]
    pub altitude: f64,
    pub provider: Provider,
    /// Radius of 68% confidence, in meters. Lower is better.
    pub accuracy: f32,
    /// Provider time of the fix, in milliseconds since the Unix epoch.
    pub time_ms: i64,
}

impl Fix {
    #[must_use]
    pub fn to_observation(&self) -> LocationObservation {
        LocationObservation {
            latitude: self.latitude,
            longitude: self.longitude,
            bearing: self.bearing,
            speed: self.speed,
            altitude: self.altitude,
            provider: self.provider.clone(),
            accuracy: self.accuracy,
        }
    }
}

/// Tunables of [`is_better`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuserConfig {
    /// A fix this much newer always wins; this much older always loses.
    pub expiration_window_ms: i64,
    /// Largest accuracy loss a newer same-provider fix may have and still win.
    pub significantly_less_accurate_m: f32,
}

impl Default for FuserConfig {
    fn default() -> Self {
        Self {
            expiration_window_ms: DEFAULT_EXPIRATION_SECONDS * 1000,
            significantly_less_accurate_m: DEFAULT_ACCURACY_THRESHOLD_METERS,
        }
    }
}

/// Returns true if `candidate` should replace `incumbent`.
///
/// Rules, in order:
/// 1. a present fix beats an absent one; two absent fixes never win;
/// 2. significantly newer wins, significantly older loses;
/// 3. more accurate wins; newer and not less accurate wins; newer, from the
///    same provider and not significantly less accurate wins.
#[must_use]
pub fn is_better(candidate: Option<&Fix>, incumbent: Option<&Fix>, config: &FuserConfig) -> bool {
    let (candidate, incumbent) = match (candidate, incumbent) {
        (Some(c), Some(i)) => (c, i),
        (Some(_), None) => return true,
        (None, _) => return false,
    };

    let time_delta = candidate.time_ms.saturating_sub(incumbent.time_ms);
    if time_delta > config.expiration_window_ms {
        return true;
    }
    if time_delta < -config.expiration_window_ms {
        return false;
    }
    let is_newer = time_delta > 0;

    let accuracy_delta = candidate.accuracy - incumbent.accuracy;
    let is_more_accurate = accuracy_delta < 0.0;
    let is_less_accurate = accuracy_delta > 0.0;
    let is_significantly_less_accurate = accuracy_delta > config.significantly_less_accurate_m;
    let same_provider = candidate.provider == incumbent.provider;

    is_more_accurate
        || (is_newer && !is_less_accurate)
        || (is_newer && !is_significantly_less_accurate && same_provider)
}

/// Picks the better of two optional fixes, preferring `incumbent` on ties.
#[must_use]
pub fn best_of<'a>(candidate: Option<&'a Fix>, incumbent: Option<&'a Fix>, config: &FuserConfig) -> Option<&'a Fix> {
    if is_better(candidate, incumbent, config) {
        candidate
    } else {
        incumbent.or(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: i64 = 1_700_000_000_000;

    fn fix(provider: Provider, accuracy: f32, time_ms: i64) -> Fix {
        Fix {
            latitude: -33.45,
            longitude: -70.66,
            bearing: 0.0,
            speed: 0.0,
            altitude: 520.0,
            provider,
            accuracy,
            time_ms,
        }
    }

    #[test]
    fn absent_incumbent_loses() {
        let c = fix(Provider::Network, 1500.0, T0);
        assert!(is_better(Some(&c), None, &FuserConfig::default()));
    }

    #[test]
    fn absent_candidate_never_wins() {
        let i = fix(Provider::Gps, 10.0, T0);
        assert!(!is_better(None, Some(&i), &FuserConfig::default()));
        assert!(!is_better(None, None, &FuserConfig::default()));
    }

    #[test]
    fn significantly_newer_beats_far_more_accurate() {
        let incumbent = fix(Provider::Gps, 5.0, T0);
        let candidate = fix(Provider::Network, 2000.0, T0 + 400_000);
        assert!(is_better(Some(&candidate), Some(&incumbent), &FuserConfig::default()));
    }

    #[test]
    fn significantly_older_loses_even_if_more_accurate() {
        let incumbent = fix(Provider::Network, 1000.0, T0 + 400_000);
        let candidate = fix(Provider::Gps, 3.0, T0);
        assert!(!is_better(Some(&candidate), Some(&incumbent), &FuserConfig::default()));
    }

    #[test]
    fn newer_same_provider_slightly_worse_wins() {
        let incumbent = fix(Provider::Gps, 20.0, T0);
        let candidate = fix(Provider::Gps, 70.0, T0 + 10_000);
        assert!(is_better(Some(&candidate), Some(&incumbent), &FuserConfig::default()));
    }

    #[test]
    fn newer_other_provider_much_worse_loses() {
        let incumbent = fix(Provider::Gps, 20.0, T0);
        let candidate = fix(Provider::Network, 270.0, T0 + 10_000);
        assert!(!is_better(Some(&candidate), Some(&incumbent), &FuserConfig::default()));
    }

    #[test]
    fn newer_other_provider_slightly_worse_loses() {
        let incumbent = fix(Provider::Gps, 20.0, T0);
        let candidate = fix(Provider::Network, 21.0, T0 + 10_000);
        assert!(!is_better(Some(&candidate), Some(&incumbent), &FuserConfig::default()));
    }

    #[test]
    fn older_but_more_accurate_wins_inside_window() {
        let incumbent = fix(Provider::Network, 800.0, T0 + 60_000);
        let candidate = fix(Provider::Gps, 12.0, T0);
        assert!(is_better(Some(&candidate), Some(&incumbent), &FuserConfig::default()));
    }

    #[test]
    fn same_time_same_accuracy_keeps_incumbent() {
        let incumbent = fix(Provider::Gps, 20.0, T0);
        let candidate = fix(Provider::Gps, 20.0, T0);
        assert!(!is_better(Some(&candidate), Some(&incumbent), &FuserConfig::default()));
    }

    #[test]
    fn expiration_window_is_configurable() {
        let config = FuserConfig {
            expiration_window_ms: 5_000,
            ..FuserConfig::default()
        };
        let incumbent = fix(Provider::Gps, 5.0, T0);
        let candidate = fix(Provider::Network, 2000.0, T0 + 10_000);
        assert!(is_better(Some(&candidate), Some(&incumbent), &config));
        assert!(!is_better(Some(&candidate), Some(&incumbent), &FuserConfig::default()));
    }

    #[test]
    fn best_of_prefers_present_fix() {
        let config = FuserConfig::default();
        let gps = fix(Provider::Gps, 10.0, T0);
        assert_eq!(best_of(None, Some(&gps), &config), Some(&gps));
        assert_eq!(best_of(Some(&gps), None, &config), Some(&gps));
        assert_eq!(best_of(None, None, &config), None);
    }
}
