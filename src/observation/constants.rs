//! Numeric codes carried by observations.
//!
//! Codes are stable: they are what the persistence layer stores, so new
//! variants get new numbers and existing numbers never move.

use serde::{Deserialize, Serialize};

macro_rules! coded_enum {
    (
        $(#[$meta:meta])*
        $name:ident, fallback = $fallback:ident {
            $($(#[$vmeta:meta])* $variant:ident = $code:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Stored numeric code.
            #[must_use]
            pub const fn value(self) -> i32 {
                match self {
                    $(Self::$variant => $code),+
                }
            }

            /// Maps a stored code back, falling back for unknown codes.
            #[must_use]
            pub const fn from_value(value: i32) -> Self {
                match value {
                    $($code => Self::$variant,)+
                    _ => Self::$fallback,
                }
            }
        }
    };
}

coded_enum! {
    /// Which state a [`StateChange`](super::StateChange) describes.
    StateType, fallback = Unknown {
        Unknown = 0,
        Sim = 1,
        Service = 2,
        AirplaneMode = 4,
        Screen = 5,
        DeviceBoot = 6,
        Location = 7,
    }
}

coded_enum! {
    SimState, fallback = Other {
        Other = 0,
        Absent = 1,
        NetworkLocked = 2,
        PinRequired = 3,
        PukRequired = 4,
        Ready = 5,
        Unknown = 6,
    }
}

coded_enum! {
    ServiceState, fallback = Unknown {
        Unknown = 0,
        EmergencyOnly = 1,
        InService = 2,
        OutOfService = 3,
        PowerOff = 4,
    }
}

coded_enum! {
    ScreenState, fallback = Off {
        On = 1,
        Off = 2,
        Locked = 3,
        Unlocked = 4,
    }
}

coded_enum! {
    AirplaneModeState, fallback = Off {
        On = 1,
        Off = 2,
    }
}

coded_enum! {
    LocationState, fallback = Disabled {
        Disabled = 0,
        Enabled = 1,
    }
}

coded_enum! {
    DeviceBootState, fallback = Boot {
        Boot = 1,
        Shutdown = 2,
    }
}

coded_enum! {
    /// GSM or CDMA radio.
    TelephonyStandard, fallback = Gsm {
        Gsm = 1,
        Cdma = 2,
    }
}

coded_enum! {
    /// Radio access technology of the data connection.
    NetworkType, fallback = Other {
        Other = 0,
        Rtt = 1,
        Cdma = 2,
        Edge = 3,
        Ehrpd = 4,
        Evdo0 = 5,
        EvdoA = 6,
        EvdoB = 7,
        Gprs = 8,
        Hsdpa = 9,
        Hspa = 10,
        Hspap = 11,
        Hsupa = 12,
        Iden = 13,
        Lte = 14,
        Umts = 15,
        Unknown = 16,
    }
}

coded_enum! {
    /// Detailed state of the active network connection.
    NetworkState, fallback = Unknown {
        Unknown = 0,
        Authenticating = 1,
        Blocked = 2,
        CaptivePortalCheck = 3,
        Connected = 4,
        Connecting = 5,
        Disconnected = 6,
        Disconnecting = 7,
        Failed = 8,
        Idle = 9,
        ObtainingIpAddress = 10,
        Scanning = 11,
        Suspended = 12,
        VerifyingPoorLink = 13,
    }
}

coded_enum! {
    /// Kind of network a connection or traffic record belongs to.
    ConnectionType, fallback = Other {
        Other = 0,
        Mobile = 1,
        MobileDun = 2,
        MobileHipri = 3,
        MobileMms = 4,
        MobileSupl = 5,
        Wifi = 6,
        Wimax = 7,
    }
}

impl ConnectionType {
    #[must_use]
    pub const fn is_mobile(self) -> bool {
        matches!(
            self,
            Self::Mobile | Self::MobileDun | Self::MobileHipri | Self::MobileMms | Self::MobileSupl
        )
    }
}

/// Accelerometer sampling rate requested from the platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorDelay {
    Fastest,
    Game,
    Ui,
    #[default]
    Normal,
}

impl SensorDelay {
    /// Parses the option spelling (`fastest`, `game`, `ui`, `normal`).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fastest" => Some(Self::Fastest),
            "game" => Some(Self::Game),
            "ui" => Some(Self::Ui),
            "normal" => Some(Self::Normal),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        assert_eq!(StateType::from_value(StateType::AirplaneMode.value()), StateType::AirplaneMode);
        assert_eq!(NetworkType::from_value(14), NetworkType::Lte);
        assert_eq!(ConnectionType::Wifi.value(), 6);
    }

    #[test]
    fn unknown_codes_fall_back() {
        assert_eq!(StateType::from_value(3), StateType::Unknown);
        assert_eq!(SimState::from_value(42), SimState::Other);
        assert_eq!(NetworkState::from_value(-1), NetworkState::Unknown);
    }

    #[test]
    fn mobile_connection_types() {
        assert!(ConnectionType::MobileHipri.is_mobile());
        assert!(!ConnectionType::Wifi.is_mobile());
        assert!(!ConnectionType::Other.is_mobile());
    }

    #[test]
    fn sensor_delay_parse() {
        assert_eq!(SensorDelay::parse("GAME"), Some(SensorDelay::Game));
        assert_eq!(SensorDelay::parse(" ui "), Some(SensorDelay::Ui));
        assert_eq!(SensorDelay::parse("slow"), None);
        assert_eq!(SensorDelay::default(), SensorDelay::Normal);
    }
}
