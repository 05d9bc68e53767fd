//! Linux DVB frontend property keys and values.
//!
//! Raw values match `linux/dvb/frontend.h`, so a [`TuningProperties`](crate::TuningProperties)
//! list can be handed to `FE_SET_PROPERTY` unchanged. Each value enum also
//! carries the token used by the conventional Linux tuning-file syntax.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! dtv_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $raw:expr => $token:expr, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Raw value as used by the kernel API.
            pub fn raw(self) -> u32 {
                match self {
                    $($name::$variant => $raw,)+
                }
            }

            /// Look up a variant from its raw kernel value.
            pub fn from_raw(raw: u32) -> Option<Self> {
                Self::ALL.iter().copied().find(|v| v.raw() == raw)
            }

            /// Token used in tuning strings.
            pub fn token(self) -> &'static str {
                match self {
                    $($name::$variant => $token,)+
                }
            }

            /// Look up a variant from a tuning-string token (case-insensitive).
            pub fn from_token(token: &str) -> Option<Self> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.token().eq_ignore_ascii_case(token))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.token())
            }
        }
    };
}

dtv_enum! {
    /// `DTV_*` property commands used by the scanner.
    pub enum PropertyKey {
        Tune = 1 => "TUNE",
        Frequency = 3 => "FREQUENCY",
        Modulation = 4 => "MODULATION",
        BandwidthHz = 5 => "BANDWIDTH_HZ",
        Inversion = 6 => "INVERSION",
        SymbolRate = 8 => "SYMBOL_RATE",
        InnerFec = 9 => "INNER_FEC",
        Voltage = 10 => "VOLTAGE",
        Tone = 11 => "TONE",
        Pilot = 12 => "PILOT",
        Rolloff = 13 => "ROLLOFF",
        DeliverySystem = 17 => "DELIVERY_SYSTEM",
        CodeRateHp = 36 => "CODE_RATE_HP",
        CodeRateLp = 37 => "CODE_RATE_LP",
        GuardInterval = 38 => "GUARD_INTERVAL",
        TransmissionMode = 39 => "TRANSMISSION_MODE",
        Hierarchy = 40 => "HIERARCHY",
        StreamId = 42 => "STREAM_ID",
    }
}

dtv_enum! {
    /// Delivery systems (`SYS_*`).
    pub enum DeliverySystem {
        DvbT = 3 => "T",
        DvbS = 5 => "S1",
        DvbS2 = 6 => "S2",
        DvbT2 = 16 => "T2",
    }
}

/// Delivery-system family. Generations of one family share a physical channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeliveryFamily {
    Satellite,
    Terrestrial,
}

impl DeliverySystem {
    /// The family this system belongs to.
    pub fn family(self) -> DeliveryFamily {
        match self {
            DeliverySystem::DvbS | DeliverySystem::DvbS2 => DeliveryFamily::Satellite,
            DeliverySystem::DvbT | DeliverySystem::DvbT2 => DeliveryFamily::Terrestrial,
        }
    }
}

dtv_enum! {
    /// Forward error correction rates (`FEC_*`).
    pub enum CodeRate {
        None = 0 => "NONE",
        Fec1_2 = 1 => "1/2",
        Fec2_3 = 2 => "2/3",
        Fec3_4 = 3 => "3/4",
        Fec4_5 = 4 => "4/5",
        Fec5_6 = 5 => "5/6",
        Fec6_7 = 6 => "6/7",
        Fec7_8 = 7 => "7/8",
        Fec8_9 = 8 => "8/9",
        Auto = 9 => "AUTO",
        Fec3_5 = 10 => "3/5",
        Fec9_10 = 11 => "9/10",
    }
}

dtv_enum! {
    /// Modulations (`QPSK`, `QAM_*`, `PSK_8`...).
    pub enum Modulation {
        Qpsk = 0 => "QPSK",
        Qam16 = 1 => "QAM16",
        Qam32 = 2 => "QAM32",
        Qam64 = 3 => "QAM64",
        Qam128 = 4 => "QAM128",
        Qam256 = 5 => "QAM256",
        Auto = 6 => "AUTO",
        Vsb8 = 7 => "8VSB",
        Vsb16 = 8 => "16VSB",
        Psk8 = 9 => "8PSK",
        Apsk16 = 10 => "APSK16",
        Apsk32 = 11 => "APSK32",
        Dqpsk = 12 => "DQPSK",
    }
}

dtv_enum! {
    /// OFDM transmission modes (`TRANSMISSION_MODE_*`).
    pub enum TransmissionMode {
        Mode2K = 0 => "2K",
        Mode8K = 1 => "8K",
        Auto = 2 => "AUTO",
        Mode4K = 3 => "4K",
        Mode1K = 4 => "1K",
        Mode16K = 5 => "16K",
        Mode32K = 6 => "32K",
    }
}

dtv_enum! {
    /// OFDM guard intervals (`GUARD_INTERVAL_*`).
    pub enum GuardInterval {
        Gi1_32 = 0 => "1/32",
        Gi1_16 = 1 => "1/16",
        Gi1_8 = 2 => "1/8",
        Gi1_4 = 3 => "1/4",
        Auto = 4 => "AUTO",
        Gi1_128 = 5 => "1/128",
        Gi19_128 = 6 => "19/128",
        Gi19_256 = 7 => "19/256",
    }
}

dtv_enum! {
    /// Hierarchical modulation (`HIERARCHY_*`).
    pub enum Hierarchy {
        None = 0 => "NONE",
        H1 = 1 => "1",
        H2 = 2 => "2",
        H4 = 3 => "4",
        Auto = 4 => "AUTO",
    }
}

dtv_enum! {
    /// DVB-S2 roll-off factors (`ROLLOFF_*`).
    pub enum Rolloff {
        R35 = 0 => "35",
        R20 = 1 => "20",
        R25 = 2 => "25",
        Auto = 3 => "AUTO",
    }
}

dtv_enum! {
    /// LNB supply voltage (`SEC_VOLTAGE_*`).
    pub enum Voltage {
        V13 = 0 => "13V",
        V18 = 1 => "18V",
        Off = 2 => "OFF",
    }
}

dtv_enum! {
    /// 22kHz tone (`SEC_TONE_*`).
    pub enum Tone {
        On = 0 => "ON",
        Off = 1 => "OFF",
    }
}

dtv_enum! {
    /// DVB-S2 pilot (`PILOT_*`).
    pub enum Pilot {
        On = 0 => "ON",
        Off = 1 => "OFF",
        Auto = 2 => "AUTO",
    }
}

dtv_enum! {
    /// Spectral inversion (`INVERSION_*`).
    pub enum Inversion {
        Off = 0 => "OFF",
        On = 1 => "ON",
        Auto = 2 => "AUTO",
    }
}

dtv_enum! {
    /// Satellite polarization as written in tuning strings.
    pub enum Polarization {
        Horizontal = 0 => "H",
        Vertical = 1 => "V",
        Left = 2 => "L",
        Right = 3 => "R",
    }
}

impl Polarization {
    /// LNB voltage that selects this polarization.
    pub fn voltage(self) -> Voltage {
        match self {
            Polarization::Horizontal | Polarization::Left => Voltage::V18,
            Polarization::Vertical | Polarization::Right => Voltage::V13,
        }
    }
}
