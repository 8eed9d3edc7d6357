//! The water observation bitfield.
//!
//! Every output pixel is one byte:
//!
//! ```text
//! bit 0  (1)    nodata          missing all reflectance bands
//! bit 1  (2)    non-contiguous  missing any band, or saturated
//! bit 2  (4)    sea
//! bit 3  (8)    terrain shadow  or low solar incidence angle
//! bit 4  (16)   high slope
//! bit 5  (32)   cloud shadow
//! bit 6  (64)   cloud
//! bit 7  (128)  wet
//! ```
//!
//! Bits 0-6 are independent and may be combined freely. The wet bit may only
//! be set when every other bit is clear, so the legal values are `0`,
//! `1..=127` and exactly `128`; `129..=255` never appear in a valid output.
//!
//! Producers build arrays with [`combine_observations`] and check them with
//! [`validate_observations`] before an output is accepted.

mod contiguity;
mod layers;
mod validate;

pub use contiguity::{contiguity_flags, derive_contiguity_flags};
pub use layers::{combine_observations, FlagLayers, ShapeMismatch};
pub use validate::{validate_observations, InvariantViolation};

use std::fmt;

/// Clear, dry observation.
pub const DRY: u8 = 0;

/// Clear, wet observation.
pub const WET: u8 = 1 << 7;

/// Mask covering every non-wet flag bit.
pub const FLAG_MASK: u8 = WET - 1;

/// A masking flag. Each maps to one bit below the wet bit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Flag {
    NoData,
    NonContiguous,
    Sea,
    TerrainShadow,
    HighSlope,
    CloudShadow,
    Cloud,
}

impl Flag {
    /// Every flag, in bit order.
    pub const ALL: [Flag; 7] = [
        Flag::NoData,
        Flag::NonContiguous,
        Flag::Sea,
        Flag::TerrainShadow,
        Flag::HighSlope,
        Flag::CloudShadow,
        Flag::Cloud,
    ];

    /// The flag's bit value.
    pub const fn bit(self) -> u8 {
        1 << (self as u8)
    }

    pub fn name(self) -> &'static str {
        match self {
            Flag::NoData => "nodata",
            Flag::NonContiguous => "non_contiguous",
            Flag::Sea => "sea",
            Flag::TerrainShadow => "terrain_shadow",
            Flag::HighSlope => "high_slope",
            Flag::CloudShadow => "cloud_shadow",
            Flag::Cloud => "cloud",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returns true if `value` is a legal observation byte.
#[inline]
pub const fn is_legal(value: u8) -> bool {
    value & WET == 0 || value == WET
}

/// One legal observation byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Observation(u8);

impl Observation {
    /// Composes a byte from a raw wet decision and the OR of the set flags.
    ///
    /// Any set flag forces the wet bit off.
    #[inline]
    pub const fn compose(wet: bool, flags: u8) -> Self {
        let flags = flags & FLAG_MASK;
        if flags != 0 {
            Self(flags)
        } else if wet {
            Self(WET)
        } else {
            Self(DRY)
        }
    }

    /// Wraps a byte, or returns `None` if it is illegal.
    pub const fn new(value: u8) -> Option<Self> {
        if is_legal(value) {
            Some(Self(value))
        } else {
            None
        }
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_wet(self) -> bool {
        self.0 == WET
    }

    /// True for clear observations (wet or dry, no flag set).
    pub const fn is_clear(self) -> bool {
        self.0 & FLAG_MASK == 0
    }

    pub const fn has(self, flag: Flag) -> bool {
        self.0 & flag.bit() != 0
    }

    /// Set flags, in bit order.
    pub fn flags(self) -> impl Iterator<Item = Flag> {
        Flag::ALL.into_iter().filter(move |flag| self.has(*flag))
    }
}
