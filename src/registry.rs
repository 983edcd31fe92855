//! Known item-finder manufacturers.
//!
//! Bluetooth SIG company identifiers and the 16-bit service UUIDs each
//! ecosystem advertises its finder network under.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const APPLE_COMPANY_ID: u16 = 0x004C;
pub const GOOGLE_COMPANY_ID: u16 = 0x00E0;
pub const SAMSUNG_COMPANY_ID: u16 = 0x0075;
pub const XIAOMI_COMPANY_ID: u16 = 0x038F;

/// Apple Find My network (exposure-notification style service data).
pub const APPLE_FIND_MY_UUID: u16 = 0xFD6F;
/// Google Fast Pair / Find My Device.
pub const GOOGLE_FAST_PAIR_UUID: u16 = 0xFEF3;
/// Samsung SmartThings Find.
pub const SAMSUNG_FIND_UUID: u16 = 0xFD5A;

/// Manufacturer family an advertisement belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Manufacturer {
    Apple,
    Google,
    Samsung,
    Xiaomi,
    /// Any company id outside the table
    Other,
}

impl Manufacturer {
    /// The four manufacturers that can be classified, in mask bit order.
    pub const KNOWN: [Manufacturer; 4] = [
        Manufacturer::Apple,
        Manufacturer::Google,
        Manufacturer::Samsung,
        Manufacturer::Xiaomi,
    ];

    pub fn from_company_id(id: u16) -> Self {
        match id {
            APPLE_COMPANY_ID => Manufacturer::Apple,
            GOOGLE_COMPANY_ID => Manufacturer::Google,
            SAMSUNG_COMPANY_ID => Manufacturer::Samsung,
            XIAOMI_COMPANY_ID => Manufacturer::Xiaomi,
            _ => Manufacturer::Other,
        }
    }

    pub fn company_id(&self) -> Option<u16> {
        match self {
            Manufacturer::Apple => Some(APPLE_COMPANY_ID),
            Manufacturer::Google => Some(GOOGLE_COMPANY_ID),
            Manufacturer::Samsung => Some(SAMSUNG_COMPANY_ID),
            Manufacturer::Xiaomi => Some(XIAOMI_COMPANY_ID),
            Manufacturer::Other => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Manufacturer::Apple => "Apple",
            Manufacturer::Google => "Google",
            Manufacturer::Samsung => "Samsung",
            Manufacturer::Xiaomi => "Xiaomi",
            Manufacturer::Other => "Other",
        }
    }

    /// Bit in [`ManufacturerMask`] enabling this manufacturer. `Other` has none.
    fn mask_bit(&self) -> u8 {
        match self {
            Manufacturer::Apple => 1 << 0,
            Manufacturer::Google => 1 << 1,
            Manufacturer::Samsung => 1 << 2,
            Manufacturer::Xiaomi => 1 << 3,
            Manufacturer::Other => 0,
        }
    }
}

impl fmt::Display for Manufacturer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Display name for a company identifier; `"Other"` when it is not in the table.
pub fn company_name(id: u16) -> &'static str {
    Manufacturer::from_company_id(id).name()
}

/// Owning manufacturer of a finder-network service UUID.
pub fn service_uuid_to_company(uuid: u16) -> Option<Manufacturer> {
    match uuid {
        APPLE_FIND_MY_UUID => Some(Manufacturer::Apple),
        GOOGLE_FAST_PAIR_UUID => Some(Manufacturer::Google),
        SAMSUNG_FIND_UUID => Some(Manufacturer::Samsung),
        _ => None,
    }
}

/// Per-manufacturer enable flags.
///
/// bit0 = Apple, bit1 = Google, bit2 = Samsung, bit3 = Xiaomi.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManufacturerMask(u8);

impl ManufacturerMask {
    pub const ALL: ManufacturerMask = ManufacturerMask(0x0F);
    pub const NONE: ManufacturerMask = ManufacturerMask(0x00);

    /// Build a mask from raw bits. Returns `None` if bits above bit3 are set.
    pub const fn from_bits(bits: u8) -> Option<Self> {
        if bits & !Self::ALL.0 == 0 {
            Some(Self(bits))
        } else {
            None
        }
    }

    pub const fn bits(&self) -> u8 {
        self.0
    }

    pub fn is_enabled(&self, manufacturer: Manufacturer) -> bool {
        self.0 & manufacturer.mask_bit() != 0
    }
}

impl Default for ManufacturerMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// Errors returned when parsing a manufacturer mask.
#[derive(Error, Debug, PartialEq)]
pub enum ParseMaskError {
    #[error("invalid manufacturer mask: '{0}' is not a number")]
    InvalidNumber(String),
    #[error("invalid manufacturer mask: {0:#X} sets bits above 0xF")]
    OutOfRange(u32),
}

impl FromStr for ManufacturerMask {
    type Err = ParseMaskError;

    /// Accepts `0x`-prefixed hex (`0xF`) or decimal (`15`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let value = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => s.parse::<u32>(),
        }
        .map_err(|_| ParseMaskError::InvalidNumber(s.to_string()))?;

        u8::try_from(value)
            .ok()
            .and_then(ManufacturerMask::from_bits)
            .ok_or(ParseMaskError::OutOfRange(value))
    }
}

/// clap value parser for `--manufacturer-mask`.
pub fn parse_mask(src: &str) -> Result<ManufacturerMask, ParseMaskError> {
    src.parse()
}
