//! Address type for firmware module bookkeeping.
//!
//! An [`Address`] is a plain 64-bit unsigned value whose textual form is the
//! canonical lowercase hex string. Construction from text or from wider
//! integer types is checked; arithmetic never wraps.

use crate::error::{ModuleError, Result};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A validated 64-bit load address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(u64);

impl Address {
    /// The zero address, used as the sort default for incomplete modules.
    pub const ZERO: Self = Address(0);

    /// Create an address from a raw value. Every `u64` is valid.
    pub const fn new(value: u64) -> Self {
        Address(value)
    }

    /// Parse a hexadecimal string, with or without a `0x` prefix.
    ///
    /// Leading and trailing whitespace is ignored; whitespace inside the
    /// digits is not.
    ///
    /// # Errors
    /// Returns `InvalidAddress` for empty input, signs, non-hex digits, or a
    /// value that does not fit in 64 bits.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if digits.is_empty() {
            return Err(ModuleError::invalid_address(text, "no hex digits"));
        }
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ModuleError::invalid_address(text, "not a hexadecimal integer"));
        }

        u64::from_str_radix(digits, 16)
            .map(Address)
            .map_err(|_| ModuleError::invalid_address(text, "exceeds 64 bits"))
    }

    /// The numeric value.
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Canonical form: `0x` followed by lowercase hex digits, no padding.
    pub fn to_hex(self) -> String {
        format!("{:#x}", self.0)
    }

    /// Zero-padded lowercase hex without prefix, as used by table rendering.
    pub fn to_padded_hex(self, width: usize) -> String {
        format!("{:0width$x}", self.0, width = width)
    }

    /// Add an offset, failing instead of wrapping.
    pub fn checked_add(self, offset: impl Into<u64>) -> Result<Self> {
        let offset = offset.into();
        self.0
            .checked_add(offset)
            .map(Address)
            .ok_or(ModuleError::AddressOverflow {
                base: self.0,
                offset,
            })
    }

    /// Add another address, failing instead of wrapping.
    pub fn add(self, other: Address) -> Result<Self> {
        self.checked_add(other.0)
    }

    /// Distance from `self` up to `end`, or `None` if `end` lies below.
    pub fn distance_to(self, end: Address) -> Option<u64> {
        end.0.checked_sub(self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl FromStr for Address {
    type Err = ModuleError;

    fn from_str(s: &str) -> Result<Self> {
        Address::parse(s)
    }
}

impl From<u64> for Address {
    fn from(value: u64) -> Self {
        Address(value)
    }
}

impl From<u32> for Address {
    fn from(value: u32) -> Self {
        Address(u64::from(value))
    }
}

impl From<Address> for u64 {
    fn from(addr: Address) -> Self {
        addr.0
    }
}

impl TryFrom<i64> for Address {
    type Error = ModuleError;

    fn try_from(value: i64) -> Result<Self> {
        u64::try_from(value)
            .map(Address)
            .map_err(|_| ModuleError::invalid_address(value, "address must not be negative"))
    }
}

impl TryFrom<i128> for Address {
    type Error = ModuleError;

    fn try_from(value: i128) -> Result<Self> {
        if value < 0 {
            return Err(ModuleError::invalid_address(
                value,
                "address must not be negative",
            ));
        }
        u64::try_from(value)
            .map(Address)
            .map_err(|_| ModuleError::invalid_address(value, "exceeds 64 bits"))
    }
}

impl TryFrom<u128> for Address {
    type Error = ModuleError;

    fn try_from(value: u128) -> Result<Self> {
        u64::try_from(value)
            .map(Address)
            .map_err(|_| ModuleError::invalid_address(value, "exceeds 64 bits"))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

struct AddressVisitor;

impl<'de> Visitor<'de> for AddressVisitor {
    type Value = Address;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a hex address string or a non-negative integer")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Address, E> {
        Address::parse(v).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Address, E> {
        Ok(Address(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Address, E> {
        Address::try_from(v).map_err(E::custom)
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> std::result::Result<Address, E> {
        Address::try_from(v).map_err(E::custom)
    }

    fn visit_i128<E: de::Error>(self, v: i128) -> std::result::Result<Address, E> {
        Address::try_from(v).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(AddressVisitor)
    }
}
