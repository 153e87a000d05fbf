use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const UNITS: [(&str, &str, u32); 6] = [
    ("EiB", "EB", 60),
    ("PiB", "PB", 50),
    ("TiB", "TB", 40),
    ("GiB", "GB", 30),
    ("MiB", "MB", 20),
    ("KiB", "KB", 10),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseByteSizeError {
    #[error("empty byte size")]
    Empty,

    #[error("invalid byte size {0:?}")]
    Invalid(String),

    #[error("byte size {0:?} overflows 64 bits")]
    Overflow(String),
}

/// A size in bytes, written with base-2 units (`512KiB`, `10MiB`).
///
/// The short spellings (`KB`, `MB`, ...) are accepted as well and are also
/// interpreted as powers of two. A value of zero means "no limit".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ByteSize(pub u64);

impl ByteSize {
    pub fn as_u64(self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl FromStr for ByteSize {
    type Err = ParseByteSizeError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ParseByteSizeError::Empty);
        }

        let split = input
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(input.len());
        let (digits, unit) = input.split_at(split);
        if digits.is_empty() {
            return Err(ParseByteSizeError::Invalid(input.to_string()));
        }

        let value: u64 = digits
            .parse()
            .map_err(|_| ParseByteSizeError::Overflow(input.to_string()))?;

        let shift = match unit {
            "" | "B" => 0,
            unit => UNITS
                .iter()
                .find(|(long, short, _)| unit == *long || unit == *short)
                .map(|(_, _, shift)| *shift)
                .ok_or_else(|| ParseByteSizeError::Invalid(input.to_string()))?,
        };

        value
            .checked_mul(1u64 << shift)
            .map(ByteSize)
            .ok_or_else(|| ParseByteSizeError::Overflow(input.to_string()))
    }
}

impl fmt::Display for ByteSize {
    /// Formats with the largest unit that divides the value exactly.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 != 0 {
            for (unit, _, shift) in UNITS {
                let base = 1u64 << shift;
                if self.0 % base == 0 {
                    return write!(f, "{}{}", self.0 / base, unit);
                }
            }
        }
        write!(f, "{}B", self.0)
    }
}

impl Serialize for ByteSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ByteSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ByteSizeVisitor;

        impl<'de> Visitor<'de> for ByteSizeVisitor {
            type Value = ByteSize;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a byte size such as 512KiB or 10MiB")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<ByteSize, E> {
                Ok(ByteSize(value))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<ByteSize, E> {
                u64::try_from(value)
                    .map(ByteSize)
                    .map_err(|_| E::invalid_value(de::Unexpected::Signed(value), &self))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<ByteSize, E> {
                value.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(ByteSizeVisitor)
    }
}
