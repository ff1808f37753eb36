//! Provider identifiers.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A 128-bit ETW provider identifier in its native field layout.
///
/// Ordering compares `data1`, `data2` and `data3` numerically and then
/// `data4` byte-wise, which is the order the provider dispatch table is
/// sorted in.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Guid {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

impl Guid {
    pub const fn from_fields(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        Self {
            data1,
            data2,
            data3,
            data4,
        }
    }

    /// Creates a GUID from its canonical 128-bit value, e.g.
    /// `0x3d6fa8d1_fe05_11d0_9dda_00c04fd7ba7c`.
    pub const fn from_u128(value: u128) -> Self {
        let b = value.to_be_bytes();
        Self {
            data1: u32::from_be_bytes([b[0], b[1], b[2], b[3]]),
            data2: u16::from_be_bytes([b[4], b[5]]),
            data3: u16::from_be_bytes([b[6], b[7]]),
            data4: [b[8], b[9], b[10], b[11], b[12], b[13], b[14], b[15]],
        }
    }
}

impl Ord for Guid {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.data1, self.data2, self.data3)
            .cmp(&(other.data1, other.data2, other.data3))
            .then_with(|| self.data4.cmp(&other.data4))
    }
}

impl PartialOrd for Guid {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.data4;
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            self.data1, self.data2, self.data3, d[0], d[1], d[2], d[3], d[4], d[5], d[6], d[7]
        )
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{self}}}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid GUID string: {0:?}")]
pub struct ParseGuidError(String);

impl FromStr for Guid {
    type Err = ParseGuidError;

    /// Accepts `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx` with optional braces,
    /// or the same 32 hex digits without dashes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseGuidError(s.to_string());
        let inner = s
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
            .unwrap_or(s);

        let hex: String = match inner.len() {
            36 => {
                let bytes = inner.as_bytes();
                if [8, 13, 18, 23].iter().any(|&i| bytes[i] != b'-') {
                    return Err(err());
                }
                inner.chars().filter(|&c| c != '-').collect()
            }
            32 => inner.to_string(),
            _ => return Err(err()),
        };
        if hex.len() != 32 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(err());
        }
        u128::from_str_radix(&hex, 16)
            .map(Guid::from_u128)
            .map_err(|_| err())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THREAD: Guid = Guid::from_fields(
        0x3d6fa8d1,
        0xfe05,
        0x11d0,
        [0x9d, 0xda, 0x00, 0xc0, 0x4f, 0xd7, 0xba, 0x7c],
    );

    #[test]
    fn test_from_u128_matches_fields() {
        assert_eq!(Guid::from_u128(0x3d6fa8d1_fe05_11d0_9dda_00c04fd7ba7c), THREAD);
    }

    #[test]
    fn test_display_and_parse() {
        let s = THREAD.to_string();
        assert_eq!(s, "3d6fa8d1-fe05-11d0-9dda-00c04fd7ba7c");
        assert_eq!(s.parse::<Guid>().unwrap(), THREAD);
        assert_eq!(format!("{{{s}}}").parse::<Guid>().unwrap(), THREAD);
        assert_eq!(
            "3D6FA8D1FE0511D09DDA00C04FD7BA7C".parse::<Guid>().unwrap(),
            THREAD
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<Guid>().is_err());
        assert!("3d6fa8d1-fe05-11d0-9dda".parse::<Guid>().is_err());
        assert!("3d6fa8d1+fe05-11d0-9dda-00c04fd7ba7c".parse::<Guid>().is_err());
        assert!("zd6fa8d1-fe05-11d0-9dda-00c04fd7ba7c".parse::<Guid>().is_err());
    }

    #[test]
    fn test_ordering_is_field_wise() {
        let a = Guid::from_fields(1, 0xffff, 0xffff, [0xff; 8]);
        let b = Guid::from_fields(2, 0, 0, [0; 8]);
        assert!(a < b);

        let c = Guid::from_fields(2, 0, 0, [0, 0, 0, 0, 0, 0, 0, 1]);
        assert!(b < c);

        // data2 outranks data3 regardless of magnitude.
        let d = Guid::from_fields(2, 1, 0, [0; 8]);
        let e = Guid::from_fields(2, 0, 0xffff, [0; 8]);
        assert!(e < d);
    }
}
