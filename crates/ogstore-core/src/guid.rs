use std::fmt;
use std::str::FromStr;

use crate::error::OgError;

/// A 16-byte GUID/UUID, formatted as `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Guid([u8; 16]);

impl Guid {
    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Guid(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7], b[8], b[9], b[10], b[11], b[12], b[13], b[14], b[15]
        )
    }
}

impl FromStr for Guid {
    type Err = OgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s).map_err(|e| {
            tracing::debug!(input = s, "failed to parse GUID string");
            e
        })
    }
}

fn parse(s: &str) -> Result<Guid, OgError> {
    let hex: String = s.chars().filter(|c| *c != '-').collect();
    if hex.len() != 32 {
        return Err(OgError::InvalidGuid(s.to_string()));
    }
    let mut bytes = [0u8; 16];
    for (i, byte) in bytes.iter_mut().enumerate() {
        let slice = &hex[i * 2..i * 2 + 2];
        *byte = u8::from_str_radix(slice, 16).map_err(|_| OgError::InvalidGuid(s.to_string()))?;
    }
    Ok(Guid(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_string() {
        let raw = "12345678-1234-5678-1234-567812345678";
        let guid: Guid = raw.parse().unwrap();
        assert_eq!(guid.to_string(), raw);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!("not-a-guid".parse::<Guid>().is_err());
    }
}
