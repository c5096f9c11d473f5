use std::fmt;
use std::str::FromStr;

use crate::error::OgError;

/// A Windows security identifier: `S-<revision>-<authority>-<sub-authority>...`.
///
/// `component(i)` numbers the whole SID as a flat sequence
/// `[revision, authority, sub_authorities[0], sub_authorities[1], ...]`,
/// so `component(2)` is the first sub-authority — the convention
/// `find_or_add_adjacent_sid` relies on to recognize a "domain SID"
/// (`S-1-5-21-...`) by testing `component(2) == 21`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sid {
    revision: u8,
    authority: u64,
    sub_authorities: Vec<u32>,
}

impl Sid {
    #[must_use]
    pub fn new(revision: u8, authority: u64, sub_authorities: Vec<u32>) -> Self {
        Self {
            revision,
            authority,
            sub_authorities,
        }
    }

    /// The null SID, `S-1-0-0`.
    #[must_use]
    pub fn null() -> Self {
        Sid::new(1, 0, vec![0])
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        self.authority == 0 && self.sub_authorities.iter().all(|&s| s == 0)
    }

    /// `component(0)` is the revision, `component(1)` the authority, and
    /// `component(2 + i)` is `sub_authorities[i]`.
    #[must_use]
    pub fn component(&self, i: usize) -> Option<u64> {
        match i {
            0 => Some(u64::from(self.revision)),
            1 => Some(self.authority),
            n => self.sub_authorities.get(n - 2).map(|&v| u64::from(v)),
        }
    }

    /// Drops the last sub-authority (the RID), yielding the SID of the
    /// containing domain.
    #[must_use]
    pub fn strip_rid(&self) -> Sid {
        let mut sub = self.sub_authorities.clone();
        sub.pop();
        Sid {
            revision: self.revision,
            authority: self.authority,
            sub_authorities: sub,
        }
    }

    #[must_use]
    pub fn sub_authorities(&self) -> &[u32] {
        &self.sub_authorities
    }
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}-{}", self.revision, self.authority)?;
        for sub in &self.sub_authorities {
            write!(f, "-{sub}")?;
        }
        Ok(())
    }
}

impl FromStr for Sid {
    type Err = OgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s).map_err(|e| {
            tracing::debug!(input = s, "failed to parse SID string");
            e
        })
    }
}

fn parse(s: &str) -> Result<Sid, OgError> {
    let mut parts = s.split('-');
    let lead = parts.next().ok_or_else(|| OgError::InvalidSid(s.to_string()))?;
    if !lead.eq_ignore_ascii_case("S") {
        return Err(OgError::InvalidSid(s.to_string()));
    }
    let revision: u8 = parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(|| OgError::InvalidSid(s.to_string()))?;
    let authority: u64 = parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(|| OgError::InvalidSid(s.to_string()))?;
    let sub_authorities: Result<Vec<u32>, _> = parts.map(str::parse::<u32>).collect();
    let sub_authorities = sub_authorities.map_err(|_| OgError::InvalidSid(s.to_string()))?;
    if sub_authorities.is_empty() {
        return Err(OgError::InvalidSid(s.to_string()));
    }
    Ok(Sid::new(revision, authority, sub_authorities))
}

/// Well-known SIDs for common built-in local groups.
pub mod well_known {
    use super::Sid;

    #[must_use]
    pub fn everyone() -> Sid {
        Sid::new(1, 1, vec![0])
    }

    #[must_use]
    pub fn administrators() -> Sid {
        Sid::new(1, 5, vec![32, 544])
    }

    #[must_use]
    pub fn users() -> Sid {
        Sid::new(1, 5, vec![32, 545])
    }

    #[must_use]
    pub fn remote_desktop_users() -> Sid {
        Sid::new(1, 5, vec![32, 555])
    }
}

/// Maps a localized local-group display name to the well-known SID it
/// represents, the way `knownsids.go`'s `groupTranslationTable` maps
/// German/French/Spanish/Dutch/Polish/Danish "Administrators" spellings
/// back to `S-1-5-32-544`. Case-insensitive.
#[must_use]
pub fn translate_localized_group_name(name: &str) -> Option<Sid> {
    let lower = name.to_lowercase();
    match lower.as_str() {
        "administrators" | "administratoren" | "administrateurs" | "administradores"
        | "administratorzy" | "remote desktop users" | "brugere af fjernskrivebord" => {
            Some(well_known::administrators())
        }
        "users" | "benutzer" | "utilisateurs" | "usuarios" | "gebruikers" => {
            Some(well_known::users())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_displays_round_trip() {
        let raw = "S-1-5-21-1004336348-1177238915-682003330-512";
        let sid: Sid = raw.parse().unwrap();
        assert_eq!(sid.to_string(), raw);
    }

    #[test]
    fn component_two_identifies_domain_sid() {
        let sid: Sid = "S-1-5-21-1-2-3-500".parse().unwrap();
        assert_eq!(sid.component(2), Some(21));
    }

    #[test]
    fn strip_rid_drops_last_sub_authority() {
        let sid: Sid = "S-1-5-21-1-2-3-500".parse().unwrap();
        let domain: Sid = "S-1-5-21-1-2-3".parse().unwrap();
        assert_eq!(sid.strip_rid(), domain);
    }

    #[test]
    fn null_sid_is_null() {
        assert!(Sid::null().is_null());
        let real: Sid = "S-1-5-21-1-2-3-500".parse().unwrap();
        assert!(!real.is_null());
    }

    #[test]
    fn translates_localized_administrators() {
        assert_eq!(
            translate_localized_group_name("Administratoren"),
            Some(well_known::administrators())
        );
        assert_eq!(translate_localized_group_name("not a group"), None);
    }
}
