use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Result, SyncError, Version};

const TRANSIENT_MARKER: char = '!';
const VIEW_MODEL_MARKER: char = '*';
const VERSION_MARKER: char = '^';

/// Key representation of an [`Oid`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OidKey {
    /// Session-local sequence, minted before the object is first stored.
    Transient(u64),
    /// Primary key string assigned by the store.
    Persistent(String),
    /// Opaque memento from which a view model can be rebuilt.
    ViewModel(String),
}

/// Stable identity of one logical domain object.
///
/// Two oids are equal iff both the object type and the key representation
/// match. A transient oid is never mutated; at first store it is replaced by
/// the persistent oid produced by [`Oid::as_persistent`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Oid {
    object_type: String,
    key: OidKey,
}

impl Oid {
    pub fn transient(object_type: impl Into<String>, sequence: u64) -> Self {
        Self {
            object_type: object_type.into(),
            key: OidKey::Transient(sequence),
        }
    }

    pub fn persistent(object_type: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            key: OidKey::Persistent(identifier.into()),
        }
    }

    pub fn view_model(object_type: impl Into<String>, memento: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            key: OidKey::ViewModel(memento.into()),
        }
    }

    pub fn object_type(&self) -> &str {
        &self.object_type
    }

    pub fn key(&self) -> &OidKey {
        &self.key
    }

    pub fn is_transient(&self) -> bool {
        matches!(self.key, OidKey::Transient(_))
    }

    pub fn is_persistent(&self) -> bool {
        matches!(self.key, OidKey::Persistent(_))
    }

    pub fn is_view_model(&self) -> bool {
        matches!(self.key, OidKey::ViewModel(_))
    }

    /// The identifier part: sequence, primary key or memento.
    pub fn identifier(&self) -> String {
        match &self.key {
            OidKey::Transient(seq) => seq.to_string(),
            OidKey::Persistent(id) => id.clone(),
            OidKey::ViewModel(memento) => memento.clone(),
        }
    }

    /// Same object type, persistent key.
    pub fn as_persistent(&self, identifier: impl Into<String>) -> Self {
        Self::persistent(self.object_type.clone(), identifier)
    }

    pub fn enstring(&self) -> String {
        let marker = match self.key {
            OidKey::Transient(_) => Some(TRANSIENT_MARKER),
            OidKey::Persistent(_) => None,
            OidKey::ViewModel(_) => Some(VIEW_MODEL_MARKER),
        };
        let mut out = String::new();
        if let Some(marker) = marker {
            out.push(marker);
        }
        out.push_str(&self.object_type);
        out.push(':');
        out.push_str(&escape(&self.identifier()));
        out
    }

    pub fn enstring_with_version(&self, version: Option<&Version>) -> String {
        match version {
            Some(v) => format!("{}{}{}", self.enstring(), VERSION_MARKER, v.enstring()),
            None => self.enstring(),
        }
    }

    /// Parses the form produced by [`Oid::enstring`].
    ///
    /// Everything after the first `:` is the identifier, so mementos may
    /// themselves contain colons. `%25` and `%5E` in the identifier decode to
    /// `%` and `^`.
    pub fn destring(input: &str) -> Result<Self> {
        let (key_kind, rest) = match input.chars().next() {
            Some(TRANSIENT_MARKER) => (Some(TRANSIENT_MARKER), &input[1..]),
            Some(VIEW_MODEL_MARKER) => (Some(VIEW_MODEL_MARKER), &input[1..]),
            Some(_) => (None, input),
            None => return Err(SyncError::malformed_oid(input, "empty")),
        };

        let Some((object_type, identifier)) = rest.split_once(':') else {
            return Err(SyncError::malformed_oid(input, "missing ':' separator"));
        };
        if object_type.is_empty() {
            return Err(SyncError::malformed_oid(input, "missing object type"));
        }
        if identifier.is_empty() {
            return Err(SyncError::malformed_oid(input, "missing identifier"));
        }
        let identifier = unescape(identifier)
            .ok_or_else(|| SyncError::malformed_oid(input, "bad escape in identifier"))?;

        let key = match key_kind {
            Some(TRANSIENT_MARKER) => {
                let seq = identifier.parse::<u64>().map_err(|_| {
                    SyncError::malformed_oid(input, "transient identifier is not a sequence")
                })?;
                OidKey::Transient(seq)
            }
            Some(_) => OidKey::ViewModel(identifier),
            None => OidKey::Persistent(identifier),
        };

        Ok(Self {
            object_type: object_type.to_string(),
            key,
        })
    }

    /// Parses an oid optionally followed by `^SEQ:USER:MILLIS`.
    pub fn destring_with_version(input: &str) -> Result<(Self, Option<Version>)> {
        match input.split_once(VERSION_MARKER) {
            Some((oid_part, version_part)) => {
                let version = Version::destring(version_part)
                    .ok_or_else(|| SyncError::malformed_oid(input, "unparseable version"))?;
                Ok((Self::destring(oid_part)?, Some(version)))
            }
            None => Ok((Self::destring(input)?, None)),
        }
    }
}

/// `%` and `^` are escaped so the version marker only ever appears once.
fn escape(identifier: &str) -> String {
    let mut out = String::with_capacity(identifier.len());
    for c in identifier.chars() {
        match c {
            '%' => out.push_str("%25"),
            VERSION_MARKER => out.push_str("%5E"),
            c => out.push(c),
        }
    }
    out
}

fn unescape(identifier: &str) -> Option<String> {
    let mut out = String::with_capacity(identifier.len());
    let mut rest = identifier;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let code = rest.get(pos + 1..pos + 3)?;
        match code {
            "25" => out.push('%'),
            "5E" | "5e" => out.push(VERSION_MARKER),
            _ => return None,
        }
        rest = &rest[pos + 3..];
    }
    out.push_str(rest);
    Some(out)
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.enstring())
    }
}

impl std::str::FromStr for Oid {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        Self::destring(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_requires_same_key_form() {
        assert_eq!(Oid::persistent("Order", "5"), Oid::persistent("Order", "5"));
        assert_ne!(Oid::persistent("Order", "5"), Oid::transient("Order", 5));
        assert_ne!(Oid::persistent("Order", "5"), Oid::persistent("Invoice", "5"));
    }

    #[test]
    fn test_enstring_forms() {
        assert_eq!(Oid::transient("Order", 12).enstring(), "!Order:12");
        assert_eq!(Oid::persistent("Order", "A-1").enstring(), "Order:A-1");
        assert_eq!(Oid::view_model("Dash", "k=v").enstring(), "*Dash:k=v");
    }

    #[test]
    fn test_destring_memento_with_colons() {
        let oid = Oid::destring("*Report:from:2024:to:2025").unwrap();
        assert!(oid.is_view_model());
        assert_eq!(oid.identifier(), "from:2024:to:2025");
    }

    #[test]
    fn test_destring_rejects_malformed() {
        for bad in ["", "Order", ":5", "Order:", "!Order:abc", "!:1"] {
            let err = Oid::destring(bad).unwrap_err();
            assert!(matches!(err, SyncError::MalformedOid { .. }), "{bad}");
        }
    }

    #[test]
    fn test_destring_with_version() {
        let (oid, version) = Oid::destring_with_version("Order:5^3:ann:").unwrap();
        assert_eq!(oid, Oid::persistent("Order", "5"));
        assert_eq!(version, Some(Version::new(3).with_user("ann")));

        let (oid, version) = Oid::destring_with_version("!Order:2").unwrap();
        assert_eq!(oid, Oid::transient("Order", 2));
        assert!(version.is_none());

        assert!(Oid::destring_with_version("Order:5^x").is_err());
    }

    #[test]
    fn test_marker_characters_in_identifier_round_trip() {
        let oid = Oid::view_model("Search", "a^b 100%");
        assert_eq!(oid.enstring(), "*Search:a%5Eb 100%25");
        assert_eq!(Oid::destring(&oid.enstring()).unwrap(), oid);

        let (parsed, version) = Oid::destring_with_version(&oid.enstring()).unwrap();
        assert_eq!(parsed, oid);
        assert!(version.is_none());

        let versioned = oid.enstring_with_version(Some(&Version::new(4)));
        let (parsed, version) = Oid::destring_with_version(&versioned).unwrap();
        assert_eq!(parsed, oid);
        assert_eq!(version.map(|v| v.sequence()), Some(4));
    }

    #[test]
    fn test_destring_rejects_bad_escape() {
        for bad in ["Order:50%", "Order:%zz", "*Search:%4"] {
            assert!(Oid::destring(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_as_persistent_keeps_type() {
        let transient = Oid::transient("Order", 1);
        let persistent = transient.as_persistent("88");
        assert_eq!(persistent.object_type(), "Order");
        assert!(persistent.is_persistent());
    }
}
