//! Tenant slug validation
//!
//! A slug identifies a tenant in URLs (the override query parameter) and on
//! disk (the tenant's template root). Because it becomes a path component,
//! only lowercase ASCII letters, digits and single inner hyphens are accepted:
//!
//! - `servelec` / `servelec-ingenieria` / `acme2` are valid
//! - `Servelec`, `../etc`, `a_b`, `-a`, `a--b`, `_default` are rejected

use crate::{ProtoError, MAX_SLUG_LEN};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A validated tenant slug
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantSlug(String);

impl TenantSlug {
    /// Parse and validate a slug
    ///
    /// # Examples
    /// ```
    /// use sitemux_proto::TenantSlug;
    ///
    /// assert!(TenantSlug::parse("servelec-ingenieria").is_ok());
    /// assert!(TenantSlug::parse("../secrets").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self, ProtoError> {
        if is_valid_slug(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(ProtoError::InvalidSlug(s.to_string()))
        }
    }

    /// Derive a slug from a display name
    ///
    /// Accented Latin letters are folded to ASCII, everything that is not a
    /// letter or digit collapses into a single hyphen.
    pub fn from_name(name: &str) -> Result<Self, ProtoError> {
        let mut slug = String::with_capacity(name.len());
        let mut pending_hyphen = false;

        for c in name.chars() {
            match fold_char(c) {
                Some(folded) => {
                    if pending_hyphen && !slug.is_empty() {
                        slug.push('-');
                    }
                    pending_hyphen = false;
                    slug.push(folded);
                }
                None => pending_hyphen = true,
            }
        }

        if slug.len() > MAX_SLUG_LEN {
            slug.truncate(MAX_SLUG_LEN);
            while slug.ends_with('-') {
                slug.pop();
            }
        }

        Self::parse(&slug).map_err(|_| ProtoError::InvalidSlug(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

fn is_valid_slug(s: &str) -> bool {
    if s.is_empty() || s.len() > MAX_SLUG_LEN {
        return false;
    }

    // Every hyphen-separated segment must be non-empty, which also rules out
    // leading, trailing and doubled hyphens.
    s.split('-').all(|segment| {
        !segment.is_empty()
            && segment
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
    })
}

/// Map a character to its slug form, or `None` if it acts as a separator
fn fold_char(c: char) -> Option<char> {
    if c.is_ascii_alphanumeric() {
        return Some(c.to_ascii_lowercase());
    }

    let folded = match c {
        'á' | 'à' | 'ä' | 'â' | 'ã' | 'å' | 'Á' | 'À' | 'Ä' | 'Â' | 'Ã' | 'Å' => 'a',
        'é' | 'è' | 'ë' | 'ê' | 'É' | 'È' | 'Ë' | 'Ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' | 'Í' | 'Ì' | 'Ï' | 'Î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' | 'õ' | 'Ó' | 'Ò' | 'Ö' | 'Ô' | 'Õ' => 'o',
        'ú' | 'ù' | 'ü' | 'û' | 'Ú' | 'Ù' | 'Ü' | 'Û' => 'u',
        'ñ' | 'Ñ' => 'n',
        'ç' | 'Ç' => 'c',
        _ => return None,
    };

    Some(folded)
}

impl fmt::Display for TenantSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TenantSlug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for TenantSlug {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TenantSlug {
    type Error = ProtoError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TenantSlug> for String {
    fn from(slug: TenantSlug) -> Self {
        slug.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_slugs() {
        for slug in ["servelec", "servelec-ingenieria", "acme2", "a", "1-2-3"] {
            assert!(TenantSlug::parse(slug).is_ok(), "expected {slug} to be valid");
        }
    }

    #[test]
    fn test_rejects_path_traversal_and_separators() {
        for slug in [
            "",
            "..",
            "../etc",
            "acme/../../x",
            "acme/templates",
            "acme\\x",
            "acme.cl",
            "acme_corp",
            "_default",
        ] {
            assert!(
                TenantSlug::parse(slug).is_err(),
                "expected {slug:?} to be rejected"
            );
        }
    }

    #[test]
    fn test_rejects_uppercase_and_bad_hyphens() {
        assert!(TenantSlug::parse("Acme").is_err());
        assert!(TenantSlug::parse("-acme").is_err());
        assert!(TenantSlug::parse("acme-").is_err());
        assert!(TenantSlug::parse("ac--me").is_err());
    }

    #[test]
    fn test_rejects_overlong() {
        let long = "a".repeat(MAX_SLUG_LEN + 1);
        assert!(TenantSlug::parse(&long).is_err());
        assert!(TenantSlug::parse(&long[..MAX_SLUG_LEN]).is_ok());
    }

    #[test]
    fn test_from_name() {
        let slug = TenantSlug::from_name("Servelec Ingeniería").unwrap();
        assert_eq!(slug.as_str(), "servelec-ingenieria");

        let slug = TenantSlug::from_name("  Fernando & Hijos, Ltda.  ").unwrap();
        assert_eq!(slug.as_str(), "fernando-hijos-ltda");

        let slug = TenantSlug::from_name("Año Nuevo Construcción").unwrap();
        assert_eq!(slug.as_str(), "ano-nuevo-construccion");
    }

    #[test]
    fn test_from_name_without_usable_characters() {
        assert!(TenantSlug::from_name("").is_err());
        assert!(TenantSlug::from_name("!!! ---").is_err());
    }

    #[test]
    fn test_from_name_truncates_without_trailing_hyphen() {
        let name = format!("{} tail", "a".repeat(MAX_SLUG_LEN - 1));
        let slug = TenantSlug::from_name(&name).unwrap();
        assert_eq!(slug.as_str().len(), MAX_SLUG_LEN - 1);
        assert!(!slug.as_str().ends_with('-'));
    }

    #[test]
    fn test_serde_roundtrip_validates() {
        let slug: TenantSlug = serde_json::from_str("\"acme\"").unwrap();
        assert_eq!(slug.as_str(), "acme");
        assert_eq!(serde_json::to_string(&slug).unwrap(), "\"acme\"");

        let bad: Result<TenantSlug, _> = serde_json::from_str("\"../acme\"");
        assert!(bad.is_err());
    }
}
