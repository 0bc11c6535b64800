//! Service locale descriptions.

use std::fmt;
use std::str::FromStr;

use crate::monitor::{MonitorError, MonitorResult};

/// Locale recorded in a service descriptor, written as `ll`, `ll_CC` or
/// `ll_CC_variant`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceLocale {
    language: String,
    country: String,
    variant: Option<String>,
}

impl ServiceLocale {
    /// Parse a locale description.
    ///
    /// The description must be exactly 2 or 5 characters, or longer than 6,
    /// with underscores at positions 2 and 5. Language is lowercased and
    /// country uppercased; the variant is kept as given.
    pub fn parse(description: &str) -> MonitorResult<Self> {
        let chars: Vec<char> = description.chars().collect();
        let len = chars.len();

        let mut ok = len == 2 || len == 5 || len > 6;
        if ok && len != 2 {
            ok = chars[2] == '_';
        }
        if ok && len > 5 {
            ok = chars[5] == '_';
        }
        if !ok {
            return Err(MonitorError::InvalidLocale(description.to_string()));
        }

        let language: String = chars[..2].iter().collect::<String>().to_lowercase();
        let country = if len == 2 {
            String::new()
        } else {
            chars[3..5].iter().collect::<String>().to_uppercase()
        };
        let variant = (len > 6).then(|| chars[6..].iter().collect());

        Ok(Self {
            language,
            country,
            variant,
        })
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Country code; empty for a language-only locale.
    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn variant(&self) -> Option<&str> {
        self.variant.as_deref()
    }
}

impl FromStr for ServiceLocale {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ServiceLocale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.language)?;
        if !self.country.is_empty() || self.variant.is_some() {
            write!(f, "_{}", self.country)?;
        }
        if let Some(variant) = &self.variant {
            write!(f, "_{}", variant)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepted_shapes() {
        let l = ServiceLocale::parse("EN").unwrap();
        assert_eq!(l.language(), "en");
        assert_eq!(l.country(), "");
        assert_eq!(l.to_string(), "en");

        let l = ServiceLocale::parse("fr_ca").unwrap();
        assert_eq!(l.country(), "CA");
        assert_eq!(l.to_string(), "fr_CA");

        let l = ServiceLocale::parse("no_NO_NY").unwrap();
        assert_eq!(l.variant(), Some("NY"));
        assert_eq!(l.to_string(), "no_NO_NY");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", "e", "eng", "en-US", "en_US_", "en_USX", "en_U"] {
            assert!(
                matches!(ServiceLocale::parse(bad), Err(MonitorError::InvalidLocale(_))),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_from_str() {
        let l: ServiceLocale = "de_DE".parse().unwrap();
        assert_eq!(l.language(), "de");
    }
}
