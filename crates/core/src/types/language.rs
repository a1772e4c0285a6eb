//! Display language selection.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Languages the storefront is translated into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ru,
    Uz,
}

impl Language {
    /// All supported languages, in menu order.
    pub const ALL: [Self; 3] = [Self::En, Self::Ru, Self::Uz];

    /// Two-letter code as persisted in storage.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ru => "ru",
            Self::Uz => "uz",
        }
    }

    /// Native display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Ru => "Русский",
            Self::Uz => "O'zbekcha",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error returned for a language code the storefront does not support.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported language code: {0}")]
pub struct UnknownLanguage(pub String);

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|lang| lang.code() == code)
            .ok_or(UnknownLanguage(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("RU".parse::<Language>(), Ok(Language::Ru));
        assert_eq!(" uz ".parse::<Language>(), Ok(Language::Uz));
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(
            "de".parse::<Language>(),
            Err(UnknownLanguage("de".to_string()))
        );
    }

    #[test]
    fn test_code_round_trip() {
        for lang in Language::ALL {
            assert_eq!(lang.code().parse::<Language>(), Ok(lang));
        }
    }
}
