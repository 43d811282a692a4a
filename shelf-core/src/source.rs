use serde::{Deserialize, Serialize};

/// Upstream platforms whose libraries can be reconciled.
///
/// This enum centralizes source identity (short names, display names, and
/// aliases) and selects the identifier normalization rule applied to raw keys
/// coming from that source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Steam,
    Gog,
    Epic,
    Ea,
    Ubisoft,
    Amazon,
    Itch,
    #[serde(rename = "battlenet")]
    BattleNet,
    /// Games installed outside any launcher (manually added folders).
    Local,
}

/// All source variants in registration order.
const ALL_SOURCES: &[SourceKind] = &[
    SourceKind::Steam,
    SourceKind::Gog,
    SourceKind::Epic,
    SourceKind::Ea,
    SourceKind::Ubisoft,
    SourceKind::Amazon,
    SourceKind::Itch,
    SourceKind::BattleNet,
    SourceKind::Local,
];

impl SourceKind {
    /// Canonical short name used for CLI arguments, snapshot documents, and logs.
    pub fn short_name(&self) -> &'static str {
        match self {
            Self::Steam => "steam",
            Self::Gog => "gog",
            Self::Epic => "epic",
            Self::Ea => "ea",
            Self::Ubisoft => "ubisoft",
            Self::Amazon => "amazon",
            Self::Itch => "itch",
            Self::BattleNet => "battlenet",
            Self::Local => "local",
        }
    }

    /// Full display name for the source.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Steam => "Steam",
            Self::Gog => "GOG Galaxy",
            Self::Epic => "Epic Games Store",
            Self::Ea => "EA app / Origin",
            Self::Ubisoft => "Ubisoft Connect",
            Self::Amazon => "Amazon Games",
            Self::Itch => "itch.io",
            Self::BattleNet => "Battle.net",
            Self::Local => "Local folders",
        }
    }

    /// Whether this source assigns numeric identifiers.
    pub fn numeric_ids(&self) -> bool {
        matches!(self, Self::Steam | Self::Gog | Self::Ubisoft | Self::Itch)
    }

    /// All accepted names for this source (case-insensitive matching).
    ///
    /// The canonical short name is always first.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::Steam => &["steam", "valve"],
            Self::Gog => &["gog", "galaxy", "gog galaxy", "gog.com"],
            Self::Epic => &["epic", "egs", "epic games", "epic games store", "legendary"],
            Self::Ea => &["ea", "origin", "eaapp", "ea app", "ea desktop"],
            Self::Ubisoft => &["ubisoft", "uplay", "ubisoft connect", "ubi"],
            Self::Amazon => &["amazon", "amazon games", "prime gaming"],
            Self::Itch => &["itch", "itch.io", "itchio"],
            Self::BattleNet => &["battlenet", "battle.net", "bnet", "blizzard"],
            Self::Local => &["local", "manual", "folder"],
        }
    }

    /// All source variants.
    pub fn all() -> &'static [SourceKind] {
        ALL_SOURCES
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Error returned when a string cannot be parsed into a `SourceKind`.
#[derive(Debug, Clone)]
pub struct SourceParseError(pub String);

impl std::fmt::Display for SourceParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown source: '{}'", self.0)
    }
}

impl std::error::Error for SourceParseError {}

impl std::str::FromStr for SourceKind {
    type Err = SourceParseError;

    /// Parse a source from any recognized name (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        ALL_SOURCES
            .iter()
            .copied()
            .find(|source| source.aliases().iter().any(|alias| *alias == lower))
            .ok_or_else(|| SourceParseError(s.to_string()))
    }
}

#[cfg(test)]
#[path = "tests/source_tests.rs"]
mod tests;
