//! Game and platform catalog plus the [`SelectionKey`] that scopes every
//! collection, parser and parse job.
//!
//! Both enums carry a `None` sentinel meaning "nothing selected". A key that
//! contains `None` in either position never has a parser and never touches the
//! persistent store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a game or platform label is not recognized
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionParseError {
    #[error("Unknown game: {0}")]
    UnknownGame(String),

    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("Selection key must look like <game>/<platform>, got {0}")]
    MalformedKey(String),
}

/// Games that publish SHiFT codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Game {
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "bl2")]
    Borderlands2,
    #[serde(rename = "blps")]
    BorderlandsPreSequel,
    #[serde(rename = "bl3")]
    Borderlands3,
}

impl Game {
    /// Every selectable game, `None` excluded
    pub const ALL: [Game; 3] = [
        Game::Borderlands2,
        Game::BorderlandsPreSequel,
        Game::Borderlands3,
    ];

    /// Human readable name as shown in the game drop-down
    pub fn label(self) -> &'static str {
        match self {
            Game::None => "NONE",
            Game::Borderlands2 => "Borderlands 2",
            Game::BorderlandsPreSequel => "Borderlands: The Pre-Sequel",
            Game::Borderlands3 => "Borderlands 3",
        }
    }

    /// Short identifier used in file names and config files
    pub fn slug(self) -> &'static str {
        match self {
            Game::None => "none",
            Game::Borderlands2 => "bl2",
            Game::BorderlandsPreSequel => "blps",
            Game::Borderlands3 => "bl3",
        }
    }

    pub fn is_none(self) -> bool {
        self == Game::None
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Game {
    type Err = SelectionParseError;

    /// Accepts either the slug or the label, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        if wanted.eq_ignore_ascii_case("none") || wanted.is_empty() {
            return Ok(Game::None);
        }

        Game::ALL
            .into_iter()
            .find(|g| wanted.eq_ignore_ascii_case(g.slug()) || wanted.eq_ignore_ascii_case(g.label()))
            .ok_or_else(|| SelectionParseError::UnknownGame(s.to_string()))
    }
}

/// Platforms a code can be redeemed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Platform {
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "pc")]
    Pc,
    #[serde(rename = "ps")]
    PlayStation,
    #[serde(rename = "xbox")]
    Xbox,
}

impl Platform {
    /// Every selectable platform, `None` excluded
    pub const ALL: [Platform; 3] = [Platform::Pc, Platform::PlayStation, Platform::Xbox];

    pub fn label(self) -> &'static str {
        match self {
            Platform::None => "NONE",
            Platform::Pc => "PC",
            Platform::PlayStation => "PlayStation",
            Platform::Xbox => "Xbox",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            Platform::None => "none",
            Platform::Pc => "pc",
            Platform::PlayStation => "ps",
            Platform::Xbox => "xbox",
        }
    }

    pub fn is_none(self) -> bool {
        self == Platform::None
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Platform {
    type Err = SelectionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        if wanted.eq_ignore_ascii_case("none") || wanted.is_empty() {
            return Ok(Platform::None);
        }

        Platform::ALL
            .into_iter()
            .find(|p| wanted.eq_ignore_ascii_case(p.slug()) || wanted.eq_ignore_ascii_case(p.label()))
            .ok_or_else(|| SelectionParseError::UnknownPlatform(s.to_string()))
    }
}

/// The (game, platform) pair driving which collection and parser are active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SelectionKey {
    pub game: Game,
    pub platform: Platform,
}

impl SelectionKey {
    pub fn new(game: Game, platform: Platform) -> Self {
        Self { game, platform }
    }

    /// The "nothing selected" key
    pub fn none() -> Self {
        Self::default()
    }

    /// True when either half of the key is the `None` sentinel
    pub fn has_none(&self) -> bool {
        self.game.is_none() || self.platform.is_none()
    }

    /// File-system friendly identifier, e.g. `bl3-pc`
    pub fn slug(&self) -> String {
        format!("{}-{}", self.game.slug(), self.platform.slug())
    }
}

impl fmt::Display for SelectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.game.slug(), self.platform.slug())
    }
}

impl FromStr for SelectionKey {
    type Err = SelectionParseError;

    /// Parses `<game>/<platform>`, e.g. `bl3/pc`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (game, platform) = s
            .split_once('/')
            .ok_or_else(|| SelectionParseError::MalformedKey(s.to_string()))?;
        Ok(Self::new(game.parse()?, platform.parse()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_from_slug_and_label() {
        assert_eq!("bl3".parse::<Game>().unwrap(), Game::Borderlands3);
        assert_eq!("Borderlands 2".parse::<Game>().unwrap(), Game::Borderlands2);
        assert_eq!("BLPS".parse::<Game>().unwrap(), Game::BorderlandsPreSequel);
        assert_eq!("NONE".parse::<Game>().unwrap(), Game::None);
    }

    #[test]
    fn test_unknown_game_is_an_error() {
        let err = "Tiny Tina".parse::<Game>().unwrap_err();
        assert_eq!(err, SelectionParseError::UnknownGame("Tiny Tina".to_string()));
    }

    #[test]
    fn test_platform_from_slug_and_label() {
        assert_eq!("pc".parse::<Platform>().unwrap(), Platform::Pc);
        assert_eq!("PlayStation".parse::<Platform>().unwrap(), Platform::PlayStation);
        assert_eq!("XBOX".parse::<Platform>().unwrap(), Platform::Xbox);
        assert!("switch".parse::<Platform>().is_err());
    }

    #[test]
    fn test_key_has_none() {
        assert!(SelectionKey::none().has_none());
        assert!(SelectionKey::new(Game::None, Platform::Pc).has_none());
        assert!(SelectionKey::new(Game::Borderlands3, Platform::None).has_none());
        assert!(!SelectionKey::new(Game::Borderlands3, Platform::Pc).has_none());
    }

    #[test]
    fn test_key_display_round_trip() {
        let key = SelectionKey::new(Game::Borderlands3, Platform::Xbox);
        assert_eq!(key.to_string(), "bl3/xbox");
        assert_eq!(key.slug(), "bl3-xbox");
        assert_eq!("bl3/xbox".parse::<SelectionKey>().unwrap(), key);
        assert!(matches!(
            "bl3".parse::<SelectionKey>(),
            Err(SelectionParseError::MalformedKey(_))
        ));
    }
}
