//! Elemental types and the type-effectiveness chart.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the 18 elemental types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PokemonType {
    Normal,
    Fire,
    Water,
    Electric,
    Grass,
    Ice,
    Fighting,
    Poison,
    Ground,
    Flying,
    Psychic,
    Bug,
    Rock,
    Ghost,
    Dragon,
    Dark,
    Steel,
    Fairy,
}

impl PokemonType {
    /// Every type, in chart order.
    pub const ALL: [PokemonType; 18] = [
        PokemonType::Normal,
        PokemonType::Fire,
        PokemonType::Water,
        PokemonType::Electric,
        PokemonType::Grass,
        PokemonType::Ice,
        PokemonType::Fighting,
        PokemonType::Poison,
        PokemonType::Ground,
        PokemonType::Flying,
        PokemonType::Psychic,
        PokemonType::Bug,
        PokemonType::Rock,
        PokemonType::Ghost,
        PokemonType::Dragon,
        PokemonType::Dark,
        PokemonType::Steel,
        PokemonType::Fairy,
    ];

    /// Lowercase tag, as used by the data source.
    pub fn name(self) -> &'static str {
        match self {
            PokemonType::Normal => "normal",
            PokemonType::Fire => "fire",
            PokemonType::Water => "water",
            PokemonType::Electric => "electric",
            PokemonType::Grass => "grass",
            PokemonType::Ice => "ice",
            PokemonType::Fighting => "fighting",
            PokemonType::Poison => "poison",
            PokemonType::Ground => "ground",
            PokemonType::Flying => "flying",
            PokemonType::Psychic => "psychic",
            PokemonType::Bug => "bug",
            PokemonType::Rock => "rock",
            PokemonType::Ghost => "ghost",
            PokemonType::Dragon => "dragon",
            PokemonType::Dark => "dark",
            PokemonType::Steel => "steel",
            PokemonType::Fairy => "fairy",
        }
    }

    /// Multiplier for an attack of type `attacking` hitting a single `defending` type.
    ///
    /// Returns 2.0 (super effective), 1.0, 0.5 (not very effective) or 0.0 (no effect).
    pub fn effectiveness(attacking: PokemonType, defending: PokemonType) -> f32 {
        use PokemonType::*;

        match (attacking, defending) {
            (Normal, Ghost) => 0.0,
            (Normal, Rock | Steel) => 0.5,
            (Normal, _) => 1.0,

            (Fire, Fire | Water | Rock | Dragon) => 0.5,
            (Fire, Grass | Ice | Bug | Steel) => 2.0,
            (Fire, _) => 1.0,

            (Water, Water | Grass | Dragon) => 0.5,
            (Water, Fire | Ground | Rock) => 2.0,
            (Water, _) => 1.0,

            (Electric, Ground) => 0.0,
            (Electric, Electric | Grass | Dragon) => 0.5,
            (Electric, Water | Flying) => 2.0,
            (Electric, _) => 1.0,

            (Grass, Fire | Grass | Poison | Flying | Bug | Dragon | Steel) => 0.5,
            (Grass, Water | Ground | Rock) => 2.0,
            (Grass, _) => 1.0,

            (Ice, Fire | Water | Ice | Steel) => 0.5,
            (Ice, Grass | Ground | Flying | Dragon) => 2.0,
            (Ice, _) => 1.0,

            (Fighting, Ghost) => 0.0,
            (Fighting, Poison | Flying | Psychic | Bug | Fairy) => 0.5,
            (Fighting, Normal | Ice | Rock | Dark | Steel) => 2.0,
            (Fighting, _) => 1.0,

            (Poison, Steel) => 0.0,
            (Poison, Poison | Ground | Rock | Ghost) => 0.5,
            (Poison, Grass | Fairy) => 2.0,
            (Poison, _) => 1.0,

            (Ground, Flying) => 0.0,
            (Ground, Grass | Bug) => 0.5,
            (Ground, Fire | Electric | Poison | Rock | Steel) => 2.0,
            (Ground, _) => 1.0,

            (Flying, Electric | Rock | Steel) => 0.5,
            (Flying, Grass | Fighting | Bug) => 2.0,
            (Flying, _) => 1.0,

            (Psychic, Dark) => 0.0,
            (Psychic, Psychic | Steel) => 0.5,
            (Psychic, Fighting | Poison) => 2.0,
            (Psychic, _) => 1.0,

            (Bug, Fire | Fighting | Poison | Flying | Ghost | Steel | Fairy) => 0.5,
            (Bug, Grass | Psychic | Dark) => 2.0,
            (Bug, _) => 1.0,

            (Rock, Fighting | Ground | Steel) => 0.5,
            (Rock, Fire | Ice | Flying | Bug) => 2.0,
            (Rock, _) => 1.0,

            (Ghost, Normal) => 0.0,
            (Ghost, Dark) => 0.5,
            (Ghost, Ghost | Psychic) => 2.0,
            (Ghost, _) => 1.0,

            (Dragon, Fairy) => 0.0,
            (Dragon, Steel) => 0.5,
            (Dragon, Dragon) => 2.0,
            (Dragon, _) => 1.0,

            (Dark, Fighting | Dark | Fairy) => 0.5,
            (Dark, Psychic | Ghost) => 2.0,
            (Dark, _) => 1.0,

            (Steel, Fire | Water | Electric | Steel) => 0.5,
            (Steel, Ice | Rock | Fairy) => 2.0,
            (Steel, _) => 1.0,

            (Fairy, Fire | Poison | Steel) => 0.5,
            (Fairy, Fighting | Dragon | Dark) => 2.0,
            (Fairy, _) => 1.0,
        }
    }

    /// Multiplier for this attacking type against a full (possibly dual) typing.
    ///
    /// Dual-type multipliers compound, so the result is one of
    /// 0, 0.25, 0.5, 1, 2 or 4.
    pub fn against(self, defending: &[PokemonType]) -> f32 {
        defending
            .iter()
            .map(|&d| Self::effectiveness(self, d))
            .product()
    }
}

impl fmt::Display for PokemonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name();
        let mut chars = name.chars();
        if let Some(first) = chars.next() {
            write!(f, "{}{}", first.to_ascii_uppercase(), chars.as_str())?;
        }
        Ok(())
    }
}

/// Error returned when a type tag is not part of the vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown Pokemon type: {0}")]
pub struct UnknownType(pub String);

impl FromStr for PokemonType {
    type Err = UnknownType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_lowercase();
        PokemonType::ALL
            .into_iter()
            .find(|t| t.name() == tag)
            .ok_or_else(|| UnknownType(s.to_string()))
    }
}

/// Short label for a compounded multiplier.
pub fn describe_multiplier(multiplier: f32) -> &'static str {
    if multiplier == 0.0 {
        "no effect"
    } else if multiplier >= 4.0 {
        "quadruple super effective"
    } else if multiplier >= 2.0 {
        "super effective"
    } else if multiplier > 0.5 {
        "neutral"
    } else if multiplier > 0.25 {
        "not very effective"
    } else {
        "barely effective"
    }
}
