//! Battle outcome heuristic.
//!
//! Given two records, [`assess`] computes the deterministic signals the
//! verdict is built on:
//! - type effectiveness: each side's best attacking type against the
//!   opponent's full typing, dual types compounding
//! - stat matchup: attack vs. defense and special attack vs. special defense
//!   (the better category), combined with HP into a damage-race estimate
//! - base stat totals
//! - speed order, which also breaks balanced matchups
//!
//! Abilities only produce advisory notes; they never move the score.

use crate::names::same_pokemon;
use crate::pokemon::{describe_multiplier, PokemonRecord, PokemonType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Log2 value used for a 0x multiplier.
const IMMUNITY_FLOOR: f32 = -3.0;
/// Largest contribution any single signal can make, in doublings.
const SIGNAL_CAP: f32 = 3.0;
const TYPE_WEIGHT: f32 = 1.0;
const STAT_WEIGHT: f32 = 1.0;
const TOTAL_WEIGHT: f32 = 1.0;
/// Scores closer to zero than this are treated as balanced.
const BALANCED_BELOW: f32 = 0.15;
/// Scores at least this far from zero are decisive.
const DECISIVE_FROM: f32 = 1.0;

/// One side of the matchup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    First,
    Second,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::First => Side::Second,
            Side::Second => Side::First,
        }
    }
}

/// The battle result returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleVerdict {
    pub pokemon_1: String,
    pub pokemon_2: String,
    pub analysis: String,
    pub reasoning: String,
    pub winner: String,
}

impl BattleVerdict {
    /// Which side the winner names, compared case-insensitively.
    pub fn winner_side(&self) -> Option<Side> {
        if same_pokemon(&self.winner, &self.pokemon_1) {
            Some(Side::First)
        } else if same_pokemon(&self.winner, &self.pokemon_2) {
            Some(Side::Second)
        } else {
            None
        }
    }

    /// Name on the given side.
    pub fn name_of(&self, side: Side) -> &str {
        match side {
            Side::First => &self.pokemon_1,
            Side::Second => &self.pokemon_2,
        }
    }
}

/// Which stat pair a side attacks with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackCategory {
    Physical,
    Special,
}

impl fmt::Display for AttackCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttackCategory::Physical => write!(f, "physical"),
            AttackCategory::Special => write!(f, "special"),
        }
    }
}

/// Who acts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedOrder {
    Faster(Side),
    Tied,
}

/// How lopsided the matchup is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Margin {
    Decisive,
    Narrow,
    Balanced,
}

/// Offensive picture for one side against the other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SideReport {
    pub name: String,
    /// Type label such as "Grass/Poison".
    pub types: String,
    /// This side's type that hits the opponent hardest.
    pub best_attacking_type: PokemonType,
    /// Compounded multiplier of that type against the opponent's typing.
    pub type_multiplier: f32,
    /// attack / opponent defense
    pub physical_ratio: f32,
    /// special_attack / opponent special_defense
    pub special_ratio: f32,
    pub category: AttackCategory,
    pub hp: u32,
    pub speed: u32,
    pub stat_total: u32,
}

impl SideReport {
    fn build(attacker: &PokemonRecord, defender: &PokemonRecord) -> Self {
        let (best_attacking_type, type_multiplier) = best_attacking_type(attacker, defender);
        let stats = &attacker.base_stats;
        let opp = &defender.base_stats;

        let physical_ratio = stats.attack as f32 / opp.defense.max(1) as f32;
        let special_ratio = stats.special_attack as f32 / opp.special_defense.max(1) as f32;
        let category = if special_ratio > physical_ratio {
            AttackCategory::Special
        } else {
            AttackCategory::Physical
        };

        Self {
            name: attacker.display_name.clone(),
            types: attacker.type_label(),
            best_attacking_type,
            type_multiplier,
            physical_ratio,
            special_ratio,
            category,
            hp: stats.hp,
            speed: stats.speed,
            stat_total: stats.total(),
        }
    }

    /// Offensive stat ratio in the chosen category.
    pub fn best_ratio(&self) -> f32 {
        self.physical_ratio.max(self.special_ratio)
    }
}

/// Deterministic signals for a two-Pokemon matchup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleAssessment {
    pub first: SideReport,
    pub second: SideReport,
    pub speed: SpeedOrder,
    /// Type advantage of the first side, in doublings.
    pub type_edge: f32,
    /// Damage-race advantage of the first side, in doublings.
    pub stat_edge: f32,
    /// Relative base stat total advantage of the first side.
    pub total_edge: f32,
    /// Weighted sum; positive favours the first side.
    pub score: f32,
    pub margin: Margin,
    pub favored: Side,
    /// Advisory ability remarks.
    pub ability_notes: Vec<String>,
}

/// Compute the deterministic battle signals for `first` vs. `second`.
pub fn assess(first: &PokemonRecord, second: &PokemonRecord) -> BattleAssessment {
    let a = SideReport::build(first, second);
    let b = SideReport::build(second, first);

    let speed = match a.speed.cmp(&b.speed) {
        std::cmp::Ordering::Greater => SpeedOrder::Faster(Side::First),
        std::cmp::Ordering::Less => SpeedOrder::Faster(Side::Second),
        std::cmp::Ordering::Equal => SpeedOrder::Tied,
    };

    let type_edge = cap(doublings(a.type_multiplier) - doublings(b.type_multiplier));

    // Turns for a side to knock the other out scale with opponent HP over
    // its own offensive ratio; compare the two races in doublings.
    let race_a = a.best_ratio() * a.hp.max(1) as f32;
    let race_b = b.best_ratio() * b.hp.max(1) as f32;
    let stat_edge = if race_a <= 0.0 || race_b <= 0.0 {
        0.0
    } else {
        cap((race_a / race_b).log2())
    };

    let total_max = a.stat_total.max(b.stat_total).max(1) as f32;
    let total_edge = (a.stat_total as f32 - b.stat_total as f32) / total_max;

    let score = TYPE_WEIGHT * type_edge + STAT_WEIGHT * stat_edge + TOTAL_WEIGHT * total_edge;

    let margin = if score.abs() < BALANCED_BELOW {
        Margin::Balanced
    } else if score.abs() < DECISIVE_FROM {
        Margin::Narrow
    } else {
        Margin::Decisive
    };

    let favored = match (margin, speed) {
        (Margin::Balanced, SpeedOrder::Faster(side)) => side,
        (Margin::Balanced, SpeedOrder::Tied) => {
            if b.stat_total > a.stat_total {
                Side::Second
            } else {
                Side::First
            }
        }
        _ if score < 0.0 => Side::Second,
        _ => Side::First,
    };

    let mut ability_notes = ability_notes_for(first, second);
    ability_notes.extend(ability_notes_for(second, first));

    BattleAssessment {
        first: a,
        second: b,
        speed,
        type_edge,
        stat_edge,
        total_edge,
        score,
        margin,
        favored,
        ability_notes,
    }
}

fn cap(value: f32) -> f32 {
    value.clamp(-SIGNAL_CAP, SIGNAL_CAP)
}

fn doublings(multiplier: f32) -> f32 {
    if multiplier <= 0.0 {
        IMMUNITY_FLOOR
    } else {
        multiplier.log2()
    }
}

/// The attacker's type with the highest multiplier against the defender.
fn best_attacking_type(attacker: &PokemonRecord, defender: &PokemonRecord) -> (PokemonType, f32) {
    let mut best = (PokemonType::Normal, f32::MIN);
    for &t in &attacker.types {
        let m = t.against(&defender.types);
        if m > best.1 {
            best = (t, m);
        }
    }
    if best.1 == f32::MIN {
        // Untyped records attack as Normal.
        (PokemonType::Normal, PokemonType::Normal.against(&defender.types))
    } else {
        best
    }
}

/// Abilities that blunt specific attacking types.
const TYPE_ABILITIES: &[(&str, &[PokemonType], &str)] = &[
    ("levitate", &[PokemonType::Ground], "is immune to Ground attacks"),
    ("earth-eater", &[PokemonType::Ground], "absorbs Ground attacks"),
    ("volt-absorb", &[PokemonType::Electric], "absorbs Electric attacks"),
    ("lightning-rod", &[PokemonType::Electric], "draws in and absorbs Electric attacks"),
    ("motor-drive", &[PokemonType::Electric], "absorbs Electric attacks and gains speed"),
    ("water-absorb", &[PokemonType::Water], "absorbs Water attacks"),
    ("storm-drain", &[PokemonType::Water], "draws in and absorbs Water attacks"),
    ("dry-skin", &[PokemonType::Water], "absorbs Water attacks"),
    ("flash-fire", &[PokemonType::Fire], "absorbs Fire attacks and powers up its own"),
    ("well-baked-body", &[PokemonType::Fire], "absorbs Fire attacks"),
    ("sap-sipper", &[PokemonType::Grass], "absorbs Grass attacks"),
    (
        "thick-fat",
        &[PokemonType::Fire, PokemonType::Ice],
        "takes half damage from Fire and Ice attacks",
    ),
    ("heatproof", &[PokemonType::Fire], "takes half damage from Fire attacks"),
    ("purifying-salt", &[PokemonType::Ghost], "takes half damage from Ghost attacks"),
];

/// Notes on `defender`'s abilities that touch `attacker`'s types.
fn ability_notes_for(defender: &PokemonRecord, attacker: &PokemonRecord) -> Vec<String> {
    let mut notes = Vec::new();
    for (ability, blunted, effect) in TYPE_ABILITIES {
        if !defender.has_ability(ability) {
            continue;
        }
        if attacker.types.iter().any(|t| blunted.contains(t)) {
            notes.push(format!(
                "{} may have {}, which {}; this matters against {}'s {} typing.",
                defender.display_name,
                ability,
                effect,
                attacker.display_name,
                attacker.type_label()
            ));
        }
    }
    if defender.has_ability("wonder-guard") {
        notes.push(format!(
            "{}'s wonder-guard only lets super-effective hits through.",
            defender.display_name
        ));
    }
    notes
}

impl BattleAssessment {
    pub fn side(&self, side: Side) -> &SideReport {
        match side {
            Side::First => &self.first,
            Side::Second => &self.second,
        }
    }

    /// Whether the two base speeds are equal.
    pub fn speed_tied(&self) -> bool {
        self.speed == SpeedOrder::Tied
    }

    /// Sentence stating who moves first, or that speed is tied.
    pub fn speed_statement(&self, first_name: &str, second_name: &str) -> String {
        match self.speed {
            SpeedOrder::Faster(side) => {
                let (fast, slow) = match side {
                    Side::First => ((first_name, &self.first), (second_name, &self.second)),
                    Side::Second => ((second_name, &self.second), (first_name, &self.first)),
                };
                format!(
                    "{} (speed {}) outspeeds {} (speed {}) and acts first.",
                    fast.0, fast.1.speed, slow.0, slow.1.speed
                )
            }
            SpeedOrder::Tied => format!(
                "Speed is tied at {}, so neither {} nor {} is guaranteed to act first.",
                self.first.speed, first_name, second_name
            ),
        }
    }

    fn type_statement(&self, first_name: &str, second_name: &str) -> String {
        let a = &self.first;
        let b = &self.second;
        let edge = if self.type_edge > 0.0 {
            format!("{first_name} has the type advantage.")
        } else if self.type_edge < 0.0 {
            format!("{second_name} has the type advantage.")
        } else {
            "Neither side has a type advantage.".to_string()
        };
        format!(
            "{first_name}'s {} attacks are {} against {second_name} (x{}), while {second_name}'s {} attacks are {} against {first_name} (x{}). {edge}",
            a.best_attacking_type,
            describe_multiplier(a.type_multiplier),
            a.type_multiplier,
            b.best_attacking_type,
            describe_multiplier(b.type_multiplier),
            b.type_multiplier,
        )
    }

    fn stat_statement(&self, first_name: &str, second_name: &str) -> String {
        let a = &self.first;
        let b = &self.second;
        let leader = if self.stat_edge > 0.0 {
            format!("{first_name} wins the damage race on stats.")
        } else if self.stat_edge < 0.0 {
            format!("{second_name} wins the damage race on stats.")
        } else {
            "The stat matchup is even.".to_string()
        };
        format!(
            "{first_name} attacks best on the {} side ({:.2}x its opponent's matching defense, {} HP); {second_name} on the {} side ({:.2}x, {} HP). {leader}",
            a.category,
            a.best_ratio(),
            a.hp,
            b.category,
            b.best_ratio(),
            b.hp,
        )
    }

    fn conclusion(&self, first_name: &str, second_name: &str) -> String {
        let winner = match self.favored {
            Side::First => first_name,
            Side::Second => second_name,
        };
        match (self.margin, self.speed) {
            (Margin::Decisive, _) => format!("{winner} is the clear favourite."),
            (Margin::Narrow, _) => format!("{winner} holds a narrow edge."),
            (Margin::Balanced, SpeedOrder::Faster(_)) => format!(
                "Types and stats are closely balanced, so moving first decides it: {winner} gets the nod."
            ),
            (Margin::Balanced, SpeedOrder::Tied) => format!(
                "Types and stats are closely balanced and speed is tied, making this a very close call; {winner} gets the nod on base stat total."
            ),
        }
    }

    /// Deterministic analysis paragraph.
    pub fn analysis(&self, first_name: &str, second_name: &str) -> String {
        let mut text = format!(
            "{first_name} ({}, base stat total {}) faces {second_name} ({}, base stat total {}). {}",
            self.first.types,
            self.first.stat_total,
            self.second.types,
            self.second.stat_total,
            self.type_statement(first_name, second_name),
        );
        for note in &self.ability_notes {
            text.push(' ');
            text.push_str(note);
        }
        text
    }

    /// Deterministic reasoning paragraph; always contains the speed statement.
    pub fn reasoning(&self, first_name: &str, second_name: &str) -> String {
        format!(
            "{} {} {}",
            self.speed_statement(first_name, second_name),
            self.stat_statement(first_name, second_name),
            self.conclusion(first_name, second_name),
        )
    }

    /// A complete verdict written from the signals alone.
    pub fn verdict(&self, first_name: &str, second_name: &str) -> BattleVerdict {
        let winner = match self.favored {
            Side::First => first_name,
            Side::Second => second_name,
        };
        BattleVerdict {
            pokemon_1: first_name.to_string(),
            pokemon_2: second_name.to_string(),
            analysis: self.analysis(first_name, second_name),
            reasoning: self.reasoning(first_name, second_name),
            winner: winner.to_string(),
        }
    }

    /// Compact signal summary for model prompts.
    pub fn summary(&self, first_name: &str, second_name: &str) -> String {
        let favored = match self.favored {
            Side::First => first_name,
            Side::Second => second_name,
        };
        let mut lines = vec![
            self.type_statement(first_name, second_name),
            self.stat_statement(first_name, second_name),
            self.speed_statement(first_name, second_name),
            format!(
                "Base stat totals: {first_name} {}, {second_name} {}.",
                self.first.stat_total, self.second.stat_total
            ),
            format!(
                "Heuristic score {:+.2} ({:?}); favoured: {favored}.",
                self.score, self.margin
            ),
        ];
        lines.extend(self.ability_notes.iter().cloned());
        lines.join("\n")
    }
}
