//! Pokemon name handling.
//!
//! Three jobs live here:
//! - normalizing whatever the user typed into the data source's key
//!   ("Mr. Mime" → `mr-mime`)
//! - suggesting a close known name when a lookup misses
//! - the name-correction safeguard applied to every battle verdict, which
//!   pins the verdict's names to exactly what the caller asked for

use crate::battle::{BattleVerdict, Side};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error for input that cannot name any Pokemon.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("name is empty")]
    Empty,
}

/// A normalized Pokemon name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PokemonName {
    canonical: String,
    display: String,
}

impl PokemonName {
    /// Normalize raw user input.
    pub fn parse(raw: &str) -> Result<Self, NameError> {
        let canonical = canonical_name(raw);
        if canonical.is_empty() {
            return Err(NameError::Empty);
        }
        let display = display_name(&canonical);
        Ok(Self { canonical, display })
    }

    /// Lowercase key used by the data source, e.g. `mr-mime`.
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// Capitalized form, e.g. `Mr-Mime`.
    pub fn display(&self) -> &str {
        &self.display
    }
}

impl std::fmt::Display for PokemonName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display)
    }
}

/// Lowercase, hyphenated lookup key.
///
/// The result holds only alphanumerics and single hyphens, so it is safe as
/// a URL path segment. Periods and apostrophes are dropped, `♀`/`♂` become
/// `-f`/`-m`, and every other character acts as a separator.
pub fn canonical_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_hyphen = false;

    for c in raw.trim().chars() {
        let piece = match c {
            '.' | '\'' | '\u{2019}' => continue,
            '\u{2640}' => {
                pending_hyphen = true;
                "f"
            }
            '\u{2642}' => {
                pending_hyphen = true;
                "m"
            }
            'é' | 'É' => "e",
            c if c.is_alphanumeric() => {
                if pending_hyphen && !out.is_empty() {
                    out.push('-');
                }
                pending_hyphen = false;
                out.extend(c.to_lowercase());
                continue;
            }
            _ => {
                pending_hyphen = true;
                continue;
            }
        };
        if pending_hyphen && !out.is_empty() {
            out.push('-');
        }
        pending_hyphen = false;
        out.push_str(piece);
    }

    out
}

/// Capitalize each hyphen-separated part of a canonical name.
pub fn display_name(canonical: &str) -> String {
    canonical
        .split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Whether two spellings refer to the same Pokemon (case and punctuation insensitive).
pub fn same_pokemon(a: &str, b: &str) -> bool {
    let a = canonical_name(a);
    !a.is_empty() && a == canonical_name(b)
}

/// Levenshtein distance over characters.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// How many edits a suggestion may be away from the query.
fn max_suggestion_distance(len: usize) -> usize {
    match len {
        0..=4 => 1,
        5..=8 => 2,
        _ => 3,
    }
}

/// Closest known name to `query`, if one is close enough to be a likely typo.
///
/// A case-insensitive exact match always wins. Otherwise the known name with
/// the smallest edit distance is returned, ties going to the alphabetically
/// first name.
pub fn suggest_name<S: AsRef<str>>(query: &str, known: &[S]) -> Option<String> {
    let query = canonical_name(query);
    if query.is_empty() {
        return None;
    }

    if let Some(exact) = known
        .iter()
        .map(|k| k.as_ref())
        .find(|k| k.eq_ignore_ascii_case(&query))
    {
        return Some(exact.to_lowercase());
    }

    let limit = max_suggestion_distance(query.chars().count());
    known
        .iter()
        .map(|k| k.as_ref().to_lowercase())
        .map(|k| (edit_distance(&query, &k), k))
        .filter(|(distance, _)| *distance <= limit)
        .min()
        .map(|(_, name)| name)
}

/// What the name-correction safeguard did to a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameCorrection {
    /// Whether pokemon_1 or pokemon_2 was rewritten.
    pub corrected: bool,
    /// Which side the winner refers to after correction, if either.
    pub winner: Option<Side>,
}

/// Pin a verdict's names to the names the caller supplied.
///
/// `pokemon_1` and `pokemon_2` are overwritten with `requested_1` and
/// `requested_2` whenever they differ from them at all, so the caller's exact
/// casing and spelling survive. The winner keeps its identity: it is matched
/// against the requested names first, then against the names the verdict
/// used before correction, and rewritten to the matching requested name.
/// A winner matching neither side is left untouched and reported as `None`.
///
/// Applying it twice is the same as applying it once.
pub fn enforce_requested_names(
    verdict: &mut BattleVerdict,
    requested_1: &str,
    requested_2: &str,
) -> NameCorrection {
    let winner = if same_pokemon(&verdict.winner, requested_1) {
        Some(Side::First)
    } else if same_pokemon(&verdict.winner, requested_2) {
        Some(Side::Second)
    } else if same_pokemon(&verdict.winner, &verdict.pokemon_1) {
        Some(Side::First)
    } else if same_pokemon(&verdict.winner, &verdict.pokemon_2) {
        Some(Side::Second)
    } else {
        None
    };

    let mut corrected = false;
    if verdict.pokemon_1 != requested_1 {
        verdict.pokemon_1 = requested_1.to_string();
        corrected = true;
    }
    if verdict.pokemon_2 != requested_2 {
        verdict.pokemon_2 = requested_2.to_string();
        corrected = true;
    }

    match winner {
        Some(Side::First) => verdict.winner = requested_1.to_string(),
        Some(Side::Second) => verdict.winner = requested_2.to_string(),
        None => {}
    }

    NameCorrection { corrected, winner }
}
