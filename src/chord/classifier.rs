//! Chord shape validation
//!
//! A burst is a valid chord when it holds at least one modifier and
//! exactly one single-letter trigger key.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::hotkey::{is_trigger_identifier, ModifierKind};

/// A validated chord
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedChord {
    /// Modifiers in canonical order, without duplicates
    pub modifiers: Vec<ModifierKind>,
    /// Uppercase ASCII letter
    pub trigger: char,
}

/// Why a burst did not form a chord.
///
/// Used for logging only; rejection is a silent retry for the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChordRejection {
    #[error("no modifier key held")]
    NoModifier,

    #[error("no letter key held")]
    NoTrigger,

    #[error("{0} letter keys held, expected one")]
    MultipleTriggers(usize),
}

/// Partition a burst into modifiers and trigger candidates and validate it
pub fn classify(held: &HashSet<String>) -> Result<CapturedChord, ChordRejection> {
    let mut modifiers = BTreeSet::new();
    let mut letters = Vec::new();

    for key in held {
        if let Some(kind) = ModifierKind::from_identifier(key) {
            modifiers.insert(kind);
        } else if is_trigger_identifier(key) {
            letters.push(key.as_str());
        }
    }

    if modifiers.is_empty() {
        return Err(ChordRejection::NoModifier);
    }

    match letters.as_slice() {
        [] => Err(ChordRejection::NoTrigger),
        [letter] => {
            let trigger = letter
                .chars()
                .next()
                .map(|c| c.to_ascii_uppercase())
                .ok_or(ChordRejection::NoTrigger)?;
            Ok(CapturedChord {
                modifiers: modifiers.into_iter().collect(),
                trigger,
            })
        }
        many => Err(ChordRejection::MultipleTriggers(many.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn held(keys: &[&str]) -> HashSet<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_modifier_plus_letter_accepted() {
        let chord = classify(&held(&["Control", "u"])).unwrap();
        assert_eq!(chord.modifiers, vec![ModifierKind::Control]);
        assert_eq!(chord.trigger, 'U');
    }

    #[test]
    fn test_modifiers_are_canonically_ordered() {
        let chord = classify(&held(&["Shift", "Alt", "Meta", "Control", "k"])).unwrap();
        assert_eq!(chord.modifiers, ModifierKind::ALL.to_vec());
        assert_eq!(chord.trigger, 'K');
    }

    #[test]
    fn test_modifier_only_rejected() {
        assert_eq!(classify(&held(&["Control"])), Err(ChordRejection::NoTrigger));
        assert_eq!(
            classify(&held(&["Control", "Shift"])),
            Err(ChordRejection::NoTrigger)
        );
    }

    #[test]
    fn test_letters_without_modifier_rejected() {
        assert_eq!(classify(&held(&["a", "b"])), Err(ChordRejection::NoModifier));
        assert_eq!(classify(&held(&["a"])), Err(ChordRejection::NoModifier));
    }

    #[test]
    fn test_two_letters_rejected() {
        assert_eq!(
            classify(&held(&["Control", "a", "b"])),
            Err(ChordRejection::MultipleTriggers(2))
        );
    }

    #[test]
    fn test_case_variants_count_as_separate_letters() {
        assert_eq!(
            classify(&held(&["Shift", "u", "U"])),
            Err(ChordRejection::MultipleTriggers(2))
        );
    }

    #[test]
    fn test_non_letter_keys_are_ignored() {
        let chord = classify(&held(&["Alt", "Enter", "1", "r"])).unwrap();
        assert_eq!(chord.modifiers, vec![ModifierKind::Alt]);
        assert_eq!(chord.trigger, 'R');

        assert_eq!(
            classify(&held(&["Alt", "Enter", "1"])),
            Err(ChordRejection::NoTrigger)
        );
    }

    #[test]
    fn test_meta_and_super_collapse() {
        let chord = classify(&held(&["Meta", "Super", "x"])).unwrap();
        assert_eq!(chord.modifiers, vec![ModifierKind::Super]);
    }

    #[test]
    fn test_acceptance_rule_over_small_universe() {
        // Every subset of a small key universe; accept iff >= 1 modifier
        // and exactly one letter.
        let universe = ["Control", "Shift", "Meta", "a", "b", "Tab"];
        for mask in 0u32..(1 << universe.len()) {
            let keys: Vec<&str> = universe
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, k)| *k)
                .collect();
            let modifiers = keys
                .iter()
                .filter(|k| ModifierKind::from_identifier(k).is_some())
                .count();
            let letters = keys.iter().filter(|k| is_trigger_identifier(k)).count();

            let accepted = classify(&held(&keys)).is_ok();
            assert_eq!(accepted, modifiers >= 1 && letters == 1, "keys: {:?}", keys);
        }
    }
}
