//! Keyed sequence matching.
//!
//! Given the identity keys of an old and a new sequence, produces the
//! `removed` / `moved` / `inserted` instructions that turn the old order into
//! the new one. Only keys are compared; content changes of matched items are
//! the caller's business.
//!
//! Positions in the instructions refer to the sequence as it looks when the
//! instruction is applied, so they can be replayed one after another:
//!
//! 1. removals of unmatched old items, highest position first;
//! 2. the longest run of matched items already in relative order stays put;
//! 3. walking the new order, every other item is moved (or inserted) right
//!    after its predecessor.

use std::collections::HashMap;
use std::hash::Hash;

use tracing::warn;

/// One step of a keyed reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// New item `item` (an index into the new sequence) goes to position `at`.
    Inserted { at: usize, item: usize },
    /// The element at `from` is taken out and put back at `to`.
    Moved { from: usize, to: usize },
    /// The element at `at` is dropped.
    Removed { at: usize },
}

/// Result of [`match_keyed`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyedMatch {
    pub instructions: Vec<Instruction>,
    /// `(new index, old index)` for every item found on both sides.
    pub pairs: Vec<(usize, usize)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Old(usize),
    New(usize),
}

/// Matches two keyed sequences. `None` keys never match anything.
///
/// Duplicate keys are reported and resolved first-match-wins: a repeated old
/// key is removed, a repeated new key is inserted.
pub fn match_keyed<K: Eq + Hash>(old: &[Option<K>], new: &[Option<K>]) -> KeyedMatch {
    let mut old_index: HashMap<&K, usize> = HashMap::with_capacity(old.len());
    for (i, key) in old.iter().enumerate() {
        if let Some(key) = key {
            if old_index.contains_key(key) {
                warn!(position = i, "duplicate identity key in previous sequence");
            } else {
                old_index.insert(key, i);
            }
        }
    }

    let mut matched_old = vec![false; old.len()];
    let mut new_to_old: Vec<Option<usize>> = Vec::with_capacity(new.len());
    let mut pairs = Vec::new();
    for (j, key) in new.iter().enumerate() {
        let found = key.as_ref().and_then(|k| old_index.get(k).copied());
        match found {
            Some(i) if !matched_old[i] => {
                matched_old[i] = true;
                new_to_old.push(Some(i));
                pairs.push((j, i));
            }
            Some(_) => {
                warn!(position = j, "duplicate identity key in next sequence");
                new_to_old.push(None);
            }
            None => new_to_old.push(None),
        }
    }

    let mut instructions = Vec::new();
    let mut working: Vec<Slot> = (0..old.len()).map(Slot::Old).collect();
    for i in (0..old.len()).rev() {
        if !matched_old[i] {
            instructions.push(Instruction::Removed { at: i });
            working.remove(i);
        }
    }

    let order: Vec<usize> = new_to_old.iter().flatten().copied().collect();
    let mut stable = vec![false; old.len()];
    for i in longest_increasing(&order) {
        stable[i] = true;
    }

    for (j, slot) in new_to_old.iter().enumerate() {
        if let Some(i) = slot {
            if stable[*i] {
                continue;
            }
        }
        let dest = if j == 0 {
            0
        } else {
            let prev = match new_to_old[j - 1] {
                Some(i) => Slot::Old(i),
                None => Slot::New(j - 1),
            };
            position(&working, prev) + 1
        };
        match slot {
            Some(i) => {
                let from = position(&working, Slot::Old(*i));
                let to = if from < dest { dest - 1 } else { dest };
                if from != to {
                    let moved = working.remove(from);
                    working.insert(to, moved);
                    instructions.push(Instruction::Moved { from, to });
                }
            }
            None => {
                working.insert(dest, Slot::New(j));
                instructions.push(Instruction::Inserted { at: dest, item: j });
            }
        }
    }

    KeyedMatch { instructions, pairs }
}

fn position(working: &[Slot], slot: Slot) -> usize {
    // Every predecessor has been placed by the time it is looked up.
    working.iter().position(|s| *s == slot).unwrap_or(working.len())
}

/// Values of one longest strictly increasing subsequence.
fn longest_increasing(seq: &[usize]) -> Vec<usize> {
    let mut tails: Vec<usize> = Vec::new();
    let mut prev: Vec<Option<usize>> = vec![None; seq.len()];
    for (i, &x) in seq.iter().enumerate() {
        let at = tails.partition_point(|&t| seq[t] < x);
        if at > 0 {
            prev[i] = Some(tails[at - 1]);
        }
        if at == tails.len() {
            tails.push(i);
        } else {
            tails[at] = i;
        }
    }
    let mut out = Vec::with_capacity(tails.len());
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        out.push(seq[i]);
        cursor = prev[i];
    }
    out.reverse();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(ks: &[i32]) -> Vec<Option<i32>> {
        ks.iter().copied().map(Some).collect()
    }

    /// Replays instructions on the old keys and returns the result.
    fn replay(old: &[i32], new: &[i32], m: &KeyedMatch) -> Vec<i32> {
        let mut seq = old.to_vec();
        for ins in &m.instructions {
            match *ins {
                Instruction::Inserted { at, item } => seq.insert(at, new[item]),
                Instruction::Moved { from, to } => {
                    let x = seq.remove(from);
                    seq.insert(to, x);
                }
                Instruction::Removed { at } => {
                    seq.remove(at);
                }
            }
        }
        seq
    }

    fn check(old: &[i32], new: &[i32]) -> KeyedMatch {
        let m = match_keyed(&keys(old), &keys(new));
        assert_eq!(replay(old, new, &m), new, "old={old:?} new={new:?}");
        m
    }

    #[test]
    fn identical_sequences_need_nothing() {
        let m = check(&[1, 2, 3], &[1, 2, 3]);
        assert!(m.instructions.is_empty());
        assert_eq!(m.pairs, vec![(0, 0), (1, 1), (2, 2)]);
    }

    #[test]
    fn swap_of_last_two_is_one_move() {
        let m = check(&[1, 2, 3], &[1, 3, 2]);
        assert_eq!(m.instructions, vec![Instruction::Moved { from: 2, to: 1 }]);
    }

    #[test]
    fn rotation_is_one_move() {
        let m = check(&[1, 2, 3, 4], &[2, 3, 4, 1]);
        assert_eq!(m.instructions.len(), 1);
        let m = check(&[1, 2, 3, 4], &[4, 1, 2, 3]);
        assert_eq!(m.instructions.len(), 1);
    }

    #[test]
    fn append_is_one_insert() {
        let m = check(&[1, 2, 3], &[1, 2, 3, 4]);
        assert_eq!(m.instructions, vec![Instruction::Inserted { at: 3, item: 3 }]);
    }

    #[test]
    fn removals_go_from_the_back() {
        let m = check(&[1, 2, 3, 4], &[2, 4]);
        assert_eq!(
            m.instructions,
            vec![Instruction::Removed { at: 2 }, Instruction::Removed { at: 0 }]
        );
    }

    #[test]
    fn mixed_changes_replay() {
        check(&[1, 2, 3, 4, 5], &[6, 5, 3, 7, 1]);
        check(&[], &[1, 2]);
        check(&[1, 2], &[]);
        check(&[5, 4, 3, 2, 1], &[1, 2, 3, 4, 5]);
        check(&[1, 2, 3, 4, 5, 6], &[3, 9, 1, 6, 2, 8]);
    }

    #[test]
    fn duplicate_keys_do_not_panic() {
        let old = keys(&[1, 1, 2]);
        let new = keys(&[2, 1, 1]);
        let m = match_keyed(&old, &new);
        // First old `1` matches the first new `1`; the rest churn.
        assert!(m.pairs.contains(&(1, 0)));
        assert!(m.pairs.contains(&(0, 2)));
        let removed = m
            .instructions
            .iter()
            .filter(|i| matches!(i, Instruction::Removed { .. }))
            .count();
        let inserted = m
            .instructions
            .iter()
            .filter(|i| matches!(i, Instruction::Inserted { .. }))
            .count();
        assert_eq!((removed, inserted), (1, 1));
    }

    #[test]
    fn missing_keys_never_match() {
        let old = vec![None, Some(1)];
        let new = vec![Some(1), None];
        let m = match_keyed(&old, &new);
        assert_eq!(m.pairs, vec![(0, 1)]);
        assert!(m.instructions.contains(&Instruction::Removed { at: 0 }));
    }

    #[test]
    fn lis_picks_earliest_tail() {
        assert_eq!(longest_increasing(&[0, 2, 1]), vec![0, 1]);
        assert_eq!(longest_increasing(&[3, 0, 1, 2]), vec![0, 1, 2]);
        assert!(longest_increasing(&[]).is_empty());
    }
}
