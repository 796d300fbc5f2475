//! Collectible cards: unlock rules over round results, and the on-disk list of unlocked cards
//! (XDG config or ~/.config/memblocks).

use crate::game::GameResult;
use crate::{Difficulty, GameMode};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

const FILENAME: &str = "collection";

/// Medium wins faster than this unlock the fast card.
const FAST_WIN_SECS: u32 = 15;

#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no home or config directory to store the collection in")]
    NoConfigDir,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockCondition {
    /// Win a practice round at this difficulty.
    PracticeWin(Difficulty),
    /// Win a practice round at this difficulty in under this many seconds.
    PracticeFastWin(Difficulty, u32),
    /// End a challenge run on this level or higher.
    ChallengeLevel(u32),
}

impl UnlockCondition {
    fn is_met(self, result: &GameResult, mode: GameMode, difficulty: Difficulty) -> bool {
        match self {
            Self::PracticeWin(d) => mode == GameMode::Practice && difficulty == d && result.is_win,
            Self::PracticeFastWin(d, secs) => {
                mode == GameMode::Practice
                    && difficulty == d
                    && result.is_win
                    && result.time_taken < secs
            }
            Self::ChallengeLevel(level) => {
                mode == GameMode::Challenge && result.level_reached.unwrap_or(0) >= level
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Card {
    /// Stable id, as stored on disk.
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub condition: UnlockCondition,
}

pub const CARDS: [Card; 6] = [
    Card {
        id: "easy_win",
        name: "Smart Puppy",
        description: "Complete an Easy game.",
        condition: UnlockCondition::PracticeWin(Difficulty::Easy),
    },
    Card {
        id: "medium_fast",
        name: "Fast Kitty",
        description: "Complete Medium in under 15s.",
        condition: UnlockCondition::PracticeFastWin(Difficulty::Medium, FAST_WIN_SECS),
    },
    Card {
        id: "hard_win",
        name: "Wise Owl",
        description: "Complete a Hard game.",
        condition: UnlockCondition::PracticeWin(Difficulty::Hard),
    },
    Card {
        id: "challenge_5",
        name: "Brave Lion",
        description: "Reach Level 5 in Challenge.",
        condition: UnlockCondition::ChallengeLevel(5),
    },
    Card {
        id: "challenge_10",
        name: "Master Elephant",
        description: "Reach Level 10 in Challenge.",
        condition: UnlockCondition::ChallengeLevel(10),
    },
    Card {
        id: "challenge_15",
        name: "Legendary Bear",
        description: "Reach Level 15 in Challenge.",
        condition: UnlockCondition::ChallengeLevel(15),
    },
];

/// Which cards are unlocked, one flag per entry of [`CARDS`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collection {
    unlocked: [bool; CARDS.len()],
}

impl Collection {
    pub fn is_unlocked(&self, card: &Card) -> bool {
        CARDS
            .iter()
            .position(|c| c.id == card.id)
            .is_some_and(|i| self.unlocked[i])
    }

    pub fn unlocked_count(&self) -> usize {
        self.unlocked.iter().filter(|u| **u).count()
    }

    /// Cards paired with their unlocked flag, in display order.
    pub fn cards(&self) -> impl Iterator<Item = (&'static Card, bool)> + '_ {
        CARDS.iter().zip(self.unlocked.iter().copied())
    }

    fn unlock_id(&mut self, id: &str) -> bool {
        match CARDS.iter().position(|c| c.id == id) {
            Some(i) if !self.unlocked[i] => {
                self.unlocked[i] = true;
                true
            }
            _ => false,
        }
    }

    /// Apply a finished round. Returns the cards it newly unlocked, in display order.
    pub fn record(
        &mut self,
        result: &GameResult,
        mode: GameMode,
        difficulty: Difficulty,
    ) -> Vec<&'static Card> {
        let mut fresh = Vec::new();
        for (i, card) in CARDS.iter().enumerate() {
            if !self.unlocked[i] && card.condition.is_met(result, mode, difficulty) {
                self.unlocked[i] = true;
                fresh.push(card);
            }
        }
        fresh
    }

    /// One card id per line. Unknown ids and blank lines are skipped.
    fn parse(content: &str) -> Self {
        let mut collection = Self::default();
        for line in content.lines() {
            let id = line.trim();
            if !id.is_empty() {
                collection.unlock_id(id);
            }
        }
        collection
    }

    fn serialize(&self) -> String {
        self.cards()
            .filter(|(_, unlocked)| *unlocked)
            .map(|(card, _)| format!("{}\n", card.id))
            .collect()
    }
}

/// Default location of the collection file (config dir / memblocks / collection).
pub fn default_path() -> Result<PathBuf, CollectionError> {
    let base = match std::env::var("XDG_CONFIG_HOME") {
        Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg),
        _ => std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".config"))
            .map_err(|_| CollectionError::NoConfigDir)?,
    };
    Ok(base.join("memblocks").join(FILENAME))
}

/// Load the collection. Missing or unreadable file means nothing is unlocked.
pub fn load(path: &Path) -> Collection {
    match fs::read_to_string(path) {
        Ok(content) => Collection::parse(&content),
        Err(e) => {
            log::debug!("no collection at {}: {e}", path.display());
            Collection::default()
        }
    }
}

/// Save the collection. Creates the parent directory if needed.
pub fn save(path: &Path, collection: &Collection) -> Result<(), CollectionError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut f = fs::File::create(path)?;
    f.write_all(collection.serialize().as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn practice_win(time_taken: u32) -> GameResult {
        GameResult {
            correct: 9,
            total: 9,
            time_taken,
            level_reached: None,
            is_win: true,
        }
    }

    fn challenge_end(level: u32) -> GameResult {
        GameResult {
            correct: 3,
            total: 9,
            time_taken: 20,
            level_reached: Some(level),
            is_win: false,
        }
    }

    fn ids(cards: &[&Card]) -> Vec<&'static str> {
        cards.iter().map(|c| c.id).collect()
    }

    #[test]
    fn easy_win_unlocks_puppy_once() {
        let mut c = Collection::default();
        let fresh = c.record(&practice_win(30), GameMode::Practice, Difficulty::Easy);
        assert_eq!(ids(&fresh), vec!["easy_win"]);
        let again = c.record(&practice_win(30), GameMode::Practice, Difficulty::Easy);
        assert!(again.is_empty());
        assert_eq!(c.unlocked_count(), 1);
    }

    #[test]
    fn medium_needs_a_fast_win() {
        let mut c = Collection::default();
        assert!(c.record(&practice_win(15), GameMode::Practice, Difficulty::Medium).is_empty());
        let fresh = c.record(&practice_win(14), GameMode::Practice, Difficulty::Medium);
        assert_eq!(ids(&fresh), vec!["medium_fast"]);
    }

    #[test]
    fn losses_unlock_nothing_in_practice() {
        let mut c = Collection::default();
        let mut lost = practice_win(3);
        lost.is_win = false;
        assert!(c.record(&lost, GameMode::Practice, Difficulty::Hard).is_empty());
    }

    #[test]
    fn challenge_milestones_stack() {
        let mut c = Collection::default();
        assert!(c.record(&challenge_end(4), GameMode::Challenge, Difficulty::Easy).is_empty());
        let fresh = c.record(&challenge_end(12), GameMode::Challenge, Difficulty::Easy);
        assert_eq!(ids(&fresh), vec!["challenge_5", "challenge_10"]);
        let fresh = c.record(&challenge_end(15), GameMode::Challenge, Difficulty::Easy);
        assert_eq!(ids(&fresh), vec!["challenge_15"]);
    }

    #[test]
    fn challenge_results_do_not_count_as_practice_wins() {
        let mut c = Collection::default();
        let mut result = challenge_end(2);
        result.is_win = true;
        assert!(c.record(&result, GameMode::Challenge, Difficulty::Easy).is_empty());
    }

    #[test]
    fn parse_skips_unknown_ids() {
        let c = Collection::parse("hard_win\n\n  bogus \nchallenge_5\n");
        assert_eq!(c.unlocked_count(), 2);
        assert!(c.is_unlocked(&CARDS[2]));
        assert!(c.is_unlocked(&CARDS[3]));
    }

    #[test]
    fn save_then_load_from_disk() {
        let dir = std::env::temp_dir().join(format!("memblocks-collection-{}", std::process::id()));
        let path = dir.join("nested").join(FILENAME);
        let mut c = Collection::default();
        c.record(&practice_win(5), GameMode::Practice, Difficulty::Hard);
        save(&path, &c).unwrap();
        assert_eq!(load(&path), c);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn missing_file_loads_empty() {
        let path = std::env::temp_dir().join("memblocks-definitely-missing").join(FILENAME);
        assert_eq!(load(&path), Collection::default());
    }
}
