use std::fmt::{self, Display, Formatter};

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DifficultySetting {
    pub rows: usize,
    pub cols: usize,
    pub num_mines: usize,
}

impl DifficultySetting {
    pub const EASY: Self = Self {
        rows: 9,
        cols: 9,
        num_mines: 10,
    };
    pub const MEDIUM: Self = Self {
        rows: 16,
        cols: 16,
        num_mines: 40,
    };
    pub const HARD: Self = Self {
        rows: 16,
        cols: 30,
        num_mines: 99,
    };

    /// Custom setting. Must leave room for a safe first click.
    pub fn custom(rows: usize, cols: usize, num_mines: usize) -> Result<Self> {
        if rows == 0 || cols == 0 {
            bail!("Board must have at least one row and column, got {rows}x{cols}")
        }
        if num_mines >= rows * cols {
            bail!(
                "Too many mines to create game: {num_mines} mines on {} cells",
                rows * cols
            )
        }
        Ok(Self {
            rows,
            cols,
            num_mines,
        })
    }

    pub fn total_cells(&self) -> usize {
        self.rows * self.cols
    }

    pub fn safe_cells(&self) -> usize {
        self.total_cells() - self.num_mines
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub const fn setting(self) -> DifficultySetting {
        match self {
            Difficulty::Easy => DifficultySetting::EASY,
            Difficulty::Medium => DifficultySetting::MEDIUM,
            Difficulty::Hard => DifficultySetting::HARD,
        }
    }
}

impl From<Difficulty> for DifficultySetting {
    fn from(value: Difficulty) -> Self {
        value.setting()
    }
}

impl Display for Difficulty {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn presets_match_classic_sizes() {
        assert_eq!(Difficulty::Easy.setting().total_cells(), 81);
        assert_eq!(Difficulty::Medium.setting().safe_cells(), 216);
        let hard = Difficulty::Hard.setting();
        assert_eq!((hard.rows, hard.cols, hard.num_mines), (16, 30, 99));
    }

    #[test]
    fn custom_rejects_full_board() {
        assert!(DifficultySetting::custom(3, 3, 9).is_err());
        assert!(DifficultySetting::custom(0, 3, 1).is_err());
        assert!(DifficultySetting::custom(3, 3, 8).is_ok());
    }

    #[test]
    fn difficulty_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Difficulty::Medium).unwrap(),
            "\"medium\""
        );
    }
}
