use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::board::BoardPoint;

/// `adjacent_mines` value stored on mine cells.
pub const MINE_SENTINEL: i8 = -1;

/// One grid position, in the shape the board is persisted in.
///
/// `x` is the row and `y` the column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    #[serde(default)]
    pub x: usize,
    #[serde(default)]
    pub y: usize,
    pub is_mine: bool,
    pub is_revealed: bool,
    pub is_flagged: bool,
    #[serde(default)]
    pub adjacent_mines: i8,
    #[serde(default)]
    pub exploded: bool,
}

impl Display for Cell {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match (self.is_revealed, self.is_flagged, self.is_mine) {
            (true, _, true) if self.exploded => write!(f, "X"),
            (true, _, true) => write!(f, "*"),
            (true, _, false) if self.adjacent_mines == 0 => write!(f, " "),
            (true, _, false) => write!(f, "{}", self.adjacent_mines),
            (false, true, _) => write!(f, "f"),
            (false, false, _) => write!(f, "-"),
        }
    }
}

impl Cell {
    pub fn at(point: BoardPoint) -> Self {
        Cell {
            x: point.row,
            y: point.col,
            ..Default::default()
        }
    }

    pub fn point(&self) -> BoardPoint {
        BoardPoint {
            row: self.x,
            col: self.y,
        }
    }

    /// Hidden and unflagged, the only state a reveal acts on.
    pub fn is_hidden(&self) -> bool {
        !self.is_revealed && !self.is_flagged
    }

    /// Neighbor count for safe cells, `None` for mines.
    pub fn value(&self) -> Option<u8> {
        if self.is_mine {
            None
        } else {
            u8::try_from(self.adjacent_mines).ok()
        }
    }

    /// Same mine layout with reveal and flag state cleared.
    pub fn into_hidden(self) -> Self {
        Cell {
            is_revealed: false,
            is_flagged: false,
            exploded: false,
            ..self
        }
    }
}
