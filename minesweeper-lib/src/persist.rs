//! Conversion between boards and the JSON cell grid kept by the store.

use serde::Deserialize;
use thiserror::Error;

use crate::board::Board;
use crate::cell::Cell;
use crate::difficulty::DifficultySetting;
use crate::engine::calculate_adjacent_mines;

/// Board field value before the first move is saved.
pub const BOARD_PLACEHOLDER: &str = "no board yet";
/// Board field value for a game abandoned to start another.
pub const BOARD_QUIT: &str = "quit for new game";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BoardLoadError {
    #[error("Stored board is not a valid cell grid: {0}")]
    Malformed(String),
    #[error("Stored board is empty or has rows of different lengths")]
    Empty,
    #[error("Stored board is {found_rows}x{found_cols}, expected {rows}x{cols}")]
    DimensionMismatch {
        rows: usize,
        cols: usize,
        found_rows: usize,
        found_cols: usize,
    },
}

/// Stored cell fields that are trusted on load. `x`, `y` and `adjacentMines`
/// are derived from the grid, so whatever was stored for them is skipped.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredCell {
    is_mine: bool,
    is_revealed: bool,
    is_flagged: bool,
    #[serde(default)]
    exploded: bool,
}

impl From<StoredCell> for Cell {
    fn from(stored: StoredCell) -> Self {
        Cell {
            is_mine: stored.is_mine,
            is_revealed: stored.is_revealed,
            is_flagged: stored.is_flagged,
            exploded: stored.exploded,
            ..Default::default()
        }
    }
}

pub fn serialize_board(board: &Board<Cell>) -> serde_json::Result<String> {
    serde_json::to_string(&Vec::<Vec<Cell>>::from(board))
}

/// Parses a stored board field.
///
/// Anything that is not a JSON array, such as [`BOARD_PLACEHOLDER`], means
/// there is no board yet and yields `Ok(None)`. Coordinates are taken from
/// grid position and adjacency is recomputed, so stale values in the stored
/// cells are ignored.
pub fn parse_board(
    raw: &str,
    setting: &DifficultySetting,
) -> Result<Option<Board<Cell>>, BoardLoadError> {
    if !raw.trim_start().starts_with('[') {
        log::debug!("No stored board: {raw:?}");
        return Ok(None);
    }

    let grid: Vec<Vec<StoredCell>> =
        serde_json::from_str(raw).map_err(|e| BoardLoadError::Malformed(e.to_string()))?;
    let grid: Vec<Vec<Cell>> = grid
        .into_iter()
        .map(|row| row.into_iter().map(Cell::from).collect())
        .collect();
    let mut board = Board::from_vec(grid).ok_or(BoardLoadError::Empty)?;

    if board.rows() != setting.rows || board.cols() != setting.cols {
        return Err(BoardLoadError::DimensionMismatch {
            rows: setting.rows,
            cols: setting.cols,
            found_rows: board.rows(),
            found_cols: board.cols(),
        });
    }

    for point in board.points() {
        let cell = &mut board[point];
        cell.x = point.row;
        cell.y = point.col;
    }
    Ok(Some(calculate_adjacent_mines(&board)))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::board::BoardPoint;
    use crate::engine::{reveal_cell, test::board_with_mines, toggle_flag};

    const SMALL: DifficultySetting = DifficultySetting {
        rows: 3,
        cols: 4,
        num_mines: 2,
    };

    fn played_board() -> Board<Cell> {
        let board = board_with_mines(3, 4, &[BoardPoint::new(0, 3), BoardPoint::new(2, 3)]);
        let board = reveal_cell(&board, BoardPoint::new(0, 0)).board;
        toggle_flag(&board, BoardPoint::new(2, 3))
    }

    #[test]
    fn round_trip_keeps_cell_state() {
        let board = played_board();

        let json = serialize_board(&board).unwrap();
        let parsed = parse_board(&json, &SMALL).unwrap().unwrap();

        for p in board.points() {
            assert_eq!(parsed[p].is_mine, board[p].is_mine);
            assert_eq!(parsed[p].is_revealed, board[p].is_revealed);
            assert_eq!(parsed[p].is_flagged, board[p].is_flagged);
        }
        assert_eq!(parsed, board);
    }

    #[test]
    fn parse_recomputes_missing_adjacency() {
        let json = r#"[
            [{"isMine":true,"isRevealed":false,"isFlagged":false},
             {"isMine":false,"isRevealed":true,"isFlagged":false}],
            [{"isMine":false,"isRevealed":false,"isFlagged":false},
             {"isMine":false,"isRevealed":false,"isFlagged":false}]
        ]"#;
        let setting = DifficultySetting {
            rows: 2,
            cols: 2,
            num_mines: 1,
        };

        let board = parse_board(json, &setting).unwrap().unwrap();

        assert_eq!(board[BoardPoint::new(0, 0)].adjacent_mines, -1);
        assert_eq!(board[BoardPoint::new(0, 1)].adjacent_mines, 1);
        assert_eq!(board[BoardPoint::new(1, 1)].point(), BoardPoint::new(1, 1));
    }

    #[test]
    fn parse_ignores_out_of_range_derived_fields() {
        let json = r#"[[
            {"x":-3,"y":7,"isMine":false,"isRevealed":true,"isFlagged":false,"adjacentMines":200},
            {"x":0,"y":1,"isMine":true,"isRevealed":false,"isFlagged":true,"adjacentMines":-90}
        ]]"#;
        let setting = DifficultySetting {
            rows: 1,
            cols: 2,
            num_mines: 1,
        };

        let board = parse_board(json, &setting).unwrap().unwrap();

        assert_eq!(board[BoardPoint::new(0, 0)].adjacent_mines, 1);
        assert_eq!(board[BoardPoint::new(0, 0)].point(), BoardPoint::new(0, 0));
        assert!(board[BoardPoint::new(0, 0)].is_revealed);
        assert_eq!(board[BoardPoint::new(0, 1)].adjacent_mines, -1);
        assert!(board[BoardPoint::new(0, 1)].is_flagged);
    }

    #[test]
    fn sentinel_strings_mean_no_board() {
        assert_eq!(parse_board(BOARD_PLACEHOLDER, &SMALL), Ok(None));
        assert_eq!(parse_board(BOARD_QUIT, &SMALL), Ok(None));
        assert_eq!(parse_board("", &SMALL), Ok(None));
    }

    #[test]
    fn bad_json_is_malformed() {
        let res = parse_board("[[{\"isMine\": tru", &SMALL);
        assert!(matches!(res, Err(BoardLoadError::Malformed(_))));

        assert_eq!(parse_board("[]", &SMALL), Err(BoardLoadError::Empty));
    }

    #[test]
    fn wrong_dimensions_are_rejected() {
        let json = serialize_board(&played_board()).unwrap();

        let res = parse_board(&json, &DifficultySetting::EASY);

        assert_eq!(
            res,
            Err(BoardLoadError::DimensionMismatch {
                rows: 9,
                cols: 9,
                found_rows: 3,
                found_cols: 4,
            })
        );
    }
}
