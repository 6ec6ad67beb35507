use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    board::{Board, BoardPoint},
    cell::Cell,
    difficulty::DifficultySetting,
    engine::{calculate_adjacent_mines, create_initial_board, reveal_cell, toggle_flag},
    game::{Move, MoveAction},
    persist::{parse_board, BoardLoadError},
};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayError {
    #[error("Called next on end")]
    AtEnd,
    #[error("Called prev on start")]
    AtStart,
    #[error("Replay position out of bounds (max {max}): {pos}")]
    OutOfBounds { pos: usize, max: usize },
}

/// Board as it stood after some prefix of the move log.
#[derive(Clone, Debug, PartialEq)]
pub struct ReplayFrame {
    pub board: Board<Cell>,
    pub elapsed_seconds: i64,
    /// Cell acted on by the last applied move, for display only.
    pub highlight: Option<BoardPoint>,
    pub hit_mine: bool,
}

/// Rebuilds intermediate boards of a game from its mine layout and moves.
///
/// Positions run from `0` (nothing played) to `len() - 1` (every move
/// applied); position `n` is the board after move `n - 1`.
pub struct MinesweeperReplay {
    setting: DifficultySetting,
    starting_board: Board<Cell>,
    moves: Vec<Move>,
    start_time: Option<DateTime<Utc>>,
    warning: Option<BoardLoadError>,
    current_pos: usize,
    current: ReplayFrame,
}

impl MinesweeperReplay {
    /// `mine_layout` only needs `is_mine` set; any play state on it is cleared.
    /// The layout's dimensions win over those in `setting`.
    pub fn new(
        setting: DifficultySetting,
        mine_layout: &Board<Cell>,
        moves: Vec<Move>,
        start_time: Option<DateTime<Utc>>,
    ) -> Self {
        let (rows, cols) = (mine_layout.rows(), mine_layout.cols());
        if (rows, cols) != (setting.rows, setting.cols) {
            log::warn!(
                "Mine layout is {rows}x{cols}, setting says {}x{}",
                setting.rows,
                setting.cols
            );
        }
        let setting = DifficultySetting {
            rows,
            cols,
            ..setting
        };
        let hidden = Board::from_fn(mine_layout.rows(), mine_layout.cols(), |p| {
            Cell {
                x: p.row,
                y: p.col,
                ..mine_layout[p].into_hidden()
            }
        });
        Self::from_starting_board(
            setting,
            calculate_adjacent_mines(&hidden),
            moves,
            start_time,
            None,
        )
    }

    /// Builds a replay from stored fields, never failing.
    ///
    /// With moves, `true_board` supplies the mine layout. Without moves, the
    /// final `board_state` snapshot is shown as is. A corrupt or mismatched
    /// board falls back to an empty one and is reported by [`Self::warning`].
    pub fn from_persisted(
        setting: DifficultySetting,
        true_board: &str,
        board_state: &str,
        moves: Vec<Move>,
        start_time: Option<DateTime<Utc>>,
    ) -> Self {
        let empty = || create_initial_board(setting.rows, setting.cols);

        if moves.is_empty() {
            return match parse_board(board_state, &setting) {
                Ok(board) => Self::from_starting_board(
                    setting,
                    board.unwrap_or_else(empty),
                    moves,
                    start_time,
                    None,
                ),
                Err(e) => {
                    log::warn!("Unable to load final board, showing empty board: {e}");
                    Self::from_starting_board(setting, empty(), moves, start_time, Some(e))
                }
            };
        }

        match parse_board(true_board, &setting) {
            Ok(Some(layout)) => Self::new(setting, &layout, moves, start_time),
            Ok(None) => {
                log::warn!("Game has {} moves but no mine layout", moves.len());
                Self::from_starting_board(
                    setting,
                    empty(),
                    Vec::new(),
                    start_time,
                    Some(BoardLoadError::Empty),
                )
            }
            Err(e) => {
                log::warn!("Unable to load mine layout, showing empty board: {e}");
                Self::from_starting_board(setting, empty(), Vec::new(), start_time, Some(e))
            }
        }
    }

    fn from_starting_board(
        setting: DifficultySetting,
        starting_board: Board<Cell>,
        moves: Vec<Move>,
        start_time: Option<DateTime<Utc>>,
        warning: Option<BoardLoadError>,
    ) -> Self {
        let current = ReplayFrame {
            board: starting_board.clone(),
            elapsed_seconds: 0,
            highlight: None,
            hit_mine: false,
        };
        log::debug!("replay log length: {}", moves.len());
        Self {
            setting,
            starting_board,
            moves,
            start_time,
            warning,
            current_pos: 0,
            current,
        }
    }

    pub fn setting(&self) -> DifficultySetting {
        self.setting
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    /// Why the stored board could not be used, if it couldn't.
    pub fn warning(&self) -> Option<&BoardLoadError> {
        self.warning.as_ref()
    }

    pub fn len(&self) -> usize {
        self.moves.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn current_pos(&self) -> usize {
        self.current_pos
    }

    pub fn current_frame(&self) -> &ReplayFrame {
        &self.current
    }

    pub fn current_board(&self) -> &Board<Cell> {
        &self.current.board
    }

    /// Board after the move at `move_index`; `None` is the board before any
    /// move.
    pub fn reconstruct_at(&self, move_index: Option<usize>) -> Result<ReplayFrame, ReplayError> {
        let pos = move_index.map_or(0, |i| i + 1);
        if pos >= self.len() {
            return Err(ReplayError::OutOfBounds {
                pos: move_index.unwrap_or_default(),
                max: self.moves.len().saturating_sub(1),
            });
        }
        Ok(self.rebuild(pos))
    }

    pub fn final_frame(&self) -> ReplayFrame {
        self.rebuild(self.moves.len())
    }

    pub fn advance(&mut self) -> Result<(), ReplayError> {
        if self.current_pos == self.len() - 1 {
            return Err(ReplayError::AtEnd);
        }
        let mut board = std::mem::replace(&mut self.current.board, Board::new(0, 0, Cell::default()));
        let hit_mine = apply_move(&mut board, &self.moves[self.current_pos]);
        self.current_pos += 1;
        self.current = self.frame(board, self.current_pos, hit_mine);
        Ok(())
    }

    pub fn rewind(&mut self) -> Result<(), ReplayError> {
        if self.current_pos == 0 {
            return Err(ReplayError::AtStart);
        }
        self.current_pos -= 1;
        self.current = self.rebuild(self.current_pos);
        Ok(())
    }

    pub fn to_pos(&mut self, pos: usize) -> Result<(), ReplayError> {
        if pos >= self.len() {
            return Err(ReplayError::OutOfBounds {
                pos,
                max: self.len() - 1,
            });
        }
        if pos < self.current_pos {
            self.current_pos = pos;
            self.current = self.rebuild(pos);
        }
        while pos > self.current_pos {
            self.advance()?;
        }
        Ok(())
    }

    fn rebuild(&self, pos: usize) -> ReplayFrame {
        let mut board = self.starting_board.clone();
        let mut hit_mine = false;
        for m in &self.moves[..pos] {
            hit_mine = apply_move(&mut board, m);
        }
        self.frame(board, pos, hit_mine)
    }

    /// `hit_mine` is whether the last applied move detonated a mine.
    fn frame(&self, board: Board<Cell>, pos: usize, hit_mine: bool) -> ReplayFrame {
        let Some(last) = pos.checked_sub(1).map(|i| &self.moves[i]) else {
            return ReplayFrame {
                board,
                elapsed_seconds: 0,
                highlight: None,
                hit_mine: false,
            };
        };

        let point = last.point();
        let in_bounds = board.is_in_bounds(point);
        ReplayFrame {
            board,
            elapsed_seconds: self.elapsed_at(last),
            highlight: in_bounds.then_some(point),
            hit_mine,
        }
    }

    fn elapsed_at(&self, m: &Move) -> i64 {
        let start = self
            .start_time
            .or_else(|| self.moves.first().map(|first| first.timestamp))
            .unwrap_or(m.timestamp);
        (m.timestamp - start).num_seconds().max(0)
    }
}

/// Replays one stored move, returning whether it detonated a mine. Flag moves
/// only toggle when the cell is not already in the requested state.
fn apply_move(board: &mut Board<Cell>, m: &Move) -> bool {
    let point = m.point();
    if !board.is_in_bounds(point) {
        log::warn!("Skipping move outside board: {m:?}");
        return false;
    }
    match m.action {
        MoveAction::Reveal => {
            let outcome = reveal_cell(board, point);
            *board = outcome.board;
            outcome.game_over
        }
        MoveAction::Flag | MoveAction::Unflag => {
            let want_flag = m.action == MoveAction::Flag;
            if board[point].is_flagged != want_flag {
                *board = toggle_flag(board, point);
            }
            false
        }
    }
}
