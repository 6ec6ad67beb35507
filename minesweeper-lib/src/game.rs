use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::board::{Board, BoardPoint};
use crate::cell::Cell;
use crate::difficulty::DifficultySetting;
use crate::engine::{
    calculate_adjacent_mines, check_win_condition, create_initial_board, place_mines, reveal_cell,
    toggle_flag, SafeZone,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    /// Board created, mines not yet placed.
    #[default]
    Ready,
    Playing,
    Won,
    Lost,
}

impl GameStatus {
    pub fn is_over(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

/// What the player asked for. Flagging a flagged cell removes the flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Reveal,
    Flag,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveAction {
    Reveal,
    Flag,
    Unflag,
}

/// One recorded action. `x` is the row and `y` the column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub timestamp: DateTime<Utc>,
    pub action: MoveAction,
    pub x: usize,
    pub y: usize,
}

impl Move {
    pub fn new(timestamp: DateTime<Utc>, action: MoveAction, point: BoardPoint) -> Self {
        Self {
            timestamp,
            action,
            x: point.row,
            y: point.col,
        }
    }

    pub fn point(&self) -> BoardPoint {
        BoardPoint {
            row: self.x,
            col: self.y,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayOutcome {
    /// Number of cells revealed by the play.
    Success(usize),
    /// Mine that was hit.
    Failure(BoardPoint),
    Victory(usize),
    /// Point and whether it is now flagged.
    Flag((BoardPoint, bool)),
}

/// A single-player session. Mines are placed on the first action, away from
/// the acted-on cell, and every action is recorded as a [`Move`].
#[derive(Clone, Debug)]
pub struct Game {
    setting: DifficultySetting,
    board: Board<Cell>,
    status: GameStatus,
    moves: Vec<Move>,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
}

impl Game {
    pub fn new(setting: DifficultySetting) -> Self {
        Game {
            setting,
            board: create_initial_board(setting.rows, setting.cols),
            status: GameStatus::Ready,
            moves: Vec::new(),
            start_time: None,
            end_time: None,
        }
    }

    pub fn setting(&self) -> DifficultySetting {
        self.setting
    }

    pub fn board(&self) -> &Board<Cell> {
        &self.board
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn is_over(&self) -> bool {
        self.status.is_over()
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    /// Mines minus flags placed. Negative when over-flagged.
    pub fn mines_left(&self) -> isize {
        let flags = self.board.iter().filter(|c| c.is_flagged).count();
        self.setting.num_mines as isize - flags as isize
    }

    /// Seconds since the first action, frozen once the game ends.
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> i64 {
        let Some(start) = self.start_time else {
            return 0;
        };
        let end = self.end_time.unwrap_or(now);
        (end - start).num_seconds().max(0)
    }

    /// The board with reveal and flag state stripped, as stored for replays.
    pub fn mine_layout(&self) -> Board<Cell> {
        Board::from_fn(self.board.rows(), self.board.cols(), |p| {
            self.board[p].into_hidden()
        })
    }

    pub fn play_now(&mut self, action: Action, point: BoardPoint) -> Result<PlayOutcome> {
        self.play(action, point, Utc::now(), &mut rand::thread_rng())
    }

    pub fn play<R: Rng + ?Sized>(
        &mut self,
        action: Action,
        point: BoardPoint,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<PlayOutcome> {
        if self.status.is_over() {
            bail!("Game is over")
        }
        if !self.board.is_in_bounds(point) {
            bail!("Tried to play point outside of playzone: {point}")
        }
        if self.status == GameStatus::Ready {
            self.start(point, now, rng);
        }
        match action {
            Action::Reveal => self.handle_reveal(point, now),
            Action::Flag => self.handle_flag(point, now),
        }
    }

    fn start<R: Rng + ?Sized>(&mut self, point: BoardPoint, now: DateTime<Utc>, rng: &mut R) {
        let mined = place_mines(
            &self.board,
            self.setting.num_mines,
            SafeZone::Cell(point),
            rng,
        );
        self.board = calculate_adjacent_mines(&mined);
        self.status = GameStatus::Playing;
        self.start_time = Some(now);
        log::debug!("Game started at {point}");
    }

    fn handle_reveal(&mut self, point: BoardPoint, now: DateTime<Utc>) -> Result<PlayOutcome> {
        let cell = &self.board[point];
        if cell.is_revealed {
            bail!("Tried to play already revealed cell")
        }
        if cell.is_flagged {
            bail!("Tried to play flagged cell")
        }

        let outcome = reveal_cell(&self.board, point);
        self.board = outcome.board;
        self.moves.push(Move::new(now, MoveAction::Reveal, point));
        log::debug!(
            "Revealed {point}: {} cells, game over {}",
            outcome.cells_revealed,
            outcome.game_over
        );

        if outcome.game_over {
            self.finish(GameStatus::Lost, now);
            Ok(PlayOutcome::Failure(point))
        } else if self.check_win() {
            self.finish(GameStatus::Won, now);
            Ok(PlayOutcome::Victory(outcome.cells_revealed))
        } else {
            Ok(PlayOutcome::Success(outcome.cells_revealed))
        }
    }

    fn handle_flag(&mut self, point: BoardPoint, now: DateTime<Utc>) -> Result<PlayOutcome> {
        let cell = &self.board[point];
        if cell.is_revealed {
            bail!("Tried to flag already revealed cell")
        }
        let action = if cell.is_flagged {
            MoveAction::Unflag
        } else {
            MoveAction::Flag
        };

        self.board = toggle_flag(&self.board, point);
        self.moves.push(Move::new(now, action, point));

        if self.check_win() {
            self.finish(GameStatus::Won, now);
        }
        Ok(PlayOutcome::Flag((point, self.board[point].is_flagged)))
    }

    fn check_win(&self) -> bool {
        check_win_condition(&self.board, self.setting.num_mines)
    }

    fn finish(&mut self, status: GameStatus, now: DateTime<Utc>) {
        self.status = status;
        self.end_time = Some(now);
        log::debug!("Game finished: {status:?}");
    }
}
