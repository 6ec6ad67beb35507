//! Pure board operations. Each takes a board by reference and returns a new
//! one; the caller's snapshot is never touched.

use std::collections::HashSet;

use rand::{seq::SliceRandom, Rng};

use crate::board::{Board, BoardPoint};
use crate::cell::{Cell, MINE_SENTINEL};

/// Cells kept free of mines when they are placed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SafeZone {
    #[default]
    None,
    Cell(BoardPoint),
    Neighborhood(BoardPoint),
}

impl SafeZone {
    fn points(self, board: &Board<Cell>) -> HashSet<BoardPoint> {
        match self {
            SafeZone::None => HashSet::new(),
            SafeZone::Cell(p) => HashSet::from([p]),
            SafeZone::Neighborhood(p) => board.neighbors(p).chain([p]).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RevealOutcome {
    pub board: Board<Cell>,
    pub game_over: bool,
    pub cells_revealed: usize,
}

pub fn create_initial_board(rows: usize, cols: usize) -> Board<Cell> {
    Board::from_fn(rows, cols, Cell::at)
}

/// Places `mine_count` new mines among cells that are neither mines already
/// nor inside `safe_zone`. Adjacency is left stale.
pub fn place_mines<R: Rng + ?Sized>(
    board: &Board<Cell>,
    mine_count: usize,
    safe_zone: SafeZone,
    rng: &mut R,
) -> Board<Cell> {
    let excluded = safe_zone.points(board);
    let mut available = board
        .points()
        .filter(|p| !board[p].is_mine && !excluded.contains(p))
        .collect::<Vec<_>>();

    if mine_count > available.len() {
        log::warn!(
            "Too many mines requested, placing {} of {}",
            available.len(),
            mine_count
        );
    }

    let (to_plant, _) = available.partial_shuffle(rng, mine_count);
    let mut new_board = board.clone();
    to_plant.iter().for_each(|p| new_board[p].is_mine = true);
    new_board
}

pub fn calculate_adjacent_mines(board: &Board<Cell>) -> Board<Cell> {
    let mut new_board = board.clone();
    for point in board.points() {
        new_board[point].adjacent_mines = if board[point].is_mine {
            MINE_SENTINEL
        } else {
            board.neighbors(point).filter(|n| board[n].is_mine).count() as i8
        };
    }
    new_board
}

/// Reveals `point`, cascading through zero cells. Hitting a mine marks it
/// exploded and exposes every mine on the board.
pub fn reveal_cell(board: &Board<Cell>, point: BoardPoint) -> RevealOutcome {
    let mut new_board = board.clone();

    if !board[point].is_hidden() {
        return RevealOutcome {
            board: new_board,
            game_over: false,
            cells_revealed: 0,
        };
    }

    if board[point].is_mine {
        new_board[point].exploded = true;
        let mut cells_revealed = 0;
        for cell in new_board.iter_mut().filter(|c| c.is_mine && !c.is_revealed) {
            cell.is_revealed = true;
            cells_revealed += 1;
        }
        return RevealOutcome {
            board: new_board,
            game_over: true,
            cells_revealed,
        };
    }

    let mut cells_revealed = 0;
    let mut to_visit = vec![point];
    while let Some(visit) = to_visit.pop() {
        let cell = &mut new_board[visit];
        if !cell.is_hidden() || cell.is_mine {
            continue;
        }
        cell.is_revealed = true;
        cells_revealed += 1;

        if cell.adjacent_mines == 0 {
            to_visit.extend(board.neighbors(visit).filter(|n| new_board[n].is_hidden()));
        }
    }

    RevealOutcome {
        board: new_board,
        game_over: false,
        cells_revealed,
    }
}

pub fn toggle_flag(board: &Board<Cell>, point: BoardPoint) -> Board<Cell> {
    let mut new_board = board.clone();
    let cell = &mut new_board[point];
    if !cell.is_revealed {
        cell.is_flagged = !cell.is_flagged;
    }
    new_board
}

/// Won when every safe cell is revealed, or when every mine is flagged.
/// Extra flags on safe cells do not block the second condition.
pub fn check_win_condition(board: &Board<Cell>, total_mines: usize) -> bool {
    let revealed_safe = board
        .iter()
        .filter(|c| c.is_revealed && !c.is_mine)
        .count();
    let flagged_mines = board.iter().filter(|c| c.is_flagged && c.is_mine).count();

    revealed_safe == board.len().saturating_sub(total_mines)
        || (total_mines > 0 && flagged_mines == total_mines)
}

/// Whether any mine on the board has been revealed.
pub fn has_revealed_mine(board: &Board<Cell>) -> bool {
    board.iter().any(|c| c.is_mine && c.is_revealed)
}
