use std::{
    fmt::{self, Debug, Display, Formatter},
    ops::{Index, IndexMut},
    slice::{Chunks, Iter, IterMut},
};

use serde::{Deserialize, Serialize};

impl<T> From<&Board<T>> for Vec<Vec<T>>
where
    T: Clone,
{
    fn from(value: &Board<T>) -> Self {
        value.rows_iter().map(|row| row.to_vec()).collect()
    }
}

impl<T> From<Board<T>> for Vec<Vec<T>>
where
    T: Clone,
{
    fn from(value: Board<T>) -> Self {
        (&value).into()
    }
}

/// Row-major rectangular grid. Dimensions never change after creation.
#[derive(Clone, PartialEq, Eq)]
pub struct Board<T> {
    rows: usize,
    cols: usize,
    board: Vec<T>,
}

impl<T> Board<T> {
    fn write_rows(
        &self,
        f: &mut Formatter,
        item_fmt: impl Fn(&T, &mut Formatter) -> fmt::Result,
    ) -> fmt::Result {
        for (r, row) in self.rows_iter().enumerate() {
            if r > 0 {
                writeln!(f)?;
            }
            for item in row {
                item_fmt(item, &mut *f)?;
            }
        }
        Ok(())
    }
}

impl<T: Debug> Debug for Board<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        self.write_rows(f, |item, f| write!(f, "{:?}", item))
    }
}

impl<T: Display> Display for Board<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        self.write_rows(f, |item, f| write!(f, "{}", item))
    }
}

impl<T> Index<&BoardPoint> for Board<T> {
    type Output = T;

    fn index(&self, point: &BoardPoint) -> &Self::Output {
        &self.board[self.index_from_point(*point)]
    }
}

impl<T> IndexMut<&BoardPoint> for Board<T> {
    fn index_mut(&mut self, point: &BoardPoint) -> &mut Self::Output {
        let index = self.index_from_point(*point);
        &mut self.board[index]
    }
}

impl<T> Index<BoardPoint> for Board<T> {
    type Output = T;

    fn index(&self, point: BoardPoint) -> &Self::Output {
        &self[&point]
    }
}

impl<T> IndexMut<BoardPoint> for Board<T> {
    fn index_mut(&mut self, point: BoardPoint) -> &mut Self::Output {
        &mut self[&point]
    }
}

impl<T> Board<T> {
    pub fn new(rows: usize, cols: usize, item: T) -> Self
    where
        T: Clone,
    {
        Board {
            rows,
            cols,
            board: vec![item; rows * cols],
        }
    }

    /// Builds a board with `f` called once per point, in row-major order.
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(BoardPoint) -> T) -> Self {
        let board = (0..rows * cols)
            .map(|i| {
                f(BoardPoint {
                    row: i / cols,
                    col: i % cols,
                })
            })
            .collect();
        Board { rows, cols, board }
    }

    /// Returns `None` for an empty or ragged grid.
    pub fn from_vec(vec: Vec<Vec<T>>) -> Option<Self> {
        let rows = vec.len();
        let cols = vec.first()?.len();
        if cols == 0 || vec.iter().any(|row| row.len() != cols) {
            return None;
        }
        Some(Board {
            rows,
            cols,
            board: vec.into_iter().flatten().collect(),
        })
    }

    pub fn point_from_index(&self, index: usize) -> BoardPoint {
        BoardPoint {
            row: index / self.cols,
            col: index % self.cols,
        }
    }

    pub fn index_from_point(&self, point: BoardPoint) -> usize {
        point.row * self.cols + point.col
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.board.len()
    }

    pub fn is_empty(&self) -> bool {
        self.board.is_empty()
    }

    pub fn rows_iter(&self) -> Chunks<T> {
        self.board.chunks(self.cols.max(1))
    }

    pub fn iter(&self) -> Iter<'_, T> {
        self.board.iter()
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        self.board.iter_mut()
    }

    pub fn points(&self) -> impl Iterator<Item = BoardPoint> {
        let cols = self.cols;
        (0..self.board.len()).map(move |i| BoardPoint {
            row: i / cols,
            col: i % cols,
        })
    }

    pub fn is_in_bounds(&self, point: BoardPoint) -> bool {
        point.row < self.rows && point.col < self.cols
    }

    /// The up to 8 points surrounding `point`, clipped to the board edges.
    pub fn neighbors(&self, point: BoardPoint) -> impl Iterator<Item = BoardPoint> {
        let (rows, cols) = (self.rows, self.cols);
        let row_range = point.row.saturating_sub(1)..=(point.row + 1).min(rows.saturating_sub(1));
        row_range.flat_map(move |row| {
            let col_range =
                point.col.saturating_sub(1)..=(point.col + 1).min(cols.saturating_sub(1));
            col_range
                .map(move |col| BoardPoint { row, col })
                .filter(move |p| *p != point)
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BoardPoint {
    pub row: usize,
    pub col: usize,
}

impl BoardPoint {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl Display for BoardPoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}
