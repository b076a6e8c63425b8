//! 게임 보드
//!
//! NxN 격자를 행 우선(row-major) 인덱스로 관리합니다.
//! `index = row * N + col`

use serde::{Deserialize, Serialize};
use std::fmt;

/// 매치 내 참가자 자리 (0 또는 1)
///
/// 접속 순서대로 할당되며 연결이 유지되는 동안 바뀌지 않습니다.
/// 항상 `First`(0번)가 먼저 둡니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Seat {
    First,
    Second,
}

impl Seat {
    pub const ALL: [Seat; 2] = [Seat::First, Seat::Second];

    /// 와이어에 실리는 정수 id
    pub fn id(self) -> i32 {
        match self {
            Seat::First => 0,
            Seat::Second => 1,
        }
    }

    /// 정수 id로부터 변환
    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            0 => Some(Seat::First),
            1 => Some(Seat::Second),
            _ => None,
        }
    }

    /// 배열 인덱스
    pub fn index(self) -> usize {
        self.id() as usize
    }

    pub fn other(self) -> Self {
        match self {
            Seat::First => Seat::Second,
            Seat::Second => Seat::First,
        }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seat {}", self.id())
    }
}

/// 칸 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Owned(Seat),
}

/// 수가 거부된 이유
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveRejection {
    /// 보드 범위를 벗어난 인덱스
    OutOfBounds,
    /// 이미 점유된 칸
    Occupied,
}

/// NxN 보드
///
/// 한 매치의 엔진만 소유하며, 매치 간에 공유되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    size: usize,
    cells: Vec<Cell>,
    filled: usize,
}

impl Board {
    /// 빈 NxN 보드 생성
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![Cell::Empty; size * size],
            filled: 0,
        }
    }

    /// 한 변의 길이 N
    pub fn size(&self) -> usize {
        self.size
    }

    /// 전체 칸 수 N²
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// 점유된 칸 수
    pub fn filled_count(&self) -> usize {
        self.filled
    }

    /// 빈 칸이 남아 있지 않은지
    pub fn is_full(&self) -> bool {
        self.filled == self.cells.len()
    }

    pub fn cell(&self, index: usize) -> Option<Cell> {
        self.cells.get(index).copied()
    }

    /// (row, col) 좌표로 칸 조회. 범위 밖이면 `None`
    pub fn cell_at(&self, row: usize, col: usize) -> Option<Cell> {
        if row >= self.size || col >= self.size {
            return None;
        }
        self.cell(row * self.size + col)
    }

    /// 와이어에서 받은 인덱스를 보드 인덱스로 변환합니다.
    ///
    /// 음수이거나 N² 이상이면 `OutOfBounds`.
    pub fn checked_index(&self, index: i32) -> Result<usize, MoveRejection> {
        usize::try_from(index)
            .ok()
            .filter(|i| *i < self.cells.len())
            .ok_or(MoveRejection::OutOfBounds)
    }

    /// 수 검증: 대상 칸이 비어 있어야 유효합니다. 보드를 변경하지 않습니다.
    pub fn validate(&self, index: i32) -> Result<usize, MoveRejection> {
        let index = self.checked_index(index)?;
        match self.cells[index] {
            Cell::Empty => Ok(index),
            Cell::Owned(_) => Err(MoveRejection::Occupied),
        }
    }

    /// 검증 후 칸에 표시합니다. 실패하면 보드는 그대로입니다.
    pub fn place(&mut self, index: i32, seat: Seat) -> Result<usize, MoveRejection> {
        let index = self.validate(index)?;
        self.cells[index] = Cell::Owned(seat);
        self.filled += 1;
        Ok(index)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.size.max(1)) {
            let line: String = row
                .iter()
                .map(|cell| match cell {
                    Cell::Empty => '.',
                    Cell::Owned(Seat::First) => 'O',
                    Cell::Owned(Seat::Second) => 'X',
                })
                .collect();
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_board_is_empty() {
        let board = Board::new(3);
        assert_eq!(board.cell_count(), 9);
        assert_eq!(board.filled_count(), 0);
        assert!(!board.is_full());
        assert!((0..9).all(|i| board.cell(i) == Some(Cell::Empty)));
    }

    #[test]
    fn test_place_marks_cell() {
        let mut board = Board::new(3);
        assert_eq!(board.place(4, Seat::Second), Ok(4));
        assert_eq!(board.cell_at(1, 1), Some(Cell::Owned(Seat::Second)));
        assert_eq!(board.filled_count(), 1);
    }

    #[test]
    fn test_rejected_move_leaves_board_untouched() {
        let mut board = Board::new(3);
        board.place(0, Seat::First).expect("빈 칸");
        let snapshot = board.clone();

        assert_eq!(board.place(0, Seat::Second), Err(MoveRejection::Occupied));
        assert_eq!(board.place(9, Seat::Second), Err(MoveRejection::OutOfBounds));
        assert_eq!(board.place(-1, Seat::Second), Err(MoveRejection::OutOfBounds));
        assert_eq!(board, snapshot);
    }

    #[test]
    fn test_full_board() {
        let mut board = Board::new(2);
        for (i, seat) in [Seat::First, Seat::Second, Seat::First, Seat::Second]
            .into_iter()
            .enumerate()
        {
            board.place(i as i32, seat).expect("빈 칸");
        }
        assert!(board.is_full());
        assert_eq!(board.to_string(), "OX\nOX\n");
    }

    #[test]
    fn test_seat_ids() {
        assert_eq!(Seat::First.id(), 0);
        assert_eq!(Seat::Second.other(), Seat::First);
        assert_eq!(Seat::from_id(1), Some(Seat::Second));
        assert_eq!(Seat::from_id(2), None);
    }
}
