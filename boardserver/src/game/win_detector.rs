//! 승리 판정
//!
//! 보드와 마지막으로 둔 수의 인덱스만 보고 그 수가 승리를 만들었는지 판단합니다.
//! 보드 크기와 승리 규칙은 서로 독립적으로 설정됩니다.
//!
//! - [`WinRule::Classic`]: 3x3 전용 규칙. 행, 열, 그리고 짝수 인덱스일 때만 대각선을 검사합니다.
//!   3x3이 아닌 보드에서는 정의되지 않으므로 항상 `false`이며, 설정 검증 단계에서 거부됩니다.
//! - [`WinRule::Line`]: 마지막 수를 지나는 가로/세로/대각선 연속 `length`개.
//!
//! 10x10 변형의 실제 승리 조건은 아직 정해지지 않았습니다. 3x3 규칙을 그대로 쓰지 않고
//! 운영자가 `win_rule`을 명시적으로 지정해야 합니다.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::board::{Board, Cell};

/// 승리 규칙
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WinRule {
    /// 3x3 틱택토 규칙
    Classic,
    /// 연속 `length`개
    Line { length: usize },
}

impl WinRule {
    /// 이 규칙이 주어진 보드 크기에서 의미가 있는지
    pub fn supports_board_size(&self, size: usize) -> bool {
        match self {
            WinRule::Classic => size == 3,
            WinRule::Line { length } => *length >= 1 && *length <= size,
        }
    }
}

impl fmt::Display for WinRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WinRule::Classic => write!(f, "classic"),
            WinRule::Line { length } => write!(f, "line:{}", length),
        }
    }
}

impl FromStr for WinRule {
    type Err = String;

    /// `classic` 또는 `line:<k>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("classic") {
            return Ok(WinRule::Classic);
        }
        match s.split_once(':') {
            Some((kind, length)) if kind.eq_ignore_ascii_case("line") => length
                .trim()
                .parse::<usize>()
                .map(|length| WinRule::Line { length })
                .map_err(|e| format!("잘못된 line 길이 '{}': {}", length, e)),
            _ => Err(format!("알 수 없는 승리 규칙: '{}'", s)),
        }
    }
}

/// 마지막 수가 승리를 만들었는지 판정합니다.
///
/// `last_move` 칸이 비어 있거나 범위를 벗어나면 `false`.
pub fn detect_win(board: &Board, last_move: usize, rule: WinRule) -> bool {
    let Some(Cell::Owned(owner)) = board.cell(last_move) else {
        return false;
    };
    let mark = Cell::Owned(owner);

    match rule {
        WinRule::Classic => classic_win(board, last_move, mark),
        WinRule::Line { length } => line_win(board, last_move, mark, length),
    }
}

fn classic_win(board: &Board, last_move: usize, mark: Cell) -> bool {
    if board.size() != 3 {
        return false;
    }

    let row = last_move / 3;
    let col = last_move % 3;
    let owns = |r: usize, c: usize| board.cell_at(r, c) == Some(mark);

    if (0..3).all(|c| owns(row, c)) {
        return true;
    }
    if (0..3).all(|r| owns(r, col)) {
        return true;
    }

    // 대각선은 짝수 인덱스에만 걸칩니다
    if last_move % 2 == 0 {
        if matches!(last_move, 0 | 4 | 8) && (0..3).all(|i| owns(i, i)) {
            return true;
        }
        if matches!(last_move, 2 | 4 | 6) && (0..3).all(|i| owns(i, 2 - i)) {
            return true;
        }
    }

    false
}

fn line_win(board: &Board, last_move: usize, mark: Cell, length: usize) -> bool {
    if length == 0 {
        return false;
    }

    let size = board.size() as isize;
    let row = (last_move / board.size()) as isize;
    let col = (last_move % board.size()) as isize;

    let run = |dr: isize, dc: isize| -> usize {
        let mut count = 0;
        let (mut r, mut c) = (row + dr, col + dc);
        while r >= 0
            && r < size
            && c >= 0
            && c < size
            && board.cell_at(r as usize, c as usize) == Some(mark)
        {
            count += 1;
            r += dr;
            c += dc;
        }
        count
    };

    [(0, 1), (1, 0), (1, 1), (1, -1)]
        .into_iter()
        .any(|(dr, dc)| 1 + run(dr, dc) + run(-dr, -dc) >= length)
}
