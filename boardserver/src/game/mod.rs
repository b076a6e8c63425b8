//! 게임 규칙 모듈
//!
//! 매치 엔진이 소유하는 보드와 순수 함수인 승리 판정을 정의합니다.
//! 이 모듈은 네트워크나 동시성에 의존하지 않습니다.

pub mod board;
pub mod win_detector;

pub use board::{Board, Cell, MoveRejection, Seat};
pub use win_detector::{detect_win, WinRule};
