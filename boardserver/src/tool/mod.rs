//! 보드 서버 공통 유틸리티 모듈
//!
//! 에러 분류와 로깅을 담당합니다.

pub mod error;

pub use error::{BoardResult, BoardServerError, ErrorHandler, ErrorSeverity};
