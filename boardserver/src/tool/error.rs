//! 공통 에러 처리 시스템
//!
//! 보드 게임 서버에서 발생하는 모든 에러를 체계적으로 관리합니다.
//! 에러는 항상 한 매치 안에서만 처리되며, 다른 매치나 리스너로 전파되지 않습니다.

use std::io;
use thiserror::Error;
use tracing::{error, info, warn};

/// 보드 서버 에러 타입
///
/// 서버에서 발생할 수 있는 에러를 분류합니다.
/// 잘못된 수(이미 놓인 칸)는 정상 프로토콜 흐름이므로 여기에 포함되지 않습니다.
#[derive(Error, Debug)]
pub enum BoardServerError {
    /// 상대가 연결을 끊었거나 읽기가 짧게 끝남
    #[error("연결 종료 [작업: {operation}]")]
    Disconnected { operation: &'static str },

    /// 그 외 소켓 I/O 실패
    #[error("네트워크 에러 [작업: {operation}]: {source}")]
    Network {
        operation: &'static str,
        #[source]
        source: io::Error,
    },

    /// 읽기/쓰기 제한 시간 초과
    #[error("타임아웃 [작업: {operation}] ({secs}초)")]
    Timeout { operation: &'static str, secs: u64 },

    /// 알 수 없는 opcode, 잘못된 페이로드
    #[error("프로토콜 에러 [타입: {message_type}]: {message}")]
    Protocol {
        message_type: String,
        message: String,
    },

    /// 설정 값 오류
    #[error("설정 에러 [키: {key}]: {message}")]
    Configuration { key: String, message: String },

    /// 서버 종료 신호 수신
    #[error("서버 종료 중")]
    ShuttingDown,

    /// 내부 불변식 위반
    #[error("내부 에러 [컴포넌트: {component}]: {message}")]
    Internal {
        component: &'static str,
        message: String,
    },
}

impl BoardServerError {
    /// I/O 에러를 작업 이름과 함께 변환합니다.
    ///
    /// 짧은 읽기(`UnexpectedEof`)와 연결 리셋 계열은 모두 `Disconnected`로 취급합니다.
    pub fn from_io(operation: &'static str, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => Self::Disconnected { operation },
            _ => Self::Network {
                operation,
                source: err,
            },
        }
    }

    /// 프로토콜 에러 생성
    pub fn protocol_error(message_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Protocol {
            message_type: message_type.into(),
            message: message.into(),
        }
    }

    /// 설정 에러 생성
    pub fn configuration_error(key: &str, message: impl Into<String>) -> Self {
        Self::Configuration {
            key: key.to_string(),
            message: message.into(),
        }
    }

    /// 에러 종류별 기본 심각도
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Disconnected { .. } | Self::ShuttingDown => ErrorSeverity::Info,
            Self::Timeout { .. } | Self::Network { .. } => ErrorSeverity::Warning,
            Self::Protocol { .. } | Self::Configuration { .. } => ErrorSeverity::Error,
            Self::Internal { .. } => ErrorSeverity::Critical,
        }
    }
}

/// 에러 심각도 레벨
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// 정보성 - 정상 동작 중 발생하는 예상 가능한 상황
    Info,
    /// 경고 - 해당 매치만 종료되고 서비스는 계속됨
    Warning,
    /// 에러 - 클라이언트의 잘못된 입력 등 진단이 필요한 상황
    Error,
    /// 치명적 - 서버 불변식이 깨진 상황
    Critical,
}

/// 에러 핸들러
///
/// 에러를 심각도에 맞는 로그 레벨로 기록하는 중앙 진입점입니다.
pub struct ErrorHandler;

impl ErrorHandler {
    /// 에러를 처리하고 로깅합니다.
    ///
    /// # Arguments
    ///
    /// * `error` - 처리할 에러
    /// * `component` - 에러가 발생한 컴포넌트
    /// * `operation` - 에러가 발생한 작업
    ///
    /// # Examples
    ///
    /// ```rust
    /// use boardserver::tool::error::{BoardServerError, ErrorHandler};
    ///
    /// let error = BoardServerError::Disconnected { operation: "await_move" };
    /// ErrorHandler::handle_error(&error, "MatchEngine", "play_turn");
    /// ```
    pub fn handle_error(error: &BoardServerError, component: &str, operation: &str) {
        Self::log_with_severity(error, error.severity(), component, operation);
    }

    /// 심각도를 직접 지정하여 로깅합니다.
    pub fn log_with_severity(
        error: &BoardServerError,
        severity: ErrorSeverity,
        component: &str,
        operation: &str,
    ) {
        let log_message = format!("[{}] [{}] {}", component, operation, error);

        match severity {
            ErrorSeverity::Info => info!("{}", log_message),
            ErrorSeverity::Warning => warn!("{}", log_message),
            ErrorSeverity::Error => error!("{}", log_message),
            ErrorSeverity::Critical => {
                error!("🚨 CRITICAL: {}", log_message);
            }
        }
    }
}

/// 결과 타입 별칭
pub type BoardResult<T> = Result<T, BoardServerError>;
