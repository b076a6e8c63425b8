//! 보드 게임 매치 서버 라이브러리
//!
//! TCP 클라이언트를 도착 순서대로 두 명씩 묶어 독립된 매치를 진행합니다.
//! 매치마다 보드 하나를 소유하고, 턴을 중재하고, 수를 검증하고,
//! 승리/무승부/연결 끊김을 판정해 양쪽에 상태를 전달합니다.
//!
//! # 아키텍처
//!
//! ```text
//! Board Server
//! ├── Service Layer
//! │   ├── Matchmaker (accept 루프, 페어링, 용량 제한)
//! │   ├── MatchEngine (턴 상태 머신)
//! │   ├── PlayerConnection (자리 + 스트림 + 티켓)
//! │   └── SessionRegistry (프로세스 전체 접속자 수)
//! ├── Game Layer
//! │   ├── Board (NxN 격자)
//! │   └── WinDetector (승리 판정)
//! ├── Protocol (3바이트 opcode + big-endian 정수)
//! ├── Client (클라이언트 측 프로토콜 어댑터)
//! └── Tool
//!     └── Error (에러 처리)
//! ```
//!
//! # 사용 예시
//!
//! ```rust,no_run
//! use boardserver::{BoardServerConfig, Matchmaker, SessionRegistry};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let config = BoardServerConfig::default();
//! let registry = SessionRegistry::new(config.max_players);
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//! let matchmaker = Matchmaker::bind(
//!     &config.bind_address(),
//!     registry,
//!     config.match_config(),
//!     shutdown_rx,
//! )
//! .await?;
//! matchmaker.run(config.shutdown_grace()).await?;
//! # Ok(())
//! # }
//! ```

/// 환경 설정 관리
pub mod config;

/// 와이어 프로토콜
pub mod protocol;

/// 보드와 승리 판정
pub mod game;

/// 매치메이커, 매치 엔진, 세션 레지스트리
pub mod service;

/// 클라이언트 측 프로토콜 어댑터
pub mod client;

/// 공통 유틸리티 도구들
pub mod tool;

pub use client::MatchClient;
pub use config::{validate_config, BoardServerConfig, MatchConfig};
pub use game::{detect_win, Board, Cell, Seat, WinRule};
pub use protocol::{ClientMessage, ServerMessage};
pub use service::{
    AbandonReason, MatchEngine, MatchOutcome, MatchSummary, Matchmaker, PlayerConnection,
    SessionRegistry,
};
pub use tool::error::{BoardResult, BoardServerError};
