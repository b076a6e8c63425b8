//! 보드 서버 서비스 레이어
//!
//! # 서비스 구조
//!
//! ```text
//! Service Layer
//! ├── SessionRegistry (접속자 수, 용량 제한)
//! ├── PlayerConnection (자리 + 스트림 + 티켓)
//! ├── MatchEngine (매치 하나의 턴 상태 머신)
//! └── Matchmaker (accept 루프, 2명씩 페어링)
//! ```
//!
//! 매치마다 tokio 태스크 하나가 보드와 두 연결을 독점합니다.
//! 매치 간에 공유되는 상태는 `SessionRegistry`뿐입니다.

pub mod match_engine;
pub mod matchmaker;
pub mod player_connection;
pub mod session_registry;

pub use match_engine::{AbandonReason, MatchEngine, MatchOutcome, MatchSummary};
pub use matchmaker::Matchmaker;
pub use player_connection::PlayerConnection;
pub use session_registry::{PlayerTicket, RegistryStats, SeatReservation, SessionRegistry};

use tokio::sync::watch;

/// 종료 신호가 올 때까지 대기합니다.
///
/// 송신 측이 사라지면 종료 신호는 오지 않으므로 영원히 대기합니다.
pub(crate) async fn shutdown_signalled(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
