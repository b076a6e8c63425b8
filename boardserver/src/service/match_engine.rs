//! 매치 엔진
//!
//! 매치 하나를 처음부터 끝까지 진행하는 턴 상태 머신입니다.
//!
//! ```text
//! AwaitMove(seat) ─▶ Validate ─┬─▶ Invalid ─▶ AwaitMove(같은 seat)
//!                              └─▶ Accepted ─▶ Broadcast ─▶ CheckTerminal ─┬─▶ AwaitMove(상대)
//!                                                                          ├─▶ Win
//!                                                                          └─▶ Draw
//! AwaitMove / Validate ─▶ Disconnected (연결 끊김, 타임아웃, 프로토콜 위반, 서버 종료)
//! ```
//!
//! 엔진은 보드와 두 연결을 독점합니다. 종료 시 두 연결을 모두 닫으며,
//! 각 연결의 티켓이 drop 되면서 접속자 수가 연결당 한 번씩 감소합니다.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::MatchConfig;
use crate::game::{detect_win, Board, MoveRejection, Seat};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::service::player_connection::PlayerConnection;
use crate::service::session_registry::SessionRegistry;
use crate::service::shutdown_signalled;
use crate::tool::error::{BoardServerError, ErrorHandler};

/// 매치 종료 사유
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchOutcome {
    Win { winner: Seat, turns: u32 },
    Draw { turns: u32 },
    /// 한쪽 참가자 때문에 중단됨
    Abandoned { seat: Seat, reason: AbandonReason },
    /// 서버 종료
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AbandonReason {
    Disconnected,
    TimedOut,
    ProtocolViolation,
    Internal,
}

/// 매치 종료 요약 (JSON으로 로깅됨)
#[derive(Debug, Clone, Serialize)]
pub struct MatchSummary {
    pub match_id: u64,
    pub outcome: MatchOutcome,
    pub turns: u32,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

/// 어느 자리에서 발생한 에러인지
#[derive(Debug)]
struct Fault {
    seat: Seat,
    error: BoardServerError,
}

type TurnResult<T> = Result<T, Fault>;

/// 매치 엔진
pub struct MatchEngine<S> {
    match_id: u64,
    config: MatchConfig,
    board: Board,
    players: [PlayerConnection<S>; 2],
    registry: Arc<SessionRegistry>,
    shutdown: watch::Receiver<bool>,
    current: Seat,
    previous: Seat,
    turns: u32,
}

impl<S> MatchEngine<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// 두 연결로 새 매치를 만듭니다. `first`가 0번 자리입니다.
    pub fn new(
        match_id: u64,
        first: PlayerConnection<S>,
        second: PlayerConnection<S>,
        registry: Arc<SessionRegistry>,
        config: MatchConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        debug_assert_eq!(first.seat(), Seat::First);
        debug_assert_eq!(second.seat(), Seat::Second);

        Self {
            match_id,
            config,
            board: Board::new(config.board_size),
            players: [first, second],
            registry,
            shutdown,
            current: Seat::First,
            // 첫 턴에 1번 자리에 WAT 전송
            previous: Seat::Second,
            turns: 0,
        }
    }

    /// 매치를 끝까지 진행하고 두 연결을 닫습니다.
    pub async fn run(mut self) -> MatchSummary {
        let started_at = Utc::now();
        let clock = Instant::now();
        self.registry.record_match_started();

        info!(
            "🎮 매치 {} 시작: {} vs {} ({}x{}, {})",
            self.match_id,
            self.players[0].peer(),
            self.players[1].peer(),
            self.config.board_size,
            self.config.board_size,
            self.config.win_rule
        );

        let outcome = match self.play().await {
            Ok(outcome) => outcome,
            Err(fault) => self.outcome_for(fault),
        };

        let MatchEngine {
            match_id,
            config,
            players,
            registry,
            turns,
            ..
        } = self;

        let [first, second] = players;
        tokio::join!(
            first.close(config.write_timeout),
            second.close(config.write_timeout)
        );
        registry.record_match_finished();

        let summary = MatchSummary {
            match_id,
            outcome,
            turns,
            started_at,
            duration_ms: clock.elapsed().as_millis() as u64,
        };

        match serde_json::to_string(&summary) {
            Ok(json) => info!("매치 {} 종료: {}", match_id, json),
            Err(e) => warn!("매치 {} 요약 직렬화 실패: {}", match_id, e),
        }
        info!("현재 접속자 수: {}", registry.snapshot());

        summary
    }

    async fn play(&mut self) -> TurnResult<MatchOutcome> {
        self.broadcast(ServerMessage::Start).await?;

        loop {
            if self.previous != self.current {
                self.send(self.current.other(), ServerMessage::Wait).await?;
            }

            let index = self.await_valid_move().await?;
            let seat = self.current;

            self.board.place(index, seat).map_err(|rejection| Fault {
                seat,
                error: BoardServerError::Internal {
                    component: "MatchEngine",
                    message: format!("검증된 수 {} 배치 실패: {:?}", index, rejection),
                },
            })?;
            let update = self.broadcast(ServerMessage::Update { seat, index }).await;
            self.turns += 1;

            debug!("매치 {} 보드:\n{}", self.match_id, self.board);

            // 보드에 결과가 확정되면 전송 실패와 무관하게 결과를 기록하고 양쪽에 통보
            if detect_win(&self.board, index as usize, self.config.win_rule) {
                info!("🏆 매치 {}: {} 승리 ({}턴)", self.match_id, seat, self.turns);
                self.announce([
                    (seat, ServerMessage::Win),
                    (seat.other(), ServerMessage::Lose),
                ])
                .await;
                return Ok(MatchOutcome::Win {
                    winner: seat,
                    turns: self.turns,
                });
            }

            if self.board.is_full() {
                info!("🤝 매치 {}: 무승부 ({}턴)", self.match_id, self.turns);
                self.announce(Seat::ALL.map(|s| (s, ServerMessage::Draw))).await;
                return Ok(MatchOutcome::Draw { turns: self.turns });
            }

            update?;

            self.previous = seat;
            self.current = seat.other();
        }
    }

    /// 현재 자리에서 유효한 수가 올 때까지 반복합니다.
    ///
    /// 접속자 수 요청과 잘못된 수는 차례를 넘기지 않습니다.
    async fn await_valid_move(&mut self) -> TurnResult<i32> {
        let seat = self.current;

        loop {
            self.send(seat, ServerMessage::Turn).await?;

            match self.receive(seat).await? {
                ClientMessage::QueryPlayerCount => {
                    let count = self.registry.snapshot();
                    debug!("매치 {}: {} 접속자 수 요청 -> {}", self.match_id, seat, count);
                    self.send(seat, ServerMessage::PlayerCount(count)).await?;
                }
                ClientMessage::Move(index) => match self.board.validate(index) {
                    Ok(_) => {
                        debug!("매치 {}: {} -> {}", self.match_id, seat, index);
                        return Ok(index);
                    }
                    Err(rejection) => {
                        let reason = match rejection {
                            MoveRejection::OutOfBounds => "범위 밖",
                            MoveRejection::Occupied => "이미 점유",
                        };
                        debug!(
                            "매치 {}: {}의 수 {} 거부 ({})",
                            self.match_id, seat, index, reason
                        );
                        self.send(seat, ServerMessage::Invalid).await?;
                    }
                },
            }
        }
    }

    async fn send(&mut self, seat: Seat, message: ServerMessage) -> TurnResult<()> {
        let limit = self.config.write_timeout;
        self.players[seat.index()]
            .send(message, limit)
            .await
            .map_err(|error| Fault { seat, error })
    }

    /// 두 자리 모두에 전송을 시도합니다. 실패가 있으면 첫 번째 실패를 반환합니다.
    async fn broadcast(&mut self, message: ServerMessage) -> TurnResult<()> {
        let mut first_fault = None;
        for seat in Seat::ALL {
            if let Err(fault) = self.send(seat, message).await {
                first_fault.get_or_insert(fault);
            }
        }
        first_fault.map_or(Ok(()), Err)
    }

    /// 최종 결과 통보. 한쪽 전송 실패가 다른 쪽 통보를 막지 않습니다.
    async fn announce(&mut self, verdicts: [(Seat, ServerMessage); 2]) {
        for (seat, verdict) in verdicts {
            if let Err(Fault { seat, error }) = self.send(seat, verdict).await {
                ErrorHandler::handle_error(
                    &error,
                    "MatchEngine",
                    &format!("match {} {} 결과 통보", self.match_id, seat),
                );
            }
        }
    }

    async fn receive(&mut self, seat: Seat) -> TurnResult<ClientMessage> {
        let limit = self.config.move_timeout;
        let player = &mut self.players[seat.index()];

        let result = tokio::select! {
            result = player.receive(limit) => result,
            _ = shutdown_signalled(&mut self.shutdown) => Err(BoardServerError::ShuttingDown),
        };
        result.map_err(|error| Fault { seat, error })
    }

    fn outcome_for(&self, fault: Fault) -> MatchOutcome {
        let Fault { seat, error } = fault;
        ErrorHandler::handle_error(&error, "MatchEngine", &format!("match {} {}", self.match_id, seat));

        let reason = match error {
            BoardServerError::ShuttingDown => return MatchOutcome::Shutdown,
            BoardServerError::Disconnected { .. } | BoardServerError::Network { .. } => {
                AbandonReason::Disconnected
            }
            BoardServerError::Timeout { .. } => AbandonReason::TimedOut,
            BoardServerError::Protocol { .. } => AbandonReason::ProtocolViolation,
            BoardServerError::Configuration { .. } | BoardServerError::Internal { .. } => {
                AbandonReason::Internal
            }
        };
        MatchOutcome::Abandoned { seat, reason }
    }
}
