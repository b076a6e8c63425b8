//! 매치메이커
//!
//! 리스너 하나에서 연결을 받아 도착 순서대로 두 명씩 묶고,
//! 묶인 쌍마다 독립된 매치 엔진 태스크를 띄웁니다.
//!
//! 각 accept 전에 레지스트리에서 자리를 예약합니다. 용량이 가득 차 있으면
//! 예약 단계에서 대기하므로 accept가 호출되지 않고, 새 연결은 커널 listen 큐에 머뭅니다.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::MatchConfig;
use crate::game::Seat;
use crate::protocol::{write_seat_id, ServerMessage};
use crate::service::match_engine::{MatchEngine, MatchSummary};
use crate::service::player_connection::PlayerConnection;
use crate::service::session_registry::{SeatReservation, SessionRegistry};
use crate::service::shutdown_signalled;
use crate::tool::error::{BoardResult, BoardServerError, ErrorHandler};

/// 자리 하나를 기다린 결과
enum Arrival {
    Seated(PlayerConnection<TcpStream>),
    /// 대기 중이던 0번 자리가 끊김
    PartnerLeft(BoardServerError),
    Shutdown,
}

async fn partner_hung_up(partner: Option<&PlayerConnection<TcpStream>>) -> BoardServerError {
    match partner {
        Some(connection) => connection.hung_up().await,
        None => std::future::pending().await,
    }
}

/// 매치메이커
pub struct Matchmaker {
    listener: TcpListener,
    registry: Arc<SessionRegistry>,
    match_config: MatchConfig,
    shutdown: watch::Receiver<bool>,
    next_match_id: u64,
    live_matches: Vec<JoinHandle<MatchSummary>>,
}

impl Matchmaker {
    /// 주소에 바인드하여 매치메이커를 만듭니다.
    pub async fn bind(
        addr: &str,
        registry: Arc<SessionRegistry>,
        match_config: MatchConfig,
        shutdown: watch::Receiver<bool>,
    ) -> BoardResult<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| BoardServerError::from_io("bind", e))?;

        Ok(Self::from_listener(listener, registry, match_config, shutdown))
    }

    pub fn from_listener(
        listener: TcpListener,
        registry: Arc<SessionRegistry>,
        match_config: MatchConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            listener,
            registry,
            match_config,
            shutdown,
            next_match_id: 1,
            live_matches: Vec::new(),
        }
    }

    pub fn local_addr(&self) -> BoardResult<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| BoardServerError::from_io("local_addr", e))
    }

    /// 종료 신호가 올 때까지 페어링을 반복합니다.
    ///
    /// 종료 후에는 새 예약을 막고, 진행 중인 매치가 정리되기를 `grace`만큼 기다립니다.
    pub async fn run(mut self, grace: Duration) -> BoardResult<()> {
        info!(
            "✅ 매치메이커 실행 중: {} (최대 {}명)",
            self.local_addr()?,
            self.registry.capacity()
        );

        while let Some((first, second)) = self.accept_pair().await? {
            self.spawn_match(first, second);
        }

        info!("🛑 매치메이커 종료 중... (진행 중인 매치 {}개)", self.live_matches.len());
        self.registry.close();
        self.drain(grace).await;
        Ok(())
    }

    /// 두 연결을 받아 0번, 1번 자리를 할당합니다. 종료 신호를 받으면 `None`.
    ///
    /// 0번 자리 할당 직후 `HLD`를 한 번 보냅니다. 상대를 기다리는 동안 0번 자리가
    /// 끊기면 그 연결을 정리하고 다음 도착자부터 다시 0번 자리로 받습니다.
    pub async fn accept_pair(
        &mut self,
    ) -> BoardResult<Option<(PlayerConnection<TcpStream>, PlayerConnection<TcpStream>)>> {
        let limit = self.match_config.write_timeout;

        loop {
            let mut first = match self.accept_seat(Seat::First, None).await? {
                Arrival::Seated(connection) => connection,
                Arrival::PartnerLeft(_) => continue,
                Arrival::Shutdown => return Ok(None),
            };

            if let Err(e) = first.send(ServerMessage::Hold, limit).await {
                ErrorHandler::handle_error(&e, "Matchmaker", "send_hold");
                first.close(limit).await;
                continue;
            }
            debug!("0번 자리 대기 중: {}", first.peer());

            match self.accept_seat(Seat::Second, Some(&first)).await? {
                Arrival::Seated(second) => return Ok(Some((first, second))),
                Arrival::PartnerLeft(e) => {
                    ErrorHandler::handle_error(&e, "Matchmaker", "hold_seat");
                    info!("대기 중이던 0번 자리 이탈: {}", first.peer());
                    first.close(limit).await;
                }
                Arrival::Shutdown => {
                    first.close(limit).await;
                    return Ok(None);
                }
            }
        }
    }

    /// 자리 하나가 채워질 때까지 accept 합니다.
    ///
    /// 자리 id 전송에 실패한 연결은 버리고, 같은 예약으로 다음 연결을 받습니다.
    /// `partner`가 있으면 예약과 accept를 기다리는 동안 그 연결의 끊김도 감시합니다.
    async fn accept_seat(
        &mut self,
        seat: Seat,
        partner: Option<&PlayerConnection<TcpStream>>,
    ) -> BoardResult<Arrival> {
        let reserved = tokio::select! {
            reserved = self.registry.reserve() => reserved,
            e = partner_hung_up(partner) => return Ok(Arrival::PartnerLeft(e)),
            _ = shutdown_signalled(&mut self.shutdown) => return Ok(Arrival::Shutdown),
        };
        let mut reservation = match reserved {
            Ok(reservation) => reservation,
            Err(BoardServerError::ShuttingDown) => return Ok(Arrival::Shutdown),
            Err(e) => return Err(e),
        };

        loop {
            let accepted = tokio::select! {
                accepted = self.listener.accept() => accepted,
                e = partner_hung_up(partner) => return Ok(Arrival::PartnerLeft(e)),
                _ = shutdown_signalled(&mut self.shutdown) => return Ok(Arrival::Shutdown),
            };

            let (stream, addr) = match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("연결 수락 실패: {}", e);
                    continue;
                }
            };

            match self.seat_connection(seat, stream, addr, reservation).await {
                Ok(connection) => return Ok(Arrival::Seated(connection)),
                Err(returned) => reservation = returned,
            }
        }
    }

    /// 자리 id를 보내고 레지스트리에 등록합니다. 전송 실패 시 예약을 돌려줍니다.
    async fn seat_connection(
        &self,
        seat: Seat,
        mut stream: TcpStream,
        addr: SocketAddr,
        reservation: SeatReservation,
    ) -> Result<PlayerConnection<TcpStream>, SeatReservation> {
        if let Err(e) = stream.set_nodelay(true) {
            debug!("TCP_NODELAY 설정 실패 ({}): {}", addr, e);
        }

        let limit = self.match_config.write_timeout;
        let sent = match tokio::time::timeout(limit, write_seat_id(&mut stream, seat)).await {
            Ok(result) => result,
            Err(_) => Err(BoardServerError::Timeout {
                operation: "send_seat_id",
                secs: limit.as_secs(),
            }),
        };
        if let Err(e) = sent {
            ErrorHandler::handle_error(&e, "Matchmaker", "send_seat_id");
            return Err(reservation);
        }

        let ticket = reservation.admit();
        info!(
            "새 플레이어 연결: {} -> {} (접속자 {}명)",
            addr,
            seat,
            self.registry.snapshot()
        );
        Ok(PlayerConnection::new(seat, addr.to_string(), stream, ticket))
    }

    fn spawn_match(
        &mut self,
        first: PlayerConnection<TcpStream>,
        second: PlayerConnection<TcpStream>,
    ) {
        let match_id = self.next_match_id;
        self.next_match_id += 1;

        let engine = MatchEngine::new(
            match_id,
            first,
            second,
            self.registry.clone(),
            self.match_config,
            self.shutdown.clone(),
        );
        let handle = tokio::spawn(engine.run().instrument(info_span!("match", match_id)));

        self.live_matches.retain(|live| !live.is_finished());
        self.live_matches.push(handle);
    }

    async fn drain(&mut self, grace: Duration) {
        let handles = std::mem::take(&mut self.live_matches);
        let drained = tokio::time::timeout(grace, async {
            for handle in handles {
                if let Err(e) = handle.await {
                    error!("매치 태스크 비정상 종료: {}", e);
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!("종료 대기 시간 초과, 남은 매치를 정리하지 못했습니다");
        }
        info!("레지스트리 통계: {:?}", self.registry.stats());
    }
}
