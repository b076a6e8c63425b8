//! 플레이어 연결
//!
//! 자리 id, 스트림, 레지스트리 티켓을 하나로 묶습니다.
//! 연결이 drop 되면 스트림이 닫히고 티켓이 접속자 수를 한 번 감소시킵니다.

use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use crate::game::Seat;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::service::session_registry::PlayerTicket;
use crate::tool::error::{BoardResult, BoardServerError};

/// 매치에 참가한 연결 하나
#[derive(Debug)]
pub struct PlayerConnection<S> {
    seat: Seat,
    peer: String,
    stream: S,
    _ticket: PlayerTicket,
}

impl<S> PlayerConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(seat: Seat, peer: impl Into<String>, stream: S, ticket: PlayerTicket) -> Self {
        Self {
            seat,
            peer: peer.into(),
            stream,
            _ticket: ticket,
        }
    }

    pub fn seat(&self) -> Seat {
        self.seat
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// 제한 시간 안에 메시지를 전송합니다.
    pub async fn send(&mut self, message: ServerMessage, limit: Duration) -> BoardResult<()> {
        tokio::time::timeout(limit, message.write_to_stream(&mut self.stream))
            .await
            .map_err(|_| BoardServerError::Timeout {
                operation: "send_message",
                secs: limit.as_secs(),
            })??;

        debug!("{} ({})에게 전송: {:?}", self.seat, self.peer, message);
        Ok(())
    }

    /// 제한 시간 안에 클라이언트 메시지를 수신합니다.
    pub async fn receive(&mut self, limit: Duration) -> BoardResult<ClientMessage> {
        let message = tokio::time::timeout(limit, ClientMessage::read_from_stream(&mut self.stream))
            .await
            .map_err(|_| BoardServerError::Timeout {
                operation: "await_move",
                secs: limit.as_secs(),
            })??;

        debug!("{} ({})에서 수신: {:?}", self.seat, self.peer, message);
        Ok(message)
    }

    /// 스트림을 닫습니다. 실패는 무시합니다. (이미 끊긴 연결일 수 있음)
    pub async fn close(mut self, limit: Duration) {
        let _ = tokio::time::timeout(limit, self.stream.shutdown()).await;
        debug!("{} ({}) 연결 종료", self.seat, self.peer);
    }
}

impl PlayerConnection<TcpStream> {
    /// 상대를 기다리는 동안 연결이 끊기면 그 에러를 반환합니다.
    ///
    /// `peek`만 하므로 먼저 도착한 데이터는 스트림에 남습니다. 데이터가 와 있으면
    /// 끊김을 더 감지하지 않고 대기합니다. (매치 시작 후 엔진이 처리)
    pub async fn hung_up(&self) -> BoardServerError {
        let mut buf = [0u8; 1];
        match self.stream.peek(&mut buf).await {
            Ok(0) => BoardServerError::Disconnected {
                operation: "hold_seat",
            },
            Ok(_) => std::future::pending().await,
            Err(e) => BoardServerError::from_io("hold_seat", e),
        }
    }
}
