//! 클라이언트 측 프로토콜 어댑터
//!
//! 화면 출력이나 입력 처리는 포함하지 않습니다. UI는 이 어댑터 위에서
//! 서버 메시지를 받아 그리고, 사용자의 수를 전송하면 됩니다.
//!
//! # 사용 예시
//!
//! ```rust,no_run
//! use boardserver::client::MatchClient;
//! use boardserver::protocol::ServerMessage;
//!
//! # async fn demo() -> boardserver::tool::error::BoardResult<()> {
//! let mut client = MatchClient::connect("127.0.0.1:4321").await?;
//! let seat = client.read_seat().await?;
//! client.wait_for_start().await?;
//!
//! loop {
//!     match client.next_message().await? {
//!         ServerMessage::Turn => client.send_move(4).await?,
//!         ServerMessage::Win | ServerMessage::Lose | ServerMessage::Draw => break,
//!         other => println!("{} 수신: {:?}", seat, other),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::debug;

use crate::game::Seat;
use crate::protocol::{read_seat_id, ClientMessage, ServerMessage};
use crate::tool::error::{BoardResult, BoardServerError};

/// 서버 연결 하나를 감싸는 클라이언트
#[derive(Debug)]
pub struct MatchClient<S> {
    stream: S,
    seat: Option<Seat>,
}

impl MatchClient<TcpStream> {
    /// 서버에 TCP로 접속합니다.
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> BoardResult<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| BoardServerError::from_io("connect", e))?;
        stream
            .set_nodelay(true)
            .map_err(|e| BoardServerError::from_io("set_nodelay", e))?;
        Ok(Self::new(stream))
    }
}

impl<S> MatchClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self { stream, seat: None }
    }

    /// 접속 후 가장 먼저 오는 자리 id를 읽습니다.
    pub async fn read_seat(&mut self) -> BoardResult<Seat> {
        let seat = read_seat_id(&mut self.stream).await?;
        self.seat = Some(seat);
        Ok(seat)
    }

    pub fn seat(&self) -> Option<Seat> {
        self.seat
    }

    /// `SRT`가 올 때까지 기다립니다. 도중에 `HLD`를 받았으면 `true`.
    pub async fn wait_for_start(&mut self) -> BoardResult<bool> {
        let mut held = false;
        loop {
            match self.next_message().await? {
                ServerMessage::Hold => held = true,
                ServerMessage::Start => return Ok(held),
                other => {
                    return Err(BoardServerError::protocol_error(
                        format!("{:?}", other.opcode()),
                        "매치 시작 전 예상하지 못한 메시지",
                    ))
                }
            }
        }
    }

    pub async fn next_message(&mut self) -> BoardResult<ServerMessage> {
        let message = ServerMessage::read_from_stream(&mut self.stream).await?;
        debug!("서버 메시지 수신: {:?}", message);
        Ok(message)
    }

    pub async fn send_move(&mut self, index: i32) -> BoardResult<()> {
        ClientMessage::Move(index)
            .write_to_stream(&mut self.stream)
            .await
    }

    /// 접속자 수를 요청합니다. 서버는 `CNT` 다음에 다시 `TRN`을 보냅니다.
    pub async fn query_player_count(&mut self) -> BoardResult<()> {
        ClientMessage::QueryPlayerCount
            .write_to_stream(&mut self.stream)
            .await
    }

    /// 내부 스트림 (테스트에서 임의 바이트를 쓸 때 사용)
    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }
}
