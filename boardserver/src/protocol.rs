//! 보드 게임 프로토콜 정의
//!
//! 클라이언트와 서버 간 통신 메시지를 정의합니다.
//! 구분자나 길이 헤더 없이 고정 길이 토큰만 주고받습니다.
//!
//! # 프로토콜 구조
//!
//! ```text
//! [3바이트 ASCII opcode][0~2개의 4바이트 정수]
//! ```
//!
//! 정수는 모두 32비트 부호 있는 big-endian 입니다.
//! 접속 직후 서버가 보내는 자리 id만 opcode 없이 정수 하나로 전송됩니다.
//!
//! | opcode | 방향 | 페이로드 |
//! |---|---|---|
//! | `HLD` `SRT` `TRN` `INV` `WAT` `WIN` `LSE` `DRW` `PLT` | 서버 → 클라이언트 | 없음 |
//! | `CNT` | 서버 → 클라이언트 | 접속자 수 |
//! | `UPD` | 서버 → 양쪽 | 둔 자리 id, 인덱스 |
//! | `MOV` | 클라이언트 → 서버 | 인덱스 |
//! | `QRY` | 클라이언트 → 서버 | 없음 (접속자 수 요청) |

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::game::Seat;
use crate::tool::error::{BoardResult, BoardServerError};

/// opcode 길이
pub const OPCODE_LEN: usize = 3;
/// 정수 페이로드 길이
pub const INT_LEN: usize = 4;

/// 와이어 opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Hold,
    Start,
    Turn,
    Invalid,
    Count,
    Update,
    Wait,
    Win,
    Lose,
    Draw,
    Place,
    Move,
    Query,
}

impl Opcode {
    pub fn as_bytes(self) -> &'static [u8; OPCODE_LEN] {
        match self {
            Opcode::Hold => b"HLD",
            Opcode::Start => b"SRT",
            Opcode::Turn => b"TRN",
            Opcode::Invalid => b"INV",
            Opcode::Count => b"CNT",
            Opcode::Update => b"UPD",
            Opcode::Wait => b"WAT",
            Opcode::Win => b"WIN",
            Opcode::Lose => b"LSE",
            Opcode::Draw => b"DRW",
            Opcode::Place => b"PLT",
            Opcode::Move => b"MOV",
            Opcode::Query => b"QRY",
        }
    }

    pub fn from_bytes(bytes: &[u8; OPCODE_LEN]) -> Option<Self> {
        let opcode = match bytes {
            b"HLD" => Opcode::Hold,
            b"SRT" => Opcode::Start,
            b"TRN" => Opcode::Turn,
            b"INV" => Opcode::Invalid,
            b"CNT" => Opcode::Count,
            b"UPD" => Opcode::Update,
            b"WAT" => Opcode::Wait,
            b"WIN" => Opcode::Win,
            b"LSE" => Opcode::Lose,
            b"DRW" => Opcode::Draw,
            b"PLT" => Opcode::Place,
            b"MOV" => Opcode::Move,
            b"QRY" => Opcode::Query,
            _ => return None,
        };
        Some(opcode)
    }
}

/// 서버 → 클라이언트 메시지
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerMessage {
    /// 두 번째 플레이어를 기다리는 중
    Hold,
    /// 매치 시작
    Start,
    /// 수를 보내라는 요청
    Turn,
    /// 직전 수가 유효하지 않음
    Invalid,
    /// 현재 접속자 수
    PlayerCount(u32),
    /// 보드 갱신
    Update { seat: Seat, index: i32 },
    /// 상대 차례, 대기
    Wait,
    Win,
    Lose,
    Draw,
    /// 배치 요청 (10x10 변형 전용)
    Place,
}

impl ServerMessage {
    pub fn opcode(&self) -> Opcode {
        match self {
            ServerMessage::Hold => Opcode::Hold,
            ServerMessage::Start => Opcode::Start,
            ServerMessage::Turn => Opcode::Turn,
            ServerMessage::Invalid => Opcode::Invalid,
            ServerMessage::PlayerCount(_) => Opcode::Count,
            ServerMessage::Update { .. } => Opcode::Update,
            ServerMessage::Wait => Opcode::Wait,
            ServerMessage::Win => Opcode::Win,
            ServerMessage::Lose => Opcode::Lose,
            ServerMessage::Draw => Opcode::Draw,
            ServerMessage::Place => Opcode::Place,
        }
    }

    /// 버퍼에 메시지를 인코딩합니다.
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.reserve(OPCODE_LEN + 2 * INT_LEN);
        buf.put_slice(self.opcode().as_bytes());
        match self {
            ServerMessage::PlayerCount(count) => {
                buf.put_i32(i32::try_from(*count).unwrap_or(i32::MAX));
            }
            ServerMessage::Update { seat, index } => {
                buf.put_i32(seat.id());
                buf.put_i32(*index);
            }
            _ => {}
        }
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(OPCODE_LEN + 2 * INT_LEN);
        self.encode(&mut buf);
        buf.freeze()
    }

    /// 스트림에 메시지를 씁니다.
    pub async fn write_to_stream<W>(&self, stream: &mut W) -> BoardResult<()>
    where
        W: AsyncWrite + Unpin,
    {
        write_frame(stream, &self.to_bytes(), "send_server_message").await
    }

    /// 스트림에서 서버 메시지를 읽습니다. (클라이언트 측)
    pub async fn read_from_stream<R>(stream: &mut R) -> BoardResult<Self>
    where
        R: AsyncRead + Unpin,
    {
        let opcode = read_opcode(stream).await?;
        let message = match opcode {
            Opcode::Hold => ServerMessage::Hold,
            Opcode::Start => ServerMessage::Start,
            Opcode::Turn => ServerMessage::Turn,
            Opcode::Invalid => ServerMessage::Invalid,
            Opcode::Count => {
                let count = read_int(stream).await?;
                let count = u32::try_from(count).map_err(|_| {
                    BoardServerError::protocol_error("CNT", format!("음수 접속자 수: {}", count))
                })?;
                ServerMessage::PlayerCount(count)
            }
            Opcode::Update => {
                let seat_id = read_int(stream).await?;
                let seat = Seat::from_id(seat_id).ok_or_else(|| {
                    BoardServerError::protocol_error("UPD", format!("잘못된 자리 id: {}", seat_id))
                })?;
                let index = read_int(stream).await?;
                ServerMessage::Update { seat, index }
            }
            Opcode::Wait => ServerMessage::Wait,
            Opcode::Win => ServerMessage::Win,
            Opcode::Lose => ServerMessage::Lose,
            Opcode::Draw => ServerMessage::Draw,
            Opcode::Place => ServerMessage::Place,
            Opcode::Move | Opcode::Query => {
                return Err(BoardServerError::protocol_error(
                    format!("{:?}", opcode),
                    "클라이언트 전용 opcode를 서버에서 수신",
                ));
            }
        };
        Ok(message)
    }
}

/// 클라이언트 → 서버 메시지
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientMessage {
    /// 행 우선 인덱스에 수를 둡니다
    Move(i32),
    /// 현재 접속자 수 요청. 차례를 넘기지 않습니다
    QueryPlayerCount,
}

impl ClientMessage {
    pub fn encode(&self, buf: &mut BytesMut) {
        match self {
            ClientMessage::Move(index) => {
                buf.put_slice(Opcode::Move.as_bytes());
                buf.put_i32(*index);
            }
            ClientMessage::QueryPlayerCount => buf.put_slice(Opcode::Query.as_bytes()),
        }
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(OPCODE_LEN + INT_LEN);
        self.encode(&mut buf);
        buf.freeze()
    }

    pub async fn write_to_stream<W>(&self, stream: &mut W) -> BoardResult<()>
    where
        W: AsyncWrite + Unpin,
    {
        write_frame(stream, &self.to_bytes(), "send_client_message").await
    }

    /// 스트림에서 클라이언트 메시지를 읽습니다. (서버 측)
    ///
    /// 서버 전용 opcode나 알 수 없는 opcode는 프로토콜 위반입니다.
    pub async fn read_from_stream<R>(stream: &mut R) -> BoardResult<Self>
    where
        R: AsyncRead + Unpin,
    {
        match read_opcode(stream).await? {
            Opcode::Move => Ok(ClientMessage::Move(read_int(stream).await?)),
            Opcode::Query => Ok(ClientMessage::QueryPlayerCount),
            other => Err(BoardServerError::protocol_error(
                format!("{:?}", other),
                "서버 전용 opcode를 클라이언트에서 수신",
            )),
        }
    }
}

/// 접속 직후 자리 id 전송
pub async fn write_seat_id<W>(stream: &mut W, seat: Seat) -> BoardResult<()>
where
    W: AsyncWrite + Unpin,
{
    write_frame(stream, &seat.id().to_be_bytes(), "send_seat_id").await
}

/// 자리 id 수신 (클라이언트 측)
pub async fn read_seat_id<R>(stream: &mut R) -> BoardResult<Seat>
where
    R: AsyncRead + Unpin,
{
    let id = read_int(stream).await?;
    Seat::from_id(id)
        .ok_or_else(|| BoardServerError::protocol_error("SEAT", format!("잘못된 자리 id: {}", id)))
}

async fn write_frame<W>(stream: &mut W, data: &[u8], operation: &'static str) -> BoardResult<()>
where
    W: AsyncWrite + Unpin,
{
    stream
        .write_all(data)
        .await
        .map_err(|e| BoardServerError::from_io(operation, e))?;
    stream
        .flush()
        .await
        .map_err(|e| BoardServerError::from_io(operation, e))
}

async fn read_opcode<R>(stream: &mut R) -> BoardResult<Opcode>
where
    R: AsyncRead + Unpin,
{
    let mut raw = [0u8; OPCODE_LEN];
    stream
        .read_exact(&mut raw)
        .await
        .map_err(|e| BoardServerError::from_io("read_opcode", e))?;

    Opcode::from_bytes(&raw).ok_or_else(|| {
        BoardServerError::protocol_error(
            String::from_utf8_lossy(&raw).into_owned(),
            "알 수 없는 opcode",
        )
    })
}

async fn read_int<R>(stream: &mut R) -> BoardResult<i32>
where
    R: AsyncRead + Unpin,
{
    stream
        .read_i32()
        .await
        .map_err(|e| BoardServerError::from_io("read_int", e))
}
