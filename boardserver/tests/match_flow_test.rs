//! 보드 서버 통합 테스트
//!
//! 실제 TCP 리스너(127.0.0.1:0)에 매치메이커를 띄우고 클라이언트 어댑터로 접속합니다.
//! 1. 접속 순서대로 0번, 1번 자리 할당과 HLD/SRT 흐름
//! 2. 매치 종료 후 접속자 수 (연결당 한 번씩 감소)
//! 3. 대기 중인 0번 자리 이탈 처리
//! 4. 용량이 찼을 때 accept 대기
//! 5. 종료 신호 처리

use std::sync::Arc;
use std::time::Duration;

use boardserver::client::MatchClient;
use boardserver::config::MatchConfig;
use boardserver::game::{Seat, WinRule};
use boardserver::protocol::ServerMessage;
use boardserver::service::{Matchmaker, SessionRegistry};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;

struct TestServer {
    addr: String,
    registry: Arc<SessionRegistry>,
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<boardserver::BoardResult<()>>,
}

fn test_match_config() -> MatchConfig {
    MatchConfig {
        board_size: 3,
        win_rule: WinRule::Classic,
        move_timeout: Duration::from_secs(5),
        write_timeout: Duration::from_secs(1),
    }
}

async fn start_server(capacity: u32) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let registry = SessionRegistry::new(capacity);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let matchmaker =
        Matchmaker::from_listener(listener, registry.clone(), test_match_config(), shutdown_rx);
    let handle = tokio::spawn(matchmaker.run(Duration::from_secs(2)));

    TestServer {
        addr,
        registry,
        shutdown_tx,
        handle,
    }
}

/// 자리 id까지 받은 클라이언트
async fn join(addr: &str) -> (MatchClient<TcpStream>, Seat) {
    let mut client = MatchClient::connect(addr).await.unwrap();
    let seat = client.read_seat().await.unwrap();
    (client, seat)
}

/// `TRN`마다 다음 수를 보내고, 종료 메시지나 EOF까지 받은 메시지를 기록합니다.
async fn play(mut client: MatchClient<TcpStream>, moves: Vec<i32>) -> Vec<ServerMessage> {
    let mut moves = moves.into_iter();
    let mut transcript = Vec::new();

    while let Ok(message) = client.next_message().await {
        transcript.push(message);
        match message {
            ServerMessage::Turn => match moves.next() {
                Some(index) => client.send_move(index).await.unwrap(),
                None => break,
            },
            ServerMessage::Win | ServerMessage::Lose | ServerMessage::Draw => break,
            _ => {}
        }
    }
    transcript
}

async fn wait_for_count(registry: &SessionRegistry, expected: u32) {
    let reached = tokio::time::timeout(Duration::from_secs(2), async {
        while registry.snapshot() != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(
        reached.is_ok(),
        "접속자 수가 {}이 되지 않음 (현재 {})",
        expected,
        registry.snapshot()
    );
}

/// 0번이 0, 1, 2로 첫 행을 완성하는 매치 하나를 진행합니다.
async fn play_row_win(addr: &str) -> (Vec<ServerMessage>, Vec<ServerMessage>) {
    let (mut first, first_seat) = join(addr).await;
    assert_eq!(first_seat, Seat::First);

    let (mut second, second_seat) = join(addr).await;
    assert_eq!(second_seat, Seat::Second);

    assert!(first.wait_for_start().await.unwrap(), "0번 자리는 HLD를 받아야 함");
    assert!(!second.wait_for_start().await.unwrap(), "1번 자리는 HLD를 받지 않음");

    let first_task = tokio::spawn(play(first, vec![0, 1, 2]));
    let second_task = tokio::spawn(play(second, vec![4, 7]));
    (first_task.await.unwrap(), second_task.await.unwrap())
}

#[tokio::test]
async fn test_pairing_and_row_win_over_tcp() {
    let server = start_server(8).await;

    let (first, second) = play_row_win(&server.addr).await;
    assert_eq!(first.last(), Some(&ServerMessage::Win));
    assert_eq!(second.last(), Some(&ServerMessage::Lose));
    assert!(first.contains(&ServerMessage::Update {
        seat: Seat::First,
        index: 2
    }));

    wait_for_count(&server.registry, 0).await;
    println!("✅ TCP 매치 승리 흐름 테스트 통과");
}

#[tokio::test]
async fn test_seat_assignment_resets_each_pair_and_count_matches() {
    let server = start_server(8).await;

    // 두 매치 완료: 4명 접속, 2매치 종료 -> 4 - 2*2 = 0
    play_row_win(&server.addr).await;
    play_row_win(&server.addr).await;
    wait_for_count(&server.registry, 0).await;

    // 한 명만 접속해서 대기
    let (mut waiting, seat) = join(&server.addr).await;
    assert_eq!(seat, Seat::First);
    assert_eq!(waiting.next_message().await.unwrap(), ServerMessage::Hold);
    wait_for_count(&server.registry, 1).await;

    // 연결 정리 직후에 종료 집계가 기록됨
    tokio::time::timeout(Duration::from_secs(2), async {
        while server.registry.stats().matches_finished < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("매치 종료 집계 누락");

    let stats = server.registry.stats();
    assert_eq!(stats.total_admitted, 5);
    assert_eq!(stats.matches_started, 2);
}

#[tokio::test]
async fn test_waiting_player_leaving_frees_seat_zero() {
    let server = start_server(8).await;

    let (mut leaver, seat) = join(&server.addr).await;
    assert_eq!(seat, Seat::First);
    assert_eq!(leaver.next_message().await.unwrap(), ServerMessage::Hold);
    wait_for_count(&server.registry, 1).await;

    // 상대를 기다리던 중 이탈하면 자리가 정리됨
    drop(leaver);
    wait_for_count(&server.registry, 0).await;

    // 다음 도착자는 다시 0번 자리에서 대기하고, 정상적으로 매치를 끝까지 진행
    let (first, second) = play_row_win(&server.addr).await;
    assert_eq!(first.last(), Some(&ServerMessage::Win));
    assert_eq!(second.last(), Some(&ServerMessage::Lose));

    wait_for_count(&server.registry, 0).await;
    assert_eq!(server.registry.stats().total_admitted, 3);
}

#[tokio::test]
async fn test_query_over_tcp_reports_active_players() {
    let server = start_server(8).await;

    let (mut first, _) = join(&server.addr).await;
    let (mut second, _) = join(&server.addr).await;
    first.wait_for_start().await.unwrap();
    second.wait_for_start().await.unwrap();

    assert_eq!(first.next_message().await.unwrap(), ServerMessage::Turn);
    first.query_player_count().await.unwrap();
    assert_eq!(
        first.next_message().await.unwrap(),
        ServerMessage::PlayerCount(2)
    );
    assert_eq!(first.next_message().await.unwrap(), ServerMessage::Turn);

    drop(first);
    drop(second);
    wait_for_count(&server.registry, 0).await;
}

#[tokio::test]
async fn test_capacity_ceiling_holds_back_new_players() {
    let server = start_server(2).await;

    let (mut first, _) = join(&server.addr).await;
    let (mut second, _) = join(&server.addr).await;
    first.wait_for_start().await.unwrap();
    second.wait_for_start().await.unwrap();
    assert_eq!(server.registry.snapshot(), 2);

    // TCP 연결은 listen 큐에 들어가지만 자리 id는 오지 않음
    let mut third = MatchClient::connect(server.addr.as_str()).await.unwrap();
    let pending = tokio::time::timeout(Duration::from_millis(200), third.read_seat()).await;
    assert!(pending.is_err(), "용량이 찼는데 새 플레이어가 수락됨");
    assert_eq!(server.registry.snapshot(), 2);

    // 매치가 끝나면 대기하던 연결이 0번 자리를 받음
    drop(first);
    drop(second);
    let seat = tokio::time::timeout(Duration::from_secs(2), third.read_seat())
        .await
        .expect("자리 해제 후 수락되어야 함")
        .unwrap();
    assert_eq!(seat, Seat::First);
    wait_for_count(&server.registry, 1).await;
}

#[tokio::test]
async fn test_shutdown_closes_waiting_players() {
    let server = start_server(8).await;

    let (mut waiting, _) = join(&server.addr).await;
    assert_eq!(waiting.next_message().await.unwrap(), ServerMessage::Hold);

    server.shutdown_tx.send(true).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(3), server.handle)
        .await
        .expect("종료 신호 후 매치메이커가 끝나야 함")
        .unwrap();
    assert!(result.is_ok());

    assert!(waiting.next_message().await.is_err(), "대기 중인 연결은 닫혀야 함");
    assert_eq!(server.registry.snapshot(), 0);
}
