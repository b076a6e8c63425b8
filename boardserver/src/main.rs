//! 보드 게임 매치 서버
//!
//! 환경변수:
//! - board_host: 리슨 호스트 (기본값: "0.0.0.0")
//! - board_port: 리슨 포트 (기본값: "4321")
//! - max_players: 최대 동시 접속자 수 (기본값: "252")
//! - board_size: 보드 크기 N (기본값: "3")
//! - win_rule: 승리 규칙 "classic" | "line:<k>" (기본값: "classic")
//! - move_timeout_secs / write_timeout_secs / shutdown_grace_secs

use anyhow::{Context, Result};
use tracing::{error, info};

use boardserver::config::{validate_config, BoardServerConfig};
use boardserver::service::{Matchmaker, SessionRegistry};

#[tokio::main]
async fn main() -> Result<()> {
    // 로깅 설정
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // 환경 설정 로드
    let config = BoardServerConfig::from_env()?;

    // 설정 검증
    validate_config(&config)?;

    info!("=== 보드 서버 설정 ===");
    info!("리슨 주소: {}", config.bind_address());
    info!("최대 접속자: {}명", config.max_players);
    info!(
        "보드: {}x{} / 승리 규칙: {}",
        config.board_size, config.board_size, config.win_rule
    );
    info!("======================");

    let registry = SessionRegistry::new(config.max_players);
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let matchmaker = Matchmaker::bind(
        &config.bind_address(),
        registry.clone(),
        config.match_config(),
        shutdown_rx,
    )
    .await
    .context("리스너 바인드 실패")?;

    let grace = config.shutdown_grace();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = matchmaker.run(grace).await {
            error!("매치메이커 실행 오류: {}", e);
        }
    });

    // 종료 시그널 대기
    tokio::signal::ctrl_c().await?;
    info!("종료 시그널 수신, 서버를 중지합니다...");
    let _ = shutdown_tx.send(true);

    server_handle.await.context("매치메이커 태스크 join 실패")?;

    info!("✅ 보드 서버가 성공적으로 중지되었습니다 ({:?})", registry.stats());
    Ok(())
}
