//! 보드 서버 환경 설정 모듈
//!
//! .env 파일과 환경변수에서 설정을 로드하고 검증합니다.

use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::game::WinRule;
use crate::tool::error::BoardServerError;

/// 기본 포트
pub const DEFAULT_PORT: u16 = 4321;
/// 기본 최대 동시 접속자 수 (126개 매치)
pub const DEFAULT_MAX_PLAYERS: u32 = 252;

/// 보드 서버 설정 구조체
#[derive(Debug, Clone, Serialize)]
pub struct BoardServerConfig {
    /// 리슨 호스트 주소
    pub host: String,
    /// 리슨 포트 번호
    pub port: u16,
    /// 최대 동시 접속자 수 (짝수)
    pub max_players: u32,
    /// 보드 한 변의 길이 N
    pub board_size: usize,
    /// 승리 규칙
    pub win_rule: WinRule,
    /// 클라이언트 메시지 대기 제한 (초)
    pub move_timeout_secs: u64,
    /// 전송 제한 (초)
    pub write_timeout_secs: u64,
    /// 종료 시 진행 중인 매치 정리 대기 (초)
    pub shutdown_grace_secs: u64,
}

impl Default for BoardServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            max_players: DEFAULT_MAX_PLAYERS,
            board_size: 3,
            win_rule: WinRule::Classic,
            move_timeout_secs: 300,
            write_timeout_secs: 10,
            shutdown_grace_secs: 5,
        }
    }
}

/// 매치 하나에 넘겨지는 설정
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchConfig {
    pub board_size: usize,
    pub win_rule: WinRule,
    pub move_timeout: Duration,
    pub write_timeout: Duration,
}

impl Default for MatchConfig {
    fn default() -> Self {
        BoardServerConfig::default().match_config()
    }
}

impl BoardServerConfig {
    /// 환경변수에서 설정을 로드합니다.
    ///
    /// 로드 순서:
    /// 1. 상위 디렉토리의 .env 파일
    /// 2. 현재 디렉토리의 .env 파일
    /// 3. 시스템 환경변수
    /// 4. 기본값
    pub fn from_env() -> Result<Self> {
        Self::load_env_file();
        let config = Self::from_lookup(|key| std::env::var(key).ok())?;

        info!("보드 서버 설정 로드 완료: {:?}", config);
        Ok(config)
    }

    /// 키 조회 함수로부터 설정을 만듭니다.
    ///
    /// 포트와 타임아웃 파싱 실패는 기본값으로 대체합니다.
    /// 용량, 보드 크기, 승리 규칙은 매치 규칙 자체를 바꾸므로 파싱 실패가 에러입니다.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parse_or = |key: &str, default: u64| -> u64 {
            lookup(key)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(default)
        };
        let parse_strict = |key: &str| -> Result<Option<usize>, BoardServerError> {
            match lookup(key) {
                Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
                    BoardServerError::configuration_error(
                        key,
                        format!("숫자가 아닌 값: {:?}", raw),
                    )
                }),
                None => Ok(None),
            }
        };

        let max_players = match parse_strict("max_players")? {
            Some(n) => u32::try_from(n).map_err(|_| {
                BoardServerError::configuration_error("max_players", format!("너무 큰 값: {}", n))
            })?,
            None => defaults.max_players,
        };
        let board_size = parse_strict("board_size")?.unwrap_or(defaults.board_size);

        let win_rule = match lookup("win_rule") {
            Some(raw) => raw
                .parse::<WinRule>()
                .map_err(|e| BoardServerError::configuration_error("win_rule", e))?,
            None => defaults.win_rule,
        };

        Ok(Self {
            host: lookup("board_host").unwrap_or(defaults.host),
            port: lookup("board_port")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.port),
            max_players,
            board_size,
            win_rule,
            move_timeout_secs: parse_or("move_timeout_secs", defaults.move_timeout_secs),
            write_timeout_secs: parse_or("write_timeout_secs", defaults.write_timeout_secs),
            shutdown_grace_secs: parse_or("shutdown_grace_secs", defaults.shutdown_grace_secs),
        })
    }

    /// 리슨 주소를 반환합니다.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn match_config(&self) -> MatchConfig {
        MatchConfig {
            board_size: self.board_size,
            win_rule: self.win_rule,
            move_timeout: Duration::from_secs(self.move_timeout_secs),
            write_timeout: Duration::from_secs(self.write_timeout_secs),
        }
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    /// .env 파일을 로드합니다.
    fn load_env_file() {
        let env_paths = ["../.env", ".env", "../../.env"];

        let mut loaded = false;
        for path in env_paths {
            if Path::new(path).exists() && dotenv::from_filename(path).is_ok() {
                info!(".env 파일 로드 성공: {}", path);
                loaded = true;
                break;
            }
        }

        if !loaded {
            warn!(".env 파일을 찾을 수 없습니다. 기본값과 시스템 환경변수를 사용합니다.");
        }
    }
}

/// 설정 검증 유틸리티
pub fn validate_config(config: &BoardServerConfig) -> Result<(), BoardServerError> {
    if config.port == 0 {
        return Err(BoardServerError::configuration_error(
            "board_port",
            format!("유효하지 않은 포트 번호: {}", config.port),
        ));
    }

    if config.host.trim().is_empty() {
        return Err(BoardServerError::configuration_error(
            "board_host",
            "호스트 주소가 비어있습니다",
        ));
    }

    // 매치는 항상 두 자리를 함께 해제하므로 짝수여야 용량이 남지 않음
    if config.max_players < 2 || config.max_players % 2 != 0 {
        return Err(BoardServerError::configuration_error(
            "max_players",
            format!("2 이상의 짝수여야 합니다: {}", config.max_players),
        ));
    }

    let cells = config.board_size.checked_mul(config.board_size);
    if config.board_size == 0 || cells.map_or(true, |n| i32::try_from(n).is_err()) {
        return Err(BoardServerError::configuration_error(
            "board_size",
            format!("지원하지 않는 보드 크기: {}", config.board_size),
        ));
    }

    if !config.win_rule.supports_board_size(config.board_size) {
        let message = match config.win_rule {
            WinRule::Classic => format!(
                "classic 규칙은 3x3 전용입니다 ({0}x{0} 보드에는 line:<k> 규칙을 명시하세요)",
                config.board_size
            ),
            WinRule::Line { length } => format!(
                "line 길이 {}는 1 이상 {} 이하여야 합니다",
                length, config.board_size
            ),
        };
        return Err(BoardServerError::configuration_error("win_rule", message));
    }

    if config.move_timeout_secs == 0 || config.write_timeout_secs == 0 {
        return Err(BoardServerError::configuration_error(
            "move_timeout_secs/write_timeout_secs",
            "타임아웃은 0보다 커야 합니다",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<BoardServerConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BoardServerConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 4321);
        assert_eq!(config.max_players, 252);
        assert_eq!(config.board_size, 3);
        assert_eq!(config.win_rule, WinRule::Classic);
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.bind_address(), "0.0.0.0:4321");
    }

    #[test]
    fn test_large_board_requires_explicit_rule() {
        let config = config_from(&[("board_size", "10")]).unwrap();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("win_rule"));

        let config = config_from(&[("board_size", "10"), ("win_rule", "line:5")]).unwrap();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.match_config().win_rule, WinRule::Line { length: 5 });
    }

    #[test]
    fn test_invalid_values() {
        assert!(config_from(&[("win_rule", "battleship")]).is_err());

        let odd = config_from(&[("max_players", "7")]).unwrap();
        assert!(validate_config(&odd).is_err());

        let long_line = config_from(&[("win_rule", "line:4")]).unwrap();
        assert!(validate_config(&long_line).is_err());

        let no_timeout = config_from(&[("move_timeout_secs", "0")]).unwrap();
        assert!(validate_config(&no_timeout).is_err());

        let huge = config_from(&[("board_size", "100000"), ("win_rule", "line:5")]).unwrap();
        assert!(validate_config(&huge).is_err());
    }

    #[test]
    fn test_unparsable_number_falls_back() {
        let config = config_from(&[("board_port", "not-a-port")]).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_unparsable_capacity_or_board_size_is_rejected() {
        let err = config_from(&[("max_players", "abc")]).unwrap_err();
        assert!(err.to_string().contains("max_players"));

        let err = config_from(&[("board_size", "3x3")]).unwrap_err();
        assert!(err.to_string().contains("board_size"));

        let err = config_from(&[("max_players", "-2")]).unwrap_err();
        assert!(err.to_string().contains("max_players"));

        let config = config_from(&[("max_players", " 16 "), ("board_size", "3")]).unwrap();
        assert_eq!(config.max_players, 16);
        assert!(validate_config(&config).is_ok());
    }
}
