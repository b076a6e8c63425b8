//! 세션 레지스트리
//!
//! 프로세스 전체의 현재 접속자 수를 관리합니다.
//!
//! 접속자 한 명은 [`PlayerTicket`] 하나로 표현됩니다. 티켓이 생성될 때 카운트가 1 증가하고,
//! 티켓이 drop 될 때 정확히 1 감소합니다. 연결 하나당 감소는 한 번뿐입니다.
//!
//! 용량 제한은 세마포어로 걸립니다. 매치메이커는 accept 전에 [`SessionRegistry::reserve`]로
//! 자리를 예약하며, 용량이 찼으면 자리가 날 때까지 대기합니다.

use serde::Serialize;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error};

use crate::tool::error::{BoardResult, BoardServerError};

/// 세션 레지스트리
#[derive(Debug)]
pub struct SessionRegistry {
    count: AtomicU32,
    capacity: u32,
    slots: Arc<Semaphore>,
    total_admitted: AtomicU64,
    matches_started: AtomicU64,
    matches_finished: AtomicU64,
}

/// 레지스트리 통계 스냅샷
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub active_players: u32,
    pub capacity: u32,
    pub total_admitted: u64,
    pub matches_started: u64,
    pub matches_finished: u64,
}

impl SessionRegistry {
    /// 최대 동시 접속자 수 `capacity`로 레지스트리 생성
    pub fn new(capacity: u32) -> Arc<Self> {
        Arc::new(Self {
            count: AtomicU32::new(0),
            capacity,
            slots: Arc::new(Semaphore::new(capacity as usize)),
            total_admitted: AtomicU64::new(0),
            matches_started: AtomicU64::new(0),
            matches_finished: AtomicU64::new(0),
        })
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// 마지막으로 완료된 증감을 반영한 현재 접속자 수
    pub fn snapshot(&self) -> u32 {
        self.count.load(Ordering::Acquire)
    }

    /// 용량 안에서 자리 하나를 예약합니다. 가득 찼으면 자리가 날 때까지 대기합니다.
    ///
    /// 레지스트리가 닫혔으면 `ShuttingDown`.
    pub async fn reserve(self: &Arc<Self>) -> BoardResult<SeatReservation> {
        let permit = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| BoardServerError::ShuttingDown)?;

        Ok(SeatReservation {
            registry: Arc::clone(self),
            permit,
        })
    }

    /// 대기 없이 예약을 시도합니다. 가득 찼으면 `None`.
    pub fn try_reserve(self: &Arc<Self>) -> Option<SeatReservation> {
        let permit = self.slots.clone().try_acquire_owned().ok()?;
        Some(SeatReservation {
            registry: Arc::clone(self),
            permit,
        })
    }

    /// 더 이상 예약을 받지 않습니다. 대기 중인 `reserve`는 `ShuttingDown`으로 끝납니다.
    pub fn close(&self) {
        self.slots.close();
    }

    pub fn record_match_started(&self) {
        self.matches_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_match_finished(&self) {
        self.matches_finished.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            active_players: self.snapshot(),
            capacity: self.capacity,
            total_admitted: self.total_admitted.load(Ordering::Relaxed),
            matches_started: self.matches_started.load(Ordering::Relaxed),
            matches_finished: self.matches_finished.load(Ordering::Relaxed),
        }
    }

    fn increment(&self) -> u32 {
        let now = self.count.fetch_add(1, Ordering::AcqRel) + 1;
        self.total_admitted.fetch_add(1, Ordering::Relaxed);
        debug!("접속자 수 증가: {}/{}", now, self.capacity);
        now
    }

    fn decrement(&self) -> u32 {
        match self
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
        {
            Ok(previous) => {
                let now = previous - 1;
                debug!("접속자 수 감소: {}/{}", now, self.capacity);
                now
            }
            Err(_) => {
                // 티켓 수와 카운트가 어긋난 경우에만 도달
                error!("🚨 접속자 수가 이미 0인데 감소 요청이 들어왔습니다");
                0
            }
        }
    }
}

/// 아직 카운트되지 않은 자리 예약
///
/// 용량 슬롯 하나를 쥐고 있습니다. accept 에 실패해 drop 되면 슬롯만 반환되고
/// 카운트는 변하지 않습니다.
#[derive(Debug)]
pub struct SeatReservation {
    registry: Arc<SessionRegistry>,
    permit: OwnedSemaphorePermit,
}

impl SeatReservation {
    /// 예약을 실제 접속자로 등록합니다. (카운트 +1)
    pub fn admit(self) -> PlayerTicket {
        self.registry.increment();
        PlayerTicket {
            registry: self.registry,
            _permit: self.permit,
        }
    }
}

/// 접속 중인 플레이어 한 명
///
/// drop 시 카운트를 정확히 한 번 감소시키고 용량 슬롯을 반환합니다.
#[derive(Debug)]
pub struct PlayerTicket {
    registry: Arc<SessionRegistry>,
    _permit: OwnedSemaphorePermit,
}

impl Drop for PlayerTicket {
    fn drop(&mut self) {
        self.registry.decrement();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn admit(registry: &Arc<SessionRegistry>) -> PlayerTicket {
        registry.reserve().await.expect("예약 가능").admit()
    }

    #[tokio::test]
    async fn test_count_is_n_minus_two_m() {
        let registry = SessionRegistry::new(252);

        let mut matches = Vec::new();
        for _ in 0..5 {
            let pair = (admit(&registry).await, admit(&registry).await);
            matches.push(pair);
        }
        let lone = admit(&registry).await;
        assert_eq!(registry.snapshot(), 11);

        // 3개 매치 종료
        for _ in 0..3 {
            drop(matches.pop());
        }
        assert_eq!(registry.snapshot(), 11 - 2 * 3);

        drop(matches);
        drop(lone);
        assert_eq!(registry.snapshot(), 0);
        assert_eq!(registry.stats().total_admitted, 11);
    }

    #[tokio::test]
    async fn test_reservation_without_admit_does_not_count() {
        let registry = SessionRegistry::new(2);

        let reservation = registry.reserve().await.unwrap();
        assert_eq!(registry.snapshot(), 0);
        drop(reservation);

        assert_eq!(registry.snapshot(), 0);
        assert!(registry.try_reserve().is_some());
    }

    #[tokio::test]
    async fn test_capacity_blocks_until_release() {
        let registry = SessionRegistry::new(2);
        let first = admit(&registry).await;
        let _second = admit(&registry).await;

        assert!(registry.try_reserve().is_none());

        let waiter = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.reserve().await.map(|r| r.admit()) })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        assert_eq!(registry.snapshot(), 2);

        drop(first);
        let third = waiter.await.unwrap().unwrap();
        assert_eq!(registry.snapshot(), 2);
        assert!(registry.snapshot() <= registry.capacity());
        drop(third);
        assert_eq!(registry.snapshot(), 1);
    }

    #[tokio::test]
    async fn test_close_wakes_waiters() {
        let registry = SessionRegistry::new(1);
        let _held = admit(&registry).await;

        let waiter = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.reserve().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        registry.close();

        let result = waiter.await.unwrap();
        assert!(matches!(result, Err(BoardServerError::ShuttingDown)));
    }

    #[tokio::test]
    async fn test_concurrent_tickets() {
        let registry = SessionRegistry::new(64);
        let mut handles = Vec::new();
        for _ in 0..64 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                let ticket = registry.reserve().await.unwrap().admit();
                tokio::task::yield_now().await;
                drop(ticket);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(registry.snapshot(), 0);
        assert_eq!(registry.stats().total_admitted, 64);
    }
}
