//! 피어 프레즌스 테이블
//!
//! - 수신 루프만 upsert, 스냅샷은 커맨드 경로에서 동시 호출 가능
//! - 레코드는 Running 기간 동안 삭제되지 않음 (시간 기반 감쇠만 노출)
//! - 신선도 분류(fresh/warning/stale)는 표시 계층 몫, 여기서는 경과 초만 제공

use std::time::Instant;

use dashmap::DashMap;
use serde::Serialize;

/// 피어별 생존 레코드
#[derive(Debug, Clone)]
pub struct PeerRecord {
    /// 피어 식별자
    pub peer_id: String,

    /// 마지막 텍스트 페이로드 (Disconnect로는 갱신 안 됨)
    pub last_message: String,

    /// 수신한 전체 메시지 수 (타입 무관)
    pub message_count: u64,

    /// 마지막 수신 시각 (monotonic)
    pub last_seen: Instant,
}

/// 외부 폴링용 스냅샷 항목
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DeviceSnapshot {
    pub peer_id: String,
    pub last_message: String,
    pub message_count: u64,
    pub seconds_since_seen: u64,
}

/// 동시 접근 가능한 프레즌스 테이블
#[derive(Debug, Default)]
pub struct PeerTable {
    peers: DashMap<String, PeerRecord>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self {
            peers: DashMap::new(),
        }
    }

    /// 수신 기록 반영
    ///
    /// `text`가 None이면 (Disconnect) last_message는 유지하고
    /// 수신 시각/카운트만 갱신한다
    pub fn upsert(&self, peer_id: &str, text: Option<&str>, now: Instant) {
        match self.peers.get_mut(peer_id) {
            Some(mut record) => {
                if let Some(text) = text {
                    record.last_message = text.to_string();
                }
                record.message_count += 1;
                record.last_seen = now;
            }
            None => {
                self.peers.insert(
                    peer_id.to_string(),
                    PeerRecord {
                        peer_id: peer_id.to_string(),
                        last_message: text.unwrap_or_default().to_string(),
                        message_count: 1,
                        last_seen: now,
                    },
                );
            }
        }
    }

    /// 스냅샷 생성 (peer_id 오름차순)
    ///
    /// 항목 단위로는 일관적이지만 테이블 전체의 시점 일관성은 보장하지 않음
    pub fn snapshot(&self, now: Instant) -> Vec<DeviceSnapshot> {
        let mut devices: Vec<DeviceSnapshot> = self
            .peers
            .iter()
            .map(|entry| DeviceSnapshot {
                peer_id: entry.peer_id.clone(),
                last_message: entry.last_message.clone(),
                message_count: entry.message_count,
                seconds_since_seen: now.saturating_duration_since(entry.last_seen).as_secs(),
            })
            .collect();

        devices.sort_by(|a, b| a.peer_id.cmp(&b.peer_id));
        devices
    }

    /// 전체 비우기 (stop 시 1회)
    pub fn clear(&self) {
        self.peers.clear();
    }

    /// 등록된 피어 수
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_upsert_counts_and_last_message() {
        let table = PeerTable::new();
        let t0 = Instant::now();

        table.upsert("abc", Some("a"), t0);
        table.upsert("abc", Some("b"), t0 + Duration::from_secs(3));

        let snap = table.snapshot(t0 + Duration::from_secs(3));
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].peer_id, "abc");
        assert_eq!(snap[0].last_message, "b");
        assert_eq!(snap[0].message_count, 2);
        assert_eq!(snap[0].seconds_since_seen, 0);
    }

    #[test]
    fn test_disconnect_keeps_last_message() {
        let table = PeerTable::new();
        let t0 = Instant::now();

        table.upsert("abc", Some("hello"), t0);
        table.upsert("abc", None, t0 + Duration::from_secs(1));

        let snap = table.snapshot(t0 + Duration::from_secs(1));
        assert_eq!(snap[0].last_message, "hello");
        assert_eq!(snap[0].message_count, 2);
        // 레코드는 삭제되지 않는다
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_seconds_since_seen_monotonic() {
        let table = PeerTable::new();
        let t0 = Instant::now();
        table.upsert("abc", Some("x"), t0);

        let s1 = table.snapshot(t0 + Duration::from_secs(2))[0].seconds_since_seen;
        let s2 = table.snapshot(t0 + Duration::from_secs(7))[0].seconds_since_seen;

        assert_eq!(s1, 2);
        assert_eq!(s2, 7);
        assert!(s2 >= s1);
    }

    #[test]
    fn test_snapshot_ordering() {
        let table = PeerTable::new();
        let t0 = Instant::now();
        table.upsert("zzz", Some("1"), t0);
        table.upsert("aaa", Some("2"), t0);
        table.upsert("mmm", Some("3"), t0);

        let ids: Vec<String> = table
            .snapshot(t0)
            .into_iter()
            .map(|d| d.peer_id)
            .collect();
        assert_eq!(ids, vec!["aaa", "mmm", "zzz"]);
    }

    #[test]
    fn test_clear() {
        let table = PeerTable::new();
        table.upsert("abc", Some("x"), Instant::now());
        table.clear();
        assert!(table.is_empty());
        assert!(table.snapshot(Instant::now()).is_empty());
    }
}
