//! 세션 통계
//!
//! Running 기간 단위 카운터. stop 후 다음 start에서 새로 생성된다.

use std::time::{Duration, Instant};

/// Running 기간 동안의 송수신 통계
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// 세션 시작 시각
    pub start_time: Instant,

    /// 성공한 송신 수
    pub sent_envelopes: u64,

    /// 수락된 비자기 봉투 수
    pub received_envelopes: u64,

    /// 자기 수신으로 걸러진 봉투 수
    pub self_envelopes: u64,

    /// 파싱 실패로 버린 데이터그램 수 (사용자에게 노출 안 됨)
    pub dropped_datagrams: u64,

    /// 송신 실패 수
    pub send_failures: u64,
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            sent_envelopes: 0,
            received_envelopes: 0,
            self_envelopes: 0,
            dropped_datagrams: 0,
            send_failures: 0,
        }
    }

    /// 경과 시간
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// 통계 요약 문자열
    pub fn summary(&self) -> String {
        format!(
            "Elapsed: {:.1}s | Sent: {} (fail {}) | Received: {} | Self: {} | Dropped: {}",
            self.elapsed().as_secs_f64(),
            self.sent_envelopes,
            self.send_failures,
            self.received_envelopes,
            self.self_envelopes,
            self.dropped_datagrams,
        )
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_format() {
        let mut stats = SessionStats::new();
        stats.sent_envelopes = 3;
        stats.received_envelopes = 5;
        stats.dropped_datagrams = 1;

        let summary = stats.summary();
        assert!(summary.contains("Sent: 3"));
        assert!(summary.contains("Received: 5"));
        assert!(summary.contains("Dropped: 1"));
    }
}
