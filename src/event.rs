//! 외부 이벤트 채널
//!
//! 세션이 쓰고 표시 계층이 비우는 단방향 채널.
//! 전송은 논블로킹 fire-and-forget: 소비가 느려 채널이 가득 차면
//! 이벤트를 버린다 (백프레셔 정책은 표시 계층 몫)

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::trace;

use crate::message::{Envelope, MessageType};

/// 이벤트 채널 용량
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// 수신된 비자기 봉투 1건당 1회 발생하는 인바운드 메시지
#[derive(Debug, Clone, Serialize)]
pub struct InboundMessage {
    pub msg_type: MessageType,
    pub sender_id: String,
    pub text: String,

    /// 수신 시각 (로컬, HH:MM:SS)
    pub timestamp: String,
}

impl InboundMessage {
    pub fn from_envelope(envelope: &Envelope) -> Self {
        Self {
            msg_type: envelope.msg_type,
            sender_id: envelope.sender_id.clone(),
            text: envelope.text.clone(),
            timestamp: chrono::Local::now().format("%H:%M:%S").to_string(),
        }
    }
}

/// 표시 계층으로 나가는 이벤트
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// 인바운드 메시지 (자기 수신 제외)
    Message(InboundMessage),

    /// 라이프사이클 상태 알림 (자유 텍스트)
    Status(String),

    /// 복구 가능/치명 오류 알림 (자유 텍스트)
    Error(String),

    /// 누적 송신 카운터 (성공한 송신마다)
    Sent(u64),
}

/// 이벤트 수신기 타입
pub type EventReceiver = mpsc::Receiver<EngineEvent>;

/// 이벤트 송신 핸들 (루프/세션 공용)
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<EngineEvent>,
}

impl EventSender {
    fn emit(&self, event: EngineEvent) {
        if self.tx.try_send(event).is_err() {
            trace!("이벤트 채널 가득 참, 이벤트 버림");
        }
    }

    pub fn message(&self, message: InboundMessage) {
        self.emit(EngineEvent::Message(message));
    }

    pub fn status(&self, text: impl Into<String>) {
        self.emit(EngineEvent::Status(text.into()));
    }

    pub fn error(&self, text: impl Into<String>) {
        self.emit(EngineEvent::Error(text.into()));
    }

    pub fn sent(&self, count: u64) {
        self.emit(EngineEvent::Sent(count));
    }
}

/// 이벤트 채널 생성
pub fn channel() -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    (EventSender { tx }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fire_and_forget() {
        let (tx, mut rx) = channel();

        tx.status("시작");
        tx.sent(1);

        assert!(matches!(rx.recv().await, Some(EngineEvent::Status(_))));
        assert!(matches!(rx.recv().await, Some(EngineEvent::Sent(1))));
    }

    #[tokio::test]
    async fn test_full_channel_never_blocks() {
        let (tx, mut rx) = channel();

        // 용량 초과분은 조용히 버려진다
        for i in 0..(EVENT_CHANNEL_CAPACITY + 10) {
            tx.sent(i as u64);
        }

        let mut drained = 0;
        while rx.try_recv().is_ok() {
            drained += 1;
        }
        assert_eq!(drained, EVENT_CHANNEL_CAPACITY);
    }
}
