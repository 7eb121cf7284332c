//! 브로드캐스터 루프
//!
//! - 고정 주기로 현재 메시지를 그룹에 송신
//! - 첫 틱은 Connect, 이후 Text
//! - 종료 시 Disconnect를 베스트 에포트로 송신

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::event::EventSender;
use crate::message::{Envelope, MessageType};
use crate::session::SharedState;
use crate::socket::MulticastSocket;
use crate::CANCEL_POLL_INTERVAL_MS;

/// 루프 본체. 정지 플래그가 설정될 때까지 주기 송신을 반복한다.
pub(crate) async fn run(
    socket: Arc<MulticastSocket>,
    shared: Arc<SharedState>,
    events: EventSender,
) {
    info!(
        "브로드캐스터 시작: group={}, 주기={}ms",
        socket.group(),
        shared.broadcast_interval_ms
    );

    let mut first_tick = true;

    while !shared.stopping.load(Ordering::SeqCst) {
        // 메시지 텍스트는 송신 시점에 읽는다 (update_message 즉시 반영)
        let text = shared.message.read().clone();
        let msg_type = if first_tick {
            MessageType::Connect
        } else {
            MessageType::Text
        };
        first_tick = false;

        let envelope = Envelope::new(msg_type, &shared.instance_id, text);
        match envelope.to_bytes() {
            Ok(data) => match socket.send(&data).await {
                Ok(bytes_sent) => {
                    let count = shared.sent_count.fetch_add(1, Ordering::SeqCst) + 1;
                    shared.stats.write().sent_envelopes += 1;
                    events.sent(count);
                    debug!(
                        "송신 {} bytes (type: {}, count: {})",
                        bytes_sent, envelope.msg_type, count
                    );
                }
                Err(e) => {
                    // 송신 실패는 보고만 하고 소켓은 유지
                    shared.stats.write().send_failures += 1;
                    events.error(format!("송신 실패: {}", e));
                    warn!("송신 실패: {}", e);
                }
            },
            Err(e) => {
                shared.stats.write().send_failures += 1;
                events.error(format!("봉투 직렬화 실패: {}", e));
                warn!("봉투 직렬화 실패: {}", e);
            }
        }

        // 주기 대기 (정지 플래그를 100ms 단위로 재확인)
        let polls = (shared.broadcast_interval_ms / CANCEL_POLL_INTERVAL_MS).max(1);
        for _ in 0..polls {
            if shared.stopping.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(CANCEL_POLL_INTERVAL_MS)).await;
        }
    }

    // 피어들이 즉시 인지하도록 종료 알림 (실패 무시)
    let bye = Envelope::new(
        MessageType::Disconnect,
        &shared.instance_id,
        shared.message.read().clone(),
    );
    if let Ok(data) = bye.to_bytes() {
        let _ = socket.send(&data).await;
    }

    info!("브로드캐스터 종료: {}", shared.instance_id);
}
