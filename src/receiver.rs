//! 수신 루프
//!
//! - 바운드 타임아웃 수신으로 정지 플래그를 주기적으로 재확인
//! - 파싱 실패는 조용히 버림 (공유 그룹의 노이즈는 정상 상황)
//! - 자기 봉투는 테이블/이벤트 모두 제외
//! - 치명 소켓 에러는 이 루프만 종료시키고 세션 상태는 건드리지 않음

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;
use tracing::{debug, error, info, trace};

use crate::event::{EventSender, InboundMessage};
use crate::message::{Envelope, MessageType};
use crate::presence::PeerTable;
use crate::session::SharedState;
use crate::socket::MulticastSocket;
use crate::{RECV_BUFFER_SIZE, RECV_TIMEOUT_MS};

/// 루프 본체. 정지 플래그 또는 치명 소켓 에러로만 종료된다.
pub(crate) async fn run(
    socket: Arc<MulticastSocket>,
    shared: Arc<SharedState>,
    peers: Arc<PeerTable>,
    events: EventSender,
) {
    info!("수신 루프 시작: group={}", socket.group());

    let mut buf = vec![0u8; RECV_BUFFER_SIZE];

    while !shared.stopping.load(Ordering::SeqCst) {
        match timeout(Duration::from_millis(RECV_TIMEOUT_MS), socket.recv(&mut buf)).await {
            Ok(Ok((data, _addr))) => {
                let Some(envelope) = Envelope::from_bytes(&data) else {
                    shared.stats.write().dropped_datagrams += 1;
                    trace!("파싱 불가 데이터그램 버림: {} bytes", data.len());
                    continue;
                };

                // 루프백된 자기 봉투: 테이블 반영도 이벤트도 없음
                if envelope.sender_id == shared.instance_id {
                    shared.stats.write().self_envelopes += 1;
                    continue;
                }

                // Disconnect는 수신 시각/카운트만 갱신 (레코드 삭제 없음)
                let text = match envelope.msg_type {
                    MessageType::Disconnect => None,
                    _ => Some(envelope.text.as_str()),
                };
                peers.upsert(&envelope.sender_id, text, Instant::now());
                shared.stats.write().received_envelopes += 1;

                debug!(
                    "수신 (type: {}, from: {}): {}",
                    envelope.msg_type, envelope.sender_id, envelope.text
                );
                events.message(InboundMessage::from_envelope(&envelope));
            }
            Ok(Err(e)) => {
                // 소켓이 닫히는 등 치명 에러: 이 루프만 내려가고
                // 세션은 명시적 stop까지 Running 유지
                events.error(format!("수신 에러: {}", e));
                error!("수신 에러, 수신 루프 종료: {}", e);
                break;
            }
            Err(_) => {
                // 타임아웃: 정지 플래그 재확인 후 계속
            }
        }
    }

    info!("수신 루프 종료: {}", shared.instance_id);
}
