//! 루프백 멀티캐스트 E2E 테스트
//!
//! 그룹 조인이 가능한 네트워크가 필요하므로 기본 실행에서는 제외된다.
//! 실행: cargo test --test loopback -- --ignored

use std::time::Duration;

use mpp::{EngineEvent, Error, Session, SessionConfig};

fn test_config(port: u16, message: &str) -> SessionConfig {
    let mut config = SessionConfig::new("239.255.255.250", port, message);
    config.broadcast_interval_ms = 300;
    config
}

#[tokio::test]
#[ignore = "멀티캐스트 가능한 네트워크 필요"]
async fn test_double_start_fails() {
    let (session, _rx) = Session::new();

    let id = session.start(test_config(48881, "hi")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;
    let count_before = session.sent_count();
    assert!(count_before >= 1, "첫 틱이 sent_count를 올려야 함");

    // 두 번째 start는 부작용 없이 실패
    let err = session.start(test_config(48881, "other")).await.unwrap_err();
    assert!(matches!(err, Error::AlreadyRunning));
    assert_eq!(session.instance_id().unwrap(), id);
    assert!(session.sent_count() >= count_before);

    session.stop().await.unwrap();
}

#[tokio::test]
#[ignore = "멀티캐스트 가능한 네트워크 필요"]
async fn test_peer_discovery() {
    let (session_a, mut rx_a) = Session::new();
    let (session_b, _rx_b) = Session::new();

    let id_a = session_a.start(test_config(48882, "from-a")).await.unwrap();
    let id_b = session_b.start(test_config(48882, "from-b")).await.unwrap();

    // b의 브로드캐스트가 a에 도착할 때까지 대기
    let inbound = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match rx_a.recv().await {
                Some(EngineEvent::Message(m)) if m.sender_id == id_b => break m,
                Some(_) => continue,
                None => panic!("이벤트 채널 닫힘"),
            }
        }
    })
    .await
    .expect("b의 메시지를 기한 내 수신 못 함");
    assert_eq!(inbound.text, "from-b");

    let devices = session_a.active_devices();
    assert!(devices
        .iter()
        .any(|d| d.peer_id == id_b && d.message_count >= 1));

    // 자기 자신은 테이블에 없음
    assert!(!devices.iter().any(|d| d.peer_id == id_a));

    session_b.stop().await.unwrap();
    session_a.stop().await.unwrap();
    assert!(session_a.active_devices().is_empty());
}

#[tokio::test]
#[ignore = "멀티캐스트 가능한 네트워크 필요"]
async fn test_stop_start_resets_session() {
    let (session, _rx) = Session::new();

    let id1 = session.start(test_config(48883, "hi")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(session.sent_count() >= 1);

    session.stop().await.unwrap();
    assert!(!session.is_running());
    assert_eq!(session.sent_count(), 0);

    // 재시작: 새 인스턴스 ID, 카운터 0부터, 빈 스냅샷
    let id2 = session.start(test_config(48883, "hi")).await.unwrap();
    assert_ne!(id1, id2);
    assert!(session.active_devices().is_empty());

    session.stop().await.unwrap();
}

#[tokio::test]
#[ignore = "멀티캐스트 가능한 네트워크 필요"]
async fn test_update_message_observed_without_restart() {
    let (session_a, mut rx_a) = Session::new();
    let (session_b, _rx_b) = Session::new();

    session_a.start(test_config(48884, "listener")).await.unwrap();
    let id_b = session_b.start(test_config(48884, "before")).await.unwrap();

    session_b.update_message("after");

    // 다음 틱부터 교체된 텍스트가 나간다
    let seen = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match rx_a.recv().await {
                Some(EngineEvent::Message(m)) if m.sender_id == id_b && m.text == "after" => break,
                Some(_) => continue,
                None => panic!("이벤트 채널 닫힘"),
            }
        }
    })
    .await;
    assert!(seen.is_ok(), "교체된 메시지를 기한 내 수신 못 함");

    session_b.stop().await.unwrap();
    session_a.stop().await.unwrap();
}
