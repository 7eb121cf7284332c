//! MPP 데모 노드 - Multicast Presence Protocol
//!
//! 세션 하나를 띄우고 그룹의 피어를 관찰한다
//! - 주기 브로드캐스트 + 수신 이벤트 출력
//! - 5초마다 활성 디바이스 테이블 출력 (신선도 분류 포함)
//! - Ctrl-C로 정지 (Disconnect 송신 후 종료)
//!
//! 사용법:
//!   cargo run --release --bin mpp-node -- [OPTIONS]
//!
//! 예시:
//!   # 기본 그룹(239.255.255.250:8888)에 합류
//!   cargo run --release --bin mpp-node -- --message "hello lan"
//!
//!   # IPv6 그룹 + 인터페이스 지정
//!   cargo run --release --bin mpp-node -- -g ff08::1 -i eth0

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use mpp::{EngineEvent, Session, SessionConfig};

fn parse_args() -> SessionConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = SessionConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--group" | "-g" => {
                if i + 1 < args.len() {
                    config.group = args[i + 1].clone();
                    i += 1;
                }
            }
            "--port" | "-p" => {
                if i + 1 < args.len() {
                    config.port = args[i + 1].parse().expect("유효한 포트 필요");
                    i += 1;
                }
            }
            "--message" | "-m" => {
                if i + 1 < args.len() {
                    config.message = args[i + 1].clone();
                    i += 1;
                }
            }
            "--interface" | "-i" => {
                if i + 1 < args.len() {
                    config = config.with_interface(args[i + 1].clone());
                    i += 1;
                }
            }
            "--interval" => {
                if i + 1 < args.len() {
                    config.broadcast_interval_ms = args[i + 1].parse().expect("유효한 숫자 필요");
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                eprintln!("알 수 없는 옵션: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    config
}

fn print_help() {
    println!("MPP 데모 노드");
    println!();
    println!("옵션:");
    println!("  -g, --group <ADDR>      멀티캐스트 그룹 주소 (기본: 239.255.255.250)");
    println!("  -p, --port <PORT>       포트 (기본: 8888)");
    println!("  -m, --message <TEXT>    브로드캐스트 메시지");
    println!("  -i, --interface <NAME>  송신 인터페이스 이름 (기본: 자동)");
    println!("      --interval <MS>     브로드캐스트 주기 밀리초 (기본: 3000)");
    println!("  -h, --help              도움말");
}

/// 경과 초 기준 신선도 분류 (표시용)
fn freshness(seconds: u64) -> &'static str {
    match seconds {
        0..=1 => "fresh",
        2..=9 => "warning",
        _ => "stale",
    }
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("트레이싱 초기화 실패");

    let config = parse_args();

    let (session, mut event_rx) = Session::new();
    let session = Arc::new(session);

    let instance_id = match session.start(config).await {
        Ok(id) => id,
        Err(e) => {
            warn!("세션 시작 실패: {}", e);
            std::process::exit(1);
        }
    };
    info!("인스턴스 ID: {}", instance_id);

    // 이벤트 드레인
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                EngineEvent::Message(m) => {
                    info!("[{}] {} <{}> {}", m.timestamp, m.msg_type, m.sender_id, m.text);
                }
                EngineEvent::Status(s) => info!("상태: {}", s),
                EngineEvent::Error(e) => warn!("에러: {}", e),
                EngineEvent::Sent(n) => debug!("송신 카운트: {}", n),
            }
        }
    });

    // 디바이스 테이블 출력
    let session_poll = session.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(5)).await;
            if !session_poll.is_running() {
                break;
            }

            let devices = session_poll.active_devices();
            if devices.is_empty() {
                info!("활성 디바이스 없음");
                continue;
            }
            for d in devices {
                info!(
                    "디바이스 {} [{}]: {}건, {}초 전, 마지막: {}",
                    d.peer_id,
                    freshness(d.seconds_since_seen),
                    d.message_count,
                    d.seconds_since_seen,
                    d.last_message
                );
            }
        }
    });

    tokio::signal::ctrl_c().await.expect("시그널 대기 실패");
    info!("정지 요청 수신");

    let stats = session.stats();
    if let Err(e) = session.stop().await {
        warn!("정지 실패: {}", e);
    }
    info!("{}", stats.summary());
}
