//! 세션 매니저
//!
//! 라이프사이클 상태 기계: Stopped -> start -> Running -> stop -> Stopped.
//! start/stop은 내부 뮤텍스로 직렬화되어 동시 호출에서도
//! Running 세션이 둘이 될 수 없다.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::broadcaster;
use crate::config::SessionConfig;
use crate::event::{self, EventReceiver, EventSender};
use crate::presence::{DeviceSnapshot, PeerTable};
use crate::receiver;
use crate::socket::MulticastSocket;
use crate::stats::SessionStats;
use crate::{Error, Result};

/// 두 루프와 커맨드 경로가 공유하는 Running 기간 상태
pub(crate) struct SharedState {
    /// 이 Running 기간의 인스턴스 ID
    pub instance_id: String,

    /// 현재 브로드캐스트 텍스트 (송신 시점에 읽힘)
    pub message: RwLock<String>,

    /// 성공한 송신 누계 (start마다 0부터)
    pub sent_count: AtomicU64,

    /// 협조적 취소 플래그
    pub stopping: AtomicBool,

    /// 브로드캐스트 주기 (밀리초)
    pub broadcast_interval_ms: u64,

    /// 세션 통계
    pub stats: RwLock<SessionStats>,
}

/// Running 기간 동안만 존재하는 핸들 묶음
struct ActiveSession {
    shared: Arc<SharedState>,
    broadcaster: JoinHandle<()>,
    receiver: JoinHandle<()>,
}

/// 멀티캐스트 프레즌스 세션
///
/// `new`로 이벤트 수신기와 함께 만들고 start/stop으로 구동한다.
/// 조회 계열은 어느 상태에서나 안전하며 Stopped에서는 빈 값을 돌려준다.
pub struct Session {
    /// start/stop 직렬화 + 활성 핸들 보관
    lifecycle: tokio::sync::Mutex<Option<ActiveSession>>,

    /// 동기 조회 경로용 현재 상태 슬롯
    shared: RwLock<Option<Arc<SharedState>>>,

    /// 프레즌스 테이블 (stop 시 비워짐)
    peers: Arc<PeerTable>,

    /// 외부 이벤트 송신 핸들
    events: EventSender,
}

impl Session {
    /// 새 세션과 이벤트 수신기 생성 (상태는 Stopped)
    pub fn new() -> (Self, EventReceiver) {
        let (events, event_rx) = event::channel();
        let session = Self {
            lifecycle: tokio::sync::Mutex::new(None),
            shared: RwLock::new(None),
            peers: Arc::new(PeerTable::new()),
            events,
        };
        (session, event_rx)
    }

    /// 세션 시작
    ///
    /// 성공 시 새 인스턴스 ID 반환. 이미 Running이면 부작용 없이
    /// AlreadyRunning. 설정/소켓 에러 시 상태는 Stopped 그대로.
    pub async fn start(&self, config: SessionConfig) -> Result<String> {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.is_some() {
            return Err(Error::AlreadyRunning);
        }

        let group_ip = config.validate()?;
        let group = SocketAddr::new(group_ip, config.port);

        let instance_id = Uuid::new_v4().to_string();
        self.peers.clear();

        // 조인 실패는 여기서 start 실패로 끝난다 (재시도 없음)
        let socket = Arc::new(MulticastSocket::open(group, &config.interface)?);

        let shared = Arc::new(SharedState {
            instance_id: instance_id.clone(),
            message: RwLock::new(config.message.clone()),
            sent_count: AtomicU64::new(0),
            stopping: AtomicBool::new(false),
            broadcast_interval_ms: config.broadcast_interval_ms,
            stats: RwLock::new(SessionStats::new()),
        });

        let receiver_task = tokio::spawn(receiver::run(
            socket.clone(),
            shared.clone(),
            self.peers.clone(),
            self.events.clone(),
        ));
        let broadcaster_task =
            tokio::spawn(broadcaster::run(socket, shared.clone(), self.events.clone()));

        *self.shared.write() = Some(shared.clone());
        *lifecycle = Some(ActiveSession {
            shared,
            broadcaster: broadcaster_task,
            receiver: receiver_task,
        });

        info!("세션 시작: group={}, instance={}", group, instance_id);
        self.events
            .status(format!("세션 시작: {} ({})", group, instance_id));

        Ok(instance_id)
    }

    /// 세션 정지
    ///
    /// 양쪽 루프의 종료(브로드캐스터의 마지막 Disconnect 송신 포함)를
    /// 기다린 뒤 소켓을 닫고 테이블을 비운다. Stopped면 NotRunning.
    pub async fn stop(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock().await;
        let Some(active) = lifecycle.take() else {
            return Err(Error::NotRunning);
        };

        active.shared.stopping.store(true, Ordering::SeqCst);

        // 두 루프가 소켓/테이블에서 손을 뗄 때까지 대기.
        // 마지막 Arc가 태스크 종료와 함께 떨어지며 소켓이 닫힌다.
        let _ = active.broadcaster.await;
        let _ = active.receiver.await;

        *self.shared.write() = None;
        self.peers.clear();

        info!("세션 정지: {}", active.shared.instance_id);
        self.events.status("세션 정지".to_string());

        Ok(())
    }

    /// 브로드캐스트 텍스트 교체 (Running일 때만, Stopped면 무시)
    ///
    /// 재시작 없이 다음 틱부터 반영된다
    pub fn update_message(&self, text: impl Into<String>) {
        if let Some(shared) = self.shared.read().as_ref() {
            let text = text.into();
            debug!("메시지 교체: {}", text);
            *shared.message.write() = text;
        }
    }

    /// Running 여부
    pub fn is_running(&self) -> bool {
        self.shared.read().is_some()
    }

    /// 현재 인스턴스 ID (Stopped면 None)
    pub fn instance_id(&self) -> Option<String> {
        self.shared.read().as_ref().map(|s| s.instance_id.clone())
    }

    /// 성공한 송신 수 (Stopped면 0)
    pub fn sent_count(&self) -> u64 {
        self.shared
            .read()
            .as_ref()
            .map(|s| s.sent_count.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// 활성 디바이스 스냅샷 (Stopped면 빈 목록)
    pub fn active_devices(&self) -> Vec<DeviceSnapshot> {
        self.peers.snapshot(Instant::now())
    }

    /// 세션 통계 복사 (Stopped면 기본값)
    pub fn stats(&self) -> SessionStats {
        self.shared
            .read()
            .as_ref()
            .map(|s| s.stats.read().clone())
            .unwrap_or_default()
    }
}
