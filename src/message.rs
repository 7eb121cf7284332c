//! 프로토콜 메시지 정의
//!
//! 공유 멀티캐스트 포트에는 외부 트래픽이 섞이므로
//! 매직 넘버 + CRC로 걸러낸 뒤에만 파싱한다

use serde::{Deserialize, Serialize};

use crate::{Error, Result, MAGIC_NUMBER, MAX_TEXT_SIZE, PROTOCOL_VERSION};

/// 메시지 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    /// 세션 시작 알림 (첫 브로드캐스트)
    Connect = 1,

    /// 주기 브로드캐스트 텍스트
    Text = 2,

    /// 세션 종료 알림
    Disconnect = 3,
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MessageType::Connect => "CONNECT",
            MessageType::Text => "TEXT",
            MessageType::Disconnect => "DISCONNECT",
        };
        write!(f, "{}", s)
    }
}

/// 메시지 헤더
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageHeader {
    /// 매직 넘버
    pub magic: u32,

    /// 프로토콜 버전
    pub version: u8,

    /// 메시지 타입
    pub msg_type: MessageType,

    /// 페이로드 길이 (헤더 제외)
    pub payload_len: u32,

    /// 페이로드 CRC32
    pub payload_crc: u32,
}

impl MessageHeader {
    pub fn new(msg_type: MessageType, payload: &[u8]) -> Self {
        Self {
            magic: MAGIC_NUMBER,
            version: PROTOCOL_VERSION,
            msg_type,
            payload_len: payload.len() as u32,
            payload_crc: crc32fast::hash(payload),
        }
    }
}

/// 페이로드 본문 (msg_type은 헤더에만 실림)
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireBody {
    sender_id: String,
    text: String,
    timestamp_us: u64,
}

/// 피어 간 교환되는 와이어 단위
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// 메시지 타입
    pub msg_type: MessageType,

    /// 발신 세션 인스턴스 ID
    pub sender_id: String,

    /// 텍스트 페이로드 (Connect/Text에서 의미 있음)
    pub text: String,

    /// 발신 시각 (microseconds since epoch)
    pub timestamp_us: u64,
}

impl Envelope {
    /// 새 봉투 생성 (발신 시각은 현재 시간)
    pub fn new(msg_type: MessageType, sender_id: impl Into<String>, text: impl Into<String>) -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        let timestamp_us = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0);

        Self {
            msg_type,
            sender_id: sender_id.into(),
            text: text.into(),
            timestamp_us,
        }
    }

    /// 바이트로 직렬화
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        if self.text.len() > MAX_TEXT_SIZE {
            return Err(Error::TextTooLong {
                len: self.text.len(),
                max: MAX_TEXT_SIZE,
            });
        }

        let body = WireBody {
            sender_id: self.sender_id.clone(),
            text: self.text.clone(),
            timestamp_us: self.timestamp_us,
        };
        let payload = bincode::serialize(&body)?;
        let header = MessageHeader::new(self.msg_type, &payload);
        let header_bytes = bincode::serialize(&header)?;

        let mut buf = Vec::with_capacity(header_bytes.len() + payload.len());
        buf.extend_from_slice(&header_bytes);
        buf.extend_from_slice(&payload);
        Ok(buf)
    }

    /// 바이트에서 역직렬화
    ///
    /// 외부 트래픽/손상 패킷은 None (파싱 노이즈는 호출측에서 카운트만 함)
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        // 헤더: magic(4) + version(1) + msg_type(4) + payload_len(4) + crc(4)
        if bytes.len() < 17 {
            return None;
        }

        // 헤더 파싱 시도 (bincode는 앞에서부터 읽음)
        let header: MessageHeader = bincode::deserialize(bytes).ok()?;

        if header.magic != MAGIC_NUMBER || header.version != PROTOCOL_VERSION {
            return None;
        }

        // 헤더 직렬화해서 실제 크기 확인
        let header_bytes = bincode::serialize(&header).ok()?;
        let header_size = header_bytes.len();

        let payload_end = header_size.checked_add(header.payload_len as usize)?;
        if bytes.len() < payload_end {
            return None;
        }

        let payload = &bytes[header_size..payload_end];
        if crc32fast::hash(payload) != header.payload_crc {
            return None;
        }

        let body: WireBody = bincode::deserialize(payload).ok()?;
        Some(Self {
            msg_type: header.msg_type,
            sender_id: body.sender_id,
            text: body.text,
            timestamp_us: body.timestamp_us,
        })
    }
}
