//! 에러 타입 정의

use thiserror::Error;

/// MPP 엔진 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO 에러: {0}")]
    Io(#[from] std::io::Error),

    #[error("직렬화 에러: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("이미 실행 중")]
    AlreadyRunning,

    #[error("실행 중 아님")]
    NotRunning,

    #[error("유효하지 않은 설정: {reason}")]
    InvalidConfig { reason: String },

    #[error("인터페이스 없음: {name}")]
    InterfaceNotFound { name: String },

    #[error("유효하지 않은 그룹 주소: {addr}")]
    InvalidGroupAddress { addr: String },

    #[error("메시지 텍스트 초과: {len} bytes (max {max})")]
    TextTooLong { len: usize, max: usize },
}

impl Error {
    /// start 시점에 상태 변경 없이 반환되는 설정 계열 에러 여부
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidConfig { .. }
                | Error::InterfaceNotFound { .. }
                | Error::InvalidGroupAddress { .. }
        )
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, Error>;
