//! 세션 설정

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use crate::{Error, Result, DEFAULT_BROADCAST_INTERVAL_MS, DEFAULT_GROUP, DEFAULT_PORT};

/// 송신 인터페이스 선택 방식
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterfaceSelector {
    /// 플랫폼 기본 멀티캐스트 인터페이스 사용
    Auto,

    /// 이름으로 로컬 인터페이스 지정 (예: "eth0")
    /// 해석 실패 시 설정 에러
    Named(String),
}

/// MPP 세션 설정
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// 멀티캐스트 그룹 주소 (문자열)
    /// 콜론 포함 여부로 IPv4/IPv6 패밀리 결정
    pub group: String,

    /// 포트 (1 ~ 65535)
    pub port: u16,

    /// 브로드캐스트 메시지 텍스트 (실행 중 변경 가능)
    pub message: String,

    /// 송신 인터페이스 선택
    pub interface: InterfaceSelector,

    /// 브로드캐스트 주기 (밀리초)
    pub broadcast_interval_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            group: DEFAULT_GROUP.to_string(),
            port: DEFAULT_PORT,
            message: String::from("Hello from client"),
            interface: InterfaceSelector::Auto,
            broadcast_interval_ms: DEFAULT_BROADCAST_INTERVAL_MS,
        }
    }
}

impl SessionConfig {
    /// 새 설정 생성
    pub fn new(group: impl Into<String>, port: u16, message: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            port,
            message: message.into(),
            ..Self::default()
        }
    }

    /// 이름 지정 인터페이스 설정
    pub fn with_interface(mut self, name: impl Into<String>) -> Self {
        self.interface = InterfaceSelector::Named(name.into());
        self
    }

    /// IPv6 그룹 여부 (콜론 포함 = IPv6)
    pub fn is_ipv6(&self) -> bool {
        self.group.contains(':')
    }

    /// 그룹 주소 파싱
    ///
    /// 패밀리는 콜론 유무로 먼저 결정하고 해당 패밀리로만 파싱한다
    pub fn group_ip(&self) -> Result<IpAddr> {
        let ip: IpAddr = if self.is_ipv6() {
            self.group
                .parse::<Ipv6Addr>()
                .map_err(|_| Error::InvalidGroupAddress {
                    addr: self.group.clone(),
                })?
                .into()
        } else {
            self.group
                .parse::<Ipv4Addr>()
                .map_err(|_| Error::InvalidGroupAddress {
                    addr: self.group.clone(),
                })?
                .into()
        };
        Ok(ip)
    }

    /// 그룹 소켓 주소
    pub fn group_addr(&self) -> Result<SocketAddr> {
        Ok(SocketAddr::new(self.group_ip()?, self.port))
    }

    /// 설정 검증
    ///
    /// 통과 시 파싱된 그룹 주소 반환
    pub fn validate(&self) -> Result<IpAddr> {
        if self.port == 0 {
            return Err(Error::InvalidConfig {
                reason: "포트는 1 이상".to_string(),
            });
        }

        if let InterfaceSelector::Named(name) = &self.interface {
            if name.trim().is_empty() {
                return Err(Error::InvalidConfig {
                    reason: "인터페이스 이름이 비어 있음".to_string(),
                });
            }
        }

        let ip = self.group_ip()?;
        if !ip.is_multicast() {
            return Err(Error::InvalidGroupAddress {
                addr: self.group.clone(),
            });
        }

        Ok(ip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_selection() {
        let v4 = SessionConfig::new("239.255.255.250", 8888, "hi");
        assert!(!v4.is_ipv6());
        assert!(v4.validate().unwrap().is_ipv4());

        let v6 = SessionConfig::new("ff08::1", 8888, "hi");
        assert!(v6.is_ipv6());
        assert!(v6.validate().unwrap().is_ipv6());
    }

    #[test]
    fn test_invalid_port() {
        let config = SessionConfig::new("239.1.2.3", 0, "hi");
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_non_multicast_address() {
        let config = SessionConfig::new("192.168.0.1", 8888, "hi");
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidGroupAddress { .. })
        ));
    }

    #[test]
    fn test_unparseable_address() {
        // 콜론이 없으므로 IPv4로 파싱 시도, 실패
        let config = SessionConfig::new("not-an-address", 8888, "hi");
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidGroupAddress { .. })
        ));

        // 콜론이 있으므로 IPv6로 파싱 시도, IPv4 리터럴도 거부
        let config = SessionConfig::new("239.0.0.1:bad", 8888, "hi");
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidGroupAddress { .. })
        ));
    }

    #[test]
    fn test_empty_interface_name() {
        let config = SessionConfig::new("239.1.2.3", 8888, "hi").with_interface("  ");
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfig { .. })
        ));
    }
}
