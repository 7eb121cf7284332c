//! 멀티캐스트 소켓 계층
//!
//! socket2로 소켓을 구성한 뒤 tokio UdpSocket으로 넘긴다.
//! 바인드 -> 그룹 조인 -> 송수신 순서를 지키며, 조인 실패는 open 실패.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use bytes::Bytes;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tokio::net::UdpSocket;
use tracing::debug;

use crate::config::InterfaceSelector;
use crate::{Error, Result};

/// 그룹에 조인된 송수신 겸용 멀티캐스트 소켓
#[derive(Debug)]
pub struct MulticastSocket {
    socket: UdpSocket,
    group: SocketAddr,
}

impl MulticastSocket {
    /// 소켓 생성, 바인드, 그룹 조인
    ///
    /// 같은 호스트의 다른 인스턴스도 서로 보이도록 멀티캐스트 루프백을 켠다.
    /// 루프백된 자기 패킷은 수신 루프의 sender_id 필터가 걸러냄.
    pub fn open(group: SocketAddr, interface: &InterfaceSelector) -> Result<Self> {
        if !group.ip().is_multicast() {
            return Err(Error::InvalidGroupAddress {
                addr: group.ip().to_string(),
            });
        }

        // 인터페이스 해석은 소켓 생성보다 먼저 (설정 에러를 소켓 에러보다 앞서 가려냄)
        let socket = match group.ip() {
            IpAddr::V4(group_v4) => {
                let iface = resolve_v4(interface)?;
                let socket = new_socket(Domain::IPV4)?;

                let bind_addr = SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), group.port());
                socket.bind(&SockAddr::from(bind_addr))?;

                socket.join_multicast_v4(&group_v4, &iface)?;
                socket.set_multicast_if_v4(&iface)?;
                socket.set_multicast_loop_v4(true)?;
                socket
            }
            IpAddr::V6(group_v6) => {
                let index = resolve_v6(interface)?;
                let socket = new_socket(Domain::IPV6)?;

                // v6 전용 플래그는 바인드 전에 설정해야 함
                socket.set_only_v6(true)?;
                let bind_addr = SocketAddr::new(Ipv6Addr::UNSPECIFIED.into(), group.port());
                socket.bind(&SockAddr::from(bind_addr))?;

                socket.join_multicast_v6(&group_v6, index)?;
                socket.set_multicast_if_v6(index)?;
                socket.set_multicast_loop_v6(true)?;
                socket
            }
        };

        let socket = UdpSocket::from_std(socket.into())?;
        debug!("멀티캐스트 소켓 준비: group={}", group);

        Ok(Self { socket, group })
    }

    /// 그룹으로 송신 (베스트 에포트)
    ///
    /// 실패해도 소켓은 닫히지 않고 호출측에 보고만 된다
    pub async fn send(&self, payload: &[u8]) -> Result<usize> {
        let sent = self.socket.send_to(payload, self.group).await?;
        Ok(sent)
    }

    /// 데이터그램 수신
    pub async fn recv(&self, buf: &mut [u8]) -> Result<(Bytes, SocketAddr)> {
        let (len, addr) = self.socket.recv_from(buf).await?;
        Ok((Bytes::copy_from_slice(&buf[..len]), addr))
    }

    /// 조인한 그룹 주소
    pub fn group(&self) -> SocketAddr {
        self.group
    }

    /// 로컬 바인드 주소
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

/// 재사용 가능한 논블로킹 UDP 소켓 생성
fn new_socket(domain: Domain) -> Result<Socket> {
    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    Ok(socket)
}

/// IPv4 송신 인터페이스 해석 (IP_MULTICAST_IF용 로컬 주소)
pub(crate) fn resolve_v4(selector: &InterfaceSelector) -> Result<Ipv4Addr> {
    match selector {
        InterfaceSelector::Auto => Ok(Ipv4Addr::UNSPECIFIED),
        InterfaceSelector::Named(name) => {
            let interfaces = if_addrs::get_if_addrs()?;
            interfaces
                .iter()
                .find_map(|iface| match &iface.addr {
                    if_addrs::IfAddr::V4(v4) if iface.name == *name => Some(v4.ip),
                    _ => None,
                })
                .ok_or_else(|| Error::InterfaceNotFound { name: name.clone() })
        }
    }
}

/// IPv6 송신 인터페이스 해석 (인터페이스 인덱스)
pub(crate) fn resolve_v6(selector: &InterfaceSelector) -> Result<u32> {
    match selector {
        InterfaceSelector::Auto => Ok(0),
        InterfaceSelector::Named(name) => {
            let interfaces = if_addrs::get_if_addrs()?;
            interfaces
                .iter()
                .find(|iface| iface.name == *name)
                .and_then(|iface| iface.index)
                .ok_or_else(|| Error::InterfaceNotFound { name: name.clone() })
        }
    }
}
