//! TCP 传输实现
//!
//! 守护进程默认监听 TCP 8888 端口。与原生客户端一致，连接后立即
//! 关闭 Nagle 算法（命令通道是小报文一问一答，延迟合并只会拖慢
//! 往返）。
//!
//! ## 限制
//!
//! - 地址解析使用系统解析器，可能阻塞（仅发生在连接阶段）
//! - 读超时归一化：`WouldBlock` 与 `TimedOut` 都映射为
//!   [`TransportError::Timeout`]

use crate::{Transport, TransportError};
use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, trace};

/// TCP 传输
///
/// # 示例
///
/// ```no_run
/// use pigpio_transport::{TcpTransport, Transport};
/// use std::time::Duration;
///
/// let mut t = TcpTransport::connect("127.0.0.1", 8888, Duration::from_secs(5)).unwrap();
/// t.send_all(&[0u8; 16]).unwrap();
/// ```
#[derive(Debug)]
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    /// 连接守护进程
    ///
    /// 依次尝试 `host:port` 解析出的所有地址，第一个在超时内建立
    /// 的连接胜出。
    ///
    /// # 错误
    /// - `BadAddress`: 地址无法解析
    /// - `Io`: 全部候选地址连接失败（返回最后一个错误）
    pub fn connect(
        host: &str,
        port: u16,
        connect_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let addrs: Vec<_> = (host, port)
            .to_socket_addrs()
            .map_err(|_| TransportError::BadAddress(format!("{host}:{port}")))?
            .collect();

        if addrs.is_empty() {
            return Err(TransportError::BadAddress(format!("{host}:{port}")));
        }

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, connect_timeout) {
                Ok(stream) => {
                    // 小报文一问一答，禁用 Nagle
                    stream.set_nodelay(true)?;
                    debug!("connected to pigpiod at {}", addr);
                    return Ok(Self { stream });
                },
                Err(e) => {
                    trace!("connect to {} failed: {}", addr, e);
                    last_err = Some(e);
                },
            }
        }

        Err(TransportError::Io(last_err.expect("no address candidates")))
    }

    /// 主动关闭两个方向，解除对端阻塞
    pub fn shutdown(&self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

impl Transport for TcpTransport {
    fn send_all(&mut self, buf: &[u8]) -> Result<(), TransportError> {
        self.stream.write_all(buf)?;
        Ok(())
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        match self.stream.read(buf) {
            Ok(0) => Err(TransportError::Closed),
            Ok(n) => Ok(n),
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                Err(TransportError::Timeout)
            },
            Err(e) => Err(TransportError::Io(e)),
        }
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), TransportError> {
        self.stream.set_read_timeout(timeout)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn test_connect_and_echo() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = std::thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4];
            sock.read_exact(&mut buf).unwrap();
            sock.write_all(&buf).unwrap();
        });

        let mut t = TcpTransport::connect("127.0.0.1", port, Duration::from_secs(1)).unwrap();
        t.send_all(&[1, 2, 3, 4]).unwrap();

        let mut buf = [0u8; 16];
        let n = t.recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], &[1, 2, 3, 4][..n]);

        server.join().unwrap();
    }

    #[test]
    fn test_recv_timeout_maps_to_timeout_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let mut t = TcpTransport::connect("127.0.0.1", port, Duration::from_secs(1)).unwrap();
        t.set_read_timeout(Some(Duration::from_millis(20))).unwrap();

        let mut buf = [0u8; 16];
        match t.recv(&mut buf) {
            Err(TransportError::Timeout) => {},
            other => panic!("expected timeout, got {other:?}"),
        }
        drop(listener);
    }

    #[test]
    fn test_recv_after_peer_close_is_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = std::thread::spawn(move || {
            let (sock, _) = listener.accept().unwrap();
            drop(sock);
        });

        let mut t = TcpTransport::connect("127.0.0.1", port, Duration::from_secs(1)).unwrap();
        server.join().unwrap();

        t.set_read_timeout(Some(Duration::from_millis(500))).unwrap();
        let mut buf = [0u8; 16];
        match t.recv(&mut buf) {
            Err(TransportError::Closed) => {},
            // 某些平台可能在关闭竞争下先报 Io 错误，同样视为链路失效
            Err(e) if e.is_fatal() => {},
            other => panic!("expected fatal error, got {other:?}"),
        }
    }

    #[test]
    fn test_connect_bad_address() {
        let err = TcpTransport::connect("definitely-not-a-host.invalid", 8888, Duration::from_millis(200));
        assert!(err.is_err());
    }
}
