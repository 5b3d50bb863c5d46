//! Network side of probing: TCP reachability, a single RTSP `DESCRIBE`, and a
//! short stream open through the media layer.

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::OnceLock;
use std::time::Duration;

use super::{DescribeResponse, ProbeTransport};
use crate::ingest::{redact_credentials, rtsp_factory, SourceFactory};

const MAX_RESPONSE_BYTES: usize = 4096;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(1200);
pub const DEFAULT_DESCRIBE_TIMEOUT: Duration = Duration::from_millis(2500);
pub const DEFAULT_WARM_UP: Duration = Duration::from_millis(220);

fn resolve(ip: &str, port: u16) -> Result<Vec<SocketAddr>> {
    let addrs: Vec<SocketAddr> = (ip, port)
        .to_socket_addrs()
        .with_context(|| format!("resolve {}:{}", ip, port))?
        .collect();
    if addrs.is_empty() {
        return Err(anyhow!("{}:{} resolved to no addresses", ip, port));
    }
    Ok(addrs)
}

/// True if a TCP connection to `ip:port` completes within `timeout`.
pub fn tcp_reachable(ip: &str, port: u16, timeout: Duration) -> bool {
    let Ok(addrs) = resolve(ip, port) else {
        return false;
    };
    addrs
        .iter()
        .any(|addr| TcpStream::connect_timeout(addr, timeout).is_ok())
}

/// Send `DESCRIBE rtsp://ip:port/` and parse the response head.
pub fn describe(ip: &str, port: u16, timeout: Duration) -> Result<DescribeResponse> {
    let addr = resolve(ip, port)?[0];
    let mut stream = TcpStream::connect_timeout(&addr, timeout)
        .with_context(|| format!("connect {}", addr))?;
    stream.set_read_timeout(Some(timeout))?;
    stream.set_write_timeout(Some(timeout))?;

    let request = format!(
        "DESCRIBE rtsp://{ip}:{port}/ RTSP/1.0\r\nCSeq: 1\r\nUser-Agent: camdash/{}\r\nAccept: application/sdp\r\n\r\n",
        env!("CARGO_PKG_VERSION")
    );
    stream.write_all(request.as_bytes())?;

    let mut buf = vec![0u8; MAX_RESPONSE_BYTES];
    let mut filled = 0;
    while filled < buf.len() {
        let n = match stream.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if filled > 0 => {
                log::debug!("describe {}: read stopped early: {}", addr, err);
                break;
            }
            Err(err) => return Err(err).with_context(|| format!("read from {}", addr)),
        };
        filled += n;
        if buf[..filled].windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }
    // Header bytes are ISO-8859-1.
    let raw: String = buf[..filled].iter().map(|&b| b as char).collect();
    Ok(parse_describe_response(&raw))
}

fn status_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^RTSP/\d+\.\d+\s+(\d{3})").expect("static regex"))
}

/// Parse an RTSP response head.
///
/// Header names are lowercased and values trimmed; parsing stops at the first
/// blank line and lines without a colon are skipped.
pub fn parse_describe_response(raw: &str) -> DescribeResponse {
    let mut lines = raw.split("\r\n");
    let status = lines
        .next()
        .and_then(|line| status_line_re().captures(line.trim()))
        .and_then(|caps| caps[1].parse::<u16>().ok());
    let mut headers = HashMap::new();
    for line in lines {
        if line.trim().is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_lowercase(), value.trim().to_string());
        }
    }
    DescribeResponse { status, headers }
}

/// `ProbeTransport` over real sockets and the configured media backend.
#[derive(Clone)]
pub struct NetTransport {
    pub connect_timeout: Duration,
    pub describe_timeout: Duration,
    pub warm_up: Duration,
    factory: SourceFactory,
}

impl NetTransport {
    pub fn new(factory: SourceFactory) -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            describe_timeout: DEFAULT_DESCRIBE_TIMEOUT,
            warm_up: DEFAULT_WARM_UP,
            factory,
        }
    }
}

impl Default for NetTransport {
    fn default() -> Self {
        Self::new(rtsp_factory())
    }
}

impl ProbeTransport for NetTransport {
    fn reachable(&self, ip: &str, port: u16) -> bool {
        tcp_reachable(ip, port, self.connect_timeout)
    }

    fn describe(&self, ip: &str, port: u16) -> Result<DescribeResponse> {
        describe(ip, port, self.describe_timeout)
    }

    fn quick_open(&self, url: &str) -> bool {
        let attempt = || -> Result<()> {
            let mut source = (self.factory)(url)?;
            source.connect()?;
            std::thread::sleep(self.warm_up);
            source.next_frame()?;
            Ok(())
        };
        match attempt() {
            Ok(()) => true,
            Err(err) => {
                log::debug!("quick open {} failed: {}", redact_credentials(url), err);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn parses_status_and_headers() {
        let raw = "RTSP/1.0 401 Unauthorized\r\nCSeq: 1\r\nWWW-Authenticate: Digest realm=\"IP Camera(C6496)\"\r\nServer:  Hikvision-Webs \r\n\r\nv=0\r\nx-after: body\r\n";
        let resp = parse_describe_response(raw);
        assert_eq!(resp.status, Some(401));
        assert_eq!(resp.headers.get("server").map(String::as_str), Some("Hikvision-Webs"));
        assert_eq!(resp.headers.get("cseq").map(String::as_str), Some("1"));
        assert!(resp.headers.contains_key("www-authenticate"));
        assert!(!resp.headers.contains_key("x-after"));
    }

    #[test]
    fn garbage_yields_no_status() {
        let resp = parse_describe_response("HTTP/1.1 200 OK\r\nServer: nginx\r\n\r\n");
        assert_eq!(resp.status, None);
        assert_eq!(resp.headers.get("server").map(String::as_str), Some("nginx"));

        let resp = parse_describe_response("");
        assert_eq!(resp.status, None);
        assert!(resp.headers.is_empty());
    }

    #[test]
    fn header_value_keeps_later_colons() {
        let resp = parse_describe_response("RTSP/1.0 200 OK\r\nContent-Base: rtsp://10.0.0.1:554/\r\nbroken line\r\n\r\n");
        assert_eq!(
            resp.headers.get("content-base").map(String::as_str),
            Some("rtsp://10.0.0.1:554/")
        );
        assert_eq!(resp.headers.len(), 1);
    }

    #[test]
    fn describe_against_local_listener() -> Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let server = std::thread::spawn(move || -> Result<String> {
            let (mut stream, _) = listener.accept()?;
            let mut received = Vec::new();
            let mut buf = [0u8; 1024];
            while !received.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);
            }
            stream.write_all(
                b"RTSP/1.0 200 OK\r\nCSeq: 1\r\nServer: Dahua Rtsp Server\r\n\r\n",
            )?;
            Ok(String::from_utf8_lossy(&received).to_string())
        });

        let resp = describe("127.0.0.1", port, Duration::from_secs(2))?;
        assert_eq!(resp.status, Some(200));
        assert_eq!(
            resp.headers.get("server").map(String::as_str),
            Some("Dahua Rtsp Server")
        );

        let request = server.join().map_err(|_| anyhow!("server panicked"))??;
        assert!(request.starts_with(&format!("DESCRIBE rtsp://127.0.0.1:{}/ RTSP/1.0\r\n", port)));
        assert!(request.contains("CSeq: 1\r\n"));
        assert!(request.contains("Accept: application/sdp\r\n"));
        Ok(())
    }

    #[test]
    fn reachability_follows_listener() -> Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        assert!(tcp_reachable("127.0.0.1", port, Duration::from_secs(1)));
        drop(listener);
        assert!(!tcp_reachable("127.0.0.1", port, Duration::from_millis(300)));
        Ok(())
    }
}
