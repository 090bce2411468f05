use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener};

use tracing::debug;

/// Probe whether `port` can be bound on all IPv4 and IPv6 interfaces.
///
/// Each throwaway listener is dropped before the next bind and before
/// returning, so a port reported free here can be taken by another process
/// before the server binds it. Launch accepts that gap; the server reports
/// its own bind failure.
pub fn is_port_free(port: u16) -> bool {
    if let Err(e) = TcpListener::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))) {
        debug!("Port {} is occupied on IPv4: {}", port, e);
        return false;
    }

    match TcpListener::bind(SocketAddr::from((Ipv6Addr::UNSPECIFIED, port))) {
        Ok(_) => {
            debug!("Port {} is free", port);
            true
        }
        Err(e) if ipv6_unavailable(&e) => {
            debug!("IPv6 unavailable, port {} checked on IPv4 only: {}", port, e);
            true
        }
        Err(e) => {
            debug!("Port {} is occupied on IPv6: {}", port, e);
            false
        }
    }
}

fn ipv6_unavailable(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::AddrNotAvailable || err.kind() == io::ErrorKind::Unsupported {
        return true;
    }
    #[cfg(unix)]
    {
        if err.raw_os_error() == Some(libc::EAFNOSUPPORT) {
            return true;
        }
    }
    false
}
