//! TCP loopback transport with router/dealer roles.
//!
//! Every control message travels as a multipart frame sequence inside a
//! length-delimited TCP frame. A connecting peer opens with an identity
//! handshake; the router side keys all routing on that identity, so the
//! per-message identity frames of classic router sockets are not needed.

mod client;
mod dealer;
mod error;
mod multipart;
mod router;

pub use client::RequestClient;
pub use dealer::MessageDealer;
pub use error::{RequestError, TransportError};
pub use multipart::MultipartCodec;
pub use router::MessageRouter;

/// Format a loopback service address the way peers discover it.
pub fn loopback_address(port: u16) -> String {
    format!("tcp://127.0.0.1:{port}")
}

/// Strip the `tcp://` scheme from a service address.
pub(crate) fn socket_address(address: &str) -> Result<&str, TransportError> {
    address
        .strip_prefix("tcp://")
        .ok_or_else(|| TransportError::InvalidAddress(address.to_owned()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_loopback_address_format() {
        assert_eq!(loopback_address(4567), "tcp://127.0.0.1:4567");
    }

    #[test]
    fn test_socket_address_strips_scheme() {
        assert_eq!(socket_address("tcp://127.0.0.1:80").unwrap(), "127.0.0.1:80");
        assert!(socket_address("udp://127.0.0.1:80").is_err());
    }
}
