#[cfg(test)]
mod tests {
    use crate::stream::{ByteStream, LineOutcome, LineStream, ReadOutcome};
    use crate::tcp::connection::{connect_first, open_socket};
    use crate::tcp::{ConnectionConfig, ConnectionState, TcpConnection};
    use crate::StreamError;
    use std::io::{self, ErrorKind};
    use std::net::SocketAddr;
    use std::time::{Duration, Instant};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn fast_config() -> ConnectionConfig {
        ConnectionConfig::default()
            .with_read_timeout(Duration::from_millis(100))
            .with_write_timeout(Duration::from_millis(500))
    }

    /// Connects a fresh TcpConnection to a local listener and returns both ends
    async fn connected_pair() -> (TcpConnection, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let mut connection = TcpConnection::with_config("127.0.0.1", port, fast_config()).unwrap();
        let (connect, accept) = tokio::join!(connection.connect(), listener.accept());
        connect.unwrap();
        let (peer, _) = accept.unwrap();
        (connection, peer)
    }

    #[test]
    fn test_rejects_privileged_port() {
        let err = TcpConnection::new("127.0.0.1", 80).unwrap_err();
        assert!(matches!(err, StreamError::Configuration(_)));
        assert!(TcpConnection::new("127.0.0.1", 1024).is_ok());
    }

    #[test]
    fn test_disconnect_never_connected_is_noop() {
        let mut connection = TcpConnection::new("127.0.0.1", 5555).unwrap();
        connection.disconnect();
        connection.disconnect();
        assert_eq!(connection.state(), ConnectionState::Disconnected);
        assert!(!connection.is_connected());
    }

    #[tokio::test]
    async fn test_io_before_connect_is_configuration_error() {
        let mut connection = TcpConnection::new("127.0.0.1", 5555).unwrap();
        assert!(matches!(
            connection.read().await,
            Err(StreamError::Configuration(_))
        ));
        assert!(matches!(
            connection.write(b"x").await,
            Err(StreamError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_writes_arrive_in_order() {
        let (mut connection, mut peer) = connected_pair().await;

        let chunks: [&[u8]; 3] = [b"first ", b"second ", b"third"];
        let mut expected = Vec::new();
        for chunk in chunks {
            assert_eq!(connection.write(chunk).await.unwrap(), chunk.len());
            expected.extend_from_slice(chunk);
        }

        let mut received = vec![0; expected.len()];
        peer.read_exact(&mut received).await.unwrap();
        assert_eq!(received, expected);
    }

    #[tokio::test]
    async fn test_reads_bytes_including_zero() {
        let (mut connection, mut peer) = connected_pair().await;
        peer.write_all(&[b'a', 0, b'b']).await.unwrap();

        assert_eq!(connection.read().await.unwrap(), ReadOutcome::Byte(b'a'));
        assert_eq!(connection.read().await.unwrap(), ReadOutcome::Byte(0));
        assert_eq!(connection.read().await.unwrap(), ReadOutcome::Byte(b'b'));
    }

    #[tokio::test]
    async fn test_put_back_is_read_first() {
        let (mut connection, mut peer) = connected_pair().await;
        peer.write_all(b"xyz").await.unwrap();

        assert_eq!(connection.read().await.unwrap(), ReadOutcome::Byte(b'x'));
        connection.put_back(b'1');
        connection.put_back(b'2');

        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(connection.read().await.unwrap().byte().unwrap());
        }
        assert_eq!(seen, b"21yz");
    }

    #[tokio::test]
    async fn test_silent_peer_yields_no_data() {
        let (mut connection, _peer) = connected_pair().await;
        assert_eq!(connection.read().await.unwrap(), ReadOutcome::NoData);
        assert_eq!(connection.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_peer_close_is_reported_once() {
        let (mut connection, peer) = connected_pair().await;
        drop(peer);

        let err = loop {
            match connection.read().await {
                Ok(ReadOutcome::NoData) => continue,
                Ok(other) => panic!("unexpected outcome {other:?}"),
                Err(e) => break e,
            }
        };
        assert!(matches!(err, StreamError::ConnectionClosed(_)));
        assert_eq!(connection.state(), ConnectionState::Closed);
        assert!(!connection.is_connected());
        assert_eq!(connection.read().await.unwrap(), ReadOutcome::EndOfStream);
    }

    #[tokio::test]
    async fn test_connect_while_connected_keeps_connection() {
        let (mut connection, mut peer) = connected_pair().await;

        let err = connection.connect().await.unwrap_err();
        assert!(matches!(err, StreamError::Configuration(_)));
        let err = connection.connect_to("127.0.0.1", 6000).await.unwrap_err();
        assert!(matches!(err, StreamError::Configuration(_)));

        connection.write_line(b"still here", b'\n').await.unwrap();
        let mut received = vec![0; 11];
        peer.read_exact(&mut received).await.unwrap();
        assert_eq!(received, b"still here\n");
    }

    #[tokio::test]
    async fn test_reconfigure_while_connected_fails() {
        let (mut connection, _peer) = connected_pair().await;
        assert!(connection.set_port(6000).is_err());
        assert!(connection.set_host("localhost").is_err());
        assert!(connection.set_read_timeout(Duration::from_secs(1)).is_err());
        assert!(connection.set_write_timeout(Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn test_disconnect_is_terminal() {
        let (mut connection, _peer) = connected_pair().await;
        connection.disconnect();
        connection.disconnect();
        assert_eq!(connection.state(), ConnectionState::Closed);

        let err = connection.connect().await.unwrap_err();
        assert!(matches!(err, StreamError::Configuration(_)));
        assert!(matches!(connection.open().await, Err(StreamError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut connection = TcpConnection::new("127.0.0.1", port).unwrap();
        let err = connection.connect().await.unwrap_err();
        assert!(matches!(err, StreamError::Connect { .. }));
        assert_eq!(connection.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_read_line_from_socket() {
        let (mut connection, mut peer) = connected_pair().await;
        peer.write_all(b"hel").await.unwrap();
        assert_eq!(connection.read_line(b'\n').await.unwrap(), LineOutcome::NoData);

        peer.write_all(b"lo\n").await.unwrap();
        let line = loop {
            match connection.read_line(b'\n').await.unwrap() {
                LineOutcome::Line(line) => break line,
                LineOutcome::NoData => continue,
                LineOutcome::EndOfStream => panic!("stream ended early"),
            }
        };
        assert_eq!(line, b"hello");
    }

    #[tokio::test]
    async fn test_port_name() {
        let connection = TcpConnection::new("example.org", 5555).unwrap();
        assert_eq!(connection.port_name(), "[example.org:5555]");
        assert!(!connection.is_open());
    }

    #[tokio::test]
    async fn test_connection_reports_peer_and_config() {
        let connection = TcpConnection::with_config("127.0.0.1", 5555, fast_config()).unwrap();
        assert_eq!(connection.peer_addr(), None);

        let (connection, peer) = connected_pair().await;
        assert_eq!(connection.peer_addr(), Some(peer.local_addr().unwrap()));
        assert_eq!(connection.config().read_timeout, Duration::from_millis(100));
        assert_eq!(connection.config().write_timeout, Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_write_returns_short_count_when_budget_runs_out() {
        let (mut connection, _peer) = connected_pair().await;

        // The peer never reads, so the socket buffers fill long before this drains
        let payload = vec![0u8; 64 * 1024 * 1024];
        let started = Instant::now();
        let sent = connection.write(&payload).await.unwrap();

        assert!(sent < payload.len(), "sent all {sent} bytes");
        assert!(started.elapsed() < Duration::from_secs(3), "write took {:?}", started.elapsed());
        assert!(connection.is_connected());
    }

    #[tokio::test]
    async fn test_connect_skips_address_whose_socket_cannot_open() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let addrs: [SocketAddr; 2] = [
            format!("[::1]:{port}").parse().unwrap(),
            format!("127.0.0.1:{port}").parse().unwrap(),
        ];

        let open = |addr: SocketAddr| {
            if addr.is_ipv6() {
                Err(StreamError::SocketCreation(io::Error::new(
                    ErrorKind::Unsupported,
                    "IPv6 unavailable",
                )))
            } else {
                open_socket(addr)
            }
        };
        let (connected, accepted) = tokio::join!(
            connect_first("localhost", port, &addrs, open),
            listener.accept()
        );

        let stream = connected.unwrap();
        assert_eq!(stream.peer_addr().unwrap(), addrs[1]);
        accepted.unwrap();
    }

    #[tokio::test]
    async fn test_connect_reports_last_error_when_every_address_fails() {
        let addrs: [SocketAddr; 2] = ["127.0.0.1:5555".parse().unwrap(), "[::1]:5555".parse().unwrap()];
        let open = |_: SocketAddr| {
            Err(StreamError::SocketCreation(io::Error::new(
                ErrorKind::Unsupported,
                "no sockets",
            )))
        };

        let err = connect_first("localhost", 5555, &addrs, open).await.unwrap_err();
        assert!(matches!(err, StreamError::SocketCreation(_)));

        let err = connect_first("localhost", 5555, &[], open_socket).await.unwrap_err();
        assert!(matches!(err, StreamError::Connect { .. }));
    }
}
