use proptest::prelude::*;
use std::time::Duration;
use tcpline::stream::LineOutcome;
use tcpline::{ByteStream, ConnectionConfig, LineStream, MemoryStream, ReadOutcome, TcpConnection};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Bytes sent by the peer are read back one at a time, in order
    #[test]
    fn socket_bytes_arrive_in_order(data in prop::collection::vec(any::<u8>(), 1..512)) {
        tokio_test::block_on(async {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let port = listener.local_addr().unwrap().port();
            let config = ConnectionConfig::default().with_read_timeout(Duration::from_millis(50));
            let mut connection = TcpConnection::with_config("127.0.0.1", port, config).unwrap();
            let (connect, accept) = tokio::join!(connection.connect(), listener.accept());
            connect.unwrap();
            let (mut peer, _) = accept.unwrap();

            peer.write_all(&data).await.unwrap();

            let mut received = Vec::with_capacity(data.len());
            while received.len() < data.len() {
                match connection.read().await {
                    Ok(ReadOutcome::Byte(byte)) => received.push(byte),
                    Ok(ReadOutcome::NoData) => continue,
                    other => return Err(TestCaseError::fail(format!("unexpected read {other:?}"))),
                }
            }
            prop_assert_eq!(received, data);
            Ok(())
        })?;
    }

    /// Put-back bytes come out last-in first-out, ahead of buffered input
    #[test]
    fn put_back_is_lifo(
        pushed in prop::collection::vec(any::<u8>(), 0..32),
        buffered in prop::collection::vec(any::<u8>(), 0..32),
    ) {
        tokio_test::block_on(async {
            let mut stream = MemoryStream::new();
            stream.feed(&buffered);
            stream.finish();
            for &byte in &pushed {
                stream.put_back(byte);
            }

            let mut seen = Vec::new();
            while let ReadOutcome::Byte(byte) = stream.read().await.unwrap() {
                seen.push(byte);
            }

            let mut expected: Vec<u8> = pushed.iter().rev().copied().collect();
            expected.extend_from_slice(&buffered);
            prop_assert_eq!(seen, expected);
            Ok(())
        })?;
    }

    /// Lines survive being delivered in arbitrary fragments
    #[test]
    fn lines_reassemble_across_fragments(
        lines in prop::collection::vec(
            prop::collection::vec(any::<u8>().prop_filter("terminator", |b| *b != b'\n'), 0..40),
            1..8,
        ),
        cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..6),
    ) {
        tokio_test::block_on(async {
            let mut wire = Vec::new();
            for line in &lines {
                wire.extend_from_slice(line);
                wire.push(b'\n');
            }
            let mut points: Vec<usize> = cuts.iter().map(|cut| cut.index(wire.len())).collect();
            points.push(wire.len());
            points.sort_unstable();

            let mut stream = MemoryStream::new();
            let mut received = Vec::new();
            let mut start = 0;
            for end in points {
                stream.feed(&wire[start..end]);
                start = end;
                while let LineOutcome::Line(line) = stream.read_line(b'\n').await.unwrap() {
                    received.push(line);
                }
            }

            prop_assert_eq!(received, lines);
            Ok(())
        })?;
    }
}
