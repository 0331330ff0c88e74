use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener};
use std::thread;
use std::time::{Duration, Instant};

use zlink_transport::{PlainTcpTransport, Transport};

fn connect_pair() -> (PlainTcpTransport, PlainTcpTransport) {
    let listener =
        TcpListener::bind(SocketAddr::from((IpAddr::V4(Ipv4Addr::LOCALHOST), 0))).unwrap();
    let addr = listener.local_addr().unwrap();

    let client_thread = thread::spawn(move || {
        let stream = std::net::TcpStream::connect(addr).unwrap();
        stream.set_nonblocking(true).unwrap();
        mio::net::TcpStream::from_std(stream)
    });

    let (server_std, peer_addr) = listener.accept().unwrap();
    server_std.set_nonblocking(true).unwrap();
    let server = PlainTcpTransport::new(mio::net::TcpStream::from_std(server_std), peer_addr).unwrap();

    let client_mio = client_thread.join().unwrap();
    let client = PlainTcpTransport::new(client_mio, addr).unwrap();

    (client, server)
}

fn read_until(transport: &mut PlainTcpTransport, want: usize, timeout: Duration) -> Vec<u8> {
    let mut out = Vec::new();
    let deadline = Instant::now() + timeout;
    let mut buf = [0u8; 256];
    while out.len() < want && Instant::now() < deadline {
        let n = transport.try_read(&mut buf).unwrap();
        out.extend_from_slice(&buf[..n]);
        if n == 0 {
            thread::sleep(Duration::from_millis(1));
        }
    }
    out
}

#[test]
fn writes_on_one_end_arrive_on_the_other() {
    let (mut client, mut server) = connect_pair();
    let written = client.try_write(b"hello transport").unwrap();
    assert_eq!(written, b"hello transport".len());

    let received = read_until(&mut server, written, Duration::from_secs(2));
    assert_eq!(received, b"hello transport");
}

#[test]
fn closing_one_end_is_observed_as_eof_by_the_other() {
    let (mut client, mut server) = connect_pair();
    client.close();

    let deadline = Instant::now() + Duration::from_secs(2);
    let mut buf = [0u8; 16];
    loop {
        let n = server.try_read(&mut buf).unwrap();
        if n == 0 && !server.is_open() {
            break;
        }
        assert!(Instant::now() < deadline, "peer close was never observed");
        thread::sleep(Duration::from_millis(1));
    }
}
