//! End-to-end transfer tests driving the sender and receiver state machines
//! together over real loopback sockets, the way a host application would:
//! each role on its own thread, talking only through the wire protocol.

use std::fs;
use std::io::Write;
use std::time::{Duration, Instant};

use rand::Rng;

use mes_transport::log_sink::VecSink;
use mes_transport::record::{PacketFileHeader, PacketHeader};
use mes_transport::{receiver, sender, Protocol, ReceiverConfig, SenderConfig, StopHandle};

fn free_port() -> u16 {
    rand::rng().random_range(20000..60000)
}

fn temp_path(name: &str) -> std::path::PathBuf {
    let unique: u32 = rand::rng().random();
    std::env::temp_dir().join(format!("mes-transport-test-{unique}-{name}"))
}

/// Builds a well-formed `.mes` file: a file header declaring
/// `bodies.len()` records, followed by one `PacketHeader` + payload per
/// entry in `bodies`, each `(time_ms, payload)`.
fn build_mes_file(path: &std::path::Path, bodies: &[(u32, &[u8])]) {
    let header = PacketFileHeader {
        file_type: *b"MES1",
        stream_quan: 1,
        records_in_file: bodies.len() as u32,
        record_time: 0,
        record_name: [0u8; 64],
        last_change_time: 0,
        info: [0u8; 60],
    };

    let mut buf = Vec::new();
    header.write_to(&mut buf).unwrap();
    for (time, data) in bodies {
        let record_header = PacketHeader {
            time: *time,
            data_size: data.len() as u32,
            stream_num: 0,
            info: [0u8; 16],
        };
        record_header.write_to(&mut buf).unwrap();
        buf.extend_from_slice(data);
    }

    let mut file = fs::File::create(path).unwrap();
    file.write_all(&buf).unwrap();
}

fn run_transfer(protocol: Protocol, bodies: &[(u32, &[u8])]) -> (Vec<u8>, Vec<u8>, Instant) {
    let input_path = temp_path("input.mes");
    let output_path = temp_path("output.mes");
    build_mes_file(&input_path, bodies);

    let server_port = free_port();
    let (sender_endpoint, receiver_endpoint) = match protocol {
        Protocol::Tcp => (
            format!("127.0.0.1:{server_port}"),
            format!("127.0.0.1:0 127.0.0.1:{server_port}"),
        ),
        Protocol::Udp => {
            let client_port = free_port();
            (
                format!("127.0.0.1:{server_port}"),
                format!("127.0.0.1:{client_port} 127.0.0.1:{server_port}"),
            )
        }
    };

    let sender_sink = VecSink::new();
    let sender_config = SenderConfig::new(protocol, sender_endpoint, input_path.clone())
        .with_sink(std::sync::Arc::new(sender_sink));
    let sender_stop = StopHandle::new();

    let receiver_sink = VecSink::new();
    let receiver_config = ReceiverConfig::new(protocol, receiver_endpoint, output_path.clone())
        .with_sink(std::sync::Arc::new(receiver_sink));
    let receiver_stop = StopHandle::new();

    let sender_thread = std::thread::spawn(move || sender::run(&sender_config, &sender_stop));

    // Give the sender a moment to bind before the receiver tries to
    // connect/handshake; both sides also retry on their own idle loop, so
    // this is an optimization, not a correctness requirement.
    std::thread::sleep(Duration::from_millis(50));

    let start = Instant::now();
    receiver::run(&receiver_config, &receiver_stop).expect("receiver failed");
    sender_thread
        .join()
        .expect("sender thread panicked")
        .expect("sender failed");

    let input = fs::read(&input_path).unwrap();
    let output = fs::read(&output_path).unwrap();
    let _ = fs::remove_file(&input_path);
    let _ = fs::remove_file(&output_path);

    (input, output, start)
}

#[test_log::test]
fn tcp_transfer_reproduces_the_input_file_byte_for_byte() {
    let bodies: Vec<(u32, &[u8])> = vec![(0, b"aaaa"), (50, b"bb"), (120, b"cccccc")];
    let (input, output, _start) = run_transfer(Protocol::Tcp, &bodies);
    assert_eq!(input, output);
}

#[test_log::test]
fn udp_transfer_reproduces_the_input_file_after_handshake() {
    let bodies: Vec<(u32, &[u8])> = vec![(0, b"hello"), (30, b"world")];
    let (input, output, _start) = run_transfer(Protocol::Udp, &bodies);
    assert_eq!(input, output);
}

#[test_log::test]
fn pacing_never_delivers_records_faster_than_their_recorded_delta() {
    // Deltas of 60ms and 80ms; the receiver's total wall-clock time from
    // connect to completion must be at least the sum of the per-record
    // pacing floors (each delta, since both exceed the 10ms minimum).
    let bodies: Vec<(u32, &[u8])> = vec![(0, b"a"), (60, b"b"), (140, b"c")];
    let (input, output, start) = run_transfer(Protocol::Tcp, &bodies);
    assert_eq!(input, output);

    let elapsed = start.elapsed();
    assert!(
        elapsed >= Duration::from_millis(60 + 80),
        "transfer completed in {elapsed:?}, faster than the recorded pacing allows"
    );
}

#[test_log::test]
fn stop_before_connect_returns_promptly() {
    // An endpoint nothing is listening on: Setup succeeds (binding a local
    // port never needs a peer), but Connect spins forever waiting for a
    // peer that never arrives.
    let port = free_port();
    let config = ReceiverConfig::new(
        Protocol::Tcp,
        format!("127.0.0.1:0 127.0.0.1:{port}"),
        temp_path("never-written.mes"),
    );
    let stop = StopHandle::new();
    let stop_clone = stop.clone();

    let thread = std::thread::spawn(move || receiver::run(&config, &stop));

    std::thread::sleep(Duration::from_millis(200));
    stop_clone.stop();

    let start = Instant::now();
    thread
        .join()
        .expect("receiver thread panicked")
        .expect("receiver returned an error instead of stopping cleanly");
    assert!(
        start.elapsed() < Duration::from_secs(3),
        "work() did not return promptly after stop()"
    );
}
