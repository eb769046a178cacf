//! End-to-end anonymous broadcast with the duplication scheme: one member
//! sends, everyone (sender included) receives the message exactly.

use dcnet_core::{util, DuplicateSplitCombine, Network, NetworkConfig, Participant, SplitCombine};
use std::sync::{Arc, Mutex};
use std::time::Duration;

async fn run_broadcast(n: usize, message: &[u8]) {
    let config = NetworkConfig {
        k: 1,
        bytes_per_round: 32,
        round_delay: Duration::ZERO,
    };
    let mut network = Network::new(config).unwrap();
    let scheme: Arc<dyn SplitCombine> = Arc::new(DuplicateSplitCombine::new(n).unwrap());

    let mut members = Vec::with_capacity(n);
    let mut received = Vec::with_capacity(n);
    for i in 1..=n {
        let member = Arc::new(Participant::new(i, scheme.clone(), 32));
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let sink_buffer = buffer.clone();
        member.on_message_received(move |block| {
            sink_buffer
                .lock()
                .unwrap()
                .extend_from_slice(&util::strip_trailing_zeros(block));
        });
        assert!(network.add_participant(member.clone()).unwrap());
        members.push(member);
        received.push(buffer);
    }

    network.start().unwrap();
    members[0].enqueue(message);

    while members[0].pending_to_send() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    network.stop().await.unwrap();

    for buffer in &received {
        assert_eq!(buffer.lock().unwrap().as_slice(), message);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn broadcast_hello_three_members() {
    run_broadcast(3, b"Hello").await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn broadcast_four_members() {
    run_broadcast(4, b"Hello").await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn broadcast_five_members() {
    run_broadcast(5, b"Hello").await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn broadcast_ten_members() {
    run_broadcast(10, b"Hello").await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn broadcast_hundred_members() {
    run_broadcast(100, b"Hello").await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn broadcast_message_spanning_rounds() {
    // 100 bytes against a 32-byte round width forces four rounds, the last
    // one partially filled and zero-padded.
    let message: Vec<u8> = std::iter::repeat(b'x').take(100).collect();
    run_broadcast(3, &message).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn broadcast_with_round_delay() {
    let config = NetworkConfig {
        k: 1,
        bytes_per_round: 32,
        round_delay: Duration::from_millis(5),
    };
    let mut network = Network::new(config).unwrap();
    let scheme: Arc<dyn SplitCombine> = Arc::new(DuplicateSplitCombine::new(3).unwrap());

    let mut members = Vec::new();
    let received = Arc::new(Mutex::new(Vec::new()));
    for i in 1..=3 {
        let member = Arc::new(Participant::new(i, scheme.clone(), 32));
        if i == 2 {
            let buffer = received.clone();
            member.on_message_received(move |block| {
                buffer
                    .lock()
                    .unwrap()
                    .extend_from_slice(&util::strip_trailing_zeros(block));
            });
        }
        network.add_participant(member.clone()).unwrap();
        members.push(member);
    }

    network.start().unwrap();
    members[0].enqueue(b"delayed");
    while members[0].pending_to_send() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    network.stop().await.unwrap();

    assert_eq!(received.lock().unwrap().as_slice(), b"delayed");
}
