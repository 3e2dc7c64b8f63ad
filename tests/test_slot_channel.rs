use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use trafficlight::channel::SlotChannel;
use trafficlight::error::ChannelError;
use trafficlight::phase::Phase;

#[tokio::test(start_paused = true)]
async fn last_write_wins() {
    let channel = SlotChannel::new();
    channel.send(Phase::Green);
    channel.send(Phase::Red);

    assert_eq!(channel.receive(Duration::from_secs(1)).await, Ok(Phase::Red));
    assert!(!channel.has_pending(), "receive must consume the value");
}

#[tokio::test(start_paused = true)]
async fn empty_channel_times_out_without_value() {
    let channel: SlotChannel<Phase> = SlotChannel::new();
    let started = Instant::now();

    let result = channel.receive(Duration::from_millis(250)).await;

    assert!(matches!(result, Err(ChannelError::TimedOut { .. })));
    assert!(started.elapsed() >= Duration::from_millis(250));
}

#[tokio::test(start_paused = true)]
async fn consumed_value_is_not_delivered_twice() {
    let channel = SlotChannel::new();
    channel.send(Phase::Green);

    let first = tokio_test::assert_ok!(channel.receive(Duration::from_secs(1)).await);
    assert_eq!(first, Phase::Green);
    tokio_test::assert_err!(channel.receive(Duration::from_secs(1)).await);
}

#[tokio::test(start_paused = true)]
async fn one_send_reaches_at_most_one_receiver() {
    let channel = Arc::new(SlotChannel::new());
    let receivers: Vec<_> = (0..2)
        .map(|_| {
            let channel = Arc::clone(&channel);
            tokio::spawn(async move { channel.receive(Duration::from_secs(2)).await })
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(100)).await;
    channel.send(Phase::Green);

    let mut delivered = 0;
    let mut timed_out = 0;
    for receiver in receivers {
        match receiver.await.unwrap() {
            Ok(phase) => {
                assert_eq!(phase, Phase::Green);
                delivered += 1;
            }
            Err(ChannelError::TimedOut { .. }) => timed_out += 1,
        }
    }
    assert_eq!((delivered, timed_out), (1, 1));
}

#[tokio::test(start_paused = true)]
async fn send_wakes_blocked_receiver_early() {
    let channel = Arc::new(SlotChannel::new());
    let receiver = {
        let channel = Arc::clone(&channel);
        tokio::spawn(async move {
            let started = Instant::now();
            let value = channel.receive(Duration::from_secs(10)).await;
            (value, started.elapsed())
        })
    };

    tokio::time::sleep(Duration::from_millis(300)).await;
    channel.send(Phase::Red);

    let (value, waited) = receiver.await.unwrap();
    assert_eq!(value, Ok(Phase::Red));
    assert!(waited < Duration::from_secs(10));
}

#[test]
fn works_from_plain_threads() {
    let channel = Arc::new(SlotChannel::new());
    let senders: Vec<_> = (0..4)
        .map(|i| {
            let channel = Arc::clone(&channel);
            std::thread::spawn(move || {
                for j in 0..100 {
                    channel.send(i * 100 + j);
                }
            })
        })
        .collect();
    for sender in senders {
        sender.join().unwrap();
    }

    // Only the last value from whichever sender finished last remains.
    let value = channel.try_receive().unwrap();
    assert_eq!(value % 100, 99);
    assert_eq!(channel.try_receive(), None);
}
