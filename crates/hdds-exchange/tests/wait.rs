// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wait integration tests
//!
//! Data waits, acknowledgment waits, the single-flight guard, the infinite
//! timeout sentinel and cancellation on close.

use hdds_exchange::wait::timeout_from_millis;
use hdds_exchange::{Domain, EndpointConfig, Error, Participant, Reliability};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn participant() -> Participant {
    Participant::new(&Domain::standalone(0), "wait").expect("Failed to create participant")
}

#[test]
fn test_reader_wait_times_out_without_data() {
    let p = participant();
    let reader = p
        .create_reader_with(None, &EndpointConfig::new("T"))
        .expect("reader");

    let started = Instant::now();
    let err = reader
        .wait(timeout_from_millis(30))
        .expect_err("must time out");
    assert!(matches!(err, Error::Timeout));
    assert!(err.is_recoverable());
    assert!(started.elapsed() >= Duration::from_millis(25));
}

#[test]
fn test_reader_wait_resolves_on_write_from_other_thread() {
    let p = participant();
    let reader = p
        .create_reader_with(None, &EndpointConfig::new("T"))
        .expect("reader");
    let writer = p
        .create_writer_with(None, &EndpointConfig::new("T"))
        .expect("writer");

    let publisher = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        writer.write().expect("write");
        writer
    });

    reader.wait(timeout_from_millis(-1)).expect("infinite wait resolves");
    let _writer = publisher.join().expect("join");
}

#[test]
fn test_second_concurrent_wait_fails_immediately() {
    let p = participant();
    let reader = Arc::new(
        p.create_reader_with(None, &EndpointConfig::new("T"))
            .expect("reader"),
    );

    let blocked = {
        let reader = Arc::clone(&reader);
        thread::spawn(move || reader.wait(Some(Duration::from_millis(500))))
    };
    thread::sleep(Duration::from_millis(50));

    let started = Instant::now();
    let err = reader
        .wait_for_publications(Some(Duration::from_secs(5)))
        .expect_err("must be rejected");
    assert!(matches!(err, Error::Concurrency));
    assert_eq!(err.to_string(), "cannot concurrently wait on the same endpoint");
    assert!(started.elapsed() < Duration::from_millis(400));

    assert!(matches!(
        blocked.join().expect("join"),
        Err(Error::Timeout)
    ));
}

#[test]
fn test_close_cancels_infinite_wait() {
    let p = participant();
    let reader = Arc::new(
        p.create_reader_with(None, &EndpointConfig::new("T"))
            .expect("reader"),
    );

    let waiter = {
        let reader = Arc::clone(&reader);
        thread::spawn(move || reader.wait(None))
    };
    thread::sleep(Duration::from_millis(30));
    reader.close();

    assert!(matches!(waiter.join().expect("join"), Err(Error::Cancelled)));
    assert!(matches!(reader.wait(None), Err(Error::Closed(_))));
}

#[test]
fn test_participant_close_cancels_endpoint_waits() {
    let p = participant();
    let writer = Arc::new(
        p.create_writer_with(None, &EndpointConfig::new("T"))
            .expect("writer"),
    );

    let waiter = {
        let writer = Arc::clone(&writer);
        thread::spawn(move || writer.wait_for_subscriptions(None))
    };
    thread::sleep(Duration::from_millis(30));
    p.close();

    assert!(matches!(waiter.join().expect("join"), Err(Error::Cancelled)));
}

#[test]
fn test_writer_wait_resolves_when_reliable_reader_takes() {
    let p = participant();
    let writer = p
        .create_writer_with(None, &EndpointConfig::new("T"))
        .expect("writer");
    let mut reader = p
        .create_reader_with(None, &EndpointConfig::new("T"))
        .expect("reader");

    writer.write().expect("write");
    writer.write().expect("write");
    assert_eq!(writer.unacknowledged(), 2);
    assert!(matches!(
        writer.wait(Some(Duration::from_millis(20))),
        Err(Error::Timeout)
    ));

    assert_eq!(reader.read().expect("read").len(), 2);
    assert_eq!(writer.unacknowledged(), 0);
    writer.wait(Some(Duration::ZERO)).expect("acknowledged");
}

#[test]
fn test_writer_wait_ignores_best_effort_readers() {
    let p = participant();
    let writer = p
        .create_writer_with(None, &EndpointConfig::new("T"))
        .expect("writer");
    let _reader = p
        .create_reader_with(
            None,
            &EndpointConfig::new("T").reliability(Reliability::BestEffort),
        )
        .expect("reader");

    writer.write().expect("write");
    assert_eq!(writer.unacknowledged(), 0);
    writer.wait(Some(Duration::ZERO)).expect("nothing outstanding");
}

#[test]
fn test_writer_wait_resolves_when_reader_closes() {
    let p = participant();
    let writer = Arc::new(
        p.create_writer_with(None, &EndpointConfig::new("T"))
            .expect("writer"),
    );
    let reader = p
        .create_reader_with(None, &EndpointConfig::new("T"))
        .expect("reader");
    writer.write().expect("write");

    let waiter = {
        let writer = Arc::clone(&writer);
        thread::spawn(move || writer.wait(Some(Duration::from_secs(5))))
    };
    thread::sleep(Duration::from_millis(30));
    drop(reader);

    waiter.join().expect("join").expect("acknowledged by close");
}

#[test]
fn test_eviction_acknowledges() {
    let p = participant();
    let writer = p
        .create_writer_with(None, &EndpointConfig::new("T"))
        .expect("writer");
    let _reader = p
        .create_reader_with(None, &EndpointConfig::new("T").history_depth(1))
        .expect("reader");

    for _ in 0..4 {
        writer.write().expect("write");
    }
    assert_eq!(writer.unacknowledged(), 1);
}

#[cfg(feature = "async")]
mod async_waits {
    use super::*;

    #[tokio::test]
    async fn test_async_reader_wait() {
        let p = participant();
        let reader = p
            .create_reader_with(None, &EndpointConfig::new("T"))
            .expect("reader");
        let writer = p
            .create_writer_with(None, &EndpointConfig::new("T"))
            .expect("writer");

        let publish = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            writer.write().expect("write");
            writer
        });

        reader
            .wait_async(Some(Duration::from_secs(2)))
            .await
            .expect("data");
        let _writer = publish.await.expect("join");
    }

    #[tokio::test]
    async fn test_async_match_wait_times_out() {
        let p = participant();
        let writer = p
            .create_writer_with(None, &EndpointConfig::new("Nobody"))
            .expect("writer");
        let err = writer
            .wait_for_subscriptions_async(Some(Duration::from_millis(20)))
            .await
            .expect_err("timeout");
        assert!(matches!(err, Error::Timeout));
    }
}
