// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Matching integration tests
//!
//! Symmetric matches, net deltas, unnamed peers, reliability compatibility,
//! enable/disable and domain isolation.

use hdds_exchange::{Domain, EndpointConfig, Error, Participant, Reliability};
use std::time::Duration;

const SHORT: Option<Duration> = Some(Duration::from_millis(20));
const LONG: Option<Duration> = Some(Duration::from_secs(2));

#[test]
fn test_matching_is_symmetric() {
    let domain = Domain::standalone(0);
    let participant = Participant::new(&domain, "p").expect("Failed to create participant");
    let writer = participant
        .create_writer_with(Some("Pub::W"), &EndpointConfig::new("Square"))
        .expect("Failed to create writer");
    let reader = participant
        .create_reader_with(Some("Sub::R"), &EndpointConfig::new("Square"))
        .expect("Failed to create reader");

    let subs = writer.matched_subscriptions().expect("subscriptions");
    assert_eq!(subs.len(), 1);
    assert_eq!(subs[0].name.as_deref(), Some("Sub::R"));
    assert_eq!(subs[0].guid, reader.guid());

    let pubs = reader.matched_publications().expect("publications");
    assert_eq!(pubs.len(), 1);
    assert_eq!(pubs[0].name.as_deref(), Some("Pub::W"));
}

#[test]
fn test_unnamed_peer_reports_null_name() {
    let domain = Domain::standalone(0);
    let participant = Participant::new(&domain, "p").expect("participant");
    let writer = participant
        .create_writer_with(None, &EndpointConfig::new("T"))
        .expect("writer");
    let reader = participant
        .create_reader_with(None, &EndpointConfig::new("T"))
        .expect("reader");

    let pubs = reader.matched_publications().expect("publications");
    assert_eq!(pubs[0].name, None);
    let json = serde_json::to_value(&pubs).expect("serialize");
    assert!(json[0]["name"].is_null());
    assert_eq!(json[0]["guid"], writer.guid().to_string());
}

#[test]
fn test_wait_for_publications_reports_net_delta() {
    let domain = Domain::standalone(0);
    let participant = Participant::new(&domain, "p").expect("participant");
    let reader = participant
        .create_reader_with(None, &EndpointConfig::new("T"))
        .expect("reader");

    assert!(matches!(reader.wait_for_publications(SHORT), Err(Error::Timeout)));

    let w1 = participant
        .create_writer_with(None, &EndpointConfig::new("T"))
        .expect("w1");
    let w2 = participant
        .create_writer_with(None, &EndpointConfig::new("T"))
        .expect("w2");
    assert_eq!(reader.wait_for_publications(LONG).expect("delta"), 2);
    assert!(matches!(reader.wait_for_publications(SHORT), Err(Error::Timeout)));

    // match + unmatch between two waits coalesce
    let w3 = participant
        .create_writer_with(None, &EndpointConfig::new("T"))
        .expect("w3");
    drop(w3);
    drop(w1);
    assert_eq!(reader.wait_for_publications(LONG).expect("delta"), -1);

    let status = reader.subscription_matched_status().expect("status");
    assert_eq!(status.total_count, 3);
    assert_eq!(status.current_count, 1);
    drop(w2);
}

#[test]
fn test_wait_for_subscriptions_wakes_on_late_reader() {
    let domain = Domain::standalone(0);
    let participant = Participant::new(&domain, "p").expect("participant");
    let writer = participant
        .create_writer_with(None, &EndpointConfig::new("Late"))
        .expect("writer");

    let late = {
        let domain = domain.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            let other = Participant::new(&domain, "late").expect("participant");
            let reader = other
                .create_reader_with(None, &EndpointConfig::new("Late"))
                .expect("reader");
            std::thread::sleep(Duration::from_millis(200));
            drop(reader);
            other
        })
    };

    assert_eq!(writer.wait_for_subscriptions(LONG).expect("matched"), 1);
    assert_eq!(writer.wait_for_subscriptions(LONG).expect("unmatched"), -1);
    let _other = late.join().expect("join");
}

#[test]
fn test_different_topics_and_domains_do_not_match() {
    let d0 = Domain::standalone(0);
    let d1 = Domain::standalone(1);
    let p0 = Participant::new(&d0, "p0").expect("p0");
    let p1 = Participant::new(&d1, "p1").expect("p1");

    let writer = p0.create_writer_with(None, &EndpointConfig::new("T")).expect("writer");
    let _other_topic = p0.create_reader_with(None, &EndpointConfig::new("U")).expect("reader");
    let _other_domain = p1.create_reader_with(None, &EndpointConfig::new("T")).expect("reader");

    assert!(writer.matched_subscriptions().expect("subs").is_empty());
    assert_eq!(d0.endpoint_count(), 2);
    assert_eq!(d1.endpoint_count(), 1);
}

#[test]
fn test_best_effort_writer_skips_reliable_reader() {
    let domain = Domain::standalone(0);
    let participant = Participant::new(&domain, "p").expect("participant");
    let writer = participant
        .create_writer_with(
            None,
            &EndpointConfig::new("T").reliability(Reliability::BestEffort),
        )
        .expect("writer");
    let _reliable = participant
        .create_reader_with(Some("reliable"), &EndpointConfig::new("T"))
        .expect("reader");
    let _best_effort = participant
        .create_reader_with(
            Some("best_effort"),
            &EndpointConfig::new("T").reliability(Reliability::BestEffort),
        )
        .expect("reader");

    let names: Vec<Option<String>> = writer
        .matched_subscriptions()
        .expect("subs")
        .into_iter()
        .map(|m| m.name)
        .collect();
    assert_eq!(names, vec![Some("best_effort".to_string())]);
}

#[test]
fn test_disabled_reader_matches_after_enable() {
    let domain = Domain::standalone(0);
    let participant = Participant::new(&domain, "p").expect("participant");
    let writer = participant
        .create_writer_with(None, &EndpointConfig::new("T"))
        .expect("writer");
    let mut reader = participant
        .create_reader_with(None, &EndpointConfig::new("T").enabled(false))
        .expect("reader");

    writer.write().expect("write while disabled");
    assert!(writer.matched_subscriptions().expect("subs").is_empty());

    reader.enable().expect("enable");
    assert_eq!(writer.wait_for_subscriptions(LONG).expect("matched"), 1);
    writer.write().expect("write");
    assert_eq!(reader.take().expect("take").len(), 1);
}

#[test]
fn test_closing_writer_unmatches_reader() {
    let domain = Domain::standalone(0);
    let participant = Participant::new(&domain, "p").expect("participant");
    let writer = participant
        .create_writer_with(None, &EndpointConfig::new("T"))
        .expect("writer");
    let reader = participant
        .create_reader_with(None, &EndpointConfig::new("T"))
        .expect("reader");
    assert_eq!(reader.wait_for_publications(LONG).expect("matched"), 1);

    writer.close();
    assert_eq!(reader.wait_for_publications(LONG).expect("unmatched"), -1);
    assert!(reader.matched_publications().expect("pubs").is_empty());
    assert!(matches!(writer.matched_subscriptions(), Err(Error::Closed(_))));
}
