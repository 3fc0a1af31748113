// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Request/reply integration tests
//!
//! Correlation by related identity, out-of-order replies and isolation
//! between requesters sharing a service.

use hdds_exchange::rpc::{reply_topic, request_topic, Replier, Requester};
use hdds_exchange::{Domain, Error, Participant};
use serde_json::json;
use std::thread;
use std::time::Duration;

const TIMEOUT: Option<Duration> = Some(Duration::from_secs(2));

fn participant() -> Participant {
    Participant::new(&Domain::standalone(0), "rpc").expect("Failed to create participant")
}

#[test]
fn test_endpoints_use_service_topics_and_names() {
    let p = participant();
    let requester = Requester::new(&p, "Calc").expect("Failed to create requester");
    let replier = Replier::new(&p, "Calc").expect("Failed to create replier");

    let repliers = requester.matched_repliers().expect("repliers");
    assert_eq!(repliers.len(), 1);
    assert_eq!(repliers[0].name.as_deref(), Some("Calc::Replier"));

    let requesters = replier.matched_requesters().expect("requesters");
    assert_eq!(requesters[0].name.as_deref(), Some("Calc::Requester"));
    assert_eq!(request_topic("Calc"), "rq/Calc");
    assert_eq!(reply_topic("Calc"), "rr/Calc");
}

#[test]
fn test_out_of_order_replies_are_correlated() {
    let p = participant();
    let mut requester = Requester::new(&p, "Calc").expect("requester");
    let mut replier = Replier::new(&p, "Calc").expect("replier");

    let first = requester.send_request(&json!({ "a": 1, "b": 2 })).expect("send");
    let second = requester.send_request(&json!({ "a": 10, "b": 20 })).expect("send");
    assert_eq!(second.sequence_number, first.sequence_number + 1);

    let mut requests = replier.receive_requests(TIMEOUT).expect("requests");
    assert_eq!(requests.len(), 2);
    // answer the newest request first
    requests.reverse();
    for request in &requests {
        let body = request.to_json().expect("valid request");
        let sum = body["a"].as_i64().unwrap_or(0) + body["b"].as_i64().unwrap_or(0);
        replier
            .send_reply(&request.info().identity, &json!({ "sum": sum }))
            .expect("reply");
    }

    let reply = requester.receive_reply(&first, TIMEOUT).expect("first reply");
    assert_eq!(reply.to_json(), Some(&json!({ "sum": 3 })));
    assert_eq!(reply.info().related_identity, Some(first));

    let reply = requester
        .receive_reply(&second, Some(Duration::ZERO))
        .expect("second reply already cached");
    assert_eq!(reply.to_json(), Some(&json!({ "sum": 30 })));
}

#[test]
fn test_unanswered_request_times_out() {
    let p = participant();
    let mut requester = Requester::new(&p, "Silent").expect("requester");
    let _replier = Replier::new(&p, "Silent").expect("replier");

    let id = requester.send_request(&json!({})).expect("send");
    let err = requester
        .receive_reply(&id, Some(Duration::from_millis(30)))
        .expect_err("no reply");
    assert!(matches!(err, Error::Timeout));
}

#[test]
fn test_replies_for_other_requesters_are_discarded() {
    let p = participant();
    let mut alice = Requester::new(&p, "Echo").expect("alice");
    let mut bob = Requester::new(&p, "Echo").expect("bob");
    let mut replier = Replier::new(&p, "Echo").expect("replier");

    let from_alice = alice.send_request(&json!({ "who": "alice" })).expect("send");
    let from_bob = bob.send_request(&json!({ "who": "bob" })).expect("send");
    assert_ne!(from_alice.writer_guid, from_bob.writer_guid);

    for request in replier.receive_requests(TIMEOUT).expect("requests") {
        let body = request.to_json().cloned().expect("valid request");
        replier
            .send_reply(&request.info().identity, &body)
            .expect("reply");
    }

    let reply = alice.receive_reply(&from_alice, TIMEOUT).expect("alice reply");
    assert_eq!(reply.to_json(), Some(&json!({ "who": "alice" })));
    let reply = bob.receive_reply(&from_bob, TIMEOUT).expect("bob reply");
    assert_eq!(reply.to_json(), Some(&json!({ "who": "bob" })));

    // bob's reply was also delivered to alice and has been dropped there
    assert!(matches!(
        alice.receive_reply(&from_bob, Some(Duration::from_millis(20))),
        Err(Error::Timeout)
    ));
}

#[test]
fn test_service_on_another_thread() {
    let domain = Domain::standalone(7);
    let client = Participant::new(&domain, "client").expect("client");
    let mut requester = Requester::new(&client, "Upper").expect("requester");

    let server = {
        let domain = domain.clone();
        thread::spawn(move || {
            let p = Participant::new(&domain, "server").expect("server");
            let mut replier = Replier::new(&p, "Upper").expect("replier");
            let mut served = 0;
            while served < 3 {
                for request in replier.receive_requests(TIMEOUT).expect("requests") {
                    let text = request.to_json().and_then(|v| v["text"].as_str()).unwrap_or("");
                    replier
                        .send_reply(
                            &request.info().identity,
                            &json!({ "text": text.to_uppercase() }),
                        )
                        .expect("reply");
                    served += 1;
                }
            }
        })
    };

    requester.wait_for_service(TIMEOUT).expect("service matched");
    for word in ["alpha", "beta", "gamma"] {
        let id = requester.send_request(&json!({ "text": word })).expect("send");
        let reply = requester.receive_reply(&id, TIMEOUT).expect("reply");
        assert_eq!(reply.to_json(), Some(&json!({ "text": word.to_uppercase() })));
    }
    server.join().expect("Failed to join server thread");
}

#[cfg(feature = "async")]
#[tokio::test]
async fn test_async_round_trip() {
    let p = participant();
    let mut requester = Requester::new(&p, "Ping").expect("requester");
    let mut replier = Replier::new(&p, "Ping").expect("replier");

    let id = requester.send_request(&json!({ "n": 1 })).expect("send");
    let requests = replier
        .receive_requests_async(TIMEOUT)
        .await
        .expect("requests");
    assert_eq!(requests.len(), 1);
    replier
        .send_reply(&requests[0].info().identity, &json!({ "n": 2 }))
        .expect("reply");

    let reply = requester
        .receive_reply_async(&id, TIMEOUT)
        .await
        .expect("reply");
    assert_eq!(reply.to_json(), Some(&json!({ "n": 2 })));
}
