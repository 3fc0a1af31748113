// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Request/Reply on top of writer/reader pairs.
//!
//! # Topic Naming
//!
//! For a service named "Calculator":
//! - Request topic: `rq/Calculator`
//! - Reply topic: `rr/Calculator`
//!
//! # Correlation
//!
//! Each request is stamped with a `SampleIdentity` (writer GUID + sequence
//! number). The replier copies it into the reply's `related_identity`; the
//! requester takes exactly the reply whose `related_identity` matches, leaving
//! replies to its other outstanding requests in the cache.

mod replier;
mod requester;

pub use replier::Replier;
pub use requester::Requester;

/// Topic carrying requests for `service`.
pub fn request_topic(service: &str) -> String {
    format!("rq/{}", service)
}

/// Topic carrying replies for `service`.
pub fn reply_topic(service: &str) -> String {
    format!("rr/{}", service)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_names() {
        assert_eq!(request_topic("Calculator"), "rq/Calculator");
        assert_eq!(reply_topic("Calculator"), "rr/Calculator");
    }
}
