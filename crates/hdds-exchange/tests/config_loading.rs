// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Configuration loading integration tests
//!
//! YAML and JSON documents on disk, name resolution through participants and
//! rejection of dangling references.

use hdds_exchange::{Domain, Error, ExchangeConfig, Participant, Reliability};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tempfile::{Builder, NamedTempFile};

const SENSORS_YAML: &str = r#"
types:
  Reading:
    key: [sensor]
    fields:
      sensor: string
      celsius: number
participant_libraries:
  Plant:
    Sensor:
      writers:
        Sensor::Out: { topic: Temperature, type: Reading, reliability: best_effort }
    Monitor:
      readers:
        Monitor::In: { topic: Temperature, type: Reading, reliability: best_effort, history_depth: 8 }
        Monitor::Disabled: { topic: Temperature, enabled: false }
"#;

fn write_temp(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write temp file");
    file
}

#[test]
fn test_load_yaml_file() {
    let file = write_temp(".yaml", SENSORS_YAML);
    let config = ExchangeConfig::from_file(file.path()).expect("Failed to load YAML");

    assert_eq!(
        config.participant_names(),
        vec!["Plant::Monitor".to_string(), "Plant::Sensor".to_string()]
    );
    let sensor = config.participant("Plant::Sensor").expect("sensor");
    let out = sensor.writer("Sensor::Out").expect("writer binding");
    assert_eq!(out.topic, "Temperature");
    assert_eq!(out.reliability, Reliability::BestEffort);

    let schema = config.type_schema("Reading").expect("type");
    assert_eq!(schema.key, vec!["sensor".to_string()]);
}

#[test]
fn test_load_json_file_by_extension() {
    let json = serde_json::json!({
        "types": {
            "Reading": { "key": ["sensor"], "fields": { "sensor": "string", "celsius": "number" } }
        },
        "participant_libraries": {
            "Plant": {
                "Sensor": { "writers": { "Sensor::Out": { "topic": "Temperature", "type": "Reading" } } }
            }
        }
    });
    let file = write_temp(".json", &json.to_string());
    let config = ExchangeConfig::from_file(file.path()).expect("Failed to load JSON");
    assert!(config.participant("Plant::Sensor").is_ok());
    assert_eq!(config.types().count(), 1);
}

#[test]
fn test_missing_file_is_configuration_error() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let err = ExchangeConfig::from_file(dir.path().join("absent.yaml")).expect_err("missing");
    assert!(matches!(err, Error::Configuration(_)));
}

#[test]
fn test_unknown_type_reference_is_rejected() {
    let yaml = r#"
participant_libraries:
  L:
    P:
      writers:
        W: { topic: T, type: Missing }
"#;
    let err = ExchangeConfig::from_yaml_str(yaml).expect_err("dangling type");
    assert!(matches!(err, Error::Configuration(ref msg) if msg.contains("Missing")));
}

#[test]
fn test_unknown_keys_are_rejected() {
    let yaml = "types: {}\nparticipants: {}\n";
    assert!(matches!(
        ExchangeConfig::from_yaml_str(yaml),
        Err(Error::Configuration(_))
    ));
}

#[test]
fn test_zero_history_depth_is_rejected() {
    let yaml = r#"
participant_libraries:
  L:
    P:
      readers:
        R: { topic: T, history_depth: 0 }
"#;
    assert!(matches!(
        ExchangeConfig::from_yaml_str(yaml),
        Err(Error::Configuration(_))
    ));
}

#[test]
fn test_unknown_names_through_participant() {
    let config = ExchangeConfig::from_yaml_str(SENSORS_YAML).expect("config");
    let domain = Domain::new(0, Arc::new(config));

    assert!(matches!(
        Participant::from_config(&domain, "Plant::Nobody"),
        Err(Error::Configuration(_))
    ));
    assert!(matches!(
        Participant::from_config(&domain, "NoLibrary"),
        Err(Error::Configuration(_))
    ));

    let sensor = Participant::from_config(&domain, "Plant::Sensor").expect("sensor");
    assert!(matches!(
        sensor.create_writer("Sensor::Missing"),
        Err(Error::Configuration(_))
    ));
    assert!(matches!(
        sensor.create_reader("Sensor::Out"),
        Err(Error::Configuration(_))
    ));
}

#[test]
fn test_configured_endpoints_exchange_samples() {
    let config = ExchangeConfig::from_yaml_str(SENSORS_YAML).expect("config");
    let domain = Domain::new(3, Arc::new(config));
    let sensor = Participant::from_config(&domain, "Plant::Sensor").expect("sensor");
    let monitor = Participant::from_config(&domain, "Plant::Monitor").expect("monitor");

    let (writers, readers) = monitor.configured_endpoints();
    assert!(writers.is_empty());
    assert_eq!(readers, vec!["Monitor::Disabled", "Monitor::In"]);

    let mut writer = sensor.create_writer("Sensor::Out").expect("writer");
    let mut reader = monitor.create_reader("Monitor::In").expect("reader");
    let disabled = monitor.create_reader("Monitor::Disabled").expect("reader");
    assert_eq!(reader.reliability(), Reliability::BestEffort);

    writer.instance_mut().set_string("sensor", "boiler").expect("set");
    writer.instance_mut().set_number("celsius", 71.5).expect("set");
    writer.write().expect("write");

    reader.wait(Some(Duration::from_secs(1))).expect("data");
    let samples = reader.take().expect("take");
    assert_eq!(samples.len(), 1);
    assert_eq!(
        samples[0].to_json(),
        Some(&serde_json::json!({ "sensor": "boiler", "celsius": 71.5 }))
    );
    assert_eq!(disabled.history_stats().total_received, 0);
    assert_eq!(sensor.domain_id(), 3);
}
