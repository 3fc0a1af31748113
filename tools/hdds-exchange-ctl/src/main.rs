// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HDDS Exchange CLI
//!
//! Inspect exchange documents and run loopback sessions against them.
//!
//! # Usage
//!
//! ```bash
//! # Check a document
//! hdds-exchange-ctl validate shapes.yaml
//!
//! # Show types, participants and their endpoints
//! hdds-exchange-ctl list shapes.yaml
//!
//! # Schemaless loopback on one topic
//! hdds-exchange-ctl pubsub --topic Square --count 3
//!
//! # Configured endpoints ("Library::Participant/Endpoint")
//! hdds-exchange-ctl pubsub --config shapes.yaml \
//!     --writer ShapesLibrary::Publisher/ShapePublisher::SquareWriter \
//!     --reader ShapesLibrary::Subscriber/ShapeSubscriber::SquareReader \
//!     --payload '{"color": "RED", "x": 10, "y": 20}'
//!
//! # Echo service round trips
//! hdds-exchange-ctl rpc --service Echo --count 3
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use hdds_exchange::rpc::{Replier, Requester};
use hdds_exchange::wait::timeout_from_millis;
use hdds_exchange::{
    Domain, DynamicData, EndpointConfig, Error, ExchangeConfig, Participant, Reader, Sample,
    WriteParams, Writer,
};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// HDDS sample exchange companion tool
#[derive(Parser, Debug)]
#[command(name = "hdds-exchange-ctl")]
#[command(about = "Validate exchange documents and run loopback publish/subscribe or request/reply sessions")]
#[command(version)]
struct Args {
    /// Log level (trace, debug, info, warn, error) or an EnvFilter directive
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse and validate a YAML or JSON document
    Validate {
        #[arg(value_name = "FILE")]
        config: PathBuf,
    },

    /// List declared types, participants and endpoint bindings
    List {
        #[arg(value_name = "FILE")]
        config: PathBuf,
    },

    /// Publish samples and take them back through a matched reader
    Pubsub {
        /// Document resolving --writer / --reader
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Configured writer as "Library::Participant/Endpoint"
        #[arg(long, requires = "config")]
        writer: Option<String>,

        /// Configured reader as "Library::Participant/Endpoint"
        #[arg(long, requires = "config")]
        reader: Option<String>,

        /// Topic for ad-hoc endpoints (when --writer / --reader are absent)
        #[arg(short, long, default_value = "Loopback")]
        topic: String,

        /// Number of samples to publish
        #[arg(short = 'n', long, default_value = "5")]
        count: u32,

        /// JSON payload written for every sample
        #[arg(long)]
        payload: Option<String>,

        /// Wait bound in milliseconds (negative waits forever)
        #[arg(long, default_value = "1000", allow_hyphen_values = true)]
        timeout_ms: i64,

        #[arg(long, default_value = "0")]
        domain: u32,
    },

    /// Run an echo replier and send requests to it
    Rpc {
        #[arg(short, long, default_value = "Echo")]
        service: String,

        #[arg(short = 'n', long, default_value = "3")]
        count: u32,

        #[arg(long, default_value = "1000", allow_hyphen_values = true)]
        timeout_ms: i64,

        #[arg(long, default_value = "0")]
        domain: u32,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match args.command {
        Commands::Validate { config } => cmd_validate(&config),
        Commands::List { config } => cmd_list(&config),
        Commands::Pubsub {
            config,
            writer,
            reader,
            topic,
            count,
            payload,
            timeout_ms,
            domain,
        } => {
            let config = match config {
                Some(path) => load(&path)?,
                None => ExchangeConfig::new(),
            };
            let payload = payload
                .map(|text| serde_json::from_str::<Value>(&text))
                .transpose()
                .context("--payload is not valid JSON")?;
            let session = PubSubSession {
                domain: Domain::new(domain, Arc::new(config)),
                topic,
                count,
                payload,
                timeout: timeout_from_millis(timeout_ms),
            };
            session.run(writer.as_deref(), reader.as_deref())
        }
        Commands::Rpc {
            service,
            count,
            timeout_ms,
            domain,
        } => cmd_rpc(
            &Domain::standalone(domain),
            &service,
            count,
            timeout_from_millis(timeout_ms),
        ),
    }
}

fn load(path: &Path) -> Result<ExchangeConfig> {
    ExchangeConfig::from_file(path).with_context(|| format!("loading {}", path.display()))
}

fn cmd_validate(path: &Path) -> Result<()> {
    let config = load(path)?;
    println!(
        "{}: OK ({} type(s), {} participant(s))",
        path.display(),
        config.types().count(),
        config.participant_names().len()
    );
    Ok(())
}

fn cmd_list(path: &Path) -> Result<()> {
    let config = load(path)?;

    println!("Types:");
    for schema in config.types() {
        let key = if schema.key.is_empty() {
            String::from("keyless")
        } else {
            format!("key [{}]", schema.key.join(", "))
        };
        println!("  {} ({})", schema.name, key);
        for (member, kind) in &schema.root.members {
            println!("    {}: {}", member, kind);
        }
    }

    println!("Participants:");
    for qualified in config.participant_names() {
        let participant = config.participant(&qualified)?;
        println!("  {}", qualified);
        for (name, binding) in &participant.writers {
            println!("    writer {}", describe_binding(name, binding));
        }
        for (name, binding) in &participant.readers {
            println!("    reader {}", describe_binding(name, binding));
        }
    }
    Ok(())
}

fn describe_binding(name: &str, binding: &EndpointConfig) -> String {
    let depth = binding
        .history_depth
        .map_or_else(|| String::from("unbounded"), |n| format!("keep_last({})", n));
    format!(
        "{} -> topic '{}' type {} [{}, {}{}]",
        name,
        binding.topic,
        binding.type_name.as_deref().unwrap_or("-"),
        binding.reliability,
        depth,
        if binding.enabled { "" } else { ", disabled" }
    )
}

/// Split `"Library::Participant/Endpoint"`.
fn split_endpoint(target: &str) -> Result<(&str, &str)> {
    match target.split_once('/') {
        Some((participant, endpoint)) if !participant.is_empty() && !endpoint.is_empty() => {
            Ok((participant, endpoint))
        }
        _ => bail!("endpoint '{}' must be 'Library::Participant/Endpoint'", target),
    }
}

struct PubSubSession {
    domain: Domain,
    topic: String,
    count: u32,
    payload: Option<Value>,
    timeout: Option<Duration>,
}

impl PubSubSession {
    fn open_writer(&self, target: Option<&str>) -> Result<(Participant, Writer)> {
        let participant;
        let writer = match target {
            Some(target) => {
                let (qualified, endpoint) = split_endpoint(target)?;
                participant = Participant::from_config(&self.domain, qualified)?;
                participant.create_writer(endpoint)?
            }
            None => {
                participant = Participant::new(&self.domain, "ctl-publisher")?;
                participant
                    .create_writer_with(Some("Ctl::Writer"), &EndpointConfig::new(&self.topic))?
            }
        };
        Ok((participant, writer))
    }

    fn open_reader(&self, target: Option<&str>) -> Result<(Participant, Reader)> {
        let participant;
        let reader = match target {
            Some(target) => {
                let (qualified, endpoint) = split_endpoint(target)?;
                participant = Participant::from_config(&self.domain, qualified)?;
                participant.create_reader(endpoint)?
            }
            None => {
                participant = Participant::new(&self.domain, "ctl-subscriber")?;
                participant
                    .create_reader_with(Some("Ctl::Reader"), &EndpointConfig::new(&self.topic))?
            }
        };
        Ok((participant, reader))
    }

    fn run(&self, writer_target: Option<&str>, reader_target: Option<&str>) -> Result<()> {
        let (_publisher, writer) = self.open_writer(writer_target)?;
        let (_subscriber, mut reader) = self.open_reader(reader_target)?;

        match writer.wait_for_subscriptions(self.timeout) {
            Ok(delta) => tracing::info!("writer {} matched ({:+})", writer.guid(), delta),
            Err(Error::Timeout) => bail!(
                "writer on '{}' and reader on '{}' did not match",
                writer.topic(),
                reader.topic()
            ),
            Err(e) => return Err(e.into()),
        }

        for index in 0..self.count {
            let id = match &self.payload {
                Some(value) => writer.write_json(value, WriteParams::default())?,
                None if writer.schema().is_none() => {
                    writer.write_json(&json!({ "index": index }), WriteParams::default())?
                }
                None => writer.write()?,
            };
            tracing::debug!("wrote {}", id);
        }

        let mut received = 0u32;
        while received < self.count {
            match reader.wait(self.timeout) {
                Ok(()) => {}
                Err(Error::Timeout) => {
                    tracing::warn!("timed out after {} of {} sample(s)", received, self.count);
                    break;
                }
                Err(e) => return Err(e.into()),
            }
            for sample in reader.take()?.iter() {
                println!("{}", sample_line(sample));
                received += 1;
            }
        }

        match writer.wait(self.timeout) {
            Ok(()) => tracing::info!("all {} sample(s) acknowledged", writer.samples_written()),
            Err(Error::Timeout) => tracing::warn!(
                "{} sample(s) still unacknowledged",
                writer.unacknowledged()
            ),
            Err(e) => return Err(e.into()),
        }
        let stats = reader.history_stats();
        println!(
            "received {} / written {} (evicted {})",
            stats.total_received,
            writer.samples_written(),
            stats.evicted
        );
        Ok(())
    }
}

fn sample_line(sample: &Sample<DynamicData>) -> String {
    json!({
        "info": sample.info(),
        "data": sample.to_json(),
    })
    .to_string()
}

fn cmd_rpc(domain: &Domain, service: &str, count: u32, timeout: Option<Duration>) -> Result<()> {
    let server = {
        let domain = domain.clone();
        let service = service.to_string();
        thread::Builder::new()
            .name(format!("{}-replier", service))
            .spawn(move || serve_echo(&domain, &service, count, timeout))
            .context("spawning replier thread")?
    };

    let client = Participant::new(domain, "ctl-client")?;
    let mut requester = Requester::new(&client, service)?;
    requester
        .wait_for_service(timeout)
        .with_context(|| format!("no replier for '{}'", service))?;

    for index in 0..count {
        let request = json!({ "index": index, "text": format!("request {}", index) });
        let id = requester.send_request(&request)?;
        let reply = requester.receive_reply(&id, timeout)?;
        println!("{} -> {}", id, sample_line(&reply));
    }

    match server.join() {
        Ok(result) => result,
        Err(_) => bail!("replier thread panicked"),
    }
}

fn serve_echo(domain: &Domain, service: &str, count: u32, timeout: Option<Duration>) -> Result<()> {
    let participant = Participant::new(domain, "ctl-server")?;
    let mut replier = Replier::new(&participant, service)?;
    let mut served = 0u32;
    while served < count {
        for request in replier.receive_requests(timeout)? {
            let Some(body) = request.to_json() else {
                continue;
            };
            let reply = json!({ "echo": body, "served_by": replier.guid().to_string() });
            replier.send_reply(&request.info().identity, &reply)?;
            served += 1;
        }
    }
    tracing::info!("'{}' served {} request(s)", service, served);
    Ok(())
}
