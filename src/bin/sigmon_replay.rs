//! sigmon replay tool
//!
//! Feeds a recorded JSON-lines trace of raw readings through a monitor and
//! prints every published observation as one JSON line on stdout.
//!
//! Each input line looks like
//! `{"kind": "traffic_mobile", "at": 1700000000000, "reading": {"type": "counters", ...}}`.
//! `at` is optional; when present the monitor clock is moved to it before the
//! reading is ingested. Kinds are activated the first time they appear.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use serde::Deserialize;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use sigmon::{
    listener_fn, EventKind, IngestOutcome, ListenerError, ManualClock, Monitor, Options, RawReading,
};

struct Config {
    /// Trace file; stdin when absent.
    input: Option<PathBuf>,
    options: Options,
    pretty: bool,
}

#[derive(Debug, Deserialize)]
struct TraceLine {
    kind: EventKind,
    #[serde(default)]
    at: Option<i64>,
    reading: RawReading,
}

fn usage() {
    println!("sigmon-replay - replay raw device readings through a monitor");
    println!();
    println!("USAGE:");
    println!("    sigmon-replay [OPTIONS] [FILE]");
    println!();
    println!("ARGS:");
    println!("    <FILE>                  JSON-lines trace [default: stdin]");
    println!();
    println!("OPTIONS:");
    println!("    -o, --options <JSON>    Activation options");
    println!("                            e.g. '{{\"update_interval_seconds\": 10}}'");
    println!("        --pretty            Pretty-print observations");
    println!("    -h, --help              Print help information");
    println!();
    println!("Log verbosity follows RUST_LOG (default: warn).");
}

fn parse_args() -> Result<Option<Config>, String> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut config = Config {
        input: None,
        options: Options::new(),
        pretty: false,
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--options" | "-o" => {
                let text = args.get(i + 1).ok_or("--options requires a value")?;
                config.options =
                    Options::from_json(text).map_err(|e| format!("invalid --options: {e}"))?;
                i += 2;
            }
            "--pretty" => {
                config.pretty = true;
                i += 1;
            }
            "--help" | "-h" => {
                usage();
                return Ok(None);
            }
            arg if arg.starts_with('-') && arg != "-" => {
                return Err(format!("unknown option: {arg}"));
            }
            path => {
                if config.input.is_some() {
                    return Err("only one input file may be given".to_string());
                }
                if path != "-" {
                    config.input = Some(PathBuf::from(path));
                }
                i += 1;
            }
        }
    }
    Ok(Some(config))
}

fn open_input(config: &Config) -> io::Result<Box<dyn BufRead>> {
    match &config.input {
        Some(path) => Ok(Box::new(BufReader::new(File::open(path)?))),
        None => Ok(Box::new(BufReader::new(io::stdin()))),
    }
}

fn run(config: &Config) -> Result<(), String> {
    let input = open_input(config).map_err(|e| format!("cannot open input: {e}"))?;

    let clock = Arc::new(ManualClock::new(0));
    let monitor = Monitor::builder()
        .with_standard_processors()
        .clock(clock.clone())
        .build();

    let out = Arc::new(Mutex::new(io::stdout()));
    let pretty = config.pretty;
    let printer = listener_fn(move |observation| {
        let line = if pretty {
            serde_json::to_string_pretty(observation)
        } else {
            serde_json::to_string(observation)
        }
        .map_err(|e| ListenerError::rejected(e.to_string()))?;
        let mut out = out.lock().map_err(|_| ListenerError::rejected("stdout lock poisoned"))?;
        writeln!(out, "{line}").map_err(|e| ListenerError::rejected(e.to_string()))
    });

    let mut seen = BTreeSet::new();
    let mut published = 0usize;
    let mut dropped = 0usize;

    for (index, line) in input.lines().enumerate() {
        let line_no = index + 1;
        let line = line.map_err(|e| format!("read error at line {line_no}: {e}"))?;
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }
        let entry: TraceLine = match serde_json::from_str(&line) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(line = line_no, error = %e, "Skipping unparseable trace line");
                dropped += 1;
                continue;
            }
        };

        if let Some(at) = entry.at {
            clock.set(at);
        }
        if seen.insert(entry.kind) {
            monitor.subscribe(entry.kind, Arc::clone(&printer)).map_err(|e| e.to_string())?;
            if let Err(e) = monitor.activate(entry.kind, &config.options) {
                warn!(kind = %entry.kind, error = %e, "Activation failed");
            }
        }

        match monitor.on_raw_reading(entry.kind, entry.reading) {
            IngestOutcome::Published(n) => published += n,
            outcome => {
                debug!(line = line_no, ?outcome, "Reading not published");
                dropped += 1;
            }
        }
    }

    monitor.shutdown();
    let kinds: Vec<&str> = seen.iter().map(|kind| kind.as_str()).collect();
    eprintln!(
        "replayed {} kind(s) [{}]: {published} observation(s) published, {dropped} line(s) dropped",
        seen.len(),
        kinds.join(", ")
    );
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let config = match parse_args() {
        Ok(Some(config)) => config,
        Ok(None) => return ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
