// MIT License

/* Copyright (c) 2024 Based Labs

Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE. */

use std::path::Path;
use std::sync::Arc;
use clap::{App, Arg};
use tokio::signal::ctrl_c;

use biodigestor_monitor::api::{BayesEngine, HttpEngine, InferenceMode, LocalEngine};
use biodigestor_monitor::dashboard::{run_headless, Dashboard};
use biodigestor_monitor::models::config::DashboardConfig;
use biodigestor_monitor::models::constants::DEFAULT_SAMPLES;
use biodigestor_monitor::server::{self, SnapshotHub};
use biodigestor_monitor::systems::diagnostics::parse_assignment;
use biodigestor_monitor::utils::logging::{log_error, log_info, log_warning, print_banner};

const ENGINE_URL_ENV: &str = "BIODIGESTOR_ENGINE_URL";

fn parse_samples(value: Option<&str>) -> Result<usize, String> {
    let Some(raw) = value else {
        return Ok(DEFAULT_SAMPLES);
    };
    match raw.parse::<usize>() {
        Ok(0) => Err("sample count must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("invalid sample count: {}", raw)),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = App::new("Biodigestor Monitor")
        .version("0.1.0")
        .about("Bayesian-network monitoring dashboard for an anaerobic biodigester")
        .arg(Arg::with_name("engine")
            .long("engine")
            .value_name("KIND")
            .help("Inference engine: local (in-process network) or http")
            .possible_values(["local", "http"])
            .default_value("local")
            .takes_value(true))
        .arg(Arg::with_name("engine-url")
            .long("engine-url")
            .value_name("URL")
            .help("Base URL of the remote engine (falls back to BIODIGESTOR_ENGINE_URL)")
            .takes_value(true))
        .arg(Arg::with_name("config")
            .short('c')
            .long("config")
            .value_name("FILE")
            .help("Load sensors, targets and alert settings from a JSON file")
            .takes_value(true))
        .arg(Arg::with_name("samples")
            .short('s')
            .long("samples")
            .value_name("N")
            .help("Use rejection sampling instead of exact inference (default 10000 samples)")
            .takes_value(true)
            .min_values(0))
        .arg(Arg::with_name("serve")
            .long("serve")
            .value_name("PORT")
            .help("Publish live snapshots on 127.0.0.1:PORT (/snapshot, /ws)")
            .takes_value(true))
        .arg(Arg::with_name("headless")
            .long("headless")
            .help("Run one inference pass, print the diagnosis and exit")
            .takes_value(false))
        .arg(Arg::with_name("evidence")
            .short('e')
            .long("evidence")
            .value_name("SENSOR=VALUE")
            .help("Override a sensor reading (repeatable)")
            .multiple_occurrences(true)
            .takes_value(true))
        .get_matches();

    let config = match matches.value_of("config") {
        Some(path) => DashboardConfig::load_from_file(Path::new(path))?,
        None => DashboardConfig::default(),
    };

    let overrides = matches
        .values_of("evidence")
        .map(|values| values.map(parse_assignment).collect::<Result<Vec<_>, _>>())
        .transpose()?
        .unwrap_or_default();

    let samples = if matches.is_present("samples") {
        Some(parse_samples(matches.value_of("samples"))?)
    } else {
        None
    };

    let (engine, engine_label): (Arc<dyn BayesEngine>, String) = match matches.value_of("engine") {
        Some("http") => {
            let url = matches
                .value_of("engine-url")
                .map(str::to_string)
                .or_else(|| std::env::var(ENGINE_URL_ENV).ok())
                .ok_or("--engine http needs --engine-url or BIODIGESTOR_ENGINE_URL")?;
            if samples.is_some() {
                log_warning("--samples only applies to the local engine");
            }
            let label = format!("http {}", url);
            (Arc::new(HttpEngine::new(&url)?) as Arc<dyn BayesEngine>, label)
        }
        _ => {
            let (mode, label) = match samples {
                Some(n) => (InferenceMode::sampling(n), format!("local (sampling, {} samples)", n)),
                None => (InferenceMode::Exact, "local (exact)".to_string()),
            };
            (Arc::new(LocalEngine::biodigester(mode)?) as Arc<dyn BayesEngine>, label)
        }
    };

    let targets: Vec<String> = config.targets.iter().map(|t| t.label.clone()).collect();

    if matches.is_present("headless") {
        print_banner(&engine_label, &targets);
        let alert = run_headless(engine.as_ref(), config, &overrides).await?;
        if alert {
            log_info("Critical alert raised");
        }
        return Ok(());
    }

    let (shutdown_tx, _shutdown_rx) = tokio::sync::broadcast::channel::<()>(4);
    let shutdown_tx_signal = shutdown_tx.clone();
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    log_error(&format!("Failed to set up SIGTERM handler: {}", e));
                    let _ = ctrl_c().await;
                    let _ = shutdown_tx_signal.send(());
                    return;
                }
            };
            tokio::select! {
                _ = ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            let _ = ctrl_c().await;
        }
        let _ = shutdown_tx_signal.send(());
    });

    let hub = match matches.value_of("serve") {
        Some(port) => {
            let port: u16 = port.parse().map_err(|_| format!("invalid port: {}", port))?;
            let hub = SnapshotHub::new();
            let server_hub = hub.clone();
            let shutdown_rx_server = shutdown_tx.subscribe();
            tokio::spawn(async move {
                server::start_server(server_hub, port, shutdown_rx_server).await;
            });
            Some(hub)
        }
        None => None,
    };

    let dashboard = Dashboard::new(Arc::clone(&engine), &engine_label, config, hub);
    dashboard.run(shutdown_tx.subscribe()).await?;
    let _ = shutdown_tx.send(());
    Ok(())
}
