//! Server orchestration
//!
//! All fallible startup (socket binds, the broadcast lookup, pipeline
//! construction) happens before any thread spawns, so a misconfigured
//! daemon aborts cleanly instead of half-starting. After that, a fixed set
//! of named workers runs until the shutdown flag clears, and every worker
//! is joined on the way out.

use crate::config::AppConfig;
use crate::error::Result;
use crate::service::{scoring, Announcer, ReportServer, Responder};
use crate::vision::{self, SharedObservation};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// How often the supervising loop rechecks the shutdown flag
const SUPERVISE_POLL: Duration = Duration::from_millis(100);

pub struct Server {
    config: AppConfig,
}

impl Server {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Bind everything, spawn the workers, and block until `running` clears
    pub fn run(&self, running: Arc<AtomicBool>) -> Result<()> {
        let network = &self.config.network;
        let shared = SharedObservation::new();

        // Fail-fast startup: nothing spawns until every bind succeeded
        let announcer = Announcer::new(
            network.discovery_port,
            network.announce_interval(),
            Arc::clone(&running),
        )?;
        let responder = Responder::new(
            network.discovery_port,
            network.read_timeout(),
            Arc::clone(&running),
        )?;
        let report = ReportServer::new(
            network.report_port,
            shared.clone(),
            Arc::clone(&running),
            network.read_timeout(),
            network.max_clients,
        )?;
        let pipeline = vision::create_pipeline(&self.config.vision)?;

        let mut workers = Vec::new();
        workers.push(
            thread::Builder::new()
                .name("announcer".to_string())
                .spawn(move || announcer.run())?,
        );
        workers.push(
            thread::Builder::new()
                .name("responder".to_string())
                .spawn(move || responder.run())?,
        );
        workers.push(
            thread::Builder::new()
                .name("report".to_string())
                .spawn(move || report.run())?,
        );
        let (capture, scoring) = scoring::spawn(pipeline, shared, Arc::clone(&running))?;
        workers.push(capture);
        workers.push(scoring);

        log::info!(
            "serving: discovery udp/{}, reports tcp/{}",
            network.discovery_port,
            network.report_port
        );

        while running.load(Ordering::Relaxed) {
            thread::sleep(SUPERVISE_POLL);
        }

        log::info!("shutting down workers...");
        for worker in workers {
            let _ = worker.join();
        }
        log::info!("all workers stopped");

        Ok(())
    }
}
