// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, instrument};

use crate::reconciler::Reconciler;
use crate::report::CycleReport;

/// Most recent cycle report, shared with the query API.
pub type ReportHandle = Arc<RwLock<Option<CycleReport>>>;

/// Drives [`Reconciler::run_cycle`] on a fixed interval until shut down.
///
/// The first cycle starts immediately. Shutdown is observed between cycles;
/// a cycle already in flight runs to completion.
pub struct ReconcileRunner {
	reconciler: Arc<Reconciler>,
	interval: Duration,
	last_report: ReportHandle,
	shutdown_tx: broadcast::Sender<()>,
	handle: Mutex<Option<JoinHandle<()>>>,
}

impl ReconcileRunner {
	pub fn new(reconciler: Arc<Reconciler>, interval: Duration) -> Self {
		let (shutdown_tx, _) = broadcast::channel(1);
		Self {
			reconciler,
			interval,
			last_report: Arc::new(RwLock::new(None)),
			shutdown_tx,
			handle: Mutex::new(None),
		}
	}

	pub fn last_report(&self) -> ReportHandle {
		Arc::clone(&self.last_report)
	}

	#[instrument(skip(self), fields(interval_secs = self.interval.as_secs()))]
	pub async fn start(&self) {
		let mut handle = self.handle.lock().await;
		if handle.is_some() {
			return;
		}

		let reconciler = Arc::clone(&self.reconciler);
		let last_report = Arc::clone(&self.last_report);
		let interval = self.interval;
		let mut shutdown_rx = self.shutdown_tx.subscribe();

		*handle = Some(tokio::spawn(async move {
			loop {
				let report = reconciler.run_cycle().await;
				*last_report.write().await = Some(report);

				tokio::select! {
					_ = tokio::time::sleep(interval) => {}
					_ = shutdown_rx.recv() => {
						info!("stopping reconciliation loop");
						break;
					}
				}
			}
		}));

		info!("reconciliation loop started");
	}

	/// Signals the loop and waits for it to exit.
	#[instrument(skip(self))]
	pub async fn shutdown(&self) {
		let _ = self.shutdown_tx.send(());

		if let Some(handle) = self.handle.lock().await.take() {
			let _ = handle.await;
		}

		info!("reconciliation loop shut down");
	}
}
