//! # Analysis Worker
//!
//! Runs a [`ChordDetector`] on a dedicated thread. Blocks arrive on a
//! bounded queue, reports leave on a bounded channel of the same depth, and a
//! separate shutdown channel stops the loop. Reports nobody collects are
//! dropped. The detector itself knows nothing
//! about threads.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use tracing::{debug, error, info, warn};

use crate::{
    BlockReport,
    detector::ChordDetector,
    error::{ChordError, Result},
};

/// Handle to the analysis thread.
#[derive(Debug)]
pub struct ChordWorker {
    block_tx: Sender<Vec<f32>>,
    report_rx: Receiver<BlockReport>,
    shutdown_tx: Sender<()>,
    thread_handle: Option<JoinHandle<()>>,
}

impl ChordWorker {
    /// Moves `detector` onto a new thread analysing blocks at `sample_rate`.
    ///
    /// # Arguments
    /// * `detector` - Detector owned by the thread from now on
    /// * `sample_rate` - Sample rate of the submitted blocks in Hz
    /// * `queue_depth` - Capacity of both the block queue and the report queue
    ///
    /// # Returns
    /// * `Ok(worker)` - Handle to the running thread
    /// * `Err(e)` - Zero sample rate or queue depth, or the thread failed to start
    pub fn spawn(detector: ChordDetector, sample_rate: u32, queue_depth: usize) -> Result<Self> {
        if sample_rate == 0 {
            return Err(ChordError::InvalidSampleRate(sample_rate));
        }
        if queue_depth == 0 {
            return Err(ChordError::InvalidQueueDepth(queue_depth));
        }

        let (block_tx, block_rx) = crossbeam_channel::bounded::<Vec<f32>>(queue_depth);
        let (report_tx, report_rx) = crossbeam_channel::bounded(queue_depth);
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);

        let thread_handle = thread::Builder::new()
            .name("chord-worker".into())
            .spawn(move || run(detector, sample_rate, block_rx, report_tx, shutdown_rx))?;

        info!(
            "Analysis worker started: sample_rate={}, queue_depth={}",
            sample_rate, queue_depth
        );

        Ok(Self {
            block_tx,
            report_rx,
            shutdown_tx,
            thread_handle: Some(thread_handle),
        })
    }

    /// A sender for the capture side. Blocks sent through it share the
    /// worker's bounded queue.
    pub fn block_sender(&self) -> Sender<Vec<f32>> {
        self.block_tx.clone()
    }

    /// Queues a block without blocking.
    ///
    /// Returns `Ok(false)` if the queue is full and the block was dropped.
    pub fn submit(&self, block: Vec<f32>) -> Result<bool> {
        match self.block_tx.try_send(block) {
            Ok(()) => Ok(true),
            Err(TrySendError::Full(_)) => Ok(false),
            Err(TrySendError::Disconnected(_)) => Err(ChordError::WorkerStopped),
        }
    }

    /// Receiver of analysis reports, one per processed block. Reports are
    /// dropped while `queue_depth` of them are waiting.
    pub fn reports(&self) -> &Receiver<BlockReport> {
        &self.report_rx
    }

    /// Stops the thread and waits for it to finish.
    pub fn shutdown(mut self) -> Result<()> {
        self.stop()
    }

    fn stop(&mut self) -> Result<()> {
        let Some(handle) = self.thread_handle.take() else {
            return Ok(());
        };
        let _ = self.shutdown_tx.try_send(());
        handle.join().map_err(|_| {
            error!("Analysis worker panicked");
            ChordError::WorkerStopped
        })?;
        debug!("Analysis worker joined");
        Ok(())
    }
}

impl Drop for ChordWorker {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

fn run(
    mut detector: ChordDetector,
    sample_rate: u32,
    block_rx: Receiver<Vec<f32>>,
    report_tx: Sender<BlockReport>,
    shutdown_rx: Receiver<()>,
) {
    debug!("Analysis worker entering processing loop");
    let mut dropped_reports: u64 = 0;
    loop {
        crossbeam_channel::select! {
            recv(block_rx) -> msg => match msg {
                Ok(block) => {
                    let report = detector.analyze_block(&block, sample_rate);
                    match report_tx.try_send(report) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            dropped_reports += 1;
                            if dropped_reports % 100 == 1 {
                                warn!("Report queue full, dropped {} reports", dropped_reports);
                            }
                        }
                        Err(TrySendError::Disconnected(_)) => {
                            debug!("Report receiver dropped");
                            break;
                        }
                    }
                }
                Err(_) => {
                    debug!("Block channel closed");
                    break;
                }
            },
            recv(shutdown_rx) -> _ => {
                debug!("Received shutdown signal");
                break;
            },
        }
    }
    info!("Analysis worker finished");
}
