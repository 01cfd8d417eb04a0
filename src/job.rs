//! Background jobs.
//!
//! A [`JobContext`] owns everything one run needs: its configuration, its
//! cancellation token and the sending half of its event channel. Spawning it
//! moves the context onto a dedicated worker thread and returns a
//! [`JobHandle`] to the owner, who receives chord events as they are
//! committed and may cancel the run at any point.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use crate::compute::DarknessMap;
use crate::compute::strategy::{CancelToken, ProgressSink, REGISTRY, StrategyError};
use crate::schema::{GenerateResult, JobConfig};

/// Events streamed from a running job, in order.
#[derive(Debug)]
pub enum JobEvent {
    /// A chord was committed.
    Chord { index: usize, from: usize, to: usize },
    /// The run ended normally (including by cancellation).
    Finished(GenerateResult),
    /// The run failed.
    Failed(StrategyError),
}

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    Strategy(#[from] StrategyError),
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("Worker ended without reporting a result")]
    Disconnected,
    #[error("Worker thread panicked")]
    Panicked,
}

/// Forwards committed chords into the job's channel.
struct ChannelSink<'a> {
    events: &'a Sender<JobEvent>,
    next: usize,
}

impl ProgressSink for ChannelSink<'_> {
    fn on_chord(&mut self, from: usize, to: usize) {
        // A dropped receiver only means nobody is listening any more
        let _ = self.events.send(JobEvent::Chord {
            index: self.next,
            from,
            to,
        });
        self.next += 1;
    }
}

/// Per-job state handed to the worker.
pub struct JobContext {
    config: JobConfig,
    cancel: CancelToken,
    events: Sender<JobEvent>,
}

impl JobContext {
    /// Create a context and the receiving end of its event channel.
    pub fn new(config: JobConfig) -> (Self, Receiver<JobEvent>) {
        let (events, rx) = mpsc::channel();
        let context = Self {
            config,
            cancel: CancelToken::new(),
            events,
        };
        (context, rx)
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Run the job on the current thread, reporting through the channel.
    pub fn run(&self) {
        let outcome = self.execute();
        let event = match outcome {
            Ok(result) => {
                log::info!(
                    "Job finished: {} chords ({:?})",
                    result.len(),
                    result.stop_reason
                );
                JobEvent::Finished(result)
            }
            Err(err) => {
                log::warn!("Job failed: {err}");
                JobEvent::Failed(err)
            }
        };
        let _ = self.events.send(event);
    }

    fn execute(&self) -> Result<GenerateResult, StrategyError> {
        self.config.image.validate()?;
        let darkness = DarknessMap::from_intensity(&self.config.image);
        let mut sink = ChannelSink {
            events: &self.events,
            next: 0,
        };
        REGISTRY.run(&darkness, &self.config.params, Some(&mut sink), Some(&self.cancel))
    }

    /// Move the context onto a dedicated worker thread.
    pub fn spawn(config: JobConfig) -> Result<JobHandle, JobError> {
        let (context, events) = Self::new(config);
        let cancel = context.cancel.clone();
        let worker = thread::Builder::new()
            .name(format!("string-art-{}", context.config.params.algorithm))
            .spawn(move || context.run())?;

        Ok(JobHandle {
            cancel,
            events,
            worker,
        })
    }
}

/// Owner side of a spawned job.
pub struct JobHandle {
    cancel: CancelToken,
    events: Receiver<JobEvent>,
    worker: JoinHandle<()>,
}

impl JobHandle {
    /// Ask the worker to stop after its current iteration.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn events(&self) -> &Receiver<JobEvent> {
        &self.events
    }

    /// Drain events until the job ends, passing each chord to `on_chord`.
    pub fn wait_with<F>(self, mut on_chord: F) -> Result<GenerateResult, JobError>
    where
        F: FnMut(usize, usize, usize),
    {
        let mut outcome = Err(JobError::Disconnected);
        for event in self.events.iter() {
            match event {
                JobEvent::Chord { index, from, to } => on_chord(index, from, to),
                JobEvent::Finished(result) => {
                    outcome = Ok(result);
                    break;
                }
                JobEvent::Failed(err) => {
                    outcome = Err(err.into());
                    break;
                }
            }
        }

        if self.worker.join().is_err() {
            return Err(JobError::Panicked);
        }
        outcome
    }

    /// Block until the job ends.
    pub fn wait(self) -> Result<GenerateResult, JobError> {
        self.wait_with(|_, _, _| {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ConfigError, StopReason};

    #[test]
    fn test_events_match_result() {
        let mut config = JobConfig::example();
        config.params.algorithm = "coverage".to_string();
        config.params.n_strings = 10;

        let handle = JobContext::spawn(config).unwrap();
        let mut streamed = Vec::new();
        let result = handle
            .wait_with(|index, from, to| streamed.push((index, from, to)))
            .unwrap();

        assert_eq!(streamed.len(), result.len());
        for (i, (index, from, to)) in streamed.into_iter().enumerate() {
            assert_eq!(index, i);
            assert_eq!((from, to), (result.chords[i].from, result.chords[i].to));
        }
    }

    #[test]
    fn test_failure_reported() {
        let mut config = JobConfig::example();
        config.params.algorithm = "missing".to_string();

        let err = JobContext::spawn(config).unwrap().wait().unwrap_err();
        assert!(matches!(
            err,
            JobError::Strategy(StrategyError::Configuration(
                ConfigError::UnknownAlgorithm { .. }
            ))
        ));
    }

    #[test]
    fn test_cancel_before_run() {
        let (context, events) = JobContext::new(JobConfig::example());
        context.cancel_token().cancel();
        context.run();

        match events.recv().unwrap() {
            JobEvent::Finished(result) => {
                assert!(result.is_empty());
                assert_eq!(result.stop_reason, StopReason::Cancelled);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
