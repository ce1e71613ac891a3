//! Bounded worker pool for batch resolution.
//!
//! Jobs carry their input index and results are written back into indexed
//! slots, so output order never depends on which worker finished first.

use std::io;
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::debug;

use crate::observation::Observation;
use crate::register::IdentityRegister;
use crate::resolver::{IdentityResolver, ResolvedIdentity};

/// Jobs queued per worker before the feeder blocks.
const QUEUE_DEPTH_PER_WORKER: usize = 64;

struct Job<'a> {
    index: usize,
    observation: &'a Observation,
}

pub(super) fn resolve_in_pool<R: IdentityRegister>(
    resolver: &IdentityResolver<R>,
    observations: &[Observation],
    workers: usize,
) -> io::Result<Vec<ResolvedIdentity>> {
    let workers = workers.clamp(1, observations.len().max(1));
    let (job_tx, job_rx) = bounded::<Job<'_>>(workers * QUEUE_DEPTH_PER_WORKER);
    let (result_tx, result_rx) = bounded::<(usize, ResolvedIdentity)>(workers * QUEUE_DEPTH_PER_WORKER);

    debug!(workers, jobs = observations.len(), "starting resolver pool");

    let mut slots: Vec<Option<ResolvedIdentity>> = vec![None; observations.len()];

    thread::scope(|scope| -> io::Result<()> {
        for idx in 0..workers {
            let rx: Receiver<Job<'_>> = job_rx.clone();
            let tx: Sender<(usize, ResolvedIdentity)> = result_tx.clone();
            thread::Builder::new()
                .name(format!("rollcall-resolve-{idx}"))
                .spawn_scoped(scope, move || {
                    for job in rx {
                        let outcome = resolver.resolve_observation(job.observation);
                        if tx.send((job.index, outcome)).is_err() {
                            break;
                        }
                    }
                })?;
        }
        drop(job_rx);
        drop(result_tx);

        // Feed from a separate thread so the bounded result channel is
        // drained while jobs are still being queued.
        thread::Builder::new()
            .name("rollcall-resolve-feed".to_string())
            .spawn_scoped(scope, move || {
                for (index, observation) in observations.iter().enumerate() {
                    if job_tx.send(Job { index, observation }).is_err() {
                        break;
                    }
                }
            })?;

        for (index, outcome) in result_rx {
            slots[index] = Some(outcome);
        }
        Ok(())
    })?;

    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::Other,
                    format!("resolver worker dropped observation {index}"),
                )
            })
        })
        .collect()
}
