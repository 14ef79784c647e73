//! Wires a [`Generator`] and [`Receiver`] together to run one transfer.
//!
//! The design notes call for the generator and receiver to run as one
//! thread apiece, coupled only by the job queue. This driver keeps the same
//! job vocabulary and the same single-producer/single-consumer channel but
//! runs both roles cooperatively on the caller's thread: the receiver reads
//! everything the peer has already written and turns it into jobs, and
//! those jobs are drained and dispatched to the generator as they arrive.
//! Splitting this into real OS threads is a matter of making the channel
//! halves and wire types `Send + 'static`; nothing about the per-file
//! lockstep below depends on staying single-threaded.

use std::io::{self, Read, Write};
use std::path::PathBuf;

use filters::FilterSet;
use metadata::FileAttributeManager;
use protocol::multiplex::{FramedWriter, MessageHandler};
use protocol::session::Statistics;
use protocol::version::ChecksumSeed;

use crate::generator::{Generator, GeneratorConfig};
use crate::job::GeneratorJob;
use crate::receiver::{BodyOutcome, Receiver};

/// Runs one transfer to completion: decodes the incoming file list,
/// requests deltas for whatever changed, and reconstructs file bodies.
///
/// # Errors
///
/// Propagates I/O errors from either half of the duplex channel or from
/// touching the local filesystem under `destination_root`.
#[allow(clippy::too_many_arguments)]
pub fn run_update<R: Read, W: Write>(
    reader: R,
    writer: W,
    manager: &dyn FileAttributeManager,
    filters: &FilterSet,
    destination_root: PathBuf,
    seed: ChecksumSeed,
    config: GeneratorConfig,
    handler: &mut dyn MessageHandler,
) -> io::Result<Statistics> {
    let (tx, rx) = crossbeam_channel::unbounded::<GeneratorJob>();
    let mut generator = Generator::new(FramedWriter::new(writer), manager, filters, seed, config);
    let mut receiver = Receiver::new(reader, manager, destination_root, seed);

    receiver.run(&tx, handler)?;

    // `Stop` is held back until every retry a failed transfer enqueues has
    // drained, since a retry's `GenerateFile` job lands behind whatever was
    // already queued (including `Stop` itself, pushed once up front above).
    let mut stop_job = None;
    while let Ok(job) = rx.try_recv() {
        if matches!(job, GeneratorJob::Stop) {
            stop_job = Some(job);
            continue;
        }

        let pending = generator.dispatch(job)?;
        for transfer in pending {
            match receiver.receive_body(transfer.index, &transfer.header, handler)? {
                BodyOutcome::Applied(failures) => {
                    for failure in failures {
                        generator.report_error(&failure)?;
                    }
                }
                BodyOutcome::Retry => {
                    let _ = tx.send(GeneratorJob::GenerateFile {
                        target_dir: transfer.target_dir,
                        index: transfer.index,
                        info: transfer.info,
                    });
                }
                BodyOutcome::Failed => {
                    generator.report_failed_transfer(transfer.index, &transfer.info)?;
                }
            }
        }
    }

    if let Some(job) = stop_job {
        generator.dispatch(job)?;
    }

    Ok(receiver.stats())
}
