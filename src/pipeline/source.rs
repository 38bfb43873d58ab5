//! The frame source.
//!
//! A single blocking task decodes frames according to the
//! [`SourcePlan`](super::SourcePlan) and pushes them into the bounded work
//! channel. When the channel is full the send blocks, which is exactly the
//! backpressure the pipeline wants: the source never needs to know how
//! fast the workers are.
//!
//! Whatever happens — normal completion, decode errors, or a closed
//! channel — the source ends by sending one [`WorkItem::Done`] sentinel
//! per worker. That unconditional accounting is what keeps shutdown
//! deadlock-free.

use tokio::{sync::mpsc::Sender, task::JoinHandle};

use crate::{
    decoder::{DecoderFactory, FrameDecoder},
    error::SiftError,
};

use super::{FrameSample, SourcePlan, WorkItem};

/// Depth of the bounded work channel.
///
/// Caps the number of decoded-but-unanalyzed frames held in memory.
pub const WORK_CHANNEL_DEPTH: usize = 100;

/// Spawn the frame source as a blocking task.
///
/// The decoder is opened by `open_decoder` on the task's own thread.
pub(crate) fn spawn(
    open_decoder: DecoderFactory,
    plan: SourcePlan,
    sender: Sender<WorkItem>,
    num_workers: usize,
) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        let produced = open_decoder()
            .and_then(|mut decoder| produce_frames(decoder.as_mut(), &plan, &sender));

        match produced {
            Ok(count) => log::debug!("Frame source finished after {count} frame(s)"),
            Err(SiftError::ChannelClosed) => {
                log::debug!("Frame source stopping: work channel closed")
            }
            Err(error) => log::error!("Frame source stopped early: {error}"),
        }

        // One sentinel per worker, unconditionally.
        for _ in 0..num_workers {
            if sender.blocking_send(WorkItem::Done).is_err() {
                break;
            }
        }
    })
}

/// Run the plan's decode loop, counting emitted frames.
fn produce_frames(
    decoder: &mut dyn FrameDecoder,
    plan: &SourcePlan,
    sender: &Sender<WorkItem>,
) -> Result<u64, SiftError> {
    let mut emitted: u64 = 0;

    let mut sink = |frame_index: u64, image: image::RgbImage| -> Result<(), SiftError> {
        sender
            .blocking_send(WorkItem::Frame(FrameSample { frame_index, image }))
            .map_err(|_| SiftError::ChannelClosed)?;
        emitted += 1;
        Ok(())
    };

    match plan {
        SourcePlan::Interval { every, limit } => {
            decoder.for_each_sampled(*every, *limit, &mut sink)?
        }
        SourcePlan::Keyframes(frames) => decoder.for_each_at(frames, &mut sink)?,
    }

    Ok(emitted)
}
