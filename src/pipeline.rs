// Stage sequencing for one function: per block, build the dependency graph,
// schedule it, commit the new program order, then run copy propagation over
// the committed stream. Plain function calls, no concurrency primitives;
// builder and scheduler errors propagate, copy propagation is total.

//! The builder → scheduler → copy propagation driver.

use crate::copyprop::{self, CopyPropStats};
use crate::error::SchedResult;
use crate::mir::Function;
use crate::sched::{build_graph, commit_schedule, verify_schedule, Scheduler};
use crate::session::SchedSession;
use crate::target::{LatencyModel, TargetRegisterInfo};
use log::debug;

/// Schedule every block of a function and strip redundant copies from the
/// committed order. Returns the function's copy propagation totals; full
/// counters accumulate on the session.
pub fn schedule_and_optimize(
    function: &mut Function,
    tri: &TargetRegisterInfo,
    latency: &LatencyModel,
    scheduler: &mut dyn Scheduler,
    session: &SchedSession<'_>,
) -> SchedResult<CopyPropStats> {
    let mut eliminated = CopyPropStats::default();

    for (idx, block) in function.blocks.iter_mut().enumerate() {
        debug!("scheduling block {} ({} instructions)", idx, block.len());

        let mut graph = build_graph(session.arena(), block, tri, latency)?;
        session.record_graph(&graph);

        let order = scheduler.schedule(&mut graph)?;
        verify_schedule(&graph, &order)?;
        commit_schedule(block, &graph, &order, tri);
        session.record_block_scheduled(block.len());

        let stats = copyprop::propagate_block(block, tri);
        session.record_copy_prop(stats);
        eliminated.merge(stats);
    }

    debug!(
        "function pipeline done: {} blocks, {} copies removed",
        function.blocks.len(),
        eliminated.total()
    );
    Ok(eliminated)
}
