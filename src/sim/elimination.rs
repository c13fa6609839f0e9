//! Periodic removal of straight block runs
//!
//! Every few ticks the blocks are indexed by grid cell and scanned for
//! horizontal and vertical runs. Every block in any run of at least the
//! configured length is removed in one batch, so a block shared by a row
//! and a column run goes once. No blocks are refunded.

use std::collections::{BTreeMap, BTreeSet};

use super::state::{GameEvent, Session};
use super::world::BodyId;
use crate::GridCoord;

/// Blocks belonging to any horizontal or vertical run of `min_run` or more
pub fn find_runs(cells: &BTreeMap<GridCoord, BodyId>, min_run: usize) -> BTreeSet<BodyId> {
    let mut doomed = BTreeSet::new();
    if min_run == 0 {
        return doomed;
    }

    for &start in cells.keys() {
        for (dc, dr) in [(1, 0), (0, 1)] {
            // Start only at the first cell of a run. Each run is then seen
            // once, and the union matches a scan from every cell.
            if cells.contains_key(&start.offset(-dc, -dr)) {
                continue;
            }
            let run: Vec<BodyId> = (0..)
                .map(|i| start.offset(dc * i, dr * i))
                .map_while(|cell| cells.get(&cell).copied())
                .collect();
            if run.len() >= min_run {
                doomed.extend(run);
            }
        }
    }

    doomed
}

/// Scan the session's blocks and remove every run. Returns how many
/// blocks were removed.
pub fn eliminate(session: &mut Session) -> usize {
    let cells: BTreeMap<GridCoord, BodyId> = session
        .world
        .bodies()
        .iter()
        .filter(|b| b.kind.is_block())
        .map(|b| (GridCoord::nearest_center(b.position), b.id))
        .collect();

    let doomed: Vec<BodyId> = find_runs(&cells, session.tuning.elimination_run)
        .into_iter()
        .collect();
    if doomed.is_empty() {
        return 0;
    }

    let removed = session.world.remove_all(&doomed);
    let burst = session.tuning.debris_particles_per_block;
    let mut removed_cells = Vec::with_capacity(removed.len());
    for body in &removed {
        session.effects.debris(body.position, burst);
        removed_cells.push(GridCoord::nearest_center(body.position));
    }

    log::info!("Eliminated {} blocks", removed.len());
    session.push_event(GameEvent::BlocksEliminated { cells: removed_cells });
    removed.len()
}
