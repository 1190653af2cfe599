use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::Graph;
use super::rank::Rank;
use super::ranking::Incidence;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutOptions {
    pub detangle_passes: usize,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self { detangle_passes: 6 }
    }
}

/// A point at which the layout can be inspected or abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    Start,
    /// Ranks, ports and waypoints are in place.
    Ranked { ranks: usize },
    RankLocations { pass: usize },
    DetangleForward { pass: usize, rank: usize },
    DetangleBackward { pass: usize, rank: usize },
    AlignLeft { pass: usize },
    /// Final band sizing done and subscribers refreshed.
    Settled,
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Checkpoint::Start => f.write_str("start"),
            Checkpoint::Ranked { .. } => f.write_str("ranked"),
            Checkpoint::RankLocations { .. } => f.write_str("set rank locations"),
            Checkpoint::DetangleForward { pass, rank } => {
                write!(f, "detangle forward {pass}:{rank}")
            }
            Checkpoint::DetangleBackward { pass, rank } => {
                write!(f, "detangle backwards {pass}:{rank}")
            }
            Checkpoint::AlignLeft { .. } => f.write_str("align left"),
            Checkpoint::Settled => f.write_str("settled"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Start,
    Prepare,
    Locate { pass: usize },
    Forward { pass: usize, rank: usize },
    Backward { pass: usize, rank: usize },
    Align { pass: usize },
    Settle,
    Done,
}

/// Pull-based layout run. Each call to `next` performs one step.
///
/// Holds the graph mutably, so nothing else can change it mid-run.
pub struct LayoutSteps<'g> {
    graph: &'g mut Graph,
    options: LayoutOptions,
    ranks: Vec<Rank>,
    incidence: Incidence,
    stage: Stage,
}

impl<'g> LayoutSteps<'g> {
    pub(crate) fn new(graph: &'g mut Graph, options: LayoutOptions) -> Self {
        Self {
            graph,
            options,
            ranks: Vec::new(),
            incidence: Incidence::new(),
            stage: Stage::Start,
        }
    }

    /// The graph as of the last checkpoint.
    pub fn graph(&self) -> &Graph {
        &*self.graph
    }

    pub fn ranks(&self) -> &[Rank] {
        &self.ranks
    }

    fn after_pass(&self, pass: usize) -> Stage {
        if pass + 1 < self.options.detangle_passes {
            Stage::Locate { pass: pass + 1 }
        } else {
            Stage::Settle
        }
    }

    fn step(&mut self) -> Option<Checkpoint> {
        let last = self.ranks.len().saturating_sub(1);
        let (checkpoint, next) = match self.stage {
            Stage::Start => (Checkpoint::Start, Stage::Prepare),
            Stage::Prepare => {
                let (ranks, incidence) = self.graph.prepare_layout();
                self.ranks = ranks;
                self.incidence = incidence;
                let next = if self.options.detangle_passes == 0 {
                    Stage::Settle
                } else {
                    Stage::Locate { pass: 0 }
                };
                (
                    Checkpoint::Ranked {
                        ranks: self.ranks.len(),
                    },
                    next,
                )
            }
            Stage::Locate { pass } => {
                self.graph.set_rank_locations(&self.ranks);
                let next = if self.ranks.is_empty() {
                    Stage::Align { pass }
                } else {
                    Stage::Forward { pass, rank: 0 }
                };
                (Checkpoint::RankLocations { pass }, next)
            }
            Stage::Forward { pass, rank } => {
                self.ranks[rank].detangle(self.graph, &self.incidence, true, amplitude(pass));
                let next = if rank < last {
                    Stage::Forward { pass, rank: rank + 1 }
                } else {
                    Stage::Backward { pass, rank: last }
                };
                (Checkpoint::DetangleForward { pass, rank }, next)
            }
            Stage::Backward { pass, rank } => {
                self.ranks[rank].detangle(self.graph, &self.incidence, false, amplitude(pass));
                let next = if rank > 0 {
                    Stage::Backward {
                        pass,
                        rank: rank - 1,
                    }
                } else {
                    Stage::Align { pass }
                };
                (Checkpoint::DetangleBackward { pass, rank }, next)
            }
            Stage::Align { pass } => {
                self.graph.align_left(&self.ranks);
                (Checkpoint::AlignLeft { pass }, self.after_pass(pass))
            }
            Stage::Settle => {
                self.graph.set_rank_locations(&self.ranks);
                self.graph.refresh();
                (Checkpoint::Settled, Stage::Done)
            }
            Stage::Done => return None,
        };
        self.stage = next;
        Some(checkpoint)
    }
}

impl Iterator for LayoutSteps<'_> {
    type Item = Checkpoint;

    fn next(&mut self) -> Option<Checkpoint> {
        let checkpoint = self.step()?;
        trace!(%checkpoint, "layout step");
        Some(checkpoint)
    }
}

/// Pull strength for a pass; starts above 1 and decays geometrically.
pub(crate) fn amplitude(pass: usize) -> f32 {
    2f32.powf((2.0 - pass as f32) / 4.0)
}
