//! Shared owner of the current footway set and the graph built from it.
//!
//! Readers load an immutable snapshot; a footway update installs a whole new
//! snapshot in one atomic swap, so nobody ever sees a half-rebuilt graph.

use arc_swap::ArcSwap;
use std::sync::{Arc, OnceLock};

use crate::builder::build_graph;
use crate::config::GraphConfig;
use crate::graph::RoutingGraph;
use crate::models::Footway;

#[derive(Debug)]
struct GraphSnapshot {
    footways: Arc<Vec<Footway>>,
    graph: OnceLock<Arc<RoutingGraph>>,
    generation: u64,
}

impl GraphSnapshot {
    fn new(footways: Arc<Vec<Footway>>, generation: u64) -> Self {
        Self {
            footways,
            graph: OnceLock::new(),
            generation,
        }
    }
}

/// Current routing graph, rebuilt lazily after the footways change.
#[derive(Debug)]
pub struct GraphStore {
    config: GraphConfig,
    snapshot: ArcSwap<GraphSnapshot>,
}

impl GraphStore {
    pub fn new(footways: Vec<Footway>, config: GraphConfig) -> Self {
        Self {
            config,
            snapshot: ArcSwap::from_pointee(GraphSnapshot::new(Arc::new(footways), 0)),
        }
    }

    /// Graph for the current footway set, built on first use.
    pub fn graph(&self) -> Arc<RoutingGraph> {
        let snapshot = self.snapshot.load_full();
        snapshot
            .graph
            .get_or_init(|| {
                tracing::debug!(generation = snapshot.generation, "Building routing graph");
                Arc::new(build_graph(&snapshot.footways, &self.config))
            })
            .clone()
    }

    /// Install a new footway set. Returns false (and keeps the built graph)
    /// when it equals the current one.
    ///
    /// The comparison and the swap retry together, so concurrent updates
    /// each get their own generation.
    pub fn replace_footways(&self, footways: Vec<Footway>) -> bool {
        let footways = Arc::new(footways);
        let mut installed = None;
        self.snapshot.rcu(|current| {
            if current.footways == footways {
                installed = None;
                return Arc::clone(current);
            }
            let generation = current.generation + 1;
            installed = Some(generation);
            Arc::new(GraphSnapshot::new(Arc::clone(&footways), generation))
        });

        match installed {
            Some(generation) => {
                tracing::info!(generation, "Footway set changed; graph will be rebuilt");
                true
            }
            None => false,
        }
    }

    /// Bumped on every effective footway replacement.
    pub fn generation(&self) -> u64 {
        self.snapshot.load().generation
    }

    pub fn is_built(&self) -> bool {
        self.snapshot.load().graph.get().is_some()
    }

    pub fn footways(&self) -> Arc<Vec<Footway>> {
        self.snapshot.load().footways.clone()
    }
}
