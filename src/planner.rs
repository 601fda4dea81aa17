//! Builds the randomized interaction plan for one run.
//!
//! Every membership entry in every container plans 1-3 top-level posts with
//! pre-selected content. The resulting work items are shuffled per container
//! only, since containers execute in parallel and a global order would be
//! meaningless. Reply counts are NOT planned here: replies can only target
//! message ids that exist, so they are decided at execution time per
//! successfully-posted message.

use crate::content::ContentPool;
use crate::model::{Actor, Container};
use crate::picker::UsageTracker;
use crate::rng::{range_inclusive, shuffle, RandomSource};

pub const MIN_POSTS_PER_ACTOR: usize = 1;
pub const MAX_POSTS_PER_ACTOR: usize = 3;

/// One planned top-level post, consumed exactly once by the scheduler.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub actor: Actor,
    pub content: String,
}

/// Ordered work for a single container.
#[derive(Debug)]
pub struct ContainerPlan {
    pub container: Container,
    pub items: Vec<WorkItem>,
}

#[derive(Debug, Default)]
pub struct Plan {
    pub containers: Vec<ContainerPlan>,
}

impl Plan {
    pub fn total_items(&self) -> usize {
        self.containers.iter().map(|plan| plan.items.len()).sum()
    }
}

/// Plan posts for every container. Containers without members are omitted.
pub fn build_plan(
    containers: &[Container],
    pool: &ContentPool,
    tracker: &mut UsageTracker,
    rng: &dyn RandomSource,
) -> Plan {
    let mut planned = Vec::new();

    for container in containers {
        let identities = container.posting_identities();
        if identities.is_empty() {
            tracing::debug!("Skipping container '{}' with no members", container.name);
            continue;
        }

        let mut items = Vec::new();
        for actor in &identities {
            let posts = range_inclusive(rng, MIN_POSTS_PER_ACTOR, MAX_POSTS_PER_ACTOR);
            for _ in 0..posts {
                items.push(WorkItem {
                    actor: actor.clone(),
                    content: tracker.pick_top_level(pool, rng),
                });
            }
        }

        shuffle(rng, &mut items);

        tracing::debug!(
            "Planned {} post(s) across {} identit(ies) for '{}'",
            items.len(),
            identities.len(),
            container.name
        );
        planned.push(ContainerPlan {
            container: container.clone(),
            items,
        });
    }

    Plan {
        containers: planned,
    }
}
