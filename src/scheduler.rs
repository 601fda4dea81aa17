//! Replays an interaction plan against the remote actions with the timing
//! shape of real usage.
//!
//! Containers run as independent concurrent tasks. Within one container,
//! posts are strictly sequential with a jittered pause between them, so the
//! container's feed reads like a believable timeline. Each successful post
//! fans out a staggered burst of concurrent reply tasks (and, when enabled,
//! like tasks); the container waits for the whole burst before moving on.
//! Failures are absorbed at the smallest unit: a failed post is skipped with
//! nothing planned against it, a failed reply or like never disturbs its
//! siblings.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures_util::future::join_all;
use tokio::time::sleep;

use crate::api::RemoteActions;
use crate::content::ContentPool;
use crate::model::{Actor, Container, MessageId, PostedMessage};
use crate::picker::UsageTracker;
use crate::planner::{ContainerPlan, Plan};
use crate::rng::{jitter, range_inclusive, shuffle, RandomSource};

pub const MAX_REPLIES_PER_MESSAGE: usize = 8;
const MIN_LIKERS_PER_MESSAGE: usize = 2;

/// Delay shape of one run. All delays in milliseconds; `instant()` zeroes
/// everything for deterministic tests.
#[derive(Debug, Clone)]
pub struct TimingProfile {
    /// Pause between consecutive posts in one container.
    pub post_gap_ms: (u64, u64),
    /// Base delay of each reply task before its stagger step.
    pub reply_base_ms: (u64, u64),
    /// Extra delay per reply index, spreading the burst out.
    pub reply_step_ms: u64,
    /// Delay per like index.
    pub like_step_ms: u64,
}

impl Default for TimingProfile {
    fn default() -> Self {
        Self {
            post_gap_ms: (1000, 2000),
            reply_base_ms: (500, 1500),
            reply_step_ms: 200,
            like_step_ms: 50,
        }
    }
}

impl TimingProfile {
    pub fn instant() -> Self {
        Self {
            post_gap_ms: (0, 0),
            reply_base_ms: (0, 0),
            reply_step_ms: 0,
            like_step_ms: 0,
        }
    }
}

/// A reply decided at execution time against a message that exists.
#[derive(Debug, Clone)]
pub struct ReplyWorkItem {
    pub parent: MessageId,
    pub actor: Actor,
    pub content: String,
    /// Position in the burst; drives the stagger delay.
    pub order_index: usize,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub posted: Vec<PostedMessage>,
    pub skipped_posts: usize,
    pub replies_sent: usize,
    pub replies_failed: usize,
    pub likes_sent: usize,
    pub likes_failed: usize,
    pub actors_created: usize,
    pub actors_failed: usize,
}

impl RunSummary {
    fn merge(&mut self, other: RunSummary) {
        self.posted.extend(other.posted);
        self.skipped_posts += other.skipped_posts;
        self.replies_sent += other.replies_sent;
        self.replies_failed += other.replies_failed;
        self.likes_sent += other.likes_sent;
        self.likes_failed += other.likes_failed;
        self.actors_created += other.actors_created;
        self.actors_failed += other.actors_failed;
    }
}

/// Reply-count draw for one posted message: uniform over `{0..=8}`, zero
/// included so some messages stay unanswered.
pub fn draw_reply_count(rng: &dyn RandomSource) -> usize {
    rng.roll(MAX_REPLIES_PER_MESSAGE + 1)
}

#[derive(Clone)]
struct TaskContext {
    api: Arc<dyn RemoteActions>,
    reply_pool: Arc<ContentPool>,
    tracker: Arc<Mutex<UsageTracker>>,
    rng: Arc<dyn RandomSource>,
    timing: TimingProfile,
    likes: bool,
}

impl TaskContext {
    fn lock_tracker(&self) -> MutexGuard<'_, UsageTracker> {
        self.tracker.lock().unwrap_or_else(|e| e.into_inner())
    }
}

pub struct Scheduler {
    ctx: TaskContext,
}

impl Scheduler {
    pub fn new(
        api: Arc<dyn RemoteActions>,
        reply_pool: Arc<ContentPool>,
        tracker: Arc<Mutex<UsageTracker>>,
        rng: Arc<dyn RandomSource>,
    ) -> Self {
        Self {
            ctx: TaskContext {
                api,
                reply_pool,
                tracker,
                rng,
                timing: TimingProfile::default(),
                likes: false,
            },
        }
    }

    pub fn with_timing(mut self, timing: TimingProfile) -> Self {
        self.ctx.timing = timing;
        self
    }

    /// Enable the like fan-out after each message's replies resolve.
    pub fn with_likes(mut self, likes: bool) -> Self {
        self.ctx.likes = likes;
        self
    }

    /// Run every container's work to completion. Containers proceed in
    /// parallel; the run finishes only when all of them have, regardless of
    /// per-item failures along the way.
    pub async fn execute(&self, plan: Plan) -> RunSummary {
        let mut handles = Vec::with_capacity(plan.containers.len());
        for container_plan in plan.containers {
            let ctx = self.ctx.clone();
            handles.push(tokio::spawn(run_container(ctx, container_plan)));
        }

        let mut summary = RunSummary::default();
        for result in join_all(handles).await {
            match result {
                Ok(partial) => summary.merge(partial),
                Err(e) => tracing::error!("Container task failed to complete: {}", e),
            }
        }
        summary
    }
}

async fn run_container(ctx: TaskContext, plan: ContainerPlan) -> RunSummary {
    let ContainerPlan { container, items } = plan;
    let mut summary = RunSummary::default();
    let total = items.len();

    tracing::info!("Populating '{}' with {} post(s)", container.name, total);

    for (index, item) in items.into_iter().enumerate() {
        match ctx
            .api
            .post_message(&container, &item.actor.handle, &item.content)
            .await
        {
            Ok(id) => {
                tracing::info!(
                    "Posted message {} to '{}' as {}",
                    id,
                    container.name,
                    item.actor.handle
                );
                summary.posted.push(PostedMessage {
                    id: id.clone(),
                    container_id: container.id.clone(),
                    author: item.actor.clone(),
                });

                let (sent, failed) = fan_out_replies(&ctx, &container, &item.actor, &id).await;
                summary.replies_sent += sent;
                summary.replies_failed += failed;

                if ctx.likes {
                    let (sent, failed) = fan_out_likes(&ctx, &container, &item.actor, &id).await;
                    summary.likes_sent += sent;
                    summary.likes_failed += failed;
                }
            }
            Err(e) => {
                tracing::warn!(
                    "Skipping post to '{}' as {}: {}",
                    container.name,
                    item.actor.handle,
                    e
                );
                summary.skipped_posts += 1;
            }
        }

        if index + 1 < total {
            let gap = jitter(
                ctx.rng.as_ref(),
                ctx.timing.post_gap_ms.0,
                ctx.timing.post_gap_ms.1,
            );
            sleep(gap).await;
        }
    }

    summary
}

/// Launch one concurrent reply task per selected actor and wait for the
/// whole burst. Tasks start in index order; their staggered delays mean they
/// may complete in any order.
async fn fan_out_replies(
    ctx: &TaskContext,
    container: &Container,
    author: &Actor,
    parent: &MessageId,
) -> (usize, usize) {
    let count = draw_reply_count(ctx.rng.as_ref());
    if count == 0 {
        return (0, 0);
    }

    let mut candidates = container.interaction_candidates(author);
    if candidates.is_empty() {
        return (0, 0);
    }
    shuffle(ctx.rng.as_ref(), &mut candidates);
    candidates.truncate(count);

    let mut handles = Vec::with_capacity(candidates.len());
    for (order_index, actor) in candidates.into_iter().enumerate() {
        let content = ctx
            .lock_tracker()
            .pick_reply(&ctx.reply_pool, ctx.rng.as_ref(), parent);
        let item = ReplyWorkItem {
            parent: parent.clone(),
            actor,
            content,
            order_index,
        };
        let task_ctx = ctx.clone();

        handles.push(tokio::spawn(async move {
            let delay = jitter(
                task_ctx.rng.as_ref(),
                task_ctx.timing.reply_base_ms.0,
                task_ctx.timing.reply_base_ms.1,
            ) + Duration::from_millis(task_ctx.timing.reply_step_ms * item.order_index as u64);
            sleep(delay).await;

            match task_ctx
                .api
                .post_reply(&item.parent, &item.actor.handle, &item.content)
                .await
            {
                Ok(()) => {
                    tracing::debug!("{} replied to message {}", item.actor.handle, item.parent);
                    true
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed reply to message {} as {}: {}",
                        item.parent,
                        item.actor.handle,
                        e
                    );
                    false
                }
            }
        }));
    }

    join_outcomes(handles).await
}

/// Like burst for one message: between `MIN_LIKERS_PER_MESSAGE` and every
/// eligible actor, short fixed stagger. Skipped entirely when too few actors
/// are available.
async fn fan_out_likes(
    ctx: &TaskContext,
    container: &Container,
    author: &Actor,
    parent: &MessageId,
) -> (usize, usize) {
    let mut candidates = container.interaction_candidates(author);
    if candidates.len() < MIN_LIKERS_PER_MESSAGE {
        return (0, 0);
    }
    let count = range_inclusive(ctx.rng.as_ref(), MIN_LIKERS_PER_MESSAGE, candidates.len());
    shuffle(ctx.rng.as_ref(), &mut candidates);
    candidates.truncate(count);

    let mut handles = Vec::with_capacity(candidates.len());
    for (order_index, actor) in candidates.into_iter().enumerate() {
        let parent = parent.clone();
        let task_ctx = ctx.clone();

        handles.push(tokio::spawn(async move {
            sleep(Duration::from_millis(
                task_ctx.timing.like_step_ms * order_index as u64,
            ))
            .await;

            match task_ctx.api.like_message(&parent, &actor.handle).await {
                Ok(()) => {
                    tracing::debug!("{} liked message {}", actor.handle, parent);
                    true
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed like on message {} as {}: {}",
                        parent,
                        actor.handle,
                        e
                    );
                    false
                }
            }
        }));
    }

    join_outcomes(handles).await
}

async fn join_outcomes(handles: Vec<tokio::task::JoinHandle<bool>>) -> (usize, usize) {
    let mut sent = 0;
    let mut failed = 0;
    for result in join_all(handles).await {
        match result {
            Ok(true) => sent += 1,
            Ok(false) => failed += 1,
            Err(e) => {
                tracing::error!("Interaction task failed to complete: {}", e);
                failed += 1;
            }
        }
    }
    (sent, failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{Call, MockApi};
    use crate::content::ContentPool;
    use crate::model::ContainerKind;
    use crate::planner::WorkItem;
    use crate::rng::{ScriptedRandom, SeededRandom};
    use std::collections::HashSet;

    fn actor(handle: &str) -> Actor {
        Actor {
            id: format!("255.{}", handle),
            display_name: handle.to_string(),
            handle: handle.to_string(),
        }
    }

    fn container(id: &str, members: Vec<Actor>) -> Container {
        Container {
            id: id.to_string(),
            name: format!("container {}", id),
            kind: ContainerKind::Channel,
            members,
            admins: Vec::new(),
        }
    }

    fn reply_pool() -> Arc<ContentPool> {
        Arc::new(
            ContentPool::from_items(
                "chat_replies",
                (0..30).map(|i| format!("reply {}", i)).collect(),
            )
            .unwrap(),
        )
    }

    fn scheduler_with(api: Arc<MockApi>, rng: Arc<dyn RandomSource>) -> Scheduler {
        Scheduler::new(
            api,
            reply_pool(),
            Arc::new(Mutex::new(UsageTracker::new())),
            rng,
        )
        .with_timing(TimingProfile::instant())
    }

    fn single_actor_plan(posts: usize) -> Plan {
        let poster = actor("karinl");
        let c = container("436.ch1", vec![poster.clone()]);
        let items = (0..posts)
            .map(|i| WorkItem {
                actor: poster.clone(),
                content: format!("message {}", i),
            })
            .collect();
        Plan {
            containers: vec![ContainerPlan {
                container: c,
                items,
            }],
        }
    }

    #[tokio::test]
    async fn lone_member_posts_sequentially_with_no_fanout() {
        let api = Arc::new(MockApi::default());
        // Reply-count draws resolve to zero once the scripted rolls run dry.
        let rng: Arc<dyn RandomSource> = Arc::new(ScriptedRandom::new(&[]));
        let scheduler = scheduler_with(api.clone(), rng);

        let summary = scheduler.execute(single_actor_plan(2)).await;

        assert_eq!(summary.posted.len(), 2);
        assert_eq!(summary.skipped_posts, 0);
        assert_eq!(summary.replies_sent, 0);

        let calls = api.recorded_calls();
        assert_eq!(calls.len(), 2);
        assert!(calls
            .iter()
            .all(|call| matches!(call, Call::Post { handle, .. } if handle == "karinl")));
    }

    #[tokio::test]
    async fn failed_post_is_skipped_and_attracts_no_replies() {
        let api = Arc::new(MockApi::default());
        api.failing_posts
            .store(1, std::sync::atomic::Ordering::SeqCst);
        // Force the maximum reply draw on every message so a reply would
        // certainly have been planned had the post succeeded.
        let rng: Arc<dyn RandomSource> = Arc::new(ScriptedRandom::new(&[
            MAX_REPLIES_PER_MESSAGE,
            MAX_REPLIES_PER_MESSAGE,
        ]));

        let members = vec![actor("karinl"), actor("jonasb"), actor("miriams")];
        let c = container("436.ch1", members.clone());
        let plan = Plan {
            containers: vec![ContainerPlan {
                container: c,
                items: vec![
                    WorkItem {
                        actor: members[0].clone(),
                        content: "first".to_string(),
                    },
                    WorkItem {
                        actor: members[0].clone(),
                        content: "second".to_string(),
                    },
                ],
            }],
        };

        let scheduler = scheduler_with(api.clone(), rng);
        let summary = scheduler.execute(plan).await;

        assert_eq!(summary.skipped_posts, 1);
        assert_eq!(summary.posted.len(), 1);

        // Every reply targets the id of the one successful post.
        let posted_ids: HashSet<String> = api.posted_ids().into_iter().collect();
        assert_eq!(posted_ids.len(), 1);
        let calls = api.recorded_calls();
        let reply_targets: Vec<&String> = calls
            .iter()
            .filter_map(|call| match call {
                Call::Reply { message_id, .. } => Some(message_id),
                _ => None,
            })
            .collect();
        assert!(!reply_targets.is_empty());
        assert!(reply_targets.iter().all(|id| posted_ids.contains(*id)));
    }

    #[tokio::test]
    async fn second_post_starts_only_after_first_fanout_resolves() {
        let api = Arc::new(MockApi::default());
        // First message: 2 replies (roll 2), one shuffle roll, two content
        // picks; second message draws zero replies once the script runs dry.
        let rng: Arc<dyn RandomSource> = Arc::new(ScriptedRandom::new(&[2, 1, 0, 5]));

        let members = vec![actor("karinl"), actor("jonasb"), actor("miriams")];
        let c = container("436.ch1", members.clone());
        let plan = Plan {
            containers: vec![ContainerPlan {
                container: c,
                items: vec![
                    WorkItem {
                        actor: members[0].clone(),
                        content: "first".to_string(),
                    },
                    WorkItem {
                        actor: members[1].clone(),
                        content: "second".to_string(),
                    },
                ],
            }],
        };

        let scheduler = scheduler_with(api.clone(), rng);
        let summary = scheduler.execute(plan).await;
        assert_eq!(summary.posted.len(), 2);
        assert_eq!(summary.replies_sent, 2);

        // Call order proves the barrier: both replies to the first message
        // land before the second post starts.
        let calls = api.recorded_calls();
        let second_post_index = calls
            .iter()
            .position(
                |call| matches!(call, Call::Post { content, .. } if content == "second"),
            )
            .unwrap();
        let reply_indices: Vec<usize> = calls
            .iter()
            .enumerate()
            .filter_map(|(i, call)| matches!(call, Call::Reply { .. }).then_some(i))
            .collect();
        assert_eq!(reply_indices.len(), 2);
        assert!(reply_indices.iter().all(|i| *i < second_post_index));
    }

    #[tokio::test]
    async fn likes_are_fanned_out_when_enabled() {
        let api = Arc::new(MockApi::default());
        let rng: Arc<dyn RandomSource> = Arc::new(SeededRandom::from_seed(4242));

        let members: Vec<Actor> = (0..6).map(|i| actor(&format!("user{}", i))).collect();
        let c = container("436.ch1", members.clone());
        let plan = Plan {
            containers: vec![ContainerPlan {
                container: c,
                items: vec![WorkItem {
                    actor: members[0].clone(),
                    content: "hello".to_string(),
                }],
            }],
        };

        let scheduler = scheduler_with(api.clone(), rng).with_likes(true);
        let summary = scheduler.execute(plan).await;

        assert_eq!(summary.posted.len(), 1);
        assert!(summary.likes_sent >= MIN_LIKERS_PER_MESSAGE);

        let calls = api.recorded_calls();
        let likers: Vec<&String> = calls
            .iter()
            .filter_map(|call| match call {
                Call::Like { handle, .. } => Some(handle),
                _ => None,
            })
            .collect();
        // Authors never like their own message, and likers are distinct.
        assert!(likers.iter().all(|handle| *handle != "user0"));
        let distinct: HashSet<&String> = likers.iter().copied().collect();
        assert_eq!(distinct.len(), likers.len());
    }

    #[tokio::test]
    async fn containers_all_complete_even_with_failures() {
        let api = Arc::new(MockApi::default());
        api.failing_posts
            .store(2, std::sync::atomic::Ordering::SeqCst);
        let rng: Arc<dyn RandomSource> = Arc::new(SeededRandom::from_seed(8));

        let plan = Plan {
            containers: (0..4)
                .map(|i| {
                    let member = actor(&format!("user{}", i));
                    ContainerPlan {
                        container: container(&format!("436.ch{}", i), vec![member.clone()]),
                        items: vec![WorkItem {
                            actor: member,
                            content: format!("hello from {}", i),
                        }],
                    }
                })
                .collect(),
        };

        let scheduler = scheduler_with(api.clone(), rng);
        let summary = scheduler.execute(plan).await;

        assert_eq!(summary.posted.len() + summary.skipped_posts, 4);
        assert_eq!(summary.skipped_posts, 2);
    }

    #[test]
    fn reply_counts_are_uniform_over_zero_to_eight() {
        let rng = SeededRandom::from_seed(20260806);
        let mut buckets = [0usize; MAX_REPLIES_PER_MESSAGE + 1];
        let draws = 9000;
        for _ in 0..draws {
            buckets[draw_reply_count(&rng)] += 1;
        }
        let expected = draws / buckets.len();
        for (count, bucket) in buckets.iter().enumerate() {
            assert!(
                (*bucket as i64 - expected as i64).unsigned_abs() < (expected / 5) as u64,
                "reply count {} drawn {} times, expected about {}",
                count,
                bucket,
                expected
            );
        }
    }
}
