//! Ties a run together: fetch the live actor/container listings, resolve
//! them into an immutable snapshot, build a plan and execute it.
//!
//! Listing failures are fatal since there is no meaningful plan without
//! them; everything downstream degrades per item instead.

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};

use crate::api::{ChannelRecord, GroupRecord, MemberRecord, RemoteActions, UserRecord};
use crate::config::PopulatorConfig;
use crate::content::ContentPool;
use crate::handle::derive_handle;
use crate::model::{Actor, Container, ContainerKind};
use crate::picker::UsageTracker;
use crate::planner::build_plan;
use crate::rng::RandomSource;
use crate::scheduler::{RunSummary, Scheduler, TimingProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Timeline posts (with replies) into every group.
    Groups,
    /// Channel messages with reply and like fan-out.
    Channels,
    /// Provision the test accounts listed in the colleagues file.
    CreateActors,
}

impl RunMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "groups" => Some(Self::Groups),
            "channels" => Some(Self::Channels),
            "create-actors" | "create_actors" => Some(Self::CreateActors),
            _ => None,
        }
    }
}

pub struct Engine {
    api: Arc<dyn RemoteActions>,
    config: PopulatorConfig,
    rng: Arc<dyn RandomSource>,
    timing: TimingProfile,
}

impl Engine {
    pub fn new(
        api: Arc<dyn RemoteActions>,
        config: PopulatorConfig,
        rng: Arc<dyn RandomSource>,
    ) -> Self {
        Self {
            api,
            config,
            rng,
            timing: TimingProfile::default(),
        }
    }

    pub fn with_timing(mut self, timing: TimingProfile) -> Self {
        self.timing = timing;
        self
    }

    pub async fn run(&self, mode: RunMode) -> Result<RunSummary> {
        match mode {
            RunMode::Groups => self.populate_groups().await,
            RunMode::Channels => self.populate_channels().await,
            RunMode::CreateActors => self.create_actors().await,
        }
    }

    async fn populate_groups(&self) -> Result<RunSummary> {
        let pool = ContentPool::load("messages", &self.config.messages_file)?;
        let reply_pool = Arc::new(ContentPool::load(
            "chat_replies",
            &self.config.chat_replies_file,
        )?);

        let groups = self
            .api
            .list_groups()
            .await
            .context("Failed to list groups")?;
        let containers: Vec<Container> = groups
            .into_iter()
            .map(|record| self.resolve_group(record))
            .collect();
        tracing::info!("Resolved {} group(s)", containers.len());

        self.execute(containers, &pool, reply_pool, false).await
    }

    async fn populate_channels(&self) -> Result<RunSummary> {
        let pool = ContentPool::load("chat_messages", &self.config.chat_messages_file)?;
        let reply_pool = Arc::new(ContentPool::load(
            "chat_replies",
            &self.config.chat_replies_file,
        )?);

        let users = self
            .api
            .list_actors()
            .await
            .context("Failed to list users")?;
        let channels = self
            .api
            .list_channels()
            .await
            .context("Failed to list channels")?;

        let mut fallback: Vec<Actor> = users
            .iter()
            .filter_map(|record| self.resolve_user(record))
            .collect();
        if let Some(limit) = self.config.actor_limit {
            fallback.truncate(limit);
        }

        let containers: Vec<Container> = channels
            .into_iter()
            .map(|record| self.resolve_channel(record, &fallback))
            .collect();
        tracing::info!("Resolved {} channel(s)", containers.len());

        self.execute(containers, &pool, reply_pool, true).await
    }

    async fn execute(
        &self,
        containers: Vec<Container>,
        pool: &ContentPool,
        reply_pool: Arc<ContentPool>,
        likes: bool,
    ) -> Result<RunSummary> {
        let mut tracker = UsageTracker::new();
        let plan = build_plan(&containers, pool, &mut tracker, self.rng.as_ref());
        tracing::info!(
            "Planned {} post(s) across {} container(s)",
            plan.total_items(),
            plan.containers.len()
        );

        let scheduler = Scheduler::new(
            self.api.clone(),
            reply_pool,
            Arc::new(Mutex::new(tracker)),
            self.rng.clone(),
        )
        .with_timing(self.timing.clone())
        .with_likes(likes);

        Ok(scheduler.execute(plan).await)
    }

    async fn create_actors(&self) -> Result<RunSummary> {
        let names = ContentPool::load("colleagues", &self.config.colleagues_file)?;

        let mut summary = RunSummary::default();
        for name in names.items() {
            match self.api.create_actor(name).await {
                Ok(()) => {
                    tracing::info!("Created user: {}", name);
                    summary.actors_created += 1;
                }
                Err(e) => {
                    tracing::error!("Error creating user {}: {}", name, e);
                    summary.actors_failed += 1;
                }
            }
        }
        Ok(summary)
    }

    fn resolve_member(&self, record: &MemberRecord) -> Option<Actor> {
        match derive_handle(&record.name, &self.config.handle_aliases) {
            Some(handle) => Some(Actor {
                id: record.sui.clone(),
                display_name: record.name.clone(),
                handle,
            }),
            None => {
                tracing::warn!("Could not derive a handle for member: {}", record.name);
                None
            }
        }
    }

    fn resolve_user(&self, record: &UserRecord) -> Option<Actor> {
        match derive_handle(&record.name, &self.config.handle_aliases) {
            Some(handle) => Some(Actor {
                id: record.id.clone(),
                display_name: record.name.clone(),
                handle,
            }),
            None => {
                tracing::warn!("Could not derive a handle for user: {}", record.name);
                None
            }
        }
    }

    fn resolve_group(&self, record: GroupRecord) -> Container {
        Container {
            id: record.social_id,
            name: record.name,
            kind: ContainerKind::Group,
            members: record
                .members
                .iter()
                .filter_map(|member| self.resolve_member(member))
                .collect(),
            admins: record
                .admins
                .iter()
                .filter_map(|member| self.resolve_member(member))
                .collect(),
        }
    }

    /// Channels list their own roster when the instance provides one; older
    /// instances return empty rosters, where the listed users stand in.
    fn resolve_channel(&self, record: ChannelRecord, fallback: &[Actor]) -> Container {
        let members: Vec<Actor> = if record.members.is_empty() {
            fallback.to_vec()
        } else {
            record
                .members
                .iter()
                .filter_map(|member| {
                    match derive_handle(&member.name, &self.config.handle_aliases) {
                        Some(handle) => Some(Actor {
                            id: member.id.clone(),
                            display_name: member.name.clone(),
                            handle,
                        }),
                        None => {
                            tracing::warn!(
                                "Could not derive a handle for channel member: {}",
                                member.name
                            );
                            None
                        }
                    }
                })
                .collect()
        };

        Container {
            id: record.id,
            name: record.name,
            kind: ContainerKind::Channel,
            members,
            admins: Vec::new(),
        }
    }
}
