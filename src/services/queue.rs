//! Queue service — admits waiting participants and groups them into chats.
//!
//! DESIGN
//! ======
//! The service owns two tables: queue items keyed by queue ID and chat
//! groups keyed by group ID. Items refer to their group by ID only; the
//! group owns membership. Clients advance their own item by polling
//! `find_match`, which runs one step of this state machine:
//!
//! - `StartingSearch`: join the oldest open group of the same company with a
//!   free seat, or open a new group with a fresh chat URL.
//! - `WaitingForGroupToFill`: purge silent members of the group, then close
//!   the group if it is full, or if it has held the minimum number of
//!   members for long enough. Once closed, the poller receives the chat URL
//!   and its item leaves the table.
//!
//! CONCURRENCY
//! ===========
//! Both tables sit behind one mutex, held for exactly one step and never
//! across an await. Two pollers therefore can never take the same seat or
//! close the same group twice. All timeouts are evaluated lazily on the
//! next call; there is no background sweeper.

use std::collections::HashMap;
use std::fmt::Write;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rand::Rng;
use serde::Serialize;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::MatchConfig;
use crate::metrics::{self, MetricsSink};
use crate::services::notification::NotificationTrigger;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("queueId unknown: {0}")]
    NotFound(Uuid),
    #[error("{0} empty")]
    MissingField(&'static str),
}

/// Where a participant is in the matching process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchState {
    StartingSearch,
    WaitingForGroupToFill,
    GroupFull,
}

/// One waiting participant.
#[derive(Debug, Clone)]
pub struct QueueItem {
    pub queue_id: Uuid,
    pub state: MatchState,
    pub initial_request: Instant,
    pub last_request: Instant,
    pub user_name: String,
    pub company_name: String,
    pub subscription_id: Option<Uuid>,
    pub chat_group_id: Option<Uuid>,
    pub chat_url: Option<String>,
    pub chat_partners: Option<String>,
    company_key: String,
}

#[derive(Debug, Clone)]
pub struct GroupMember {
    pub queue_id: Uuid,
    pub user_name: String,
}

/// A forming or started chat.
#[derive(Debug, Clone)]
pub struct ChatGroup {
    pub chat_group_id: Uuid,
    pub company_name: String,
    pub chat_url: String,
    /// Join order.
    pub members: Vec<GroupMember>,
    pub last_member_added: Instant,
    /// `None` until membership first reaches the minimum group size.
    pub minimum_members_reached: Option<Instant>,
    pub chat_started: bool,
    company_key: String,
    /// Creation order; the oldest eligible group is joined first.
    seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseReason {
    Full,
    WaitedLongEnough,
}

/// Returned from `add`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueTicket {
    pub queue_id: Uuid,
    pub user_name: String,
    pub company_name: String,
}

/// Returned from `find_match`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResponse {
    pub match_result: MatchState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_partners: Option<String>,
}

impl MatchResponse {
    fn pending(state: MatchState) -> Self {
        Self { match_result: state, chat_url: None, chat_partners: None }
    }

    fn from_item(item: &QueueItem) -> Self {
        Self { match_result: item.state, chat_url: item.chat_url.clone(), chat_partners: item.chat_partners.clone() }
    }
}

/// Case-folded company name used for every company comparison.
#[must_use]
pub fn company_key(company_name: &str) -> String {
    company_name.to_lowercase()
}

// =============================================================================
// GROUP RULES
// =============================================================================

impl ChatGroup {
    fn is_open_to(&self, company_key: &str, max_group_size: usize) -> bool {
        !self.chat_started && self.company_key == company_key && self.members.len() < max_group_size
    }

    fn add_member(&mut self, member: GroupMember, now: Instant, min_group_size: usize) {
        self.members.push(member);
        self.last_member_added = now;
        if self.minimum_members_reached.is_none() && self.members.len() >= min_group_size {
            self.minimum_members_reached = Some(now);
        }
    }

    fn close_reason(&self, now: Instant, config: &MatchConfig) -> Option<CloseReason> {
        if self.members.len() >= config.max_group_size {
            return Some(CloseReason::Full);
        }
        let waited_long_enough = self
            .minimum_members_reached
            .is_some_and(|reached| now.saturating_duration_since(reached) >= config.max_wait_for_full_group);
        if self.members.len() >= config.min_group_size && waited_long_enough {
            return Some(CloseReason::WaitedLongEnough);
        }
        None
    }

    /// Every member's name except `queue_id`'s, in join order. `None` for a
    /// group of one.
    fn partners_of(&self, queue_id: Uuid) -> Option<String> {
        let partners: Vec<&str> = self
            .members
            .iter()
            .filter(|m| m.queue_id != queue_id)
            .map(|m| m.user_name.as_str())
            .collect();
        (!partners.is_empty()).then(|| partners.join(", "))
    }
}

// =============================================================================
// TABLES
// =============================================================================

#[derive(Default)]
struct QueueTables {
    items: HashMap<Uuid, QueueItem>,
    groups: HashMap<Uuid, ChatGroup>,
    next_group_seq: u64,
}

impl QueueTables {
    /// Drop entries nobody has polled for `ttl` and reclaim groups left
    /// without any member in the queue.
    fn evict_stale(&mut self, now: Instant, ttl: Duration) {
        let before = self.items.len();
        self.items
            .retain(|_, item| now.saturating_duration_since(item.last_request) <= ttl);
        let evicted = before - self.items.len();

        let items = &self.items;
        self.groups.retain(|_, group| {
            if !group.chat_started {
                group.members.retain(|m| items.contains_key(&m.queue_id));
            }
            group.members.iter().any(|m| items.contains_key(&m.queue_id))
        });

        if evicted > 0 {
            info!(evicted, "evicted stale queue entries");
        }
    }

    fn open_group(&mut self, company_name: &str, company_key: &str, now: Instant, config: &MatchConfig) -> Uuid {
        let chat_group_id = Uuid::new_v4();
        let group = ChatGroup {
            chat_group_id,
            company_name: company_name.to_string(),
            chat_url: generate_chat_url(&config.chat_base_url, company_name),
            members: Vec::new(),
            last_member_added: now,
            minimum_members_reached: None,
            chat_started: false,
            company_key: company_key.to_string(),
            seq: self.next_group_seq,
        };
        self.next_group_seq += 1;
        info!(%chat_group_id, company = company_name, chat_url = %group.chat_url, "chat group opened");
        self.groups.insert(chat_group_id, group);
        chat_group_id
    }

    /// `StartingSearch` step: seat the item in a group.
    fn seat(&mut self, queue_id: Uuid, now: Instant, config: &MatchConfig) -> Result<MatchResponse, QueueError> {
        let (user_name, company_name, key) = {
            let item = self.items.get(&queue_id).ok_or(QueueError::NotFound(queue_id))?;
            (item.user_name.clone(), item.company_name.clone(), item.company_key.clone())
        };

        let existing = self
            .groups
            .values()
            .filter(|g| g.is_open_to(&key, config.max_group_size))
            .min_by_key(|g| g.seq)
            .map(|g| g.chat_group_id);
        let chat_group_id = match existing {
            Some(id) => id,
            None => self.open_group(&company_name, &key, now, config),
        };

        if let Some(group) = self.groups.get_mut(&chat_group_id) {
            group.add_member(GroupMember { queue_id, user_name }, now, config.min_group_size);
            debug!(%queue_id, %chat_group_id, members = group.members.len(), "joined chat group");
        }
        if let Some(item) = self.items.get_mut(&queue_id) {
            item.state = MatchState::WaitingForGroupToFill;
            item.chat_group_id = Some(chat_group_id);
        }

        Ok(MatchResponse::pending(MatchState::StartingSearch))
    }

    /// `WaitingForGroupToFill` step: purge, maybe close, maybe deliver.
    fn advance(
        &mut self,
        queue_id: Uuid,
        now: Instant,
        config: &MatchConfig,
        sink: &dyn MetricsSink,
    ) -> Result<MatchResponse, QueueError> {
        let Self { items, groups, .. } = self;
        let item = items.get(&queue_id).ok_or(QueueError::NotFound(queue_id))?;

        let Some(group) = item.chat_group_id.and_then(|id| groups.get_mut(&id)) else {
            error!(%queue_id, chat_group_id = ?item.chat_group_id, "waiting queue item has no chat group");
            debug_assert!(false, "waiting queue item {queue_id} has no chat group");
            return Ok(MatchResponse::pending(MatchState::WaitingForGroupToFill));
        };

        if !group.chat_started {
            let evicted = purge_inactive(group, items, queue_id, now, config.inactivity_timeout);
            for id in &evicted {
                if let Some(member) = items.get_mut(id) {
                    member.state = MatchState::StartingSearch;
                    member.chat_group_id = None;
                }
                sink.increment(metrics::GROUP_MEMBER_PURGED);
                info!(queue_id = %id, chat_group_id = %group.chat_group_id, "purged inactive member");
            }

            let Some(reason) = group.close_reason(now, config) else {
                return Ok(MatchResponse::pending(MatchState::WaitingForGroupToFill));
            };
            group.chat_started = true;
            sink.increment(match reason {
                CloseReason::Full => metrics::GROUP_CLOSED_FULL,
                CloseReason::WaitedLongEnough => metrics::GROUP_CLOSED_TIMEOUT,
            });
            info!(
                chat_group_id = %group.chat_group_id,
                company = %group.company_name,
                members = group.members.len(),
                since_last_join_ms = u64::try_from(now.saturating_duration_since(group.last_member_added).as_millis())
                    .unwrap_or(u64::MAX),
                ?reason,
                "chat group started"
            );
        }

        let chat_url = group.chat_url.clone();
        let chat_partners = group.partners_of(queue_id);
        let chat_group_id = group.chat_group_id;

        let Some(mut item) = items.remove(&queue_id) else {
            return Err(QueueError::NotFound(queue_id));
        };
        item.state = MatchState::GroupFull;
        item.chat_url = Some(chat_url);
        item.chat_partners = chat_partners;

        let latency_ms = u64::try_from(now.saturating_duration_since(item.initial_request).as_millis()).unwrap_or(u64::MAX);
        sink.measure(metrics::MATCH_LATENCY_MS, latency_ms);
        info!(%queue_id, %chat_group_id, latency_ms, "match delivered");

        if group.members.iter().all(|m| !items.contains_key(&m.queue_id)) {
            groups.remove(&chat_group_id);
            debug!(%chat_group_id, "chat group reclaimed");
        }

        Ok(MatchResponse::from_item(&item))
    }
}

/// Remove members of an open group that stopped polling. The poller itself
/// is never purged. Returns the IDs removed.
fn purge_inactive(
    group: &mut ChatGroup,
    items: &HashMap<Uuid, QueueItem>,
    poller: Uuid,
    now: Instant,
    inactivity_timeout: Duration,
) -> Vec<Uuid> {
    let mut evicted = Vec::new();
    group.members.retain(|m| {
        let active = m.queue_id == poller
            || items
                .get(&m.queue_id)
                .is_some_and(|it| now.saturating_duration_since(it.last_request) <= inactivity_timeout);
        if !active {
            evicted.push(m.queue_id);
        }
        active
    });
    evicted
}

/// Build a chat-room URL: `{base}/{company-slug}-{8 hex chars}`.
pub(crate) fn generate_chat_url(base_url: &str, company_name: &str) -> String {
    let slug: String = company_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let suffix: [u8; 4] = rand::rng().random();
    let mut url = format!("{base_url}/{slug}-");
    for b in suffix {
        let _ = write!(url, "{b:02x}");
    }
    url
}

// =============================================================================
// SERVICE
// =============================================================================

/// Shared handle to the queue. Clone is cheap; all clones see the same tables.
#[derive(Clone)]
pub struct QueueService {
    tables: Arc<Mutex<QueueTables>>,
    config: Arc<MatchConfig>,
    metrics: Arc<dyn MetricsSink>,
    notifier: Arc<NotificationTrigger>,
}

impl QueueService {
    #[must_use]
    pub fn new(config: MatchConfig, metrics: Arc<dyn MetricsSink>, notifier: Arc<NotificationTrigger>) -> Self {
        Self { tables: Arc::new(Mutex::new(QueueTables::default())), config: Arc::new(config), metrics, notifier }
    }

    #[must_use]
    pub fn notifier(&self) -> &NotificationTrigger {
        &self.notifier
    }

    /// Enter the queue, then give the notification trigger a chance to tell
    /// subscribers of the company.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::MissingField`] if a name is empty.
    pub async fn add(
        &self,
        user_name: &str,
        company_name: &str,
        subscription_id: Option<Uuid>,
    ) -> Result<QueueTicket, QueueError> {
        let ticket = self.enqueue_at(user_name, company_name, subscription_id, Instant::now())?;
        let outcome = self
            .notifier
            .notify_arrival(user_name, company_name, subscription_id)
            .await;
        debug!(queue_id = %ticket.queue_id, ?outcome, "notification trigger evaluated");
        Ok(ticket)
    }

    pub(crate) fn enqueue_at(
        &self,
        user_name: &str,
        company_name: &str,
        subscription_id: Option<Uuid>,
        now: Instant,
    ) -> Result<QueueTicket, QueueError> {
        if user_name.trim().is_empty() {
            return Err(QueueError::MissingField("userName"));
        }
        if company_name.trim().is_empty() {
            return Err(QueueError::MissingField("companyName"));
        }

        let item = QueueItem {
            queue_id: Uuid::new_v4(),
            state: MatchState::StartingSearch,
            initial_request: now,
            last_request: now,
            user_name: user_name.to_string(),
            company_name: company_name.to_string(),
            subscription_id,
            chat_group_id: None,
            chat_url: None,
            chat_partners: None,
            company_key: company_key(company_name),
        };
        let ticket = QueueTicket {
            queue_id: item.queue_id,
            user_name: item.user_name.clone(),
            company_name: item.company_name.clone(),
        };

        {
            let mut tables = self.lock();
            tables.evict_stale(now, self.config.stale_entry_ttl);
            info!(
                queue_id = %item.queue_id,
                company = %item.company_name,
                subscription_id = ?item.subscription_id,
                queued = tables.items.len() + 1,
                "participant entered queue"
            );
            tables.items.insert(item.queue_id, item);
        }
        self.metrics.increment(metrics::QUEUE_ENTERED);

        Ok(ticket)
    }

    /// Advance the caller's queue item by one step.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::NotFound`] if the ID was never issued or has
    /// already received its chat URL.
    pub fn find_match(&self, queue_id: Uuid) -> Result<MatchResponse, QueueError> {
        self.find_match_at(queue_id, Instant::now())
    }

    pub(crate) fn find_match_at(&self, queue_id: Uuid, now: Instant) -> Result<MatchResponse, QueueError> {
        let mut tables = self.lock();
        let state = {
            let item = tables
                .items
                .get_mut(&queue_id)
                .ok_or(QueueError::NotFound(queue_id))?;
            item.last_request = now;
            item.state
        };

        match state {
            MatchState::StartingSearch => tables.seat(queue_id, now, &self.config),
            MatchState::WaitingForGroupToFill => tables.advance(queue_id, now, &self.config, self.metrics.as_ref()),
            MatchState::GroupFull => {
                error!(%queue_id, "delivered queue item still in table");
                debug_assert!(false, "delivered queue item {queue_id} still in table");
                tables
                    .items
                    .get(&queue_id)
                    .map(MatchResponse::from_item)
                    .ok_or(QueueError::NotFound(queue_id))
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueTables> {
        self.tables
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "queue_test.rs"]
mod tests;
