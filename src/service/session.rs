use crate::currency::{currency_symbol, DEFAULT_CURRENCY};
use crate::error::SplitError;
use crate::models::{Allocation, NormalizedItem, Person, ReceiptItem, SplitSummary, PERSON_COLOR_COUNT};
use crate::service::allocation::{summarize, DEFAULT_TIP_PERCENTAGE};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

/// 会话默认保留时长 (自最后一次修改起)
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(4 * 60 * 60);
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;
/// 清理周期下限
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(10);

/// 创建会话的请求体; 扫描响应可原样提交
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewSession {
    pub items: Vec<NormalizedItem>,
    pub currency: Option<String>,
    pub service_charge: Option<f64>,
    pub tip: Option<f64>,
    pub tip_percentage: Option<f64>,
}

/// 一张单据的分摊会话, 只由持有者独占修改
#[derive(Debug, Clone)]
pub struct SplitSession {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub currency: String,
    pub items: Vec<ReceiptItem>,
    pub people: Vec<Person>,
    pub allocations: Allocation,
    pub tip_percentage: f64,
    pub service_charge: f64,
    pub receipt_tip: f64,
    next_person_seq: u64,
    touched_at: DateTime<Utc>,
}

impl SplitSession {
    pub fn new(request: NewSession) -> Result<Self, SplitError> {
        if request.items.is_empty() {
            return Err(SplitError::EmptyReceipt);
        }
        let tip_percentage = request.tip_percentage.unwrap_or(DEFAULT_TIP_PERCENTAGE);
        validate_tip(tip_percentage)?;

        let currency = request
            .currency
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_uppercase)
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            created_at: now,
            currency,
            items: ReceiptItem::from_normalized(&request.items),
            people: Vec::new(),
            allocations: Allocation::new(),
            tip_percentage,
            service_charge: request.service_charge.unwrap_or(0.0).max(0.0),
            receipt_tip: request.tip.unwrap_or(0.0).max(0.0),
            next_person_seq: 1,
            touched_at: now,
        })
    }

    pub fn add_person(&mut self, name: &str) -> Result<Person, SplitError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SplitError::EmptyName);
        }
        let person = Person {
            id: format!("person-{}", self.next_person_seq),
            name: name.to_string(),
            color_index: self.people.len() % PERSON_COLOR_COUNT,
        };
        self.next_person_seq += 1;
        self.people.push(person.clone());
        Ok(person)
    }

    /// 重拍: 明细整体替换, 既有分配全部作废, 人员保留
    pub fn replace_items(&mut self, items: &[NormalizedItem]) -> Result<(), SplitError> {
        if items.is_empty() {
            return Err(SplitError::EmptyReceipt);
        }
        self.items = ReceiptItem::from_normalized(items);
        self.allocations.reset();
        Ok(())
    }

    /// 把已选单位追加给某人
    pub fn assign(&mut self, person_id: &str, selections: &IndexMap<String, u32>) -> Result<u32, SplitError> {
        ensure_person(&self.people, person_id)?;
        self.allocations
            .assign_selection(&self.items, person_id, selections)
    }

    /// 清除某人 (或全部人) 在某明细上的分配
    pub fn clear(&mut self, item_id: &str, person_id: Option<&str>) -> Result<u32, SplitError> {
        find_item(&self.items, item_id)?;
        match person_id {
            Some(person_id) => {
                ensure_person(&self.people, person_id)?;
                Ok(self.allocations.clear_person(item_id, person_id))
            }
            None => Ok(self.allocations.clear_item(item_id)),
        }
    }

    pub fn move_units(&mut self, item_id: &str, from: &str, to: &str, units: u32) -> Result<(), SplitError> {
        let item = find_item(&self.items, item_id)?;
        ensure_person(&self.people, from)?;
        ensure_person(&self.people, to)?;
        self.allocations.move_units(item, from, to, units)
    }

    pub fn reassign(&mut self, item_id: &str, person_id: &str) -> Result<(), SplitError> {
        let item = find_item(&self.items, item_id)?;
        ensure_person(&self.people, person_id)?;
        self.allocations.reassign_item(item, person_id);
        Ok(())
    }

    pub fn set_tip(&mut self, tip_percentage: f64) -> Result<(), SplitError> {
        validate_tip(tip_percentage)?;
        self.tip_percentage = tip_percentage;
        Ok(())
    }

    pub fn summary(&self) -> SplitSummary {
        summarize(&self.items, &self.people, &self.allocations, self.tip_percentage)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let items = self
            .items
            .iter()
            .map(|item| ItemView {
                item: item.clone(),
                allocations: self
                    .allocations
                    .item_allocations(&item.id)
                    .cloned()
                    .unwrap_or_default(),
                allocated: self.allocations.allocated_units(&item.id),
                unallocated: self.allocations.unallocated(item),
                fully_allocated: self.allocations.is_fully_allocated(item),
            })
            .collect();

        SessionSnapshot {
            id: self.id,
            created_at: self.created_at,
            currency_symbol: currency_symbol(&self.currency),
            currency: self.currency.clone(),
            tip_percentage: self.tip_percentage,
            service_charge: self.service_charge,
            receipt_tip: self.receipt_tip,
            items,
            people: self.people.clone(),
            summary: self.summary(),
        }
    }
}

fn find_item<'a>(items: &'a [ReceiptItem], item_id: &str) -> Result<&'a ReceiptItem, SplitError> {
    items
        .iter()
        .find(|i| i.id == item_id)
        .ok_or_else(|| SplitError::UnknownItem(item_id.to_string()))
}

fn ensure_person(people: &[Person], person_id: &str) -> Result<(), SplitError> {
    if people.iter().any(|p| p.id == person_id) {
        Ok(())
    } else {
        Err(SplitError::UnknownPerson(person_id.to_string()))
    }
}

/// 小费比例: 0..=100 的整数
fn validate_tip(tip_percentage: f64) -> Result<(), SplitError> {
    if tip_percentage.is_finite() && (0.0..=100.0).contains(&tip_percentage) && tip_percentage.fract() == 0.0 {
        Ok(())
    } else {
        Err(SplitError::InvalidTip(tip_percentage))
    }
}

/// 明细视图 (含分配状态)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemView {
    #[serde(flatten)]
    pub item: ReceiptItem,
    pub allocations: IndexMap<String, u32>,
    pub allocated: u32,
    pub unallocated: u32,
    pub fully_allocated: bool,
}

/// 会话快照
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub currency: String,
    pub currency_symbol: String,
    pub tip_percentage: f64,
    pub service_charge: f64,
    pub receipt_tip: f64,
    pub items: Vec<ItemView>,
    pub people: Vec<Person>,
    pub summary: SplitSummary,
}

/// 会话存储: 每个会话在 DashMap 分片锁下被独占修改
///
/// 超过保留时长未修改的会话由 [`SessionStore::evict_expired`] 清理;
/// 数量达到上限时创建新会话会先淘汰最久未修改的会话.
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<Uuid, SplitSession>,
    ttl: Duration,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_limits(DEFAULT_SESSION_TTL, DEFAULT_MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(ttl: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
            max_sessions: max_sessions.max(1),
        }
    }

    pub fn create(&self, request: NewSession) -> Result<SessionSnapshot, SplitError> {
        let session = SplitSession::new(request)?;
        if self.sessions.len() >= self.max_sessions {
            self.evict_expired(Utc::now());
            if self.sessions.len() >= self.max_sessions {
                self.evict_oldest();
            }
        }

        let snapshot = session.snapshot();
        tracing::info!(
            "Split session {} created: {} items, {}",
            session.id,
            session.items.len(),
            session.currency
        );
        self.sessions.insert(session.id, session);
        Ok(snapshot)
    }

    pub fn snapshot(&self, id: Uuid) -> Result<SessionSnapshot, SplitError> {
        self.read(id, SplitSession::snapshot)
    }

    pub fn remove(&self, id: Uuid) -> Result<(), SplitError> {
        self.sessions
            .remove(&id)
            .map(|_| tracing::info!("Split session {} removed", id))
            .ok_or(SplitError::SessionNotFound(id))
    }

    pub fn read<T>(&self, id: Uuid, f: impl FnOnce(&SplitSession) -> T) -> Result<T, SplitError> {
        let session = self.sessions.get(&id).ok_or(SplitError::SessionNotFound(id))?;
        Ok(f(session.value()))
    }

    /// 在会话独占锁内执行一次修改, 并刷新其保留时间
    pub fn update<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut SplitSession) -> Result<T, SplitError>,
    ) -> Result<T, SplitError> {
        let mut session = self.sessions.get_mut(&id).ok_or(SplitError::SessionNotFound(id))?;
        session.touched_at = Utc::now();
        f(session.value_mut())
    }

    /// 清理在 `now` 时已超过保留时长的会话, 返回清理数量
    pub fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        let mut evicted = 0;
        self.sessions.retain(|_, session| {
            let expired = (now - session.touched_at)
                .to_std()
                .map_or(false, |idle| idle > self.ttl);
            if expired {
                evicted += 1;
            }
            !expired
        });
        if evicted > 0 {
            tracing::info!("Evicted {} expired split session(s), {} remaining", evicted, self.sessions.len());
        }
        evicted
    }

    fn evict_oldest(&self) {
        let oldest = self
            .sessions
            .iter()
            .min_by_key(|entry| entry.touched_at)
            .map(|entry| *entry.key());
        if let Some(id) = oldest {
            self.sessions.remove(&id);
            tracing::warn!("Session limit {} reached, evicted split session {}", self.max_sessions, id);
        }
    }

    /// 后台定期清理过期会话; 存储被释放后任务自行退出
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let store = Arc::downgrade(self);
        let every = every.max(MIN_SWEEP_INTERVAL);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                store.evict_expired(Utc::now());
            }
        })
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
