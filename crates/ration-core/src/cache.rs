//! TTL memoization of week plans and recipes.
//!
//! Both caches are plain values owned by whoever builds the planner and are
//! shared through an `Arc<Caches>`. Each is bounded: past its capacity the
//! least recently used entry is evicted. Expired entries read as absent and
//! are dropped on the read that finds them and on every insert.

use std::hash::Hash;
use std::num::NonZeroUsize;
use std::time::Duration;

use lru::LruCache;
use tokio::sync::RwLock;
use tokio::time::Instant;

use ration_db::models::Goal;

use crate::plan::{Recipe, WeekPlan};
use crate::profile::NutritionProfile;

pub const DEFAULT_PLAN_TTL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_RECIPE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

pub const DEFAULT_PLAN_CAPACITY: NonZeroUsize = match NonZeroUsize::new(1_000) {
    Some(n) => n,
    None => unreachable!(),
};
pub const DEFAULT_RECIPE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(10_000) {
    Some(n) => n,
    None => unreachable!(),
};

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> Entry<V> {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// A bounded LRU map whose entries expire a fixed time after insertion.
#[derive(Debug)]
pub struct TtlCache<K: Hash + Eq, V> {
    entries: RwLock<LruCache<K, Entry<V>>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, DEFAULT_RECIPE_CAPACITY)
    }

    pub fn with_capacity(ttl: Duration, capacity: NonZeroUsize) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn capacity(&self) -> NonZeroUsize {
        self.entries.read().await.cap()
    }

    /// A live value; marks the entry as recently used.
    pub async fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.write().await;
        let live = entries.get(key)?.is_live(Instant::now());
        if !live {
            entries.pop(key);
            return None;
        }
        entries.get(key).map(|e| e.value.clone())
    }

    /// Insert or replace; the TTL restarts. Expired entries are dropped first.
    pub async fn insert(&self, key: K, value: V) {
        let now = Instant::now();
        let entry = Entry {
            value,
            expires_at: now + self.ttl,
        };
        let mut entries = self.entries.write().await;
        drop_expired(&mut entries, now);
        entries.put(key, entry);
    }

    pub async fn remove(&self, key: &K) -> Option<V> {
        self.entries.write().await.pop(key).map(|e| e.value)
    }

    /// Drop expired entries and return how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        drop_expired(&mut *self.entries.write().await, Instant::now())
    }

    /// Entries held in memory, expired or not.
    pub async fn stored(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .iter()
            .filter(|(_, e)| e.is_live(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn drop_expired<K: Hash + Eq + Clone, V>(entries: &mut LruCache<K, Entry<V>>, now: Instant) -> usize {
    let expired: Vec<K> = entries
        .iter()
        .filter(|(_, e)| !e.is_live(now))
        .map(|(k, _)| k.clone())
        .collect();
    for key in &expired {
        entries.pop(key);
    }
    expired.len()
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// A user together with the exact targets a plan was generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlanCacheKey {
    pub user_id: i64,
    pub daily_calories: u32,
    pub protein_grams: u32,
    pub fat_grams: u32,
    pub carbs_grams: u32,
    pub goal: Goal,
}

impl PlanCacheKey {
    pub fn new(user_id: i64, profile: &NutritionProfile) -> Self {
        Self {
            user_id,
            daily_calories: profile.daily_calories,
            protein_grams: profile.protein_grams,
            fat_grams: profile.fat_grams,
            carbs_grams: profile.carbs_grams,
            goal: profile.goal,
        }
    }
}

/// Meal name (case and spacing folded) plus calories rounded to a whole
/// number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecipeCacheKey {
    pub name: String,
    pub calories: i64,
}

impl RecipeCacheKey {
    pub fn new(name: &str, calories: f64) -> Self {
        Self {
            name: name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase(),
            calories: calories.round() as i64,
        }
    }
}

/// The plan and recipe caches.
#[derive(Debug)]
pub struct Caches {
    pub plans: TtlCache<PlanCacheKey, WeekPlan>,
    pub recipes: TtlCache<RecipeCacheKey, Recipe>,
}

impl Caches {
    pub fn new(plan_ttl: Duration, recipe_ttl: Duration) -> Self {
        Self {
            plans: TtlCache::with_capacity(plan_ttl, DEFAULT_PLAN_CAPACITY),
            recipes: TtlCache::with_capacity(recipe_ttl, DEFAULT_RECIPE_CAPACITY),
        }
    }

    pub async fn purge_expired(&self) -> usize {
        self.plans.purge_expired().await + self.recipes.purge_expired().await
    }
}

impl Default for Caches {
    fn default() -> Self {
        Self::new(DEFAULT_PLAN_TTL, DEFAULT_RECIPE_TTL)
    }
}
