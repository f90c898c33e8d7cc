//! TTL'd shared state: cached matchmaker solutions, the NFT status board,
//! submitter locks, and the score-sorted solution sets the authorization
//! submitter picks from.

use {
    crate::domain::{eth, intent::Intent, solution},
    chrono::{DateTime, Utc},
    moka::future::Cache,
    std::{
        collections::{BTreeMap, HashMap, HashSet},
        sync::{Arc, Mutex},
        time::Duration,
    },
    uuid::Uuid,
};

/// Cached matchmaker solutions live for four block times, bounding how long
/// a matchmaker round-trip may take.
const SOLUTION_TTL: Duration = Duration::from_secs(48);

/// Status board entries are kept around for an hour.
const STATUS_TTL: Duration = Duration::from_secs(3600);

/// A solution posted to the matchmaker, cached under the UUID handed out so
/// the authorization callback can resume the job.
#[derive(Clone, Debug)]
pub struct CachedSolution {
    pub intent: Intent,
    pub approval: Option<Approval>,
    pub plan: solution::Plan,
}

/// The maker's approval carrier, either pre-signed or as a pending hash.
#[derive(Clone, Debug)]
pub enum Approval {
    Raw(eth::Bytes),
    Hash(eth::B256),
}

/// The user-visible outcome of an NFT fill attempt.
#[derive(Clone, Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub state: StatusState,
    pub details: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusState {
    Pending,
    Success,
    Failure,
}

/// A solution registered with the matchmaker-side submitter, competing for
/// an authorization at a target block.
#[derive(Clone, Debug)]
pub struct MatchSolution {
    pub intent: Intent,
    pub solver: eth::Address,
    pub fill_amount: u128,
    pub execute_amount: u128,
    /// The solver's signed transactions, relayed behind the authorization.
    pub txs: Vec<eth::Bytes>,
    /// Maker-favorability score used for ranking.
    pub score: eth::U256,
}

#[derive(Clone)]
pub struct Store {
    inner: Arc<Inner>,
}

struct Inner {
    solutions: Cache<Uuid, CachedSolution>,
    status: Cache<eth::B256, Status>,
    locks: Mutex<HashSet<String>>,
    match_solutions: Mutex<HashMap<String, BTreeMap<eth::U256, MatchSolution>>>,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            inner: Arc::new(Inner {
                solutions: Cache::builder()
                    .max_capacity(10_000)
                    .time_to_live(SOLUTION_TTL)
                    .build(),
                status: Cache::builder()
                    .max_capacity(10_000)
                    .time_to_live(STATUS_TTL)
                    .build(),
                locks: Default::default(),
                match_solutions: Default::default(),
            }),
        }
    }
}

impl Store {
    pub async fn cache_solution(&self, uuid: Uuid, solution: CachedSolution) {
        self.inner.solutions.insert(uuid, solution).await;
    }

    pub async fn cached_solution(&self, uuid: &Uuid) -> Option<CachedSolution> {
        self.inner.solutions.get(uuid).await
    }

    pub async fn set_status(&self, hash: eth::B256, state: StatusState, details: impl ToString) {
        self.inner
            .status
            .insert(
                hash,
                Status {
                    state,
                    details: details.to_string(),
                    timestamp: Utc::now(),
                },
            )
            .await;
    }

    pub async fn status(&self, hash: &eth::B256) -> Option<Status> {
        self.inner.status.get(hash).await
    }

    /// Takes an exclusive lock on the specified key. Returns `None` if the
    /// lock is already held.
    pub fn try_lock(&self, key: impl Into<String>) -> Option<LockGuard> {
        let key = key.into();
        let mut locks = self.inner.locks.lock().unwrap();
        if !locks.insert(key.clone()) {
            return None;
        }
        Some(LockGuard {
            store: self.inner.clone(),
            key,
        })
    }

    /// Registers a competing solution under the specified solution-set key.
    pub fn add_match_solution(&self, key: impl Into<String>, solution: MatchSolution) {
        self.inner
            .match_solutions
            .lock()
            .unwrap()
            .entry(key.into())
            .or_default()
            .insert(solution.score, solution);
    }

    /// The top-scored solution for the specified solution-set key.
    pub fn top_match_solution(&self, key: &str) -> Option<MatchSolution> {
        self.inner
            .match_solutions
            .lock()
            .unwrap()
            .get(key)
            .and_then(|set| set.values().next_back().cloned())
    }

    /// Drops a solution set once its target block has passed.
    pub fn clear_match_solutions(&self, key: &str) {
        self.inner.match_solutions.lock().unwrap().remove(key);
    }
}

pub struct LockGuard {
    store: Arc<Inner>,
    key: String,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.store.locks.lock().unwrap().remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locks_are_exclusive_until_dropped() {
        let store = Store::default();
        let guard = store.try_lock("solutions:123:42").unwrap();
        assert!(store.try_lock("solutions:123:42").is_none());
        assert!(store.try_lock("solutions:123:43").is_some());
        drop(guard);
        assert!(store.try_lock("solutions:123:42").is_some());
    }

    #[test]
    fn best_solution_wins() {
        let store = Store::default();
        let intent = Intent {
            is_buy: false,
            buy_token: eth::Address::repeat_byte(1),
            sell_token: eth::Address::repeat_byte(2),
            maker: eth::Address::repeat_byte(3),
            solver: eth::Address::ZERO,
            source: eth::Address::ZERO,
            fee_bps: 0,
            surplus_bps: 0,
            start_time: 0,
            end_time: u32::MAX,
            nonce: eth::U256::from(1),
            is_partially_fillable: false,
            is_smart_order: false,
            is_incentivized: false,
            amount: 1,
            end_amount: 1,
            start_amount_bps: 0,
            expected_amount_bps: 0,
            signature: Default::default(),
            nft: None,
        };
        let solution = |score: u64| MatchSolution {
            intent: intent.clone(),
            solver: eth::Address::repeat_byte(score as u8),
            fill_amount: 1,
            execute_amount: 1,
            txs: vec![],
            score: eth::U256::from(score),
        };
        store.add_match_solution("set", solution(3));
        store.add_match_solution("set", solution(9));
        store.add_match_solution("set", solution(7));
        assert_eq!(
            store.top_match_solution("set").unwrap().score,
            eth::U256::from(9)
        );
    }
}
