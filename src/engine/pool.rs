//! Bounded pool of predictors.
//!
//! Holds exactly N predictors for its whole lifetime. Callers check one out
//! with [`PredictorPool::get`], which blocks until a predictor is idle, and
//! hand it back by dropping the returned guard. Waiting callers are served
//! strictly in arrival order.

use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use tracing::{debug, info};

use super::backend::{Backend, ModelConfig};
use super::error::InferenceError;
use crate::telemetry;

/// Point-in-time view of pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub capacity: usize,
    pub in_use: usize,
    pub waiting: usize,
    pub total_checkouts: u64,
}

struct PoolState<P> {
    idle: Vec<P>,
    /// Tickets of blocked callers, oldest first.
    waiters: VecDeque<u64>,
    next_ticket: u64,
    total_checkouts: u64,
}

impl<P> PoolState<P> {
    fn enqueue(&mut self) -> u64 {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.waiters.push_back(ticket);
        ticket
    }

    /// Hand out a predictor if `ticket` is first in line and one is idle.
    fn take(&mut self, ticket: u64) -> Option<P> {
        if self.waiters.front() != Some(&ticket) {
            return None;
        }
        let predictor = self.idle.pop()?;
        self.waiters.pop_front();
        self.total_checkouts += 1;
        Some(predictor)
    }
}

/// Fixed-size, thread-safe set of predictors.
pub struct PredictorPool<P> {
    state: Mutex<PoolState<P>>,
    changed: Condvar,
    capacity: usize,
}

impl<P> PredictorPool<P> {
    /// Pool over already-created predictors.
    pub fn new(predictors: Vec<P>) -> Result<Self, InferenceError> {
        if predictors.is_empty() {
            return Err(InferenceError::InvalidConcurrency);
        }
        let capacity = predictors.len();
        Ok(Self {
            state: Mutex::new(PoolState {
                idle: predictors,
                waiters: VecDeque::new(),
                next_ticket: 0,
                total_checkouts: 0,
            }),
            changed: Condvar::new(),
            capacity,
        })
    }

    /// Eagerly create `size` predictors, each from its own clone of `config`.
    pub fn from_backend<B>(backend: &B, config: &ModelConfig, size: usize) -> Result<Self, InferenceError>
    where
        B: Backend<Predictor = P>,
    {
        if size == 0 {
            return Err(InferenceError::InvalidConcurrency);
        }
        let predictors = (0..size)
            .map(|_| backend.create_predictor(config.clone()))
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            size,
            model = %config.model_path().display(),
            memory_optim = config.memory_optim(),
            "Predictor pool created"
        );
        Self::new(predictors)
    }

    /// Block until a predictor is available and check it out.
    pub fn get(&self) -> PooledPredictor<'_, P> {
        let mut state = self.state.lock();
        let ticket = state.enqueue();
        let predictor = loop {
            if let Some(p) = state.take(ticket) {
                break p;
            }
            self.changed.wait(&mut state);
        };
        self.checked_out(&state, predictor)
    }

    /// Like [`get`](Self::get), but give up after `timeout`.
    ///
    /// Giving up removes the caller from the queue; callers behind it move up.
    pub fn get_timeout(&self, timeout: Duration) -> Option<PooledPredictor<'_, P>> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        let ticket = state.enqueue();
        let predictor = loop {
            if let Some(p) = state.take(ticket) {
                break p;
            }
            if self.changed.wait_until(&mut state, deadline).timed_out() {
                if let Some(p) = state.take(ticket) {
                    break p;
                }
                state.waiters.retain(|&t| t != ticket);
                self.changed.notify_all();
                debug!(ticket, "Predictor checkout timed out");
                return None;
            }
        };
        Some(self.checked_out(&state, predictor))
    }

    /// Check out a predictor only if one is idle and nobody is queued ahead.
    pub fn try_get(&self) -> Option<PooledPredictor<'_, P>> {
        let mut state = self.state.lock();
        if !state.waiters.is_empty() {
            return None;
        }
        let predictor = state.idle.pop()?;
        state.total_checkouts += 1;
        Some(self.checked_out(&state, predictor))
    }

    fn checked_out(&self, state: &PoolState<P>, predictor: P) -> PooledPredictor<'_, P> {
        // The next caller in line may be able to proceed too.
        if !state.idle.is_empty() && !state.waiters.is_empty() {
            self.changed.notify_all();
        }
        let in_use = self.capacity - state.idle.len();
        telemetry::record_pool_in_use(in_use);
        debug!(in_use, waiting = state.waiters.len(), "Predictor checked out");
        PooledPredictor {
            predictor: Some(predictor),
            pool: self,
        }
    }

    fn release(&self, predictor: P) {
        let mut state = self.state.lock();
        state.idle.push(predictor);
        let in_use = self.capacity - state.idle.len();
        telemetry::record_pool_in_use(in_use);
        debug!(in_use, waiting = state.waiters.len(), "Predictor released");
        drop(state);
        self.changed.notify_all();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of idle predictors.
    pub fn available(&self) -> usize {
        self.state.lock().idle.len()
    }

    pub fn in_use(&self) -> usize {
        self.capacity - self.available()
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        PoolStats {
            capacity: self.capacity,
            in_use: self.capacity - state.idle.len(),
            waiting: state.waiters.len(),
            total_checkouts: state.total_checkouts,
        }
    }
}

/// RAII guard over a checked-out predictor; returns it to the pool on drop.
pub struct PooledPredictor<'a, P> {
    /// Always `Some` until the guard is dropped.
    predictor: Option<P>,
    pool: &'a PredictorPool<P>,
}

impl<P> Deref for PooledPredictor<'_, P> {
    type Target = P;

    fn deref(&self) -> &P {
        match &self.predictor {
            Some(p) => p,
            None => unreachable!("predictor taken before drop"),
        }
    }
}

impl<P> DerefMut for PooledPredictor<'_, P> {
    fn deref_mut(&mut self) -> &mut P {
        match &mut self.predictor {
            Some(p) => p,
            None => unreachable!("predictor taken before drop"),
        }
    }
}

impl<P> Drop for PooledPredictor<'_, P> {
    fn drop(&mut self) {
        if let Some(predictor) = self.predictor.take() {
            self.pool.release(predictor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::thread;

    fn pool_of(n: usize) -> PredictorPool<usize> {
        PredictorPool::new((0..n).collect()).unwrap()
    }

    fn wait_for_waiters(pool: &PredictorPool<usize>, n: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while pool.stats().waiting < n {
            assert!(Instant::now() < deadline, "waiters never queued");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn empty_pool_is_rejected() {
        assert!(matches!(
            PredictorPool::<usize>::new(Vec::new()),
            Err(InferenceError::InvalidConcurrency)
        ));
    }

    #[test]
    fn get_hands_out_distinct_predictors() {
        let pool = pool_of(3);
        let a = pool.get();
        let b = pool.get();
        let c = pool.get();
        let mut ids = vec![*a, *b, *c];
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(pool.in_use(), 3);
        assert!(pool.try_get().is_none());
    }

    #[test]
    fn drop_returns_predictor() {
        let pool = pool_of(1);
        {
            let _p = pool.get();
            assert_eq!(pool.available(), 0);
        }
        assert_eq!(pool.available(), 1);
        assert_eq!(pool.stats().total_checkouts, 1);
    }

    #[test]
    fn panic_while_held_still_returns_predictor() {
        let pool = pool_of(1);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _p = pool.get();
            panic!("call failed mid-run");
        }));
        assert!(result.is_err());
        assert_eq!(pool.available(), 1);
        assert!(pool.try_get().is_some());
    }

    #[test]
    fn third_caller_blocks_until_release() {
        let pool = pool_of(2);
        let first = pool.get();
        let _second = pool.get();

        thread::scope(|s| {
            let (tx, rx) = mpsc::channel();
            let waiter_pool = &pool;
            s.spawn(move || {
                let p = waiter_pool.get();
                tx.send(*p).unwrap();
            });

            assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
            assert_eq!(pool.in_use(), 2);
            assert_eq!(pool.stats().waiting, 1);

            let released = *first;
            drop(first);
            let got = rx.recv_timeout(Duration::from_secs(5)).unwrap();
            assert_eq!(got, released);
        });
        assert!(pool.in_use() <= 2);
    }

    #[test]
    fn waiters_are_served_in_arrival_order() {
        let pool = pool_of(1);
        let order = parking_lot::Mutex::new(Vec::new());
        let held = pool.get();

        thread::scope(|s| {
            for id in 0..3 {
                let (pool, order) = (&pool, &order);
                s.spawn(move || {
                    let _p = pool.get();
                    order.lock().push(id);
                });
                wait_for_waiters(pool, id + 1);
            }
            drop(held);
        });

        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn get_timeout_gives_up_and_leaves_queue() {
        let pool = pool_of(1);
        let held = pool.get();

        assert!(pool.get_timeout(Duration::from_millis(20)).is_none());
        assert_eq!(pool.stats().waiting, 0);

        drop(held);
        assert!(pool.get_timeout(Duration::from_millis(20)).is_some());
    }

    #[test]
    fn abandoned_ticket_does_not_stall_later_callers() {
        let pool = pool_of(1);
        let held = pool.get();

        thread::scope(|s| {
            let impatient = s.spawn(|| pool.get_timeout(Duration::from_millis(100)).is_some());
            wait_for_waiters(&pool, 1);
            let patient = s.spawn(|| *pool.get());

            assert!(!impatient.join().unwrap());
            drop(held);
            assert_eq!(patient.join().unwrap(), 0);
        });
    }

    #[test]
    fn try_get_does_not_jump_the_queue() {
        let pool = pool_of(1);
        let held = pool.get();

        thread::scope(|s| {
            let waiter = s.spawn(|| {
                let _p = pool.get();
            });
            wait_for_waiters(&pool, 1);
            assert!(pool.try_get().is_none());
            drop(held);
            waiter.join().unwrap();
        });
        assert!(pool.try_get().is_some());
    }

    #[test]
    fn never_more_than_capacity_in_use() {
        let pool = Arc::new(pool_of(2));
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let (pool, active, peak) = (pool.clone(), active.clone(), peak.clone());
                thread::spawn(move || {
                    for _ in 0..50 {
                        let _p = pool.get();
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        thread::yield_now();
                        active.fetch_sub(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(pool.available(), 2);
        assert_eq!(pool.stats().total_checkouts, 400);
    }
}
