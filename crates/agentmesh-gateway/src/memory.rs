//! Per-thread conversation context kept in process memory.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Default number of exchanges remembered per thread.
pub const DEFAULT_MAX_EXCHANGES: usize = 10;

/// Default number of threads remembered at once.
pub const DEFAULT_MAX_THREADS: usize = 1024;

/// One answered question.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub question: String,
    pub answer: String,
    pub at: DateTime<Utc>,
}

struct ThreadHistory {
    exchanges: VecDeque<Exchange>,
    last_recorded: u64,
}

#[derive(Default)]
struct Threads {
    by_id: HashMap<String, ThreadHistory>,
    clock: u64,
}

/// Bounded history of each conversation thread.
///
/// Only the most recent `max_exchanges` exchanges of a thread are kept, and
/// at most `max_threads` threads; recording into a new thread beyond that
/// drops the thread recorded into least recently. Nothing survives a restart.
pub struct ThreadMemory {
    max_exchanges: usize,
    max_threads: usize,
    threads: Mutex<Threads>,
}

impl ThreadMemory {
    pub fn new(max_exchanges: usize) -> Self {
        Self::with_limits(max_exchanges, DEFAULT_MAX_THREADS)
    }

    pub fn with_limits(max_exchanges: usize, max_threads: usize) -> Self {
        Self {
            max_exchanges: max_exchanges.max(1),
            max_threads: max_threads.max(1),
            threads: Mutex::new(Threads::default()),
        }
    }

    pub fn record(&self, thread_id: &str, question: &str, answer: &str) {
        let mut threads = self.threads.lock();
        threads.clock += 1;
        let now = threads.clock;

        if !threads.by_id.contains_key(thread_id) && threads.by_id.len() >= self.max_threads {
            let oldest = threads
                .by_id
                .iter()
                .min_by_key(|(_, h)| h.last_recorded)
                .map(|(id, _)| id.clone());
            if let Some(oldest) = oldest {
                debug!(thread_id = %oldest, "Evicting least recently used thread");
                threads.by_id.remove(&oldest);
            }
        }

        let history = threads
            .by_id
            .entry(thread_id.to_string())
            .or_insert_with(|| ThreadHistory {
                exchanges: VecDeque::new(),
                last_recorded: now,
            });
        history.last_recorded = now;
        history.exchanges.push_back(Exchange {
            question: question.to_string(),
            answer: answer.to_string(),
            at: Utc::now(),
        });
        while history.exchanges.len() > self.max_exchanges {
            history.exchanges.pop_front();
        }
    }

    /// The thread's history rendered as the orchestrator's context string.
    /// Empty for unknown threads.
    pub fn context(&self, thread_id: &str) -> String {
        let threads = self.threads.lock();
        let Some(history) = threads.by_id.get(thread_id) else {
            return String::new();
        };
        history
            .exchanges
            .iter()
            .map(|e| format!("user: {}\nassistant: {}\n", e.question, e.answer))
            .collect()
    }

    pub fn exchanges(&self, thread_id: &str) -> Vec<Exchange> {
        self.threads
            .lock()
            .by_id
            .get(thread_id)
            .map(|h| h.exchanges.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn thread_count(&self) -> usize {
        self.threads.lock().by_id.len()
    }
}

impl Default for ThreadMemory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EXCHANGES)
    }
}
