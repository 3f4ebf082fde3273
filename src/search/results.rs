use std::collections::{BinaryHeap, HashMap};
use std::cmp::Ordering;
use std::sync::Arc;
use crate::core::types::Entity;

/// One scored document from a text search
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub key: String,
    pub score: f32,
    pub rank: usize,            // 0-based position in descending-score order
}

/// Identifier -> 0-based relevance position from the most recent search
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankMap {
    ranks: HashMap<String, usize>,
}

impl RankMap {
    pub fn rank_of(&self, key: &str) -> Option<usize> {
        self.ranks.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.ranks.keys().map(String::as_str)
    }

    /// Keys in ascending rank order
    pub fn ordered_keys(&self) -> Vec<&str> {
        let mut keys: Vec<(&str, usize)> = self.ranks.iter().map(|(k, r)| (k.as_str(), *r)).collect();
        keys.sort_by_key(|(_, rank)| *rank);
        keys.into_iter().map(|(k, _)| k).collect()
    }
}

/// Hits of one search, best first
#[derive(Debug, Clone, Default)]
pub struct RankedResults {
    pub hits: Vec<Hit>,
    pub max_score: f32,
    pub took_ms: u64,
}

impl RankedResults {
    pub fn from_scored(scored: Vec<(f32, String)>, took_ms: u64) -> Self {
        let max_score = scored.first().map(|(score, _)| *score).unwrap_or(0.0);
        let hits = scored
            .into_iter()
            .enumerate()
            .map(|(rank, (score, key))| Hit { key, score, rank })
            .collect();
        RankedResults { hits, max_score, took_ms }
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn keys(&self) -> Vec<&str> {
        self.hits.iter().map(|h| h.key.as_str()).collect()
    }

    pub fn rank_map(&self) -> RankMap {
        let mut ranks = HashMap::with_capacity(self.hits.len());
        for hit in &self.hits {
            // A key returned twice keeps its best rank
            ranks.entry(hit.key.clone()).or_insert(hit.rank);
        }
        RankMap { ranks }
    }
}

/// Row waiting in the reorder heap
struct Pending<R> {
    rank: usize,
    arrival: usize,
    row: R,
}

impl<R> PartialEq for Pending<R> {
    fn eq(&self, other: &Self) -> bool {
        self.rank == other.rank && self.arrival == other.arrival
    }
}

impl<R> Eq for Pending<R> {}

impl<R> PartialOrd for Pending<R> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<R> Ord for Pending<R> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap on (rank, arrival)
        other.rank.cmp(&self.rank).then_with(|| other.arrival.cmp(&self.arrival))
    }
}

/// Rows from the storage engine, re-ordered by rank as they stream in.
///
/// A row is released as soon as it carries the next expected rank; rows that
/// arrive early wait in a heap. Ranks removed by storage-side filters never
/// arrive, so whatever is left is drained in rank order once the source ends.
/// Without a rank map rows pass through in storage order.
pub struct RankedRows<I: Iterator> {
    source: I,
    key_attribute: String,
    ranks: Option<Arc<RankMap>>,
    pending: BinaryHeap<Pending<I::Item>>,
    next_rank: usize,
    arrivals: usize,
    exhausted: bool,
}

impl<I> RankedRows<I>
where
    I: Iterator,
    I::Item: Entity,
{
    pub fn new(source: I, key_attribute: &str, ranks: Option<Arc<RankMap>>) -> Self {
        RankedRows {
            source,
            key_attribute: key_attribute.to_string(),
            ranks,
            pending: BinaryHeap::new(),
            next_rank: 0,
            arrivals: 0,
            exhausted: false,
        }
    }

    fn rank_of(&self, row: &I::Item) -> usize {
        let Some(ranks) = &self.ranks else {
            return usize::MAX;
        };
        row.attribute(&self.key_attribute)
            .and_then(|v| v.to_text())
            .and_then(|key| ranks.rank_of(&key))
            .unwrap_or(usize::MAX)
    }
}

impl<I> Iterator for RankedRows<I>
where
    I: Iterator,
    I::Item: Entity,
{
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        if self.ranks.is_none() {
            return self.source.next();
        }

        loop {
            let ready = match self.pending.peek() {
                Some(top) => self.exhausted || top.rank == self.next_rank,
                None if self.exhausted => return None,
                None => false,
            };
            if ready {
                let pending = self.pending.pop()?;
                self.next_rank = pending.rank.saturating_add(1);
                return Some(pending.row);
            }

            match self.source.next() {
                Some(row) => {
                    let rank = self.rank_of(&row);
                    self.pending.push(Pending {
                        rank,
                        arrival: self.arrivals,
                        row,
                    });
                    self.arrivals += 1;
                }
                None => self.exhausted = true,
            }
        }
    }
}
