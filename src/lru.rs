use crate::address::{CacheGeometry, decode};

/// Set-associative cache with least-recently-used replacement.
///
/// All lines live in one contiguous allocation, the lines of set `i` are
/// `lines[i * associativity..(i + 1) * associativity]`.
///
/// Recency is taken from a logical clock that advances once per access,
/// hit or miss, so the LRU order is a pure function of the access sequence.
#[derive(Debug)]
pub struct LruCache {
    geometry: CacheGeometry,
    lines: Vec<CacheLine>,
    clock: u64,
}

impl LruCache {
    pub fn new(geometry: CacheGeometry) -> Self {
        Self {
            geometry,
            lines: vec![CacheLine::default(); geometry.total_lines()],
            clock: 0,
        }
    }

    pub fn geometry(&self) -> &CacheGeometry {
        &self.geometry
    }

    /// Number of accesses performed so far.
    pub fn clock(&self) -> u64 {
        self.clock
    }

    pub fn access(&mut self, address: u64) -> AccessOutcome {
        let decoded = decode(address, &self.geometry);
        let ways = self.geometry.associativity();
        let set_start = decoded.set_index * ways;

        let now = self.clock;
        self.clock += 1;

        let set = &mut self.lines[set_start..set_start + ways];

        // Cache-Hit: mark the line as the most recently used
        if let Some(line) = set.iter_mut().find(|line| line.tag == Some(decoded.tag)) {
            line.recency = now;
            return AccessOutcome::Hit;
        }

        // Cache-Miss: fill the first empty line, otherwise evict the least recently used one
        let (victim_idx, outcome) = match set.iter().position(|line| line.tag.is_none()) {
            Some(empty_idx) => (empty_idx, AccessOutcome::MissCleanFill),
            None => {
                let lru_idx = least_recently_used(set);
                let evicted_tag = set[lru_idx].tag.unwrap_or_default();
                tracing::trace!(
                    set = decoded.set_index,
                    evicted_tag,
                    tag = decoded.tag,
                    "evicting line"
                );
                (lru_idx, AccessOutcome::MissWithEviction { evicted_tag })
            }
        };

        set[victim_idx] = CacheLine {
            tag: Some(decoded.tag),
            recency: now,
        };

        outcome
    }

    /// Lines of set `set_index`, in way order.
    pub fn set(&self, set_index: usize) -> &[CacheLine] {
        let ways = self.geometry.associativity();
        &self.lines[set_index * ways..(set_index + 1) * ways]
    }
}

/// Index of the line with the smallest recency, earlier lines win ties.
fn least_recently_used(set: &[CacheLine]) -> usize {
    let mut lru_idx = 0;
    for (line_idx, line) in set.iter().enumerate().skip(1) {
        if line.recency < set[lru_idx].recency {
            lru_idx = line_idx;
        }
    }
    lru_idx
}

/// A line is valid when it holds a tag.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct CacheLine {
    pub tag: Option<u64>,
    pub recency: u64,
}

impl CacheLine {
    pub fn is_valid(&self) -> bool {
        self.tag.is_some()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AccessOutcome {
    Hit,
    MissCleanFill,
    MissWithEviction { evicted_tag: u64 },
}

impl AccessOutcome {
    pub fn is_hit(&self) -> bool {
        matches!(self, AccessOutcome::Hit)
    }
}

impl std::fmt::Display for AccessOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessOutcome::Hit => f.write_str("hit"),
            AccessOutcome::MissCleanFill => f.write_str("miss"),
            AccessOutcome::MissWithEviction { .. } => f.write_str("miss eviction"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn cache(s: u32, e: usize, b: u32) -> LruCache {
        LruCache::new(CacheGeometry::new(s, e, b).unwrap())
    }

    #[test]
    fn direct_mapped_single_line() {
        let mut cache = cache(0, 1, 0);

        assert_eq!(cache.access(0), AccessOutcome::MissCleanFill);
        assert_eq!(cache.access(0), AccessOutcome::Hit);
        assert_eq!(cache.access(0), AccessOutcome::Hit);
        assert_eq!(
            cache.access(1),
            AccessOutcome::MissWithEviction { evicted_tag: 0 }
        );
        assert_eq!(
            cache.access(0),
            AccessOutcome::MissWithEviction { evicted_tag: 1 }
        );
    }

    #[test]
    fn two_way_set_holds_both_tags() {
        let mut cache = cache(0, 2, 0);

        assert_eq!(cache.access(0), AccessOutcome::MissCleanFill);
        assert_eq!(cache.access(1), AccessOutcome::MissCleanFill);
        assert_eq!(cache.access(0), AccessOutcome::Hit);
    }

    #[test]
    fn same_block_hits() {
        let mut cache = cache(2, 1, 4);

        assert_eq!(cache.access(0x40), AccessOutcome::MissCleanFill);
        for address in 0x41..0x50 {
            assert_eq!(cache.access(address), AccessOutcome::Hit);
        }
        // next block maps to another set
        assert_eq!(cache.access(0x50), AccessOutcome::MissCleanFill);
    }

    #[test]
    fn evicts_least_recently_used() {
        let ways = 4;
        let mut cache = cache(1, ways, 0);

        // tags 0..=ways all map to set 0 (address = tag << 1)
        for tag in 0..ways as u64 {
            assert_eq!(cache.access(tag << 1), AccessOutcome::MissCleanFill);
        }
        assert_eq!(
            cache.access((ways as u64) << 1),
            AccessOutcome::MissWithEviction { evicted_tag: 0 }
        );
        assert_eq!(
            cache.access(0),
            AccessOutcome::MissWithEviction { evicted_tag: 1 }
        );
    }

    #[test]
    fn hit_refreshes_recency() {
        let mut cache = cache(0, 2, 0);

        cache.access(0);
        cache.access(1);
        assert_eq!(cache.access(0), AccessOutcome::Hit);
        assert_eq!(
            cache.access(2),
            AccessOutcome::MissWithEviction { evicted_tag: 1 }
        );
    }

    #[test]
    fn sets_are_independent() {
        let mut cache = cache(1, 1, 0);

        assert_eq!(cache.access(0b00), AccessOutcome::MissCleanFill);
        assert_eq!(cache.access(0b01), AccessOutcome::MissCleanFill);
        assert_eq!(cache.access(0b00), AccessOutcome::Hit);
        assert_eq!(cache.access(0b01), AccessOutcome::Hit);
        assert_eq!(
            cache.access(0b10),
            AccessOutcome::MissWithEviction { evicted_tag: 0 }
        );
        assert_eq!(cache.access(0b01), AccessOutcome::Hit);
    }

    #[test]
    fn fills_first_empty_line() {
        let mut cache = cache(0, 3, 0);

        cache.access(7);
        let set = cache.set(0);
        assert_eq!(set[0], CacheLine { tag: Some(7), recency: 0 });
        assert!(!set[1].is_valid());
        assert!(!set[2].is_valid());
    }

    #[test]
    fn clock_advances_on_every_access() {
        let mut cache = cache(0, 1, 0);

        cache.access(0);
        cache.access(0);
        cache.access(1);
        assert_eq!(cache.clock(), 3);
        assert_eq!(cache.set(0)[0], CacheLine { tag: Some(1), recency: 2 });
    }

    #[test]
    fn lru_tie_prefers_lowest_index() {
        let set = [
            CacheLine { tag: Some(3), recency: 5 },
            CacheLine { tag: Some(1), recency: 2 },
            CacheLine { tag: Some(2), recency: 2 },
        ];
        assert_eq!(least_recently_used(&set), 1);
    }

    #[test]
    fn outcome_display() {
        assert_eq!(AccessOutcome::Hit.to_string(), "hit");
        assert_eq!(AccessOutcome::MissCleanFill.to_string(), "miss");
        assert_eq!(
            AccessOutcome::MissWithEviction { evicted_tag: 3 }.to_string(),
            "miss eviction"
        );
    }
}
