//! # Freelist Index
//!
//! All free blocks are kept in an indexed skip list ordered by payload size
//! ascending, so the best fit for a request is the first node at or past the
//! requested size. Node storage lives inside the free blocks themselves:
//!
//! ```text
//! block ──> ┌────────┬─────────┬─────────┬───┬───────────────┐
//!           │ height │ next[0] │ next[1] │ … │    (free)     │
//!           └────────┴─────────┴─────────┴───┴───────────────┘
//! ```
//!
//! - `height` is the number of forward levels this node participates in,
//!   drawn from a geometric distribution at insertion time and clamped to
//!   what the payload can store.
//! - `next[i]` is the quad index of the next node at level `i`, or the
//!   header sentinel if none. The header loops to itself on every level above
//!   the current list height.
//!
//! Search, insert, and delete each run one descent from the top live level,
//! recording the last node visited per level in a predecessor scratch array.
//! The scratch belongs to the allocator instance and is fully rewritten by
//! every descent; it is never exposed.
//!
//! Sizes are not unique. Deletion therefore finishes with a forward scan
//! along level 0 from the captured predecessor until the exact node is found;
//! overrunning the node's size class there means the arena and the index
//! disagree, which is fatal.

use crate::arena::{Arena, HEADER_BLOCK, MAX_HEIGHT, POINTER_SIZE_IN_QUADS};
use crate::coin::CoinFlip;
use crate::error::IntegrityError;
use arena_units::{QuadCount, QuadIndex};

/// The size-ordered skip list over all free blocks, plus the per-instance
/// predecessor scratch.
pub(crate) struct FreeIndex {
    updates: [QuadIndex; MAX_HEIGHT],
}

impl FreeIndex {
    pub(crate) const fn new() -> Self {
        Self {
            updates: [HEADER_BLOCK; MAX_HEIGHT],
        }
    }

    /// Best-fit lookup: the smallest free block with a payload of at least
    /// `min_size` quads, or `None` if no block fits.
    pub(crate) fn search(&mut self, arena: &Arena<'_>, min_size: QuadCount) -> Option<QuadIndex> {
        self.descend(arena, min_size);
        let hit = arena.next_of(self.updates[0], 0);
        (hit != HEADER_BLOCK).then_some(hit)
    }

    /// Links the block at `block` with payload `size` into the list and
    /// writes its free tags.
    pub(crate) fn insert(
        &mut self,
        arena: &mut Arena<'_>,
        coin: &mut impl CoinFlip,
        block: QuadIndex,
        size: QuadCount,
    ) {
        self.descend(arena, size);
        let height = self.settle_height(arena, coin, size);
        arena.write_free_tags(block, size);
        arena.set_height(block, height);
        for level in 0..height {
            let pred = self.updates[level];
            let after = arena.next_of(pred, level);
            arena.set_next(block, level, after);
            arena.set_next(pred, level, block);
        }
    }

    /// Unlinks the free block at `block` and writes its used tags.
    ///
    /// # Errors
    ///
    /// [`IntegrityError::UnindexedBlock`] if the block cannot be reached
    /// through its size class; the arena and the index then disagree and the
    /// instance is unusable.
    pub(crate) fn remove(
        &mut self,
        arena: &mut Arena<'_>,
        block: QuadIndex,
    ) -> Result<(), IntegrityError> {
        let size = arena.size_of(block);
        debug_assert!(arena.is_free(block), "removing a block that is not free");
        debug_assert_eq!(
            arena.word(block - QuadCount::new(POINTER_SIZE_IN_QUADS)),
            arena.word(block + size),
            "boundary tags disagree"
        );
        self.descend(arena, size);

        // Equal sizes share one position in the order; advance along level 0
        // until the exact block appears, re-aiming the predecessor scratch at
        // every node found linking to it.
        let mut current = self.updates[0];
        while arena.next_of(current, 0) != block {
            let step = arena.next_of(current, 0);
            if step == HEADER_BLOCK || arena.size_of(step) > size {
                return Err(IntegrityError::UnindexedBlock(block.to_byte_offset()));
            }
            current = step;
            for level in 0..arena.height_of(current).min(MAX_HEIGHT) {
                if arena.next_of(current, level) == block {
                    self.updates[level] = current;
                }
            }
        }

        let height = arena.height_of(block);
        debug_assert!(
            (1..=MAX_HEIGHT).contains(&height),
            "free-block height out of range"
        );
        for level in 0..height.min(MAX_HEIGHT) {
            debug_assert_eq!(arena.next_of(self.updates[level], level), block);
            let after = arena.next_of(block, level);
            arena.set_next(self.updates[level], level, after);
        }

        // Retire empty levels from the top.
        let mut live = arena.list_height();
        while live > 1 && arena.next_of(HEADER_BLOCK, live - 1) == HEADER_BLOCK {
            live -= 1;
        }
        arena.set_list_height(live);

        arena.write_used_tags(block, size);
        Ok(())
    }

    /// One descent from the top live level: after this, `updates[i]` holds
    /// the last node at level `i` whose payload is smaller than `min_size`.
    /// Levels above the live height point at the sentinel.
    fn descend(&mut self, arena: &Arena<'_>, min_size: QuadCount) {
        let height = arena.list_height().min(MAX_HEIGHT);
        for slot in self.updates.iter_mut().skip(height) {
            *slot = HEADER_BLOCK;
        }
        let mut current = HEADER_BLOCK;
        for level in (0..height).rev() {
            loop {
                let next = arena.next_of(current, level);
                if next == HEADER_BLOCK || arena.size_of(next) >= min_size {
                    break;
                }
                current = next;
            }
            self.updates[level] = current;
        }
    }

    /// Samples a node height and reconciles it with the block payload and
    /// the live list height.
    fn settle_height(
        &mut self,
        arena: &mut Arena<'_>,
        coin: &mut impl CoinFlip,
        size: QuadCount,
    ) -> usize {
        let mut height = random_height(coin);
        // The payload stores the height word plus one link per level.
        let payload = size.as_usize();
        if payload - 1 < height + 1 {
            height = payload - 2;
        }
        let live = arena.list_height();
        if height > live {
            // The list grows by exactly one level at a time, regardless of
            // the sampled height.
            let grown = live + 1;
            arena.set_list_height(grown);
            arena.set_next(HEADER_BLOCK, grown - 1, HEADER_BLOCK);
            self.updates[grown - 1] = HEADER_BLOCK;
            height = grown;
        }
        height
    }
}

/// Geometric height: start at one, grow while a fair coin lands heads,
/// capped at [`MAX_HEIGHT`].
fn random_height(coin: &mut impl CoinFlip) -> usize {
    let mut height = 1;
    while height < MAX_HEIGHT && coin.flip() {
        height += 1;
    }
    height
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::FIRST_BLOCK;

    /// Replays a fixed flip sequence, then tails.
    struct ScriptedCoin {
        flips: Vec<bool>,
        at: usize,
    }

    impl ScriptedCoin {
        fn new(flips: &[bool]) -> Self {
            Self {
                flips: flips.to_vec(),
                at: 0,
            }
        }

        fn tails() -> Self {
            Self::new(&[])
        }
    }

    impl CoinFlip for ScriptedCoin {
        fn flip(&mut self) -> bool {
            let flip = self.flips.get(self.at).copied().unwrap_or(false);
            self.at += 1;
            flip
        }
    }

    /// Marks the whole arena used and carves it into `sizes` plus a used
    /// tail, returning the carved block starts. Nothing is indexed.
    fn carve(arena: &mut Arena<'_>, index: &mut FreeIndex, sizes: &[u32]) -> Vec<QuadIndex> {
        let total = arena.size_of(FIRST_BLOCK).as_u32();
        index.remove(arena, FIRST_BLOCK).expect("initial block is indexed");

        let mut cursor = FIRST_BLOCK;
        let mut blocks = Vec::new();
        let mut consumed = 0;
        for &size in sizes {
            arena.write_used_tags(cursor, QuadCount::new(size));
            blocks.push(cursor);
            cursor += QuadCount::new(size + 2);
            consumed += size + 2;
        }
        arena.write_used_tags(cursor, QuadCount::new(total - consumed));
        blocks
    }

    #[test]
    fn search_returns_smallest_sufficient_block() {
        let mut region = vec![0_u8; 16000];
        let mut arena = Arena::new(&mut region);
        arena.install_header();
        let mut index = FreeIndex::new();
        let mut coin = ScriptedCoin::tails();

        let blocks = carve(&mut arena, &mut index, &[10, 4, 6, 4, 8]);
        for &at in &[blocks[0], blocks[2], blocks[4]] {
            let size = arena.size_of(at);
            index.insert(&mut arena, &mut coin, at, size);
        }

        assert_eq!(index.search(&arena, QuadCount::new(5)), Some(blocks[2])); // 6
        assert_eq!(index.search(&arena, QuadCount::new(7)), Some(blocks[4])); // 8
        assert_eq!(index.search(&arena, QuadCount::new(9)), Some(blocks[0])); // 10
        assert_eq!(index.search(&arena, QuadCount::new(11)), None);
    }

    #[test]
    fn level_zero_is_sorted_by_size() {
        let mut region = vec![0_u8; 16000];
        let mut arena = Arena::new(&mut region);
        arena.install_header();
        let mut index = FreeIndex::new();
        let mut coin = ScriptedCoin::new(&[true, false, true, true, false]);

        let blocks = carve(&mut arena, &mut index, &[10, 4, 6, 4, 8]);
        for &at in &blocks {
            let size = arena.size_of(at);
            index.insert(&mut arena, &mut coin, at, size);
        }

        let mut sizes = Vec::new();
        let mut node = arena.next_of(HEADER_BLOCK, 0);
        while node != HEADER_BLOCK {
            sizes.push(arena.size_of(node).as_u32());
            node = arena.next_of(node, 0);
        }
        assert_eq!(sizes, [4, 4, 6, 8, 10]);
    }

    #[test]
    fn list_height_grows_by_one_per_insert_at_most() {
        let mut region = vec![0_u8; 16000];
        let mut arena = Arena::new(&mut region);
        arena.install_header();
        let mut index = FreeIndex::new();
        // Heads forever: every sample hits the cap and is then reconciled.
        let mut coin = ScriptedCoin {
            flips: vec![true; 1024],
            at: 0,
        };

        let blocks = carve(&mut arena, &mut index, &[10, 10, 10]);
        assert_eq!(arena.list_height(), 1);
        for (grown, &at) in blocks.iter().enumerate() {
            index.insert(&mut arena, &mut coin, at, QuadCount::new(10));
            assert_eq!(arena.list_height(), grown + 2);
            assert_eq!(arena.height_of(at), grown + 2);
        }
        // Above the live height the header still loops to itself.
        for level in arena.list_height()..MAX_HEIGHT {
            assert_eq!(arena.next_of(HEADER_BLOCK, level), HEADER_BLOCK);
        }
    }

    #[test]
    fn tiny_blocks_clamp_their_height() {
        let mut region = vec![0_u8; 16000];
        let mut arena = Arena::new(&mut region);
        arena.install_header();
        let mut index = FreeIndex::new();
        let mut coin = ScriptedCoin {
            flips: vec![true; 64],
            at: 0,
        };

        let blocks = carve(&mut arena, &mut index, &[3]);
        index.insert(&mut arena, &mut coin, blocks[0], QuadCount::new(3));
        // A three-quad payload stores the height word and one link.
        assert_eq!(arena.height_of(blocks[0]), 1);
    }

    #[test]
    fn removal_handles_duplicate_sizes() {
        let mut region = vec![0_u8; 16000];
        let mut arena = Arena::new(&mut region);
        arena.install_header();
        let mut index = FreeIndex::new();
        let mut coin = ScriptedCoin::new(&[true, false, true, true, false, false, true]);

        let blocks = carve(&mut arena, &mut index, &[4, 4, 4, 6]);
        for &at in &blocks {
            let size = arena.size_of(at);
            index.insert(&mut arena, &mut coin, at, size);
        }

        // Remove the middle duplicate, then the remaining ones in turn.
        index.remove(&mut arena, blocks[1]).expect("indexed");
        assert!(!arena.is_free(blocks[1]));
        assert_eq!(index.search(&arena, QuadCount::new(4)).map(|b| arena.size_of(b)), Some(QuadCount::new(4)));

        index.remove(&mut arena, blocks[0]).expect("indexed");
        index.remove(&mut arena, blocks[2]).expect("indexed");
        assert_eq!(index.search(&arena, QuadCount::new(4)), Some(blocks[3]));

        index.remove(&mut arena, blocks[3]).expect("indexed");
        assert_eq!(index.search(&arena, QuadCount::new(3)), None);
        assert_eq!(arena.list_height(), 1);
    }

    #[test]
    fn removing_an_unindexed_block_is_fatal() {
        let mut region = vec![0_u8; 16000];
        let mut arena = Arena::new(&mut region);
        arena.install_header();
        let mut index = FreeIndex::new();
        let mut coin = ScriptedCoin::tails();

        let blocks = carve(&mut arena, &mut index, &[4, 4]);
        let size = arena.size_of(blocks[0]);
        index.insert(&mut arena, &mut coin, blocks[0], size);
        // Forge free tags on a block the index never saw.
        arena.write_free_tags(blocks[1], QuadCount::new(4));

        assert_eq!(
            index.remove(&mut arena, blocks[1]),
            Err(IntegrityError::UnindexedBlock(blocks[1].to_byte_offset()))
        );
    }
}
