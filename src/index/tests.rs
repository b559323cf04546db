use super::*;

fn block(front: usize, back: usize) -> Block {
    Block::new(front, back).unwrap()
}

fn free_set(blocks: &[(usize, usize)]) -> FreeSet {
    let mut set = FreeSet::new();
    for &(front, back) in blocks {
        set.insert(block(front, back));
    }
    set.check_consistency();
    set
}

#[test]
fn best_fit_picks_smallest_sufficient() {
    let set = free_set(&[(0, 10), (100, 150), (200, 220)]);

    assert_eq!(set.best_fit(15), Some(block(200, 220)));
    assert_eq!(set.best_fit(20), Some(block(200, 220)));
    assert_eq!(set.best_fit(21), Some(block(100, 150)));
    assert_eq!(set.best_fit(1), Some(block(0, 10)));
    assert_eq!(set.best_fit(51), None);
}

#[test]
fn best_fit_tie_break_is_lowest_address() {
    let set = free_set(&[(300, 332), (100, 132), (200, 232)]);
    assert_eq!(set.best_fit(32), Some(block(100, 132)));
    assert_eq!(set.largest(), Some(block(300, 332)));
}

#[test]
fn remove_targets_exact_block() {
    let mut set = free_set(&[(0, 16), (32, 48), (64, 80)]);
    set.remove(block(32, 48));
    set.check_consistency();

    assert_eq!(set.len(), 2);
    assert_eq!(set.best_fit(16), Some(block(0, 16)));
    set.remove(block(0, 16));
    assert_eq!(set.best_fit(16), Some(block(64, 80)));
}

#[test]
fn neighbors() {
    let set = free_set(&[(0, 16), (32, 48), (64, 80)]);

    assert_eq!(set.before(0), None);
    assert_eq!(set.before(16), Some(block(0, 16)));
    assert_eq!(set.before(32), Some(block(0, 16)));
    assert_eq!(set.before(33), Some(block(32, 48)));

    assert_eq!(set.after(16), Some(block(32, 48)));
    assert_eq!(set.after(32), Some(block(64, 80)));
    assert_eq!(set.after(64), None);
}

#[test]
fn iteration_is_address_ordered() {
    let set = free_set(&[(64, 80), (0, 16), (32, 48)]);
    let blocks: std::vec::Vec<_> = set.iter().collect();
    assert_eq!(blocks, [block(0, 16), block(32, 48), block(64, 80)]);
}

#[test]
fn occupied_exact_match_only() {
    let mut set = OccupiedSet::new();
    set.insert(block(16, 48));

    assert_eq!(set.get(16), Some(block(16, 48)));
    assert_eq!(set.get(17), None);
    assert_eq!(set.remove(20), None);
    assert_eq!(set.len(), 1);
    assert_eq!(set.remove(16), Some(block(16, 48)));
    assert_eq!(set.len(), 0);
}

#[test]
fn best_fit_aligned_skips_blocks_without_an_aligned_fit() {
    let set = free_set(&[(1, 9), (17, 40), (64, 72), (100, 200)]);

    // (1, 9) is long enough but has no 8-aligned 8-byte range
    assert_eq!(set.best_fit_aligned(8, 8), Some((block(64, 72), 64)));
    assert_eq!(set.best_fit_aligned(8, 1), Some((block(1, 9), 1)));
    // (17, 40) is the smallest candidate, but 32..48 overruns it
    assert_eq!(set.best_fit_aligned(16, 16), Some((block(100, 200), 112)));
    assert_eq!(set.best_fit_aligned(8, 256), None);
}
