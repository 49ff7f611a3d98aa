// Partitioning of a result set into a fixed number of ordered groups

/// Number of groups needed so no group exceeds `per_group` items; at least 1.
pub fn group_count(len: usize, per_group: usize) -> usize {
    len.div_ceil(per_group.max(1)).max(1)
}

/// Split `items` into exactly `groups` partitions (minimum 1).
///
/// Each partition is filled in input order up to `len / groups + 1` items; the last
/// non-empty one takes the remainder and any partitions after it are empty.
/// Concatenating the result reproduces `items`.
pub fn chunk<T>(items: Vec<T>, groups: usize) -> Vec<Vec<T>> {
    let groups = groups.max(1);
    let per_chunk = items.len() / groups + 1;
    let mut chunked: Vec<Vec<T>> = (0..groups).map(|_| Vec::new()).collect();
    let mut i = 0;
    for item in items {
        if chunked[i].len() == per_chunk {
            i += 1;
        }
        chunked[i].push(item);
    }
    chunked
}
