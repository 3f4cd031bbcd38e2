//! K-way merging of sorted sequences.
//!
//! [`MergedIterator`] lazily merges any number of independently sorted
//! iterators into one sorted stream, using a priority heap keyed by a shared
//! [`Comparator`]. [`merge_lists`] is the paginated convenience form used for
//! combining per-partition result lists.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::mem;
use std::sync::Arc;

/// Trait for comparing two values of the same type.
///
/// Comparators are stateless, immutable values shared freely between threads;
/// closures qualify through the blanket implementation.
pub trait Comparator<T>: Send + Sync {
    /// Compare two values.
    fn compare(&self, a: &T, b: &T) -> Ordering;
}

impl<T, F> Comparator<T> for F
where
    F: Fn(&T, &T) -> Ordering + Send + Sync,
{
    fn compare(&self, a: &T, b: &T) -> Ordering {
        self(a, b)
    }
}

/// One input sequence together with its current head element.
///
/// A source only exists while its sequence has unconsumed elements.
struct MergeSource<I, C>
where
    I: Iterator,
{
    head: I::Item,
    iter: I,
    comparator: Arc<C>,
}

impl<I, C> PartialEq for MergeSource<I, C>
where
    I: Iterator,
    C: Comparator<I::Item>,
{
    fn eq(&self, other: &Self) -> bool {
        self.comparator.compare(&self.head, &other.head) == Ordering::Equal
    }
}

impl<I, C> Eq for MergeSource<I, C>
where
    I: Iterator,
    C: Comparator<I::Item>,
{
}

impl<I, C> PartialOrd for MergeSource<I, C>
where
    I: Iterator,
    C: Comparator<I::Item>,
{
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<I, C> Ord for MergeSource<I, C>
where
    I: Iterator,
    C: Comparator<I::Item>,
{
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: smaller heads come first
        self.comparator.compare(&other.head, &self.head)
    }
}

/// A lazy merge of N sorted iterators into one sorted stream.
///
/// The output is the multiset union of all inputs, ordered per the shared
/// comparator. The stream is forward-only and consumed once; ties between
/// sources are broken arbitrarily.
pub struct MergedIterator<I, C>
where
    I: Iterator,
    C: Comparator<I::Item>,
{
    heap: BinaryHeap<MergeSource<I, C>>,
}

impl<I, C> MergedIterator<I, C>
where
    I: Iterator,
    C: Comparator<I::Item>,
{
    /// Create a merged iterator over the given sorted inputs.
    ///
    /// Inputs without a first element are dropped immediately.
    pub fn new(iterators: Vec<I>, comparator: C) -> Self {
        let comparator = Arc::new(comparator);
        let mut heap = BinaryHeap::with_capacity(iterators.len());

        for mut iter in iterators {
            if let Some(head) = iter.next() {
                heap.push(MergeSource {
                    head,
                    iter,
                    comparator: Arc::clone(&comparator),
                });
            }
        }

        MergedIterator { heap }
    }
}

impl<I, C> Iterator for MergedIterator<I, C>
where
    I: Iterator,
    C: Comparator<I::Item>,
{
    type Item = I::Item;

    fn next(&mut self) -> Option<I::Item> {
        let mut source = self.heap.pop()?;
        match source.iter.next() {
            Some(next_head) => {
                let item = mem::replace(&mut source.head, next_head);
                self.heap.push(source);
                Some(item)
            }
            None => Some(source.head),
        }
    }
}

/// Merge sorted inputs and collect one page of the merged stream.
///
/// The first `offset` merged elements are discarded without being
/// materialized, then up to `count` elements are collected. A `count` of
/// zero returns an empty list without consuming any input.
pub fn merge_lists<I, C>(
    offset: usize,
    count: usize,
    iterators: Vec<I>,
    comparator: C,
) -> Vec<I::Item>
where
    I: Iterator,
    C: Comparator<I::Item>,
{
    if count == 0 {
        return Vec::new();
    }

    MergedIterator::new(iterators, comparator)
        .skip(offset)
        .take(count)
        .collect()
}
