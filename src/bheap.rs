// Decision Forest Core
// Copyright (C) 2023 Krzysztof Piwoński <piwonski.kris@gmail.com>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! One small generic min-heap over `(key, slot)` pairs, consolidating the
//! hand-coded per-use priority queues used for fixed-count predictor
//! selection and factor-run ordering by mean response.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Debug, Clone, Copy, PartialEq)]
struct MinEntry<S> {
    key: f64,
    slot: S,
}

impl<S: PartialEq> Eq for MinEntry<S> {}

impl<S: PartialEq> PartialOrd for MinEntry<S> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<S: PartialEq> Ord for MinEntry<S> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so `BinaryHeap` (a max-heap) behaves as a min-heap.
        other.key.total_cmp(&self.key)
    }
}

pub struct BHeap<S: PartialEq> {
    heap: BinaryHeap<MinEntry<S>>,
}

impl<S: PartialEq> BHeap<S> {
    pub fn new() -> Self {
        BHeap { heap: BinaryHeap::new() }
    }

    pub fn insert(&mut self, key: f64, slot: S) {
        self.heap.push(MinEntry { key, slot });
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Pops the minimum-key element.
    pub fn pop(&mut self) -> Option<(f64, S)> {
        self.heap.pop().map(|e| (e.key, e.slot))
    }

    /// Pops every element in ascending key order.
    pub fn depopulate(mut self) -> Vec<(f64, S)> {
        let mut out = Vec::with_capacity(self.heap.len());
        while let Some(e) = self.pop() {
            out.push(e);
        }
        out
    }
}

impl<S: PartialEq> Default for BHeap<S> {
    fn default() -> Self {
        Self::new()
    }
}
