// Copyright (C) 2023 meshgraph contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use itertools::Itertools;
use smallvec::SmallVec;

pub type SVec<T> = SmallVec<[T; 4]>;

pub trait IteratorUtils: Iterator {
    fn collect_svec(self) -> SVec<Self::Item>
    where
        Self: Sized,
    {
        self.collect()
    }
}

impl<T: ?Sized> IteratorUtils for T where T: Iterator {}

pub trait SliceUtils<T> {
    /// Same as .iter().copied(), but doesn't trigger rustfmt line breaks
    fn iter_cpy(&self) -> std::iter::Copied<std::slice::Iter<'_, T>>;

    /// Returns true when some element appears more than once.
    fn has_duplicates(&self) -> bool
    where
        T: Eq + std::hash::Hash;
}

impl<T: Copy> SliceUtils<T> for [T] {
    fn iter_cpy(&self) -> std::iter::Copied<std::slice::Iter<'_, T>> {
        self.iter().copied()
    }

    fn has_duplicates(&self) -> bool
    where
        T: Eq + std::hash::Hash,
    {
        self.iter().duplicates().next().is_some()
    }
}

/// Removes consecutive repeated elements of a closed polygon loop, including
/// the repetition between the last and the first element.
///
/// ```ignore
/// [1, 1, 2, 3, 3, 1] -> [1, 2, 3]
/// ```
pub fn dedup_cyclic<T: Copy + PartialEq>(polygon: &[T]) -> SVec<T> {
    let mut out: SVec<T> = polygon.iter_cpy().dedup().collect();
    while out.len() > 1 && out.first() == out.last() {
        out.pop();
    }
    out
}

/// Extension trait for `Option`.
///
/// NOTE: Functions use a final underscore to avoid colliding with stdlib
/// functions with the same name.
pub trait OptionExt<T> {
    fn as_option(&self) -> &Option<T>;

    /// Returns true if the option is a [`None`] or when the value inside
    /// matches a predicate.
    fn is_none_or_(&self, f: impl FnOnce(&T) -> bool) -> bool {
        match self.as_option() {
            Some(x) => f(x),
            None => true,
        }
    }
}
impl<T> OptionExt<T> for Option<T> {
    fn as_option(&self) -> &Option<T> {
        self
    }
}

#[test]
pub fn test_dedup_cyclic() {
    assert_eq!(dedup_cyclic(&[1, 1, 2, 3, 3, 1]).as_slice(), &[1, 2, 3]);
    assert_eq!(dedup_cyclic(&[1, 2, 3, 4]).as_slice(), &[1, 2, 3, 4]);
    assert_eq!(dedup_cyclic(&[5, 5, 5]).as_slice(), &[5]);
    assert_eq!(dedup_cyclic::<u32>(&[]).as_slice(), &[] as &[u32]);
}

#[test]
pub fn test_duplicates() {
    assert!([1, 2, 1].has_duplicates());
    assert!(![1, 2, 3].has_duplicates());
    assert_eq!([4, 5].iter_cpy().collect_svec().as_slice(), &[4, 5]);
    assert!(None::<u32>.is_none_or_(|x| *x > 3));
    assert!(!Some(1).is_none_or_(|x| *x > 3));
}
