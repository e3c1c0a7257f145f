use std::ops::Sub;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range<N> {
    pub min: N,
    pub max: N,
}

impl<N> Range<N> {
    pub fn new(min: N, max: N) -> Self {
        Self { min, max }
    }
}

impl<N: Sub<Output = N> + Copy> Range<N> {
    pub fn width(&self) -> N {
        self.max - self.min
    }
}

impl<N: PartialOrd + Copy> Range<N> {
    pub fn expand(&self, new: N) -> Self {
        Self::new(
            if self.min < new { self.min } else { new },
            if self.max > new { self.max } else { new },
        )
    }

    pub fn max(&self, new: Range<N>) -> Self {
        Self::new(
            if self.min < new.min {
                self.min
            } else {
                new.min
            },
            if self.max > new.max {
                self.max
            } else {
                new.max
            },
        )
    }

    pub fn contains(&self, value: N) -> bool {
        self.min <= value && value <= self.max
    }

    pub fn from_iter_val(iter: impl IntoIterator<Item = N>) -> Option<Range<N>> {
        iter.into_iter().fold(None, |acc, n| match acc {
            Some(acc) => Some(acc.expand(n)),
            None => Some(Range::new(n, n)),
        })
    }

    pub fn from_iter_range(iter: impl IntoIterator<Item = Range<N>>) -> Option<Range<N>> {
        iter.into_iter().fold(None, |acc, range| match acc {
            Some(acc) => Some(acc.max(range)),
            None => Some(range),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Range;

    #[test]
    fn union_of_ranges() {
        let range = Range::from_iter_range([Range::new(0.0, 10.0), Range::new(-1.0, 5.0)]);
        assert_eq!(range, Some(Range::new(-1.0, 10.0)));
        assert_eq!(Range::<f64>::from_iter_range([]), None);
    }

    #[test]
    fn from_values() {
        let range = Range::from_iter_val([3, 1, 2]).unwrap();
        assert_eq!(range, Range::new(1, 3));
        assert!(range.contains(2));
        assert!(!range.contains(4));
        assert_eq!(range.width(), 2);
    }
}
