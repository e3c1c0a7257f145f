use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet},
    fmt::{self, Display, Formatter},
    hash::{Hash, Hasher},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

/// A single value of an independent variable, as read from a log header.
///
/// Values are ordered so that every axis sorts deterministically, even when
/// it mixes kinds: all numbers come first (by [`f64::total_cmp`]), followed by
/// all text values in lexicographic order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CoordValue {
    Numeric(f64),
    Text(String),
}

/// Coordinates of a single log file, one scalar per independent variable.
pub type Coordinates = BTreeMap<String, CoordValue>;

/// Value domains of every independent variable seen across an experiment.
pub type Dimensions = BTreeMap<String, BTreeSet<CoordValue>>;

impl CoordValue {
    /// Keeps `raw` as a number if it parses as one, as text otherwise.
    pub fn coerce(raw: &str) -> Self {
        match raw.parse::<f64>() {
            Ok(value) => CoordValue::Numeric(value),
            Err(_) => CoordValue::Text(raw.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CoordValue::Numeric(value) => Some(*value),
            CoordValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CoordValue::Numeric(_) => None,
            CoordValue::Text(text) => Some(text),
        }
    }
}

impl Ord for CoordValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (CoordValue::Numeric(a), CoordValue::Numeric(b)) => a.total_cmp(b),
            (CoordValue::Numeric(_), CoordValue::Text(_)) => Ordering::Less,
            (CoordValue::Text(_), CoordValue::Numeric(_)) => Ordering::Greater,
            (CoordValue::Text(a), CoordValue::Text(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for CoordValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for CoordValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CoordValue {}

impl Hash for CoordValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            CoordValue::Numeric(value) => {
                state.write_u8(0);
                state.write_u64(value.to_bits());
            }
            CoordValue::Text(text) => {
                state.write_u8(1);
                text.hash(state);
            }
        }
    }
}

impl Display for CoordValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CoordValue::Numeric(value) => write!(f, "{value}"),
            CoordValue::Text(text) => f.write_str(text),
        }
    }
}

impl FromStr for CoordValue {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::coerce(s))
    }
}

impl From<f64> for CoordValue {
    fn from(value: f64) -> Self {
        CoordValue::Numeric(value)
    }
}

impl From<&str> for CoordValue {
    fn from(value: &str) -> Self {
        CoordValue::Text(value.to_string())
    }
}

/// Lifts every scalar of `coords` into a singleton domain.
pub fn lift(coords: &Coordinates) -> Dimensions {
    coords
        .iter()
        .map(|(name, value)| (name.clone(), BTreeSet::from([value.clone()])))
        .collect()
}

/// Key-wise union of two sets of domains.
///
/// A name present in only one side keeps that side's domain.
pub fn merge_dimensions(a: &Dimensions, b: &Dimensions) -> Dimensions {
    let mut merged = a.clone();
    for (name, values) in b {
        merged
            .entry(name.clone())
            .or_default()
            .extend(values.iter().cloned());
    }
    merged
}

/// Folds per-file coordinates into the experiment-wide domains.
pub fn fold_coordinates<'a>(coords: impl IntoIterator<Item = &'a Coordinates>) -> Dimensions {
    coords
        .into_iter()
        .fold(Dimensions::new(), |acc, c| merge_dimensions(&acc, &lift(c)))
}
