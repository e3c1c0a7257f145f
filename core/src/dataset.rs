//! Dense labelled arrays, one axis per independent variable plus time.

use std::collections::BTreeMap;

use derive_more::Constructor;
use ndarray::{ArrayD, ArrayView1, Axis, IxDyn, ShapeError, Slice};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::common::coord::CoordValue;

/// Assembled datasets by experiment name.
pub type Experiments = BTreeMap<String, Dataset>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown coordinate '{0}'")]
    UnknownCoordinate(String),
    #[error("Coordinate '{name}' has no value {value}")]
    UnknownValue { name: String, value: CoordValue },
    #[error("Unknown variable '{0}'")]
    UnknownVariable(String),
    #[error("Coordinate '{0}' appears twice")]
    DuplicateCoordinate(String),
    #[error("Variable '{name}' has shape {found:?}, expected {expected:?}")]
    WrongShape {
        name: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    #[error("Reshaping resulted in shape error: {0}")]
    Shape(#[from] ShapeError),
}

/// One axis of a [`Dataset`]: a name and the labels of its positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub name: String,
    pub values: Vec<CoordValue>,
}

impl Coordinate {
    pub fn new(name: impl Into<String>, values: Vec<CoordValue>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn index_of(&self, value: &CoordValue) -> Option<usize> {
        self.values.iter().position(|x| x == value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Constructor)]
pub struct Variable {
    pub name: String,
    /// Indexed by the coordinates of the owning dataset, in their order.
    /// Cells no run provided are NaN.
    pub values: ArrayD<f64>,
}

impl Variable {
    pub fn get(&self, index: &[usize]) -> Option<f64> {
        self.values.get(IxDyn(index)).copied()
    }
}

/// How [`Dataset::reduce`] folds the cells along the removed axes.
///
/// NaN cells are skipped. With no values left, the mean and the standard
/// deviation are NaN and the sum is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reduction {
    Mean,
    /// Population standard deviation.
    Std,
    Sum,
}

impl Reduction {
    pub fn apply(self, values: &[f64]) -> f64 {
        let present = || values.iter().copied().filter(|v| !v.is_nan());
        let count = present().count();
        match self {
            Reduction::Sum => present().sum(),
            _ if count == 0 => f64::NAN,
            Reduction::Mean => present().sum::<f64>() / count as f64,
            Reduction::Std => {
                let mean = present().sum::<f64>() / count as f64;
                let variance = present().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;
                variance.sqrt()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    coords: Vec<Coordinate>,
    variables: Vec<Variable>,
}

impl Dataset {
    pub fn new(coords: Vec<Coordinate>) -> Result<Self, Error> {
        for (i, coord) in coords.iter().enumerate() {
            if coords[..i].iter().any(|c| c.name == coord.name) {
                return Err(Error::DuplicateCoordinate(coord.name.clone()));
            }
        }
        Ok(Self {
            coords,
            variables: Vec::new(),
        })
    }

    /// A dataset whose variables are entirely missing.
    pub fn filled(
        coords: Vec<Coordinate>,
        names: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self, Error> {
        let mut dataset = Self::new(coords)?;
        let shape = dataset.shape();
        dataset.variables = names
            .into_iter()
            .map(|name| Variable::new(name.into(), ArrayD::from_elem(IxDyn(&shape), f64::NAN)))
            .collect();
        Ok(dataset)
    }

    pub fn add_variable(&mut self, variable: Variable) -> Result<(), Error> {
        let expected = self.shape();
        if variable.values.shape() != expected.as_slice() {
            return Err(Error::WrongShape {
                name: variable.name,
                expected,
                found: variable.values.shape().to_vec(),
            });
        }
        self.variables.retain(|v| v.name != variable.name);
        self.variables.push(variable);
        Ok(())
    }

    pub fn coords(&self) -> &[Coordinate] {
        &self.coords
    }

    pub fn coord(&self, name: &str) -> Option<&Coordinate> {
        self.coords.iter().find(|c| c.name == name)
    }

    pub fn axis(&self, name: &str) -> Option<usize> {
        self.coords.iter().position(|c| c.name == name)
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn shape(&self) -> Vec<usize> {
        self.coords.iter().map(Coordinate::len).collect()
    }

    /// Whether no run provided the cell, or `None` if it doesn't exist.
    pub fn is_missing(&self, variable: &str, index: &[usize]) -> Option<bool> {
        self.variable(variable)?.get(index).map(f64::is_nan)
    }

    /// Writes `values` into every cell of `variable` addressed by `index`.
    ///
    /// `index` has one entry per axis: `Some(i)` fixes the axis at `i`,
    /// `None` spans all of it. `values` is laid along the last axis and
    /// repeated over the other spanned axes.
    pub fn assign_lane(
        &mut self,
        variable: usize,
        index: &[Option<usize>],
        values: ArrayView1<f64>,
    ) -> Result<(), Error> {
        let shape = self.shape();
        let lane_fits = index.len() == shape.len()
            && index.last().map_or(false, Option::is_none)
            && shape.last() == Some(&values.len())
            && index.iter().zip(&shape).all(|(i, len)| i.map_or(true, |i| i < *len));
        let variable = self
            .variables
            .get_mut(variable)
            .ok_or_else(|| Error::UnknownVariable(format!("#{variable}")))?;
        if !lane_fits {
            let mut found = shape.clone();
            if let Some(last) = found.last_mut() {
                *last = values.len();
            }
            return Err(Error::WrongShape {
                name: variable.name.clone(),
                expected: shape,
                found,
            });
        }

        variable
            .values
            .slice_each_axis_mut(|ax| match index[ax.axis.index()] {
                Some(i) => Slice::from(i..i + 1),
                None => Slice::from(..),
            })
            .assign(&values);
        Ok(())
    }

    fn resolve(&self, name: &str) -> Result<usize, Error> {
        self.axis(name)
            .ok_or_else(|| Error::UnknownCoordinate(name.to_string()))
    }

    /// Fixes some coordinates to a single value, dropping their axes.
    pub fn select(&self, fixed: &BTreeMap<String, CoordValue>) -> Result<Dataset, Error> {
        let mut picks = Vec::with_capacity(fixed.len());
        for (name, value) in fixed {
            let axis = self.resolve(name)?;
            let idx = self.coords[axis]
                .index_of(value)
                .ok_or_else(|| Error::UnknownValue {
                    name: name.clone(),
                    value: value.clone(),
                })?;
            picks.push((axis, idx));
        }
        // Remove from the back so earlier axis numbers stay valid
        picks.sort_unstable_by(|a, b| b.0.cmp(&a.0));

        let coords = self
            .coords
            .iter()
            .enumerate()
            .filter(|(i, _)| !picks.iter().any(|(axis, _)| axis == i))
            .map(|(_, c)| c.clone())
            .collect();

        let variables = self
            .variables
            .iter()
            .map(|var| {
                let mut view = var.values.view();
                for &(axis, idx) in &picks {
                    view = view.index_axis_move(Axis(axis), idx);
                }
                Variable::new(var.name.clone(), view.to_owned())
            })
            .collect();

        Ok(Dataset { coords, variables })
    }

    /// Folds the named axes away with `op`.
    pub fn reduce(&self, axes: &[&str], op: Reduction) -> Result<Dataset, Error> {
        let mut reduced = Vec::with_capacity(axes.len());
        for name in axes {
            let axis = self.resolve(name)?;
            if !reduced.contains(&axis) {
                reduced.push(axis);
            }
        }
        let kept: Vec<usize> = (0..self.coords.len())
            .filter(|axis| !reduced.contains(axis))
            .collect();

        let order: Vec<usize> = kept.iter().chain(&reduced).copied().collect();
        let kept_shape: Vec<usize> = kept.iter().map(|&a| self.coords[a].len()).collect();
        let kept_len: usize = kept_shape.iter().product();
        let reduced_len: usize = reduced.iter().map(|&a| self.coords[a].len()).product();

        let mut variables = Vec::with_capacity(self.variables.len());
        for var in &self.variables {
            let permuted = var.values.view().permuted_axes(order.as_slice());
            let cells: Vec<f64> = permuted.iter().copied().collect();
            let values = if reduced_len == 0 {
                vec![op.apply(&[]); kept_len]
            } else {
                cells.chunks(reduced_len).map(|c| op.apply(c)).collect()
            };
            let values = ArrayD::from_shape_vec(IxDyn(&kept_shape), values)?;
            variables.push(Variable::new(var.name.clone(), values));
        }

        let coords = kept.iter().map(|&a| self.coords[a].clone()).collect();
        Ok(Dataset { coords, variables })
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn seeds_by_time() -> Dataset {
        let mut dataset = Dataset::filled(
            vec![
                Coordinate::new("Algorithm", vec!["a".into(), "b".into()]),
                Coordinate::new("Seed", vec![1.0.into(), 2.0.into()]),
                Coordinate::new("time", vec![0.0.into(), 10.0.into(), 20.0.into()]),
            ],
            ["coverage"],
        )
        .unwrap();
        dataset
            .assign_lane(0, &[Some(0), Some(0), None], array![1.0, 2.0, 3.0].view())
            .unwrap();
        dataset
            .assign_lane(0, &[Some(0), Some(1), None], array![3.0, 4.0, 5.0].view())
            .unwrap();
        dataset
            .assign_lane(0, &[Some(1), Some(0), None], array![10.0, 10.0, 10.0].view())
            .unwrap();
        dataset
    }

    #[test]
    fn filled_is_missing_everywhere() {
        let dataset = Dataset::filled(
            vec![
                Coordinate::new("Seed", vec![1.0.into(), 2.0.into()]),
                Coordinate::new("time", vec![0.0.into()]),
            ],
            ["a", "b"],
        )
        .unwrap();
        assert_eq!(dataset.shape(), [2, 1]);
        assert_eq!(dataset.variables().len(), 2);
        assert!(dataset.variables()[1].values.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn assign_and_read_back() {
        let dataset = seeds_by_time();
        let coverage = dataset.variable("coverage").unwrap();
        assert_eq!(coverage.get(&[0, 1, 2]), Some(5.0));
        assert!(coverage.get(&[1, 1, 0]).unwrap().is_nan());
        assert_eq!(coverage.get(&[2, 0, 0]), None);
        assert_eq!(dataset.is_missing("coverage", &[1, 1, 2]), Some(true));
        assert_eq!(dataset.is_missing("coverage", &[1, 0, 2]), Some(false));
        assert_eq!(dataset.is_missing("other", &[0, 0, 0]), None);
    }

    #[test]
    fn assign_broadcasts_over_spanned_axes() {
        let mut dataset = Dataset::filled(
            vec![
                Coordinate::new("Seed", vec![1.0.into(), 2.0.into()]),
                Coordinate::new("time", vec![0.0.into(), 1.0.into()]),
            ],
            ["v"],
        )
        .unwrap();
        dataset
            .assign_lane(0, &[None, None], array![7.0, 8.0].view())
            .unwrap();
        assert_eq!(
            dataset.variables()[0].values,
            array![[7.0, 8.0], [7.0, 8.0]].into_dyn()
        );
    }

    #[test]
    fn assign_rejects_bad_lanes() {
        let mut dataset = seeds_by_time();
        assert!(matches!(
            dataset.assign_lane(0, &[Some(0), Some(0), None], array![1.0].view()),
            Err(Error::WrongShape { .. })
        ));
        assert!(matches!(
            dataset.assign_lane(0, &[Some(5), Some(0), None], array![1.0, 2.0, 3.0].view()),
            Err(Error::WrongShape { .. })
        ));
        assert!(matches!(
            dataset.assign_lane(3, &[Some(0), Some(0), None], array![1.0, 2.0, 3.0].view()),
            Err(Error::UnknownVariable(_))
        ));
    }

    #[test]
    fn add_variable_checks_shape() {
        let mut dataset = seeds_by_time();
        let ones = ArrayD::from_elem(IxDyn(&[2, 2, 3]), 1.0);
        dataset.add_variable(Variable::new("ones".into(), ones)).unwrap();
        assert_eq!(dataset.variables().len(), 2);
        assert_eq!(dataset.variable("ones").unwrap().get(&[1, 1, 2]), Some(1.0));

        let wrong = ArrayD::from_elem(IxDyn(&[2, 3]), 1.0);
        assert!(matches!(
            dataset.add_variable(Variable::new("wrong".into(), wrong)),
            Err(Error::WrongShape { .. })
        ));
    }

    #[test]
    fn duplicate_coordinates() {
        assert!(matches!(
            Dataset::new(vec![
                Coordinate::new("Seed", vec![]),
                Coordinate::new("Seed", vec![]),
            ]),
            Err(Error::DuplicateCoordinate(_))
        ));
    }

    #[test]
    fn select_drops_fixed_axes() {
        let dataset = seeds_by_time();
        let fixed = BTreeMap::from([
            ("Algorithm".to_string(), CoordValue::from("a")),
            ("Seed".to_string(), CoordValue::from(2.0)),
        ]);
        let selected = dataset.select(&fixed).unwrap();
        assert_eq!(selected.coords().len(), 1);
        assert_eq!(selected.coords()[0].name, "time");
        assert_eq!(
            selected.variable("coverage").unwrap().values,
            array![3.0, 4.0, 5.0].into_dyn()
        );

        let unknown = BTreeMap::from([("Seed".to_string(), CoordValue::from(3.0))]);
        assert!(matches!(
            dataset.select(&unknown),
            Err(Error::UnknownValue { .. })
        ));
        let unknown = BTreeMap::from([("Nope".to_string(), CoordValue::from(3.0))]);
        assert!(matches!(
            dataset.select(&unknown),
            Err(Error::UnknownCoordinate(_))
        ));
    }

    #[test]
    fn mean_and_std_over_seed_skip_missing() {
        let dataset = seeds_by_time();
        let mean = dataset.reduce(&["Seed"], Reduction::Mean).unwrap();
        let std = dataset.reduce(&["Seed"], Reduction::Std).unwrap();
        assert_eq!(
            mean.coords().iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            ["Algorithm", "time"]
        );
        assert_eq!(
            mean.variable("coverage").unwrap().values,
            array![[2.0, 3.0, 4.0], [10.0, 10.0, 10.0]].into_dyn()
        );
        assert_eq!(
            std.variable("coverage").unwrap().values,
            array![[1.0, 1.0, 1.0], [0.0, 0.0, 0.0]].into_dyn()
        );
    }

    #[test]
    fn reduce_over_several_axes() {
        let dataset = seeds_by_time();
        let total = dataset.reduce(&["Seed", "time"], Reduction::Sum).unwrap();
        assert_eq!(
            total.variable("coverage").unwrap().values,
            array![18.0, 30.0].into_dyn()
        );

        let everything = dataset
            .reduce(&["time", "Algorithm", "Seed"], Reduction::Mean)
            .unwrap();
        assert!(everything.coords().is_empty());
        assert_eq!(everything.variables()[0].get(&[]), Some(48.0 / 9.0));
    }

    #[test]
    fn reduce_of_nothing() {
        assert!(Reduction::Mean.apply(&[f64::NAN]).is_nan());
        assert!(Reduction::Std.apply(&[]).is_nan());
        assert_eq!(Reduction::Sum.apply(&[f64::NAN]), 0.0);
    }
}
