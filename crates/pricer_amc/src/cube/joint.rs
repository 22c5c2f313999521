//! Several cubes viewed as one.
//!
//! Used to merge the per-worker mini-cubes of a multi-threaded run. The joint
//! cube owns its inputs; reads of an id present in several inputs return the
//! sum, writes must resolve to exactly one input.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::debug;

use super::{check_index, CubeError, NpvCube};

/// Union of owned cubes under a unified id space.
pub struct JointNpvCube {
    cubes: Vec<Box<dyn NpvCube>>,
    ids: BTreeMap<String, usize>,
    // joint row -> (input cube, row in that cube)
    cube_and_id: Vec<Vec<(usize, usize)>>,
}

impl JointNpvCube {
    /// Builds a joint cube.
    ///
    /// With `ids = None`, rows follow the order of first appearance across
    /// the inputs (input order, then row order within each input). With
    /// explicit ids the rows follow that list; inputs' ids outside the list
    /// are not exposed, and listed ids absent from every input are an error.
    /// With `require_unique_ids` an id occurring in more than one input is
    /// rejected.
    pub fn new(
        cubes: Vec<Box<dyn NpvCube>>,
        ids: Option<&[String]>,
        require_unique_ids: bool,
    ) -> Result<Self, CubeError> {
        let first = cubes
            .first()
            .ok_or_else(|| CubeError::DimensionMismatch("no input cubes".to_string()))?;
        for (c, cube) in cubes.iter().enumerate().skip(1) {
            if cube.dates() != first.dates() {
                return Err(CubeError::DimensionMismatch(format!("cube {c} has different dates")));
            }
            if cube.samples() != first.samples() {
                return Err(CubeError::DimensionMismatch(format!(
                    "cube {c} has {} samples, expected {}",
                    cube.samples(),
                    first.samples()
                )));
            }
            if cube.depth() != first.depth() {
                return Err(CubeError::DimensionMismatch(format!(
                    "cube {c} has depth {}, expected {}",
                    cube.depth(),
                    first.depth()
                )));
            }
        }

        let mut index: BTreeMap<String, usize> = BTreeMap::new();
        let mut cube_and_id: Vec<Vec<(usize, usize)>> = Vec::new();
        let explicit = ids.is_some();

        if let Some(list) = ids {
            for id in list {
                if index.insert(id.clone(), cube_and_id.len()).is_some() {
                    return Err(CubeError::DuplicateId(id.clone()));
                }
                cube_and_id.push(Vec::new());
            }
        }

        for (c, cube) in cubes.iter().enumerate() {
            for id in cube.ids() {
                let row = cube.index_of(&id)?;
                let joint_row = match index.get(&id) {
                    Some(&r) => r,
                    None if explicit => continue,
                    None => {
                        let r = cube_and_id.len();
                        index.insert(id.clone(), r);
                        cube_and_id.push(Vec::new());
                        r
                    }
                };
                let entries = &mut cube_and_id[joint_row];
                if require_unique_ids && !entries.is_empty() {
                    return Err(CubeError::DuplicateId(id));
                }
                entries.push((c, row));
            }
        }

        if let Some((id, _)) = index.iter().find(|(_, r)| cube_and_id[**r].is_empty()) {
            return Err(CubeError::UnknownId(id.clone()));
        }

        debug!(
            cubes = cubes.len(),
            ids = index.len(),
            "Built joint NPV cube"
        );

        Ok(Self {
            cubes,
            ids: index,
            cube_and_id,
        })
    }

    /// Consumes the joint cube and returns its inputs.
    pub fn into_cubes(self) -> Vec<Box<dyn NpvCube>> {
        self.cubes
    }

    fn entries(&self, id: usize) -> Result<&[(usize, usize)], CubeError> {
        check_index("id", id, self.cube_and_id.len())?;
        Ok(&self.cube_and_id[id])
    }

    fn single_entry(&self, id: usize) -> Result<(usize, usize), CubeError> {
        let entries = self.entries(id)?;
        match entries {
            [single] => Ok(*single),
            _ => {
                let name = self
                    .ids
                    .iter()
                    .find(|(_, r)| **r == id)
                    .map(|(n, _)| n.clone())
                    .unwrap_or_default();
                Err(CubeError::AmbiguousWrite(name, entries.len()))
            }
        }
    }
}

impl NpvCube for JointNpvCube {
    fn num_ids(&self) -> usize {
        self.cube_and_id.len()
    }

    fn num_dates(&self) -> usize {
        self.cubes[0].num_dates()
    }

    fn samples(&self) -> usize {
        self.cubes[0].samples()
    }

    fn depth(&self) -> usize {
        self.cubes[0].depth()
    }

    fn ids_and_indexes(&self) -> &BTreeMap<String, usize> {
        &self.ids
    }

    fn dates(&self) -> &[NaiveDate] {
        self.cubes[0].dates()
    }

    fn asof(&self) -> NaiveDate {
        self.cubes[0].asof()
    }

    fn get_t0(&self, id: usize, depth: usize) -> Result<f64, CubeError> {
        self.entries(id)?
            .iter()
            .map(|&(c, row)| self.cubes[c].get_t0(row, depth))
            .sum()
    }

    fn set_t0(&mut self, value: f64, id: usize, depth: usize) -> Result<(), CubeError> {
        let (c, row) = self.single_entry(id)?;
        self.cubes[c].set_t0(value, row, depth)
    }

    fn get(&self, id: usize, date: usize, sample: usize, depth: usize) -> Result<f64, CubeError> {
        self.entries(id)?
            .iter()
            .map(|&(c, row)| self.cubes[c].get(row, date, sample, depth))
            .sum()
    }

    fn set(
        &mut self,
        value: f64,
        id: usize,
        date: usize,
        sample: usize,
        depth: usize,
    ) -> Result<(), CubeError> {
        let (c, row) = self.single_entry(id)?;
        self.cubes[c].set(value, row, date, sample, depth)
    }
}
