//! Generalization hierarchies.
//!
//! A hierarchy maps every domain code of one column to its generalized code
//! at each level. Storage is level-major so that a transformer can grab the
//! complete lookup table for its target level once per call.

use crate::error::{Error, Result};
use crate::matrix::DataMatrix;
use crate::node::{Level, Node};
use alloc::collections::BTreeMap;
use alloc::format;
use alloc::vec::Vec;

/// Per-column lookup: `(value, level) -> generalized value`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hierarchy {
    /// `levels[level][value]`.
    levels: Vec<Vec<u32>>,
}

impl Hierarchy {
    /// Builds a hierarchy from value-major rows: `rows[value][level]`.
    ///
    /// Every value must list the same number of levels.
    pub fn from_values(column: usize, rows: &[Vec<u32>]) -> Result<Self> {
        let height = match rows.first() {
            Some(row) if !row.is_empty() => row.len(),
            Some(_) => return Err(Error::malformed_hierarchy(column, "value without levels")),
            None => return Err(Error::malformed_hierarchy(column, "empty domain")),
        };
        let mut levels = alloc::vec![Vec::with_capacity(rows.len()); height];
        for (value, row) in rows.iter().enumerate() {
            if row.len() != height {
                return Err(Error::malformed_hierarchy(
                    column,
                    format!(
                        "value {} has {} levels, expected {}",
                        value,
                        row.len(),
                        height
                    ),
                ));
            }
            for (level, &generalized) in row.iter().enumerate() {
                levels[level].push(generalized);
            }
        }
        let hierarchy = Self { levels };
        hierarchy.check_monotone(column)?;
        Ok(hierarchy)
    }

    /// Builds a hierarchy from level-major tables: `levels[level][value]`.
    pub fn from_levels(column: usize, levels: Vec<Vec<u32>>) -> Result<Self> {
        let domain = match levels.first() {
            Some(level) if !level.is_empty() => level.len(),
            Some(_) => return Err(Error::malformed_hierarchy(column, "empty domain")),
            None => return Err(Error::malformed_hierarchy(column, "no levels")),
        };
        if let Some((level, table)) = levels.iter().enumerate().find(|(_, t)| t.len() != domain) {
            return Err(Error::malformed_hierarchy(
                column,
                format!(
                    "level {} covers {} values, expected {}",
                    level,
                    table.len(),
                    domain
                ),
            ));
        }
        let hierarchy = Self { levels };
        hierarchy.check_monotone(column)?;
        Ok(hierarchy)
    }

    /// Every level must be a function of the level below it: values that are
    /// merged at level `l` stay merged at `l + 1`. Rollups depend on this.
    fn check_monotone(&self, column: usize) -> Result<()> {
        for (level, pair) in self.levels.windows(2).enumerate() {
            let mut parents: BTreeMap<u32, u32> = BTreeMap::new();
            for (&lower, &upper) in pair[0].iter().zip(&pair[1]) {
                let parent = *parents.entry(lower).or_insert(upper);
                if parent != upper {
                    return Err(Error::malformed_hierarchy(
                        column,
                        format!(
                            "code {} of level {} maps to both {} and {} at level {}",
                            lower,
                            level,
                            parent,
                            upper,
                            level + 1
                        ),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Identity hierarchy with a single level over `domain` values.
    pub fn identity(domain: usize) -> Self {
        Self {
            levels: alloc::vec![(0..domain as u32).collect()],
        }
    }

    /// Number of levels.
    #[inline]
    pub fn height(&self) -> usize {
        self.levels.len()
    }

    /// Number of domain values covered.
    #[inline]
    pub fn domain_size(&self) -> usize {
        self.levels[0].len()
    }

    /// Returns the lookup table for one level, indexed by domain value.
    #[inline]
    pub fn level(&self, level: Level) -> Option<&[u32]> {
        self.levels.get(level as usize).map(|l| l.as_slice())
    }

    /// Generalizes one value.
    #[inline]
    pub fn generalize(&self, value: u32, level: Level) -> Option<u32> {
        self.level(level)?.get(value as usize).copied()
    }
}

/// The hierarchies of all quasi-identifying columns, in column order.
#[derive(Clone, Debug, Default)]
pub struct HierarchySet {
    hierarchies: Vec<Hierarchy>,
}

impl HierarchySet {
    /// Creates a set from per-column hierarchies.
    pub fn new(hierarchies: Vec<Hierarchy>) -> Self {
        Self { hierarchies }
    }

    /// Number of columns.
    #[inline]
    pub fn len(&self) -> usize {
        self.hierarchies.len()
    }

    /// Returns true if the set is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.hierarchies.is_empty()
    }

    /// Returns the hierarchy of one column.
    #[inline]
    pub fn get(&self, column: usize) -> Option<&Hierarchy> {
        self.hierarchies.get(column)
    }

    /// Iterates over the hierarchies.
    pub fn iter(&self) -> impl Iterator<Item = &Hierarchy> {
        self.hierarchies.iter()
    }

    /// Maximum level per column (the lattice's top node).
    pub fn top(&self) -> Node {
        Node::new(
            self.hierarchies
                .iter()
                .map(|h| (h.height() - 1) as Level)
                .collect(),
        )
    }

    /// Returns the lookup table of `column` at `level`.
    #[inline]
    pub fn lookup(&self, column: usize, level: Level) -> Option<&[u32]> {
        self.hierarchies.get(column)?.level(level)
    }

    /// Checks that `node` addresses existing levels of every column.
    pub fn validate_node(&self, node: &Node) -> Result<()> {
        if node.len() != self.hierarchies.len() {
            return Err(Error::invalid_node(format!(
                "node {} has {} levels, expected {}",
                node,
                node.len(),
                self.hierarchies.len()
            )));
        }
        for (column, (&level, hierarchy)) in node.levels().iter().zip(&self.hierarchies).enumerate()
        {
            if level as usize >= hierarchy.height() {
                return Err(Error::invalid_node(format!(
                    "level {} of column {} exceeds hierarchy height {}",
                    level,
                    column,
                    hierarchy.height()
                )));
            }
        }
        Ok(())
    }

    /// Checks that every value of `data` is covered by its column's hierarchy.
    ///
    /// Hierarchies must be total over the values actually present; checking
    /// once up front lets the per-row loops index without fallible lookups.
    pub fn validate_matrix(&self, data: &DataMatrix) -> Result<()> {
        if data.columns() != self.hierarchies.len() {
            return Err(Error::invalid_configuration(format!(
                "data has {} columns but {} hierarchies were given",
                data.columns(),
                self.hierarchies.len()
            )));
        }
        for (row, values) in data.iter_rows().enumerate() {
            for (column, (&value, hierarchy)) in values.iter().zip(&self.hierarchies).enumerate() {
                if value as usize >= hierarchy.domain_size() {
                    return Err(Error::missing_hierarchy_value(column, row, value));
                }
            }
        }
        Ok(())
    }
}

impl FromIterator<Hierarchy> for HierarchySet {
    fn from_iter<I: IntoIterator<Item = Hierarchy>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
