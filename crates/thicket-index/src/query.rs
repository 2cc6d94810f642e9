//! Query criteria.

use thicket_core::{Plot, QueryError, SpeciesId, TreeType, TypeMask};

/// Set of species a query accepts, as a membership table over species ids.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpeciesSet {
    members: Vec<bool>,
}

impl SpeciesSet {
    /// Build a set from ids, checking each against the species count.
    pub fn from_ids<I>(ids: I, species_count: usize) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = SpeciesId>,
    {
        let mut members = vec![false; species_count];
        for id in ids {
            match members.get_mut(id.index()) {
                Some(m) => *m = true,
                None => {
                    return Err(QueryError::UnknownSpecies {
                        code: id.0 as u32,
                    })
                }
            }
        }
        Ok(Self { members })
    }

    /// Whether `species` is in the set.
    pub fn contains(&self, species: SpeciesId) -> bool {
        self.members.get(species.index()).copied().unwrap_or(false)
    }

    /// Whether no species is in the set.
    pub fn is_empty(&self) -> bool {
        !self.members.iter().any(|&m| m)
    }

    /// Member species in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = SpeciesId> + '_ {
        self.members
            .iter()
            .enumerate()
            .filter(|(_, &m)| m)
            .map(|(i, _)| SpeciesId(i as u16))
    }
}

/// What a cursor searches for.
///
/// The mode decides the traversal: the three scanning modes walk every
/// cell list in x-major order, `Distance` visits only the cells within
/// reach of the anchor.
#[derive(Clone, Debug, PartialEq)]
pub enum QuerySpec {
    /// Every indexed tree.
    All,
    /// Trees whose life stage is in the mask.
    Type(TypeMask),
    /// Trees whose life stage is in the mask and species in the set.
    TypeSpecies {
        /// Accepted life stages.
        types: TypeMask,
        /// Accepted species.
        species: SpeciesSet,
    },
    /// Trees within `radius` of `(x, y)` on the torus, taller than
    /// `min_height`.
    Distance {
        /// Anchor X.
        x: f32,
        /// Anchor Y.
        y: f32,
        /// Search radius.
        radius: f32,
        /// Exclusive height floor.
        min_height: f32,
    },
}

impl QuerySpec {
    /// Trees of the listed life stages.
    pub fn types<I: IntoIterator<Item = TreeType>>(types: I) -> Self {
        Self::Type(types.into_iter().collect())
    }

    /// Trees near a point.
    pub fn distance(x: f32, y: f32, radius: f32, min_height: f32) -> Self {
        Self::Distance {
            x,
            y,
            radius,
            min_height,
        }
    }

    /// Check the criteria against the plot.
    pub fn validate(&self, plot: &dyn Plot) -> Result<(), QueryError> {
        match self {
            Self::All => Ok(()),
            Self::Type(mask) => validate_mask(*mask),
            Self::TypeSpecies { types, species } => {
                validate_mask(*types)?;
                if species.is_empty() {
                    return Err(QueryError::EmptySpeciesSet);
                }
                Ok(())
            }
            Self::Distance {
                x,
                y,
                radius,
                min_height,
            } => {
                if !radius.is_finite() || *radius < 0.0 {
                    return Err(QueryError::InvalidRadius { radius: *radius });
                }
                if min_height.is_nan() {
                    return Err(QueryError::InvalidHeight {
                        height: *min_height,
                    });
                }
                if !x.is_finite() || !y.is_finite() || !plot.contains(*x, *y) {
                    return Err(QueryError::AnchorOutOfPlot { x: *x, y: *y });
                }
                Ok(())
            }
        }
    }

    /// Life stages the query can yield.
    pub fn type_mask(&self) -> TypeMask {
        match self {
            Self::Type(mask) | Self::TypeSpecies { types: mask, .. } => *mask,
            Self::All | Self::Distance { .. } => TypeMask::INDEXED,
        }
    }
}

fn validate_mask(mask: TypeMask) -> Result<(), QueryError> {
    if mask.is_empty() {
        return Err(QueryError::EmptyTypeMask);
    }
    if let Some(tree_type) = mask.iter().find(|t| !t.is_indexed()) {
        return Err(QueryError::UnindexedType { tree_type });
    }
    Ok(())
}
