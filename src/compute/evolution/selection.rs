//! Survivor selection for the next generation.
//!
//! Selection does not move individuals; it returns [`Pick`]s that index into
//! the (descending-sorted) parent and offspring vectors. The engine then
//! takes the picked individuals out of those vectors and drops the rest.

use crate::schema::SelectionKind;

use super::error::OperatorError;
use super::individual::Individual;

/// Index of a surviving individual.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pick {
    Parent(usize),
    Offspring(usize),
}

impl SelectionKind {
    /// Choose `mu` survivors. Both inputs must be sorted by fitness, descending.
    pub fn select(
        self,
        parents: &[Individual],
        offspring: &[Individual],
        mu: usize,
    ) -> Result<Vec<Pick>, OperatorError> {
        match self {
            SelectionKind::Plus => plus_selection(parents, offspring, mu),
            SelectionKind::Comma => comma_selection(offspring, mu),
        }
    }
}

/// Merge walk over parents and offspring. An offspring is only taken when it
/// is strictly fitter than the current parent head, so parents win ties.
fn plus_selection(
    parents: &[Individual],
    offspring: &[Individual],
    mu: usize,
) -> Result<Vec<Pick>, OperatorError> {
    let available = parents.len() + offspring.len();
    if available < mu || mu == 0 {
        return Err(OperatorError::NotEnoughIndividuals {
            operator: "plus selection",
            needed: mu,
            available,
        });
    }

    let mut picks = Vec::with_capacity(mu);
    let (mut p, mut o) = (0, 0);

    while picks.len() < mu {
        let take_offspring = match (parents.get(p), offspring.get(o)) {
            (Some(parent), Some(child)) => parent.fitness() < child.fitness(),
            (Some(_), None) => false,
            (None, Some(_)) => true,
            (None, None) => break,
        };

        if take_offspring {
            picks.push(Pick::Offspring(o));
            o += 1;
        } else {
            picks.push(Pick::Parent(p));
            p += 1;
        }
    }

    Ok(picks)
}

fn comma_selection(offspring: &[Individual], mu: usize) -> Result<Vec<Pick>, OperatorError> {
    if offspring.len() < mu || mu == 0 {
        return Err(OperatorError::NotEnoughIndividuals {
            operator: "comma selection",
            needed: mu,
            available: offspring.len(),
        });
    }

    Ok((0..mu).map(Pick::Offspring).collect())
}
