//! The combination space: the consumable cross product of all axes.

use std::sync::{Mutex, PoisonError};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::axis::Axis;
use crate::value::{Combination, Tuple};

/// Cartesian product of the axes' tuple sequences, last axis varying fastest.
fn product(sequences: &[&[Tuple]]) -> Vec<Combination> {
    if sequences.iter().any(|s| s.is_empty()) {
        return Vec::new();
    }

    let total: usize = sequences.iter().map(|s| s.len()).product();
    let mut units = Vec::with_capacity(total);
    let mut indices = vec![0usize; sequences.len()];

    loop {
        units.push(Combination::new(
            indices
                .iter()
                .zip(sequences)
                .map(|(&i, seq)| seq[i].clone())
                .collect(),
        ));

        // Odometer increment from the last axis
        let mut carry = true;
        for (index, seq) in indices.iter_mut().zip(sequences).rev() {
            *index += 1;
            if *index < seq.len() {
                carry = false;
                break;
            }
            *index = 0;
        }

        if carry {
            break;
        }
    }

    units
}

fn repeated(units: &[Combination], repeats: usize) -> Vec<Combination> {
    let mut out = Vec::with_capacity(units.len() * repeats);
    for _ in 0..repeats {
        out.extend_from_slice(units);
    }
    out
}

struct SpaceState {
    // Stored back to front so a pop yields product order
    units: Vec<Combination>,
    rng: Option<SmallRng>,
}

/// Work units left to run, claimed one at a time by any number of workers.
pub struct CombinationSpace {
    state: Mutex<SpaceState>,
    total: usize,
}

impl CombinationSpace {
    /// `repeats` back-to-back copies of the product over `axes`, claimed in
    /// product order.
    #[must_use]
    pub fn build(axes: &[Axis], repeats: usize) -> Self {
        let sequences: Vec<&[Tuple]> = axes.iter().map(Axis::values).collect();
        Self::from_units(repeated(&product(&sequences), repeats))
    }

    /// Space over explicit units, claimed in the given order.
    #[must_use]
    pub fn from_units(mut units: Vec<Combination>) -> Self {
        units.reverse();
        let total = units.len();
        Self {
            state: Mutex::new(SpaceState { units, rng: None }),
            total,
        }
    }

    /// Claim units from uniformly random positions instead.
    ///
    /// With a seed the claim order is reproducible.
    #[must_use]
    pub fn shuffled(self, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };
        let mut state = self.state.into_inner().unwrap_or_else(PoisonError::into_inner);
        state.rng = Some(rng);
        Self {
            state: Mutex::new(state),
            total: self.total,
        }
    }

    /// Remove and return one unit, `None` once the space is exhausted.
    ///
    /// Concurrent callers never receive the same unit.
    pub fn claim(&self) -> Option<Combination> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let SpaceState { units, rng } = &mut *state;
        if units.is_empty() {
            return None;
        }
        match rng {
            Some(rng) => {
                let index = rng.random_range(0..units.len());
                Some(units.swap_remove(index))
            }
            None => units.pop(),
        }
    }

    /// Units not yet claimed
    #[must_use]
    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .units
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Units the space was built with
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }
}

/// Size of the space `build(axes, repeats)` would produce.
#[must_use]
pub fn space_size(axes: &[Axis], repeats: usize) -> usize {
    axes.iter().map(Axis::len).product::<usize>() * repeats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn scalars(values: &[i64]) -> Vec<Tuple> {
        values.iter().map(|&v| vec![Value::Int(v)]).collect()
    }

    fn drain(space: &CombinationSpace) -> Vec<Combination> {
        std::iter::from_fn(|| space.claim()).collect()
    }

    #[test]
    fn test_product_last_axis_fastest() {
        let a = scalars(&[1, 2]);
        let b = scalars(&[10, 20, 30]);
        let units = product(&[&a, &b]);
        let rendered: Vec<String> = units.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec!["1,10", "1,20", "1,30", "2,10", "2,20", "2,30"]
        );
    }

    #[test]
    fn test_product_with_empty_axis() {
        let a = scalars(&[1, 2]);
        let b = scalars(&[]);
        assert!(product(&[&a, &b]).is_empty());
    }

    #[test]
    fn test_claims_follow_product_order() {
        let a = scalars(&[0, 1, 2, 3]);
        let space = CombinationSpace::from_units(product(&[&a]));
        let claimed: Vec<String> = drain(&space).iter().map(ToString::to_string).collect();
        assert_eq!(claimed, vec!["0", "1", "2", "3"]);
        assert!(space.claim().is_none());
        assert!(space.is_empty());
    }

    #[test]
    fn test_repeats_concatenate() {
        let a = scalars(&[1, 2]);
        let space = CombinationSpace::from_units(repeated(&product(&[&a]), 3));
        let claimed: Vec<String> = drain(&space).iter().map(ToString::to_string).collect();
        assert_eq!(claimed, vec!["1", "2", "1", "2", "1", "2"]);
        assert_eq!(space.total(), 6);
    }

    #[test]
    fn test_shuffle_claims_everything_once() {
        let a = scalars(&(0..50).collect::<Vec<_>>());
        let space = CombinationSpace::from_units(product(&[&a])).shuffled(Some(7));
        let mut claimed: Vec<i64> = drain(&space)
            .iter()
            .filter_map(|c| match c.scalar(0) {
                Some(Value::Int(v)) => Some(*v),
                _ => None,
            })
            .collect();
        assert_eq!(claimed.len(), 50);
        let in_order = claimed.windows(2).all(|w| w[0] < w[1]);
        claimed.sort_unstable();
        assert_eq!(claimed, (0..50).collect::<Vec<_>>());
        assert!(!in_order);
    }

    #[test]
    fn test_seeded_shuffle_is_reproducible() {
        let a = scalars(&(0..20).collect::<Vec<_>>());
        let first = drain(&CombinationSpace::from_units(product(&[&a])).shuffled(Some(3)));
        let second = drain(&CombinationSpace::from_units(product(&[&a])).shuffled(Some(3)));
        assert_eq!(first, second);
    }
}
