use enum_map::{Enum, EnumArray, EnumMap};
use rand::Rng;
use serde::Serialize;

use crate::utils::Random;

/// Roulette-wheel selection over a set of operators. Weights start at 1 and only grow.
#[derive(Debug)]
pub struct StrategyWeights<K: EnumArray<u32>> {
    weights: EnumMap<K, u32>,
}

impl<K> Clone for StrategyWeights<K>
    where
        K: EnumArray<u32>,
        K::Array: Clone,
{
    fn clone(&self) -> Self {
        Self { weights: self.weights.clone() }
    }
}

impl<K> StrategyWeights<K>
    where
        K: Enum + EnumArray<u32> + Copy,
{
    pub fn new() -> Self {
        let mut weights: EnumMap<K, u32> = EnumMap::default();
        for (_, weight) in weights.iter_mut() {
            *weight = 1;
        }
        Self { weights }
    }

    #[cfg(test)]
    pub fn weight(&self, key: K) -> u32 {
        self.weights[key]
    }

    pub fn reward(&mut self, key: K) {
        self.weights[key] += 1;
    }

    /// Draws `u` in [0, 1) and returns the operator whose cumulative share segment contains it.
    pub fn select(&self, rng: &mut Random) -> K {
        let total = self.weights.values().sum::<u32>() as f64;
        let draw = rng.gen::<f64>();
        let mut upper = 0.0;
        for (key, &weight) in self.weights.iter() {
            upper += weight as f64 / total;
            if draw < upper {
                return key;
            }
        }
        // rounding of the cumulative shares
        K::from_usize(K::LENGTH - 1)
    }

    pub fn to_vec(&self) -> Vec<(K, u32)> {
        self.weights.iter().map(|(key, &weight)| (key, weight)).collect()
    }
}

impl<K> Default for StrategyWeights<K>
    where
        K: Enum + EnumArray<u32> + Copy,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Serialize for StrategyWeights<K>
    where
        K: Enum + EnumArray<u32> + Copy + Serialize,
{
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.weights.iter().map(|(key, weight)| (key, *weight)))
    }
}

#[cfg(test)]
mod tests {
    use enum_map::EnumMap;

    use super::*;
    use crate::operators::TourOperator;
    use crate::utils::create_seeded_rng;

    #[test]
    fn uniform_weights_select_every_operator() {
        let weights = StrategyWeights::<TourOperator>::new();
        let mut rng = create_seeded_rng(4);
        let mut counts: EnumMap<TourOperator, usize> = EnumMap::default();
        for _ in 0..3000 {
            counts[weights.select(&mut rng)] += 1;
        }
        for (_, &count) in counts.iter() {
            assert!(count > 800 && count < 1200, "{:?}", counts);
        }
    }

    #[test]
    fn rewarded_operator_is_selected_more_often() {
        let mut weights = StrategyWeights::<TourOperator>::new();
        for _ in 0..7 {
            weights.reward(TourOperator::MoveToAnotherTour);
        }
        assert_eq!(weights.weight(TourOperator::MoveToAnotherTour), 8);
        assert_eq!(weights.weight(TourOperator::SwapWithinTour), 1);

        let mut rng = create_seeded_rng(5);
        let moves = (0..5000)
            .filter(|_| weights.select(&mut rng) == TourOperator::MoveToAnotherTour)
            .count();
        // 8 of 10
        assert!(moves > 3800 && moves < 4200, "{}", moves);
    }
}
