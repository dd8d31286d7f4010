//! Fixed feedforward network: 4 inputs → 5 hidden → 1 output.
//! No biases and no activation function, so the forward pass is two stacked
//! linear maps. 25 weights total.
//!
//! Inputs: own height, gap centre height, horizontal distance to gap, velocity.
//! Output: positive means flap.
//!
//! Because both layers are linear the network collapses to a single 4 → 1 map
//! (see [`NeuralNet::effective_weights`]). The hidden layer is kept because
//! mutation and crossover act per weight on both layers.

use rand::Rng;
use thiserror::Error;

pub const INPUT_SIZE: usize = 4;
pub const HIDDEN_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ActivationError {
    #[error("input length {actual} does not match input layer size {expected}")]
    InvalidArgument { expected: usize, actual: usize },
}

#[derive(Clone, Debug, PartialEq)]
pub struct NeuralNet {
    inputs: [f32; INPUT_SIZE],
    hidden: [f32; HIDDEN_SIZE],
    // hidden-major: weight from input i to hidden h lives at h * INPUT_SIZE + i
    w_ih: [f32; INPUT_SIZE * HIDDEN_SIZE],
    w_ho: [f32; HIDDEN_SIZE],
    output: f32,
    fitness: u32,
}

impl NeuralNet {
    pub const WEIGHT_COUNT: usize = INPUT_SIZE * HIDDEN_SIZE + HIDDEN_SIZE;

    /// Every weight drawn independently from `[-1, 1)`.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::from_weights((0..Self::WEIGHT_COUNT).map(|_| rng.random::<f32>() * 2.0 - 1.0))
    }

    /// Copy of `parent` with every weight shifted by an independent draw from
    /// `[-mutation_rate, mutation_rate)`. Fitness starts at zero.
    pub fn mutated_from<R: Rng + ?Sized>(
        parent: &NeuralNet,
        mutation_rate: f32,
        rng: &mut R,
    ) -> Self {
        let mut child = Self::from_weights(parent.to_weight_vec().into_iter());
        for w in child.w_ih.iter_mut().chain(child.w_ho.iter_mut()) {
            *w += rng.random::<f32>() * mutation_rate * 2.0 - mutation_rate;
        }
        child
    }

    /// Create a NN from an iterator of f32 values, input→hidden weights first.
    /// Panics if fewer than WEIGHT_COUNT values.
    pub fn from_weights(mut weights: impl Iterator<Item = f32>) -> Self {
        let mut next = || {
            weights
                .next()
                .expect("insufficient weights: need WEIGHT_COUNT (25) elements")
        };

        let mut w_ih = [0.0f32; INPUT_SIZE * HIDDEN_SIZE];
        for w in &mut w_ih {
            *w = next();
        }
        let mut w_ho = [0.0f32; HIDDEN_SIZE];
        for w in &mut w_ho {
            *w = next();
        }

        Self {
            inputs: [0.0; INPUT_SIZE],
            hidden: [0.0; HIDDEN_SIZE],
            w_ih,
            w_ho,
            output: 0.0,
            fitness: 0,
        }
    }

    pub fn to_weight_vec(&self) -> Vec<f32> {
        self.w_ih.iter().chain(self.w_ho.iter()).copied().collect()
    }

    /// Forward pass. Panics if `input` does not hold exactly 4 values.
    pub fn activate(&mut self, input: &[f32]) -> f32 {
        self.try_activate(input).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Forward pass that stores the input, hidden activations and output
    /// for later introspection.
    pub fn try_activate(&mut self, input: &[f32]) -> Result<f32, ActivationError> {
        let input: &[f32; INPUT_SIZE] =
            input
                .try_into()
                .map_err(|_| ActivationError::InvalidArgument {
                    expected: INPUT_SIZE,
                    actual: input.len(),
                })?;
        self.inputs = *input;

        for (h, hidden) in self.hidden.iter_mut().enumerate() {
            let row = &self.w_ih[h * INPUT_SIZE..(h + 1) * INPUT_SIZE];
            *hidden = input.iter().zip(row).map(|(x, w)| x * w).sum();
        }
        self.output = self
            .hidden
            .iter()
            .zip(self.w_ho.iter())
            .map(|(h, w)| h * w)
            .sum();

        Ok(self.output)
    }

    /// Crossover by averaging: every weight of `self` becomes the mean of its
    /// own value and the matching weight of `other`.
    pub fn breed(&mut self, other: &NeuralNet) -> &mut Self {
        for (w, o) in self.w_ih.iter_mut().zip(other.w_ih.iter()) {
            *w = (*w + o) / 2.0;
        }
        for (w, o) in self.w_ho.iter_mut().zip(other.w_ho.iter()) {
            *w = (*w + o) / 2.0;
        }
        self
    }

    /// The single linear map the two layers collapse to:
    /// `output = Σ_i effective[i] * input[i]`.
    pub fn effective_weights(&self) -> [f32; INPUT_SIZE] {
        let mut effective = [0.0f32; INPUT_SIZE];
        for (h, &w_out) in self.w_ho.iter().enumerate() {
            for (i, e) in effective.iter_mut().enumerate() {
                *e += w_out * self.w_ih[h * INPUT_SIZE + i];
            }
        }
        effective
    }

    pub fn inputs(&self) -> &[f32; INPUT_SIZE] {
        &self.inputs
    }

    pub fn hidden(&self) -> &[f32; HIDDEN_SIZE] {
        &self.hidden
    }

    pub fn output(&self) -> f32 {
        self.output
    }

    pub fn weights_in_hidden(&self) -> &[f32; INPUT_SIZE * HIDDEN_SIZE] {
        &self.w_ih
    }

    pub fn weights_hidden_out(&self) -> &[f32; HIDDEN_SIZE] {
        &self.w_ho
    }

    pub(crate) fn weights_mut(
        &mut self,
    ) -> (&mut [f32; INPUT_SIZE * HIDDEN_SIZE], &mut [f32; HIDDEN_SIZE]) {
        (&mut self.w_ih, &mut self.w_ho)
    }

    pub fn fitness(&self) -> u32 {
        self.fitness
    }

    pub fn add_fitness(&mut self) {
        self.fitness = self.fitness.saturating_add(1);
    }

    pub fn reset_fitness(&mut self) {
        self.fitness = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    fn ramp() -> NeuralNet {
        NeuralNet::from_weights((0..NeuralNet::WEIGHT_COUNT).map(|i| (i as f32) * 0.1 - 1.0))
    }

    #[test]
    fn weight_count_matches_dimensions() {
        assert_eq!(NeuralNet::WEIGHT_COUNT, 4 * 5 + 5);
        assert_eq!(NeuralNet::WEIGHT_COUNT, 25);
    }

    #[test]
    fn random_weights_lie_in_unit_range() {
        let mut rng = ChaCha12Rng::seed_from_u64(7);
        for _ in 0..50 {
            let nn = NeuralNet::random(&mut rng);
            assert!(nn
                .to_weight_vec()
                .iter()
                .all(|w| (-1.0..1.0).contains(w)));
        }
    }

    #[test]
    fn activate_is_repeatable() {
        let mut rng = ChaCha12Rng::seed_from_u64(3);
        let mut nn = NeuralNet::random(&mut rng);
        let input = [256.0, 310.5, 100.0, -1.25];
        let first = nn.activate(&input);
        let second = nn.activate(&input);
        assert_eq!(first.to_bits(), second.to_bits());
        assert_eq!(nn.inputs(), &input);
        assert_eq!(nn.output().to_bits(), first.to_bits());
    }

    #[test]
    fn activate_matches_hand_computed_sums() {
        let mut nn = ramp();
        let input = [1.0, 2.0, 0.5, -1.0];
        let out = nn.activate(&input);

        let w = nn.to_weight_vec();
        let mut expected = 0.0f32;
        for h in 0..HIDDEN_SIZE {
            let hidden: f32 = (0..INPUT_SIZE).map(|i| input[i] * w[h * 4 + i]).sum();
            assert_eq!(nn.hidden()[h], hidden);
            expected += hidden * w[20 + h];
        }
        assert!((out - expected).abs() < 1e-5);
    }

    #[test]
    fn effective_weights_reproduce_output() {
        let mut nn = ramp();
        let input = [3.0, -2.0, 0.25, 1.5];
        let out = nn.activate(&input);
        let collapsed: f32 = nn
            .effective_weights()
            .iter()
            .zip(input.iter())
            .map(|(c, x)| c * x)
            .sum();
        assert!((out - collapsed).abs() < 1e-3, "{out} vs {collapsed}");
    }

    #[test]
    #[should_panic(expected = "input length 3 does not match")]
    fn activate_panics_on_wrong_input_size() {
        ramp().activate(&[1.0, 2.0, 3.0]);
    }

    #[test]
    fn try_activate_reports_wrong_input_size() {
        assert_eq!(
            ramp().try_activate(&[0.0; 5]),
            Err(ActivationError::InvalidArgument {
                expected: 4,
                actual: 5
            })
        );
    }

    #[test]
    fn zero_mutation_clone_is_identical() {
        let mut rng = ChaCha12Rng::seed_from_u64(11);
        let mut parent = NeuralNet::random(&mut rng);
        let mut child = NeuralNet::mutated_from(&parent, 0.0, &mut rng);
        assert_eq!(parent.to_weight_vec(), child.to_weight_vec());
        let input = [120.0, 250.0, 40.0, 0.5];
        assert_eq!(
            parent.activate(&input).to_bits(),
            child.activate(&input).to_bits()
        );
    }

    #[test]
    fn mutation_stays_within_rate() {
        let mut rng = ChaCha12Rng::seed_from_u64(5);
        let parent = NeuralNet::random(&mut rng);
        let child = NeuralNet::mutated_from(&parent, 0.3, &mut rng);
        let moved = parent
            .to_weight_vec()
            .iter()
            .zip(child.to_weight_vec())
            .filter(|(p, c)| {
                let d = c - **p;
                assert!(d.abs() <= 0.3 + 1e-6, "delta {d} exceeds rate");
                d != 0.0
            })
            .count();
        assert!(moved > 0);
        assert_eq!(child.fitness(), 0);
    }

    #[test]
    fn breed_lands_between_parents() {
        let mut rng = ChaCha12Rng::seed_from_u64(9);
        let a = NeuralNet::random(&mut rng);
        let b = NeuralNet::random(&mut rng);
        let mut child = a.clone();
        child.breed(&b);
        for ((c, x), y) in child
            .to_weight_vec()
            .iter()
            .zip(a.to_weight_vec())
            .zip(b.to_weight_vec())
        {
            assert!(*c >= x.min(y) && *c <= x.max(y));
        }
    }

    #[test]
    fn breed_with_equal_network_is_a_no_op() {
        let mut a = ramp();
        let b = ramp();
        a.breed(&b).breed(&b);
        assert_eq!(a.to_weight_vec(), b.to_weight_vec());
    }

    #[test]
    fn fitness_counts_and_resets() {
        let mut nn = ramp();
        for _ in 0..3 {
            nn.add_fitness();
        }
        assert_eq!(nn.fitness(), 3);
        nn.reset_fitness();
        assert_eq!(nn.fitness(), 0);
    }

    #[test]
    #[should_panic(expected = "insufficient weights")]
    fn from_weights_panics_on_short_iterator() {
        NeuralNet::from_weights(std::iter::repeat_n(0.0f32, 10));
    }
}
