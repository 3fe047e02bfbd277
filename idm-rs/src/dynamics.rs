//! Closed-form epidemic model: stage costs and infection probabilities.

use crate::actions::ActionIndexer;
use crate::parameters::Parameters;

pub struct EpidemicDynamics<'a> {
    params: &'a Parameters,
    actions: ActionIndexer,
}

impl<'a> EpidemicDynamics<'a> {
    pub fn new(params: &'a Parameters) -> Self {
        Self {
            params,
            actions: params.actions(),
        }
    }

    pub fn parameters(&self) -> &Parameters {
        self.params
    }

    pub fn actions(&self) -> ActionIndexer {
        self.actions
    }

    /// Grows super-linearly in the number of affected individuals.
    pub fn health_cost(&self, state: usize) -> f64 {
        ((self.params.population_size - state) as f64).powf(1.1)
    }

    pub fn stage_cost(&self, state: usize, action: usize) -> f64 {
        let (a1, a2) = self.actions.pair_of(action);
        let p = self.params;
        let financial = p.cf_a1[a1] + p.cf_a2[a2];
        let quality = p.cq_a1[a1] * p.cq_a2[a2];
        p.weights[0] * financial - p.weights[1] * quality + p.weights[2] * self.health_cost(state)
    }

    /// Probability that a single susceptible individual is infected within
    /// one step. Both levers act multiplicatively in the exponent.
    pub fn infection_probability(&self, state: usize, action: usize) -> f64 {
        let (a1, a2) = self.actions.pair_of(action);
        let beta = 1.0 - state as f64 / self.params.population_size as f64;
        1.0 - (-beta * self.params.r[a1] * self.params.lambda[a2]).exp()
    }
}
