/// Adam optimizer with a fixed learning rate.
///
/// Keeps one first/second-moment buffer per parameter slice, allocated on
/// the first `step`. The bias correction is folded into the step size:
/// `lr_t = lr · sqrt(1 - β2^t) / (1 - β1^t)`.
#[derive(Debug, Clone)]
pub struct Adam {
    pub learning_rate: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    t: i32,
    m: Vec<Vec<f32>>,
    v: Vec<Vec<f32>>,
}

impl Adam {
    pub fn new(learning_rate: f32) -> Adam {
        Adam {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            t: 0,
            m: Vec::new(),
            v: Vec::new(),
        }
    }

    /// Number of updates applied so far.
    pub fn steps(&self) -> i32 {
        self.t
    }

    /// Applies one update. `params` and `grads` must list the same slices in
    /// the same order on every call.
    pub fn step(&mut self, params: Vec<&mut [f32]>, grads: Vec<&[f32]>) {
        assert_eq!(params.len(), grads.len(), "one gradient per parameter slice");
        if self.m.is_empty() {
            self.m = params.iter().map(|p| vec![0.0; p.len()]).collect();
            self.v = params.iter().map(|p| vec![0.0; p.len()]).collect();
        }
        assert_eq!(self.m.len(), params.len(), "parameter list changed between steps");

        self.t += 1;
        let (b1, b2) = (self.beta1, self.beta2);
        let lr_t = self.learning_rate * (1.0 - b2.powi(self.t)).sqrt() / (1.0 - b1.powi(self.t));

        for (((p, g), m), v) in params
            .into_iter()
            .zip(grads)
            .zip(self.m.iter_mut())
            .zip(self.v.iter_mut())
        {
            for i in 0..p.len() {
                m[i] = b1 * m[i] + (1.0 - b1) * g[i];
                v[i] = b2 * v[i] + (1.0 - b2) * g[i] * g[i];
                p[i] -= lr_t * m[i] / (v[i].sqrt() + self.epsilon);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_step_moves_by_learning_rate() {
        let mut adam = Adam::new(0.001);
        let mut w = vec![1.0f32, -1.0];
        adam.step(vec![w.as_mut_slice()], vec![&[0.5f32, -2.0][..]]);
        // With bias correction the first step is lr · sign(g).
        assert!((w[0] - 0.999).abs() < 1e-6);
        assert!((w[1] + 0.999).abs() < 1e-6);
        assert_eq!(adam.steps(), 1);
    }

    #[test]
    fn minimizes_a_quadratic() {
        let mut adam = Adam::new(0.1);
        let mut x = vec![3.0f32];
        for _ in 0..500 {
            let g = vec![2.0 * x[0]];
            adam.step(vec![x.as_mut_slice()], vec![g.as_slice()]);
        }
        assert!(x[0].abs() < 0.3);
    }
}
