//! Многослойная LSTM сеть с линейным выходом

use ndarray::{s, Array1, Array2, Array3, ArrayView1};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SettlementError};

/// LSTM ячейка; веса вентилей хранятся блоками [i, f, g, o]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmCell {
    pub input_size: usize,
    pub hidden_size: usize,
    /// [4 * hidden, input]
    w_input: Array2<f64>,
    /// [4 * hidden, hidden]
    w_hidden: Array2<f64>,
    /// [4 * hidden]
    bias: Array1<f64>,
}

impl LstmCell {
    pub fn new(input_size: usize, hidden_size: usize, rng: &mut StdRng) -> Self {
        let limit = (1.0 / hidden_size as f64).sqrt();
        let dist = Uniform::new(-limit, limit);

        let w_input = Array2::from_shape_fn((4 * hidden_size, input_size), |_| dist.sample(rng));
        let w_hidden = Array2::from_shape_fn((4 * hidden_size, hidden_size), |_| dist.sample(rng));

        // Смещение вентиля забывания = 1
        let mut bias = Array1::zeros(4 * hidden_size);
        bias.slice_mut(s![hidden_size..2 * hidden_size]).fill(1.0);

        Self {
            input_size,
            hidden_size,
            w_input,
            w_hidden,
            bias,
        }
    }

    /// Один шаг: (h_prev, c_prev) -> (h, c)
    pub fn forward(
        &self,
        x: ArrayView1<f64>,
        h_prev: &Array1<f64>,
        c_prev: &Array1<f64>,
    ) -> (Array1<f64>, Array1<f64>) {
        let n = self.hidden_size;
        let z = self.w_input.dot(&x) + self.w_hidden.dot(h_prev) + &self.bias;

        let i_gate = z.slice(s![..n]).mapv(sigmoid);
        let f_gate = z.slice(s![n..2 * n]).mapv(sigmoid);
        let g = z.slice(s![2 * n..3 * n]).mapv(f64::tanh);
        let o_gate = z.slice(s![3 * n..]).mapv(sigmoid);

        let c = &f_gate * c_prev + &i_gate * &g;
        let h = &o_gate * &c.mapv(f64::tanh);
        (h, c)
    }
}

/// Линейный выходной слой; последний элемент `params` - смещение
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseHead {
    pub params: Array1<f64>,
}

impl DenseHead {
    pub fn new(input_size: usize, rng: &mut StdRng) -> Self {
        let limit = (6.0 / (input_size + 1) as f64).sqrt();
        let dist = Uniform::new(-limit, limit);
        let mut params = Array1::from_shape_fn(input_size + 1, |_| dist.sample(rng));
        params[input_size] = 0.0;
        Self { params }
    }

    pub fn input_size(&self) -> usize {
        self.params.len() - 1
    }

    pub fn forward(&self, h: ArrayView1<f64>) -> f64 {
        let n = self.input_size();
        self.params.slice(s![..n]).dot(&h) + self.params[n]
    }
}

/// Стек LSTM слоёв и выходной слой
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmNetwork {
    pub n_features: usize,
    cells: Vec<LstmCell>,
    pub head: DenseHead,
}

impl LstmNetwork {
    pub fn new(n_features: usize, units: &[usize], seed: u64) -> Result<Self> {
        if n_features == 0 || units.is_empty() || units.contains(&0) {
            return Err(SettlementError::InvalidInput(format!(
                "invalid network shape: {} features, units {:?}",
                n_features, units
            )));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut cells = Vec::with_capacity(units.len());
        let mut input_size = n_features;
        for &hidden in units {
            cells.push(LstmCell::new(input_size, hidden, &mut rng));
            input_size = hidden;
        }
        let head = DenseHead::new(input_size, &mut rng);

        Ok(Self {
            n_features,
            cells,
            head,
        })
    }

    pub fn units(&self) -> Vec<usize> {
        self.cells.iter().map(|c| c.hidden_size).collect()
    }

    /// Последнее скрытое состояние верхнего слоя: [samples, hidden]
    pub fn encode(&self, x: &Array3<f64>) -> Result<Array2<f64>> {
        let (samples, seq_len, n_features) = x.dim();
        if n_features != self.n_features {
            return Err(SettlementError::ShapeMismatch {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", n_features),
            });
        }
        if seq_len == 0 {
            return Err(SettlementError::InvalidInput("empty sequence".to_string()));
        }

        let hidden = self.head.input_size();
        let mut encoded = Array2::zeros((samples, hidden));

        for b in 0..samples {
            let mut states: Vec<(Array1<f64>, Array1<f64>)> = self
                .cells
                .iter()
                .map(|c| (Array1::zeros(c.hidden_size), Array1::zeros(c.hidden_size)))
                .collect();

            for t in 0..seq_len {
                let mut layer_input = x.slice(s![b, t, ..]).to_owned();
                for (cell, state) in self.cells.iter().zip(states.iter_mut()) {
                    let (h, c) = cell.forward(layer_input.view(), &state.0, &state.1);
                    layer_input = h.clone();
                    *state = (h, c);
                }
            }

            if let Some((h, _)) = states.last() {
                encoded.row_mut(b).assign(h);
            }
        }

        Ok(encoded)
    }

    pub fn predict(&self, x: &Array3<f64>) -> Result<Array1<f64>> {
        let encoded = self.encode(x)?;
        Ok(self.readout(&encoded))
    }

    pub fn readout(&self, encoded: &Array2<f64>) -> Array1<f64> {
        encoded
            .rows()
            .into_iter()
            .map(|row| self.head.forward(row))
            .collect()
    }
}

fn sigmoid(v: f64) -> f64 {
    1.0 / (1.0 + (-v).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_shapes() {
        let mut rng = StdRng::seed_from_u64(0);
        let cell = LstmCell::new(3, 8, &mut rng);
        let x = Array1::zeros(3);
        let (h, c) = cell.forward(x.view(), &Array1::zeros(8), &Array1::zeros(8));

        assert_eq!(h.len(), 8);
        assert_eq!(c.len(), 8);
        assert!(h.iter().all(|v| v.abs() < 1.0));
    }

    #[test]
    fn test_network_predict_shape() {
        let net = LstmNetwork::new(2, &[16, 8], 42).unwrap();
        let x = Array3::from_elem((5, 3, 2), 0.5);
        let y = net.predict(&x).unwrap();

        assert_eq!(y.len(), 5);
        assert_eq!(net.units(), vec![16, 8]);
    }

    #[test]
    fn test_same_seed_same_weights() {
        let a = LstmNetwork::new(2, &[4], 7).unwrap();
        let b = LstmNetwork::new(2, &[4], 7).unwrap();
        let x = Array3::from_shape_fn((2, 2, 2), |(i, j, k)| (i + j + k) as f64 * 0.1);

        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_feature_mismatch() {
        let net = LstmNetwork::new(2, &[4], 1).unwrap();
        let x = Array3::zeros((1, 1, 3));
        assert!(matches!(
            net.encode(&x),
            Err(SettlementError::ShapeMismatch { .. })
        ));
    }
}
