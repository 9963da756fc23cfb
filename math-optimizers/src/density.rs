use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use rand::Rng;

/// Shape of the random perturbations drawn by the stochastic optimizers.
///
/// `Normal` is unbounded with unit variance; `Triangular` and `Hann` are
/// supported on `[-1, 1]` and peak at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Density {
    /// Standard normal, Box-Muller transform.
    #[default]
    Normal,
    /// Symmetric triangular on `[-1, 1]` (sum of two uniforms).
    Triangular,
    /// Raised-cosine (Hann window) shape on `[-1, 1]`.
    Hann,
}

impl Density {
    /// Draws one sample.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            Density::Normal => standard_normal(rng),
            Density::Triangular => rng.random::<f64>() + rng.random::<f64>() - 1.0,
            Density::Hann => loop {
                let x = 2.0 * rng.random::<f64>() - 1.0;
                let accept = 0.5 * (1.0 + (PI * x).cos());
                if rng.random::<f64>() < accept {
                    break x;
                }
            },
        }
    }

    /// Short identifier, accepted back by [`FromStr`].
    pub fn short_name(&self) -> &'static str {
        match self {
            Density::Normal => "normal",
            Density::Triangular => "triangular",
            Density::Hann => "hann",
        }
    }
}

impl fmt::Display for Density {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl FromStr for Density {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "normal" | "randn" | "gaussian" => Ok(Density::Normal),
            "triangular" | "tri" => Ok(Density::Triangular),
            "hann" | "hanning" => Ok(Density::Hann),
            _ => Err(format!("unknown density: {}", s)),
        }
    }
}

/// Standard normal sample via the Box-Muller transform.
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1: f64 = rng.random::<f64>().max(1e-15);
    let u2: f64 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn moments(density: Density, n: usize) -> (f64, f64, f64, f64) {
        let mut rng = StdRng::seed_from_u64(11);
        let samples: Vec<f64> = (0..n).map(|_| density.sample(&mut rng)).collect();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let var = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n as f64;
        let min = samples.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        (mean, var, min, max)
    }

    #[test]
    fn test_normal_moments() {
        let (mean, var, _, _) = moments(Density::Normal, 20_000);
        assert!(mean.abs() < 0.05, "mean={}", mean);
        assert!((var - 1.0).abs() < 0.05, "var={}", var);
    }

    #[test]
    fn test_bounded_densities_stay_in_unit_interval() {
        for density in [Density::Triangular, Density::Hann] {
            let (mean, var, min, max) = moments(density, 20_000);
            assert!(min >= -1.0 && max <= 1.0, "{} out of range", density);
            assert!(mean.abs() < 0.05, "{} mean={}", density, mean);
            assert!(var < 1.0 / 3.0, "{} var={}", density, var);
        }
    }

    #[test]
    fn test_parse_density() {
        assert_eq!("randn".parse::<Density>().unwrap(), Density::Normal);
        assert_eq!("Triangular".parse::<Density>().unwrap(), Density::Triangular);
        assert_eq!("hann".parse::<Density>().unwrap(), Density::Hann);
        assert!("cauchy".parse::<Density>().is_err());
    }

    #[test]
    fn test_sampling_is_deterministic() {
        let mut a = StdRng::seed_from_u64(3);
        let mut b = StdRng::seed_from_u64(3);
        for density in [Density::Normal, Density::Triangular, Density::Hann] {
            assert_eq!(density.sample(&mut a), density.sample(&mut b));
        }
    }
}
