//! Random draws behind each customer: arrival gaps, basket sizes and payment.
//!
//! Every sampler takes the random source explicitly so a run is reproducible
//! from its seed.

use rand::Rng;
use rand_distr::{Bernoulli, Distribution, Normal, Poisson};
use serde::{Deserialize, Serialize};

use crate::error::{CheckoutError, Result};

/// Minutes spent paying cash
pub const CASH_PAYMENT_MINUTES: f64 = 2.0;
/// Minutes spent paying any other way (70 seconds)
pub const OTHER_PAYMENT_MINUTES: f64 = 70.0 / 60.0;

/// Largest accepted mean inter-arrival gap, in minutes
pub const MAX_MEAN_GAP: f64 = 1.0e6;

/// Normal draws rejected before giving up on the truncated normal
const MAX_BASKET_REJECTIONS: usize = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    Cash,
    Other,
}

impl PaymentKind {
    /// Fixed time the payment adds to a customer's service
    pub fn service_minutes(self) -> f64 {
        match self {
            PaymentKind::Cash => CASH_PAYMENT_MINUTES,
            PaymentKind::Other => OTHER_PAYMENT_MINUTES,
        }
    }
}

impl std::fmt::Display for PaymentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentKind::Cash => write!(f, "cash"),
            PaymentKind::Other => write!(f, "other"),
        }
    }
}

/// Truncated normal basket size parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasketParams {
    pub mean: f64,
    pub std_dev: f64,
    pub min: u32,
    pub max: u32,
}

impl Default for BasketParams {
    fn default() -> Self {
        BasketParams {
            mean: 5.0,
            std_dev: 3.0,
            min: 1,
            max: 10,
        }
    }
}

impl BasketParams {
    pub fn validate(&self) -> Result<()> {
        if !self.mean.is_finite() {
            return Err(CheckoutError::invalid_config(format!(
                "basket mean must be finite, got {}",
                self.mean
            )));
        }
        if !(self.std_dev.is_finite() && self.std_dev > 0.0) {
            return Err(CheckoutError::invalid_config(format!(
                "basket std_dev must be positive, got {}",
                self.std_dev
            )));
        }
        if self.min >= self.max {
            return Err(CheckoutError::invalid_config(format!(
                "basket range [{}, {}] is empty",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Draw the minutes between two arrivals from a Poisson distribution.
///
/// A mean of zero always yields zero; a negative, non-finite or larger than
/// [`MAX_MEAN_GAP`] mean is rejected.
pub fn sample_interarrival_gap<R: Rng + ?Sized>(mean: f64, rng: &mut R) -> Result<u64> {
    Ok(draw_gap(gap_distribution(mean)?.as_ref(), rng))
}

/// Draw a basket size from a normal truncated to `[min, max]`, then floor it.
pub fn sample_basket_size<R: Rng + ?Sized>(params: &BasketParams, rng: &mut R) -> Result<u32> {
    let normal = basket_distribution(params)?;
    Ok(truncated_floor(&normal, params, rng))
}

/// Cash with probability `p_cash`, otherwise another payment method
pub fn sample_payment<R: Rng + ?Sized>(p_cash: f64, rng: &mut R) -> Result<PaymentKind> {
    Ok(payment_from(payment_distribution(p_cash)?.sample(rng)))
}

/// `None` for a zero mean: every gap is zero
fn gap_distribution(mean: f64) -> Result<Option<Poisson<f64>>> {
    if !mean.is_finite() || mean < 0.0 {
        return Err(CheckoutError::invalid_config(format!(
            "mean inter-arrival gap must be a non-negative number, got {}",
            mean
        )));
    }
    if mean > MAX_MEAN_GAP {
        return Err(CheckoutError::invalid_config(format!(
            "mean inter-arrival gap must be at most {} minutes, got {}",
            MAX_MEAN_GAP, mean
        )));
    }
    if mean == 0.0 {
        return Ok(None);
    }
    Poisson::new(mean)
        .map(Some)
        .map_err(|e| CheckoutError::invalid_config(e.to_string()))
}

fn basket_distribution(params: &BasketParams) -> Result<Normal<f64>> {
    params.validate()?;
    Normal::new(params.mean, params.std_dev).map_err(|e| CheckoutError::invalid_config(e.to_string()))
}

fn payment_distribution(p_cash: f64) -> Result<Bernoulli> {
    Bernoulli::new(p_cash).map_err(|_| {
        CheckoutError::invalid_config(format!("p_cash must lie in [0, 1], got {}", p_cash))
    })
}

fn draw_gap<R: Rng + ?Sized>(poisson: Option<&Poisson<f64>>, rng: &mut R) -> u64 {
    match poisson {
        Some(poisson) => poisson.sample(rng) as u64,
        None => 0,
    }
}

fn payment_from(is_cash: bool) -> PaymentKind {
    if is_cash {
        PaymentKind::Cash
    } else {
        PaymentKind::Other
    }
}

/// Rejection-sample the truncated normal so the value is already in range
/// before it is floored. Parameter sets whose mass lies almost entirely
/// outside the range fall back to a uniform draw over the same range.
fn truncated_floor<R: Rng + ?Sized>(normal: &Normal<f64>, params: &BasketParams, rng: &mut R) -> u32 {
    let lo = params.min as f64;
    let hi = params.max as f64;
    for _ in 0..MAX_BASKET_REJECTIONS {
        let x = normal.sample(rng);
        if (lo..=hi).contains(&x) {
            return x.floor() as u32;
        }
    }
    rng.random_range(params.min..params.max)
}

/// Validated distributions for one run, built once from configuration
#[derive(Debug, Clone)]
pub struct Samplers {
    gap: Option<Poisson<f64>>,
    basket: Normal<f64>,
    basket_params: BasketParams,
    payment: Bernoulli,
}

impl Samplers {
    pub fn new(mean_gap: f64, basket: &BasketParams, p_cash: f64) -> Result<Self> {
        Ok(Samplers {
            gap: gap_distribution(mean_gap)?,
            basket: basket_distribution(basket)?,
            basket_params: basket.clone(),
            payment: payment_distribution(p_cash)?,
        })
    }

    pub fn gap<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        draw_gap(self.gap.as_ref(), rng)
    }

    pub fn basket_size<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        truncated_floor(&self.basket, &self.basket_params, rng)
    }

    pub fn payment<R: Rng + ?Sized>(&self, rng: &mut R) -> PaymentKind {
        payment_from(self.payment.sample(rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn payment_costs_are_fixed() {
        assert_eq!(PaymentKind::Cash.service_minutes(), 2.0);
        assert!((PaymentKind::Other.service_minutes() - 1.1667).abs() < 1e-4);
    }

    #[test]
    fn zero_mean_gap_is_always_zero() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            assert_eq!(sample_interarrival_gap(0.0, &mut rng).unwrap(), 0);
        }
    }

    #[test]
    fn negative_mean_gap_is_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            sample_interarrival_gap(-1.0, &mut rng),
            Err(CheckoutError::InvalidConfig(_))
        ));
        assert!(Samplers::new(-0.5, &BasketParams::default(), 0.4).is_err());
        assert!(Samplers::new(f64::NAN, &BasketParams::default(), 0.4).is_err());
    }

    #[test]
    fn oversized_mean_gap_is_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            sample_interarrival_gap(1.0e18, &mut rng),
            Err(CheckoutError::InvalidConfig(_))
        ));
        assert!(Samplers::new(1.0e18, &BasketParams::default(), 0.4).is_err());
        assert!(Samplers::new(MAX_MEAN_GAP, &BasketParams::default(), 0.4).is_ok());
    }

    #[test]
    fn samplers_and_free_functions_agree() {
        let samplers = Samplers::new(3.0, &BasketParams::default(), 0.4).unwrap();
        let mut a = StdRng::seed_from_u64(21);
        let mut b = StdRng::seed_from_u64(21);
        for _ in 0..200 {
            assert_eq!(samplers.gap(&mut a), sample_interarrival_gap(3.0, &mut b).unwrap());
            assert_eq!(
                samplers.basket_size(&mut a),
                sample_basket_size(&BasketParams::default(), &mut b).unwrap()
            );
            assert_eq!(samplers.payment(&mut a), sample_payment(0.4, &mut b).unwrap());
        }
    }

    #[test]
    fn gap_mean_is_close_to_requested() {
        let mut rng = StdRng::seed_from_u64(7);
        let n = 20_000;
        let total: u64 = (0..n)
            .map(|_| sample_interarrival_gap(3.0, &mut rng).unwrap())
            .sum();
        let mean = total as f64 / n as f64;
        assert!((mean - 3.0).abs() < 0.1, "mean gap {}", mean);
    }

    #[test]
    fn basket_size_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(11);
        let params = BasketParams::default();
        for _ in 0..10_000 {
            let size = sample_basket_size(&params, &mut rng).unwrap();
            assert!((1..=10).contains(&size), "basket size {}", size);
        }
    }

    #[test]
    fn basket_size_in_bounds_even_for_extreme_params() {
        let mut rng = StdRng::seed_from_u64(3);
        let params = BasketParams {
            mean: 500.0,
            std_dev: 0.5,
            min: 1,
            max: 10,
        };
        for _ in 0..50 {
            let size = sample_basket_size(&params, &mut rng).unwrap();
            assert!((1..=10).contains(&size));
        }
    }

    #[test]
    fn invalid_basket_params_are_rejected() {
        let mut rng = StdRng::seed_from_u64(3);
        let empty = BasketParams {
            min: 10,
            max: 10,
            ..BasketParams::default()
        };
        assert!(sample_basket_size(&empty, &mut rng).is_err());
        let flat = BasketParams {
            std_dev: 0.0,
            ..BasketParams::default()
        };
        assert!(flat.validate().is_err());
    }

    #[test]
    fn payment_probability_extremes() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..100 {
            assert_eq!(sample_payment(1.0, &mut rng).unwrap(), PaymentKind::Cash);
            assert_eq!(sample_payment(0.0, &mut rng).unwrap(), PaymentKind::Other);
        }
        assert!(sample_payment(1.5, &mut rng).is_err());
    }

    #[test]
    fn cash_share_matches_probability() {
        let mut rng = StdRng::seed_from_u64(9);
        let n = 10_000;
        let cash = (0..n)
            .filter(|_| sample_payment(0.4, &mut rng).unwrap() == PaymentKind::Cash)
            .count();
        let share = cash as f64 / n as f64;
        assert!((share - 0.4).abs() < 0.03, "cash share {}", share);
    }

    #[test]
    fn samplers_are_deterministic_under_seed() {
        let samplers = Samplers::new(3.0, &BasketParams::default(), 0.4).unwrap();
        let draw = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..50)
                .map(|_| {
                    (
                        samplers.gap(&mut rng),
                        samplers.basket_size(&mut rng),
                        samplers.payment(&mut rng),
                    )
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(42), draw(42));
    }
}
