//! Implied volatility from an observed option price (Newton-Raphson).

use super::{price, PricingInput};
use crate::error::{EngineError, EngineResult};

const INITIAL_GUESS: f64 = 0.30;
const MIN_VOL: f64 = 0.01;
const MAX_VOL: f64 = 5.0;
const MAX_ITERATIONS: usize = 100;
const PRICE_TOLERANCE: f64 = 1e-6;

/// Volatility at which the model price of `input` equals `market_price`.
///
/// `input.volatility` is ignored. Fails with `NotFound` when the price is below
/// intrinsic value, when vega vanishes, or when the search does not converge
/// within the iteration cap.
pub fn implied_vol(input: &PricingInput, market_price: f64) -> EngineResult<f64> {
    let not_found = |reason: String| EngineError::NotFound {
        quantity: "implied volatility",
        target: market_price,
        reason,
    };

    if !(market_price.is_finite() && market_price > 0.0) {
        return Err(not_found("market price must be positive".into()));
    }
    if input.time_to_expiry <= 0.0 {
        return Err(not_found("option has expired".into()));
    }
    let floor = price(&input.with_volatility(0.0))?.price;
    if market_price < floor {
        return Err(not_found(format!("price is below the no-volatility value {floor:.4}")));
    }

    let mut sigma = INITIAL_GUESS;
    for _ in 0..MAX_ITERATIONS {
        let quote = price(&input.with_volatility(sigma))?;
        let diff = quote.price - market_price;
        if diff.abs() < PRICE_TOLERANCE {
            return Ok(sigma);
        }
        let vega = quote.greeks.vega * 100.0;
        if vega < 1e-10 {
            return Err(not_found(format!("vega vanished at sigma={sigma:.4}")));
        }
        sigma = (sigma - diff / vega).clamp(MIN_VOL, MAX_VOL);
    }

    Err(not_found(format!("no convergence within {MAX_ITERATIONS} iterations")))
}
