//! Closed-form Black-Scholes with explicit boundary behavior.
//!
//! d1 = (ln(S/K) + (r + σ²/2)·T) / (σ·√T),  d2 = d1 − σ·√T
//! put  = K·e^(−rT)·N(−d2) − S·N(−d1)
//! call = S·N(d1) − K·e^(−rT)·N(d2)
//!
//! Boundaries are valid results, not errors:
//! - `T <= 0`: intrinsic value, delta is a step, every other Greek is 0.
//! - `σ <= 0`: discounted intrinsic value, delta steps at the discounted
//!   strike, gamma and vega are 0, theta and rho are the limits of the
//!   discounted payoff.

use statrs::distribution::{Continuous, ContinuousCDF, Normal};

use super::{Greeks, OptionKind, OptionQuote, PricingInput, DAYS_PER_YEAR};
use crate::error::{EngineError, EngineResult};

pub fn price(input: &PricingInput) -> EngineResult<OptionQuote> {
    validate(input)?;

    let (price, greeks) = if input.time_to_expiry <= 0.0 {
        expired(input)
    } else if input.volatility <= 0.0 {
        zero_volatility(input)
    } else {
        closed_form(input)
    };

    let price = EngineError::ensure_finite("option price", price)?;
    for (name, value) in [
        ("delta", greeks.delta),
        ("gamma", greeks.gamma),
        ("theta", greeks.theta),
        ("vega", greeks.vega),
        ("rho", greeks.rho),
    ] {
        EngineError::ensure_finite(name, value)?;
    }

    Ok(OptionQuote {
        input: *input,
        price,
        greeks,
    })
}

fn validate(input: &PricingInput) -> EngineResult<()> {
    if !(input.spot.is_finite() && input.spot > 0.0) {
        return Err(EngineError::domain("pricing", format!("spot must be positive, got {}", input.spot)));
    }
    if !(input.strike.is_finite() && input.strike > 0.0) {
        return Err(EngineError::domain("pricing", format!("strike must be positive, got {}", input.strike)));
    }
    for (name, value) in [
        ("time_to_expiry", input.time_to_expiry),
        ("risk_free_rate", input.risk_free_rate),
        ("volatility", input.volatility),
    ] {
        if !value.is_finite() {
            return Err(EngineError::domain("pricing", format!("{name} is not finite: {value}")));
        }
    }
    Ok(())
}

fn expired(input: &PricingInput) -> (f64, Greeks) {
    let delta = match input.kind {
        OptionKind::Put if input.spot < input.strike => -1.0,
        OptionKind::Call if input.spot > input.strike => 1.0,
        _ => 0.0,
    };
    (
        input.intrinsic(),
        Greeks {
            delta,
            ..Greeks::default()
        },
    )
}

fn zero_volatility(input: &PricingInput) -> (f64, Greeks) {
    let PricingInput {
        spot: s,
        strike: k,
        time_to_expiry: t,
        risk_free_rate: r,
        ..
    } = *input;
    let discounted_strike = k * (-r * t).exp();

    let (price, delta, theta_annual, rho_unit) = match input.kind {
        OptionKind::Put if s < discounted_strike => (
            discounted_strike - s,
            -1.0,
            r * discounted_strike,
            -t * discounted_strike,
        ),
        OptionKind::Call if s > discounted_strike => (
            s - discounted_strike,
            1.0,
            -r * discounted_strike,
            t * discounted_strike,
        ),
        _ => (0.0, 0.0, 0.0, 0.0),
    };

    (
        price,
        Greeks {
            delta,
            gamma: 0.0,
            theta: theta_annual / DAYS_PER_YEAR,
            vega: 0.0,
            rho: rho_unit / 100.0,
        },
    )
}

fn closed_form(input: &PricingInput) -> (f64, Greeks) {
    let PricingInput {
        spot: s,
        strike: k,
        time_to_expiry: t,
        risk_free_rate: r,
        volatility: sigma,
        kind,
    } = *input;

    let n = Normal::standard();
    let sqrt_t = t.sqrt();
    let d1 = ((s / k).ln() + (r + 0.5 * sigma * sigma) * t) / (sigma * sqrt_t);
    let d2 = d1 - sigma * sqrt_t;
    let discount = (-r * t).exp();
    let pdf_d1 = n.pdf(d1);

    let gamma = pdf_d1 / (s * sigma * sqrt_t);
    let vega = s * pdf_d1 * sqrt_t / 100.0;
    let decay = -s * pdf_d1 * sigma / (2.0 * sqrt_t);

    let (price, delta, theta_annual, rho_unit) = match kind {
        OptionKind::Call => {
            let nd2 = n.cdf(d2);
            (
                s * n.cdf(d1) - k * discount * nd2,
                n.cdf(d1),
                decay - r * k * discount * nd2,
                k * t * discount * nd2,
            )
        }
        OptionKind::Put => {
            let nmd2 = n.cdf(-d2);
            (
                k * discount * nmd2 - s * n.cdf(-d1),
                n.cdf(d1) - 1.0,
                decay + r * k * discount * nmd2,
                -k * t * discount * nmd2,
            )
        }
    };

    (
        price.max(0.0),
        Greeks {
            delta,
            gamma,
            theta: theta_annual / DAYS_PER_YEAR,
            vega,
            rho: rho_unit / 100.0,
        },
    )
}
