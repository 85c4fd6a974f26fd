//! GLM family and link-function math
//!
//! Pure, stateless closed forms for the five supported response families.
//! Link compatibility is validated once at configuration time; the scoring
//! path never re-checks domains, it floors near-zero denominators instead.

use serde::{Deserialize, Serialize};

use crate::error::{GlmError, Result};

/// Floor applied to |x| before inverting, to keep 1/x finite.
pub const INVERSE_EPS: f64 = 1e-5;

/// Supported response families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Family {
    Gaussian,
    Binomial,
    Poisson,
    Gamma,
    Tweedie,
}

impl Family {
    /// Canonical link for the family
    pub fn default_link(&self) -> Link {
        match self {
            Family::Gaussian => Link::Identity,
            Family::Binomial => Link::Logit,
            Family::Poisson => Link::Log,
            Family::Gamma => Link::Inverse,
            Family::Tweedie => Link::Tweedie,
        }
    }
}

/// Supported link functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Link {
    Identity,
    Logit,
    Log,
    Inverse,
    Tweedie,
}

/// Immutable family/link descriptor plus the Tweedie shape parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FamilyParams {
    pub family: Family,
    pub link: Link,
    /// Tweedie variance power p in Var(mu) = mu^p (NaN for other families)
    #[serde(deserialize_with = "nan_from_null")]
    pub tweedie_variance_power: f64,
    /// Tweedie link power q in link(x) = x^q (NaN for other families)
    #[serde(deserialize_with = "nan_from_null")]
    pub tweedie_link_power: f64,
}

/// serde_json writes NaN as null; read it back as NaN.
fn nan_from_null<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

impl FamilyParams {
    /// Family with its canonical link
    pub fn new(family: Family) -> Self {
        Self::with_link(family, family.default_link())
    }

    /// Family with an explicit link (validated by [`FamilyParams::validate`])
    pub fn with_link(family: Family, link: Link) -> Self {
        Self {
            family,
            link,
            tweedie_variance_power: f64::NAN,
            tweedie_link_power: f64::NAN,
        }
    }

    /// Tweedie family with its two shape powers
    pub fn tweedie(variance_power: f64, link_power: f64) -> Self {
        Self {
            family: Family::Tweedie,
            link: Link::Tweedie,
            tweedie_variance_power: variance_power,
            tweedie_link_power: link_power,
        }
    }

    /// Check the link belongs to the family's compatibility set.
    ///
    /// Called at configuration time; scoring assumes a validated pairing.
    pub fn validate(&self) -> Result<()> {
        let ok = match self.family {
            Family::Gaussian => matches!(self.link, Link::Identity | Link::Log | Link::Inverse),
            Family::Binomial => matches!(self.link, Link::Logit | Link::Log),
            Family::Poisson => matches!(self.link, Link::Log | Link::Identity),
            Family::Gamma => matches!(self.link, Link::Inverse | Link::Log | Link::Identity),
            Family::Tweedie => matches!(self.link, Link::Tweedie),
        };
        if !ok {
            return Err(GlmError::ConfigError(format!(
                "incompatible link {:?} for family {:?}",
                self.link, self.family
            )));
        }
        Ok(())
    }

    /// Reject a non-binary response for the binomial family.
    pub fn validate_response(&self, response_min: f64, response_max: f64) -> Result<()> {
        if self.family == Family::Binomial && (response_min != 0.0 || response_max != 1.0) {
            return Err(GlmError::ConfigError(format!(
                "binomial family requires a binary response, got min = {}, max = {}",
                response_min, response_max
            )));
        }
        Ok(())
    }

    /// Whether the configured link is the family's canonical link
    pub fn canonical(&self) -> bool {
        match self.family {
            Family::Gaussian => self.link == Link::Identity,
            Family::Binomial => self.link == Link::Logit,
            Family::Poisson => self.link == Link::Log,
            Family::Gamma | Family::Tweedie => false,
        }
    }

    /// Variance function Var(mu)
    pub fn variance(&self, mu: f64) -> f64 {
        match self.family {
            Family::Gaussian => 1.0,
            Family::Binomial => mu * (1.0 - mu),
            Family::Poisson => mu,
            Family::Gamma => mu * mu,
            Family::Tweedie => mu.powf(self.tweedie_variance_power),
        }
    }

    /// Unit deviance between an observation y and a fitted mean mu.
    ///
    /// Non-negative for every family, zero when y == mu exactly
    /// (Tweedie excluded, which uses the Jorgensen closed form).
    pub fn deviance(&self, y: f64, mu: f64) -> f64 {
        match self.family {
            Family::Gaussian => (y - mu) * (y - mu),
            Family::Binomial => 2.0 * (y_log_y(y, mu) + y_log_y(1.0 - y, 1.0 - mu)),
            Family::Poisson => {
                if y == 0.0 {
                    2.0 * mu
                } else {
                    2.0 * (y * (y / mu).ln() - (y - mu))
                }
            }
            Family::Gamma => {
                if y == 0.0 {
                    -2.0
                } else {
                    -2.0 * ((y / mu).ln() - (y - mu) / mu)
                }
            }
            Family::Tweedie => {
                let one_minus_p = 1.0 - self.tweedie_variance_power;
                let two_minus_p = 2.0 - self.tweedie_variance_power;
                y.powf(two_minus_p) / (one_minus_p * two_minus_p)
                    - y * mu.powf(one_minus_p) / one_minus_p
                    + mu.powf(two_minus_p) / two_minus_p
            }
        }
    }

    /// Negative log-likelihood contribution of one observation
    pub fn likelihood(&self, y: f64, eta: f64, mu: f64) -> f64 {
        match self.family {
            Family::Gaussian => 0.5 * (y - mu) * (y - mu),
            Family::Binomial => {
                if y == mu {
                    0.0
                } else {
                    (1.0 + ((1.0 - 2.0 * y) * eta).exp()).ln()
                }
            }
            _ => self.deviance(y, mu),
        }
    }

    /// Link function: mean scale -> linear-predictor scale
    pub fn link(&self, x: f64) -> f64 {
        match self.link {
            Link::Identity => x,
            Link::Logit => {
                debug_assert!((0.0..=1.0).contains(&x), "logit argument out of [0,1]: {}", x);
                (x / (1.0 - x)).ln()
            }
            Link::Log => x.ln(),
            Link::Inverse => 1.0 / clamp_away_from_zero(x),
            Link::Tweedie => x.powf(self.tweedie_link_power),
        }
    }

    /// Derivative of the link function
    pub fn link_deriv(&self, x: f64) -> f64 {
        match self.link {
            Link::Identity => 1.0,
            Link::Logit => {
                let div = x * (1.0 - x);
                if div == 0.0 {
                    1e9
                } else {
                    1.0 / div
                }
            }
            Link::Log => 1.0 / x,
            Link::Inverse => -1.0 / (x * x),
            Link::Tweedie => {
                self.tweedie_link_power * x.powf(self.tweedie_link_power - 1.0)
            }
        }
    }

    /// Inverse link: linear-predictor scale -> mean scale
    pub fn link_inv(&self, x: f64) -> f64 {
        match self.link {
            Link::Identity => x,
            Link::Logit => 1.0 / ((-x).exp() + 1.0),
            Link::Log => x.exp(),
            Link::Inverse => 1.0 / clamp_away_from_zero(x),
            Link::Tweedie => x.powf(1.0 / self.tweedie_link_power),
        }
    }

    /// Derivative of the inverse link
    pub fn link_inv_deriv(&self, x: f64) -> f64 {
        match self.link {
            Link::Identity => 1.0,
            Link::Logit => {
                let g = (-x).exp();
                g / ((g + 1.0) * (g + 1.0))
            }
            Link::Log => x.exp().max(f64::MIN_POSITIVE),
            Link::Inverse => {
                let xx = clamp_away_from_zero(x);
                -1.0 / (xx * xx)
            }
            Link::Tweedie => {
                let vp = (1.0 - self.tweedie_link_power) / self.tweedie_link_power;
                (1.0 / self.tweedie_link_power) * x.powf(vp)
            }
        }
    }
}

/// y * ln(y / mu), defined as 0 when y == 0 regardless of mu
fn y_log_y(y: f64, mu: f64) -> f64 {
    if y == 0.0 {
        return 0.0;
    }
    let mu = mu.max(f64::MIN_POSITIVE);
    y * (y / mu).ln()
}

/// Floor |x| at [`INVERSE_EPS`] preserving sign
fn clamp_away_from_zero(x: f64) -> f64 {
    if x < 0.0 {
        x.min(-INVERSE_EPS)
    } else {
        x.max(INVERSE_EPS)
    }
}
