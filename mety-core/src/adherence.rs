//! Adherence scores returned by log submission.

use serde::{Deserialize, Serialize};

/// Fractions in `[0, 1]` of logged values that matched the target plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Adherence {
    pub total: f64,
    pub diet: f64,
    pub supplement: f64,
}

impl Adherence {
    pub fn total_percent(&self) -> String {
        as_percent(self.total)
    }

    pub fn diet_percent(&self) -> String {
        as_percent(self.diet)
    }

    pub fn supplement_percent(&self) -> String {
        as_percent(self.supplement)
    }
}

/// Render a fraction as an integer percentage: `0.73` becomes `"73%"`.
pub fn as_percent(fraction: f64) -> String {
    format!("{}%", (fraction * 100.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_percent() {
        assert_eq!(as_percent(0.73), "73%");
        assert_eq!(as_percent(0.0), "0%");
        assert_eq!(as_percent(1.0), "100%");
        assert_eq!(as_percent(0.006), "1%");
    }

    #[test]
    fn test_breakdown() {
        let adherence = Adherence {
            total: 0.5,
            diet: 0.25,
            supplement: 0.875,
        };
        assert_eq!(adherence.total_percent(), "50%");
        assert_eq!(adherence.diet_percent(), "25%");
        assert_eq!(adherence.supplement_percent(), "88%");
    }
}
