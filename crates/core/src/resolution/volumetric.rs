use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::quote::Dimensions;
use crate::errors::QuoteError;
use crate::resolution::normalizer;

/// cm³ per billable kilogram.
pub const VOLUMETRIC_DIVISOR: u32 = 5000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightAssessment {
    pub requested: Decimal,
    pub volumetric: Decimal,
    pub billable: Decimal,
}

/// `L * W * H / 5000`, or zero when dimensions are absent or any side is
/// not positive.
pub fn volumetric_weight(dimensions: Option<&Dimensions>) -> Result<Decimal, QuoteError> {
    let Some(dimensions) = dimensions.filter(|dimensions| dimensions.all_positive()) else {
        return Ok(Decimal::ZERO);
    };

    dimensions
        .length_cm
        .checked_mul(dimensions.width_cm)
        .and_then(|area| area.checked_mul(dimensions.height_cm))
        .and_then(|volume| volume.checked_div(Decimal::from(VOLUMETRIC_DIVISOR)))
        .map(|weight| weight.normalize())
        .ok_or_else(|| QuoteError::invalid_input("dimensions", "volume exceeds supported range"))
}

pub fn billable_weight(declared: Decimal, volumetric: Decimal) -> Decimal {
    declared.max(volumetric)
}

/// Validates the declared weight first; volumetric weight never stands in
/// for a missing or non-positive physical weight.
pub fn assess(
    declared_weight: Decimal,
    dimensions: Option<&Dimensions>,
) -> Result<WeightAssessment, QuoteError> {
    let requested = normalizer::require_positive("weight", declared_weight)?;
    let volumetric = volumetric_weight(dimensions)?;

    Ok(WeightAssessment { requested, volumetric, billable: billable_weight(requested, volumetric) })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{assess, billable_weight, volumetric_weight};
    use crate::domain::quote::Dimensions;
    use crate::errors::QuoteErrorKind;

    fn cube(side: i64) -> Dimensions {
        Dimensions::new(Decimal::from(side), Decimal::from(side), Decimal::from(side))
    }

    #[test]
    fn forty_cm_cube_weighs_twelve_point_eight() {
        let weight = volumetric_weight(Some(&cube(40))).expect("volumetric");
        assert_eq!(weight, Decimal::new(128, 1));
    }

    #[test]
    fn follows_volume_over_five_thousand_law() {
        let box_dims = Dimensions::new(Decimal::from(30), Decimal::from(20), Decimal::new(155, 1));
        let expected = Decimal::from(30) * Decimal::from(20) * Decimal::new(155, 1)
            / Decimal::from(5000);
        assert_eq!(volumetric_weight(Some(&box_dims)).expect("volumetric"), expected);
    }

    #[test]
    fn missing_or_degenerate_dimensions_weigh_nothing() {
        assert_eq!(volumetric_weight(None).expect("none"), Decimal::ZERO);
        let flat = Dimensions::new(Decimal::from(40), Decimal::ZERO, Decimal::from(40));
        assert_eq!(volumetric_weight(Some(&flat)).expect("flat"), Decimal::ZERO);
        let negative = Dimensions::new(Decimal::from(40), Decimal::from(-2), Decimal::from(40));
        assert_eq!(volumetric_weight(Some(&negative)).expect("negative"), Decimal::ZERO);
    }

    #[test]
    fn billable_weight_is_the_larger_of_the_two() {
        assert_eq!(billable_weight(Decimal::from(3), Decimal::new(128, 1)), Decimal::new(128, 1));
        assert_eq!(billable_weight(Decimal::from(20), Decimal::new(128, 1)), Decimal::from(20));
    }

    #[test]
    fn assessment_keeps_requested_and_billable_apart() {
        let assessment = assess(Decimal::new(5, 1), Some(&cube(40))).expect("assessment");

        assert_eq!(assessment.requested, Decimal::new(5, 1));
        assert_eq!(assessment.volumetric, Decimal::new(128, 1));
        assert_eq!(assessment.billable, Decimal::new(128, 1));
        assert!(assessment.billable >= assessment.requested);
    }

    #[test]
    fn non_positive_declared_weight_fails_even_with_large_volume() {
        let error = assess(Decimal::ZERO, Some(&cube(100))).expect_err("zero weight");
        assert_eq!(error.kind(), QuoteErrorKind::InvalidInput);
    }

    #[test]
    fn overflowing_volume_is_rejected() {
        let huge = Dimensions::new(Decimal::MAX, Decimal::MAX, Decimal::from(2));
        let error = volumetric_weight(Some(&huge)).expect_err("overflow");
        assert_eq!(error.kind(), QuoteErrorKind::InvalidInput);
    }
}
