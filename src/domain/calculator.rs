//! Material requirement math for window production.
//!
//! Dimensions are in millimetres; profile is measured in metres, glass in
//! square metres and hardware in units (one set per window).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

use super::MaterialType;

const MM_PER_M: i64 = 1_000;
const MM2_PER_M2: i64 = 1_000_000;

/// Perimeter of a window frame in metres: 2 x (width + height) / 1000.
pub fn profile_length(width_mm: i32, height_mm: i32) -> Decimal {
    Decimal::from(2 * (i64::from(width_mm) + i64::from(height_mm))) / Decimal::from(MM_PER_M)
}

/// Glazing area in square metres: width x height / 1,000,000.
pub fn glass_area(width_mm: i32, height_mm: i32) -> Decimal {
    Decimal::from(i64::from(width_mm) * i64::from(height_mm)) / Decimal::from(MM2_PER_M2)
}

/// Fixed ratio of one hardware set per window.
pub fn hardware_units(quantity: i32) -> Decimal {
    Decimal::from(quantity)
}

/// One order line as the calculator sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowLine {
    pub width_mm: i32,
    pub height_mm: i32,
    pub quantity: i32,
}

/// Required quantity per material type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialRequirements(BTreeMap<MaterialType, Decimal>);

impl MaterialRequirements {
    pub fn for_lines(lines: &[WindowLine]) -> Self {
        let mut required = BTreeMap::new();
        for line in lines {
            let quantity = Decimal::from(line.quantity);
            *required.entry(MaterialType::Profile).or_insert(Decimal::ZERO) +=
                profile_length(line.width_mm, line.height_mm) * quantity;
            *required.entry(MaterialType::Glass).or_insert(Decimal::ZERO) +=
                glass_area(line.width_mm, line.height_mm) * quantity;
            *required.entry(MaterialType::Hardware).or_insert(Decimal::ZERO) +=
                hardware_units(line.quantity);
        }
        required.retain(|_, qty| !qty.is_zero());
        Self(required)
    }

    pub fn get(&self, material_type: MaterialType) -> Decimal {
        self.0.get(&material_type).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn iter(&self) -> impl Iterator<Item = (MaterialType, Decimal)> + '_ {
        self.0.iter().map(|(kind, qty)| (*kind, *qty))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Compares against available stock per type; types missing from
    /// `available` count as zero.
    pub fn shortfalls(&self, available: &BTreeMap<MaterialType, Decimal>) -> Vec<MaterialShortfall> {
        self.iter()
            .filter_map(|(material_type, required)| {
                let available = available.get(&material_type).copied().unwrap_or(Decimal::ZERO);
                (required > available).then(|| MaterialShortfall {
                    material_type,
                    required,
                    available,
                    shortfall: required - available,
                })
            })
            .collect()
    }
}

/// A single material type whose requirement exceeds what is in stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MaterialShortfall {
    pub material_type: MaterialType,
    pub required: Decimal,
    pub available: Decimal,
    pub shortfall: Decimal,
}

impl std::fmt::Display for MaterialShortfall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} requires {} but only {} available (short by {})",
            self.material_type,
            self.required.normalize(),
            self.available.normalize(),
            self.shortfall.normalize()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn square_metre_window() {
        assert_eq!(profile_length(1000, 1000), dec!(4));
        assert_eq!(glass_area(1000, 1000), dec!(1));
        assert_eq!(hardware_units(3), dec!(3));
    }

    #[test]
    fn three_square_windows_need_twelve_metres_of_profile() {
        let req = MaterialRequirements::for_lines(&[WindowLine {
            width_mm: 1000,
            height_mm: 1000,
            quantity: 3,
        }]);
        assert_eq!(req.get(MaterialType::Profile), dec!(12));
        assert_eq!(req.get(MaterialType::Glass), dec!(3));
        assert_eq!(req.get(MaterialType::Hardware), dec!(3));
        assert_eq!(req.get(MaterialType::Seal), Decimal::ZERO);
    }

    #[test]
    fn shortfall_names_profile_gap() {
        let req = MaterialRequirements::for_lines(&[WindowLine {
            width_mm: 1000,
            height_mm: 1000,
            quantity: 3,
        }]);
        let available = BTreeMap::from([
            (MaterialType::Profile, dec!(10)),
            (MaterialType::Glass, dec!(50)),
            (MaterialType::Hardware, dec!(50)),
        ]);
        let gaps = req.shortfalls(&available);
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].material_type, MaterialType::Profile);
        assert_eq!(gaps[0].shortfall, dec!(2));
    }

    #[test]
    fn lines_aggregate_per_type() {
        let req = MaterialRequirements::for_lines(&[
            WindowLine {
                width_mm: 600,
                height_mm: 900,
                quantity: 2,
            },
            WindowLine {
                width_mm: 1200,
                height_mm: 1500,
                quantity: 1,
            },
        ]);
        assert_eq!(req.get(MaterialType::Profile), dec!(6) + dec!(5.4));
        assert_eq!(req.get(MaterialType::Glass), dec!(1.08) + dec!(1.8));
        assert_eq!(req.get(MaterialType::Hardware), dec!(3));
    }

    proptest! {
        #[test]
        fn requirements_are_deterministic(
            lines in prop::collection::vec((1i32..4000, 1i32..4000, 1i32..50), 0..8)
        ) {
            let lines: Vec<WindowLine> = lines
                .into_iter()
                .map(|(w, h, q)| WindowLine { width_mm: w, height_mm: h, quantity: q })
                .collect();
            let first = MaterialRequirements::for_lines(&lines);
            let second = MaterialRequirements::for_lines(&lines);
            prop_assert_eq!(&first, &second);

            let units: i32 = lines.iter().map(|l| l.quantity).sum();
            prop_assert_eq!(first.get(MaterialType::Hardware), Decimal::from(units));
        }

        #[test]
        fn no_shortfall_when_stock_matches_requirement(
            w in 1i32..4000, h in 1i32..4000, q in 1i32..50
        ) {
            let req = MaterialRequirements::for_lines(&[WindowLine { width_mm: w, height_mm: h, quantity: q }]);
            let available: BTreeMap<_, _> = req.iter().collect();
            prop_assert!(req.shortfalls(&available).is_empty());
        }
    }
}
