//! FIFO material-lot consumption
//!
//! Lots of a material are consumed oldest arrival first. Quarantined,
//! expired and depleted lots are skipped. Plans are computed before any lot
//! is touched, so a request that cannot be covered changes nothing.

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::core::identity::EntityId;
use crate::core::profile::MAX_WARNING_DAYS;
use crate::entities::lot::MaterialLot;
use crate::entities::material::Material;
use crate::entities::worksheet::{LotConsumption, MaterialRequirement};

/// Errors raised by stock operations
#[derive(Debug, Error, PartialEq)]
pub enum InventoryError {
    #[error("quantity must be positive (got {0})")]
    InvalidQuantity(Decimal),

    #[error("insufficient stock for {material}: requested {requested}, available {available}")]
    InsufficientStock {
        material: EntityId,
        requested: Decimal,
        available: Decimal,
    },

    #[error("lot {0} not found")]
    UnknownLot(EntityId),

    #[error("lot {lot} has only {remaining} left, cannot draw {requested}")]
    LotExhausted {
        lot: EntityId,
        remaining: Decimal,
        requested: Decimal,
    },

    #[error("expiry window of {0} days is outside 0..={max}", max = MAX_WARNING_DAYS)]
    InvalidWindow(i64),
}

/// A quantity to draw from one lot
#[derive(Debug, Clone, PartialEq)]
pub struct LotDraw {
    pub material: EntityId,
    pub lot: EntityId,
    pub lot_number: String,
    pub quantity: Decimal,
}

/// Usable lots of a material in FIFO order
///
/// Ordered by arrival date, then lot number, then id so ties are stable.
pub fn available_lots<'a>(
    lots: &'a [MaterialLot],
    material: &EntityId,
    today: NaiveDate,
) -> Vec<&'a MaterialLot> {
    let mut usable: Vec<&MaterialLot> = lots
        .iter()
        .filter(|l| &l.material == material)
        .filter(|l| !l.quarantined && !l.is_expired(today) && !l.is_depleted())
        .collect();
    usable.sort_by(|a, b| {
        a.arrival_date
            .cmp(&b.arrival_date)
            .then_with(|| a.lot_number.cmp(&b.lot_number))
            .then_with(|| a.id.cmp(&b.id))
    });
    usable
}

pub fn available_quantity(lots: &[MaterialLot], material: &EntityId, today: NaiveDate) -> Decimal {
    available_lots(lots, material, today)
        .iter()
        .map(|l| l.quantity_remaining)
        .sum()
}

/// Greedy oldest-lot-first plan for one material
pub fn plan_fifo(
    lots: &[MaterialLot],
    material: &EntityId,
    quantity: Decimal,
    today: NaiveDate,
) -> Result<Vec<LotDraw>, InventoryError> {
    if quantity <= Decimal::ZERO {
        return Err(InventoryError::InvalidQuantity(quantity));
    }

    let usable = available_lots(lots, material, today);
    let available: Decimal = usable.iter().map(|l| l.quantity_remaining).sum();
    if available < quantity {
        return Err(InventoryError::InsufficientStock {
            material: material.clone(),
            requested: quantity,
            available,
        });
    }

    let mut outstanding = quantity;
    let mut plan = Vec::new();
    for lot in usable {
        if outstanding <= Decimal::ZERO {
            break;
        }
        let take = outstanding.min(lot.quantity_remaining);
        plan.push(LotDraw {
            material: material.clone(),
            lot: lot.id.clone(),
            lot_number: lot.lot_number.clone(),
            quantity: take,
        });
        outstanding -= take;
    }

    tracing::debug!(%material, %quantity, draws = plan.len(), "planned FIFO consumption");
    Ok(plan)
}

/// Plan every requirement against a scratch copy of the lots
///
/// Two requirements for the same material see each other's draws.
pub fn plan_requirements(
    lots: &[MaterialLot],
    requirements: &[MaterialRequirement],
    today: NaiveDate,
) -> Result<Vec<LotDraw>, InventoryError> {
    let mut scratch = lots.to_vec();
    let mut plan = Vec::new();
    for req in requirements {
        let draws = plan_fifo(&scratch, &req.material, req.quantity, today)?;
        apply_plan(&mut scratch, &draws)?;
        plan.extend(draws);
    }
    Ok(plan)
}

/// Decrement lots according to a plan
///
/// The whole plan is checked first; on error no lot is modified.
pub fn apply_plan(lots: &mut [MaterialLot], plan: &[LotDraw]) -> Result<(), InventoryError> {
    for draw in plan {
        let lot = lots
            .iter()
            .find(|l| l.id == draw.lot)
            .ok_or_else(|| InventoryError::UnknownLot(draw.lot.clone()))?;
        let requested: Decimal = plan
            .iter()
            .filter(|d| d.lot == draw.lot)
            .map(|d| d.quantity)
            .sum();
        if requested > lot.quantity_remaining {
            return Err(InventoryError::LotExhausted {
                lot: lot.id.clone(),
                remaining: lot.quantity_remaining,
                requested,
            });
        }
    }

    for draw in plan {
        if let Some(lot) = lots.iter_mut().find(|l| l.id == draw.lot) {
            lot.quantity_remaining -= draw.quantity;
        }
    }
    Ok(())
}

/// Return consumed quantities to their lots, capped at the quantity received
///
/// Entries already marked as returned are skipped. Returns the ids of the lots
/// that changed.
pub fn restock(
    lots: &mut [MaterialLot],
    consumptions: &[LotConsumption],
) -> Result<Vec<EntityId>, InventoryError> {
    let pending: Vec<&LotConsumption> = consumptions.iter().filter(|c| !c.returned).collect();
    for c in &pending {
        if !lots.iter().any(|l| l.id == c.lot) {
            return Err(InventoryError::UnknownLot(c.lot.clone()));
        }
    }

    let mut touched = Vec::new();
    for c in pending {
        if let Some(lot) = lots.iter_mut().find(|l| l.id == c.lot) {
            lot.quantity_remaining = (lot.quantity_remaining + c.quantity).min(lot.quantity_received);
            if !touched.contains(&lot.id) {
                touched.push(lot.id.clone());
            }
        }
    }
    Ok(touched)
}

/// Available stock of one material
#[derive(Debug, Clone, PartialEq)]
pub struct StockLevel {
    pub material: EntityId,
    pub name: String,
    pub unit: String,
    pub available: Decimal,
    pub reorder_level: Option<Decimal>,
    pub usable_lots: usize,
}

impl StockLevel {
    pub fn is_low(&self) -> bool {
        self.reorder_level.is_some_and(|r| self.available <= r)
    }
}

pub fn stock_levels(
    materials: &[Material],
    lots: &[MaterialLot],
    today: NaiveDate,
) -> Vec<StockLevel> {
    materials
        .iter()
        .map(|m| {
            let usable = available_lots(lots, &m.id, today);
            StockLevel {
                material: m.id.clone(),
                name: m.title.clone(),
                unit: m.unit.clone(),
                available: usable.iter().map(|l| l.quantity_remaining).sum(),
                reorder_level: m.reorder_level,
                usable_lots: usable.len(),
            }
        })
        .collect()
}

pub fn low_stock(materials: &[Material], lots: &[MaterialLot], today: NaiveDate) -> Vec<StockLevel> {
    stock_levels(materials, lots, today)
        .into_iter()
        .filter(StockLevel::is_low)
        .collect()
}

/// Last date of a `days`-long expiry window starting today
pub fn warning_horizon(today: NaiveDate, days: i64) -> Result<NaiveDate, InventoryError> {
    if !(0..=MAX_WARNING_DAYS).contains(&days) {
        return Err(InventoryError::InvalidWindow(days));
    }
    u64::try_from(days)
        .ok()
        .and_then(|d| today.checked_add_days(Days::new(d)))
        .ok_or(InventoryError::InvalidWindow(days))
}

/// Lots with stock left that expire within `days` (today inclusive), soonest first
pub fn expiring_lots(
    lots: &[MaterialLot],
    today: NaiveDate,
    days: i64,
) -> Result<Vec<&MaterialLot>, InventoryError> {
    let horizon = warning_horizon(today, days)?;
    let mut expiring: Vec<&MaterialLot> = lots
        .iter()
        .filter(|l| !l.is_depleted())
        .filter(|l| l.expiry_date.is_some_and(|d| d >= today && d <= horizon))
        .collect();
    expiring.sort_by_key(|l| l.expiry_date);
    Ok(expiring)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::EntityPrefix;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn lot(material: &EntityId, number: &str, arrival: NaiveDate, qty: Decimal) -> MaterialLot {
        MaterialLot::receive(
            material.clone(),
            number.to_string(),
            arrival,
            qty,
            "ana".to_string(),
        )
    }

    fn today() -> NaiveDate {
        date(2026, 5, 1)
    }

    #[test]
    fn test_fifo_takes_oldest_first() {
        let mat = EntityId::new(EntityPrefix::Mat);
        let lots = vec![
            lot(&mat, "NEW", date(2026, 3, 1), dec!(10)),
            lot(&mat, "OLD", date(2026, 1, 1), dec!(4)),
            lot(&mat, "MID", date(2026, 2, 1), dec!(5)),
        ];
        let plan = plan_fifo(&lots, &mat, dec!(7), today()).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].lot_number, "OLD");
        assert_eq!(plan[0].quantity, dec!(4));
        assert_eq!(plan[1].lot_number, "MID");
        assert_eq!(plan[1].quantity, dec!(3));
    }

    #[test]
    fn test_fifo_skips_unusable_lots() {
        let mat = EntityId::new(EntityPrefix::Mat);
        let other = EntityId::new(EntityPrefix::Mat);
        let mut expired = lot(&mat, "EXP", date(2025, 1, 1), dec!(10));
        expired.expiry_date = Some(date(2026, 4, 30));
        let mut held = lot(&mat, "HOLD", date(2025, 6, 1), dec!(10));
        held.quarantined = true;
        let mut empty = lot(&mat, "EMPTY", date(2025, 7, 1), dec!(10));
        empty.quantity_remaining = Decimal::ZERO;
        let lots = vec![
            expired,
            held,
            empty,
            lot(&other, "OTHER", date(2024, 1, 1), dec!(10)),
            lot(&mat, "GOOD", date(2026, 1, 1), dec!(3)),
        ];

        assert_eq!(available_quantity(&lots, &mat, today()), dec!(3));
        let plan = plan_fifo(&lots, &mat, dec!(2), today()).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].lot_number, "GOOD");
    }

    #[test]
    fn test_lot_expiring_today_is_still_usable() {
        let mat = EntityId::new(EntityPrefix::Mat);
        let mut l = lot(&mat, "EDGE", date(2026, 1, 1), dec!(1));
        l.expiry_date = Some(today());
        let lots = vec![l];
        assert!(plan_fifo(&lots, &mat, dec!(1), today()).is_ok());
    }

    #[test]
    fn test_insufficient_stock() {
        let mat = EntityId::new(EntityPrefix::Mat);
        let lots = vec![lot(&mat, "A", date(2026, 1, 1), dec!(2))];
        let err = plan_fifo(&lots, &mat, dec!(2.5), today()).unwrap_err();
        assert_eq!(
            err,
            InventoryError::InsufficientStock {
                material: mat.clone(),
                requested: dec!(2.5),
                available: dec!(2),
            }
        );
    }

    #[test]
    fn test_rejects_non_positive_quantity() {
        let mat = EntityId::new(EntityPrefix::Mat);
        let lots = vec![lot(&mat, "A", date(2026, 1, 1), dec!(2))];
        assert!(matches!(
            plan_fifo(&lots, &mat, Decimal::ZERO, today()),
            Err(InventoryError::InvalidQuantity(_))
        ));
        assert!(matches!(
            plan_fifo(&lots, &mat, dec!(-1), today()),
            Err(InventoryError::InvalidQuantity(_))
        ));
    }

    #[test]
    fn test_same_arrival_date_ordered_by_lot_number() {
        let mat = EntityId::new(EntityPrefix::Mat);
        let lots = vec![
            lot(&mat, "B-2", date(2026, 1, 1), dec!(1)),
            lot(&mat, "A-1", date(2026, 1, 1), dec!(1)),
        ];
        let plan = plan_fifo(&lots, &mat, dec!(1), today()).unwrap();
        assert_eq!(plan[0].lot_number, "A-1");
    }

    #[test]
    fn test_plan_requirements_accumulates() {
        let mat = EntityId::new(EntityPrefix::Mat);
        let lots = vec![
            lot(&mat, "OLD", date(2026, 1, 1), dec!(3)),
            lot(&mat, "NEW", date(2026, 2, 1), dec!(3)),
        ];
        let reqs = vec![
            MaterialRequirement {
                material: mat.clone(),
                quantity: dec!(2),
            },
            MaterialRequirement {
                material: mat.clone(),
                quantity: dec!(2),
            },
        ];
        let plan = plan_requirements(&lots, &reqs, today()).unwrap();
        let from_old: Decimal = plan
            .iter()
            .filter(|d| d.lot_number == "OLD")
            .map(|d| d.quantity)
            .sum();
        assert_eq!(from_old, dec!(3));
        // original lots untouched
        assert_eq!(lots[0].quantity_remaining, dec!(3));

        let too_much = vec![MaterialRequirement {
            material: mat.clone(),
            quantity: dec!(7),
        }];
        assert!(plan_requirements(&lots, &too_much, today()).is_err());
    }

    #[test]
    fn test_apply_plan_is_all_or_nothing() {
        let mat = EntityId::new(EntityPrefix::Mat);
        let mut lots = vec![
            lot(&mat, "A", date(2026, 1, 1), dec!(2)),
            lot(&mat, "B", date(2026, 2, 1), dec!(2)),
        ];
        let bad_plan = vec![
            LotDraw {
                material: mat.clone(),
                lot: lots[0].id.clone(),
                lot_number: "A".to_string(),
                quantity: dec!(1),
            },
            LotDraw {
                material: mat.clone(),
                lot: lots[1].id.clone(),
                lot_number: "B".to_string(),
                quantity: dec!(5),
            },
        ];
        assert!(matches!(
            apply_plan(&mut lots, &bad_plan),
            Err(InventoryError::LotExhausted { .. })
        ));
        assert_eq!(lots[0].quantity_remaining, dec!(2));

        let plan = plan_fifo(&lots, &mat, dec!(3), today()).unwrap();
        apply_plan(&mut lots, &plan).unwrap();
        assert_eq!(lots[0].quantity_remaining, Decimal::ZERO);
        assert_eq!(lots[1].quantity_remaining, dec!(1));
    }

    #[test]
    fn test_restock_returns_and_caps() {
        let mat = EntityId::new(EntityPrefix::Mat);
        let mut lots = vec![lot(&mat, "A", date(2026, 1, 1), dec!(5))];
        lots[0].quantity_remaining = dec!(1);
        let lot_id = lots[0].id.clone();
        let consumption = |qty: Decimal, returned: bool| LotConsumption {
            material: mat.clone(),
            lot: lot_id.clone(),
            lot_number: "A".to_string(),
            quantity: qty,
            consumed_at: Utc::now(),
            returned,
        };
        let consumptions = vec![consumption(dec!(3), false), consumption(dec!(10), true)];
        let touched = restock(&mut lots, &consumptions).unwrap();
        assert_eq!(touched, vec![lots[0].id.clone()]);
        assert_eq!(lots[0].quantity_remaining, dec!(4));

        let overflow = vec![consumption(dec!(3), false)];
        restock(&mut lots, &overflow).unwrap();
        assert_eq!(lots[0].quantity_remaining, dec!(5));
    }

    #[test]
    fn test_restock_unknown_lot() {
        let mat = EntityId::new(EntityPrefix::Mat);
        let mut lots = vec![lot(&mat, "A", date(2026, 1, 1), dec!(5))];
        let ghost = LotConsumption {
            material: mat.clone(),
            lot: EntityId::new(EntityPrefix::Lot),
            lot_number: "GHOST".to_string(),
            quantity: dec!(1),
            consumed_at: Utc::now(),
            returned: false,
        };
        assert!(matches!(
            restock(&mut lots, &[ghost]),
            Err(InventoryError::UnknownLot(_))
        ));
    }

    #[test]
    fn test_low_stock_and_expiring() {
        let mut zirconia = Material::new("Zr".to_string(), "disc".to_string(), "ana".to_string());
        zirconia.reorder_level = Some(dec!(2));
        let wax = Material::new("Wax".to_string(), "g".to_string(), "ana".to_string());

        let mut soon = lot(&zirconia.id, "Z1", date(2026, 1, 1), dec!(2));
        soon.expiry_date = Some(date(2026, 5, 20));
        let mut later = lot(&wax.id, "W1", date(2026, 1, 1), dec!(100));
        later.expiry_date = Some(date(2027, 1, 1));
        let lots = vec![soon, later];

        let materials = vec![zirconia.clone(), wax];
        let low = low_stock(&materials, &lots, today());
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].material, zirconia.id);

        let expiring = expiring_lots(&lots, today(), 30).unwrap();
        assert_eq!(expiring.len(), 1);
        assert_eq!(expiring[0].lot_number, "Z1");
    }

    #[test]
    fn test_expiry_window_out_of_range_is_an_error() {
        let lots: Vec<MaterialLot> = Vec::new();
        assert_eq!(
            expiring_lots(&lots, today(), 100_000_000),
            Err(InventoryError::InvalidWindow(100_000_000))
        );
        assert_eq!(
            warning_horizon(today(), -5),
            Err(InventoryError::InvalidWindow(-5))
        );
        assert_eq!(
            warning_horizon(NaiveDate::MAX, 1),
            Err(InventoryError::InvalidWindow(1))
        );
        assert_eq!(warning_horizon(today(), 0), Ok(today()));
    }
}
