//! Grouping of records by cost center with running subtotals.

use std::collections::HashMap;
use std::ops::AddAssign;

use log::warn;
use rust_decimal::Decimal;

use crate::model::Record;

/// Pair of amounts summed over a set of records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Totals {
    pub current_value: Decimal,
    pub market_value: Decimal,
}

impl Totals {
    /// Totals of a single record.
    pub fn of(record: &Record) -> Self {
        Self {
            current_value: record.current_value(),
            market_value: record.market_value(),
        }
    }
}

impl AddAssign for Totals {
    fn add_assign(&mut self, other: Self) {
        self.current_value = saturating_add(self.current_value, other.current_value);
        self.market_value = saturating_add(self.market_value, other.market_value);
    }
}

/// Adds two amounts, clamping to the representable range on overflow.
fn saturating_add(left: Decimal, right: Decimal) -> Decimal {
    left.checked_add(right).unwrap_or_else(|| {
        let clamped = if right.is_sign_negative() {
            Decimal::MIN
        } else {
            Decimal::MAX
        };
        warn!("Amount overflow adding {right} to {left}; clamping to {clamped}");
        clamped
    })
}

/// All records sharing one cost center, in fetch order.
#[derive(Clone, Debug, PartialEq)]
pub struct Group {
    cost_center: String,
    records: Vec<Record>,
    subtotal: Totals,
}

impl Group {
    fn new(cost_center: impl Into<String>) -> Self {
        Self {
            cost_center: cost_center.into(),
            records: Vec::new(),
            subtotal: Totals::default(),
        }
    }

    fn push(&mut self, record: Record) {
        self.subtotal += Totals::of(&record);
        self.records.push(record);
    }

    pub fn cost_center(&self) -> &str {
        &self.cost_center
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn subtotal(&self) -> Totals {
        self.subtotal
    }
}

/// Aggregated report content: groups in first-seen order plus grand totals.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Report {
    groups: Vec<Group>,
    totals: Totals,
}

impl Report {
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Sum of every group subtotal.
    pub fn totals(&self) -> Totals {
        self.totals
    }

    pub fn record_count(&self) -> usize {
        self.groups.iter().map(|group| group.records.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Groups `records` by [`Record::cost_center_key`].
///
/// Groups appear in the order their key is first seen; records keep their
/// arrival order within a group.  Malformed amounts count as zero, so this
/// never fails.
pub fn aggregate<I>(records: I) -> Report
where
    I: IntoIterator<Item = Record>,
{
    let mut groups: Vec<Group> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for record in records {
        let key = record.cost_center_key();
        let index = match positions.get(key) {
            Some(&index) => index,
            None => {
                let index = groups.len();
                positions.insert(key.to_string(), index);
                groups.push(Group::new(key));
                index
            }
        };
        groups[index].push(record);
    }

    let mut totals = Totals::default();
    for group in &groups {
        totals += group.subtotal;
    }

    Report { groups, totals }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UNASSIGNED_COST_CENTER;
    use proptest::prelude::*;

    fn record(cost_center: &str, current: &str) -> Record {
        Record::new()
            .with_cost_center(cost_center)
            .with_current_value(current)
    }

    #[test]
    fn groups_in_first_seen_order_with_subtotals() {
        let report = aggregate(vec![
            record("A", "10.5"),
            record("B", "20"),
            record("A", "5"),
        ]);

        let keys: Vec<_> = report.groups().iter().map(Group::cost_center).collect();
        assert_eq!(keys, vec!["A", "B"]);
        assert_eq!(report.groups()[0].subtotal().current_value, Decimal::new(155, 1));
        assert_eq!(report.groups()[0].records().len(), 2);
        assert_eq!(report.totals().current_value, Decimal::new(355, 1));
        assert_eq!(report.totals().market_value, Decimal::ZERO);
    }

    #[test]
    fn missing_cost_center_uses_sentinel_group() {
        let report = aggregate(vec![
            Record::new().with_current_value("1"),
            record("", "2"),
            record("X", "3"),
        ]);

        assert_eq!(report.groups()[0].cost_center(), UNASSIGNED_COST_CENTER);
        assert_eq!(report.groups()[0].subtotal().current_value, Decimal::from(3));
        assert_eq!(report.groups()[1].cost_center(), "X");
    }

    #[test]
    fn malformed_amounts_do_not_abort() {
        let report = aggregate(vec![
            record("A", "not a number"),
            record("A", "4").with_market_value("??"),
        ]);
        assert_eq!(report.totals().current_value, Decimal::from(4));
        assert_eq!(report.totals().market_value, Decimal::ZERO);
    }

    #[test]
    fn overflowing_amounts_saturate() {
        let huge = "79228162514264337593543950335";
        let report = aggregate(vec![
            record("A", huge).with_market_value(format!("-{huge}")),
            record("A", huge).with_market_value(format!("-{huge}")),
            record("B", "1"),
        ]);

        assert_eq!(report.groups()[0].subtotal().current_value, Decimal::MAX);
        assert_eq!(report.groups()[0].subtotal().market_value, Decimal::MIN);
        assert_eq!(report.totals().current_value, Decimal::MAX);
        assert_eq!(report.totals().market_value, Decimal::MIN);
    }

    #[test]
    fn empty_input_yields_empty_report() {
        let report = aggregate(Vec::new());
        assert!(report.is_empty());
        assert_eq!(report.totals(), Totals::default());
    }

    fn arbitrary_record() -> impl Strategy<Value = Record> {
        (
            prop::sample::select(vec!["A", "B", "C", "", "D"]),
            prop::option::of(-1_000_000i64..1_000_000i64),
            prop::option::of(-1_000_000i64..1_000_000i64),
            any::<bool>(),
        )
            .prop_map(|(center, current, market, garbage)| {
                let mut record = Record::new().with_cost_center(center);
                if let Some(cents) = current {
                    record = record.with_current_value(Decimal::new(cents, 2).to_string());
                }
                if let Some(cents) = market {
                    record = record.with_market_value(Decimal::new(cents, 2).to_string());
                } else if garbage {
                    record = record.with_market_value("n/a");
                }
                record
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Grand totals always equal the sum over every record.
        #[test]
        fn prop_grand_total_matches_record_sum(records in prop::collection::vec(arbitrary_record(), 0..40)) {
            let expected_current: Decimal = records.iter().map(Record::current_value).sum();
            let expected_market: Decimal = records.iter().map(Record::market_value).sum();
            let report = aggregate(records);

            let mut from_groups = Totals::default();
            for group in report.groups() {
                from_groups += group.subtotal();
            }

            prop_assert_eq!(report.totals().current_value, expected_current);
            prop_assert_eq!(report.totals().market_value, expected_market);
            prop_assert_eq!(from_groups, report.totals());
        }

        /// Groups come out in the order their key is first observed.
        #[test]
        fn prop_first_seen_order_is_preserved(records in prop::collection::vec(arbitrary_record(), 0..40)) {
            let mut expected: Vec<String> = Vec::new();
            for record in &records {
                let key = record.cost_center_key().to_string();
                if !expected.contains(&key) {
                    expected.push(key);
                }
            }

            let count = records.len();
            let report = aggregate(records);
            let keys: Vec<String> = report
                .groups()
                .iter()
                .map(|group| group.cost_center().to_string())
                .collect();

            prop_assert_eq!(keys, expected);
            prop_assert_eq!(report.record_count(), count);
        }
    }
}
