use uuid::Uuid;

pub const ORDER_PREFIX: &str = "PRD";
pub const DELIVERY_PREFIX: &str = "DEL";

/// `PRD-{year}-{seq:04}`
pub fn order_number(year: i32, seq: i64) -> String {
    format!("{}-{}-{:04}", ORDER_PREFIX, year, seq)
}

/// `DEL-{year}-{seq:04}`
pub fn delivery_number(year: i32, seq: i64) -> String {
    format!("{}-{}-{:04}", DELIVERY_PREFIX, year, seq)
}

/// `{orderNumber}-B{seq:02}`
pub fn batch_number(order_number: &str, seq: i64) -> String {
    format!("{}-B{:02}", order_number, seq)
}

pub fn order_scope(year: i32) -> String {
    format!("production_order:{}", year)
}

pub fn delivery_scope(year: i32) -> String {
    format!("warehouse_delivery:{}", year)
}

pub fn batch_scope(order_id: Uuid) -> String {
    format!("production_batch:{}", order_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn formats() {
        assert_eq!(order_number(2026, 1), "PRD-2026-0001");
        assert_eq!(order_number(2026, 12345), "PRD-2026-12345");
        assert_eq!(delivery_number(2026, 42), "DEL-2026-0042");
        assert_eq!(batch_number("ORD-001", 1), "ORD-001-B01");
        assert_eq!(batch_number("PRD-2026-0003", 11), "PRD-2026-0003-B11");
    }

    proptest! {
        #[test]
        fn distinct_sequences_give_distinct_numbers(
            year in 2000i32..2100,
            seqs in prop::collection::hash_set(1i64..100_000, 1..50)
        ) {
            let numbers: HashSet<String> = seqs.iter().map(|s| order_number(year, *s)).collect();
            prop_assert_eq!(numbers.len(), seqs.len());
            let batches: HashSet<String> = seqs.iter().map(|s| batch_number("PRD-2026-0001", *s)).collect();
            prop_assert_eq!(batches.len(), seqs.len());
        }
    }
}
