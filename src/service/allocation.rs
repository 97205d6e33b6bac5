use crate::models::{Allocation, Person, PersonLine, PersonSummary, ReceiptItem, SplitSummary};

/// 判定分摊完成的绝对容差 (吸收按数量反复除法的浮点误差)
pub const COMPLETION_EPSILON: f64 = 0.01;

/// 默认小费比例
pub const DEFAULT_TIP_PERCENTAGE: f64 = 15.0;

/// 计算每人小计/小费/合计及全局对账
///
/// 纯函数: 小费不计入对账基数, 分配给不在 `people` 中的 id 的单位不计入任何人.
pub fn summarize(
    items: &[ReceiptItem],
    people: &[Person],
    allocations: &Allocation,
    tip_percentage: f64,
) -> SplitSummary {
    let bill_total: f64 = items.iter().map(|i| i.price).sum();

    let person_summaries: Vec<PersonSummary> = people
        .iter()
        .map(|person| summarize_person(items, person, allocations, tip_percentage))
        .collect();

    let allocated_total: f64 = person_summaries.iter().map(|s| s.subtotal).sum();
    let outstanding = bill_total - allocated_total;

    SplitSummary {
        person_summaries,
        tip_percentage,
        bill_total,
        allocated_total,
        outstanding,
        is_complete: outstanding <= COMPLETION_EPSILON,
    }
}

fn summarize_person(
    items: &[ReceiptItem],
    person: &Person,
    allocations: &Allocation,
    tip_percentage: f64,
) -> PersonSummary {
    let mut lines = Vec::new();
    let mut subtotal = 0.0;

    for item in items {
        let units = allocations.units_for(&item.id, &person.id);
        if units == 0 {
            continue;
        }
        let share = item.unit_price() * f64::from(units);
        lines.push(PersonLine {
            description: item.description.clone(),
            quantity: units,
            price: share,
        });
        subtotal += share;
    }

    let tip = subtotal * (tip_percentage / 100.0);
    PersonSummary {
        person: person.clone(),
        items: lines,
        subtotal,
        tip,
        total: subtotal + tip,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(id: &str, name: &str) -> Person {
        Person {
            id: id.to_string(),
            name: name.to_string(),
            color_index: 0,
        }
    }

    fn item(id: &str, price: f64, quantity: u32) -> ReceiptItem {
        ReceiptItem {
            id: id.to_string(),
            description: "Wings".to_string(),
            price,
            quantity,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn unit_shares_and_tips() {
        let items = vec![item("item-0", 30.0, 3)];
        let people = vec![person("a", "Ana"), person("b", "Ben")];
        let mut alloc = Allocation::new();
        alloc.assign(&items[0], "a", 2).unwrap();
        alloc.assign(&items[0], "b", 1).unwrap();

        let summary = summarize(&items, &people, &alloc, 15.0);
        let ana = &summary.person_summaries[0];
        let ben = &summary.person_summaries[1];

        assert!(close(ana.subtotal, 20.0));
        assert!(close(ana.tip, 3.0));
        assert!(close(ana.total, 23.0));
        assert!(close(ben.subtotal, 10.0));
        assert!(close(ben.tip, 1.5));
        assert_eq!(ana.items[0].quantity, 2);
        assert!(summary.is_complete);
        assert!(close(summary.allocated_total, 30.0));
    }

    #[test]
    fn tip_is_excluded_from_reconciliation() {
        let items = vec![item("item-0", 40.0, 2)];
        let people = vec![person("a", "Ana")];
        let mut alloc = Allocation::new();
        alloc.assign(&items[0], "a", 1).unwrap();

        let summary = summarize(&items, &people, &alloc, 20.0);
        assert!(close(summary.allocated_total, 20.0));
        assert!(close(summary.outstanding, 20.0));
        assert!(!summary.is_complete);
    }

    #[test]
    fn rounding_residue_within_epsilon_is_complete() {
        // 100 元分 3 份, 单位金额不能整除
        let items = vec![item("item-0", 100.0, 3)];
        let people = vec![person("a", "Ana"), person("b", "Ben"), person("c", "Cy")];
        let mut alloc = Allocation::new();
        for p in ["a", "b", "c"] {
            alloc.assign(&items[0], p, 1).unwrap();
        }

        let summary = summarize(&items, &people, &alloc, 0.0);
        assert!(summary.outstanding.abs() <= COMPLETION_EPSILON);
        assert!(summary.is_complete);
    }

    #[test]
    fn outstanding_threshold_is_inclusive_of_half_cent() {
        let items = vec![item("item-0", 100.0, 1), item("item-1", 0.005, 1)];
        let people = vec![person("a", "Ana")];
        let mut alloc = Allocation::new();
        alloc.assign(&items[0], "a", 1).unwrap();

        let summary = summarize(&items, &people, &alloc, 15.0);
        assert!(close(summary.outstanding, 0.005));
        assert!(summary.is_complete);
    }

    #[test]
    fn units_held_by_unknown_ids_are_ignored() {
        let items = vec![item("item-0", 10.0, 2)];
        let people = vec![person("a", "Ana")];
        let mut alloc = Allocation::new();
        alloc.assign(&items[0], "ghost", 2).unwrap();

        let summary = summarize(&items, &people, &alloc, 15.0);
        assert_eq!(summary.person_summaries[0].subtotal, 0.0);
        assert!(summary.person_summaries[0].items.is_empty());
        assert!(close(summary.outstanding, 10.0));
    }

    #[test]
    fn summarize_is_deterministic() {
        let items = vec![item("item-0", 12.34, 3), item("item-1", 7.1, 7)];
        let people = vec![person("a", "Ana"), person("b", "Ben")];
        let mut alloc = Allocation::new();
        alloc.assign(&items[0], "a", 2).unwrap();
        alloc.assign(&items[1], "b", 5).unwrap();

        let first = summarize(&items, &people, &alloc, 12.5);
        let second = summarize(&items, &people, &alloc, 12.5);
        assert_eq!(first, second);
    }

    #[test]
    fn empty_bill_is_trivially_complete() {
        let summary = summarize(&[], &[], &Allocation::new(), DEFAULT_TIP_PERCENTAGE);
        assert_eq!(summary.bill_total, 0.0);
        assert!(summary.is_complete);
    }
}
