use crate::error::SplitError;
use crate::models::NormalizedItem;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// 参与分摊的人员色板大小
pub const PERSON_COLOR_COUNT: usize = 8;

/// 分摊人员 (仅存活于会话内)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: String,
    pub name: String,
    pub color_index: usize,
}

/// 可分摊的明细行, id 形如 `item-0`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptItem {
    pub id: String,
    pub description: String,
    pub price: f64,
    pub quantity: u32,
}

impl ReceiptItem {
    /// 按扫描顺序生成明细 id
    pub fn from_normalized(items: &[NormalizedItem]) -> Vec<ReceiptItem> {
        items
            .iter()
            .enumerate()
            .map(|(idx, item)| ReceiptItem {
                id: format!("item-{}", idx),
                description: item.description.clone(),
                price: item.price,
                quantity: item.quantity.max(1),
            })
            .collect()
    }

    /// 每个单位的金额
    pub fn unit_price(&self) -> f64 {
        self.price / f64::from(self.quantity.max(1))
    }
}

/// 分配表: 明细 id -> (人员 id -> 已分配单位数)
///
/// 不变量: 任意明细上的分配合计 <= 明细数量. 所有修改先校验再落地,
/// 校验失败时分配表保持不变.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Allocation {
    items: IndexMap<String, IndexMap<String, u32>>,
}

impl Allocation {
    pub fn new() -> Self {
        Self::default()
    }

    /// 某人在某明细上的单位数
    pub fn units_for(&self, item_id: &str, person_id: &str) -> u32 {
        self.items
            .get(item_id)
            .and_then(|people| people.get(person_id))
            .copied()
            .unwrap_or(0)
    }

    /// 某明细的分配明细 (人员 id -> 单位数)
    pub fn item_allocations(&self, item_id: &str) -> Option<&IndexMap<String, u32>> {
        self.items.get(item_id)
    }

    /// 某明细已被分配的单位合计
    pub fn allocated_units(&self, item_id: &str) -> u32 {
        self.items
            .get(item_id)
            .map(|people| people.values().sum())
            .unwrap_or(0)
    }

    /// 未分配的剩余单位, 即可选择的上限
    pub fn unallocated(&self, item: &ReceiptItem) -> u32 {
        item.quantity.saturating_sub(self.allocated_units(&item.id))
    }

    pub fn is_fully_allocated(&self, item: &ReceiptItem) -> bool {
        self.allocated_units(&item.id) == item.quantity
    }

    /// 追加分配 (累加而非覆盖), 返回此人在该明细上的新单位数
    pub fn assign(&mut self, item: &ReceiptItem, person_id: &str, units: u32) -> Result<u32, SplitError> {
        if units == 0 {
            return Err(SplitError::ZeroUnits);
        }
        let available = self.unallocated(item);
        if units > available {
            return Err(SplitError::OverAllocation {
                item_id: item.id.clone(),
                requested: units,
                available,
            });
        }

        let entry = self
            .items
            .entry(item.id.clone())
            .or_default()
            .entry(person_id.to_string())
            .or_insert(0);
        *entry += units;
        Ok(*entry)
    }

    /// 批量分配已选单位; 整批校验通过后才写入
    pub fn assign_selection(
        &mut self,
        items: &[ReceiptItem],
        person_id: &str,
        selections: &IndexMap<String, u32>,
    ) -> Result<u32, SplitError> {
        let mut planned: Vec<(&ReceiptItem, u32)> = Vec::with_capacity(selections.len());
        for (item_id, &units) in selections {
            if units == 0 {
                continue;
            }
            let item = items
                .iter()
                .find(|i| &i.id == item_id)
                .ok_or_else(|| SplitError::UnknownItem(item_id.clone()))?;
            let available = self.unallocated(item);
            if units > available {
                return Err(SplitError::OverAllocation {
                    item_id: item.id.clone(),
                    requested: units,
                    available,
                });
            }
            planned.push((item, units));
        }

        if planned.is_empty() {
            return Err(SplitError::ZeroUnits);
        }

        let mut total = 0;
        for (item, units) in planned {
            self.assign(item, person_id, units)?;
            total += units;
        }
        Ok(total)
    }

    /// 清除某人在某明细上的全部单位, 返回释放的单位数
    pub fn clear_person(&mut self, item_id: &str, person_id: &str) -> u32 {
        let Some(people) = self.items.get_mut(item_id) else {
            return 0;
        };
        let released = people.shift_remove(person_id).unwrap_or(0);
        if people.is_empty() {
            self.items.shift_remove(item_id);
        }
        released
    }

    /// 清除某明细上的全部分配
    pub fn clear_item(&mut self, item_id: &str) -> u32 {
        self.items
            .shift_remove(item_id)
            .map(|people| people.values().sum())
            .unwrap_or(0)
    }

    /// 在两人之间转移已分配单位 (可作用于已分配满的明细)
    pub fn move_units(
        &mut self,
        item: &ReceiptItem,
        from_person: &str,
        to_person: &str,
        units: u32,
    ) -> Result<(), SplitError> {
        if units == 0 {
            return Err(SplitError::ZeroUnits);
        }
        let held = self.units_for(&item.id, from_person);
        if units > held {
            return Err(SplitError::InsufficientUnits {
                item_id: item.id.clone(),
                person_id: from_person.to_string(),
                requested: units,
                held,
            });
        }
        if from_person == to_person {
            return Ok(());
        }

        let people = self.items.entry(item.id.clone()).or_default();
        if held == units {
            people.shift_remove(from_person);
        } else if let Some(from) = people.get_mut(from_person) {
            *from -= units;
        }
        *people.entry(to_person.to_string()).or_insert(0) += units;
        Ok(())
    }

    /// 整行改派给一人
    pub fn reassign_item(&mut self, item: &ReceiptItem, person_id: &str) {
        let mut people = IndexMap::new();
        people.insert(person_id.to_string(), item.quantity);
        self.items.insert(item.id.clone(), people);
    }

    /// 换新单据时整体作废
    pub fn reset(&mut self) {
        self.items.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// 个人分摊中的一行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonLine {
    pub description: String,
    pub quantity: u32,
    pub price: f64,
}

/// 个人分摊汇总 (每次分配变化后重算)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonSummary {
    pub person: Person,
    pub items: Vec<PersonLine>,
    pub subtotal: f64,
    pub tip: f64,
    pub total: f64,
}

/// 全局对账结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitSummary {
    pub person_summaries: Vec<PersonSummary>,
    pub tip_percentage: f64,
    pub bill_total: f64,
    pub allocated_total: f64,
    pub outstanding: f64,
    pub is_complete: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, price: f64, quantity: u32) -> ReceiptItem {
        ReceiptItem {
            id: id.to_string(),
            description: format!("desc {}", id),
            price,
            quantity,
        }
    }

    #[test]
    fn assign_is_additive() {
        let wings = item("item-0", 30.0, 3);
        let mut alloc = Allocation::new();

        assert_eq!(alloc.assign(&wings, "person-1", 1), Ok(1));
        assert_eq!(alloc.assign(&wings, "person-1", 1), Ok(2));
        assert_eq!(alloc.units_for("item-0", "person-1"), 2);
        assert_eq!(alloc.unallocated(&wings), 1);
    }

    #[test]
    fn assign_rejects_more_than_remainder() {
        let wings = item("item-0", 30.0, 3);
        let mut alloc = Allocation::new();
        alloc.assign(&wings, "person-1", 2).unwrap();

        let err = alloc.assign(&wings, "person-2", 2).unwrap_err();
        assert_eq!(
            err,
            SplitError::OverAllocation {
                item_id: "item-0".into(),
                requested: 2,
                available: 1
            }
        );
        assert_eq!(alloc.units_for("item-0", "person-2"), 0);
        assert_eq!(alloc.assign(&wings, "person-1", 0), Err(SplitError::ZeroUnits));
    }

    #[test]
    fn fully_allocated_items_have_nothing_selectable() {
        let tea = item("item-1", 8.0, 2);
        let mut alloc = Allocation::new();
        alloc.assign(&tea, "person-1", 1).unwrap();
        alloc.assign(&tea, "person-2", 1).unwrap();

        assert!(alloc.is_fully_allocated(&tea));
        assert_eq!(alloc.unallocated(&tea), 0);
        assert!(alloc.assign(&tea, "person-3", 1).is_err());
    }

    #[test]
    fn clear_person_frees_units_for_anyone() {
        let tea = item("item-1", 8.0, 2);
        let mut alloc = Allocation::new();
        alloc.assign(&tea, "person-1", 2).unwrap();

        assert_eq!(alloc.clear_person("item-1", "person-1"), 2);
        assert!(alloc.is_empty());
        assert_eq!(alloc.assign(&tea, "person-2", 2), Ok(2));
        assert_eq!(alloc.clear_person("item-1", "nobody"), 0);
    }

    #[test]
    fn selection_is_validated_as_a_whole() {
        let items = vec![item("item-0", 10.0, 1), item("item-1", 12.0, 2)];
        let mut alloc = Allocation::new();

        let mut selection = IndexMap::new();
        selection.insert("item-0".to_string(), 1);
        selection.insert("item-1".to_string(), 3);
        assert!(alloc.assign_selection(&items, "person-1", &selection).is_err());
        assert!(alloc.is_empty());

        selection.insert("item-1".to_string(), 2);
        assert_eq!(alloc.assign_selection(&items, "person-1", &selection), Ok(3));

        let mut unknown = IndexMap::new();
        unknown.insert("item-9".to_string(), 1);
        assert_eq!(
            alloc.assign_selection(&items, "person-1", &unknown),
            Err(SplitError::UnknownItem("item-9".into()))
        );

        let mut zeros = IndexMap::new();
        zeros.insert("item-0".to_string(), 0);
        assert_eq!(
            alloc.assign_selection(&items, "person-1", &zeros),
            Err(SplitError::ZeroUnits)
        );
    }

    #[test]
    fn move_units_between_people() {
        let pizza = item("item-2", 24.0, 4);
        let mut alloc = Allocation::new();
        alloc.assign(&pizza, "person-1", 4).unwrap();

        alloc.move_units(&pizza, "person-1", "person-2", 1).unwrap();
        assert_eq!(alloc.units_for("item-2", "person-1"), 3);
        assert_eq!(alloc.units_for("item-2", "person-2"), 1);
        assert!(alloc.is_fully_allocated(&pizza));

        alloc.move_units(&pizza, "person-1", "person-2", 3).unwrap();
        assert!(alloc.item_allocations("item-2").unwrap().get("person-1").is_none());
        assert_eq!(alloc.units_for("item-2", "person-2"), 4);

        assert!(matches!(
            alloc.move_units(&pizza, "person-1", "person-2", 1),
            Err(SplitError::InsufficientUnits { held: 0, .. })
        ));
    }

    #[test]
    fn reassign_gives_whole_item_to_one_person() {
        let pizza = item("item-2", 24.0, 4);
        let mut alloc = Allocation::new();
        alloc.assign(&pizza, "person-1", 1).unwrap();
        alloc.assign(&pizza, "person-2", 2).unwrap();

        alloc.reassign_item(&pizza, "person-3");
        assert_eq!(alloc.units_for("item-2", "person-3"), 4);
        assert_eq!(alloc.units_for("item-2", "person-1"), 0);
        assert_eq!(alloc.allocated_units("item-2"), 4);
    }

    #[test]
    fn items_get_positional_ids() {
        let normalized = vec![
            NormalizedItem::new("Wings", 12.0, 1),
            NormalizedItem::new("Chai Latte", 10.0, 2),
        ];
        let items = ReceiptItem::from_normalized(&normalized);
        assert_eq!(items[0].id, "item-0");
        assert_eq!(items[1].id, "item-1");
        assert_eq!(items[1].unit_price(), 5.0);
    }
}
