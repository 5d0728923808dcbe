use lazy_static::lazy_static;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RewardCategory {
    Drink,
    Topping,
    Discount,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub points_cost: i64,
    pub category: RewardCategory,
}

// Static configuration, not persisted per-user.
lazy_static! {
    static ref REWARD_CATALOG: Vec<RewardItem> = vec![
        RewardItem {
            id: "r1".into(),
            title: "Free Milk Tea".into(),
            description: "Medium size. Classic favorite.".into(),
            points_cost: 500,
            category: RewardCategory::Drink,
        },
        RewardItem {
            id: "r2".into(),
            title: "Free Pearl".into(),
            description: "Add chewy pearl topping to any drink.".into(),
            points_cost: 200,
            category: RewardCategory::Topping,
        },
        RewardItem {
            id: "r3".into(),
            title: "Rp 20.000 Discount".into(),
            description: "Min. spend Rp 50.000.".into(),
            points_cost: 800,
            category: RewardCategory::Discount,
        },
        RewardItem {
            id: "r4".into(),
            title: "Free Gongcha Tea".into(),
            description: "Large size with fresh milk.".into(),
            points_cost: 1200,
            category: RewardCategory::Drink,
        },
    ];
}

pub fn all() -> &'static [RewardItem] {
    &REWARD_CATALOG
}

pub fn find(id: &str) -> Option<&'static RewardItem> {
    REWARD_CATALOG.iter().find(|r| r.id == id)
}
