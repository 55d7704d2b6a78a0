//! Category catalog configuration.
//!
//! The set of item categories is fixed per deployment and supplied to the
//! engine as configuration. The default catalog carries one dinner slot per
//! weekday plus two weekly lunch slots with no day attached.

/// A single category definition.
#[derive(Debug, Clone)]
pub struct Category {
    /// Stable key stored on item rows
    pub key: &'static str,

    /// Display label
    pub label: &'static str,

    /// Offset from the list's period start (0 = Monday), or None for
    /// categories not tied to a specific day
    pub day_offset: Option<u8>,
}

/// Ordered, fixed set of categories for a deployment.
#[derive(Debug, Clone)]
pub struct CategoryCatalog {
    categories: Vec<Category>,
}

impl CategoryCatalog {
    pub fn new(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    /// Categories in display order.
    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }

    /// Look up a category by its key.
    pub fn get(&self, key: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.key == key)
    }

    /// Whether `key` names a category in this catalog.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

impl Default for CategoryCatalog {
    fn default() -> Self {
        Self::new(vec![
            Category {
                key: "monday_dinner",
                label: "Monday Dinner",
                day_offset: Some(0),
            },
            Category {
                key: "tuesday_dinner",
                label: "Tuesday Dinner",
                day_offset: Some(1),
            },
            Category {
                key: "wednesday_dinner",
                label: "Wednesday Dinner",
                day_offset: Some(2),
            },
            Category {
                key: "thursday_dinner",
                label: "Thursday Dinner",
                day_offset: Some(3),
            },
            Category {
                key: "friday_dinner",
                label: "Friday Dinner",
                day_offset: Some(4),
            },
            Category {
                key: "saturday_dinner",
                label: "Saturday Dinner",
                day_offset: Some(5),
            },
            Category {
                key: "sunday_dinner",
                label: "Sunday Dinner",
                day_offset: Some(6),
            },
            Category {
                key: "luke_lunch",
                label: "Luke's Weekly Lunches",
                day_offset: None,
            },
            Category {
                key: "charlie_lunch",
                label: "Charlie's Weekly Lunches",
                day_offset: None,
            },
        ])
    }
}
