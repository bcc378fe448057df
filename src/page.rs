use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub property: String,
    pub direction: Direction,
}

impl Order {
    pub fn asc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: Direction::Desc,
        }
    }
}

/// Ordering of a result set. An empty sort means "engine order".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub orders: Vec<Order>,
}

impl Sort {
    pub fn unsorted() -> Self {
        Self::default()
    }

    pub fn by(orders: impl IntoIterator<Item = Order>) -> Self {
        Self {
            orders: orders.into_iter().collect(),
        }
    }

    pub fn asc(property: impl Into<String>) -> Self {
        Self::by([Order::asc(property)])
    }

    pub fn desc(property: impl Into<String>) -> Self {
        Self::by([Order::desc(property)])
    }

    pub fn and(mut self, order: Order) -> Self {
        self.orders.push(order);
        self
    }

    /// Ascending order over the given key columns.
    pub fn by_columns<S: AsRef<str>>(columns: &[S]) -> Self {
        Self::by(columns.iter().map(|c| Order::asc(c.as_ref())))
    }

    pub fn is_sorted(&self) -> bool {
        !self.orders.is_empty()
    }

    pub fn is_unsorted(&self) -> bool {
        self.orders.is_empty()
    }

    /// `a ASC, b DESC`
    pub fn to_sql(&self) -> String {
        self.orders
            .iter()
            .map(|o| format!("{} {}", o.property, o.direction.as_sql()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Page request: `size` rows starting after `offset` rows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pageable {
    pub size: u64,
    pub offset: u64,
    #[serde(default)]
    pub sort: Sort,
}

impl Default for Pageable {
    fn default() -> Self {
        Self {
            size: 20,
            offset: 0,
            sort: Sort::unsorted(),
        }
    }
}

impl Pageable {
    /// Zero-based page `number` of `size` rows.
    pub fn of(number: u64, size: u64) -> Self {
        Self {
            size,
            offset: number.saturating_mul(size),
            sort: Sort::unsorted(),
        }
    }

    pub fn at_offset(offset: u64, size: u64) -> Self {
        Self {
            size,
            offset,
            sort: Sort::unsorted(),
        }
    }

    pub fn sorted(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    pub fn number(&self) -> u64 {
        if self.size == 0 {
            0
        } else {
            self.offset / self.size
        }
    }

    /// Last row position (exclusive) covered by this page.
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.size)
    }
}

/// A page of results with pagination metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub number: u64,
    pub size: u64,
    pub offset: u64,
    pub total_elements: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, pageable: &Pageable, total_elements: u64) -> Self {
        let total_pages = if pageable.size == 0 {
            0
        } else {
            total_elements.div_ceil(pageable.size)
        };
        Self {
            content,
            number: pageable.number(),
            size: pageable.size,
            offset: pageable.offset,
            total_elements,
            total_pages,
        }
    }

    pub fn has_next(&self) -> bool {
        self.offset + (self.content.len() as u64) < self.total_elements
    }
}
