use crate::Entity;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

impl Order {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Collection query: ordering by one declared field plus an optional
/// substring match over every declared field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindOptions {
    pub order_by: &'static str,
    pub order: Order,
    pub search: Option<String>,
}

impl FindOptions {
    /// Unknown sort fields fall back to the primary key, so `order_by` is
    /// always one of `T::FIELDS`.
    pub fn new<T: Entity>(
        sort_by: Option<&str>,
        descending: bool,
        search: Option<&str>,
    ) -> Self {
        let order_by = sort_by
            .and_then(|v| T::FIELDS.iter().find(|field| **field == v))
            .copied()
            .unwrap_or(T::PRIMARY_KEY);
        Self {
            order_by,
            order: if descending { Order::Desc } else { Order::Asc },
            search: search.filter(|v| !v.is_empty()).map(str::to_owned),
        }
    }

    pub fn all<T: Entity>() -> Self {
        Self::new::<T>(None, false, None)
    }
}
