use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Occurrence, TimeWindow};

/// Optional narrowing of the series visible to a query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFilter {
    pub event_type: Option<String>,
    pub project_id: Option<Uuid>,
}

impl EventFilter {
    pub fn is_empty(&self) -> bool {
        self.event_type.is_none() && self.project_id.is_none()
    }
}

/// Slice of the globally sorted occurrence list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Page {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        items.into_iter().skip(self.offset).take(self.limit).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarQuery {
    pub user_id: Uuid,
    pub window: TimeWindow,
    pub filter: EventFilter,
    pub page: Option<Page>,
}

impl CalendarQuery {
    pub fn new(user_id: Uuid, window: TimeWindow) -> Self {
        Self {
            user_id,
            window,
            filter: EventFilter::default(),
            page: None,
        }
    }

    pub fn with_filter(mut self, filter: EventFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_page(mut self, page: Page) -> Self {
        self.page = Some(page);
        self
    }
}

/// A series whose contribution was dropped from a query result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesFailure {
    pub event_id: Uuid,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarPage {
    pub occurrences: Vec<Occurrence>,
    /// Number of occurrences before paging.
    pub total: usize,
    pub failures: Vec<SeriesFailure>,
}
