//! Loading/error/data containers for dashboard screens
//!
//! Each container wraps one or more API calls. A call marks the container as
//! loading and clears the previous error; it ends either fulfilled (data
//! replaced, no error) or rejected (data kept, error message set). In both
//! cases `loading` is false afterwards.

use std::future::Future;

use log::warn;

use crate::api::{AdminApi, SuperadminApi};
use crate::error::Result;
use crate::models::{ChartPoint, Event, EventGroup, EventStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Idle,
    Loading,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AsyncState<T> {
    pub loading: bool,
    pub error: Option<String>,
    pub data: Option<T>,
    status: Status,
}

impl<T> Default for AsyncState<T> {
    fn default() -> Self {
        Self {
            loading: false,
            error: None,
            data: None,
            status: Status::Idle,
        }
    }
}

impl<T> AsyncState<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn pending(&mut self) {
        self.loading = true;
        self.error = None;
        self.status = Status::Loading;
    }

    pub fn fulfilled(&mut self, data: T) {
        self.loading = false;
        self.error = None;
        self.data = Some(data);
        self.status = Status::Succeeded;
    }

    pub fn rejected(&mut self, message: impl Into<String>) {
        self.loading = false;
        self.error = Some(message.into());
        self.status = Status::Failed;
    }

    /// Load `data` from `call`; on failure the error holds the server's message or `fallback`
    pub async fn run<F>(&mut self, fallback: &str, call: F) -> Option<&T>
    where
        F: Future<Output = Result<T>>,
    {
        self.pending();
        match call.await {
            Ok(data) => {
                self.fulfilled(data);
                self.data.as_ref()
            }
            Err(e) => {
                warn!("{}: {}", fallback, e);
                self.rejected(e.display_message(fallback));
                None
            }
        }
    }

    /// Run an action that changes but does not replace the data
    pub async fn act<R, F>(&mut self, fallback: &str, call: F) -> Option<R>
    where
        F: Future<Output = Result<R>>,
    {
        self.pending();
        match call.await {
            Ok(value) => {
                self.loading = false;
                self.status = Status::Succeeded;
                Some(value)
            }
            Err(e) => {
                warn!("{}: {}", fallback, e);
                self.rejected(e.display_message(fallback));
                None
            }
        }
    }
}

/// Events table of the admin dashboard
#[derive(Debug, Clone, Default)]
pub struct EventList {
    pub state: AsyncState<Vec<Event>>,
}

impl EventList {
    pub fn events(&self) -> &[Event] {
        self.state.data.as_deref().unwrap_or(&[])
    }

    pub async fn fetch(&mut self, api: &AdminApi) {
        self.state
            .run("Failed to fetch events", api.assigned_events())
            .await;
    }

    /// Change an event's status and update it in place
    pub async fn update_status(&mut self, api: &AdminApi, id: i64, status: EventStatus) {
        let updated = self
            .state
            .act("Failed to update event status", api.update_event_status(id, status))
            .await;
        if updated.is_some() {
            if let Some(event) = self
                .state
                .data
                .as_mut()
                .and_then(|events| events.iter_mut().find(|e| e.id == id))
            {
                event.event_status = Some(status);
            }
        }
    }

    pub async fn delete(&mut self, api: &AdminApi, id: i64) {
        let deleted = self
            .state
            .act("Failed to delete event", api.delete_event(id))
            .await;
        if deleted.is_some() {
            if let Some(events) = self.state.data.as_mut() {
                events.retain(|e| e.id != id);
            }
        }
    }
}

/// Event groups table of the superadmin dashboard
#[derive(Debug, Clone, Default)]
pub struct EventGroupList {
    pub state: AsyncState<Vec<EventGroup>>,
}

impl EventGroupList {
    pub fn groups(&self) -> &[EventGroup] {
        self.state.data.as_deref().unwrap_or(&[])
    }

    pub async fn fetch(&mut self, api: &SuperadminApi) {
        self.state
            .run("Failed to fetch event groups", api.list_event_groups())
            .await;
    }

    pub async fn delete(&mut self, api: &SuperadminApi, id: i64) {
        let deleted = self
            .state
            .act("Failed to delete event group", api.delete_event_group(id, None))
            .await;
        if deleted.is_some() {
            if let Some(groups) = self.state.data.as_mut() {
                groups.retain(|g| g.id != id);
            }
        }
    }
}

/// Yearly events/revenue chart
#[derive(Debug, Clone)]
pub struct ChartState {
    pub state: AsyncState<Vec<ChartPoint>>,
    selected_year: i32,
    available_years: Vec<i32>,
}

impl ChartState {
    /// `years` in any order; the latest is selected
    pub fn new(years: impl IntoIterator<Item = i32>) -> Self {
        let mut available_years: Vec<i32> = years.into_iter().collect();
        available_years.sort_unstable_by(|a, b| b.cmp(a));
        available_years.dedup();
        let selected_year = available_years.first().copied().unwrap_or_else(current_year);
        Self {
            state: AsyncState::new(),
            selected_year,
            available_years,
        }
    }

    pub fn selected_year(&self) -> i32 {
        self.selected_year
    }

    /// Newest first
    pub fn available_years(&self) -> &[i32] {
        &self.available_years
    }

    pub fn set_selected_year(&mut self, year: i32) {
        self.selected_year = year;
    }

    pub fn points(&self) -> &[ChartPoint] {
        self.state.data.as_deref().unwrap_or(&[])
    }

    pub async fn fetch(&mut self, api: &SuperadminApi) {
        let year = self.selected_year;
        self.state
            .run("Failed to fetch chart data", api.chart_data(year))
            .await;
    }
}

impl Default for ChartState {
    fn default() -> Self {
        Self::new([current_year()])
    }
}

fn current_year() -> i32 {
    use chrono::Datelike;
    chrono::Local::now().year()
}
