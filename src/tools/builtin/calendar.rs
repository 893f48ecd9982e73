use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::descriptor::ToolDescriptor;
use crate::error::FetchError;
use crate::tools::handler::ToolHandler;
use crate::types::ToolInvocation;

pub const CALENDAR: &str = "get_calendar_events";

const TIME_FORMAT: &str = "%I:%M %p";

/// Start or end of a calendar event, in the Google Calendar API shape:
/// timed events carry `dateTime`, all-day events only `date`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EventTime {
    #[serde(rename = "dateTime", default)]
    pub date_time: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CalendarEvent {
    #[serde(default)]
    pub summary: Option<String>,
    pub start: EventTime,
    #[serde(default)]
    pub end: Option<EventTime>,
}

/// Reads events from the user's primary calendar.
#[async_trait]
pub trait CalendarSource: Send + Sync {
    /// Events overlapping `[start, end]`, ordered by start time.
    async fn events_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, FetchError>;
}

/// What the model gets back for one event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventSummary {
    pub summary: String,
    pub start_time: String,
    pub end_time: Option<String>,
}

/// Descriptor for [`CalendarTool`]. Takes no arguments.
pub fn calendar_descriptor() -> ToolDescriptor {
    ToolDescriptor::new(CALENDAR, "Get the user's calendar events for today.")
        .announce("Let me check your schedule")
}

/// Lists today's events as `[{summary, start_time, end_time}]`.
///
/// Times are rendered as `%I:%M %p` in the local time zone, or in a fixed
/// offset set with [`with_offset`](Self::with_offset).
pub struct CalendarTool<S> {
    source: S,
    offset: Option<FixedOffset>,
}

impl<S: CalendarSource> CalendarTool<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            offset: None,
        }
    }

    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Midnight to 23:59:59 of the day containing `now`.
    fn day_window(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = match self.offset {
            Some(offset) => local_midnight(&offset, now),
            None => local_midnight(&Local, now),
        };
        (start, start + Duration::days(1) - Duration::seconds(1))
    }

    fn format_time(&self, time: &EventTime) -> String {
        match (time.date_time, self.offset) {
            (Some(dt), Some(offset)) => dt.with_timezone(&offset).format(TIME_FORMAT).to_string(),
            (Some(dt), None) => dt.with_timezone(&Local).format(TIME_FORMAT).to_string(),
            (None, _) => "All day".to_string(),
        }
    }

    fn summarize(&self, event: &CalendarEvent) -> EventSummary {
        EventSummary {
            summary: event
                .summary
                .clone()
                .unwrap_or_else(|| "No title".to_string()),
            start_time: self.format_time(&event.start),
            end_time: event
                .end
                .as_ref()
                .filter(|end| end.date_time.is_some() || end.date.is_some())
                .map(|end| self.format_time(end)),
        }
    }

    async fn today(&self) -> Result<String, String> {
        let (start, end) = self.day_window(Utc::now());
        info!(%start, %end, "fetching calendar events");
        let events = self
            .source
            .events_between(start, end)
            .await
            .map_err(|e| e.to_string())?;
        let summaries: Vec<EventSummary> = events.iter().map(|e| self.summarize(e)).collect();
        info!(count = summaries.len(), "calendar events retrieved");
        serde_json::to_string_pretty(&summaries).map_err(|e| e.to_string())
    }
}

fn local_midnight<Tz: TimeZone>(tz: &Tz, now: DateTime<Utc>) -> DateTime<Utc> {
    now.with_timezone(tz)
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| tz.from_local_datetime(&midnight).earliest())
        .map_or(now, |dt| dt.with_timezone(&Utc))
}

#[async_trait]
impl<S: CalendarSource> ToolHandler for CalendarTool<S> {
    async fn call(&self, _invocation: &ToolInvocation) -> Result<String, String> {
        self.today().await.map_err(|e| {
            error!(error = %e, "failed to get calendar events");
            format!("Error retrieving calendar events: {e}")
        })
    }
}
