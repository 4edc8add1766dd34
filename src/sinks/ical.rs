//! iCalendar (RFC 5545) export: one VTODO per issue.

use chrono::{DateTime, Utc};
use icalendar::{Calendar, Class, Component, Property, Todo};

use super::IssueSink;
use crate::model::issue::{Issue, IssueDate};

pub const PRODID: &str = "-//languitar//issuemapper//";

pub struct ICalSink;

impl IssueSink for ICalSink {
    fn generate(&self, issues: &[Issue]) -> Vec<u8> {
        // `Calendar::new()` would add its own PRODID.
        let mut calendar = Calendar::empty();
        calendar.append_property(Property::new("PRODID", PRODID));
        calendar.append_property(Property::new("VERSION", "2.0"));

        for issue in issues {
            calendar.push(todo_for(issue));
        }

        calendar.to_string().into_bytes()
    }
}

fn todo_for(issue: &Issue) -> Todo {
    let updated = utc_stamp(issue.updated());

    let mut todo = Todo::new();
    todo.uid(issue.uid())
        .add_property("CREATED", utc_stamp(issue.created()))
        // DTSTAMP must be set explicitly, otherwise the current time is used.
        .add_property("DTSTAMP", updated.as_str())
        .add_property("LAST-MODIFIED", updated.as_str())
        .summary(issue.title())
        .description(issue.description())
        .add_property("CATEGORIES", issue.project())
        .add_property("URL", issue.url());

    if let Some(author) = issue.author() {
        let mut organizer = Property::new("ORGANIZER", author.url.as_str());
        if let Some(name) = &author.name {
            // Quoted parameter values cannot carry a double quote.
            organizer.add_parameter("CN", &name.replace('"', "'"));
        }
        todo.append_property(organizer);
    }
    if let Some(percent) = issue.percent_done().filter(|p| *p > 0) {
        todo.add_property("PERCENT-COMPLETE", percent.to_string());
    }
    if let Some(start) = issue.start() {
        todo.append_property(date_property("START", start));
    }
    if let Some(due) = issue.due() {
        todo.append_property(date_property("DUE", due));
    }

    todo.class(Class::Public);
    todo.done()
}

fn utc_stamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%dT%H%M%SZ").to_string()
}

fn date_property(key: &str, value: IssueDate) -> Property {
    match value {
        IssueDate::Date(date) => Property::new(key, date.format("%Y%m%d").to_string())
            .add_parameter("VALUE", "DATE")
            .done(),
        IssueDate::DateTime(at) => Property::new(key, utc_stamp(at)),
    }
}
