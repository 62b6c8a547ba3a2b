use std::io;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::calendar::{CalendarError, CalendarSet, FreeDateRange, WorkCalendar};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Problems with the content of a single calendar record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalendarRecordError {
    #[error("invalid weekday value: {0}")]
    InvalidWeekday(String),
    #[error("invalid date format: {0} (expected YYYY-MM-DD)")]
    InvalidDate(String),
    #[error("invalid date range: start_date {start_date} is after end_date {end_date}")]
    InvalidDateRange {
        start_date: NaiveDate,
        end_date: NaiveDate,
    },
    #[error(transparent)]
    Calendar(#[from] CalendarError),
}

#[derive(Error, Debug)]
pub enum CalendarYamlError {
    #[error("calendar directory not found: {0}")]
    DirectoryNotFound(PathBuf),
    #[error("calendar directory contains no yaml files: {0}")]
    DirectoryEmpty(PathBuf),
    #[error("failed to list calendar directory {path}: {source}")]
    ReadDir { path: PathBuf, source: io::Error },
    #[error("failed to read calendar yaml file {path}: {source}")]
    ReadFile { path: PathBuf, source: io::Error },
    #[error("failed to parse calendar yaml file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("invalid calendar in {path}: {source}")]
    Invalid {
        path: PathBuf,
        source: CalendarRecordError,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct CalendarRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Defaults to Monday through Friday.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_weekdays: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub holidays: Vec<FreeDateRangeRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct FreeDateRangeRecord {
    pub start_date: String,
    /// Omitted for a single day.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

/// Loads all `*.yaml` / `*.yml` files in `dir_path`, one calendar per file,
/// and adds them to `calendars`. A file without an `id` takes its stem as id.
///
/// # Errors
/// - Returns an error when `dir_path` does not exist.
/// - Returns an error when no YAML files are present.
/// - Returns an error on I/O or parse failures, or when content is invalid.
pub fn load_calendars_from_yaml_dir<P: AsRef<Path>>(
    dir_path: P,
    calendars: &mut CalendarSet,
) -> Result<usize, CalendarYamlError> {
    let dir_path = dir_path.as_ref();
    if !dir_path.is_dir() {
        return Err(CalendarYamlError::DirectoryNotFound(dir_path.to_path_buf()));
    }

    let mut yaml_files = Vec::new();
    let read_dir = std::fs::read_dir(dir_path).map_err(|source| CalendarYamlError::ReadDir {
        path: dir_path.to_path_buf(),
        source,
    })?;
    for entry in read_dir {
        let entry = entry.map_err(|source| CalendarYamlError::ReadDir {
            path: dir_path.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_file() && is_yaml_file(&path) {
            yaml_files.push(path);
        }
    }
    yaml_files.sort();
    if yaml_files.is_empty() {
        return Err(CalendarYamlError::DirectoryEmpty(dir_path.to_path_buf()));
    }

    for file_path in &yaml_files {
        let calendar = load_calendar_from_yaml_file(file_path)?;
        tracing::debug!(calendar = %calendar.id, path = %file_path.display(), "loaded calendar");
        calendars.insert(calendar);
    }
    Ok(yaml_files.len())
}

fn is_yaml_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    )
}

fn load_calendar_from_yaml_file(path: &Path) -> Result<WorkCalendar, CalendarYamlError> {
    let contents = std::fs::read_to_string(path).map_err(|source| CalendarYamlError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let record: CalendarRecord =
        serde_yaml::from_str(&contents).map_err(|source| CalendarYamlError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default();
    calendar_from_record(record, stem).map_err(|source| CalendarYamlError::Invalid {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn calendar_from_record(
    record: CalendarRecord,
    fallback_id: &str,
) -> Result<WorkCalendar, CalendarRecordError> {
    let id = record.id.unwrap_or_else(|| fallback_id.to_string());
    let working_weekdays = match record.working_weekdays {
        Some(values) => values
            .into_iter()
            .map(|value| parse_weekday(&value).ok_or(CalendarRecordError::InvalidWeekday(value)))
            .collect::<Result<Vec<_>, _>>()?,
        None => vec![
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
        ],
    };
    let holidays = record
        .holidays
        .into_iter()
        .map(free_date_range_from_record)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(WorkCalendar::new(&id, &working_weekdays, holidays)?)
}

pub(crate) fn calendar_to_record(calendar: &WorkCalendar) -> CalendarRecord {
    CalendarRecord {
        id: Some(calendar.id.clone()),
        working_weekdays: Some(
            calendar
                .working_weekdays()
                .into_iter()
                .map(|day| day.to_string())
                .collect(),
        ),
        holidays: calendar
            .holidays
            .iter()
            .map(|range| FreeDateRangeRecord {
                start_date: range.start_date.format(DATE_FORMAT).to_string(),
                end_date: (range.end_date != range.start_date)
                    .then(|| range.end_date.format(DATE_FORMAT).to_string()),
            })
            .collect(),
    }
}

fn free_date_range_from_record(
    value: FreeDateRangeRecord,
) -> Result<FreeDateRange, CalendarRecordError> {
    let start_date = parse_date(&value.start_date)?;
    let end_date = match value.end_date.as_deref() {
        Some(end) => parse_date(end)?,
        None => start_date,
    };
    if start_date > end_date {
        return Err(CalendarRecordError::InvalidDateRange {
            start_date,
            end_date,
        });
    }
    Ok(FreeDateRange {
        start_date,
        end_date,
    })
}

fn parse_date(value: &str) -> Result<NaiveDate, CalendarRecordError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| CalendarRecordError::InvalidDate(value.to_string()))
}

fn parse_weekday(value: &str) -> Option<Weekday> {
    match value.trim().to_ascii_lowercase().as_str() {
        "mon" | "monday" => Some(Weekday::Mon),
        "tue" | "tues" | "tuesday" => Some(Weekday::Tue),
        "wed" | "wednesday" => Some(Weekday::Wed),
        "thu" | "thur" | "thurs" | "thursday" => Some(Weekday::Thu),
        "fri" | "friday" => Some(Weekday::Fri),
        "sat" | "saturday" => Some(Weekday::Sat),
        "sun" | "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}
