//! Resolution of `page.date`.
//!
//! Order of precedence:
//!
//! 1. numeric `date`: milliseconds since the epoch
//! 2. sentinel strings (`git Last Modified`, `Last Modified`, `git Created`,
//!    `Created`), matched case-insensitively
//! 3. any other string: ISO-8601
//! 4. a `YYYY-MM-DD` in the input path
//! 5. the file's creation time, then its modification time
//!
//! Virtual templates have no file, so sentinels are parsed as plain
//! strings and the fallback is the current time.

use super::Template;
use crate::error::InvalidDateFrontMatter;
use crate::utils::date::{date_from_path, from_millis, parse_iso};
use crate::utils::git;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sentinel {
    GitLastModified,
    LastModified,
    GitCreated,
    Created,
}

impl Sentinel {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "git last modified" => Some(Self::GitLastModified),
            "last modified" => Some(Self::LastModified),
            "git created" => Some(Self::GitCreated),
            "created" => Some(Self::Created),
            _ => None,
        }
    }
}

pub(super) async fn mapped_date(template: &Template, data: &Value) -> Result<DateTime<Utc>> {
    let invalid = |value: String| InvalidDateFrontMatter {
        input: PathBuf::from(template.input_path()),
        value,
    };

    match data.get("date") {
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(from_millis)
            .ok_or_else(|| invalid(n.to_string()).into()),
        Some(Value::String(s)) => {
            if !template.is_virtual()
                && let Some(sentinel) = Sentinel::parse(s)
            {
                return sentinel_date(template, sentinel).await;
            }
            parse_iso(s).ok_or_else(|| invalid(s.clone()).into())
        }
        None | Some(Value::Null) => {
            let relative = template.relative_path().to_string_lossy();
            if let Some(date) = date_from_path(&relative) {
                return Ok(date);
            }
            if template.is_virtual() {
                return Ok(Utc::now());
            }
            created_time(template).await
        }
        Some(other) => Err(invalid(other.to_string()).into()),
    }
}

async fn sentinel_date(template: &Template, sentinel: Sentinel) -> Result<DateTime<Utc>> {
    let path = template.disk_path();
    let stats = &template.context().stats;
    Ok(match sentinel {
        Sentinel::GitLastModified => git::last_modified(path).await.unwrap_or_else(Utc::now),
        Sentinel::GitCreated => git::created(path).await.unwrap_or_else(Utc::now),
        Sentinel::LastModified => stats.times(path).await?.modified.unwrap_or_else(Utc::now),
        Sentinel::Created => return created_time(template).await,
    })
}

async fn created_time(template: &Template) -> Result<DateTime<Utc>> {
    let times = template.context().stats.times(template.disk_path()).await?;
    Ok(times.created.or(times.modified).unwrap_or_else(Utc::now))
}
