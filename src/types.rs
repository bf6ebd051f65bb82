// src/types.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of `/unique-tournament/{id}/seasons`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub year: String,
}

fn string_or_number<'de, D>(d: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamRef {
    pub id: Option<u64>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Score {
    pub current: Option<i64>,
    pub period1: Option<i64>,
    pub normaltime: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Status {
    pub code: Option<i64>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl Status {
    /// Full time: `Ended` / `finished`.
    pub fn is_finished(&self) -> bool {
        self.description.as_deref() == Some("Ended") && self.kind.as_deref() == Some("finished")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Tournament {
    pub name: Option<String>,
    pub unique_tournament: Option<TeamRef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonRef {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub year: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundInfo {
    pub round: Option<Value>,
}

impl RoundInfo {
    /// The API sends rounds as numbers, date-inferred rounds are strings.
    pub fn round_number(&self) -> Option<u32> {
        match self.round.as_ref()? {
            Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Typed view over the fields of an event that the pipeline reads. The raw
/// JSON is what gets persisted; this is only for lookups.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Event {
    pub id: Option<u64>,
    pub slug: Option<String>,
    pub home_team: Option<TeamRef>,
    pub away_team: Option<TeamRef>,
    pub home_score: Option<Score>,
    pub away_score: Option<Score>,
    pub status: Option<Status>,
    pub start_timestamp: Option<i64>,
    pub tournament: Option<Tournament>,
    pub season: Option<SeasonRef>,
    pub round_info: Option<RoundInfo>,
}

impl Event {
    /// Never fails; fields of an unexpected shape come back as `None`.
    pub fn from_value(v: &Value) -> Self {
        match serde_json::from_value(v.clone()) {
            Ok(e) => e,
            Err(_) => Event {
                id: v.get("id").and_then(Value::as_u64),
                slug: v.get("slug").and_then(Value::as_str).map(str::to_string),
                start_timestamp: v.get("startTimestamp").and_then(Value::as_i64),
                status: v
                    .get("status")
                    .and_then(|s| serde_json::from_value(s.clone()).ok()),
                ..Default::default()
            },
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status.as_ref().is_some_and(Status::is_finished)
    }

    pub fn home_name(&self) -> Option<&str> {
        self.home_team.as_ref()?.name.as_deref()
    }

    pub fn away_name(&self) -> Option<&str> {
        self.away_team.as_ref()?.name.as_deref()
    }

    pub fn round(&self) -> Option<u32> {
        self.round_info.as_ref()?.round_number()
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.start_timestamp?, 0)
    }
}

/// Everything persisted for one finished match. Only `basic` is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchDetail {
    pub basic: Value,
    pub statistics: Option<Value>,
    pub team_streaks: Option<Value>,
    pub pregame_form: Option<Value>,
    pub h2h: Option<Value>,
}

impl MatchDetail {
    pub fn new(basic: Value) -> Self {
        Self {
            basic,
            statistics: None,
            team_streaks: None,
            pregame_form: None,
            h2h: None,
        }
    }

    /// Populated parts as `(file stem, value)`.
    pub fn parts(&self) -> Vec<(&'static str, &Value)> {
        let mut out = vec![("basic", &self.basic)];
        for (name, part) in [
            ("statistics", &self.statistics),
            ("team_streaks", &self.team_streaks),
            ("pregame_form", &self.pregame_form),
            ("h2h", &self.h2h),
        ] {
            if let Some(v) = part {
                out.push((name, v));
            }
        }
        out
    }
}
