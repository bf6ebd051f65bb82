// src/rounds/filter.rs

use chrono::{DateTime, NaiveDate};
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::types::Event;

/// Copy of `data` keeping only finished events, plus `(total, finished)`.
/// A top-level `roundInfo.round` is hoisted to `round`.
pub fn filter_finished(data: &Value) -> (Value, usize, usize) {
    let Some(events) = data.get("events").and_then(Value::as_array) else {
        return (data.clone(), 0, 0);
    };
    let total = events.len();
    let finished: Vec<Value> = events
        .iter()
        .filter(|e| Event::from_value(e).is_finished())
        .cloned()
        .collect();
    let count = finished.len();

    let mut out = data.clone();
    if let Some(obj) = out.as_object_mut() {
        obj.insert("events".into(), Value::Array(finished));
        if let Some(round) = data.pointer("/roundInfo/round") {
            obj.insert("round".into(), round.clone());
        }
    }
    (out, total, count)
}

/// No events and no further page.
pub fn is_empty_round(data: &Value) -> bool {
    let no_events = data
        .get("events")
        .and_then(Value::as_array)
        .map_or(true, Vec::is_empty);
    let has_next = data
        .get("hasNextPage")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    no_events && !has_next
}

fn event_date(event: &Value) -> Option<NaiveDate> {
    let ts = event.get("startTimestamp").and_then(Value::as_i64)?;
    if ts == 0 {
        return None;
    }
    DateTime::from_timestamp(ts, 0).map(|d| d.date_naive())
}

fn has_round(event: &Value) -> bool {
    match event.pointer("/roundInfo/round") {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_u64() != Some(0),
        Some(_) => true,
    }
}

/// Give events without `roundInfo.round` a synthetic round from their start
/// date. Dates are grouped from the first date of each group; a date more
/// than three days after it starts the next round. Rough for fixture lists
/// with midweek games.
pub fn infer_rounds_from_dates(events: &mut [Value]) {
    let mut dates: Vec<NaiveDate> = events.iter().filter_map(event_date).collect();
    if dates.is_empty() {
        return;
    }
    dates.sort_unstable();
    dates.dedup();

    let mut date_round = BTreeMap::new();
    let mut round = 1u32;
    let mut group_start = dates[0];
    for d in dates {
        if (d - group_start).num_days() > 3 {
            round += 1;
            group_start = d;
        }
        date_round.insert(d, round);
    }

    for event in events.iter_mut() {
        if has_round(event) {
            continue;
        }
        let Some(r) = event_date(event).and_then(|d| date_round.get(&d).copied()) else {
            continue;
        };
        let Some(obj) = event.as_object_mut() else {
            continue;
        };
        let info = obj.entry("roundInfo").or_insert_with(|| json!({}));
        if !info.is_object() {
            *info = json!({});
        }
        if let Some(info) = info.as_object_mut() {
            info.insert("round".into(), Value::String(r.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(id: u64, desc: &str, kind: &str) -> Value {
        json!({"id": id, "status": {"description": desc, "type": kind}})
    }

    #[test]
    fn test_filter_finished_only() {
        let data = json!({
            "events": [
                ev(1, "Ended", "finished"),
                ev(2, "Not started", "notstarted"),
                ev(3, "1st half", "inprogress"),
                ev(4, "Ended", "finished"),
            ],
            "roundInfo": {"round": 12},
            "hasNextPage": false
        });
        let (filtered, total, finished) = filter_finished(&data);
        assert_eq!((total, finished), (4, 2));
        let ids: Vec<_> = filtered["events"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["id"].as_u64().unwrap())
            .collect();
        assert_eq!(ids, vec![1, 4]);
        assert_eq!(filtered["round"], json!(12));
        assert_eq!(filtered["hasNextPage"], json!(false));
    }

    #[test]
    fn test_filter_without_events_passes_through() {
        let (out, total, finished) = filter_finished(&json!({"error": "x"}));
        assert_eq!((total, finished), (0, 0));
        assert_eq!(out, json!({"error": "x"}));
    }

    #[test]
    fn test_empty_round() {
        assert!(is_empty_round(&json!({"events": []})));
        assert!(is_empty_round(&json!({})));
        assert!(is_empty_round(&Value::Null));
        assert!(!is_empty_round(&json!({"events": [], "hasNextPage": true})));
        assert!(!is_empty_round(&json!({"events": [ev(1, "Ended", "finished")]})));
    }

    #[test]
    fn test_infer_rounds_clusters_weekends() {
        // Fri 2024-08-16, Sat 17, Sun 18 | Sat 24 | Sat 31 + one with a round already
        let day = 86_400;
        let fri = 1_723_831_200;
        let mut events = vec![
            json!({"id": 1, "startTimestamp": fri}),
            json!({"id": 2, "startTimestamp": fri + day}),
            json!({"id": 3, "startTimestamp": fri + 2 * day}),
            json!({"id": 4, "startTimestamp": fri + 8 * day}),
            json!({"id": 5, "startTimestamp": fri + 15 * day, "roundInfo": {"round": 9}}),
            json!({"id": 6, "startTimestamp": fri + 15 * day}),
            json!({"id": 7}),
        ];
        infer_rounds_from_dates(&mut events);

        let rounds: Vec<_> = events.iter().map(|e| e.pointer("/roundInfo/round").cloned()).collect();
        assert_eq!(rounds[0], Some(json!("1")));
        assert_eq!(rounds[2], Some(json!("1")));
        assert_eq!(rounds[3], Some(json!("2")));
        assert_eq!(rounds[4], Some(json!(9)));
        assert_eq!(rounds[5], Some(json!("3")));
        assert_eq!(rounds[6], None);
    }
}
