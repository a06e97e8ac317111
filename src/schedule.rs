use chrono::{NaiveTime, Timelike};
use rusqlite::Connection;
use serde_json::json;

use crate::error::{CoreError, CoreResult};
use crate::model::ScheduleSlot;
use crate::store::{self, ScheduledSlot};

fn minutes_of(s: &str) -> Option<u32> {
    let t = NaiveTime::parse_from_str(s.trim(), "%H:%M").ok()?;
    Some(t.hour() * 60 + t.minute())
}

fn bounds(slot: &ScheduleSlot) -> Option<(u32, u32)> {
    Some((minutes_of(&slot.start)?, minutes_of(&slot.end)?))
}

/// Same day and `!(a.end <= b.start || a.start >= b.end)`.
pub fn overlaps(a: &ScheduleSlot, b: &ScheduleSlot) -> bool {
    if a.day != b.day {
        return false;
    }
    let (Some((a_start, a_end)), Some((b_start, b_end))) = (bounds(a), bounds(b)) else {
        return false;
    };
    !(a_end <= b_start || a_start >= b_end)
}

/// Validates a proposed schedule and rewrites times as zero-padded `HH:MM`.
pub fn normalize_schedule(slots: Vec<ScheduleSlot>) -> CoreResult<Vec<ScheduleSlot>> {
    if slots.is_empty() {
        return Err(CoreError::validation(
            "schedule must contain at least one day",
        ));
    }

    let mut out: Vec<ScheduleSlot> = Vec::with_capacity(slots.len());
    for slot in slots {
        let (Some(start), Some(end)) = (minutes_of(&slot.start), minutes_of(&slot.end)) else {
            return Err(CoreError::validation("schedule times must be HH:MM").with_details(
                json!({ "day": slot.day.as_str(), "start": slot.start, "end": slot.end }),
            ));
        };
        if end <= start {
            return Err(CoreError::validation(format!(
                "end time must be after start time ({})",
                slot.day.as_str()
            ))
            .with_details(json!({ "day": slot.day.as_str() })));
        }
        let normalized = ScheduleSlot {
            day: slot.day,
            start: format!("{:02}:{:02}", start / 60, start % 60),
            end: format!("{:02}:{:02}", end / 60, end % 60),
        };
        if out.iter().any(|o| overlaps(o, &normalized)) {
            return Err(CoreError::validation(format!(
                "schedule overlaps itself on {}",
                normalized.day.as_str()
            ))
            .with_details(json!({ "day": normalized.day.as_str() })));
        }
        out.push(normalized);
    }
    Ok(out)
}

pub fn find_conflict<'a>(
    proposed: &[ScheduleSlot],
    existing: &'a [ScheduledSlot],
    exclude_class: Option<&str>,
) -> Option<&'a ScheduledSlot> {
    existing
        .iter()
        .filter(|e| exclude_class != Some(e.class_id.as_str()))
        .find(|e| proposed.iter().any(|p| overlaps(p, &e.slot)))
}

/// Scans every class of the institution for an overlapping slot.
pub fn check_institution_conflicts(
    conn: &Connection,
    institution_id: &str,
    proposed: &[ScheduleSlot],
    exclude_class: Option<&str>,
) -> CoreResult<()> {
    let existing = store::schedule_in_institution(conn, institution_id)?;
    if let Some(hit) = find_conflict(proposed, &existing, exclude_class) {
        tracing::debug!(
            institution_id,
            conflicting_class = %hit.class_id,
            day = hit.slot.day.as_str(),
            "schedule conflict"
        );
        return Err(CoreError::validation(format!(
            "schedule conflict on {} with class {} ({}-{})",
            hit.slot.day.as_str(),
            hit.class_number,
            hit.slot.start,
            hit.slot.end
        ))
        .with_details(json!({
            "day": hit.slot.day.as_str(),
            "classId": hit.class_id,
            "classNumber": hit.class_number,
            "start": hit.slot.start,
            "end": hit.slot.end,
        })));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::hierarchy::fixtures;
    use crate::model::Weekday;

    fn slot(day: Weekday, start: &str, end: &str) -> ScheduleSlot {
        ScheduleSlot {
            day,
            start: start.to_string(),
            end: end.to_string(),
        }
    }

    fn existing(class_id: &str, s: ScheduleSlot) -> ScheduledSlot {
        ScheduledSlot {
            class_id: class_id.to_string(),
            class_number: format!("T-{class_id}"),
            slot: s,
        }
    }

    #[test]
    fn overlap_uses_half_open_intervals() {
        let a = slot(Weekday::Monday, "19:00", "21:00");
        assert!(overlaps(&a, &slot(Weekday::Monday, "20:00", "22:00")));
        assert!(!overlaps(&a, &slot(Weekday::Monday, "21:00", "23:00")));
        assert!(!overlaps(&a, &slot(Weekday::Monday, "17:00", "19:00")));
        assert!(!overlaps(&a, &slot(Weekday::Tuesday, "19:00", "21:00")));
        assert!(overlaps(&a, &slot(Weekday::Monday, "19:30", "20:00")));
    }

    #[test]
    fn normalize_pads_times_and_rejects_bad_ranges() {
        let out = normalize_schedule(vec![slot(Weekday::Friday, "8:05", "9:30")]).expect("valid");
        assert_eq!(out[0].start, "08:05");
        assert_eq!(out[0].end, "09:30");

        let e = normalize_schedule(vec![slot(Weekday::Friday, "10:00", "10:00")]).unwrap_err();
        assert_eq!(e.code(), "validation_error");
        assert!(normalize_schedule(vec![]).is_err());
        assert!(normalize_schedule(vec![slot(Weekday::Friday, "ten", "11:00")]).is_err());
        assert!(normalize_schedule(vec![
            slot(Weekday::Friday, "10:00", "12:00"),
            slot(Weekday::Friday, "11:00", "13:00"),
        ])
        .is_err());
    }

    #[test]
    fn find_conflict_skips_excluded_class() {
        let taken = vec![existing("a", slot(Weekday::Monday, "20:00", "22:00"))];
        let proposed = vec![slot(Weekday::Monday, "19:00", "21:00")];
        assert!(find_conflict(&proposed, &taken, None).is_some());
        assert!(find_conflict(&proposed, &taken, Some("a")).is_none());
        let later = vec![slot(Weekday::Monday, "22:00", "23:00")];
        assert!(find_conflict(&later, &taken, None).is_none());
    }

    #[test]
    fn unreadable_stored_slot_fails_the_check() {
        let conn = db::open_in_memory().expect("db");
        let t = fixtures::tree(&conn, "u1");
        conn.execute(
            "UPDATE class_schedule SET day = 'Someday' WHERE class_id = ?",
            [&t.class.id],
        )
        .expect("corrupt");

        let proposed = vec![slot(Weekday::Monday, "19:00", "21:00")];
        let e = check_institution_conflicts(&conn, &t.institution.id, &proposed, None).unwrap_err();
        assert_eq!(e.code(), "persistence_error");
        assert_eq!(
            store::get_class(&conn, &t.class.id).unwrap_err().code(),
            "persistence_error"
        );
    }
}
