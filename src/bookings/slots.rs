// Time slot arithmetic
//
// Slots are half-open intervals [start, end) in minutes since midnight, so a
// booking ending at 10:00 never conflicts with one starting at 10:00.

/// Parse an HH:MM time into minutes since midnight
pub fn to_minutes(time: &str) -> Option<i32> {
    let (hours, minutes) = time.split_once(':')?;
    if hours.len() != 2 || minutes.len() != 2 {
        return None;
    }
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if !(0..24).contains(&hours) || !(0..60).contains(&minutes) {
        return None;
    }
    Some(hours * 60 + minutes)
}

/// Whether two half-open minute ranges intersect
pub fn ranges_overlap(start_a: i32, end_a: i32, start_b: i32, end_b: i32) -> bool {
    start_a < end_b && start_b < end_a
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlap(a: (&str, &str), b: (&str, &str)) -> bool {
        ranges_overlap(
            to_minutes(a.0).unwrap(),
            to_minutes(a.1).unwrap(),
            to_minutes(b.0).unwrap(),
            to_minutes(b.1).unwrap(),
        )
    }

    #[test]
    fn parses_valid_times() {
        assert_eq!(to_minutes("00:00"), Some(0));
        assert_eq!(to_minutes("09:30"), Some(570));
        assert_eq!(to_minutes("23:59"), Some(1439));
    }

    #[test]
    fn rejects_malformed_times() {
        assert_eq!(to_minutes("24:00"), None);
        assert_eq!(to_minutes("12:60"), None);
        assert_eq!(to_minutes("9:30"), None);
        assert_eq!(to_minutes("0930"), None);
        assert_eq!(to_minutes("ab:cd"), None);
    }

    #[test]
    fn touching_slots_do_not_conflict() {
        // [09:00, 10:00) and [10:00, 11:00) share only the boundary instant
        assert!(!overlap(("09:00", "10:00"), ("10:00", "11:00")));
        assert!(!overlap(("10:00", "11:00"), ("09:00", "10:00")));
    }

    #[test]
    fn contained_slot_conflicts() {
        assert!(overlap(("09:00", "10:00"), ("09:30", "09:45")));
    }

    #[test]
    fn partial_overlap_conflicts() {
        assert!(overlap(("09:00", "10:00"), ("09:30", "10:30")));
        assert!(overlap(("09:30", "10:30"), ("09:00", "10:00")));
    }

    #[test]
    fn identical_slots_conflict() {
        assert!(overlap(("09:00", "10:00"), ("09:00", "10:00")));
    }

    #[test]
    fn disjoint_slots_do_not_conflict() {
        assert!(!overlap(("08:00", "09:00"), ("14:00", "15:00")));
    }
}
