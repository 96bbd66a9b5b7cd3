use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime,
    PrimitiveDateTime,
};

pub(crate) fn primitive_now_utc() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}

pub(crate) fn format_primitive(value: PrimitiveDateTime) -> String {
    value.assume_utc().format(&Rfc3339).unwrap_or_else(|_| value.assume_utc().to_string())
}

pub(crate) fn format_date(value: Date) -> String {
    value
        .format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| value.to_string())
}

/// Accepts `YYYY-MM-DD` and the compact `YYYYMMDD` form used by exam payloads.
pub(crate) fn parse_date(value: &str) -> Option<Date> {
    let value = value.trim();
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .or_else(|_| Date::parse(value, format_description!("[year][month][day]")))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Month, Time};

    #[test]
    fn format_primitive_outputs_utc_z() {
        let date = Date::from_calendar_date(2025, Month::January, 2).unwrap();
        let time = Time::from_hms(10, 20, 30).unwrap();
        let value = PrimitiveDateTime::new(date, time);
        assert_eq!(format_primitive(value), "2025-01-02T10:20:30Z");
    }

    #[test]
    fn parse_date_accepts_dashed_and_compact_forms() {
        let expected = Date::from_calendar_date(2024, Month::June, 7).unwrap();
        assert_eq!(parse_date("2024-06-07"), Some(expected));
        assert_eq!(parse_date("20240607"), Some(expected));
        assert_eq!(parse_date(" 2024-06-07 "), Some(expected));
    }

    #[test]
    fn parse_date_rejects_garbage() {
        assert_eq!(parse_date("2024-13-01"), None);
        assert_eq!(parse_date("07/06/2024"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn format_date_is_iso() {
        let date = Date::from_calendar_date(2023, Month::February, 1).unwrap();
        assert_eq!(format_date(date), "2023-02-01");
    }
}
