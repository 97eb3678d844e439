use crate::database::models::CitizenRecord;

/// Text fields that never keep a "NULL" sentinel or a blank value
pub const CLEANABLE_FIELDS: [&str; 11] = [
    "full_name",
    "national_id",
    "spouse_name",
    "spouse_national_id",
    "neighborhood",
    "zone",
    "phone",
    "email",
    "full_address",
    "social_program",
    "registration_status",
];

/// Trim `value`; blank text and any-case "NULL" become `None`.
pub fn clean_str(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("NULL") {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn clean_optional(value: Option<String>) -> Option<String> {
    value.as_deref().and_then(clean_str)
}

/// Required columns cannot hold `None`; a sentinel collapses to "".
pub fn clean_required(value: String) -> String {
    clean_str(&value).unwrap_or_default()
}

/// Clean every text field of a loaded record. Idempotent.
pub fn normalize(record: CitizenRecord) -> CitizenRecord {
    CitizenRecord {
        full_name: clean_required(record.full_name),
        national_id: clean_required(record.national_id),
        spouse_name: clean_optional(record.spouse_name),
        spouse_national_id: clean_optional(record.spouse_national_id),
        neighborhood: clean_required(record.neighborhood),
        zone: clean_optional(record.zone),
        phone: clean_optional(record.phone),
        email: clean_optional(record.email),
        full_address: clean_required(record.full_address),
        social_program: clean_optional(record.social_program),
        registration_status: clean_required(record.registration_status),
        ..record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::Value;

    fn dirty() -> CitizenRecord {
        CitizenRecord {
            id: 3,
            full_name: "  João da Silva ".into(),
            national_id: "12345678901".into(),
            spouse_name: Some("NULL".into()),
            spouse_national_id: Some("null".into()),
            neighborhood: "Centro".into(),
            zone: Some("   ".into()),
            phone: Some(" 11987654321 ".into()),
            email: Some("Null".into()),
            full_address: "Rua B, 20".into(),
            social_program: Some(String::new()),
            registration_status: "NULL".into(),
            registration_date: NaiveDate::from_ymd_opt(2023, 11, 5).unwrap(),
            active: true,
            voted: false,
            eligible: true,
        }
    }

    #[test]
    fn sentinels_and_blanks_collapse() {
        let r = normalize(dirty());
        assert_eq!(r.full_name, "João da Silva");
        assert_eq!(r.spouse_name, None);
        assert_eq!(r.spouse_national_id, None);
        assert_eq!(r.zone, None);
        assert_eq!(r.phone.as_deref(), Some("11987654321"));
        assert_eq!(r.email, None);
        assert_eq!(r.social_program, None);
        assert_eq!(r.registration_status, "");
    }

    #[test]
    fn no_cleanable_field_keeps_null_or_whitespace() {
        let json = serde_json::to_value(normalize(dirty())).unwrap();
        for field in CLEANABLE_FIELDS {
            if let Some(Value::String(s)) = json.get(field) {
                assert!(!s.eq_ignore_ascii_case("null"), "{} kept NULL", field);
                assert_eq!(s.trim(), s, "{} kept whitespace", field);
                assert!(s.is_empty() || !s.trim().is_empty());
            }
        }
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize(dirty());
        assert_eq!(normalize(once.clone()), once);
    }

    #[test]
    fn flags_and_ids_pass_through() {
        let r = normalize(dirty());
        assert_eq!(r.id, 3);
        assert!(r.active && r.eligible && !r.voted);
    }
}
