//! Request validation for new reservations.
//!
//! Every field is checked and all complaints are returned together, so the
//! caller can display the complete list at once.

use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use validator::ValidateEmail;

use crate::error::ValidationErrors;
use crate::models::ContactInfo;

/// Raw booking form as submitted by the renter.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReservationForm {
    pub event_date: String,
    pub start_time: String,
    pub end_time: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub mobile_country_code: String,
    pub mobile_number: String,
    pub address: String,
    pub country: String,
    pub notes: String,
    pub voucher_code: String,
}

/// A form that passed validation, with parsed values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedReservation {
    pub event_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub contact: ContactInfo,
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Accepts `HH:MM` and `HH:MM:SS`.
pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

fn optional(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub fn validate_reservation(
    form: &ReservationForm,
    today: NaiveDate,
) -> Result<ValidatedReservation, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let event_date = if form.event_date.trim().is_empty() {
        errors.add("event_date", "Event date is required.");
        None
    } else {
        match parse_date(&form.event_date) {
            None => {
                errors.add("event_date", "Event date must be a valid date (YYYY-MM-DD).");
                None
            }
            Some(date) if date < today => {
                errors.add("event_date", "Event date cannot be in the past.");
                None
            }
            Some(date) => Some(date),
        }
    };

    let start_time = required_time(&form.start_time, "start_time", "Start time", &mut errors);
    let end_time = required_time(&form.end_time, "end_time", "End time", &mut errors);
    if let (Some(start), Some(end)) = (start_time, end_time) {
        if start >= end {
            errors.add("end_time", "End time must be after start time.");
        }
    }

    let first_name = form.first_name.trim();
    if first_name.is_empty() {
        errors.add("first_name", "First name is required.");
    }
    let last_name = form.last_name.trim();
    if last_name.is_empty() {
        errors.add("last_name", "Last name is required.");
    }
    let email = form.email.trim();
    if email.is_empty() || !email.validate_email() {
        errors.add("email", "Valid email is required.");
    }
    let mobile_number = optional(&form.mobile_number);
    if let Some(number) = &mobile_number {
        if !number.chars().all(|c| c.is_ascii_digit()) {
            errors.add("mobile_number", "Mobile number should contain only digits.");
        }
    }

    match (event_date, start_time, end_time) {
        (Some(event_date), Some(start_time), Some(end_time)) if errors.is_empty() => {
            Ok(ValidatedReservation {
                event_date,
                start_time,
                end_time,
                contact: ContactInfo {
                    first_name: first_name.to_string(),
                    last_name: last_name.to_string(),
                    email: email.to_string(),
                    mobile_country_code: optional(&form.mobile_country_code),
                    mobile_number,
                    address: optional(&form.address),
                    country: optional(&form.country),
                    notes: optional(&form.notes),
                    voucher_code: optional(&form.voucher_code),
                },
            })
        }
        _ => Err(errors),
    }
}

fn required_time(
    raw: &str,
    field: &'static str,
    label: &str,
    errors: &mut ValidationErrors,
) -> Option<NaiveTime> {
    if raw.trim().is_empty() {
        errors.add(field, format!("{label} is required."));
        return None;
    }
    let parsed = parse_time(raw);
    if parsed.is_none() {
        errors.add(field, format!("{label} must be a valid time (HH:MM)."));
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn valid_form() -> ReservationForm {
        ReservationForm {
            event_date: "2025-07-01".into(),
            start_time: "09:00".into(),
            end_time: "11:00".into(),
            first_name: " Ada ".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            mobile_number: "9171234567".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_form_is_trimmed_and_parsed() {
        let validated = validate_reservation(&valid_form(), today()).unwrap();
        assert_eq!(validated.event_date, NaiveDate::from_ymd_opt(2025, 7, 1).unwrap());
        assert_eq!(validated.start_time, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(validated.contact.first_name, "Ada");
        assert_eq!(validated.contact.address, None);
        assert_eq!(validated.contact.mobile_number.as_deref(), Some("9171234567"));
    }

    #[test]
    fn test_missing_email_and_inverted_times_report_both() {
        let form = ReservationForm {
            email: String::new(),
            start_time: "14:00".into(),
            end_time: "14:00".into(),
            ..valid_form()
        };
        let errors = validate_reservation(&form, today()).unwrap_err();
        assert!(errors.len() >= 2);
        assert!(errors.has("email"));
        assert!(errors.has("end_time"));
    }

    #[test]
    fn test_every_required_field_reported() {
        let errors = validate_reservation(&ReservationForm::default(), today()).unwrap_err();
        for field in ["event_date", "start_time", "end_time", "first_name", "last_name", "email"] {
            assert!(errors.has(field), "missing complaint for {field}");
        }
    }

    #[test]
    fn test_past_date_and_bad_formats() {
        let form = ReservationForm {
            event_date: "2025-06-14".into(),
            start_time: "9am".into(),
            email: "not-an-email".into(),
            mobile_number: "+63 917".into(),
            ..valid_form()
        };
        let errors = validate_reservation(&form, today()).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.has("event_date"));
        assert!(errors.has("start_time"));
        assert!(errors.has("email"));
        assert!(errors.has("mobile_number"));
    }

    #[test]
    fn test_today_is_not_past() {
        let form = ReservationForm {
            event_date: "2025-06-15".into(),
            ..valid_form()
        };
        assert!(validate_reservation(&form, today()).is_ok());
    }

    #[test]
    fn test_seconds_are_accepted() {
        assert_eq!(parse_time("09:30:15"), NaiveTime::from_hms_opt(9, 30, 15));
        assert_eq!(parse_time("25:00"), None);
    }
}
