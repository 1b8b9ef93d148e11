use super::*;

fn form(name: &str, age: &str, gender: &str) -> ProfileForm {
    ProfileForm {
        name: name.into(),
        age: age.into(),
        gender: gender.into(),
        ..Default::default()
    }
}

#[test]
fn validate_applies_defaults_for_optional_fields() {
    let profile = form("Jane Doe", "34", "Female").validate().unwrap();
    assert_eq!(profile.name, "Jane Doe");
    assert_eq!(profile.age, 34);
    assert_eq!(profile.gender, "Female");
    assert_eq!(profile.contact, DEFAULT_CONTACT);
    assert_eq!(profile.medical_history, DEFAULT_MEDICAL_HISTORY);
}

#[test]
fn validate_keeps_provided_optional_fields() {
    let mut input = form("Sam", "51", "Male");
    input.contact = " sam@example.com ".into();
    input.medical_history = "Asthma".into();
    let profile = input.validate().unwrap();
    assert_eq!(profile.contact, "sam@example.com");
    assert_eq!(profile.medical_history, "Asthma");
}

#[test]
fn validate_reports_every_missing_required_field() {
    let err = form("  ", "", "Other").validate().unwrap_err();
    assert_eq!(err, ValidationError::MissingRequired { fields: vec!["name", "age"] });
}

#[test]
fn validate_parses_leading_integer_age() {
    assert_eq!(form("A", "42 years", "F").validate().unwrap().age, 42);
    assert_eq!(form("A", "+7", "F").validate().unwrap().age, 7);
}

#[test]
fn validate_rejects_non_numeric_and_negative_age() {
    assert_eq!(
        form("A", "forty", "F").validate().unwrap_err(),
        ValidationError::InvalidAge("forty".into())
    );
    assert!(matches!(form("A", "-3", "F").validate(), Err(ValidationError::InvalidAge(_))));
}

#[test]
fn profile_serializes_with_wire_field_names() {
    let profile = form("Jane", "30", "Female").validate().unwrap();
    let json = serde_json::to_value(&profile).unwrap();
    assert_eq!(json["name"], "Jane");
    assert_eq!(json["age"], 30);
    assert_eq!(json["medical_history"], DEFAULT_MEDICAL_HISTORY);
    assert_eq!(json["contact"], DEFAULT_CONTACT);
}
