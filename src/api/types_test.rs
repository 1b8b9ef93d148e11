use super::*;
use crate::insight::PanelKind;
use serde_json::json;

// =============================================================================
// /chat
// =============================================================================

#[test]
fn chat_response_with_insight_decodes_both_forms() {
    let text = json!({
        "response": {
            "message": "It sounds like a cold.",
            "type": "diagnosis",
            "data": {
                "suggested_diagnosis": "Common Cold",
                "confidence": 0.67,
                "urgency": "low",
                "processing_time": 0.2
            }
        },
        "session_id": "s-1"
    })
    .to_string();

    let reply = parse_chat_response(&text).unwrap();
    assert_eq!(reply.message, "It sounds like a cold.");
    assert_eq!(reply.kind.as_deref(), Some("diagnosis"));
    assert_eq!(reply.data.as_ref().unwrap()["processing_time"], 0.2);
    let insight = reply.insight.unwrap();
    assert_eq!(insight.suggested_diagnosis.as_deref(), Some("Common Cold"));
}

#[test]
fn chat_response_without_data_has_no_insight() {
    let text = json!({ "response": { "message": "Hello!" } }).to_string();
    let reply = parse_chat_response(&text).unwrap();
    assert!(reply.data.is_none());
    assert!(reply.insight.is_none());
    assert!(!reply.is_emergency());
}

#[test]
fn chat_response_with_null_data_has_no_insight() {
    let text = json!({ "response": { "message": "Hi", "data": null } }).to_string();
    let reply = parse_chat_response(&text).unwrap();
    assert!(reply.data.is_none());
}

#[test]
fn chat_response_with_malformed_insight_keeps_raw_data() {
    let text = json!({
        "response": { "message": "x", "data": { "recommended_tests": { "name": ["not", "text"] }, "suggested_diagnosis": 5 } }
    })
    .to_string();
    let reply = parse_chat_response(&text).unwrap();
    assert!(reply.data.is_some());
    assert!(reply.insight.is_none());
}

#[test]
fn chat_response_flags_emergency() {
    let text = json!({ "response": { "message": "Call 911", "type": "emergency", "data": {} } }).to_string();
    assert!(parse_chat_response(&text).unwrap().is_emergency());
}

#[test]
fn chat_response_missing_envelope_is_parse_error() {
    let err = parse_chat_response(r#"{"error":"Invalid session"}"#).unwrap_err();
    assert!(matches!(err, ApiError::Parse(_)));
    assert_eq!(err.error_code(), "E_API_PARSE");
}

// =============================================================================
// /generate_report
// =============================================================================

#[test]
fn report_url_wins_over_other_fields() {
    let text = json!({ "report_url": "/reports/r.pdf", "error": "ignored", "pdf_base64": "AAAA" }).to_string();
    assert_eq!(parse_report_response(&text).unwrap(), ReportOutcome::Url("/reports/r.pdf".into()));
}

#[test]
fn report_error_beats_pdf_payload() {
    let text = json!({ "error": "Invalid session", "pdf_base64": "AAAA" }).to_string();
    assert_eq!(parse_report_response(&text).unwrap(), ReportOutcome::ServerError("Invalid session".into()));
}

#[test]
fn report_pdf_payload_is_last_resort() {
    let text = json!({ "pdf_base64": "JVBERi0=", "error": "" }).to_string();
    assert_eq!(parse_report_response(&text).unwrap(), ReportOutcome::PdfBase64("JVBERi0=".into()));
}

#[test]
fn report_with_no_known_field_is_unhandled() {
    let text = json!({ "message": "Report generated successfully" }).to_string();
    assert_eq!(parse_report_response(&text).unwrap(), ReportOutcome::Unhandled);
}

#[test]
fn report_non_json_is_parse_error() {
    assert!(matches!(parse_report_response("<html>"), Err(ApiError::Parse(_))));
}

// =============================================================================
// /diagnosis and /save_patient_record
// =============================================================================

#[test]
fn diagnosis_to_insight_uses_top_condition() {
    let resp: DiagnosisResponse = serde_json::from_value(json!({
        "status": "success",
        "symptoms": ["fever", "cough"],
        "possible_diseases": [
            { "name": "Influenza", "match_score": 0.5, "urgency": "medium" },
            { "name": "Common Cold", "match_score": 0.4 }
        ],
        "ai_summary": "Likely the flu.",
        "recommended_tests": [{ "name": "CBC", "purpose": "General health screening" }],
        "urgency_level": "high"
    }))
    .unwrap();

    assert!(resp.server_error().is_none());
    let insight = resp.to_insight();
    assert_eq!(insight.suggested_diagnosis.as_deref(), Some("Influenza"));
    assert_eq!(insight.confidence, Some(0.5));
    assert_eq!(insight.urgency.as_deref(), Some("high"));
    assert!(insight.recommended_tests.is_some());
    assert!(insight.treatment_recommendations.is_none());
}

#[test]
fn diagnosis_without_conditions_is_undetermined() {
    let resp = DiagnosisResponse::default();
    let insight = resp.to_insight();
    assert_eq!(insight.suggested_diagnosis.as_deref(), Some(UNDETERMINED_DIAGNOSIS));
    assert_eq!(insight.confidence, None);
}

#[test]
fn diagnosis_error_status_is_reported() {
    let resp: DiagnosisResponse =
        serde_json::from_value(json!({ "status": "error", "error": "bad symptoms", "possible_diseases": [] })).unwrap();
    assert_eq!(resp.server_error(), Some("bad symptoms"));
}

#[test]
fn save_record_request_splits_latest_insight() {
    let profile = PatientProfile {
        name: "Jane".into(),
        age: 30,
        gender: "Female".into(),
        contact: "Not provided".into(),
        medical_history: "None provided".into(),
    };
    let insight = json!({
        "suggested_diagnosis": "Migraine",
        "urgency": "medium",
        "treatment_recommendations": ["Rest"],
        "processing_time": 0.1
    });

    let request = SaveRecordRequest::new(&profile, &[], Some(&insight));
    assert_eq!(request.diagnosis, json!({ "suggested_diagnosis": "Migraine", "urgency": "medium" }));
    assert_eq!(request.treatment, json!({ "treatment_recommendations": ["Rest"] }));

    let empty = SaveRecordRequest::new(&profile, &[], None);
    assert_eq!(empty.diagnosis, json!({}));
    assert_eq!(empty.treatment, json!({}));
}

#[test]
fn save_record_failure_text_is_not_a_record_id() {
    let ok = SaveRecordResponse { record_id: Some("3f2c".into()), message: None };
    let failed = SaveRecordResponse { record_id: Some("Error saving record: disk full".into()), message: None };
    assert_eq!(ok.record_id(), Some("3f2c"));
    assert_eq!(failed.record_id(), None);
}

// =============================================================================
// /treatment
// =============================================================================

fn plan() -> TreatmentPlan {
    serde_json::from_value(json!({
        "name": "Influenza",
        "treatments": ["Rest", "Fluids"],
        "medications": [{ "name": "Oseltamivir", "purpose": "Antiviral", "dosage": "75mg" }],
        "duration": "5 days",
        "follow_up": "Return if fever persists",
        "patient_specific_adjustments": ["Avoid NSAIDs"]
    }))
    .unwrap()
}

#[test]
fn treatment_plan_merges_treatments_then_medications() {
    let insight = plan().to_insight();
    assert_eq!(insight.suggested_diagnosis, None);
    assert_eq!(insight.recommended_tests, None);
    let cards = insight.treatment_recommendations.unwrap().cards(PanelKind::Treatment);
    let titles: Vec<&str> = cards.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, ["Rest", "Fluids", "Oseltamivir"]);
    assert_eq!(cards[2].description, "Antiviral");
    assert_eq!(cards[2].dosage.as_deref(), Some("75mg"));
}

#[test]
fn treatment_history_payload_feeds_the_record_sections() {
    let payload = plan().history_payload("Influenza");
    let p = PatientProfile {
        name: "Jane".into(),
        age: 30,
        gender: "Female".into(),
        contact: "Not provided".into(),
        medical_history: "None provided".into(),
    };
    let record = SaveRecordRequest::new(&p, &[], Some(&payload));
    assert_eq!(record.diagnosis, json!({ "suggested_diagnosis": "Influenza" }));
    assert_eq!(record.treatment["follow_up_advice"], "Return if fever persists");
    assert_eq!(record.treatment["treatment_recommendations"][0], "Rest");
}

#[test]
fn treatment_summary_lists_duration_follow_up_and_notes() {
    assert_eq!(
        plan().summary("Flu"),
        "Treatment plan for Influenza\nDuration: 5 days\nFollow-up: Return if fever persists\nNote: Avoid NSAIDs"
    );
    assert_eq!(TreatmentPlan::default().summary("Flu"), "Treatment plan for Flu");
}

#[test]
fn treatment_error_falls_back_to_basic_recommendations() {
    let resp: TreatmentResponse = serde_json::from_value(json!({
        "status": "error",
        "error": "model unavailable",
        "basic_recommendations": ["Rest and hydrate", "Monitor symptoms"]
    }))
    .unwrap();
    assert_eq!(resp.server_error(), Some("model unavailable"));
    let cards = resp.fallback_insight().unwrap().treatment_recommendations.unwrap().cards(PanelKind::Treatment);
    assert_eq!(cards.len(), 2);
    assert_eq!(cards[0].title, "Rest and hydrate");
}

#[test]
fn treatment_success_without_plan_is_an_error() {
    let resp: TreatmentResponse = serde_json::from_value(json!({ "status": "success" })).unwrap();
    assert!(resp.server_error().is_some());
    assert_eq!(resp.fallback_insight(), None);
}
