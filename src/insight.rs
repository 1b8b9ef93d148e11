//! Medical insight payloads and the panel content derived from them.
//!
//! DESIGN
//! ======
//! The chat API attaches an optional structured payload to assistant turns.
//! Treatment and test recommendations arrive in three shapes (a bare string,
//! a single object, or a list mixing both). They are decoded once into
//! [`Recommendations`] at the API boundary; everything downstream works on
//! [`InsightCard`] values and never inspects raw JSON again.

#[cfg(test)]
#[path = "insight_test.rs"]
mod insight_test;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const DEFAULT_TREATMENT_TITLE: &str = "Treatment";
pub const DEFAULT_TREATMENT_TEXT: &str = "Follow your healthcare provider's guidance.";
pub const DEFAULT_TEST_TITLE: &str = "Diagnostic Test";
pub const DEFAULT_TEST_TEXT: &str = "Recommended diagnostic test.";

// =============================================================================
// PAYLOAD
// =============================================================================

/// Structured insight attached to an assistant turn. Every field is optional;
/// an absent field leaves the matching panel untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MedicalInsight {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_diagnosis: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub urgency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treatment_recommendations: Option<Recommendations>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_tests: Option<Recommendations>,
}

/// Treatment or test recommendations in any of the accepted shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Recommendations {
    Text(String),
    List(Vec<RecommendationEntry>),
    Single(RecommendationItem),
    /// Numbers, booleans and other stray values render as a default card.
    Other(Value),
}

/// One element of a recommendation list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecommendationEntry {
    Text(String),
    Item(RecommendationItem),
    Other(Value),
}

/// A recommendation object. Scalar fields tolerate numbers and booleans so a
/// numeric `code` does not reject the whole item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationItem {
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub dosage: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

// =============================================================================
// CARDS
// =============================================================================

/// Which panel a set of recommendations is rendered into. Decides the
/// fallback title and description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelKind {
    Treatment,
    Tests,
}

impl PanelKind {
    fn default_title(self) -> &'static str {
        match self {
            Self::Treatment => DEFAULT_TREATMENT_TITLE,
            Self::Tests => DEFAULT_TEST_TITLE,
        }
    }

    fn default_text(self) -> &'static str {
        match self {
            Self::Treatment => DEFAULT_TREATMENT_TEXT,
            Self::Tests => DEFAULT_TEST_TEXT,
        }
    }
}

/// Render-ready card for the treatment or tests panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsightCard {
    pub title: String,
    pub description: String,
    pub dosage: Option<String>,
    pub code: Option<String>,
}

impl InsightCard {
    fn from_text(text: &str, kind: PanelKind) -> Self {
        Self {
            title: text.to_owned(),
            description: kind.default_text().to_owned(),
            dosage: None,
            code: None,
        }
    }

    fn from_item(item: &RecommendationItem, kind: PanelKind) -> Self {
        let title = item
            .name
            .as_deref()
            .or(item.title.as_deref())
            .unwrap_or(kind.default_title());
        let description = item
            .description
            .as_deref()
            .or(item.details.as_deref())
            .or(item.purpose.as_deref())
            .unwrap_or(kind.default_text());
        Self {
            title: title.to_owned(),
            description: description.to_owned(),
            dosage: item.dosage.clone(),
            code: item.code.clone(),
        }
    }

    fn placeholder(kind: PanelKind) -> Self {
        Self::from_item(&RecommendationItem::default(), kind)
    }
}

impl Recommendations {
    /// Flatten into cards, preserving input order.
    #[must_use]
    pub fn cards(&self, kind: PanelKind) -> Vec<InsightCard> {
        match self {
            Self::Text(text) => vec![InsightCard::from_text(text, kind)],
            Self::Single(item) => vec![InsightCard::from_item(item, kind)],
            Self::Other(_) => vec![InsightCard::placeholder(kind)],
            Self::List(entries) => entries
                .iter()
                .map(|entry| match entry {
                    RecommendationEntry::Text(text) => InsightCard::from_text(text, kind),
                    RecommendationEntry::Item(item) => InsightCard::from_item(item, kind),
                    RecommendationEntry::Other(_) => InsightCard::placeholder(kind),
                })
                .collect(),
        }
    }

    /// The recommendations as list entries, so several sources can be merged
    /// into one panel.
    #[must_use]
    pub fn into_entries(self) -> Vec<RecommendationEntry> {
        match self {
            Self::Text(text) => vec![RecommendationEntry::Text(text)],
            Self::List(entries) => entries,
            Self::Single(item) => vec![RecommendationEntry::Item(item)],
            Self::Other(value) => vec![RecommendationEntry::Other(value)],
        }
    }
}

// =============================================================================
// DIAGNOSIS
// =============================================================================

/// Diagnosis panel content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosisSummary {
    pub label: String,
    /// Confidence as a rounded percentage, 0..=100.
    pub confidence_percent: Option<u8>,
    /// Urgency, used verbatim as the panel's style class.
    pub urgency: Option<String>,
}

impl DiagnosisSummary {
    #[must_use]
    pub fn from_insight(insight: &MedicalInsight) -> Option<Self> {
        let label = insight.suggested_diagnosis.as_deref()?.trim();
        if label.is_empty() {
            return None;
        }
        Some(Self {
            label: label.to_owned(),
            confidence_percent: insight.confidence.and_then(confidence_percent),
            urgency: insight.urgency.clone(),
        })
    }
}

/// Convert a 0–1 confidence into a rounded percentage. Out-of-range values
/// are clamped; non-finite values yield `None`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn confidence_percent(confidence: f64) -> Option<u8> {
    if !confidence.is_finite() {
        return None;
    }
    Some((confidence * 100.0).round().clamp(0.0, 100.0) as u8)
}

// =============================================================================
// PANEL UPDATE
// =============================================================================

/// What a single insight payload changes. `None` means "leave that panel as is".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelUpdate {
    pub diagnosis: Option<DiagnosisSummary>,
    pub treatments: Option<Vec<InsightCard>>,
    pub tests: Option<Vec<InsightCard>>,
}

impl PanelUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diagnosis.is_none() && self.treatments.is_none() && self.tests.is_none()
    }
}

impl MedicalInsight {
    #[must_use]
    pub fn panel_update(&self) -> PanelUpdate {
        PanelUpdate {
            diagnosis: DiagnosisSummary::from_insight(self),
            treatments: self
                .treatment_recommendations
                .as_ref()
                .map(|r| r.cards(PanelKind::Treatment)),
            tests: self
                .recommended_tests
                .as_ref()
                .map(|r| r.cards(PanelKind::Tests)),
        }
    }
}
