//! Shared data model for one resolution run.
//!
//! Every record here is created and owned within a single pipeline run; the
//! wire shapes use camelCase keys because the browser UI consumes them
//! directly. Model-facing structs are `#[serde(default)]`-tolerant: replies
//! are untrusted text and a missing key must read as null, not a parse error.

use std::fmt;

use serde::{Deserialize, Serialize};

/// City/state pair a resolution run is anchored to. Derived once per request
/// (directly from query params or from a ZIP via geocoding), immutable after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub state: String,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.city, self.state)
    }
}

/// One ranked result from the web-search provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// The single municipal site chosen from a batch of search hits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SiteCandidate {
    pub website: Option<String>,
    pub meetings_page: Option<String>,
    pub description: Option<String>,
    pub next_meeting: Option<String>,
    pub contact_info: Option<String>,
}

impl SiteCandidate {
    /// An empty candidate has nothing to scrape; downstream fetching is
    /// skipped entirely.
    pub fn is_empty(&self) -> bool {
        self.website.is_none() && self.meetings_page.is_none()
    }

    /// The URL worth scraping: the meetings page when known, else the main
    /// site.
    pub fn target_url(&self) -> Option<&str> {
        self.meetings_page.as_deref().or(self.website.as_deref())
    }
}

/// Text scraped from one URL. Ephemeral; discarded after synthesis.
#[derive(Debug, Clone, Serialize)]
pub struct PageContent {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PageContent {
    pub fn fetched(url: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content: Some(content.into()),
            success: true,
            error: None,
        }
    }

    pub fn failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content: None,
            success: false,
            error: Some(error.into()),
        }
    }

    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

/// Categorized links and access info mined from scraped pages.
///
/// Invariant: by the time an inventory leaves the discoverer, every entry in
/// `pdf_links` and `agenda_links` is an absolute URL (relative links are
/// resolved against the page base; unparseable ones pass through unchanged).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentInventory {
    pub pdf_links: Vec<String>,
    pub agenda_links: Vec<String>,
    pub calendar_links: Vec<String>,
    pub streaming_links: Vec<String>,
    pub upcoming_meetings: Vec<String>,
    pub document_types: Vec<String>,
    pub accessibility_info: Option<String>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PdfPriority {
    High,
    Medium,
    #[default]
    Low,
}

/// What can be inferred about one meeting document from its URL and filename
/// alone. No PDF bytes are ever fetched or parsed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PdfAssessment {
    pub url: String,
    pub filename: String,
    pub meeting_date: Option<String>,
    pub meeting_type: Option<String>,
    pub document_type: Option<String>,
    pub is_upcoming: bool,
    pub priority: PdfPriority,
    pub extracted_info: Option<String>,
}

/// Result of the PDF-assessment sub-routine. `analyzed_pdfs` is capped at 5
/// by discovery order; `total_pdfs` counts everything found.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PdfAnalysis {
    #[serde(rename = "analyzedPDFs")]
    pub analyzed_pdfs: Vec<PdfAssessment>,
    #[serde(rename = "totalPDFs")]
    pub total_pdfs: usize,
    pub summary: String,
}

/// The terminal synthesized record. No mutation occurs after synthesis.
///
/// `scraped_urls` and `total_pages_analyzed` are bookkeeping attached by
/// code after parsing, never trusted from model output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MeetingInfo {
    // Candidate-site fields
    pub website: Option<String>,
    pub meetings_page: Option<String>,
    pub description: Option<String>,
    pub next_meeting: Option<String>,
    pub contact_info: Option<String>,

    // Synthesis fields
    pub meeting_schedule: Option<String>,
    pub location: Option<String>,
    pub public_participation: Option<String>,
    pub meeting_types: Vec<String>,
    pub documents: Vec<String>,
    pub live_streaming: Option<String>,
    pub summary: Option<String>,

    // Bookkeeping
    pub scraped_urls: Vec<String>,
    pub total_pages_analyzed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_analysis: Option<PdfAnalysis>,
}

impl MeetingInfo {
    /// Layer candidate-selection knowledge under a synthesized record.
    ///
    /// The candidate is authoritative for the site identity fields; prose
    /// fields extracted from page content win over snippet-derived ones, so
    /// those only fill in where synthesis came back null. A later-stage
    /// failure therefore leaves later fields null without discarding what
    /// earlier stages learned.
    pub fn apply_candidate(&mut self, candidate: &SiteCandidate) {
        self.website = candidate.website.clone();
        self.meetings_page = candidate.meetings_page.clone();
        if self.description.is_none() {
            self.description = candidate.description.clone();
        }
        if self.next_meeting.is_none() {
            self.next_meeting = candidate.next_meeting.clone();
        }
        if self.contact_info.is_none() {
            self.contact_info = candidate.contact_info.clone();
        }
    }
}

/// Success payload of the lookup endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupResponse {
    pub city: String,
    pub state: String,
    pub council_info: SiteCandidate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comprehensive_info: Option<MeetingInfo>,
    pub search_results_count: usize,
    pub fallback: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_empty_only_when_both_urls_missing() {
        let empty = SiteCandidate::default();
        assert!(empty.is_empty());

        let with_site = SiteCandidate {
            website: Some("https://springfield.il.us".into()),
            ..Default::default()
        };
        assert!(!with_site.is_empty());

        let with_page = SiteCandidate {
            meetings_page: Some("https://springfield.il.us/meetings".into()),
            ..Default::default()
        };
        assert!(!with_page.is_empty());
    }

    #[test]
    fn target_prefers_meetings_page() {
        let candidate = SiteCandidate {
            website: Some("https://a.gov".into()),
            meetings_page: Some("https://a.gov/meetings".into()),
            ..Default::default()
        };
        assert_eq!(candidate.target_url(), Some("https://a.gov/meetings"));
    }

    #[test]
    fn candidate_parses_camel_case_keys() {
        let candidate: SiteCandidate = serde_json::from_str(
            r#"{"website": "https://a.gov", "meetingsPage": null, "contactInfo": "clerk@a.gov"}"#,
        )
        .unwrap();
        assert_eq!(candidate.website.as_deref(), Some("https://a.gov"));
        assert!(candidate.meetings_page.is_none());
        assert_eq!(candidate.contact_info.as_deref(), Some("clerk@a.gov"));
    }

    #[test]
    fn meeting_info_tolerates_missing_keys() {
        let info: MeetingInfo =
            serde_json::from_str(r#"{"meetingSchedule": "First Tuesday at 7 PM"}"#).unwrap();
        assert_eq!(
            info.meeting_schedule.as_deref(),
            Some("First Tuesday at 7 PM")
        );
        assert!(info.next_meeting.is_none());
        assert!(info.documents.is_empty());
    }

    #[test]
    fn apply_candidate_fills_without_clobbering_extraction() {
        let candidate = SiteCandidate {
            website: Some("https://a.gov".into()),
            description: Some("from snippets".into()),
            contact_info: Some("from snippets".into()),
            ..Default::default()
        };
        let mut info = MeetingInfo {
            contact_info: Some("clerk@a.gov, from page".into()),
            ..Default::default()
        };
        info.apply_candidate(&candidate);

        assert_eq!(info.website.as_deref(), Some("https://a.gov"));
        assert_eq!(info.description.as_deref(), Some("from snippets"));
        assert_eq!(info.contact_info.as_deref(), Some("clerk@a.gov, from page"));
    }

    #[test]
    fn pdf_analysis_serializes_legacy_key_names() {
        let analysis = PdfAnalysis {
            analyzed_pdfs: vec![],
            total_pdfs: 7,
            summary: "Found 7 PDF documents".into(),
        };
        let json = serde_json::to_value(&analysis).unwrap();
        assert_eq!(json["totalPDFs"], 7);
        assert!(json["analyzedPDFs"].is_array());
    }

    #[test]
    fn pdf_priority_defaults_low() {
        let assessment: PdfAssessment = serde_json::from_str(r#"{"meetingType": "council"}"#).unwrap();
        assert_eq!(assessment.priority, PdfPriority::Low);
        assert!(!assessment.is_upcoming);
    }
}
