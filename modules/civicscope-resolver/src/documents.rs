use std::sync::Arc;

use tracing::warn;

use ai_client::{parse_json_reply, truncate_to_char_boundary, ChatModel};
use civicscope_common::{DocumentInventory, PdfAnalysis, PdfAssessment, PdfPriority};

/// Bound on page text handed to document discovery.
const DISCOVER_CONTENT_CAP: usize = 8_000;

/// Hard cap on per-request PDF assessments. Bounds latency and inference
/// cost; documents past the cap are counted but not assessed.
pub const MAX_PDF_ASSESSMENTS: usize = 5;

/// Cap on links picked up by the regex scan, matching the search-hit scale
/// of everything else in a run.
const MAX_SCANNED_LINKS: usize = 20;

// --- Prompts ---

const DISCOVER_SYSTEM: &str = "\
You are an expert at finding city council meeting documents and agendas. Analyze the \
following webpage content and identify any links or references to PDF agendas, meeting \
minutes, calendar events, upcoming meetings, document archives, live streaming links, and \
meeting recordings.

Return a JSON object with:
{
    \"pdfLinks\": [\"PDF URLs found\"],
    \"agendaLinks\": [\"agenda page URLs\"],
    \"calendarLinks\": [\"calendar URLs\"],
    \"streamingLinks\": [\"streaming/video URLs\"],
    \"upcomingMeetings\": [\"upcoming meeting dates/times found\"],
    \"documentTypes\": [\"types of documents available\"],
    \"accessibilityInfo\": \"information about public access to meetings\",
    \"summary\": \"summary of document availability and access methods\"
}

Look for links ending in .pdf, text mentioning agendas/minutes/meetings, calendar or event \
information, streaming or video links, and phone numbers for dial-in access. Keep URLs \
exactly as they appear in the content. Reply with the JSON object only.";

const ASSESS_SYSTEM: &str = "\
You are an expert at analyzing city council meeting document URLs and filenames. Based on \
the PDF URL and filename alone, extract as much as possible about the meeting:

{
    \"meetingDate\": \"likely meeting date if found in filename/path\",
    \"meetingType\": \"type of meeting (council, planning, special, etc.)\",
    \"documentType\": \"type of document (agenda, minutes, packet, etc.)\",
    \"isUpcoming\": true or false,
    \"priority\": \"high|medium|low based on how recent/relevant this document appears\",
    \"extractedInfo\": \"any other information determinable from the URL/filename\"
}

Look for dates in any format (2023-12-15, 12-15-23, December-15-2023), meeting types, \
document types, and keywords indicating recency. Reply with the JSON object only.";

const PDF_SUMMARY_SYSTEM: &str = "\
Based on the analysis of multiple PDF documents from a city council website, provide a \
comprehensive summary of what meeting information is available. Focus on the most \
recent/upcoming meetings, the types of meetings, the document types found, and the overall \
accessibility of meeting information. Write a short, helpful summary for citizens looking \
for council meeting information.";

// --- DocumentDiscoverer ---

/// Mines scraped page text for meeting documents and classifies discovered
/// PDFs from their URLs and filenames alone. No PDF bytes are ever fetched
/// or parsed anywhere in the system.
pub struct DocumentDiscoverer {
    model: Arc<dyn ChatModel>,
}

impl DocumentDiscoverer {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    /// Build a document inventory for `page_text`, with every PDF and agenda
    /// link rewritten absolute against `base_url` before return.
    pub async fn discover(&self, page_text: &str, base_url: &str) -> DocumentInventory {
        let content = truncate_to_char_boundary(page_text, DISCOVER_CONTENT_CAP);
        let user =
            format!("Find meeting documents and access information from this content:\n\n{content}");

        let mut inventory = match self
            .model
            .complete(DISCOVER_SYSTEM, &user)
            .await
            .and_then(|text| Ok(parse_json_reply::<DocumentInventory>(&text)?))
        {
            Ok(inventory) => inventory,
            Err(e) => {
                warn!(base_url, error = %e, "Document discovery failed");
                DocumentInventory {
                    summary: Some("Could not automatically detect meeting documents".to_string()),
                    ..Default::default()
                }
            }
        };

        // Pick up .pdf links the model missed with a plain token scan.
        for link in scan_pdf_links(page_text) {
            if !inventory.pdf_links.contains(&link) {
                inventory.pdf_links.push(link);
            }
        }

        absolutize_all(&mut inventory.pdf_links, base_url);
        absolutize_all(&mut inventory.agenda_links, base_url);

        inventory
    }

    /// Assess up to [`MAX_PDF_ASSESSMENTS`] discovered PDFs concurrently.
    /// A single document's failure degrades only that record.
    pub async fn assess_pdfs(&self, pdf_urls: &[String]) -> PdfAnalysis {
        if pdf_urls.is_empty() {
            return PdfAnalysis {
                analyzed_pdfs: Vec::new(),
                total_pdfs: 0,
                summary: "No PDF documents found to analyze".to_string(),
            };
        }

        let selected = &pdf_urls[..pdf_urls.len().min(MAX_PDF_ASSESSMENTS)];
        let assessments =
            futures::future::join_all(selected.iter().map(|url| self.assess_one(url))).await;

        let summary = self.summarize(&assessments).await;

        PdfAnalysis {
            analyzed_pdfs: assessments,
            total_pdfs: pdf_urls.len(),
            summary,
        }
    }

    async fn assess_one(&self, pdf_url: &str) -> PdfAssessment {
        let filename = extract_filename(pdf_url);
        let user = format!(
            "Analyze this PDF document URL and filename:\nURL: {pdf_url}\nFilename: {filename}"
        );

        let mut assessment = match self
            .model
            .complete(ASSESS_SYSTEM, &user)
            .await
            .and_then(|text| Ok(parse_json_reply::<PdfAssessment>(&text)?))
        {
            Ok(assessment) => assessment,
            Err(e) => {
                warn!(url = pdf_url, error = %e, "PDF assessment failed");
                PdfAssessment {
                    document_type: Some("pdf".to_string()),
                    priority: PdfPriority::Low,
                    extracted_info: Some("Could not analyze document".to_string()),
                    ..Default::default()
                }
            }
        };

        assessment.url = pdf_url.to_string();
        assessment.filename = filename;
        assessment
    }

    async fn summarize(&self, assessments: &[PdfAssessment]) -> String {
        let listing: String = assessments
            .iter()
            .map(|a| {
                format!(
                    "PDF: {}\nAnalysis: {}",
                    a.filename,
                    serde_json::to_string(a).unwrap_or_default()
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        let user = format!("Summarize these PDF document analyses:\n\n{listing}");

        match self.model.complete(PDF_SUMMARY_SYSTEM, &user).await {
            Ok(summary) if !summary.trim().is_empty() => summary.trim().to_string(),
            _ => format!(
                "Found {} PDF documents, but could not provide detailed analysis.",
                assessments.len()
            ),
        }
    }
}

// --- URL helpers ---

fn absolutize_all(links: &mut [String], base_url: &str) {
    for link in links.iter_mut() {
        *link = make_absolute(link, base_url);
    }
}

/// Rewrite `link` absolute against `base_url`. Already-absolute links pass
/// through; a link that cannot be resolved is returned unchanged rather than
/// dropped, so the UI still sees it.
pub fn make_absolute(link: &str, base_url: &str) -> String {
    if link.starts_with("http://") || link.starts_with("https://") {
        return link.to_string();
    }
    match url::Url::parse(base_url).and_then(|base| base.join(link)) {
        Ok(resolved) => resolved.to_string(),
        Err(_) => {
            warn!(link, base_url, "Could not resolve URL, passing through");
            link.to_string()
        }
    }
}

/// Last path segment of a document URL, defaulting to "unknown.pdf" when the
/// URL refuses to yield one.
pub fn extract_filename(pdf_url: &str) -> String {
    let segment = match url::Url::parse(pdf_url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(str::to_string),
        Err(_) => pdf_url
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .map(str::to_string),
    };
    segment.unwrap_or_else(|| "unknown.pdf".to_string())
}

/// Scan page text for URL-ish tokens ending in `.pdf`. Readability output is
/// markdown, so this catches both raw hrefs and markdown link targets.
fn scan_pdf_links(text: &str) -> Vec<String> {
    let pdf_re = regex::Regex::new(r"(?i)[a-zA-Z0-9./:_%~#?&=+()-]*[a-zA-Z0-9_%~-]\.pdf\b")
        .expect("valid regex");

    let mut seen = std::collections::HashSet::new();
    let mut links = Vec::new();

    for m in pdf_re.find_iter(text) {
        let raw = m.as_str().trim_start_matches('(');
        if seen.insert(raw.to_string()) {
            links.push(raw.to_string());
            if links.len() >= MAX_SCANNED_LINKS {
                break;
            }
        }
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_link_resolves_against_page_base() {
        assert_eq!(
            make_absolute("../agendas/oct.pdf", "https://example.gov/meetings/"),
            "https://example.gov/agendas/oct.pdf"
        );
        assert_eq!(
            make_absolute("/files/nov.pdf", "https://example.gov/meetings/"),
            "https://example.gov/files/nov.pdf"
        );
    }

    #[test]
    fn absolute_link_passes_through() {
        assert_eq!(
            make_absolute("https://other.gov/a.pdf", "https://example.gov/"),
            "https://other.gov/a.pdf"
        );
    }

    #[test]
    fn unresolvable_link_passes_through_unchanged() {
        assert_eq!(make_absolute("oct.pdf", "not a base url"), "oct.pdf");
    }

    #[test]
    fn filename_is_last_path_segment() {
        assert_eq!(
            extract_filename("https://example.gov/files/2026-03-agenda.pdf"),
            "2026-03-agenda.pdf"
        );
        assert_eq!(
            extract_filename("https://example.gov/files/agenda.pdf?v=2"),
            "agenda.pdf"
        );
    }

    #[test]
    fn filename_defaults_when_unparseable() {
        assert_eq!(extract_filename("https://example.gov/"), "unknown.pdf");
        assert_eq!(extract_filename(""), "unknown.pdf");
    }

    #[test]
    fn pdf_scan_finds_markdown_and_relative_links() {
        let text = "See the [October agenda](/files/oct.pdf) and \
                    https://example.gov/minutes/sept.pdf for details.";
        let links = scan_pdf_links(text);
        assert!(links.contains(&"/files/oct.pdf".to_string()));
        assert!(links.contains(&"https://example.gov/minutes/sept.pdf".to_string()));
    }

    #[test]
    fn pdf_scan_dedups() {
        let text = "a.pdf a.pdf a.pdf";
        assert_eq!(scan_pdf_links(text).len(), 1);
    }
}
