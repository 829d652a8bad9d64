use std::sync::Arc;

use tracing::warn;

use ai_client::{parse_json_reply, truncate_to_char_boundary, ChatModel};
use civicscope_common::{
    DocumentInventory, Location, MeetingInfo, PageContent, PdfAnalysis, SearchHit, SiteCandidate,
};

/// Bound on page text handed to single-page extraction.
const EXTRACT_CONTENT_CAP: usize = 10_000;

/// Bound on the combined page text handed to synthesis.
const SYNTHESIS_CONTENT_CAP: usize = 12_000;

// --- Prompts ---

const SELECT_CANDIDATE_SYSTEM: &str = "\
You are helping to find city council meeting information. Based on the web search results \
provided, extract and return a JSON object with the following structure:
{
    \"website\": \"most relevant official city/town website URL\",
    \"meetingsPage\": \"specific meetings/agendas page URL if found\",
    \"description\": \"brief description of what was found\",
    \"nextMeeting\": \"next meeting date if mentioned in snippets\",
    \"contactInfo\": \"contact information if found in snippets\"
}

Prioritize official municipal websites. If no specific meetings page is found, use the main \
city website. Use null for anything not clearly present in the search results. \
Reply with the JSON object only.";

const EXTRACT_SYSTEM: &str = "\
You are an expert at reading city government web pages. Extract comprehensive meeting \
information and return a JSON object with this structure:
{
    \"meetingSchedule\": \"when meetings typically occur (e.g., 'First Monday of each month at 7:00 PM')\",
    \"nextMeeting\": \"next scheduled meeting date/time if found\",
    \"location\": \"where meetings are held\",
    \"contactInfo\": \"contact information (phone, email, address)\",
    \"publicParticipation\": \"how the public can participate or attend\",
    \"documents\": [\"important document links or agenda URLs found\"],
    \"meetingTypes\": [\"types of meetings - council, planning, etc.\"],
    \"liveStreaming\": \"live streaming or recording information if available\",
    \"summary\": \"comprehensive summary of meeting information found\"
}

Focus on accuracy. If information is not clearly present, use null for that field. \
Reply with the JSON object only.";

const SYNTHESIZE_SYSTEM: &str = "\
You are an expert at extracting city council meeting information. Based on multiple pages \
scraped from a city website, plus a document inventory, provide comprehensive meeting \
information as a JSON object:
{
    \"meetingSchedule\": \"when meetings typically occur\",
    \"nextMeeting\": \"next scheduled meeting if found\",
    \"location\": \"where meetings are held\",
    \"contactInfo\": \"contact information for meetings/clerk\",
    \"publicParticipation\": \"info about public comment/participation\",
    \"meetingTypes\": [\"types of meetings held - council, planning, etc\"],
    \"documents\": [\"links to important documents found\"],
    \"liveStreaming\": \"information about live streaming if available\",
    \"summary\": \"comprehensive summary of meeting information found\"
}

Be thorough but accurate. Only include information clearly present in the content. \
Use null for unknown fields. Reply with the JSON object only.";

const FALLBACK_SYSTEM: &str = "\
Based on your knowledge, provide information about the named city's council meetings. \
Return a JSON object with this structure:
{
    \"website\": \"likely official city website URL if known\",
    \"meetingsPage\": \"likely meetings page URL if known\",
    \"description\": \"general information about how to find council meetings for this city\",
    \"nextMeeting\": null,
    \"contactInfo\": \"general guidance on finding contact info\",
    \"summary\": \"summary of the guidance above\"
}

Be honest about limitations - you have no live data, so say in the description that the \
information is not current or verified. Reply with the JSON object only.";

// --- ResultInterpreter ---

/// Bridge between free-text model output and the typed records the pipeline
/// passes around. Every call parses the reply with the fence-strip rule and
/// degrades to a typed substitute on any failure; parse errors never cross
/// this boundary.
pub struct ResultInterpreter {
    model: Arc<dyn ChatModel>,
}

impl ResultInterpreter {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    /// Pick the single most promising municipal site from a batch of hits.
    pub async fn select_candidate(
        &self,
        hits: &[SearchHit],
        location: &Location,
    ) -> SiteCandidate {
        let listing: String = hits
            .iter()
            .enumerate()
            .map(|(i, hit)| {
                format!(
                    "{}. Title: {}\nURL: {}\nSnippet: {}\n",
                    i + 1,
                    hit.title,
                    hit.url,
                    hit.snippet
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let user = format!("Search results for {location} council meetings:\n\n{listing}");

        match self.reply::<SiteCandidate>(SELECT_CANDIDATE_SYSTEM, &user).await {
            Ok(candidate) => candidate,
            Err(e) => {
                warn!(%location, error = %e, "Candidate selection failed, degrading to first hit");
                SiteCandidate {
                    website: hits.first().map(|hit| hit.url.clone()),
                    description: Some(format!(
                        "Found {} results but failed to parse them automatically.",
                        hits.len()
                    )),
                    ..Default::default()
                }
            }
        }
    }

    /// Extract meeting details from one page's text. Used by the standalone
    /// scrape-agenda endpoint, so the location is optional there.
    pub async fn extract_meeting_info(
        &self,
        page_text: &str,
        location: Option<&Location>,
    ) -> MeetingInfo {
        let content = truncate_to_char_boundary(page_text, EXTRACT_CONTENT_CAP);
        let user = match location {
            Some(location) => format!(
                "Extract meeting information for {location} from this website content:\n\n{content}"
            ),
            None => format!("Extract meeting information from this website content:\n\n{content}"),
        };

        match self.reply::<MeetingInfo>(EXTRACT_SYSTEM, &user).await {
            Ok(info) => info,
            Err(e) => {
                warn!(error = %e, "Meeting-info extraction failed");
                MeetingInfo {
                    summary: Some(
                        "Could not extract meeting details from website content".to_string(),
                    ),
                    ..Default::default()
                }
            }
        }
    }

    /// Merge everything learned during a run into the final record. The
    /// bookkeeping fields are attached here, after parsing, never taken
    /// from the model's own output.
    pub async fn synthesize(
        &self,
        pages: &[PageContent],
        candidate: &SiteCandidate,
        inventory: &DocumentInventory,
        pdf_analysis: Option<&PdfAnalysis>,
        location: &Location,
    ) -> MeetingInfo {
        let successful: Vec<&PageContent> = pages.iter().filter(|p| p.success).collect();

        let combined: String = successful
            .iter()
            .map(|page| format!("URL: {}\nContent: {}", page.url, page.text()))
            .collect::<Vec<_>>()
            .join("\n\n---\n\n");
        let combined = truncate_to_char_boundary(&combined, SYNTHESIS_CONTENT_CAP);

        let mut user = format!(
            "Extract comprehensive council meeting information for {location} from these \
             website pages:\n\n{combined}"
        );
        if !inventory.pdf_links.is_empty() || !inventory.agenda_links.is_empty() {
            user.push_str(&format!(
                "\n\nDocument links discovered on these pages:\nPDFs: {}\nAgenda pages: {}",
                inventory.pdf_links.join(", "),
                inventory.agenda_links.join(", ")
            ));
        }

        let mut info = match self.reply::<MeetingInfo>(SYNTHESIZE_SYSTEM, &user).await {
            Ok(info) => info,
            Err(e) => {
                warn!(%location, error = %e, "Synthesis failed, returning degraded record");
                MeetingInfo {
                    summary: Some(
                        "Pages were scraped but could not be automatically analyzed".to_string(),
                    ),
                    ..Default::default()
                }
            }
        };

        info.apply_candidate(candidate);
        info.scraped_urls = successful.iter().map(|page| page.url.clone()).collect();
        info.total_pages_analyzed = successful.len();
        info.pdf_analysis = pdf_analysis.cloned();
        info
    }

    /// Answer from general knowledge when search produced nothing. The model
    /// cannot know the next meeting date without grounding, so that field is
    /// forced to null no matter what comes back.
    pub async fn fallback(&self, location: &Location) -> MeetingInfo {
        let user = format!("{}, {}", location.city, location.state);

        let mut info = match self.reply::<MeetingInfo>(FALLBACK_SYSTEM, &user).await {
            Ok(info) => info,
            Err(e) => {
                warn!(%location, error = %e, "Fallback generation failed, using static caveat");
                let caveat = format!(
                    "Unable to find current information for {location}. Please visit the city's \
                     official website or contact city hall directly."
                );
                MeetingInfo {
                    description: Some(caveat.clone()),
                    summary: Some(caveat),
                    ..Default::default()
                }
            }
        };

        info.next_meeting = None;
        if info.summary.is_none() {
            info.summary = info.description.clone();
        }
        info
    }

    async fn reply<T: serde::de::DeserializeOwned>(
        &self,
        system: &str,
        user: &str,
    ) -> anyhow::Result<T> {
        let text = self.model.complete(system, user).await?;
        Ok(parse_json_reply(&text)?)
    }
}
