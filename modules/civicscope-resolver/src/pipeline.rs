use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use ai_client::ChatModel;
use civicscope_common::{Location, LookupResponse, MeetingInfo, SiteCandidate};

use crate::documents::DocumentDiscoverer;
use crate::fetcher::{fetch_many, filter_agenda_urls, PageFetcher};
use crate::interpreter::ResultInterpreter;
use crate::search::{search_council_meetings, WebSearcher};

/// Extra agenda-looking hit URLs scraped alongside the candidate target.
const MAX_EXTRA_PAGES: usize = 2;

/// Concurrency window for batch page fetching.
const MAX_CONCURRENT_FETCHES: usize = 3;

/// Counters for one resolution run, logged at completion.
#[derive(Debug, Default)]
pub struct ResolveStats {
    pub search_hits: usize,
    pub pages_fetched: usize,
    pub pages_failed: usize,
    pub pdfs_found: usize,
    pub pdfs_assessed: usize,
    pub fallback: bool,
}

impl fmt::Display for ResolveStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} search hits, {} pages fetched, {} failed, {} PDFs found, {} assessed{}",
            self.search_hits,
            self.pages_fetched,
            self.pages_failed,
            self.pdfs_found,
            self.pdfs_assessed,
            if self.fallback { ", fallback" } else { "" },
        )
    }
}

/// The multi-stage resolution pipeline: search, select, scrape, mine
/// documents, synthesize, plus a fallback path when search yields nothing.
///
/// Contract: given a Location, always produce a LookupResponse. Collaborator
/// failures are absorbed at each stage boundary and turn into degraded
/// results for that stage, never into an error past this type.
pub struct ResolutionPipeline {
    searcher: Arc<dyn WebSearcher>,
    fetcher: Arc<dyn PageFetcher>,
    interpreter: ResultInterpreter,
    discoverer: DocumentDiscoverer,
}

impl ResolutionPipeline {
    pub fn new(
        searcher: Arc<dyn WebSearcher>,
        fetcher: Arc<dyn PageFetcher>,
        model: Arc<dyn ChatModel>,
    ) -> Self {
        Self {
            searcher,
            fetcher,
            interpreter: ResultInterpreter::new(model.clone()),
            discoverer: DocumentDiscoverer::new(model),
        }
    }

    pub async fn resolve(&self, location: &Location) -> LookupResponse {
        let mut stats = ResolveStats::default();

        // Stage 1: discover candidates.
        let hits = search_council_meetings(self.searcher.as_ref(), location).await;
        stats.search_hits = hits.len();

        if hits.is_empty() {
            return self.resolve_fallback(location, stats).await;
        }

        // Stage 2: select one candidate site.
        let candidate = self.interpreter.select_candidate(&hits, location).await;

        // Stage 3: empty-candidate guard, nothing to scrape.
        let Some(target) = candidate.target_url().map(str::to_string) else {
            info!(%location, "Candidate has no usable URL, skipping scrape");
            let mut info = MeetingInfo {
                summary: Some("Unable to find meeting information".to_string()),
                ..Default::default()
            };
            info.apply_candidate(&candidate);
            if info.description.is_none() {
                info.description =
                    Some("No suitable websites found in search results".to_string());
            }
            return self.respond(location, candidate, info, &stats);
        };

        // Stage 4: fetch the target plus a couple of agenda-looking hits.
        let mut urls = vec![target.clone()];
        let extra = filter_agenda_urls(&hits, MAX_EXTRA_PAGES, &urls);
        urls.extend(extra);

        let pages = fetch_many(self.fetcher.as_ref(), &urls, MAX_CONCURRENT_FETCHES).await;
        stats.pages_fetched = pages.iter().filter(|p| p.success).count();
        stats.pages_failed = pages.len() - stats.pages_fetched;

        if stats.pages_fetched == 0 {
            // Found a site but couldn't read it. Keep what search taught us.
            warn!(%location, target = target.as_str(), "All fetches failed, degrading to candidate fields");
            let mut info = MeetingInfo {
                summary: Some("Found website but couldn't access meeting details".to_string()),
                ..Default::default()
            };
            info.apply_candidate(&candidate);
            return self.respond(location, candidate, info, &stats);
        }

        // Stage 5: mine documents from everything fetched.
        let combined: String = pages
            .iter()
            .filter(|p| p.success)
            .map(|p| p.text().to_string())
            .collect::<Vec<_>>()
            .join("\n\n");
        let inventory = self.discoverer.discover(&combined, &target).await;
        stats.pdfs_found = inventory.pdf_links.len();

        let pdf_analysis = if inventory.pdf_links.is_empty() {
            None
        } else {
            let analysis = self.discoverer.assess_pdfs(&inventory.pdf_links).await;
            stats.pdfs_assessed = analysis.analyzed_pdfs.len();
            Some(analysis)
        };

        // Stage 6: synthesize the final record.
        let info = self
            .interpreter
            .synthesize(&pages, &candidate, &inventory, pdf_analysis.as_ref(), location)
            .await;

        self.respond(location, candidate, info, &stats)
    }

    /// Fallback stage: zero hits (or total search failure). Answers from
    /// general knowledge with an explicit caveat, tagged for the caller.
    async fn resolve_fallback(&self, location: &Location, mut stats: ResolveStats) -> LookupResponse {
        stats.fallback = true;
        warn!(%location, "No search hits, answering from general knowledge");

        let info = self.interpreter.fallback(location).await;
        let candidate = SiteCandidate {
            website: info.website.clone(),
            meetings_page: info.meetings_page.clone(),
            description: info.description.clone(),
            next_meeting: None,
            contact_info: info.contact_info.clone(),
        };

        info!(%location, %stats, "Resolution complete");
        LookupResponse {
            city: location.city.clone(),
            state: location.state.clone(),
            council_info: candidate,
            comprehensive_info: Some(info),
            search_results_count: 0,
            fallback: true,
        }
    }

    fn respond(
        &self,
        location: &Location,
        candidate: SiteCandidate,
        info: MeetingInfo,
        stats: &ResolveStats,
    ) -> LookupResponse {
        info!(%location, %stats, "Resolution complete");
        LookupResponse {
            city: location.city.clone(),
            state: location.state.clone(),
            council_info: candidate,
            comprehensive_info: Some(info),
            search_results_count: stats.search_hits,
            fallback: false,
        }
    }
}
