//! End-to-end pipeline scenarios over scripted collaborators.
//!
//! Search, fetching, and inference are all replaced with deterministic
//! doubles from `civicscope_resolver::testing`, so every scenario runs
//! offline and asserts the degrade-gracefully policy stage by stage.

use std::sync::Arc;

use civicscope_common::Location;
use civicscope_resolver::pipeline::ResolutionPipeline;
use civicscope_resolver::testing::{
    hit, FailingModel, FailingSearcher, RecordingFetcher, ScriptedModel, StaticSearcher,
};

// Marker substrings of each system prompt, used to route scripted replies.
const SELECT_MARKER: &str = "Prioritize official municipal websites";
const SYNTHESIZE_MARKER: &str = "multiple pages scraped from a city website";
const FALLBACK_MARKER: &str = "Based on your knowledge";
const DISCOVER_MARKER: &str = "meeting documents and agendas";
const ASSESS_MARKER: &str = "document URLs and filenames";
const PDF_SUMMARY_MARKER: &str = "analysis of multiple PDF documents";

fn springfield() -> Location {
    Location {
        city: "Springfield".to_string(),
        state: "IL".to_string(),
    }
}

const EMPTY_INVENTORY: &str = r#"{"pdfLinks": [], "agendaLinks": [], "summary": "none"}"#;

#[tokio::test]
async fn resolves_springfield_end_to_end() {
    let searcher = StaticSearcher::once(vec![
        hit(
            "City of Springfield, Illinois",
            "https://www.springfield.il.us",
            "Official website of the City of Springfield",
        ),
        hit(
            "Local news",
            "https://www.sj-r.com/news/local",
            "Springfield area news",
        ),
        hit(
            "Visit Springfield",
            "https://www.visitspringfieldillinois.com",
            "Tourism information",
        ),
    ]);

    // The candidate reply arrives fenced; the parser must not care.
    let model = ScriptedModel::new()
        .reply_when(
            SELECT_MARKER,
            "```json\n{\"website\": \"https://www.springfield.il.us\", \"meetingsPage\": null, \
             \"description\": \"Official city website\", \"nextMeeting\": null, \
             \"contactInfo\": null}\n```",
        )
        .reply_when(DISCOVER_MARKER, EMPTY_INVENTORY)
        .reply_when(
            SYNTHESIZE_MARKER,
            r#"{"meetingSchedule": "City Council meets the first Tuesday of each month at 7:00 PM",
                "location": "City Hall, 300 S 7th St",
                "summary": "Regular council meetings with published agendas"}"#,
        );

    let fetcher = Arc::new(RecordingFetcher::new().with_page(
        "https://www.springfield.il.us",
        "Welcome to Springfield. City Council meets the first Tuesday of each month at 7:00 PM \
         in City Hall, 300 S 7th St.",
    ));

    let pipeline =
        ResolutionPipeline::new(Arc::new(searcher), fetcher.clone(), Arc::new(model));
    let response = pipeline.resolve(&springfield()).await;

    assert!(!response.fallback);
    assert_eq!(response.search_results_count, 3);
    assert_eq!(
        response.council_info.website.as_deref(),
        Some("https://www.springfield.il.us")
    );

    let info = response.comprehensive_info.expect("synthesized record");
    assert!(info
        .meeting_schedule
        .as_deref()
        .unwrap()
        .contains("first Tuesday"));
    assert_eq!(info.scraped_urls, vec!["https://www.springfield.il.us"]);
    assert_eq!(info.total_pages_analyzed, 1);
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn zero_hits_tags_fallback_and_forces_null_next_meeting() {
    // Model misbehaves and invents a next meeting; the pipeline must null it.
    let model = ScriptedModel::new().reply_when(
        FALLBACK_MARKER,
        r#"{"website": "https://www.springfield.il.us",
            "description": "This information is from general knowledge and may not be current.",
            "nextMeeting": "June 3, 2026 at 7 PM",
            "summary": "Check the official website for verified schedules."}"#,
    );

    let pipeline = ResolutionPipeline::new(
        Arc::new(StaticSearcher::empty()),
        Arc::new(RecordingFetcher::new()),
        Arc::new(model),
    );
    let response = pipeline.resolve(&springfield()).await;

    assert!(response.fallback);
    assert_eq!(response.search_results_count, 0);

    let info = response.comprehensive_info.expect("fallback record");
    assert_eq!(info.next_meeting, None);
    assert!(info.description.is_some());
}

#[tokio::test]
async fn total_search_failure_degrades_to_static_caveat() {
    // Search is down and inference is unavailable too: the static caveat
    // text must still come back as a schema-valid fallback response.
    let pipeline = ResolutionPipeline::new(
        Arc::new(FailingSearcher),
        Arc::new(RecordingFetcher::new()),
        Arc::new(FailingModel),
    );
    let response = pipeline.resolve(&springfield()).await;

    assert!(response.fallback);
    assert_eq!(response.search_results_count, 0);

    let info = response.comprehensive_info.expect("fallback record");
    assert!(info
        .description
        .as_deref()
        .unwrap()
        .contains("Unable to find current information"));
    assert!(info.summary.is_some());
    assert_eq!(info.next_meeting, None);
}

#[tokio::test]
async fn empty_candidate_skips_fetch_entirely() {
    let searcher = StaticSearcher::once(vec![hit(
        "Unrelated result",
        "https://example.com/blog",
        "Nothing municipal here",
    )]);
    let model = ScriptedModel::new().reply_when(
        SELECT_MARKER,
        r#"{"website": null, "meetingsPage": null, "description": null,
            "nextMeeting": null, "contactInfo": null}"#,
    );
    let fetcher = Arc::new(RecordingFetcher::new());

    let pipeline =
        ResolutionPipeline::new(Arc::new(searcher), fetcher.clone(), Arc::new(model));
    let response = pipeline.resolve(&springfield()).await;

    assert_eq!(fetcher.calls(), 0);
    assert!(!response.fallback);

    let info = response.comprehensive_info.expect("degraded record");
    assert_eq!(
        info.summary.as_deref(),
        Some("Unable to find meeting information")
    );
    assert_eq!(
        info.description.as_deref(),
        Some("No suitable websites found in search results")
    );
}

#[tokio::test]
async fn fetch_failure_keeps_candidate_fields() {
    let searcher = StaticSearcher::once(vec![hit(
        "City of Springfield",
        "https://www.springfield.il.us",
        "Official website",
    )]);
    let model = ScriptedModel::new().reply_when(
        SELECT_MARKER,
        r#"{"website": "https://www.springfield.il.us", "meetingsPage": null,
            "description": "Official city website", "nextMeeting": null,
            "contactInfo": "clerk@springfield.il.us"}"#,
    );
    // No pages loaded: every fetch fails, as a timeout would.
    let fetcher = Arc::new(RecordingFetcher::new());

    let pipeline =
        ResolutionPipeline::new(Arc::new(searcher), fetcher.clone(), Arc::new(model));
    let response = pipeline.resolve(&springfield()).await;

    assert!(fetcher.calls() > 0);
    let info = response.comprehensive_info.expect("degraded record");
    assert_eq!(
        info.summary.as_deref(),
        Some("Found website but couldn't access meeting details")
    );
    assert_eq!(info.website.as_deref(), Some("https://www.springfield.il.us"));
    assert_eq!(info.contact_info.as_deref(), Some("clerk@springfield.il.us"));
    assert!(info.scraped_urls.is_empty());
    assert_eq!(info.total_pages_analyzed, 0);
}

#[tokio::test]
async fn sibling_fetch_failure_does_not_abort_the_batch() {
    // Three URLs end up in the fetch window: the candidate target plus two
    // agenda-looking hits. One of them times out; the other two survive.
    let searcher = StaticSearcher::once(vec![
        hit("City site", "https://a.gov", "Official"),
        hit("Agendas", "https://a.gov/agendas", "Agenda archive"),
        hit("Calendar", "https://a.gov/calendar", "Event calendar"),
    ]);
    let model = ScriptedModel::new()
        .reply_when(
            SELECT_MARKER,
            r#"{"website": "https://a.gov", "meetingsPage": "https://a.gov/council",
                "description": "Official", "nextMeeting": null, "contactInfo": null}"#,
        )
        .reply_when(DISCOVER_MARKER, EMPTY_INVENTORY)
        .reply_when(SYNTHESIZE_MARKER, r#"{"summary": "Meetings found"}"#);
    // https://a.gov/calendar is deliberately absent and will fail.
    let fetcher = Arc::new(
        RecordingFetcher::new()
            .with_page("https://a.gov/council", "Council meetings are held monthly.")
            .with_page("https://a.gov/agendas", "Agendas are posted here."),
    );

    let pipeline =
        ResolutionPipeline::new(Arc::new(searcher), fetcher.clone(), Arc::new(model));
    let response = pipeline.resolve(&springfield()).await;

    assert_eq!(fetcher.calls(), 3);
    let info = response.comprehensive_info.expect("synthesized record");
    assert_eq!(
        info.scraped_urls,
        vec!["https://a.gov/council", "https://a.gov/agendas"]
    );
    assert_eq!(info.total_pages_analyzed, 2);
}

#[tokio::test]
async fn pdf_assessment_caps_at_five_but_counts_all() {
    let searcher = StaticSearcher::once(vec![hit(
        "City site",
        "https://a.gov",
        "Official",
    )]);

    let inventory = r#"{"pdfLinks": [
        "https://a.gov/d1.pdf", "https://a.gov/d2.pdf", "https://a.gov/d3.pdf",
        "https://a.gov/d4.pdf", "https://a.gov/d5.pdf", "https://a.gov/d6.pdf",
        "https://a.gov/d7.pdf"
    ], "agendaLinks": []}"#;

    let model = ScriptedModel::new()
        .reply_when(
            SELECT_MARKER,
            r#"{"website": "https://a.gov", "meetingsPage": null,
                "description": "Official", "nextMeeting": null, "contactInfo": null}"#,
        )
        .reply_when(DISCOVER_MARKER, inventory)
        .reply_when(
            ASSESS_MARKER,
            r#"{"meetingDate": "2026-06-02", "meetingType": "council",
                "documentType": "agenda", "isUpcoming": true, "priority": "high"}"#,
        )
        .reply_when(PDF_SUMMARY_MARKER, "Five recent council agendas are available.")
        .reply_when(SYNTHESIZE_MARKER, r#"{"summary": "Meetings found"}"#);

    let fetcher = Arc::new(
        RecordingFetcher::new().with_page("https://a.gov", "Council meeting documents below."),
    );

    let pipeline =
        ResolutionPipeline::new(Arc::new(searcher), fetcher.clone(), Arc::new(model));
    let response = pipeline.resolve(&springfield()).await;

    let info = response.comprehensive_info.expect("synthesized record");
    let analysis = info.pdf_analysis.expect("pdf analysis");

    assert_eq!(analysis.analyzed_pdfs.len(), 5);
    assert_eq!(analysis.total_pdfs, 7);
    // Truncation is by discovery order, not assessed priority.
    let assessed: Vec<&str> = analysis
        .analyzed_pdfs
        .iter()
        .map(|a| a.url.as_str())
        .collect();
    assert_eq!(
        assessed,
        vec![
            "https://a.gov/d1.pdf",
            "https://a.gov/d2.pdf",
            "https://a.gov/d3.pdf",
            "https://a.gov/d4.pdf",
            "https://a.gov/d5.pdf"
        ]
    );
    assert_eq!(analysis.analyzed_pdfs[0].filename, "d1.pdf");
    assert_eq!(analysis.summary, "Five recent council agendas are available.");
}
