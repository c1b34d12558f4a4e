//! `quill search`: one search request against the configured backend.
//!
//! Runs the same code path as the HTTP API, so `--format json` prints the
//! body `/api/search*` would return.

use crate::output::{
    CliError, OutputMode, plain_highlight, pretty_rule, render_mode, report,
};
use clap::Args;
use quill_core::config::QuillConfig;
use quill_core::model::{DEFAULT_PAGE_SIZE, SearchMode, SearchRequest, SearchResponse};
use quill_search::{ElasticGateway, run_search as run_search_request};
use serde::Serialize;
use std::io::Write;

#[derive(Args, Debug)]
#[command(
    about = "Search the corpus",
    long_about = "Search play lines with lexical, sparse-semantic, dense-semantic or hybrid (RRF) ranking.\n\n\
                  Hybrid mode fuses the top --depth lexical and dense hits with reciprocal rank fusion; \
                  when the semantic index is missing it falls back to lexical order.",
    after_help = "EXAMPLES:\n    # Hybrid search (default)\n    quill search \"to be or not to be\"\n\n\
                  # Lexical search restricted to two plays\n    quill search dagger --mode lexical --play Macbeth --play Hamlet\n\n\
                  # Second page, machine-readable\n    quill search love --from 20 --size 20 --format json"
)]
pub struct SearchArgs {
    /// Search text. Empty matches every line.
    #[arg(default_value = "")]
    pub query: String,

    /// Retrieval mode: lexical, sparse, dense or hybrid.
    #[arg(short, long, default_value = "hybrid")]
    pub mode: SearchMode,

    /// Restrict results to a play (repeatable).
    #[arg(short, long = "play", value_name = "NAME")]
    pub plays: Vec<String>,

    /// Offset of the first result.
    #[arg(long, default_value_t = 0)]
    pub from: usize,

    /// Number of results to return.
    #[arg(short = 'n', long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub size: usize,

    /// RRF rank constant `k` (hybrid only).
    #[arg(long, value_name = "K")]
    pub rank_constant: Option<f64>,

    /// Hits fused from each side (hybrid only).
    #[arg(long, value_name = "N")]
    pub depth: Option<usize>,
}

impl SearchArgs {
    fn to_request(&self) -> SearchRequest {
        SearchRequest {
            query: self.query.clone(),
            selected_plays: self.plays.clone(),
            from: i64::try_from(self.from).unwrap_or(i64::MAX),
            size: i64::try_from(self.size).unwrap_or(i64::MAX),
        }
    }
}

/// JSON envelope for search output.
#[derive(Debug, Serialize)]
pub struct SearchOutput {
    pub query: String,
    pub mode: SearchMode,
    #[serde(flatten)]
    pub response: SearchResponse,
}

/// Execute `quill search <query>`.
///
/// # Errors
///
/// Returns an error if the backend is unreachable, rejects the request, or
/// the page/fusion parameters are out of range.
pub fn run_search(args: &SearchArgs, config: &QuillConfig, output: OutputMode) -> anyhow::Result<()> {
    let gateway = ElasticGateway::new(&config.backend, config.query.clone());

    let mut settings = config.fusion.clone();
    if let Some(k) = args.rank_constant {
        settings.rank_constant = k;
    }
    if let Some(depth) = args.depth {
        settings.candidate_depth = depth;
    }

    let response = match run_search_request(&gateway, args.mode, &args.to_request(), &settings) {
        Ok(response) => response,
        Err(err) => return Err(report(output, &CliError::from(&err))),
    };

    let search_output = SearchOutput {
        query: args.query.clone(),
        mode: args.mode,
        response,
    };

    render_mode(
        output,
        &search_output,
        |out, w| render_search_text(out, w),
        |out, w| render_search_human(out, w),
    )
}

fn render_search_human(out: &SearchOutput, w: &mut dyn Write) -> std::io::Result<()> {
    let response = &out.response;
    if response.hits.is_empty() {
        writeln!(w, "No results for '{}' ({})", out.query, out.mode)?;
        return Ok(());
    }

    writeln!(
        w,
        "{} result(s) for '{}' ({}), showing {}:",
        response.total,
        out.query,
        out.mode,
        response.hits.len()
    )?;
    pretty_rule(w)?;

    for hit in &response.hits {
        let fragment = hit
            .highlight
            .first()
            .map_or_else(|| hit.text_entry.clone(), |f| plain_highlight(f));
        writeln!(w, "[{}] {} / {}", hit.line_id, hit.play_name, hit.speaker)?;
        writeln!(w, "    {fragment}")?;
        if let Some(score) = hit.score {
            writeln!(
                w,
                "    rrf={score:.5} lexical={} semantic={}",
                rank_label(hit.lexical_rank),
                rank_label(hit.semantic_rank)
            )?;
        }
    }

    if !response.aggregations.plays.is_empty() {
        pretty_rule(w)?;
        let facets: Vec<String> = response
            .aggregations
            .plays
            .iter()
            .map(|facet| format!("{} ({})", facet.name, facet.count))
            .collect();
        writeln!(w, "plays: {}", facets.join(", "))?;
    }

    Ok(())
}

fn render_search_text(out: &SearchOutput, w: &mut dyn Write) -> std::io::Result<()> {
    for hit in &out.response.hits {
        writeln!(
            w,
            "{}\t{}\t{}\t{}",
            hit.line_id, hit.play_name, hit.speaker, hit.text_entry
        )?;
    }
    Ok(())
}

fn rank_label(rank: Option<usize>) -> String {
    rank.map_or_else(|| "-".to_string(), |r| r.to_string())
}
