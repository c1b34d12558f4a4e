use crate::output::{
    CliError, OutputMode, plain_highlight, pretty_kv, pretty_section, render_mode, report,
};
use clap::Args;
use quill_core::config::QuillConfig;
use quill_search::{DocumentView, ElasticGateway, lookup_document};
use std::io::Write;

/// Arguments for `quill show`.
#[derive(Args, Debug)]
#[command(
    about = "Show one line with its surrounding context",
    after_help = "EXAMPLES:\n    # Show a line and 50 lines either side\n    quill show 34229\n\n\
                  # Only the line itself\n    quill show 34229 --context 0"
)]
pub struct ShowArgs {
    /// Line id of the document.
    pub line_id: u64,

    /// Lines of context on each side (defaults to `[server] context_window`).
    #[arg(short, long, value_name = "N")]
    pub context: Option<u64>,
}

/// Execute `quill show <line_id>`.
///
/// # Errors
///
/// Returns an error if the document does not exist or the backend is
/// unreachable.
pub fn run_show(args: &ShowArgs, config: &QuillConfig, output: OutputMode) -> anyhow::Result<()> {
    let gateway = ElasticGateway::new(&config.backend, config.query.clone());
    let window = args.context.unwrap_or(config.server.context_window);

    let view = match lookup_document(&gateway, args.line_id, window) {
        Ok(view) => view,
        Err(err) => return Err(report(output, &CliError::from(&err))),
    };

    render_mode(
        output,
        &view,
        |view, w| render_show_text(view, w),
        |view, w| render_show_human(view, w),
    )
}

fn render_show_human(view: &DocumentView, w: &mut dyn Write) -> std::io::Result<()> {
    let doc = &view.document;
    pretty_section(w, &format!("{} [{}]", doc.play_name, doc.line_id))?;
    pretty_kv(w, "speaker", &doc.speaker)?;
    if !doc.line_number.is_empty() {
        pretty_kv(w, "line", &doc.line_number)?;
    }
    if let Some(speech) = doc.speech_number {
        pretty_kv(w, "speech", speech.to_string())?;
    }
    pretty_kv(w, "text", plain_highlight(&doc.text_entry))?;

    if !view.context.is_empty() {
        writeln!(w)?;
        pretty_section(w, "Context")?;
        for line in &view.context {
            let marker = if line.is_current { '>' } else { ' ' };
            writeln!(
                w,
                "{marker} {:>7}  {:<16} {}",
                line.document.line_id, line.document.speaker, line.document.text_entry
            )?;
        }
    }

    Ok(())
}

fn render_show_text(view: &DocumentView, w: &mut dyn Write) -> std::io::Result<()> {
    let doc = &view.document;
    writeln!(
        w,
        "{}\t{}\t{}\t{}",
        doc.line_id, doc.play_name, doc.speaker, doc.text_entry
    )?;
    for line in view.context.iter().filter(|line| !line.is_current) {
        writeln!(
            w,
            "{}\t{}\t{}\t{}",
            line.document.line_id,
            line.document.play_name,
            line.document.speaker,
            line.document.text_entry
        )?;
    }
    Ok(())
}
