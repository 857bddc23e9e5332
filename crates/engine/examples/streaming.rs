// Demo: comment on a span, then stream generated content into a draft
// block while watching engine notices. Run with:
//
//   RUST_LOG=debug cargo run -p anchorage-engine --example streaming

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use anchorage_common::types::{Block, SelectionSnapshot};
use anchorage_engine::config::EngineConfig;
use anchorage_engine::context::{EditorContext, EngineNotice};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = EngineConfig::load();
    let mut ctx = EditorContext::new(
        "demo-doc",
        vec![
            Block::paragraph("intro", "The quick brown fox jumps over the lazy dog"),
            Block::paragraph("draft", ""),
        ],
        &config,
    )?;
    let mut notices = ctx.subscribe();

    // A reviewer comments on "brown" (UTF-16 offsets 10..15).
    let selection = SelectionSnapshot::single("brown", "intro", 10, 15);
    let thread_id = ctx.comment_on_selection(
        &selection,
        "reviewer",
        vec![Block::paragraph("c1", "Is brown the right adjective here?")],
    )?;
    println!("thread {thread_id} anchored on {:?}", selection.marker);

    // A generation job streams frames into the draft block.
    let (session_id, sender) = ctx.start_generation("draft")?;
    println!("session {session_id} started, subscribed at {}", session_id.sse_path());
    tokio::spawn(async move {
        let frames = [
            r#"{"type":"content_update","content":"Foxes are famously "}"#,
            r#"{"type":"content_update","content":"quick, and this one "}"#,
            r#"{"type":"content_update","content":"is no exception."}"#,
            r#"{"type":"done"}"#,
        ];
        for frame in frames {
            if sender.send(frame.to_owned()).is_err() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
    });

    let state = ctx.pump().await?;
    println!("session ended: {}", state.as_str());
    println!("draft: {:?}", ctx.document().block_text("draft"));

    // The user edits the commented paragraph; the anchor follows.
    ctx.edit_block_text("intro", "Ah, the quick brown fox jumps over the lazy dog")?;
    for marker in ctx.markers() {
        println!("thread {} now at {:?}", marker.thread_id, marker.marker);
    }

    while let Ok(notice) = notices.try_recv() {
        match notice {
            EngineNotice::ResolutionsChanged { block_id, changed_threads } => {
                println!("resolutions changed on {block_id}: {changed_threads:?}");
            }
            EngineNotice::SessionChanged { session_id, state } => {
                println!("session {session_id} -> {}", state.as_str());
            }
        }
    }

    Ok(())
}
