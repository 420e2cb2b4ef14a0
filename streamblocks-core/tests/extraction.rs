//! End-to-end extraction scenarios over the public processor API.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};

use streamblocks_core::{
    BlockErrorCode, DelimiterPreamble, MarkdownFrontmatter, Registry, StreamEvent,
    StreamEventPayload, StreamProcessor, TypeBinding,
};
use streamblocks_source::SourceChunk;

#[derive(Debug, Deserialize, JsonSchema)]
struct FilesMeta {
    id: String,
    #[allow(dead_code)]
    block_type: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct FilesContent {
    operations: Vec<FileOperation>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct FileOperation {
    path: String,
    action: String,
}

/// Decodes `path:ACTION` operation lines into the structured content shape.
fn decode_file_operations(raw: &Value) -> Result<Value, String> {
    let text = raw.as_str().ok_or("content must be a string")?;
    let mut operations = Vec::new();
    for line in text.lines().filter(|line| !line.trim().is_empty()) {
        let (path, action) = line
            .rsplit_once(':')
            .ok_or_else(|| format!("malformed operation line `{line}`"))?;
        let action = match action.trim() {
            "C" => "create",
            "U" => "update",
            "D" => "delete",
            "R" => "rename",
            other => return Err(format!("unknown action `{other}`")),
        };
        operations.push(json!({"path": path, "action": action}));
    }
    Ok(json!({"operations": operations}))
}

fn files_registry() -> Arc<Registry> {
    let mut registry = Registry::new(Arc::new(DelimiterPreamble::new()));
    registry
        .register(
            "files_operations",
            TypeBinding::of::<FilesMeta, FilesContent>()
                .unwrap()
                .with_content_decoder(decode_file_operations),
        )
        .unwrap();
    Arc::new(registry)
}

fn processor(registry: Arc<Registry>) -> StreamProcessor {
    StreamProcessor::new(registry).emit_original_events(false)
}

fn run_chunks(mut processor: StreamProcessor, chunks: &[&str]) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    for chunk in chunks {
        events.extend(processor.feed(SourceChunk::text(*chunk)));
    }
    events.extend(processor.finalize());
    events
}

/// Payloads with the per-run fields (stream id, timing) blanked, for
/// sequence comparison across runs.
fn normalized(events: &[StreamEvent]) -> Vec<StreamEventPayload> {
    events
        .iter()
        .map(|event| {
            let mut payload = event.payload.clone();
            match &mut payload {
                StreamEventPayload::StreamStarted { stream_id }
                | StreamEventPayload::StreamError { stream_id, .. } => stream_id.clear(),
                StreamEventPayload::StreamFinished {
                    stream_id,
                    duration_ms,
                    ..
                } => {
                    stream_id.clear();
                    *duration_ms = 0;
                }
                _ => {}
            }
            payload
        })
        .collect()
}

fn block_ends(events: &[StreamEvent]) -> Vec<&streamblocks_core::ExtractedBlock> {
    events
        .iter()
        .filter_map(|event| match &event.payload {
            StreamEventPayload::BlockEnd { block } => Some(block),
            _ => None,
        })
        .collect()
}

#[test]
fn preamble_happy_path() {
    let events = run_chunks(
        processor(files_registry()),
        &["!!f01:files_operations\nsrc/main.py:C\n!!end\n"],
    );

    match &events[0].payload {
        StreamEventPayload::StreamStarted { stream_id } => {
            assert!(stream_id.starts_with("stream-"));
        }
        other => panic!("expected StreamStarted, got {other:?}"),
    }

    match &events[1].payload {
        StreamEventPayload::BlockStart {
            block_id,
            syntax_name,
            start_line,
            inline_metadata,
            block_type,
        } => {
            assert!(!block_id.is_empty());
            assert_eq!(syntax_name, "delimiter_preamble");
            assert_eq!(*start_line, 1);
            let inline = inline_metadata.as_ref().unwrap();
            assert_eq!(inline.get("id").map(String::as_str), Some("f01"));
            assert_eq!(
                inline.get("block_type").map(String::as_str),
                Some("files_operations")
            );
            assert_eq!(block_type.as_deref(), Some("files_operations"));
        }
        other => panic!("expected BlockStart, got {other:?}"),
    }

    match &events[2].payload {
        StreamEventPayload::BlockContentDelta {
            delta,
            current_line,
            ..
        } => {
            assert_eq!(delta, "src/main.py:C");
            assert_eq!(*current_line, 2);
        }
        other => panic!("expected BlockContentDelta, got {other:?}"),
    }

    match &events[3].payload {
        StreamEventPayload::BlockEnd { block } => {
            assert_eq!(block.block_type, "files_operations");
            assert_eq!(block.start_line, 1);
            assert_eq!(block.end_line, 3);
            assert_eq!(block.metadata["id"], "f01");
            assert_eq!(
                block.content["operations"],
                json!([{"path": "src/main.py", "action": "create"}])
            );
            assert_eq!(block.raw_text, "!!f01:files_operations\nsrc/main.py:C\n!!end");
            assert_eq!(block.hash_id.len(), 8);

            let meta: FilesMeta = block.metadata_as().unwrap();
            assert_eq!(meta.id, "f01");
            let content: FilesContent = block.content_as().unwrap();
            assert_eq!(content.operations[0].path, "src/main.py");
            assert_eq!(content.operations[0].action, "create");
        }
        other => panic!("expected BlockEnd, got {other:?}"),
    }

    match &events.last().unwrap().payload {
        StreamEventPayload::StreamFinished {
            blocks_extracted,
            blocks_rejected,
            total_events,
            ..
        } => {
            assert_eq!(*blocks_extracted, 1);
            assert_eq!(*blocks_rejected, 0);
            assert_eq!(*total_events, events.len() as u64);
        }
        other => panic!("expected StreamFinished, got {other:?}"),
    }
}

#[test]
fn chunked_delivery_is_byte_identical() {
    let whole = run_chunks(
        processor(files_registry()),
        &["!!f01:files_operations\nsrc/main.py:C\n!!end\n"],
    );
    let chunked = run_chunks(
        processor(files_registry()),
        &["!!f0", "1:files_", "operations\nsrc/mai", "n.py:C\n!!end\n"],
    );
    assert_eq!(normalized(&whole), normalized(&chunked));
}

#[test]
fn unclosed_block_is_rejected_on_finalize() {
    let events = run_chunks(
        processor(files_registry()),
        &["!!f01:files_operations\nsrc/main.py:C\n"],
    );

    let start_id = events
        .iter()
        .find_map(|event| match &event.payload {
            StreamEventPayload::BlockStart { block_id, .. } => Some(block_id.clone()),
            _ => None,
        })
        .expect("a block start");

    let error = events
        .iter()
        .find_map(|event| match &event.payload {
            StreamEventPayload::BlockError {
                block_id,
                error_code,
                raw_text,
                ..
            } => Some((block_id.clone(), *error_code, raw_text.clone())),
            _ => None,
        })
        .expect("a block error");
    assert_eq!(error.0.as_deref(), Some(start_id.as_str()));
    assert_eq!(error.1, BlockErrorCode::UnclosedBlock);
    assert_eq!(
        error.2.as_deref(),
        Some("!!f01:files_operations\nsrc/main.py:C")
    );

    match &events.last().unwrap().payload {
        StreamEventPayload::StreamFinished {
            blocks_extracted,
            blocks_rejected,
            ..
        } => {
            assert_eq!(*blocks_extracted, 0);
            assert_eq!(*blocks_rejected, 1);
        }
        other => panic!("expected StreamFinished, got {other:?}"),
    }
}

#[test]
fn size_exceeded_block_never_ends() {
    let long_line = "x".repeat(100);
    let input = format!("!!f01:files_operations\n{long_line}\n!!end\n");
    let events = run_chunks(
        StreamProcessor::new(files_registry())
            .emit_original_events(false)
            .max_block_size(50),
        &[&input],
    );

    assert!(events
        .iter()
        .any(|event| matches!(&event.payload, StreamEventPayload::BlockStart { .. })));
    let code = events
        .iter()
        .find_map(|event| match &event.payload {
            StreamEventPayload::BlockError { error_code, .. } => Some(*error_code),
            _ => None,
        })
        .expect("a block error");
    assert_eq!(code, BlockErrorCode::SizeExceeded);
    assert!(block_ends(&events).is_empty());
}

#[test]
fn unknown_type_without_default_is_rejected() {
    let events = run_chunks(
        processor(files_registry()),
        &["!!f01:no_such_type\nhello\n!!end\n"],
    );

    match &events[1].payload {
        StreamEventPayload::BlockStart { block_type, .. } => {
            assert_eq!(block_type.as_deref(), Some("no_such_type"));
        }
        other => panic!("expected BlockStart, got {other:?}"),
    }
    assert!(matches!(
        &events[2].payload,
        StreamEventPayload::BlockContentDelta { .. }
    ));
    let code = events
        .iter()
        .find_map(|event| match &event.payload {
            StreamEventPayload::BlockError { error_code, .. } => Some(*error_code),
            _ => None,
        })
        .expect("a block error");
    assert_eq!(code, BlockErrorCode::UnknownType);
    assert!(block_ends(&events).is_empty());
}

#[test]
fn markdown_frontmatter_with_yaml() {
    let mut registry = Registry::new(Arc::new(MarkdownFrontmatter::new()));
    registry
        .register(
            "config",
            TypeBinding::new(
                json!({
                    "type": "object",
                    "properties": {
                        "id": {"type": "string"},
                        "block_type": {"type": "string"}
                    },
                    "required": ["id", "block_type"]
                }),
                json!({"type": "string"}),
            )
            .unwrap(),
        )
        .unwrap();

    let input = "```json\n---\nid: cfg01\nblock_type: config\n---\n{\"k\": 1}\n```\n";
    let events = run_chunks(processor(Arc::new(registry)), &[input]);

    match &events[1].payload {
        StreamEventPayload::BlockStart {
            syntax_name,
            inline_metadata,
            block_type,
            ..
        } => {
            assert_eq!(syntax_name, "markdown_frontmatter");
            let inline = inline_metadata.as_ref().unwrap();
            assert_eq!(inline.get("info").map(String::as_str), Some("json"));
            // The fence does not reveal the block type; the frontmatter does.
            assert_eq!(*block_type, None);
        }
        other => panic!("expected BlockStart, got {other:?}"),
    }

    // The opening `---` ends the header; it is a header delta.
    match &events[2].payload {
        StreamEventPayload::BlockHeaderDelta { delta, .. } => assert_eq!(delta, "---"),
        other => panic!("expected BlockHeaderDelta, got {other:?}"),
    }

    let metadata_deltas: Vec<(&str, bool)> = events
        .iter()
        .filter_map(|event| match &event.payload {
            StreamEventPayload::BlockMetadataDelta {
                delta, is_boundary, ..
            } => Some((delta.as_str(), *is_boundary)),
            _ => None,
        })
        .collect();
    assert_eq!(
        metadata_deltas,
        vec![
            ("id: cfg01", false),
            ("block_type: config", false),
            ("---", true),
        ]
    );

    let content_deltas: Vec<&str> = events
        .iter()
        .filter_map(|event| match &event.payload {
            StreamEventPayload::BlockContentDelta { delta, .. } => Some(delta.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(content_deltas, vec!["{\"k\": 1}"]);

    let blocks = block_ends(&events);
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].metadata["id"], "cfg01");
    assert_eq!(blocks[0].metadata["block_type"], "config");
    assert_eq!(blocks[0].content, json!("{\"k\": 1}"));
    assert_eq!(blocks[0].block_type, "config");
    assert_eq!(blocks[0].start_line, 1);
    assert_eq!(blocks[0].end_line, 7);

    assert!(matches!(
        &events.last().unwrap().payload,
        StreamEventPayload::StreamFinished { .. }
    ));
}

/// P1: free-text lines and block raw texts, in event order, reproduce the
/// input byte stream.
#[test]
fn byte_stream_reconstruction() {
    let input = "prologue\n!!f01:files_operations\nsrc/main.py:C\n!!end\nepilogue\n!!f02:files_operations\ndangling\n";
    let events = run_chunks(processor(files_registry()), &[input]);

    let mut pieces: Vec<String> = Vec::new();
    for event in &events {
        match &event.payload {
            StreamEventPayload::TextContent { content, .. } => pieces.push(content.clone()),
            StreamEventPayload::BlockEnd { block } => pieces.push(block.raw_text.clone()),
            StreamEventPayload::BlockError {
                raw_text: Some(raw_text),
                ..
            } => pieces.push(raw_text.clone()),
            _ => {}
        }
    }
    assert_eq!(pieces.join("\n"), input);
}

/// P2: the line numbers carried by events are contiguous from 1.
#[test]
fn line_numbers_are_contiguous() {
    let input = "a\n!!f01:files_operations\nsrc/x.py:C\n!!end\nb\n";
    let events = run_chunks(processor(files_registry()), &[input]);

    let mut seen: Vec<u64> = Vec::new();
    for event in &events {
        match &event.payload {
            StreamEventPayload::TextContent { line_number, .. } => seen.push(*line_number),
            StreamEventPayload::BlockStart { start_line, .. } => seen.push(*start_line),
            StreamEventPayload::BlockHeaderDelta { current_line, .. }
            | StreamEventPayload::BlockMetadataDelta { current_line, .. }
            | StreamEventPayload::BlockContentDelta { current_line, .. } => {
                seen.push(*current_line)
            }
            StreamEventPayload::BlockEnd { block } => seen.push(block.end_line),
            _ => {}
        }
    }
    let max = *seen.iter().max().unwrap();
    for expected in 1..=max {
        assert!(seen.contains(&expected), "line {expected} missing");
    }
    // Non-decreasing event order.
    assert!(seen.windows(2).all(|pair| pair[0] <= pair[1]));
}

/// P3: any decomposition of the byte stream into chunks yields the same
/// event sequence (chunk-level events are disabled here).
#[test]
fn determinism_across_all_two_chunk_splits() {
    let input = "free\n!!f01:files_operations\nsrc/émoji.py:C\n!!end\ntail";
    let whole = normalized(&run_chunks(processor(files_registry()), &[input]));

    for split in (0..=input.len()).filter(|index| input.is_char_boundary(*index)) {
        let events = run_chunks(
            processor(files_registry()),
            &[&input[..split], &input[split..]],
        );
        assert_eq!(normalized(&events), whole, "split at byte {split}");
    }
}

/// P4: every opening produces exactly one end-or-error, and nothing after.
#[test]
fn every_opening_resolves_exactly_once() {
    let input = "!!a:files_operations\nx.py:C\n!!end\n!!b:unknown\ny\n!!end\n!!c:files_operations\nunclosed\n";
    let events = run_chunks(processor(files_registry()), &[input]);

    let starts: Vec<String> = events
        .iter()
        .filter_map(|event| match &event.payload {
            StreamEventPayload::BlockStart { block_id, .. } => Some(block_id.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(starts.len(), 3);

    for block_id in &starts {
        let resolutions: Vec<usize> = events
            .iter()
            .enumerate()
            .filter_map(|(index, event)| match &event.payload {
                StreamEventPayload::BlockEnd { block } if &block.block_id == block_id => {
                    Some(index)
                }
                StreamEventPayload::BlockError {
                    block_id: Some(id), ..
                } if id == block_id => Some(index),
                _ => None,
            })
            .collect();
        assert_eq!(resolutions.len(), 1, "block {block_id}");

        let last_tagged = events
            .iter()
            .rposition(|event| match &event.payload {
                StreamEventPayload::BlockStart { block_id: id, .. } => id == block_id,
                StreamEventPayload::BlockHeaderDelta { block_id: id, .. }
                | StreamEventPayload::BlockMetadataDelta { block_id: id, .. }
                | StreamEventPayload::BlockContentDelta { block_id: id, .. } => id == block_id,
                StreamEventPayload::BlockEnd { block } => &block.block_id == block_id,
                StreamEventPayload::BlockError {
                    block_id: Some(id), ..
                } => id == block_id,
                _ => false,
            })
            .unwrap();
        assert_eq!(last_tagged, resolutions[0], "events after resolution of {block_id}");
    }
}

/// P5: the last delta's accumulated size plus the closing line accounts for
/// the emitted raw text exactly.
#[test]
fn accumulated_size_matches_raw_text() {
    let events = run_chunks(
        processor(files_registry()),
        &["!!f01:files_operations\nsrc/main.py:C\n!!end\n"],
    );

    let last_delta_size = events
        .iter()
        .filter_map(|event| match &event.payload {
            StreamEventPayload::BlockContentDelta {
                accumulated_size, ..
            } => Some(*accumulated_size),
            _ => None,
        })
        .last()
        .unwrap();
    let block = block_ends(&events)[0];
    // The closing line adds one separator plus its own bytes.
    assert_eq!(
        block.raw_text.len() as u64,
        last_delta_size + 1 + "!!end".len() as u64
    );
}

/// P6: block starts equal extracted plus rejected in the final summary.
#[test]
fn stream_summary_accounts_for_every_opening() {
    let input = "!!a:files_operations\nx.py:C\n!!end\n!!b:unknown\ny\n!!end\n!!c:files_operations\nunclosed\n";
    let events = run_chunks(processor(files_registry()), &[input]);

    let starts = events
        .iter()
        .filter(|event| matches!(&event.payload, StreamEventPayload::BlockStart { .. }))
        .count() as u64;
    match &events.last().unwrap().payload {
        StreamEventPayload::StreamFinished {
            blocks_extracted,
            blocks_rejected,
            ..
        } => {
            assert_eq!(starts, blocks_extracted + blocks_rejected);
            assert_eq!(*blocks_extracted, 1);
            assert_eq!(*blocks_rejected, 2);
        }
        other => panic!("expected StreamFinished, got {other:?}"),
    }
}

/// Round-trip: re-processing an extracted block's raw text yields a block
/// with structurally equal metadata and content.
#[test]
fn raw_text_round_trips() {
    let events = run_chunks(
        processor(files_registry()),
        &["!!f01:files_operations\nsrc/main.py:C\nsrc/old.py:D\n!!end\n"],
    );
    let original = block_ends(&events)[0].clone();

    let replayed_events = run_chunks(
        processor(files_registry()),
        &[&format!("{}\n", original.raw_text)],
    );
    let replayed = block_ends(&replayed_events);
    assert_eq!(replayed.len(), 1);
    assert_eq!(replayed[0].metadata, original.metadata);
    assert_eq!(replayed[0].content, original.content);
    assert_eq!(replayed[0].raw_text, original.raw_text);
    assert_eq!(replayed[0].hash_id, original.hash_id);
}

/// Two blocks in one stream, with free text interleaved.
#[test]
fn multiple_blocks_in_one_stream() {
    let input = "intro\n!!a:files_operations\none.py:C\n!!end\nmiddle\n!!b:files_operations\ntwo.py:U\n!!end\noutro\n";
    let events = run_chunks(processor(files_registry()), &[input]);

    let blocks = block_ends(&events);
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].content["operations"][0]["action"], "create");
    assert_eq!(blocks[1].content["operations"][0]["action"], "update");
    assert_ne!(blocks[0].block_id, blocks[1].block_id);
    assert_ne!(blocks[0].hash_id, blocks[1].hash_id);

    let free_lines: Vec<&str> = events
        .iter()
        .filter_map(|event| match &event.payload {
            StreamEventPayload::TextContent { content, .. } => Some(content.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(free_lines, vec!["intro", "middle", "outro", ""]);
}

/// A malformed operation line fails content decoding, not the stream.
#[test]
fn content_decoder_failure_is_parse_failed() {
    let input = "!!f01:files_operations\nnot-an-operation\n!!end\nafter\n";
    let events = run_chunks(processor(files_registry()), &[input]);

    let (code, reason) = events
        .iter()
        .find_map(|event| match &event.payload {
            StreamEventPayload::BlockError {
                error_code, reason, ..
            } => Some((*error_code, reason.clone())),
            _ => None,
        })
        .expect("a block error");
    assert_eq!(code, BlockErrorCode::ParseFailed);
    assert!(reason.contains("not-an-operation"));

    // Processing continued past the rejected block.
    assert!(events.iter().any(|event| matches!(
        &event.payload,
        StreamEventPayload::TextContent { content, .. } if content == "after"
    )));
}
