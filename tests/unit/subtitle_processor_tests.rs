/*!
 * Tests for timed-text canonicalization
 */

use anyhow::Result;
use ytsubflow::subtitle_processor::{Cue, RejectReason, SrtCanonicalizer, SubtitleDocument};
use crate::common;

/// Test timestamp parsing and formatting
#[test]
fn test_timestamp_parsing_withValidTimestamp_shouldParseAndFormat() {
    let ts = "01:23:45,678";
    let ms = Cue::parse_timestamp(ts).unwrap();
    assert_eq!(ms, 5025678);

    let formatted = Cue::format_timestamp(ms);
    assert_eq!(formatted, ts);
}

#[test]
fn test_timestamp_parsing_withOutOfRangeMinutes_shouldFail() {
    assert!(Cue::parse_timestamp("00:61:00,000").is_err());
    assert!(Cue::parse_timestamp("00:00:00").is_err());
}

#[test]
fn test_cue_new_withInvertedRange_shouldFail() {
    assert!(Cue::new(1, 2000, 1000, vec!["x".to_string()]).is_err());
    assert!(Cue::new(1, 1000, 1000, vec!["x".to_string()]).is_err());
    assert!(Cue::new(1, 1000, 2000, vec!["  ".to_string()]).is_err());
}

/// Serialized form is index, timing line, payload, blank line
#[test]
fn test_serialize_withTwoCues_shouldUseBlockFormat() -> Result<()> {
    let document = SubtitleDocument::new(vec![
        Cue::new(1, 1000, 2000, vec!["Hello".to_string()])?,
        Cue::new(2, 3000, 4500, vec!["Two".to_string(), "lines".to_string()])?,
    ]);

    assert_eq!(
        SrtCanonicalizer::serialize(&document),
        "1\n00:00:01,000 --> 00:00:02,000\nHello\n\n2\n00:00:03,000 --> 00:00:04,500\nTwo\nlines\n\n"
    );
    Ok(())
}

#[test]
fn test_canonicalize_withEmptyInput_shouldReturnEmptyDocument() {
    assert!(SrtCanonicalizer::canonicalize("").is_empty());
    assert!(SrtCanonicalizer::canonicalize("  \n\n \r\n").is_empty());
}

#[test]
fn test_canonicalize_withSparseIndices_shouldRenumberSequentially() {
    let raw = "5\n00:00:01,000 --> 00:00:02,000\nfirst\n\n9\n00:00:03,000 --> 00:00:04,000\nsecond\n";
    let document = SrtCanonicalizer::canonicalize(raw);

    let indices: Vec<usize> = document.cues.iter().map(|c| c.index).collect();
    assert_eq!(indices, vec![1, 2]);
}

#[test]
fn test_canonicalize_withCrlfAndMissingIndex_shouldAcceptBlocks() {
    let raw = "00:00:01,000 --> 00:00:02,000\r\nno index here\r\n\r\n2\r\n00:00:03,000-->00:00:04,000\r\ntight arrow\r\n";
    let document = SrtCanonicalizer::canonicalize(raw);

    assert_eq!(document.len(), 2);
    assert_eq!(document.cues[0].lines, vec!["no index here"]);
    assert_eq!(document.cues[1].start_ms, 3000);
    assert_eq!(document.cues[1].lines, vec!["tight arrow"]);
}

#[test]
fn test_canonicalize_withFillerLines_shouldStripThemAndDropEmptyBlocks() {
    let raw = "1\n00:00:01,000 --> 00:00:02,000\n[Music]\nsung line\n\n2\n00:00:03,000 --> 00:00:04,000\n[Applause]\n\n[music]\n";
    let document = SrtCanonicalizer::canonicalize(raw);

    assert_eq!(document.len(), 1);
    assert_eq!(document.cues[0].lines, vec!["sung line"]);
}

#[test]
fn test_canonicalize_withNumericPayloadAfterTiming_shouldKeepIt() {
    let raw = "1\n00:00:01,000 --> 00:00:02,000\n42\n";
    let document = SrtCanonicalizer::canonicalize(raw);

    assert_eq!(document.len(), 1);
    assert_eq!(document.cues[0].lines, vec!["42"]);
}

#[test]
fn test_canonicalize_withOutOfOrderCues_shouldKeepEncounterOrder() {
    let raw = "1\n00:00:05,000 --> 00:00:06,000\nlater\n\n2\n00:00:01,000 --> 00:00:02,000\nearlier\n";
    let document = SrtCanonicalizer::canonicalize(raw);

    assert_eq!(document.len(), 2);
    assert_eq!(document.cues[0].lines, vec!["later"]);
    assert_eq!(document.cues[1].index, 2);
    assert!(!document.is_chronological());
    assert_eq!(document.out_of_order_count(), 1);
}

#[test]
fn test_inspect_withTwoTimingLines_shouldRejectAsAmbiguous() {
    let raw = "1\n00:00:01,000 --> 00:00:02,000\n00:00:02,000 --> 00:00:03,000\ntext\n";
    let report = SrtCanonicalizer::inspect(raw);

    assert_eq!(report.accepted(), 0);
    let reasons: Vec<&RejectReason> = report.rejected().map(|(_, r)| r).collect();
    assert_eq!(reasons, vec![&RejectReason::AmbiguousTiming]);
}

#[test]
fn test_inspect_withProseBlock_shouldRejectAsMissingTiming() {
    let raw = "Here are your subtitles:\n\n1\n00:00:01,000 --> 00:00:02,000\nline\n";
    let report = SrtCanonicalizer::inspect(raw);

    assert_eq!(report.accepted(), 1);
    let (block, reason) = report.rejected().next().unwrap();
    assert_eq!(reason, &RejectReason::MissingTiming);
    assert!(block.contains("Here are your subtitles"));
}

/// Canonicalizing already canonical output changes nothing
#[test]
fn test_canonicalize_withCanonicalOutput_shouldBeIdempotent() {
    let raw = "```srt\n3\n00:00:01,000 --> 00:00:02,000\n[Music]\nline one\nmeaning one\n\n\n\nbroken\n\n7\n00:00:02,500 --> 00:00:04,000\nline two\n```";
    let once = SrtCanonicalizer::canonicalize(raw);
    let twice = SrtCanonicalizer::canonicalize(&SrtCanonicalizer::serialize(&once));

    assert_eq!(once.len(), 2);
    assert_eq!(once, twice);
}

#[test]
fn test_write_to_srt_withNestedPath_shouldCreateDirectories() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("out").join("song").join("track.te.srt");

    let document = SrtCanonicalizer::canonicalize(common::AUTO_CAPTIONS);
    document.write_to_srt(&path)?;

    let written = std::fs::read_to_string(&path)?;
    assert_eq!(SrtCanonicalizer::canonicalize(&written), document);
    assert_eq!(document.len(), 2);
    Ok(())
}

#[test]
fn test_cue_new_withHundredHourEnd_shouldFail() {
    assert!(Cue::new(1, 360_000_000, 360_002_000, vec!["late".to_string()]).is_err());
}

/// The last representable cue survives serialize then canonicalize
#[test]
fn test_round_trip_withCueNearHourCeiling_shouldKeepCue() -> Result<()> {
    let document = SubtitleDocument::new(vec![Cue::new(1, 359_990_000, 359_999_999, vec!["late".to_string()])?]);

    let reparsed = SrtCanonicalizer::canonicalize(&SrtCanonicalizer::serialize(&document));

    assert_eq!(reparsed, document);
    Ok(())
}
