use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use regex::Regex;
use once_cell::sync::Lazy;
use anyhow::{Result, Context, anyhow};
use log::{warn, debug};

// @module: Timed-text canonicalization (parse, repair, renumber, serialize)

// @const: Strict SRT timestamp, two-digit hours
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2}):(\d{2}):(\d{2}),(\d{3})$").expect("timestamp regex is valid")
});

// @const: Blank-line block separator
static BLOCK_SEPARATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n[ \t]*\n").expect("separator regex is valid")
});

// @const: Whole-line bracketed filler such as [music] or [Applause]
static FILLER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*\[[^\]]*\]\s*$").expect("filler regex is valid")
});

const TIMING_SEPARATOR: &str = "-->";

// @const: First instant `HH:MM:SS,mmm` can no longer express
pub const MAX_TIMESTAMP_MS: u64 = 100 * 3_600_000;

// @struct: Single timed-text unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    // @field: 1-based sequence number
    pub index: usize,

    // @field: Start time in ms
    pub start_ms: u64,

    // @field: End time in ms
    pub end_ms: u64,

    // @field: Payload lines in display order
    pub lines: Vec<String>,
}

impl Cue {
    /// Creates a cue, enforcing `start < end` below 100 hours and a non-empty payload.
    pub fn new(index: usize, start_ms: u64, end_ms: u64, lines: Vec<String>) -> Result<Self> {
        if end_ms <= start_ms {
            return Err(anyhow!(
                "Invalid time range: end time {} <= start time {}",
                end_ms, start_ms
            ));
        }
        if end_ms >= MAX_TIMESTAMP_MS {
            return Err(anyhow!(
                "End time {} does not fit the HH:MM:SS,mmm format",
                Self::format_timestamp(end_ms)
            ));
        }

        let lines: Vec<String> = lines
            .into_iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        if lines.is_empty() {
            return Err(anyhow!("Empty subtitle text for cue {}", index));
        }

        Ok(Cue { index, start_ms, end_ms, lines })
    }

    /// Payload joined with newlines
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Parse an `HH:MM:SS,mmm` timestamp to milliseconds
    pub fn parse_timestamp(timestamp: &str) -> Result<u64> {
        let caps = TIMESTAMP_REGEX
            .captures(timestamp.trim())
            .ok_or_else(|| anyhow!("Invalid timestamp format: {}", timestamp))?;
        let field = |i: usize| -> u64 {
            // Each group is 2-3 ASCII digits
            caps[i].parse().unwrap_or_default()
        };
        let (hours, minutes, seconds, millis) = (field(1), field(2), field(3), field(4));

        if minutes >= 60 || seconds >= 60 {
            return Err(anyhow!("Invalid time components in timestamp: {}", timestamp));
        }

        Ok(hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + millis)
    }

    /// Format a timestamp in milliseconds to SRT format (HH:MM:SS,mmm)
    pub fn format_timestamp(ms: u64) -> String {
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let seconds = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;

        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
    }

    pub fn timing_line(&self) -> String {
        format!("{} --> {}", Self::format_timestamp(self.start_ms), Self::format_timestamp(self.end_ms))
    }
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.index)?;
        writeln!(f, "{}", self.timing_line())?;
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        writeln!(f)
    }
}

/// Ordered cues; insertion order is playback order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtitleDocument {
    pub cues: Vec<Cue>,
}

impl SubtitleDocument {
    pub fn new(cues: Vec<Cue>) -> Self {
        Self { cues }
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    /// True when cue start times never go backwards
    pub fn is_chronological(&self) -> bool {
        self.cues.windows(2).all(|w| w[0].start_ms <= w[1].start_ms)
    }

    /// Number of cues whose start precedes the previous cue's start
    pub fn out_of_order_count(&self) -> usize {
        self.cues.windows(2).filter(|w| w[1].start_ms < w[0].start_ms).count()
    }

    /// Serialize back to the timed-text block format
    pub fn to_srt_string(&self) -> String {
        self.to_string()
    }

    /// Write the document to an SRT file, creating parent directories
    pub fn write_to_srt<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let mut file = File::create(path)
            .with_context(|| format!("Failed to create subtitle file: {}", path.display()))?;
        write!(file, "{}", self)
            .with_context(|| format!("Failed to write subtitle file: {}", path.display()))?;

        Ok(())
    }
}

impl fmt::Display for SubtitleDocument {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for cue in &self.cues {
            write!(f, "{}", cue)?;
        }
        Ok(())
    }
}

/// Why a candidate block was discarded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Only filler lines (or nothing) remained
    NoContent,
    /// No line carried the `-->` separator
    MissingTiming,
    /// More than one line carried the `-->` separator
    AmbiguousTiming,
    /// Timing line did not match `HH:MM:SS,mmm --> HH:MM:SS,mmm`
    MalformedTiming(String),
    /// Timing parsed but start is not before end
    InvalidRange { start_ms: u64, end_ms: u64 },
    /// Timing present but no text payload
    MissingText,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::NoContent => write!(f, "block has no content after filtering"),
            Self::MissingTiming => write!(f, "block has no timing line"),
            Self::AmbiguousTiming => write!(f, "block has more than one timing line"),
            Self::MalformedTiming(line) => write!(f, "malformed timing line: {}", line),
            Self::InvalidRange { start_ms, end_ms } => write!(
                f,
                "start {} is not before end {}",
                Cue::format_timestamp(*start_ms),
                Cue::format_timestamp(*end_ms)
            ),
            Self::MissingText => write!(f, "block has no text payload"),
        }
    }
}

/// Result of examining one candidate block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockOutcome {
    Accepted(Cue),
    Rejected { block: String, reason: RejectReason },
}

/// Per-block outcomes of one canonicalization pass
#[derive(Debug, Clone, Default)]
pub struct CanonicalReport {
    pub outcomes: Vec<BlockOutcome>,
}

impl CanonicalReport {
    pub fn accepted(&self) -> usize {
        self.outcomes.iter().filter(|o| matches!(o, BlockOutcome::Accepted(_))).count()
    }

    pub fn rejected(&self) -> impl Iterator<Item = (&str, &RejectReason)> {
        self.outcomes.iter().filter_map(|o| match o {
            BlockOutcome::Rejected { block, reason } => Some((block.as_str(), reason)),
            BlockOutcome::Accepted(_) => None,
        })
    }

    /// Accepted cues renumbered 1..N in encounter order
    pub fn into_document(self) -> SubtitleDocument {
        let cues = self
            .outcomes
            .into_iter()
            .filter_map(|o| match o {
                BlockOutcome::Accepted(cue) => Some(cue),
                BlockOutcome::Rejected { .. } => None,
            })
            .enumerate()
            .map(|(i, mut cue)| {
                cue.index = i + 1;
                cue
            })
            .collect();
        SubtitleDocument { cues }
    }
}

/// Stateless timed-text canonicalizer
pub struct SrtCanonicalizer;

impl SrtCanonicalizer {
    /// Parse raw timed-text into a strictly valid, sequentially indexed document.
    /// Malformed blocks are dropped, never reported as errors.
    pub fn canonicalize(raw_text: &str) -> SubtitleDocument {
        let report = Self::inspect(raw_text);

        for (block, reason) in report.rejected() {
            debug!("Dropping subtitle block ({}): {:?}", reason, block);
        }

        let document = report.into_document();
        let out_of_order = document.out_of_order_count();
        if out_of_order > 0 {
            warn!("{} cue(s) start before the preceding cue; keeping encounter order", out_of_order);
        }

        document
    }

    /// Examine every candidate block and record its outcome
    pub fn inspect(raw_text: &str) -> CanonicalReport {
        let normalized = raw_text.replace("\r\n", "\n").replace('\r', "\n");
        let trimmed = normalized.trim();

        if trimmed.is_empty() {
            return CanonicalReport::default();
        }

        let outcomes = BLOCK_SEPARATOR
            .split(trimmed)
            .filter(|block| !block.trim().is_empty())
            .map(Self::examine_block)
            .collect();

        CanonicalReport { outcomes }
    }

    /// Serialize a document to the block format
    pub fn serialize(document: &SubtitleDocument) -> String {
        document.to_srt_string()
    }

    fn examine_block(block: &str) -> BlockOutcome {
        let reject = |reason: RejectReason| BlockOutcome::Rejected {
            block: block.to_string(),
            reason,
        };

        let lines: Vec<&str> = block
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !Self::is_filler(line))
            .collect();

        if lines.is_empty() {
            return reject(RejectReason::NoContent);
        }

        let timing_positions: Vec<usize> = lines
            .iter()
            .enumerate()
            .filter(|(_, line)| line.contains(TIMING_SEPARATOR))
            .map(|(i, _)| i)
            .collect();

        let timing_at = match timing_positions.as_slice() {
            [] => return reject(RejectReason::MissingTiming),
            [single] => *single,
            _ => return reject(RejectReason::AmbiguousTiming),
        };

        // A bare number ahead of the timing line is the old index
        let payload: Vec<String> = lines
            .iter()
            .enumerate()
            .filter(|(i, line)| {
                *i != timing_at && !(*i < timing_at && line.chars().all(|c| c.is_ascii_digit()))
            })
            .map(|(_, line)| line.to_string())
            .collect();

        if payload.is_empty() {
            return reject(RejectReason::MissingText);
        }

        let timing_line = lines[timing_at];
        let (start_ms, end_ms) = match Self::parse_timing_line(timing_line) {
            Some(range) => range,
            None => return reject(RejectReason::MalformedTiming(timing_line.to_string())),
        };

        if end_ms <= start_ms {
            return reject(RejectReason::InvalidRange { start_ms, end_ms });
        }

        match Cue::new(0, start_ms, end_ms, payload) {
            Ok(cue) => BlockOutcome::Accepted(cue),
            Err(_) => reject(RejectReason::MissingText),
        }
    }

    /// Parse a strict timing line into (start, end) milliseconds
    pub fn parse_timing_line(line: &str) -> Option<(u64, u64)> {
        let (start, end) = line.split_once(TIMING_SEPARATOR)?;
        if end.contains(TIMING_SEPARATOR) {
            return None;
        }
        let start = Cue::parse_timestamp(start).ok()?;
        let end = Cue::parse_timestamp(end).ok()?;
        Some((start, end))
    }

    // Markdown fences show up when a model wraps its answer in ```srt
    fn is_filler(line: &str) -> bool {
        FILLER_REGEX.is_match(line) || line.starts_with("```")
    }
}
