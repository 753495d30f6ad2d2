//! Speaker-aware, size-bounded segmentation of raw dialogue.
//!
//! Lines starting with `Human:` or `Assistant:` switch the active speaker and
//! close the current chunk. Within a speaker's text, sentences are split with
//! an aggressiveness derived from the level's `length_multiplier`, then packed
//! into chunks that stay below `chunk_size`.
//!
//! The chunker is pure and total: any input produces a (possibly empty) list.

use scramble_core::{ChunkRecord, CompressionLevel, LevelParams, Speaker, SplitAggressiveness};

/// Exchanges at or below this many non-blank lines may skip segmentation.
const SHORT_TEXT_MAX_LINES: usize = 3;

/// Exchanges shorter than this many characters may skip segmentation.
const SHORT_TEXT_MAX_CHARS: usize = 300;

/// Sentence-final punctuation.
const TERMINATORS: [char; 3] = ['.', '!', '?'];

/// Words that continue a clause across a terminator at low aggressiveness.
const CONJUNCTIONS: [&str; 3] = ["and", "or", "but"];

/// Splits dialogue text into [`ChunkRecord`]s for one compression level.
#[derive(Clone, Copy, Debug)]
pub struct Chunker {
    params: LevelParams,
}

impl Chunker {
    /// Chunker using a level's canonical parameters.
    pub fn new(level: CompressionLevel) -> Self {
        Self::from_params(level.params())
    }

    /// Chunker with explicit parameters.
    pub fn from_params(params: LevelParams) -> Self {
        Self { params }
    }

    /// Parameters in use.
    pub fn params(&self) -> &LevelParams {
        &self.params
    }

    /// Split text into sentences.
    ///
    /// A terminator only splits once the trimmed accumulated text is at least
    /// `min_sentence_length` characters. Returned sentences are trimmed and
    /// never empty.
    pub fn split_into_sentences(&self, text: &str) -> Vec<String> {
        let aggressiveness = self.params.aggressiveness();
        let mut sentences = Vec::new();
        let mut current = String::new();

        for (i, ch) in text.char_indices() {
            current.push(ch);
            if !TERMINATORS.contains(&ch)
                || current.trim().chars().count() < self.params.min_sentence_length
            {
                continue;
            }

            let rest = &text[i + ch.len_utf8()..];
            if is_boundary(aggressiveness, rest) {
                push_trimmed(&mut sentences, &current);
                current.clear();
            }
        }
        push_trimmed(&mut sentences, &current);
        sentences
    }

    /// Segment raw dialogue into ordered chunks.
    pub fn chunk(&self, text: &str) -> Vec<ChunkRecord> {
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        if lines.is_empty() {
            return Vec::new();
        }

        if is_short_exchange(&lines, text) {
            return vec![short_chunk(&lines)];
        }

        let mut builder = ChunkBuilder::new(self.params.chunk_size);
        for line in lines {
            let body = match Speaker::strip_marker(line) {
                Some((speaker, rest)) => {
                    builder.switch_speaker(speaker);
                    rest
                }
                None => line,
            };
            if body.is_empty() {
                continue;
            }
            for sentence in self.split_into_sentences(body) {
                builder.push_segment(&sentence);
            }
        }
        builder.finish()
    }
}

fn push_trimmed(out: &mut Vec<String>, s: &str) {
    let trimmed = s.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

/// Whether a terminator followed by `rest` ends a sentence.
fn is_boundary(aggressiveness: SplitAggressiveness, rest: &str) -> bool {
    let followed_by_space = rest.chars().next().is_none_or(char::is_whitespace);
    match aggressiveness {
        SplitAggressiveness::High => true,
        SplitAggressiveness::Medium => followed_by_space,
        SplitAggressiveness::Low => followed_by_space && !starts_with_conjunction(rest),
    }
}

fn starts_with_conjunction(rest: &str) -> bool {
    let next_word = rest
        .trim_start()
        .split(|c: char| !c.is_alphanumeric())
        .next()
        .unwrap_or_default();
    CONJUNCTIONS.contains(&next_word)
}

fn is_short_exchange(lines: &[&str], text: &str) -> bool {
    lines.len() <= SHORT_TEXT_MAX_LINES
        && text.trim().chars().count() < SHORT_TEXT_MAX_CHARS
        && lines.iter().any(|l| Speaker::strip_marker(l).is_some())
}

/// Single chunk for a tiny exchange: marker-stripped lines joined by spaces,
/// attributed to the last speaker seen.
fn short_chunk(lines: &[&str]) -> ChunkRecord {
    let mut speaker = None;
    let mut parts = Vec::with_capacity(lines.len());
    for line in lines {
        match Speaker::strip_marker(line) {
            Some((s, rest)) => {
                speaker = Some(s);
                parts.push(rest);
            }
            None => parts.push(line),
        }
    }
    let content = parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    ChunkRecord::new(content, speaker)
}

/// Accumulates sentence segments into size-bounded chunks.
struct ChunkBuilder {
    chunk_size: usize,
    speaker: Option<Speaker>,
    current: ChunkRecord,
    chunks: Vec<ChunkRecord>,
}

impl ChunkBuilder {
    fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            speaker: None,
            current: ChunkRecord::empty(),
            chunks: Vec::new(),
        }
    }

    fn flush(&mut self) {
        if self.current.content.is_empty() {
            return;
        }
        let done = std::mem::replace(&mut self.current, ChunkRecord::new("", self.speaker));
        self.chunks.push(done);
    }

    fn switch_speaker(&mut self, speaker: Speaker) {
        self.flush();
        self.speaker = Some(speaker);
        self.current.speaker = Some(speaker);
    }

    /// Append a segment, first flushing if the chunk would reach `chunk_size`.
    fn push_segment(&mut self, segment: &str) {
        let segment = ChunkRecord::new(segment, self.speaker);
        if !self.current.content.is_empty()
            && self.current.size + 1 + segment.size >= self.chunk_size
        {
            self.flush();
        }
        self.current.absorb(&segment);
    }

    fn finish(mut self) -> Vec<ChunkRecord> {
        self.flush();
        self.chunks
    }
}
