//! Parse a model reply into question/answer records.
//!
//! The reply is split into blocks on blank lines. Each block is scanned for
//! markers (`Q:`/`Question:`, `A:`/`Answer:`, `Tag:`/`Tags:`, optionally in
//! `**bold**`), and the text between markers is paired up in order:
//!
//! - a question waits for the next answer, in the same block or a later one;
//! - text before the first answer marker of a block stands in for the
//!   question when the block has no question marker;
//! - a tag segment applies to the card completed just before it.
//!
//! Marker words also turn up inside card text ("Plan A: retreat", "Vitamin
//! A: retinol"). A marker only counts where a marker can start: the first
//! one in a block anywhere, an answer right after a question anywhere, and
//! everything else only at the start of a line or after a `;`. Once an
//! answer has started, a later `A:`/`Answer:` never splits it.
//!
//! Anything that doesn't pair up is dropped and counted, never emitted with
//! an empty field: a block without markers, a question with no answer, an
//! answer with no question, an empty field.

use crate::output::{CardRecord, ParsedReply};
use once_cell::sync::Lazy;
use regex::Regex;

static RE_BLOCK_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t]*\n").unwrap());

static RE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\*\*)?\b(Question|Answer|Tags|Tag|Q|A)[ \t]*:(?:\*\*)?").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkerKind {
    Question,
    Answer,
    Tag,
}

struct Marker {
    kind: MarkerKind,
    start: usize,
    end: usize,
}

/// True when only blanks separate `start` from the start of its line or
/// from a preceding `;` terminator.
fn is_anchored(block: &str, start: usize) -> bool {
    let before = block[..start].trim_end_matches([' ', '\t']);
    before.is_empty() || before.ends_with('\n') || before.ends_with(';')
}

fn find_markers(block: &str) -> Vec<Marker> {
    let mut markers: Vec<Marker> = Vec::new();

    for caps in RE_MARKER.captures_iter(block) {
        let Some(whole) = caps.get(0) else { continue };
        let kind = match &caps[1] {
            "Q" | "Question" => MarkerKind::Question,
            "A" | "Answer" => MarkerKind::Answer,
            _ => MarkerKind::Tag,
        };
        let anchored = is_anchored(block, whole.start());
        let accepted = match markers.last().map(|m| m.kind) {
            None => true,
            Some(MarkerKind::Question) => kind == MarkerKind::Answer || anchored,
            Some(MarkerKind::Answer) => kind != MarkerKind::Answer && anchored,
            Some(MarkerKind::Tag) => anchored,
        };
        if accepted {
            markers.push(Marker {
                kind,
                start: whole.start(),
                end: whole.end(),
            });
        }
    }

    markers
}

/// Trim whitespace and the `;` card terminator some replies carry.
fn clean_field(raw: &str) -> String {
    raw.trim().trim_end_matches(';').trim().to_string()
}

/// Parse `raw` into cards, in reply order.
pub fn parse_reply(raw: &str) -> ParsedReply {
    let normalised = raw.replace("\r\n", "\n");
    let mut reply = ParsedReply::default();
    let mut pending_question: Option<String> = None;
    // Index of the card a following tag segment may attach to.
    let mut taggable: Option<usize> = None;

    for block in RE_BLOCK_SEPARATOR.split(&normalised) {
        if block.trim().is_empty() {
            continue;
        }

        let markers = find_markers(block);
        let Some(first) = markers.first() else {
            reply.skipped_blocks += 1;
            continue;
        };

        // "What is 2+2?\nA: 4": the text before the answer is the question.
        if first.kind == MarkerKind::Answer {
            let preamble = clean_field(&block[..first.start]);
            if !preamble.is_empty() && pending_question.replace(preamble).is_some() {
                reply.skipped_blocks += 1;
            }
        }

        for (i, marker) in markers.iter().enumerate() {
            let end = markers.get(i + 1).map_or(block.len(), |next| next.start);
            let body = clean_field(&block[marker.end..end]);

            match marker.kind {
                MarkerKind::Question => {
                    taggable = None;
                    if pending_question.take().is_some() {
                        reply.skipped_blocks += 1;
                    }
                    if body.is_empty() {
                        reply.skipped_blocks += 1;
                    } else {
                        pending_question = Some(body);
                    }
                }
                MarkerKind::Answer => match pending_question.take() {
                    Some(question) if !body.is_empty() => {
                        reply.cards.push(CardRecord::new(question, body));
                        taggable = Some(reply.cards.len() - 1);
                    }
                    _ => reply.skipped_blocks += 1,
                },
                MarkerKind::Tag => match taggable.take() {
                    Some(idx) if !body.is_empty() => reply.cards[idx].tag = Some(body),
                    _ => reply.skipped_blocks += 1,
                },
            }
        }
    }

    if pending_question.is_some() {
        reply.skipped_blocks += 1;
    }

    reply
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_and_answer_blocks_pair_up() {
        let reply = parse_reply("Q: What is 2+2?\n\nA: 4");
        assert_eq!(reply.cards, vec![CardRecord::new("What is 2+2?", "4")]);
        assert_eq!(reply.cards[0].tag, None);
        assert_eq!(reply.skipped_blocks, 0);
    }

    #[test]
    fn garbage_yields_nothing() {
        let reply = parse_reply("garbage with no markers");
        assert!(reply.cards.is_empty());
        assert_eq!(reply.skipped_blocks, 1);
    }

    #[test]
    fn cards_keep_reply_order() {
        let reply = parse_reply("Q: first\n\nA: one\n\nQ: second\n\nA: two");
        assert_eq!(
            reply.cards,
            vec![
                CardRecord::new("first", "one"),
                CardRecord::new("second", "two"),
            ]
        );
    }

    #[test]
    fn question_and_answer_in_one_block() {
        let reply = parse_reply("Q: Capital of Spain?\nA: Madrid\n\nQ: Capital of Italy?\nA: Rome\n");
        assert_eq!(reply.cards.len(), 2);
        assert_eq!(reply.cards[1], CardRecord::new("Capital of Italy?", "Rome"));
    }

    #[test]
    fn semicolon_terminated_cards_in_one_block() {
        let reply =
            parse_reply("Q: What is the capital of France? A: Paris; Q: What is the capital of Germany? A: Berlin;");
        assert_eq!(
            reply.cards,
            vec![
                CardRecord::new("What is the capital of France?", "Paris"),
                CardRecord::new("What is the capital of Germany?", "Berlin"),
            ]
        );
    }

    #[test]
    fn preamble_and_trailing_chatter_are_skipped() {
        let reply = parse_reply(
            "Sure! Here are your cards.\n\nQ: What is H2O?\nA: Water\n\nHope this helps!",
        );
        assert_eq!(reply.cards, vec![CardRecord::new("What is H2O?", "Water")]);
        assert_eq!(reply.skipped_blocks, 2);
    }

    #[test]
    fn question_without_answer_is_dropped() {
        let reply = parse_reply("Q: orphan question\n\nQ: real?\nA: yes");
        assert_eq!(reply.cards, vec![CardRecord::new("real?", "yes")]);
        assert_eq!(reply.skipped_blocks, 1);
    }

    #[test]
    fn answer_without_question_is_dropped() {
        let reply = parse_reply("A: lonely answer");
        assert!(reply.cards.is_empty());
        assert_eq!(reply.skipped_blocks, 1);
    }

    #[test]
    fn trailing_question_is_dropped() {
        let reply = parse_reply("Q: a\nA: b\n\nQ: never answered");
        assert_eq!(reply.cards.len(), 1);
        assert_eq!(reply.skipped_blocks, 1);
    }

    #[test]
    fn empty_fields_are_never_emitted() {
        let reply = parse_reply("Q:   \nA: something\n\nQ: something\nA:   ");
        assert!(reply.cards.is_empty());
        assert!(reply.skipped_blocks >= 2);
    }

    #[test]
    fn long_form_and_bold_markers() {
        let reply = parse_reply("**Question:** What is DNA?\n**Answer:** Deoxyribonucleic acid");
        assert_eq!(
            reply.cards,
            vec![CardRecord::new("What is DNA?", "Deoxyribonucleic acid")]
        );
    }

    #[test]
    fn unmarked_question_before_answer() {
        let reply = parse_reply("What is the speed of light?\nA: About 300,000 km/s");
        assert_eq!(
            reply.cards,
            vec![CardRecord::new("What is the speed of light?", "About 300,000 km/s")]
        );
    }

    #[test]
    fn tag_segment_attaches_to_previous_card() {
        let reply = parse_reply("Q: What is ATP?\nA: Energy currency of the cell\nTags: biology");
        assert_eq!(reply.cards.len(), 1);
        assert_eq!(reply.cards[0].tag.as_deref(), Some("biology"));
    }

    #[test]
    fn multi_line_answer_is_kept_whole() {
        let reply = parse_reply("Q: Name two noble gases\nA: Helium\nNeon");
        assert_eq!(reply.cards[0].answer, "Helium\nNeon");
    }

    #[test]
    fn crlf_replies_split_on_blank_lines() {
        let reply = parse_reply("Q: one\r\nA: 1\r\n\r\nQ: two\r\nA: 2");
        assert_eq!(reply.cards.len(), 2);
        assert_eq!(reply.cards[1].answer, "2");
    }

    #[test]
    fn marker_letters_inside_words_are_ignored() {
        let reply = parse_reply("Q: What does FAQ: mean?\nA: Frequently asked questions");
        assert_eq!(reply.cards[0].question, "What does FAQ: mean?");
    }

    #[test]
    fn marker_word_inside_answer_stays_in_answer() {
        let reply = parse_reply("Q: What is the fallback plan?\nA: Plan A: retreat to the hills");
        assert_eq!(
            reply.cards,
            vec![CardRecord::new(
                "What is the fallback plan?",
                "Plan A: retreat to the hills"
            )]
        );
        assert_eq!(reply.skipped_blocks, 0);

        let reply = parse_reply("Q: Which vitamin is retinol?\nA: Vitamin A: retinol");
        assert_eq!(reply.cards.len(), 1);
        assert_eq!(reply.cards[0].answer, "Vitamin A: retinol");
        assert_eq!(reply.skipped_blocks, 0);
    }

    #[test]
    fn tag_word_mid_line_is_not_a_tag() {
        let reply = parse_reply("Q: What does <p> do?\nA: The <p> Tag: it wraps a paragraph");
        assert_eq!(reply.cards.len(), 1);
        assert_eq!(reply.cards[0].answer, "The <p> Tag: it wraps a paragraph");
        assert_eq!(reply.cards[0].tag, None);
        assert_eq!(reply.skipped_blocks, 0);
    }

    #[test]
    fn long_form_marker_words_inside_answer() {
        let reply = parse_reply(
            "Q: How is a card laid out?\nA: Each entry has a Question: and an Answer: part",
        );
        assert_eq!(
            reply.cards,
            vec![CardRecord::new(
                "How is a card laid out?",
                "Each entry has a Question: and an Answer: part"
            )]
        );
        assert_eq!(reply.skipped_blocks, 0);
    }

    #[test]
    fn line_start_markers_still_end_an_answer() {
        let reply = parse_reply("Q: one\nA: Plan A: first\nQ: two\nA: second\nTag: plans");
        assert_eq!(
            reply.cards,
            vec![
                CardRecord::new("one", "Plan A: first"),
                CardRecord::new("two", "second").with_tag("plans"),
            ]
        );
    }
}
