/*!
 * Parse/serialize round trips over realistic subtitle files.
 *
 * Without translation, serializing a parsed document must reproduce the
 * input byte for byte, whatever its line endings or spacing.
 */

use subseg::subtitle::{Document, FormatHint, SubtitleFormat};

use crate::common::{SAMPLE_ASS, SAMPLE_SRT, init_logger};

fn assert_round_trip(content: &str) {
    let document = Document::parse_detect(content, &FormatHint::default())
        .unwrap_or_else(|e| panic!("failed to parse {:?}: {}", content, e));
    assert_eq!(document.serialize(), content);
}

#[test]
fn test_round_trip_withSampleFiles_shouldBeByteIdentical() {
    init_logger();
    assert_round_trip(SAMPLE_SRT);
    assert_round_trip(SAMPLE_ASS);
}

#[test]
fn test_round_trip_withCrlfSrt_shouldBeByteIdentical() {
    let crlf = SAMPLE_SRT.replace('\n', "\r\n");
    assert_round_trip(&crlf);
}

#[test]
fn test_round_trip_withIrregularSrtLayout_shouldBeByteIdentical() {
    let samples = [
        // BOM, leading blank lines, extra separators, dot milliseconds
        "\u{FEFF}\n\n1\n00:00:01.000 --> 00:00:02.000\nHi\n\n\n\n2\n00:00:03,000-->00:00:04,000\nThere\n",
        // Padded index, trailing whitespace on separators, no final newline
        " 7 \n00:00:01,000 --> 00:00:02,000 X:100 Y:200\nOne\n  \n8\n00:00:03,000 --> 00:00:04,000\nTwo",
        // Mixed line endings
        "1\r\n00:00:01,000 --> 00:00:02,000\r\nA\nB\r\n\r\n2\n00:00:03,000 --> 00:00:04,000\nC\n",
    ];
    for sample in samples {
        assert_round_trip(sample);
    }
}

#[test]
fn test_round_trip_withSsaAndOddEventLines_shouldBeByteIdentical() {
    let samples = [
        "[Script Info]\nScriptType: v4.00\n\n[V4 Styles]\nFormat: Name, Fontname\nStyle: Default,Arial\n\n[Events]\nFormat: Marked, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\nDialogue: Marked=0,0:00:01.00,0:00:02.00,*Default,NTP,0000,0000,0000,!Effect,Text, with, commas\n",
        "[Script Info]\n\n[Events]\nFormat: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\nDialogue:0,0:00:01.00,0:00:02.00,Default,,0,0,0,,No space after colon\n\n[Fonts]\nfontname: x.ttf\n",
        "[Script Info]\n[Events]\nFormat: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\nDialogue: 0,0:00:01.00,0:00:02.00,Default,,0,0,0,,\nDialogue: 0,0:00:02.00,0:00:03.00,Default,,0,0,0,,Last line without newline",
    ];
    for sample in samples {
        assert_round_trip(sample);
    }
}

#[test]
fn test_parse_withExplicitFormat_shouldMatchDetectedParse() {
    let detected = Document::parse_detect(SAMPLE_ASS, &FormatHint::default()).unwrap();
    let explicit = Document::parse(SAMPLE_ASS, SubtitleFormat::AssSsa).unwrap();
    assert_eq!(detected, explicit);
}
