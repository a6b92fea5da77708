use tellsweep::{
    analyze, apply_suggestion, build_style_profile, generate_suggestions, rescore, segment,
    Band, Error, StyleProfile, Suggestion, SuggestionKind, SuggestionStatus,
};

fn mean_std(values: &[f64]) -> (f64, f64) {
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / values.len() as f64;
    (mean, variance.sqrt())
}

fn generate(text: &str, hedge_density: f64, style: Option<&StyleProfile>) -> Vec<Suggestion> {
    let sentences = segment(text);
    let lengths: Vec<f64> = sentences.iter().map(|s| s.word_count as f64).collect();
    let (mean, std) = mean_std(&lengths);
    generate_suggestions(text, &sentences, mean, std, hedge_density, style)
}

fn make_suggestion(id: u32, start: usize, end: usize, original: &str, replacement: &str) -> Suggestion {
    Suggestion {
        id,
        kind: SuggestionKind::SwapPredictablePhrasing,
        title: "Swap predictable phrasing".to_string(),
        description: String::new(),
        start,
        end,
        original: original.to_string(),
        replacement: replacement.to_string(),
        risk_impact: 6,
        status: SuggestionStatus::Pending,
    }
}

const CLEAN_TEXT: &str = "The committee met on Tuesday. \
    They reviewed three proposals and selected the second one after a long discussion. \
    Implementation begins next month. \
    Results will be shared in the quarterly report that goes out to all stakeholders. \
    The finance team will oversee the transition. \
    Each department submitted their estimates last week, covering projected costs in detail. \
    No objections were raised. \
    Minutes were distributed by email.";

// Bands derive from pre-rounding scores, so allow slack right at a threshold.
fn band_matches(metric: i32, band: Band) -> bool {
    if (metric - 35).abs() <= 1 || (metric - 65).abs() <= 1 {
        return true;
    }
    match band {
        Band::Low => metric < 35,
        Band::Moderate => (35..65).contains(&metric),
        Band::High => metric >= 65,
    }
}

#[test]
fn metrics_are_bounded_and_banded() {
    let result = analyze(CLEAN_TEXT, None).unwrap();
    let m = result.metrics;
    let b = result.risk_bands;
    for (metric, band) in [
        (m.perplexity, b.perplexity),
        (m.burstiness, b.burstiness),
        (m.sentence_pattern_diversity, b.sentence_pattern_diversity),
        (m.vocabulary_predictability, b.vocabulary_predictability),
        (m.overall_risk, b.overall_risk),
    ] {
        assert!((0..=100).contains(&metric), "metric out of range: {metric}");
        assert!(band_matches(metric, band), "band mismatch for {metric}");
    }
}

#[test]
fn overall_risk_is_the_weighted_sum() {
    let m = analyze(CLEAN_TEXT, None).unwrap().metrics;
    let expected = m.perplexity as f64 * 0.28
        + m.burstiness as f64 * 0.24
        + m.sentence_pattern_diversity as f64 * 0.22
        + m.vocabulary_predictability as f64 * 0.26;
    assert!(
        (expected - m.overall_risk as f64).abs() <= 1.0,
        "overall {} vs weighted {expected}",
        m.overall_risk
    );
}

#[test]
fn tiny_input_returns_neutral_defaults() {
    let result = analyze("Hello world.", None).unwrap();
    let m = result.metrics;
    assert_eq!(
        [
            m.perplexity,
            m.burstiness,
            m.sentence_pattern_diversity,
            m.vocabulary_predictability,
            m.overall_risk
        ],
        [50, 50, 50, 50, 50]
    );
    let b = result.risk_bands;
    for band in [
        b.perplexity,
        b.burstiness,
        b.sentence_pattern_diversity,
        b.vocabulary_predictability,
        b.overall_risk,
    ] {
        assert_eq!(band, Band::Moderate);
    }
    assert!(result.suggestions.is_empty());
    assert!(result.insights.note.is_some());
}

#[test]
fn single_sentence_is_neutral_even_with_many_words() {
    let text = format!("{}.", "word ".repeat(25).trim_end());
    let result = analyze(&text, None).unwrap();
    assert_eq!(result.metrics.overall_risk, 50);
    assert!(result.suggestions.is_empty());
}

#[test]
fn empty_and_oversize_input_are_rejected() {
    assert!(matches!(analyze("", None), Err(Error::EmptyInput)));
    assert!(matches!(analyze("   \n\t", None), Err(Error::EmptyInput)));
    let huge = "a ".repeat(70_000);
    assert!(matches!(
        analyze(&huge, None),
        Err(Error::InputTooLong { .. })
    ));
}

#[test]
fn segmentation_is_deterministic_with_valid_spans() {
    let text = "First point here. Second point, with a comma! Is this a question? Yes... sort of.";
    let a = segment(text);
    let b = segment(text);
    assert_eq!(a, b);
    for s in &a {
        assert!(s.start < s.end && s.end <= text.len());
        assert_eq!(s.raw_span_text, &text[s.start..s.end]);
    }
}

#[test]
fn segmenter_tolerates_punctuation_runs() {
    // Spurious near-empty sentences must not break anything downstream.
    let text = "Wow!!! Really . . . fine? Sure.";
    let sentences = segment(text);
    assert!(!sentences.is_empty());
    for s in &sentences {
        assert_eq!(s.raw_span_text, &text[s.start..s.end]);
    }
    let _ = analyze(text, None).unwrap();
}

#[test]
fn blank_style_sample_yields_no_profile() {
    assert!(build_style_profile("").is_none());
    assert!(build_style_profile("   \n  ").is_none());
}

#[test]
fn style_profile_statistics() {
    let sample = "One two three. One two three four five. Does it work? Yes, it does.";
    // Sentence word counts are 3, 5, 3, 3.
    let p = build_style_profile(sample).unwrap();
    assert!((p.avg_sentence_length - 3.5).abs() < 1e-9);
    let expected_std = 0.75f64.sqrt();
    assert!((p.sentence_length_std_dev - expected_std).abs() < 1e-9);
    assert!((p.comma_rate - 0.25).abs() < 1e-9);
    assert!((p.question_rate - 0.25).abs() < 1e-9);
}

#[test]
fn flat_document_against_bursty_baseline_raises_burstiness() {
    let text = "Alpha beta gamma delta epsilon zeta. \
                Red green blue cyan magenta yellow. \
                North south east west upward downward. \
                Spring summer autumn winter morning evening. \
                Stone river forest meadow valley ridge.";
    let sentences = segment(text);
    let words = tellsweep::tokenize(text);
    let (without, _) = tellsweep::score_document(&sentences, &words, None);
    let profile = StyleProfile {
        avg_sentence_length: 12.0,
        sentence_length_std_dev: 6.0,
        comma_rate: 0.1,
        question_rate: 0.0,
    };
    let (with, _) = tellsweep::score_document(&sentences, &words, Some(&profile));
    assert_eq!(without.burstiness, 92);
    assert_eq!(with.burstiness, 100);
}

#[test]
fn phrase_swap_fires_at_offset_zero_with_capitalization() {
    let text = "It is important to note that this works.";
    let suggestions = generate(text, 0.0, None);
    let s = suggestions
        .iter()
        .find(|s| s.kind == SuggestionKind::SwapPredictablePhrasing)
        .expect("phrase swap should fire");
    assert_eq!(s.start, 0);
    assert_eq!(s.end, 28);
    assert_eq!(s.original, "It is important to note that");
    assert_eq!(s.replacement, "Note that");
    assert_eq!(s.status, SuggestionStatus::Pending);
}

#[test]
fn phrase_swap_keeps_lowercase_matches_lowercase() {
    let text = "The results held up, and furthermore the method scaled well.";
    let suggestions = generate(text, 0.0, None);
    let s = suggestions
        .iter()
        .find(|s| s.kind == SuggestionKind::SwapPredictablePhrasing)
        .expect("phrase swap should fire");
    assert_eq!(s.original, "furthermore");
    assert_eq!(s.replacement, "also");
}

#[test]
fn uniform_window_needs_a_long_middle_sentence() {
    let text = "The team met early on Monday to plan the week. \
                They reviewed, in detail, the open items on the list. \
                Everyone left the meeting with a clear set of tasks.";
    let suggestions = generate(text, 0.0, None);
    assert!(
        !suggestions
            .iter()
            .any(|s| s.kind == SuggestionKind::VarySentenceLength),
        "window detector must not fire when the middle sentence is short"
    );
}

#[test]
fn uniform_window_splits_a_long_middle_sentence() {
    let text = "The harbor committee gathered before sunrise to review the season plans and assign the first round of duties for the week. \
                The crews checked every mooring line along the docks, and they logged each worn fitting in the harbor ledger before the morning rush. \
                The younger hands hauled the spare nets up from the store room and stacked them neatly beside the painted rail.";
    let suggestions = generate(text, 0.0, None);
    let s = suggestions
        .iter()
        .find(|s| s.kind == SuggestionKind::VarySentenceLength)
        .expect("window detector should fire");
    assert!(s.original.starts_with("The crews checked"));
    assert!(
        s.replacement.contains("docks. And they logged"),
        "split at the first comma, capitalizing the second half: {}",
        s.replacement
    );
}

#[test]
fn texture_detector_inserts_an_aside_after_the_sixth_word() {
    let text = "The quiet harbor town kept its narrow streets clean through every long winter season there. \
                Boats arrived at dawn.";
    let suggestions = generate(text, 0.0, None);
    let s = suggestions
        .iter()
        .find(|s| s.kind == SuggestionKind::AddStylisticTexture)
        .expect("texture detector should fire on unpunctuated text");
    assert!(s
        .replacement
        .starts_with("The quiet harbor town kept its (for context), narrow"));
}

#[test]
fn texture_detector_respects_existing_marks() {
    let text = "The quiet harbor town kept its narrow streets clean; every winter it stayed that way. \
                Boats arrived at dawn.";
    let suggestions = generate(text, 0.0, None);
    assert!(!suggestions
        .iter()
        .any(|s| s.kind == SuggestionKind::AddStylisticTexture));
}

#[test]
fn repeated_openers_rewrite_second_and_third_occurrences() {
    let text = "The plan covers the basics. The budget is still open. The schedule slips a little. Work continues anyway.";
    let suggestions = generate(text, 0.0, None);
    let openers: Vec<&Suggestion> = suggestions
        .iter()
        .filter(|s| s.kind == SuggestionKind::DiversifyOpeners)
        .collect();
    assert_eq!(openers.len(), 2);
    assert_eq!(
        openers[0].replacement,
        "From another angle, the budget is still open."
    );
    assert_eq!(
        openers[1].replacement,
        "From another angle, the schedule slips a little."
    );
}

#[test]
fn hedge_detector_is_gated_on_density() {
    let text = "The results may vary a lot. The estimate could shift over time. \
                The budget might change next quarter. Perhaps the teams will adjust.";
    let below = generate(text, 0.4, None);
    assert!(!below
        .iter()
        .any(|s| s.kind == SuggestionKind::ReduceHedging));
    let above = generate(text, 1.0, None);
    let hedges: Vec<&Suggestion> = above
        .iter()
        .filter(|s| s.kind == SuggestionKind::ReduceHedging)
        .collect();
    assert!(!hedges.is_empty());
    let first = hedges
        .iter()
        .find(|s| s.original == "The results may vary a lot.")
        .expect("first sentence should get a hedge removal");
    assert_eq!(first.replacement, "The results vary a lot.");
}

#[test]
fn hedge_detector_removes_only_the_first_match() {
    let text = "The results may possibly vary a great deal this quarter.";
    let suggestions = generate(text, 1.0, None);
    let s = suggestions
        .iter()
        .find(|s| s.kind == SuggestionKind::ReduceHedging)
        .expect("hedge removal should fire");
    assert_eq!(
        s.replacement,
        "The results possibly vary a great deal this quarter."
    );
}

#[test]
fn suggestions_are_capped_at_twenty() {
    let text = "Furthermore, the plan works. ".repeat(30);
    let suggestions = generate(&text, 0.0, None);
    assert_eq!(suggestions.len(), 20);
    for (i, s) in suggestions.iter().enumerate() {
        assert_eq!(s.id, i as u32 + 1);
        assert_eq!(s.status, SuggestionStatus::Pending);
        assert!(s.start < s.end);
    }
}

#[test]
fn accepting_a_longer_replacement_shifts_later_spans() {
    let doc = "alpha beta gamma delta";
    let suggestions = vec![
        make_suggestion(1, 0, 5, "alpha", "ALPHA"),
        make_suggestion(2, 6, 10, "beta", "betabeta"),
        make_suggestion(3, 17, 22, "delta", "DELTA"),
    ];
    let (new_doc, reconciled) = apply_suggestion(doc, &suggestions, 2).unwrap();
    assert_eq!(new_doc, "alpha betabeta gamma delta");
    // Before the edit: untouched.
    assert_eq!((reconciled[0].start, reconciled[0].end), (0, 5));
    // The target: accepted, span covers the replacement.
    assert_eq!(reconciled[1].status, SuggestionStatus::Accepted);
    assert_eq!((reconciled[1].start, reconciled[1].end), (6, 14));
    // After the edit: shifted by the length delta of 4.
    assert_eq!((reconciled[2].start, reconciled[2].end), (21, 26));
    assert_eq!(&new_doc[21..26], "DELTA");
}

#[test]
fn relocation_falls_back_to_literal_search() {
    let doc = "one two three two";
    let suggestions = vec![make_suggestion(1, 0, 5, "three", "3")];
    let (new_doc, reconciled) = apply_suggestion(doc, &suggestions, 1).unwrap();
    assert_eq!(new_doc, "one two 3 two");
    assert_eq!((reconciled[0].start, reconciled[0].end), (8, 9));
    assert_eq!(reconciled[0].status, SuggestionStatus::Accepted);
}

#[test]
fn relocation_falls_back_to_trimmed_search() {
    let doc = "two fish";
    let suggestions = vec![make_suggestion(1, 100, 104, " two", "TWO")];
    let (new_doc, reconciled) = apply_suggestion(doc, &suggestions, 1).unwrap();
    assert_eq!(new_doc, "TWO fish");
    assert_eq!((reconciled[0].start, reconciled[0].end), (0, 3));
}

#[test]
fn vanished_original_is_a_stale_suggestion() {
    let doc = "one two three";
    let suggestions = vec![make_suggestion(7, 0, 5, "zebra", "stripes")];
    match apply_suggestion(doc, &suggestions, 7) {
        Err(Error::StaleSuggestion { id: 7 }) => {}
        other => panic!("expected stale-suggestion error, got {other:?}"),
    }
}

#[test]
fn unknown_id_is_rejected() {
    let doc = "one two three";
    let suggestions = vec![make_suggestion(1, 0, 3, "one", "1")];
    assert!(matches!(
        apply_suggestion(doc, &suggestions, 99),
        Err(Error::UnknownSuggestion { id: 99 })
    ));
}

#[test]
fn accepted_suggestion_cannot_be_reapplied() {
    let doc = "one two three";
    let mut s = make_suggestion(1, 0, 3, "one", "1");
    s.status = SuggestionStatus::Accepted;
    assert!(matches!(
        apply_suggestion(doc, &[s], 1),
        Err(Error::StaleSuggestion { id: 1 })
    ));
}

#[test]
fn accept_then_rescore_round_trip() {
    let text = "Furthermore, the committee may review the plan. \
                The board could, perhaps, revisit the budget next week. \
                Moreover, the staff might draft a new timeline. \
                The office will typically circulate notes. \
                Additionally, the chair often signs off quickly.";
    let result = analyze(text, None).unwrap();
    let target = result
        .suggestions
        .iter()
        .find(|s| s.original == "Furthermore")
        .expect("connector swap expected");
    assert_eq!(target.replacement, "Also");

    let (new_doc, reconciled) = apply_suggestion(text, &result.suggestions, target.id).unwrap();
    assert!(new_doc.starts_with("Also, the committee"));
    let accepted = reconciled.iter().find(|s| s.id == target.id).unwrap();
    assert_eq!(accepted.status, SuggestionStatus::Accepted);
    // "Moreover" sits after the edit and shifts left by the delta of 7.
    let moreover_before = result
        .suggestions
        .iter()
        .find(|s| s.original == "Moreover")
        .unwrap();
    let moreover_after = reconciled
        .iter()
        .find(|s| s.original == "Moreover")
        .unwrap();
    assert_eq!(moreover_after.start, moreover_before.start - 7);
    assert_eq!(&new_doc[moreover_after.start..moreover_after.end], "Moreover");

    let (metrics, _) = rescore(&new_doc, None);
    assert!((0..=100).contains(&metrics.overall_risk));
}

#[test]
fn json_output_is_valid() {
    let result = analyze(CLEAN_TEXT, Some("Short sample. It reads, honestly, a bit uneven. Why not?")).unwrap();
    let json = serde_json::to_string_pretty(&result).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert!(parsed.get("metrics").is_some());
    assert!(parsed.get("riskBands").is_some());
    assert!(parsed.get("insights").is_some());
    assert!(parsed.get("suggestions").is_some());
    assert!(parsed
        .get("styleProfile")
        .and_then(|p| p.get("commaRate"))
        .is_some());
    assert_eq!(
        parsed["metrics"]["overallRisk"].as_i64().unwrap(),
        result.metrics.overall_risk as i64
    );
}
