//! Console formatting of analysis reports.

use chord_core::BlockReport;

/// Formats one report as a single console line.
///
/// Returns `None` for silent blocks so the console stays quiet between notes.
/// Chords below `min_confidence` are shown as notes only.
pub fn format_report(report: &BlockReport, min_confidence: f32) -> Option<String> {
    if report.is_silent() {
        return None;
    }

    let notes = report
        .pitches
        .iter()
        .map(|p| format!("{}({:+.0}c)", p.note_name, p.cents_deviation()))
        .collect::<Vec<_>>()
        .join(" ");

    let chord = match report.recognition.chord {
        Some(chord) if report.recognition.confidence >= min_confidence => format!(
            "{:<8} {:>3.0}%",
            chord.name(),
            report.recognition.confidence * 100.0
        ),
        _ => format!("{:<8} {:>4}", "-", ""),
    };

    Some(format!("{}  | {}", chord, notes))
}
