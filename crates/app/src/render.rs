use std::fmt::Write as _;

use exam_core::NormalizedTest;
use exam_core::model::{Options, Question};
use exam_core::time::format_countdown;
use services::SessionProgress;
use services::session::{AudioStatus, AudioView, UnitView};

fn options(out: &mut String, options: &Options) {
    match options {
        Options::Choices(choices) => {
            for choice in choices {
                let _ = writeln!(out, "      {}) {}", choice.key, choice.text);
            }
        }
        Options::Ordering(items) => {
            let _ = writeln!(out, "      order: {}", items.join(" | "));
        }
    }
}

fn example(out: &mut String, question: &Question) {
    let _ = writeln!(out, "  example: {}", question.text);
    options(out, &question.options);
}

fn audio(out: &mut String, audio: &AudioView<'_>) {
    let status = match audio.status {
        AudioStatus::Idle => return,
        AudioStatus::Loading => "loading",
        AudioStatus::Ready => "ready",
        AudioStatus::Playing => "playing",
        AudioStatus::Paused => "paused",
        AudioStatus::Ended => "ended",
        AudioStatus::Unavailable(_) => "unavailable (answer without it)",
    };
    let _ = write!(out, "  audio: {status}");
    if let Some(duration) = audio.duration_secs.filter(|d| *d > 0.0) {
        let _ = write!(out, " {:.0}/{duration:.0}s", audio.position_secs);
    }
    out.push('\n');
}

/// Plain-text rendering of the unit on screen.
pub fn unit(view: &UnitView<'_>) -> String {
    let mut out = String::new();
    let title = view.part_title.unwrap_or(view.kind.as_str());
    let _ = write!(out, "== part {}: {title}", view.position.part + 1);
    if let (Some(sub), Some(id)) = (view.position.sub_unit, view.unit_id) {
        let _ = write!(out, " [{} {id}]", sub + 1);
    }
    out.push('\n');

    if view.content_unavailable() {
        out.push_str("  this part cannot be shown here; move on with `next`\n");
        return out;
    }

    audio(&mut out, &view.audio);
    for question in view.examples {
        example(&mut out, question);
    }
    for (slot, q) in view.questions.iter().enumerate() {
        let _ = writeln!(
            out,
            "  ({}) Q{}. {}",
            slot + 1,
            q.number,
            q.question.text
        );
        options(&mut out, &q.question.options);
        if let Some(answer) = q.answer.filter(|a| !a.is_empty()) {
            let _ = writeln!(out, "      > {answer}");
        }
    }
    out
}

pub fn progress(progress: &SessionProgress) -> String {
    let numbers = match &progress.question_range {
        Some(range) if range.start() != range.end() => {
            format!("questions {}-{}", range.start(), range.end())
        }
        _ => format!("question {}", progress.current_number),
    };
    format!(
        "{numbers} of {} | part {}/{} | answered {} | unanswered {} | {} left",
        progress.total_questions,
        progress.part_index + 1,
        progress.part_count,
        progress.answered,
        progress.unanswered(),
        format_countdown(progress.remaining_secs),
    )
}

/// One line per part, for the `inspect` command.
pub fn outline(test: &NormalizedTest) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "test {} | {} questions | {}",
        test.test_id,
        test.total_questions,
        format_countdown(test.duration_secs)
    );
    for part in &test.parts {
        let first = part.units.first().map_or(0, |u| u.first_number);
        let _ = write!(
            out,
            "  part {} ({}) {}",
            part.index + 1,
            part.id,
            part.kind.as_str()
        );
        if part.question_count > 0 {
            let last = first + part.question_count - 1;
            let _ = write!(out, " | Q{first}-Q{last}");
        }
        if part.sub_unit_count > 0 {
            let _ = write!(out, " | {} units", part.sub_unit_count);
        }
        if let Some(title) = &part.title {
            let _ = write!(out, " | {title}");
        }
        out.push('\n');
    }
    out
}
