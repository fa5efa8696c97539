use chrono::{DateTime, Utc};

use super::ChatTurn;

const TITLE: &str = "Chat History";

/// Renders `turns` (most recent first, as stored) into a Markdown transcript
/// ordered oldest first.
pub fn export_markdown(turns: &[ChatTurn], generated_at: DateTime<Utc>) -> String {
    let mut out = format!(
        "# {}\n\n_Generated on: {}_\n",
        TITLE,
        generated_at.format("%d-%m-%Y %I:%M %p")
    );

    if turns.is_empty() {
        out.push_str("\nNo questions asked yet.\n");
        return out;
    }

    for (number, turn) in turns.iter().rev().enumerate() {
        out.push_str(&format!(
            "\n## Q{}: {}\n\n{}\n\n<sub>{} · {}</sub>\n",
            number + 1,
            turn.user_question.trim(),
            turn.bot_answer.trim_end(),
            turn.source.as_str(),
            turn.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }

    out
}
