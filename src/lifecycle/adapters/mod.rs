//! Built-in validation gates.

mod assignee;
mod checklist;
mod required_sections;

pub use assignee::AssigneeGate;
pub use checklist::ChecklistGate;
pub use required_sections::RequiredSectionsGate;

/// Returns the text of every Markdown heading in `body`, trimmed.
fn headings(body: &str) -> impl Iterator<Item = &str> {
    body.lines().filter_map(|line| {
        let trimmed = line.trim_start();
        let text = trimmed.trim_start_matches('#');
        let is_heading = text.len() < trimmed.len() && text.starts_with(' ');
        is_heading.then(|| text.trim())
    })
}
