//! HTML assembly for the annotation pages. No business logic here: everything
//! is rendered straight from annotation model state, and the toggle checkboxes
//! post back with `hx-swap="none"` so the browser keeps its own checkbox state
//! while the server persists the flip.

use shared::{domain::Category, protocol::RecordPage};

const GROUND_TRUTH_HEADERS: [&str; 2] = ["Ground Truth Components", "Missing"];
const HAIKU_HEADERS: [&str; 5] = [
    "Haiku Components",
    "Exact match",
    "Partial match",
    "Extra Components",
    "Hallucinations",
];

pub fn question_page(page: &RecordPage) -> String {
    format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>Component Annotation Tool</title>\
<script src=\"https://unpkg.com/htmx.org@1.9.12\"></script></head><body>\
<h1>Component Annotation Tool</h1>\
{nav}\
<h3>Question</h3><p>{question}</p>\
<h3>Gold Standard Answer</h3><p>{answer}</p>\
<h3>Ground Truth Components</h3>{ground_truth}\
<h3>Haiku Components Annotation</h3>{haiku}\
</body></html>",
        nav = navigation(page.index, page.total),
        question = escape(&page.record.question_text),
        answer = escape(&page.record.gold_standard_answer),
        ground_truth = ground_truth_table(page),
        haiku = haiku_table(page),
    )
}

/// Previous/Next address records by position and render as disabled buttons at
/// the boundaries.
fn navigation(index: usize, total: usize) -> String {
    let previous = if index > 0 {
        format!("<a href=\"/{}\">Previous</a>", index - 1)
    } else {
        "<button disabled>Previous</button>".to_string()
    };
    let next = if index + 1 < total {
        format!("<a href=\"/{}\">Next</a>", index + 1)
    } else {
        "<button disabled>Next</button>".to_string()
    };
    format!(
        "<nav>{previous} <span>Question {} of {}</span> {next}</nav>",
        index + 1,
        total
    )
}

fn ground_truth_table(page: &RecordPage) -> String {
    let mut rows = String::new();
    for (i, component) in page.record.ground_truth_components.iter().enumerate() {
        let checked = page.record.ground_truth_flag(i).unwrap_or(false);
        let toggle = checkbox(checked, &format!("/update_ground_truth/{}/{}", page.index, i));
        rows.push_str(&format!(
            "<tr><td>{}. {}</td><td>{toggle}</td></tr>",
            i + 1,
            escape(component)
        ));
    }
    table(&GROUND_TRUTH_HEADERS, &rows)
}

fn haiku_table(page: &RecordPage) -> String {
    let mut rows = String::new();
    for (i, component) in page.record.haiku_components.iter().enumerate() {
        let mut cells = String::new();
        for category in Category::ALL {
            let checked = page.record.haiku_flag(category, i).unwrap_or(false);
            let toggle = checkbox(
                checked,
                &format!("/update_haiku/{}/{}/{}", page.index, i, category),
            );
            cells.push_str(&format!("<td>{toggle}</td>"));
        }
        rows.push_str(&format!(
            "<tr><td>{}. {}</td>{cells}</tr>",
            i + 1,
            escape(component)
        ));
    }
    table(&HAIKU_HEADERS, &rows)
}

fn table(headers: &[&str], rows: &str) -> String {
    let headers: String = headers
        .iter()
        .map(|header| format!("<th>{header}</th>"))
        .collect();
    format!("<table><thead><tr>{headers}</tr></thead><tbody>{rows}</tbody></table>")
}

fn checkbox(checked: bool, post_url: &str) -> String {
    format!(
        "<input type=\"checkbox\"{} hx-post=\"{post_url}\" hx-swap=\"none\">",
        if checked { " checked" } else { "" }
    )
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::domain::EvaluationRecord;

    fn page() -> RecordPage {
        let mut record = EvaluationRecord {
            question_text: "Is 2 < 3?".to_string(),
            gold_standard_answer: "Yes".to_string(),
            ground_truth_components: vec!["two is less than three".to_string()],
            haiku_components: vec!["<script>alert(1)</script>".to_string()],
            ground_truth_annotations: None,
            haiku_annotations: None,
        };
        record.normalize();
        record.toggle_ground_truth(0).expect("toggle");
        RecordPage {
            index: 0,
            total: 1,
            record,
        }
    }

    #[test]
    fn escapes_component_text() {
        let html = question_page(&page());
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("Is 2 &lt; 3?"));
    }

    #[test]
    fn checked_flag_renders_checked_checkbox() {
        let html = question_page(&page());
        assert!(html.contains("checked hx-post=\"/update_ground_truth/0/0\""));
    }

    #[test]
    fn single_record_disables_both_nav_directions() {
        let html = question_page(&page());
        assert_eq!(html.matches("<button disabled>").count(), 2);
        assert!(html.contains("Question 1 of 1"));
    }

    #[test]
    fn middle_record_links_both_neighbours() {
        let nav = navigation(1, 3);
        assert!(nav.contains("<a href=\"/0\">Previous</a>"));
        assert!(nav.contains("<a href=\"/2\">Next</a>"));
    }
}
