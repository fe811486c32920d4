//! Plain-text extraction from the Docs API document structure.

use serde_json::Value;

/// Flatten a Docs API `documents.get` payload into plain text.
///
/// Paragraphs end with a newline, table cells are tab-separated one row per
/// line, and breaks or embedded objects become short markers.
pub fn extract_text(document: &Value) -> String {
    let mut out = String::new();
    let content = document
        .pointer("/body/content")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for element in content {
        if let Some(paragraph) = element.get("paragraph") {
            out.push_str(&paragraph_text(paragraph));
            out.push('\n');
        } else if let Some(table) = element.get("table") {
            out.push_str(&table_text(table));
        } else if element.get("sectionBreak").is_some() {
            out.push_str("\n---\n");
        }
    }

    out.trim().to_string()
}

fn paragraph_text(paragraph: &Value) -> String {
    paragraph
        .get("elements")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .map(element_text)
        .collect()
}

fn element_text(element: &Value) -> String {
    if let Some(run) = element.get("textRun") {
        return run.get("content").and_then(Value::as_str).unwrap_or("").to_string();
    }
    let marker = if element.get("pageBreak").is_some() {
        "\n---PAGE BREAK---\n"
    } else if element.get("columnBreak").is_some() {
        "\n---COLUMN BREAK---\n"
    } else if element.get("footnoteReference").is_some() {
        "[footnote]"
    } else if element.get("horizontalRule").is_some() {
        "\n---\n"
    } else if element.get("equation").is_some() {
        "[equation]"
    } else if element.get("inlineObjectElement").is_some() {
        "[object]"
    } else {
        ""
    };
    marker.to_string()
}

fn table_text(table: &Value) -> String {
    let mut out = String::new();
    let rows = table.get("tableRows").and_then(Value::as_array).into_iter().flatten();
    for row in rows {
        let cells: Vec<String> = row
            .get("tableCells")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .map(|cell| {
                cell.get("content")
                    .and_then(Value::as_array)
                    .into_iter()
                    .flatten()
                    .filter_map(|c| c.get("paragraph"))
                    .map(paragraph_text)
                    .collect::<String>()
            })
            .collect();
        out.push_str(cells.join("\t").trim_end_matches('\t'));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn para(text: &str) -> Value {
        json!({ "paragraph": { "elements": [ { "textRun": { "content": text } } ] } })
    }

    #[test]
    fn paragraphs_and_trim() {
        let doc = json!({ "body": { "content": [
            { "sectionBreak": {} },
            para("You are a helpful assistant.\n"),
            para("Keep replies short.\n"),
        ]}});
        let text = extract_text(&doc);
        assert!(text.starts_with("---"));
        assert!(text.contains("You are a helpful assistant.\n"));
        assert!(text.ends_with("Keep replies short."));
    }

    #[test]
    fn tables_are_tab_separated() {
        let cell = |t: &str| json!({ "content": [ para(t) ] });
        let doc = json!({ "body": { "content": [
            { "table": { "tableRows": [
                { "tableCells": [ cell("Alex"), cell("+15551234567") ] }
            ]}}
        ]}});
        assert_eq!(extract_text(&doc), "Alex\t+15551234567");
    }

    #[test]
    fn markers_for_non_text_elements() {
        let doc = json!({ "body": { "content": [
            { "paragraph": { "elements": [
                { "textRun": { "content": "a" } },
                { "footnoteReference": {} },
                { "inlineObjectElement": {} }
            ]}}
        ]}});
        assert_eq!(extract_text(&doc), "a[footnote][object]");
    }

    #[test]
    fn empty_document_is_empty_text() {
        assert_eq!(extract_text(&json!({ "title": "Blank" })), "");
    }
}
