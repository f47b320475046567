//! Atlassian Document Format helpers.
//!
//! Jira Cloud (API v3) rejects plain-text rich-text fields; descriptions have
//! to be sent as ADF documents.

use serde_json::{json, Value};

/// Convert plain text to an ADF document.
///
/// Splits on `\n\n` for paragraphs, uses `hardBreak` for single `\n`.
pub(crate) fn text_to_adf(text: &str) -> Value {
    if text.is_empty() {
        return json!({
            "version": 1,
            "type": "doc",
            "content": [{
                "type": "paragraph",
                "content": []
            }]
        });
    }

    let content: Vec<Value> = text
        .split("\n\n")
        .map(|para| {
            let mut inline: Vec<Value> = Vec::new();
            for (i, line) in para.split('\n').enumerate() {
                if i > 0 {
                    inline.push(json!({ "type": "hardBreak" }));
                }
                if !line.is_empty() {
                    inline.push(json!({ "type": "text", "text": line }));
                }
            }
            json!({ "type": "paragraph", "content": inline })
        })
        .collect();

    json!({
        "version": 1,
        "type": "doc",
        "content": content
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_to_adf_simple() {
        let adf = text_to_adf("Hello world");
        assert_eq!(adf["type"], "doc");
        assert_eq!(adf["version"], 1);
        let content = adf["content"].as_array().unwrap();
        assert_eq!(content.len(), 1);
        assert_eq!(content[0]["type"], "paragraph");
        assert_eq!(content[0]["content"][0]["text"], "Hello world");
    }

    #[test]
    fn test_text_to_adf_paragraphs_and_breaks() {
        let adf = text_to_adf("Steps:\n1. open app\n\nExpected: login works");
        let content = adf["content"].as_array().unwrap();
        assert_eq!(content.len(), 2);

        let first = content[0]["content"].as_array().unwrap();
        // text, hardBreak, text
        assert_eq!(first.len(), 3);
        assert_eq!(first[0]["text"], "Steps:");
        assert_eq!(first[1]["type"], "hardBreak");
        assert_eq!(first[2]["text"], "1. open app");
        assert_eq!(content[1]["content"][0]["text"], "Expected: login works");
    }

    #[test]
    fn test_text_to_adf_empty() {
        let adf = text_to_adf("");
        let content = adf["content"].as_array().unwrap();
        assert_eq!(content.len(), 1);
        assert!(content[0]["content"].as_array().unwrap().is_empty());
    }
}
