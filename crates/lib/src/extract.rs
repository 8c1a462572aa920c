//! Display-text extraction from Langflow run responses.
//!
//! The run API has no fixed response schema across flow versions, so extraction is a
//! priority-ordered list of path readers. The first reader that finds a non-null value
//! wins; adding a shape means adding an entry to [`PATHS`].

use serde_json::Value;

/// Returned when no known path resolves.
pub const NO_TEXT_SENTINEL: &str =
    "I received a response but couldn't extract the text content properly.";

/// A named path reader.
pub type PathReader = (&'static str, fn(&Value) -> Option<String>);

/// Readers in priority order.
pub const PATHS: &[PathReader] = &[
    ("outputs[0].outputs[0].results.message.data.text", results_message_data_text),
    ("outputs[0].outputs[0].results.message", results_message),
    ("outputs[0].outputs[0].artifacts.message", artifacts_message),
    ("outputs[0].outputs[0].outputs.message", outputs_message),
    ("outputs[0].messages[0].message", block_messages),
    ("messages[0].message", top_level_messages),
    ("result", top_level_result),
];

/// Extract the display text from a flow response. Never fails: falls back to
/// [`NO_TEXT_SENTINEL`].
pub fn extract_text(response: &Value) -> String {
    for (name, read) in PATHS {
        if let Some(text) = read(response) {
            log::debug!("extract: matched {}", name);
            return text;
        }
    }
    log::debug!("extract: no known path in response");
    NO_TEXT_SENTINEL.to_string()
}

/// Text shown when the backend reply could not be parsed at all.
pub fn parse_failure_text(err: impl std::fmt::Display) -> String {
    format!(
        "I received your message but encountered an error parsing the response: {}",
        err
    )
}

fn present(v: Option<&Value>) -> Option<&Value> {
    v.filter(|v| !v.is_null())
}

/// Strings verbatim; anything else as compact JSON.
fn render(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `outputs[0]`
fn first_block(response: &Value) -> Option<&Value> {
    response.get("outputs")?.get(0)
}

/// `outputs[0].outputs[0]`
fn first_output(response: &Value) -> Option<&Value> {
    first_block(response)?.get("outputs")?.get(0)
}

fn results_message_data_text(response: &Value) -> Option<String> {
    let message = first_output(response)?.get("results")?.get("message")?;
    present(message.get("data")?.get("text")).map(render)
}

fn results_message(response: &Value) -> Option<String> {
    let message = first_output(response)?.get("results")?.get("message")?;
    match message {
        Value::String(s) => Some(s.clone()),
        Value::Object(_) => present(message.get("text")).map(render),
        _ => None,
    }
}

fn artifacts_message(response: &Value) -> Option<String> {
    present(first_output(response)?.get("artifacts")?.get("message")).map(render)
}

fn outputs_message(response: &Value) -> Option<String> {
    let message = first_output(response)?.get("outputs")?.get("message")?;
    match message {
        Value::String(s) => Some(s.clone()),
        Value::Object(_) => present(message.get("message")).map(render),
        _ => None,
    }
}

fn block_messages(response: &Value) -> Option<String> {
    present(first_block(response)?.get("messages")?.get(0)?.get("message")).map(render)
}

fn top_level_messages(response: &Value) -> Option<String> {
    present(response.get("messages")?.get(0)?.get("message")).map(render)
}

fn top_level_result(response: &Value) -> Option<String> {
    present(response.get("result")).map(render)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wrap(output: Value) -> Value {
        json!({ "outputs": [ { "outputs": [ output ] } ] })
    }

    #[test]
    fn results_message_data_text() {
        let r = wrap(json!({ "results": { "message": { "data": { "text": "from data" } } } }));
        assert_eq!(extract_text(&r), "from data");
    }

    #[test]
    fn results_message_string_or_text_field() {
        let r = wrap(json!({ "results": { "message": "flat" } }));
        assert_eq!(extract_text(&r), "flat");
        let r = wrap(json!({ "results": { "message": { "text": "flat text" } } }));
        assert_eq!(extract_text(&r), "flat text");
    }

    #[test]
    fn artifacts_message() {
        let r = wrap(json!({ "artifacts": { "message": "artifact" } }));
        assert_eq!(extract_text(&r), "artifact");
    }

    #[test]
    fn outputs_message_string_or_object() {
        let r = wrap(json!({ "outputs": { "message": "out" } }));
        assert_eq!(extract_text(&r), "out");
        let r = wrap(json!({ "outputs": { "message": { "message": "nested out" } } }));
        assert_eq!(extract_text(&r), "nested out");
    }

    #[test]
    fn messages_arrays() {
        let r = json!({ "outputs": [ { "outputs": [], "messages": [ { "message": "block msg" } ] } ] });
        assert_eq!(extract_text(&r), "block msg");
        let r = json!({ "messages": [ { "message": "top msg" }, { "message": "second" } ] });
        assert_eq!(extract_text(&r), "top msg");
    }

    #[test]
    fn top_level_result() {
        assert_eq!(extract_text(&json!({ "result": "Hi there" })), "Hi there");
    }

    #[test]
    fn priority_order_when_paths_coexist() {
        let mut r = json!({
            "outputs": [ {
                "outputs": [ {
                    "results": { "message": { "text": "p2", "data": { "text": "p1" } } },
                    "artifacts": { "message": "p3" },
                    "outputs": { "message": "p4" }
                } ],
                "messages": [ { "message": "p5" } ]
            } ],
            "messages": [ { "message": "p6" } ],
            "result": "p7"
        });
        fn output(r: &mut Value) -> &mut Value {
            &mut r["outputs"][0]["outputs"][0]
        }

        assert_eq!(extract_text(&r), "p1");
        output(&mut r)["results"]["message"]
            .as_object_mut()
            .unwrap()
            .remove("data");
        assert_eq!(extract_text(&r), "p2");
        output(&mut r).as_object_mut().unwrap().remove("results");
        assert_eq!(extract_text(&r), "p3");
        output(&mut r).as_object_mut().unwrap().remove("artifacts");
        assert_eq!(extract_text(&r), "p4");
        output(&mut r).as_object_mut().unwrap().remove("outputs");
        assert_eq!(extract_text(&r), "p5");
        r["outputs"][0].as_object_mut().unwrap().remove("messages");
        assert_eq!(extract_text(&r), "p6");
        r.as_object_mut().unwrap().remove("messages");
        assert_eq!(extract_text(&r), "p7");
        r.as_object_mut().unwrap().remove("result");
        assert_eq!(extract_text(&r), NO_TEXT_SENTINEL);
    }

    #[test]
    fn unknown_shape_yields_sentinel() {
        assert_eq!(extract_text(&json!({ "detail": "Flow not found" })), NO_TEXT_SENTINEL);
    }

    #[test]
    fn tolerates_empty_null_and_wrong_types() {
        let cases = [
            json!({}),
            json!(null),
            json!([]),
            json!("just a string"),
            json!({ "outputs": null }),
            json!({ "outputs": [] }),
            json!({ "outputs": {} }),
            json!({ "outputs": "x" }),
            json!({ "outputs": [ null ] }),
            json!({ "outputs": [ { "outputs": {} } ] }),
            json!({ "outputs": [ { "outputs": [ { "results": 5 } ] } ] }),
            json!({ "outputs": [ { "outputs": [ { "results": { "message": 7 } } ] } ] }),
            json!({ "outputs": [ { "outputs": [ { "results": { "message": { "data": null } } } ] } ] }),
            json!({ "outputs": [ { "outputs": [ { "outputs": { "message": [1] } } ] } ] }),
            json!({ "messages": {} }),
            json!({ "messages": [ "bare" ] }),
            json!({ "result": null }),
        ];
        for case in cases {
            assert_eq!(extract_text(&case), NO_TEXT_SENTINEL, "case {}", case);
        }
    }

    #[test]
    fn null_at_higher_priority_falls_through() {
        let r = json!({
            "outputs": [ { "outputs": [ { "artifacts": { "message": null } } ] } ],
            "result": "fallback"
        });
        assert_eq!(extract_text(&r), "fallback");
    }

    #[test]
    fn non_string_values_render_as_json() {
        assert_eq!(extract_text(&json!({ "result": { "a": 1 } })), r#"{"a":1}"#);
        assert_eq!(extract_text(&json!({ "result": 42 })), "42");
    }

    #[test]
    fn parse_failure_text_embeds_error() {
        let text = parse_failure_text("expected value at line 1 column 1");
        assert!(text.starts_with("I received your message but encountered an error"));
        assert!(text.ends_with("expected value at line 1 column 1"));
    }
}
