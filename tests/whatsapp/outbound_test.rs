//! Outbound payload building and question rendering tests.

use serde_json::{json, Map, Value};

use whatsappgo::config::QuestionStyle;
use whatsappgo::types::{OutgoingReply, QuestionOption};
use whatsappgo::whatsapp::outbound::{render_question, OutboundPayload, PayloadType};
use whatsappgo::whatsapp::WhatsAppError;

fn yes_no() -> Vec<QuestionOption> {
    vec![QuestionOption::new("1", "Yes"), QuestionOption::new("2", "No")]
}

fn params(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("fixture must be an object, got {other}"),
    }
}

#[test]
fn plain_text_is_sent_verbatim() {
    let reply = OutgoingReply::text("hi");
    let payload = OutboundPayload::build(&reply, "5511", QuestionStyle::Plain);
    assert_eq!(payload.message, "hi");
    assert_eq!(payload.recipient, "5511");
    assert_eq!(payload.kind, PayloadType::Text);
    assert_eq!(payload.to_json(), json!({ "msisdn": "5511", "message": "hi" }));
}

#[test]
fn question_ends_with_one_line_per_option() {
    let reply = OutgoingReply::question("Continue?", yes_no());
    let payload = OutboundPayload::build(&reply, "5511", QuestionStyle::Plain);

    let lines: Vec<&str> = payload.message.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "Continue?");
    assert!(lines[1].contains('1') && lines[1].contains("Yes"));
    assert!(lines[2].contains('2') && lines[2].contains("No"));
    assert_eq!(payload.message, "Continue?\n1 - Yes\n2 - No");
}

#[test]
fn rich_question_bolds_values() {
    let rendered = render_question("Continue?", &yes_no(), QuestionStyle::Rich);
    assert_eq!(rendered, "Continue?\n*1* - Yes\n*2* - No");
}

#[test]
fn rich_question_only_bolds_whole_values() {
    let options = vec![
        QuestionOption::new("1", "10 items"),
        QuestionOption::new("2", "Pick 2 now"),
    ];
    let rendered = render_question("Q", &options, QuestionStyle::Rich);
    assert_eq!(rendered, "Q\n*1* - 10 items\nPick *2* now");
}

#[test]
fn question_without_options_falls_back_to_text() {
    let reply = OutgoingReply::question("Anything else?", Vec::new());
    let payload = OutboundPayload::build(&reply, "5511", QuestionStyle::Rich);
    assert_eq!(payload.message, "Anything else?");
}

#[test]
fn only_text_type_has_an_endpoint() {
    assert_eq!(PayloadType::Text.endpoint().ok(), Some("send/text"));
    match PayloadType::parse("picture").endpoint() {
        Err(WhatsAppError::UnsupportedPayloadType(kind)) => assert_eq!(kind, "picture"),
        other => panic!("expected unsupported payload type, got: {other:?}"),
    }
}

#[test]
fn parameters_default_to_text_type() {
    let payload = OutboundPayload::from_parameters(params(json!({
        "msisdn": "5511", "message": "hey"
    })))
    .expect("valid parameters");
    assert_eq!(payload.kind, PayloadType::Text);
    assert!(payload.extra.is_empty());
}

#[test]
fn parameters_keep_extra_fields_and_explicit_recipient() {
    let payload = OutboundPayload::from_parameters(params(json!({
        "msisdn": "default",
        "recipient": "explicit",
        "message": "hey",
        "type": "video",
        "caption": "clip"
    })))
    .expect("valid parameters");
    assert_eq!(payload.recipient, "explicit");
    assert_eq!(payload.kind, PayloadType::Other("video".to_owned()));
    assert_eq!(
        payload.to_json(),
        json!({ "msisdn": "explicit", "message": "hey", "caption": "clip" })
    );
}

#[test]
fn parameters_without_message_are_invalid() {
    let result = OutboundPayload::from_parameters(params(json!({ "msisdn": "5511" })));
    assert!(matches!(result, Err(WhatsAppError::InvalidPayload(_))));
}
