use meet_relay_core::collaborators::Assistant;
use meet_relay_service::gemini_adapter::GeminiAssistant;
use meet_relay_service::openai_adapter::OpenAiAssistant;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn key(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

fn openai_reply(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": "chatcmpl-1",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    }))
}

#[tokio::test]
async fn openai_assistant_sends_query_and_returns_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_json(json!({
            "model": "gpt-4o-mini",
            "messages": [{"role": "user", "content": "what is rust?"}]
        })))
        .respond_with(openai_reply("  A language.  "))
        .expect(1)
        .mount(&server)
        .await;

    let assistant = OpenAiAssistant::new(key("sk-test"), server.uri(), "gpt-4o-mini");
    let answer = assistant.ask("what is rust?").await.unwrap();

    assert_eq!(answer, "A language.");
}

#[tokio::test]
async fn openai_assistant_carries_the_conversation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "messages": [
                {"role": "user", "content": "first"},
                {"role": "assistant", "content": "one"},
                {"role": "user", "content": "second"}
            ]
        })))
        .respond_with(openai_reply("two"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(openai_reply("one"))
        .mount(&server)
        .await;

    let assistant = OpenAiAssistant::new(key("sk-test"), server.uri(), "gpt-4o-mini");

    assert_eq!(assistant.ask("first").await.unwrap(), "one");
    assert_eq!(assistant.ask("second").await.unwrap(), "two");
}

#[tokio::test]
async fn openai_assistant_surfaces_http_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let assistant = OpenAiAssistant::new(key("sk-test"), server.uri(), "gpt-4o-mini");

    assert!(assistant.ask("anyone?").await.is_err());
}

#[tokio::test]
async fn openai_assistant_rejects_empty_choices() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let assistant = OpenAiAssistant::new(key("sk-test"), server.uri(), "gpt-4o-mini");

    assert!(assistant.ask("anyone?").await.is_err());
}

#[tokio::test]
async fn gemini_assistant_joins_parts_of_first_candidate() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .and(header("x-goog-api-key", "AIza-test"))
        .and(body_json(json!({
            "contents": [{"role": "user", "parts": [{"text": "hello?"}]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [
                {"content": {"role": "model", "parts": [{"text": "Hi"}, {"text": "there "}]}},
                {"content": {"role": "model", "parts": [{"text": "ignored"}]}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let assistant = GeminiAssistant::new(key("AIza-test"), server.uri(), "gemini-1.5-flash");
    let answer = assistant.ask("hello?").await.unwrap();

    assert_eq!(answer, "Hi\nthere");
}

#[tokio::test]
async fn gemini_assistant_fails_without_candidates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
        .mount(&server)
        .await;

    let assistant = GeminiAssistant::new(key("AIza-test"), server.uri(), "gemini-1.5-flash");

    assert!(assistant.ask("hello?").await.is_err());
}

#[tokio::test]
async fn openai_assistant_drops_oldest_exchanges_past_the_cap() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_json(json!({
            "model": "gpt-4o-mini",
            "messages": [
                {"role": "user", "content": "second"},
                {"role": "assistant", "content": "ok"},
                {"role": "user", "content": "third"}
            ]
        })))
        .respond_with(openai_reply("ok"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(openai_reply("ok"))
        .mount(&server)
        .await;

    let assistant =
        OpenAiAssistant::new(key("sk-test"), server.uri(), "gpt-4o-mini").with_max_turns(2);

    for query in ["first", "second", "third"] {
        assistant.ask(query).await.unwrap();
    }
}

#[tokio::test]
async fn gemini_assistant_keeps_history_starting_with_a_user_turn() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .and(body_json(json!({
            "contents": [
                {"role": "user", "parts": [{"text": "second"}]},
                {"role": "model", "parts": [{"text": "ok"}]},
                {"role": "user", "parts": [{"text": "third"}]}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": "ok"}]}}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": "ok"}]}}]
        })))
        .mount(&server)
        .await;

    let assistant =
        GeminiAssistant::new(key("AIza-test"), server.uri(), "gemini-1.5-flash").with_max_turns(1);

    for query in ["first", "second", "third"] {
        assistant.ask(query).await.unwrap();
    }
}
