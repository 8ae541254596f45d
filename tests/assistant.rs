//! The bounded tool loop end to end, with a scripted model and the real
//! tools over a fixture store.

mod common;

use std::sync::Arc;

use common::*;
use coursemate::llm::{ContentBlock, LlmError, ModelTurn, Role, StopReason, ToolChoice};
use coursemate::traits::ToolError;
use coursemate_core::models::Citation;
use serde_json::json;

fn lesson_two_search() -> ModelTurn {
    tool_turn(vec![(
        "call_1",
        "search_course_content",
        json!({ "query": "transport", "course_name": "MCP", "lesson_number": 2 }),
    )])
}

fn lesson_two_citation() -> Citation {
    Citation::new(
        "Introduction to MCP - Lesson 2",
        Some("https://example.com/mcp/2".to_string()),
    )
}

#[tokio::test]
async fn test_direct_answer_makes_one_call() {
    let (store, _) = fixture_store(5).await;
    let model = Arc::new(ScriptedModel::new(vec![ModelTurn::text_only("Paris.")]));
    let assistant = assistant_with(model.clone(), store, 2, 2);

    let result = assistant
        .answer("What is the capital of France?", None)
        .await
        .unwrap();

    assert_eq!(result.answer, "Paris.");
    assert!(result.sources.is_empty());
    assert!(!result.partial);
    assert!(!result.session_id.is_empty());

    let requests = model.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].tool_choice, ToolChoice::Auto);
    assert_eq!(requests[0].tools.len(), 2);
    assert!(!requests[0].system.contains("Previous conversation"));
}

#[tokio::test]
async fn test_single_tool_round_then_answer() {
    let (store, _) = fixture_store(5).await;
    let model = Arc::new(ScriptedModel::new(vec![
        lesson_two_search(),
        ModelTurn::text_only("Stdio and streaming transports."),
    ]));
    let assistant = assistant_with(model.clone(), store, 2, 2);

    let result = assistant
        .answer("Which transports does MCP support?", None)
        .await
        .unwrap();

    assert_eq!(result.answer, "Stdio and streaming transports.");
    assert_eq!(result.sources, vec![lesson_two_citation()]);
    assert!(!result.partial);

    let requests = model.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].tool_choice, ToolChoice::Auto);

    let messages = &requests[1].messages;
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[2].role, Role::User);
    match &messages[2].content[0] {
        ContentBlock::ToolResult {
            tool_use_id,
            content,
            is_error,
        } => {
            assert_eq!(tool_use_id, "call_1");
            assert!(content.starts_with("[Introduction to MCP - Lesson 2]"));
            assert!(!is_error);
        }
        other => panic!("expected tool result, got {:?}", other),
    }
}

#[tokio::test]
async fn test_round_bound_requests_closing_answer() {
    let (store, _) = fixture_store(5).await;
    let model = Arc::new(ScriptedModel::new(vec![
        lesson_two_search(),
        lesson_two_search(),
        ModelTurn::text_only("Best effort answer."),
    ]));
    let assistant = assistant_with(model.clone(), store, 2, 2);

    let result = assistant.answer("Tell me about transport", None).await.unwrap();

    assert_eq!(result.answer, "Best effort answer.");
    assert!(!result.partial);
    assert_eq!(result.sources.len(), 2);

    let requests = model.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].tool_choice, ToolChoice::Auto);
    assert_eq!(requests[1].tool_choice, ToolChoice::Auto);
    assert_eq!(requests[2].tool_choice, ToolChoice::None);
    assert!(!requests[2].tools.is_empty());
    assert!(!requests[2].offers_tools());
}

#[tokio::test]
async fn test_single_round_bound() {
    let (store, _) = fixture_store(5).await;
    let model = Arc::new(ScriptedModel::new(vec![
        lesson_two_search(),
        ModelTurn::text_only("Closing."),
    ]));
    let assistant = assistant_with(model.clone(), store, 2, 1);

    let result = assistant.answer("transport?", None).await.unwrap();

    assert_eq!(result.answer, "Closing.");
    assert!(!result.partial);
    assert_eq!(model.requests()[1].tool_choice, ToolChoice::None);
}

#[tokio::test]
async fn test_round_where_every_call_fails_closes_early() {
    let (store, _) = fixture_store(5).await;
    let model = Arc::new(ScriptedModel::new(vec![
        tool_turn(vec![(
            "call_1",
            "search_course_content",
            json!({ "course_name": "MCP" }),
        )]),
        ModelTurn::text_only("I could not search."),
    ]));
    let assistant = assistant_with(model.clone(), store, 2, 3);

    let result = assistant.answer("anything about MCP?", None).await.unwrap();

    assert_eq!(result.answer, "I could not search.");
    assert!(!result.partial);
    assert!(result.sources.is_empty());

    let requests = model.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].tool_choice, ToolChoice::None);
    match &requests[1].messages[2].content[0] {
        ContentBlock::ToolResult {
            content, is_error, ..
        } => {
            assert!(content.starts_with("Tool execution failed:"));
            assert!(is_error);
        }
        other => panic!("expected tool result, got {:?}", other),
    }
}

#[tokio::test]
async fn test_failed_call_beside_successful_call_continues() {
    let (store, _) = fixture_store(5).await;
    let model = Arc::new(ScriptedModel::new(vec![
        tool_turn(vec![
            ("call_1", "search_course_content", json!({})),
            ("call_2", "get_course_outline", json!({ "course_title": "MCP" })),
        ]),
        ModelTurn::text_only("Two lessons."),
    ]));
    let assistant = assistant_with(model.clone(), store, 2, 2);

    let result = assistant.answer("outline of MCP", None).await.unwrap();

    assert_eq!(result.answer, "Two lessons.");
    assert_eq!(
        result.sources,
        vec![Citation::new(
            MCP_TITLE,
            Some("https://example.com/mcp".to_string())
        )]
    );

    let requests = model.requests();
    assert_eq!(requests[1].tool_choice, ToolChoice::Auto);
    assert_eq!(requests[1].messages[2].content.len(), 2);
}

#[tokio::test]
async fn test_empty_closing_text_falls_back_to_earlier_text() {
    let (store, _) = fixture_store(5).await;
    let mut first = lesson_two_search();
    first.content.insert(
        0,
        ContentBlock::Text {
            text: "Transport covers stdio.".to_string(),
        },
    );
    let model = Arc::new(ScriptedModel::new(vec![first, ModelTurn::text_only("")]));
    let assistant = assistant_with(model, store, 2, 1);

    let result = assistant.answer("transport?", None).await.unwrap();
    assert_eq!(result.answer, "Transport covers stdio.");
    assert!(result.partial);
}

#[tokio::test]
async fn test_history_is_appended_to_system_prompt() {
    let (store, _) = fixture_store(5).await;
    let model = Arc::new(ScriptedModel::new(vec![
        ModelTurn::text_only("first answer"),
        ModelTurn::text_only("second answer"),
    ]));
    let assistant = assistant_with(model.clone(), store, 2, 2);

    let first = assistant.answer("first question", None).await.unwrap();
    let second = assistant
        .answer("second question", Some(&first.session_id))
        .await
        .unwrap();
    assert_eq!(second.session_id, first.session_id);

    let requests = model.requests();
    assert!(requests[1]
        .system
        .ends_with("Previous conversation:\nUser: first question\nAssistant: first answer"));
}

#[tokio::test]
async fn test_history_keeps_only_latest_exchanges() {
    let (store, _) = fixture_store(5).await;
    let model = Arc::new(ScriptedModel::new(vec![
        ModelTurn::text_only("a1"),
        ModelTurn::text_only("a2"),
        ModelTurn::text_only("a3"),
    ]));
    let assistant = assistant_with(model.clone(), store, 1, 2);

    let session = assistant.answer("q1", None).await.unwrap().session_id;
    assistant.answer("q2", Some(&session)).await.unwrap();
    assistant.answer("q3", Some(&session)).await.unwrap();

    let third_system = &model.requests()[2].system;
    assert!(third_system.contains("User: q2\nAssistant: a2"));
    assert!(!third_system.contains("User: q1"));

    let exchanges = assistant.sessions().exchanges(&session);
    assert_eq!(exchanges.len(), 1);
    assert_eq!(exchanges[0].query, "q3");
}

#[tokio::test]
async fn test_unknown_tool_fails_the_query() {
    let (store, _) = fixture_store(5).await;
    let model = Arc::new(ScriptedModel::new(vec![tool_turn(vec![(
        "call_1",
        "drop_tables",
        json!({}),
    )])]));
    let assistant = assistant_with(model, store, 2, 2);

    let err = assistant.answer("do something", Some("s1")).await.unwrap_err();
    assert_eq!(
        err.downcast_ref::<ToolError>(),
        Some(&ToolError::UnknownTool("drop_tables".to_string()))
    );
    assert!(assistant.sessions().exchanges("s1").is_empty());
}

#[tokio::test]
async fn test_model_failure_propagates_and_stores_no_session() {
    let (store, _) = fixture_store(5).await;
    let model = Arc::new(ScriptedModel::default());
    let assistant = assistant_with(model, store, 2, 2);

    let err = assistant.answer("hello", None).await.unwrap_err();
    assert!(err.downcast_ref::<LlmError>().is_some());
    assert!(assistant.sessions().is_empty());
}

#[tokio::test]
async fn test_index_failure_inside_tool_fails_the_query() {
    let model = Arc::new(ScriptedModel::new(vec![
        tool_turn(vec![(
            "call_1",
            "search_course_content",
            json!({ "query": "transport" }),
        )]),
        ModelTurn::text_only("There is no information about transport."),
    ]));
    let assistant = assistant_with(model.clone(), down_store(), 2, 2);

    let err = assistant.answer("What is transport?", None).await.unwrap_err();

    match err.downcast_ref::<ToolError>() {
        Some(ToolError::Transport { tool, message }) => {
            assert_eq!(tool, "search_course_content");
            assert!(message.contains("index unreachable"));
        }
        other => panic!("expected transport failure, got {:?}", other),
    }
    assert_eq!(model.call_count(), 1);
    assert!(assistant.sessions().is_empty());
}

#[tokio::test]
async fn test_index_failure_in_outline_fails_the_query() {
    let model = Arc::new(ScriptedModel::new(vec![
        tool_turn(vec![(
            "call_1",
            "get_course_outline",
            json!({ "course_title": "MCP" }),
        )]),
        ModelTurn::text_only("unused"),
    ]));
    let assistant = assistant_with(model, down_store(), 2, 2);

    let err = assistant.answer("Outline of MCP?", Some("s1")).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ToolError>(),
        Some(ToolError::Transport { .. })
    ));
    assert!(assistant.sessions().exchanges("s1").is_empty());
}

#[tokio::test]
async fn test_empty_query_is_rejected_without_model_call() {
    let (store, _) = fixture_store(5).await;
    let model = Arc::new(ScriptedModel::default());
    let assistant = assistant_with(model.clone(), store, 2, 2);

    assert!(assistant.answer("   ", None).await.is_err());
    assert_eq!(model.call_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_queries_keep_citations_separate() {
    let (store, _) = fixture_store(5).await;
    let assistant = Arc::new(assistant_with(
        Arc::new(SearchThenAnswerModel),
        store,
        2,
        2,
    ));

    let a = assistant.clone();
    let b = assistant.clone();
    let (mcp, chroma) = tokio::join!(
        async move { a.answer(MCP_TITLE, None).await.unwrap() },
        async move { b.answer(CHROMA_TITLE, None).await.unwrap() },
    );

    assert_eq!(mcp.sources.len(), 2);
    assert!(mcp.sources.iter().all(|c| c.label.starts_with(MCP_TITLE)));
    assert_eq!(chroma.sources.len(), 1);
    assert!(chroma.sources.iter().all(|c| c.label.starts_with(CHROMA_TITLE)));
    assert_ne!(mcp.session_id, chroma.session_id);
}

#[test]
fn test_tool_turn_helper_marks_tool_use() {
    let turn = lesson_two_search();
    assert_eq!(turn.stop_reason, StopReason::ToolUse);
    assert!(turn.wants_tools());
}
