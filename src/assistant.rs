//! Query orchestration: the bounded tool-use loop.
//!
//! ```text
//!                ┌──────────── tool_use ────────────┐
//!                ▼                                  │
//!  query ─▶ AwaitingModel ──── text ───▶ Done       │
//!                │                                  │
//!                └─ tool_use ─▶ Dispatching ────────┘  (rounds < max, some call succeeded)
//!                                   │
//!                                   └─▶ Closing ─▶ Done  (round bound hit, or every call failed)
//! ```
//!
//! Tool calls within a round run one after another, in the order the model
//! asked for them. The closing call keeps the tool list declared but sets
//! `tool_choice` to none, so the model has to answer in text.

use std::sync::Arc;

use anyhow::{bail, Result};
use coursemate_core::models::Citation;
use tracing::{debug, info, warn};

use crate::llm::{
    ContentBlock, GenerationModel, GenerationRequest, Message, ModelTurn, Role, ToolChoice,
};
use crate::session::SessionStore;
use crate::store::CourseStore;
use crate::traits::{ToolContext, ToolRegistry, ToolSchema};

const SYSTEM_PROMPT: &str = "You are an AI assistant specialized in course materials and educational content with access to tools for course information.

Available Tools:
1. **Course Content Search** (search_course_content): for questions about specific course content, lessons, or detailed educational materials
2. **Course Outline** (get_course_outline): for questions about course structure, lesson lists, course overviews, or what topics a course covers

Tool Usage Guidelines:
- **Course outline questions**: use get_course_outline for questions like \"What does course X cover?\" or \"Show me the lessons for course Y\"
- **Content search questions**: use search_course_content for questions about specific topics, concepts, or material within courses
- **Sequential tool usage**: you may use up to {rounds} rounds of tool calls per query for questions that need more than one search
- Synthesize tool results into accurate, fact-based responses
- If tools yield no results, state this clearly without offering alternatives

Response Protocol:
- **General knowledge questions**: answer from existing knowledge without using tools
- **Course outline questions**: get the course outline first, then answer with the course title, the course link, and the number and title of every lesson
- **Course-specific content questions**: search content first, then answer
- **No meta-commentary**: give the direct answer only; do not mention the search results or the outline

All responses must be:
1. **Brief and focused**: get to the point quickly
2. **Educational**: maintain instructional value
3. **Clear**: use accessible language
4. **Example-supported**: include relevant examples when they aid understanding
Provide only the direct answer to what was asked.";

/// An answer with the citations gathered while producing it.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryAnswer {
    pub answer: String,
    pub sources: Vec<Citation>,
    pub session_id: String,
    /// The round bound was reached and the closing call produced no
    /// answer of its own, so `answer` is the last text seen in the loop.
    pub partial: bool,
}

/// Loop states for one query.
enum LoopState {
    AwaitingModel,
    Dispatching(ModelTurn),
    Closing { bound_reached: bool },
    Done { answer: String, partial: bool },
}

pub struct CourseAssistant {
    model: Arc<dyn GenerationModel>,
    store: Arc<CourseStore>,
    tools: Arc<ToolRegistry>,
    sessions: Arc<SessionStore>,
    max_tool_rounds: usize,
}

impl CourseAssistant {
    pub fn new(
        model: Arc<dyn GenerationModel>,
        store: Arc<CourseStore>,
        tools: Arc<ToolRegistry>,
        sessions: Arc<SessionStore>,
        max_tool_rounds: usize,
    ) -> Self {
        Self {
            model,
            store,
            tools,
            sessions,
            max_tool_rounds: max_tool_rounds.max(1),
        }
    }

    pub fn store(&self) -> &Arc<CourseStore> {
        &self.store
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Answer `query`, creating a session when `session_id` is `None`.
    ///
    /// # Errors
    ///
    /// Model transport failures, index or embedding failures inside a tool
    /// ([`ToolError::Transport`](crate::traits::ToolError::Transport)), and a request for a tool that is not
    /// registered. Other tool failures are reported to the model and do
    /// not fail the query.
    pub async fn answer(&self, query: &str, session_id: Option<&str>) -> Result<QueryAnswer> {
        if query.trim().is_empty() {
            bail!("query must not be empty");
        }

        // A new session is only stored once its first exchange succeeds.
        let session_id = match session_id {
            Some(id) => id.to_string(),
            None => SessionStore::new_session_id(),
        };
        let system = system_prompt(
            self.max_tool_rounds,
            self.sessions.history(&session_id).as_deref(),
        );

        let ctx = ToolContext::new(self.store.clone());
        let schemas = self.tools.schemas();
        let mut messages = vec![Message::user_text(query)];
        let mut rounds = 0;
        let mut last_text = String::new();
        let mut state = LoopState::AwaitingModel;

        let (answer, partial) = loop {
            state = match state {
                LoopState::AwaitingModel => {
                    let turn = self
                        .call_model(&system, &messages, &schemas, ToolChoice::Auto)
                        .await?;
                    let text = turn.text();
                    if !text.trim().is_empty() {
                        last_text = text.clone();
                    }
                    if turn.wants_tools() {
                        LoopState::Dispatching(turn)
                    } else {
                        LoopState::Done {
                            answer: text,
                            partial: false,
                        }
                    }
                }
                LoopState::Dispatching(turn) => {
                    rounds += 1;
                    messages.push(turn.to_message());
                    let (results, any_succeeded) = self.run_tool_calls(&turn, &ctx).await?;
                    messages.push(Message {
                        role: Role::User,
                        content: results,
                    });

                    if !any_succeeded {
                        debug!(round = rounds, "every tool call failed, closing");
                        LoopState::Closing {
                            bound_reached: false,
                        }
                    } else if rounds >= self.max_tool_rounds {
                        debug!(
                            rounds,
                            max = self.max_tool_rounds,
                            "tool round bound reached, requesting closing answer"
                        );
                        LoopState::Closing {
                            bound_reached: true,
                        }
                    } else {
                        LoopState::AwaitingModel
                    }
                }
                LoopState::Closing { bound_reached } => {
                    let turn = self
                        .call_model(&system, &messages, &schemas, ToolChoice::None)
                        .await?;
                    let text = turn.text();
                    // Past the bound, a closing turn without text (or one
                    // that still asks for tools) leaves no final answer.
                    let unanswered = text.trim().is_empty() || turn.wants_tools();
                    let partial = bound_reached && unanswered;
                    if partial {
                        warn!(
                            rounds,
                            max = self.max_tool_rounds,
                            "tool loop exceeded without a final answer, returning last text"
                        );
                    }
                    let answer = if text.trim().is_empty() {
                        std::mem::take(&mut last_text)
                    } else {
                        text
                    };
                    LoopState::Done { answer, partial }
                }
                LoopState::Done { answer, partial } => break (answer, partial),
            };
        };

        let sources = ctx.sources.drain();
        self.sessions.add_exchange(&session_id, query, &answer);
        info!(
            model = self.model.name(),
            session = %session_id,
            rounds,
            sources = sources.len(),
            partial,
            "answered query"
        );

        Ok(QueryAnswer {
            answer,
            sources,
            session_id,
            partial,
        })
    }

    async fn call_model(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[ToolSchema],
        tool_choice: ToolChoice,
    ) -> Result<ModelTurn> {
        let request = GenerationRequest {
            system: system.to_string(),
            messages: messages.to_vec(),
            tools: tools.to_vec(),
            tool_choice,
        };
        Ok(self.model.generate(&request).await?)
    }

    /// Run every tool call in `turn`, returning `tool_result` blocks and
    /// whether at least one call succeeded.
    async fn run_tool_calls(
        &self,
        turn: &ModelTurn,
        ctx: &ToolContext,
    ) -> Result<(Vec<ContentBlock>, bool)> {
        let mut results = Vec::new();
        let mut any_succeeded = false;

        for call in turn.tool_calls() {
            debug!(tool = %call.name, input = %call.input, "dispatching tool");
            let (content, is_error) = match self.tools.dispatch(&call.name, call.input, ctx).await
            {
                Ok(text) => {
                    any_succeeded = true;
                    (text, false)
                }
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    warn!(tool = %call.name, error = %e, "tool execution failed");
                    (format!("Tool execution failed: {}", e), true)
                }
            };
            results.push(ContentBlock::ToolResult {
                tool_use_id: call.id,
                content,
                is_error,
            });
        }

        Ok((results, any_succeeded))
    }
}

/// System instructions, with the session's history appended when present.
pub fn system_prompt(max_tool_rounds: usize, history: Option<&str>) -> String {
    let base = SYSTEM_PROMPT.replace("{rounds}", &max_tool_rounds.to_string());
    match history {
        Some(history) => format!("{}\n\nPrevious conversation:\n{}", base, history),
        None => base,
    }
}
