//! Multi-turn tool calling for a single agent and task.

use std::sync::Arc;

use serde_json::Value;

use super::{Agent, CrewError, Task};
use crate::llm::{ChatMessage, LanguageModel};
use crate::mcp::ToolRegistry;
use crate::research::ResearchContext;

const FORCE_FINAL_ANSWER: &str =
    "You have used all available tool calls. Give your best final answer now, \
     using only the information gathered so far.";

/// Drives one agent through one task
#[derive(Debug, Clone)]
pub struct AgentExecutor {
    model: Arc<dyn LanguageModel>,
    tools: Arc<ToolRegistry>,
    max_iterations: usize,
}

impl AgentExecutor {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        tools: Arc<ToolRegistry>,
        max_iterations: usize,
    ) -> Self {
        Self {
            model,
            tools,
            max_iterations,
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Work on `task` until the model answers without tool calls.
    ///
    /// Recoverable tool failures are shown to the model as the tool result.
    /// After `max_iterations` model rounds the model is asked for a final
    /// answer with no tools offered.
    pub async fn execute(
        &self,
        agent: &Agent,
        task: &Task,
        context: Option<&str>,
        ctx: &mut ResearchContext,
    ) -> Result<String, CrewError> {
        let specs = self.tools.specs_for(&agent.tools);
        let mut messages = vec![
            ChatMessage::system(system_prompt(agent)),
            ChatMessage::user(task_prompt(task, context)),
        ];

        for iteration in 0..self.max_iterations {
            let completion = self.model.complete(&messages, &specs).await?;

            if completion.tool_calls.is_empty() {
                return final_answer(agent, completion.content);
            }

            if let Some(thought) = completion.content.as_deref() {
                log_step(agent, &format!("Thought: {}", thought));
            }
            messages.push(ChatMessage::assistant(
                completion.content.clone(),
                completion.tool_calls.clone(),
            ));

            for call in completion.tool_calls {
                log_step(
                    agent,
                    &format!("Action: {} Input: {}", call.name, call.arguments),
                );

                let observation = if !agent.can_use(&call.name) {
                    format!("Tool '{}' is not available to {}", call.name, agent.role)
                } else {
                    match self.tools.execute(&call.name, ctx, call.arguments).await {
                        Ok(value) => value_to_text(value),
                        Err(e) if e.is_fatal() => return Err(e.into()),
                        Err(e) => format!("Error: {}", e),
                    }
                };

                log_step(agent, &format!("Observation: {}", observation));
                messages.push(ChatMessage::tool_result(call.id, observation));
            }

            tracing::debug!("{}: iteration {} done", agent.role, iteration + 1);
        }

        tracing::warn!(
            "{} reached the iteration limit ({}), forcing a final answer",
            agent.role,
            self.max_iterations
        );
        messages.push(ChatMessage::user(FORCE_FINAL_ANSWER));
        let completion = self.model.complete(&messages, &[]).await?;
        final_answer(agent, completion.content)
    }
}

fn final_answer(agent: &Agent, content: Option<String>) -> Result<String, CrewError> {
    let answer = content
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| CrewError::EmptyAnswer(agent.role.clone()))?;
    log_step(agent, &format!("Final Answer: {}", answer));
    Ok(answer)
}

fn log_step(agent: &Agent, step: &str) {
    if agent.verbose {
        tracing::info!("[{}] {}", agent.role, step);
    } else {
        tracing::debug!("[{}] {}", agent.role, step);
    }
}

fn value_to_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn system_prompt(agent: &Agent) -> String {
    format!(
        "You are {}.\n{}\n\nYour personal goal is: {}",
        agent.role, agent.backstory, agent.goal
    )
}

fn task_prompt(task: &Task, context: Option<&str>) -> String {
    let mut prompt = format!(
        "Current Task: {}\n\nThis is the expected criteria for your final answer: {}\n\
         You MUST return the actual complete content as the final answer, not a summary.",
        task.description, task.expected_output
    );
    if let Some(context) = context {
        prompt.push_str("\n\nThis is the context you're working with:\n");
        prompt.push_str(context);
    }
    prompt
}
