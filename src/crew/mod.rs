//! Role-specialized agents working through tasks in sequence.
//!
//! A [`Crew`] owns its agents and an ordered task list. [`Crew::kickoff`]
//! runs the tasks strictly one after another; each task sees the previous
//! task's output as context.

mod executor;
mod research;

pub use executor::AgentExecutor;
pub use research::research_crew;

use serde::Serialize;

use crate::llm::LlmError;
use crate::mcp::ToolError;
use crate::research::ResearchContext;

/// Errors that stop a crew run
#[derive(Debug, thiserror::Error)]
pub enum CrewError {
    #[error("No agent with role '{0}'")]
    UnknownAgent(String),

    #[error("Crew has no tasks")]
    NoTasks,

    #[error("Agent '{0}' gave no final answer")]
    EmptyAnswer(String),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Tool(#[from] ToolError),
}

/// A language-model persona with a set of tools
#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    pub role: String,
    pub goal: String,
    pub backstory: String,
    /// Names of the registry tools this agent may call
    pub tools: Vec<String>,
    pub verbose: bool,
}

impl Agent {
    pub fn new(
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
    ) -> Self {
        Self {
            role: role.into(),
            goal: goal.into(),
            backstory: backstory.into(),
            tools: Vec::new(),
            verbose: false,
        }
    }

    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools = tools.into_iter().map(Into::into).collect();
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn can_use(&self, tool: &str) -> bool {
        self.tools.iter().any(|t| t == tool)
    }
}

/// A unit of work assigned to one agent, by role
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub description: String,
    pub expected_output: String,
    pub agent: String,
}

impl Task {
    pub fn new(
        description: impl Into<String>,
        expected_output: impl Into<String>,
        agent: impl Into<String>,
    ) -> Self {
        Self {
            description: description.into(),
            expected_output: expected_output.into(),
            agent: agent.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskOutput {
    pub description: String,
    pub agent: String,
    pub output: String,
}

/// Outputs of every task, in execution order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrewOutput {
    pub tasks: Vec<TaskOutput>,
}

impl CrewOutput {
    /// Output of the last task
    pub fn final_output(&self) -> &str {
        self.tasks.last().map(|t| t.output.as_str()).unwrap_or_default()
    }
}

/// Agents plus their ordered tasks
#[derive(Debug, Clone)]
pub struct Crew {
    agents: Vec<Agent>,
    tasks: Vec<Task>,
}

impl Crew {
    pub fn new(agents: Vec<Agent>, tasks: Vec<Task>) -> Self {
        Self { agents, tasks }
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    fn agent(&self, role: &str) -> Result<&Agent, CrewError> {
        self.agents
            .iter()
            .find(|a| a.role == role)
            .ok_or_else(|| CrewError::UnknownAgent(role.to_string()))
    }

    /// Run every task in order.
    ///
    /// Agent assignments are checked before the first task starts.
    pub async fn kickoff(
        &self,
        executor: &AgentExecutor,
        ctx: &mut ResearchContext,
    ) -> Result<CrewOutput, CrewError> {
        if self.tasks.is_empty() {
            return Err(CrewError::NoTasks);
        }
        for task in &self.tasks {
            self.agent(&task.agent)?;
        }

        let mut outputs: Vec<TaskOutput> = Vec::with_capacity(self.tasks.len());

        for (i, task) in self.tasks.iter().enumerate() {
            let agent = self.agent(&task.agent)?;
            tracing::info!(
                "Task {}/{} [{}]: {}",
                i + 1,
                self.tasks.len(),
                agent.role,
                task.description
            );

            let context = outputs.last().map(|o| o.output.as_str());
            let output = executor.execute(agent, task, context, ctx).await?;

            tracing::info!("Task {}/{} finished", i + 1, self.tasks.len());
            outputs.push(TaskOutput {
                description: task.description.clone(),
                agent: agent.role.clone(),
                output,
            });
        }

        Ok(CrewOutput { tasks: outputs })
    }
}
