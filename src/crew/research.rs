//! The fixed research crew: an investigator, an analyst and a writer
//! comparing the harm of fried meat and alcohol.

use super::{Agent, Crew, Task};
use crate::mcp::{READ_TOOL, SEARCH_TOOL, WIKIPEDIA_TOOL};

pub const INVESTIGATOR: &str = "Search engine investigator";
pub const ANALYST: &str = "Research Analyst";
pub const WRITER: &str = "Writer";

pub fn research_crew() -> Crew {
    let analyst = Agent::new(
        ANALYST,
        "Analyze big amount of papers and answer question.",
        "PhD in multiple disciplines. 60 years old respectable scientist.",
    )
    .with_tools([READ_TOOL])
    .verbose(true);

    let investigator = Agent::new(
        INVESTIGATOR,
        "Find all required relevant information using available tools and save it \
         into global context.",
        "You're OSINT master and just curious about everything guy.",
    )
    .with_tools([WIKIPEDIA_TOOL, SEARCH_TOOL])
    .verbose(true);

    let writer = Agent::new(
        WRITER,
        "Create engaging content",
        "You're a famous multilingual pop-science writer, specialized on explaining hard \
         questions in an easy, but comprehensive manner. Always answer in the same language \
         in which the task was written.",
    )
    .verbose(true);

    let tasks = vec![
        Task::new(
            "Find information about the harm of fried meat",
            "Confirmation that relevant papers were found and saved, with a short list of \
             what was found",
            INVESTIGATOR,
        ),
        Task::new(
            "Find information about the harm of alcohol",
            "Confirmation that relevant papers were found and saved, with a short list of \
             what was found",
            INVESTIGATOR,
        ),
        Task::new(
            "Which is more harmful - alcohol or steaks?",
            "A reasoned comparison backed by citations from the saved papers",
            ANALYST,
        ),
        Task::new(
            "Write a couple of paragraphs with the results of the analysis of the \
             comparative harm of alcohol and steaks. Use references to scientific works.",
            "Two or three paragraphs of pop-science prose with references to the cited papers",
            WRITER,
        ),
    ];

    Crew::new(vec![analyst, investigator, writer], tasks)
}
