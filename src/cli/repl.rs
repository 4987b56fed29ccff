//! Interactive chat loop.

use std::io::{Write, stdout};

use crossterm::{
    cursor::MoveTo,
    execute,
    style::Stylize,
    terminal::{Clear, ClearType},
};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::agent::{FinalResult, GroundingAgent};

const BANNER: &str = r#"
+--------------------------------------------------------------+
|                                                              |
|                   GEMINI GROUNDING AGENT                     |
|                                                              |
|     Two-Stage AI Agent with Multiple Tools & Grounding       |
|                                                              |
+--------------------------------------------------------------+
"#;

const HELP: &str = "
Available Commands:
  - Type your query and press Enter
  - 'help' - Show this help message
  - 'tools' - List available tools
  - 'examples' - Show example queries
  - 'search on/off' - Toggle Google Search grounding
  - 'clear' - Clear screen
  - 'quit' or 'exit' - Exit the application

Example Queries:
  - \"What's the weather in London and what is 450 * 0.25?\"
  - \"Calculate the square root of 256 and tell me today's date\"
  - \"What are the latest AI developments?\" (uses web search)
  - \"Analyze this text: 'I love this product! It's amazing!'\"
";

const EXAMPLES: &str = "
Example Queries:

1. Multiple Tools:
   \"What's the weather in San Francisco and calculate 15 * 23?\"

2. Date & Math:
   \"What's today's date and what's the square root of 144?\"

3. Web Search (requires search grounding):
   \"What was the score of the latest Lakers game?\"

4. Text Analysis:
   \"Analyze this text: 'This is a wonderful day! I feel great!'\"

5. Weather & Time:
   \"What's the weather in Tokyo and what time is it now?\"

6. Complex Math:
   \"Calculate: (25 * 4) + sqrt(169) - 10\"
";

/// A line typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Empty,
    Help,
    Tools,
    Examples,
    SearchOn,
    SearchOff,
    Clear,
    Quit,
    Query(String),
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        match trimmed.to_lowercase().as_str() {
            "" => Self::Empty,
            "help" => Self::Help,
            "tools" => Self::Tools,
            "examples" => Self::Examples,
            "search on" => Self::SearchOn,
            "search off" => Self::SearchOff,
            "clear" => Self::Clear,
            "quit" | "exit" | "q" => Self::Quit,
            _ => Self::Query(trimmed.to_string()),
        }
    }
}

/// Run the chat loop until the user quits or closes input.
pub async fn run_repl(agent: &GroundingAgent, search: bool) -> anyhow::Result<()> {
    let mut editor = DefaultEditor::new()?;
    let mut use_search = search;

    println!("{}", BANNER.cyan());
    println!(
        "{} Agent ready ({}). Type 'help' for commands.\n",
        "✓".green(),
        agent.model_name()
    );

    loop {
        let line = match editor.readline("You: ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(e) => return Err(e.into()),
        };

        let command = ReplCommand::parse(&line);
        if !matches!(command, ReplCommand::Empty) {
            let _ = editor.add_history_entry(line.trim());
        }

        match command {
            ReplCommand::Empty => {}
            ReplCommand::Quit => {
                println!("\nGoodbye!");
                break;
            }
            ReplCommand::Help => println!("{}", HELP),
            ReplCommand::Tools => {
                println!("\n{}", "Available Tools:".bold());
                println!("{}", agent.tools().descriptions());
                println!("- Google Search: web grounding for factual queries");
            }
            ReplCommand::Examples => println!("{}", EXAMPLES),
            ReplCommand::SearchOn => {
                use_search = true;
                println!("{} Google Search grounding enabled", "✓".green());
            }
            ReplCommand::SearchOff => {
                use_search = false;
                println!("{} Google Search grounding disabled", "✓".green());
            }
            ReplCommand::Clear => {
                execute!(stdout(), Clear(ClearType::All), MoveTo(0, 0))?;
                println!("{}", BANNER.cyan());
            }
            ReplCommand::Query(query) => match agent.process_query(&query, use_search, false).await {
                Ok(result) => display_result(&result),
                Err(e) => println!("{} {}", "Error:".red().bold(), e),
            },
        }
        stdout().flush()?;
    }

    Ok(())
}

fn display_result(result: &FinalResult) {
    println!("\n{}", "FINAL RESULT".bold().underlined());
    if result.is_success() {
        println!("\n{}", result.final_answer);
    } else {
        println!("\n{}", result.final_answer.as_str().red());
    }

    let tools = result.tools_used();
    if !tools.is_empty() {
        println!("\n{} {}", "Tools used:".dark_grey(), tools.join(", "));
    }

    let sources = result.source_count();
    if sources > 0 {
        println!("{} {} web pages", "Sources:".dark_grey(), sources);
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(ReplCommand::parse("   "), ReplCommand::Empty);
        assert_eq!(ReplCommand::parse("HELP"), ReplCommand::Help);
        assert_eq!(ReplCommand::parse(" tools "), ReplCommand::Tools);
        assert_eq!(ReplCommand::parse("examples"), ReplCommand::Examples);
        assert_eq!(ReplCommand::parse("Search On"), ReplCommand::SearchOn);
        assert_eq!(ReplCommand::parse("search off"), ReplCommand::SearchOff);
        assert_eq!(ReplCommand::parse("clear"), ReplCommand::Clear);
        for quit in ["quit", "exit", "Q"] {
            assert_eq!(ReplCommand::parse(quit), ReplCommand::Quit);
        }
    }

    #[test]
    fn test_other_lines_are_queries() {
        assert_eq!(
            ReplCommand::parse("  What is sqrt(144)? "),
            ReplCommand::Query("What is sqrt(144)?".to_string())
        );
        assert_eq!(
            ReplCommand::parse("search the web"),
            ReplCommand::Query("search the web".to_string())
        );
    }
}
