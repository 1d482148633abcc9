//! Interactive console over a crawled or loaded dataset.
//!
//! Entered after `curriculum` finishes loading or crawling, unless
//! `--no-console` is given. Type `/help` for available commands, Tab for
//! completion.

use std::fmt::Write;

use rustyline::completion::{Completer, Pair};
use rustyline::config::CompletionType;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{
    Cmd, ConditionalEventHandler, Config, Editor, Event, EventContext, EventHandler, Helper,
    KeyEvent, RepeatCount,
};

use curriculum_crawler::{Category, CurriculumDataset, ProgramRef, Query};

use crate::config::history_path;

/// Available console commands.
const COMMANDS: &[(&str, &str)] = &[
    ("/units", "List all institutions"),
    ("/unit", "Programs of an institution: /unit <name|acronym>"),
    ("/programs", "List all programs by institution"),
    ("/program", "Program details: /program <institution> <n>"),
    ("/curriculum", "Disciplines of a program: /curriculum <institution> <n>"),
    ("/discipline", "Discipline details: /discipline <code|name>"),
    ("/common", "Disciplines shared by more than one program"),
    ("/search", "Programs whose name contains a term"),
    ("/stats", "Dataset statistics"),
    ("/clear", "Clear the screen"),
    ("/help", "Show available commands"),
    ("/exit", "Quit the console"),
];

/// Commands whose first argument is an institution.
const INSTITUTION_COMMANDS: &[&str] = &["/unit", "/program", "/curriculum"];

/// Console helper for tab completion.
struct ConsoleHelper {
    acronyms: Vec<String>,
}

impl ConsoleHelper {
    fn new(dataset: &CurriculumDataset) -> Self {
        let mut acronyms: Vec<String> = dataset
            .institutions
            .iter()
            .filter_map(|i| acronym(&i.name))
            .map(str::to_string)
            .collect();
        acronyms.sort();
        acronyms.dedup();
        Self { acronyms }
    }
}

/// The acronym written as `( ACR )` at the end of an institution name.
fn acronym(name: &str) -> Option<&str> {
    let open = name.rfind('(')?;
    let close = name[open..].find(')')? + open;
    let inner = name[open + 1..close].trim();
    (!inner.is_empty()).then_some(inner)
}

impl Completer for ConsoleHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let input = &line[..pos];

        if !input.contains(' ') {
            let matches: Vec<Pair> = COMMANDS
                .iter()
                .filter(|(cmd, _)| cmd.starts_with(input))
                .map(|(cmd, desc)| Pair {
                    display: format!("{cmd:<16} {desc}"),
                    replacement: format!("{cmd} "),
                })
                .collect();
            return Ok((0, matches));
        }

        // Institution acronym completion
        let parts: Vec<&str> = input.splitn(2, ' ').collect();
        let cmd = parts[0];
        let args = if parts.len() > 1 { parts[1] } else { "" };

        if INSTITUTION_COMMANDS.contains(&cmd) && !args.contains(' ') {
            let prefix_start = input.len() - args.len();
            let typed = args.to_uppercase();
            let matches: Vec<Pair> = self
                .acronyms
                .iter()
                .filter(|a| a.to_uppercase().starts_with(&typed))
                .map(|a| Pair {
                    display: a.clone(),
                    replacement: format!("{a} "),
                })
                .collect();
            return Ok((prefix_start, matches));
        }

        Ok((pos, Vec::new()))
    }
}

impl Hinter for ConsoleHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        if pos < line.len() || line.is_empty() {
            return None;
        }
        if line.starts_with('/') && !line.contains(' ') {
            for (cmd, _) in COMMANDS {
                if cmd.starts_with(line) && *cmd != line {
                    return Some(cmd[line.len()..].to_string());
                }
            }
        }
        None
    }
}

impl Highlighter for ConsoleHelper {}
impl Validator for ConsoleHelper {}
impl Helper for ConsoleHelper {}

struct TabCompleteOrAcceptHint;

impl ConditionalEventHandler for TabCompleteOrAcceptHint {
    fn handle(
        &self,
        _evt: &Event,
        _n: RepeatCount,
        _positive: bool,
        ctx: &EventContext<'_>,
    ) -> Option<Cmd> {
        if ctx.has_hint() {
            Some(Cmd::CompleteHint)
        } else {
            Some(Cmd::Complete)
        }
    }
}

/// What the loop does after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Command interpreter. Output is written to a buffer so the loop decides
/// where it goes.
pub struct Console<'a> {
    query: Query<'a>,
}

impl<'a> Console<'a> {
    pub fn new(dataset: &'a CurriculumDataset) -> Self {
        Self {
            query: Query::new(dataset),
        }
    }

    /// Run one input line.
    pub fn execute(&self, line: &str, out: &mut String) -> Flow {
        let line = line.trim();
        if line.is_empty() {
            return Flow::Continue;
        }

        let input = line.strip_prefix('/').unwrap_or(line);
        if input.is_empty() {
            self.cmd_help(out);
            return Flow::Continue;
        }

        let mut parts = input.splitn(2, ' ');
        let cmd = parts.next().unwrap_or("");
        let args = parts.next().unwrap_or("").trim();

        match cmd {
            "exit" | "quit" => return Flow::Exit,
            "help" | "h" | "?" => self.cmd_help(out),
            "clear" | "cls" => out.push_str("\x1b[2J\x1b[H"),
            "units" => self.cmd_units(out),
            "unit" => self.cmd_unit(args, out),
            "programs" => self.cmd_programs(out),
            "program" => self.cmd_program(args, out),
            "curriculum" => self.cmd_curriculum(args, out),
            "discipline" => self.cmd_discipline(args, out),
            "common" => self.cmd_common(out),
            "search" => self.cmd_search(args, out),
            "stats" => self.cmd_stats(out),
            _ => {
                let _ = writeln!(out, "  Unknown command '/{cmd}'. Type /help for commands.");
            }
        }
        Flow::Continue
    }

    fn cmd_help(&self, out: &mut String) {
        out.push_str("\n  Commands:\n\n");
        for (cmd, desc) in COMMANDS {
            let _ = writeln!(out, "    {cmd:<18} {desc}");
        }
        out.push_str("\n  Tip: Tab completes commands and institution acronyms.\n\n");
    }

    fn cmd_units(&self, out: &mut String) {
        let institutions = self.query.institutions_sorted();
        if institutions.is_empty() {
            out.push_str("  No institutions loaded.\n");
            return;
        }
        out.push('\n');
        for (i, institution) in institutions.iter().enumerate() {
            let _ = writeln!(out, "  {:2}. {}", i + 1, institution.name);
        }
    }

    fn cmd_unit(&self, args: &str, out: &mut String) {
        if args.is_empty() {
            out.push_str("  Usage: /unit <name|acronym>\n");
            return;
        }
        let Some(institution) = self.query.find_institution(args) else {
            let _ = writeln!(out, "  Institution '{args}' not found.");
            return;
        };

        let _ = writeln!(out, "\n  {}", institution.name);
        let programs = self.query.programs_of(institution);
        if programs.is_empty() {
            out.push_str("    No programs found for this institution.\n");
            return;
        }
        for (i, program) in programs.iter().enumerate() {
            let _ = writeln!(out, "    {}. {}", i + 1, program.name);
        }
    }

    fn cmd_programs(&self, out: &mut String) {
        for institution in self.query.institutions_sorted() {
            if institution.programs.is_empty() {
                continue;
            }
            let _ = writeln!(out, "\n  {}", institution.name);
            for program in self.query.programs_of(institution) {
                let _ = writeln!(out, "    - {}", program.name);
            }
        }
    }

    /// Resolve `<institution> <n>`, where the institution may contain spaces.
    fn program_arg(&self, usage: &str, args: &str, out: &mut String) -> Option<&'a ProgramRef> {
        let Some((institution, number)) = args.rsplit_once(' ') else {
            let _ = writeln!(out, "  Usage: {usage} <institution> <n>");
            return None;
        };
        match self.query.program_by_number(institution.trim(), number) {
            Ok(program) => Some(program),
            Err(e) => {
                let _ = writeln!(out, "  {e}");
                None
            }
        }
    }

    fn cmd_program(&self, args: &str, out: &mut String) {
        let Some(program) = self.program_arg("/program", args, out) else {
            return;
        };
        let d = program.durations;
        let _ = writeln!(out, "\n  {}", program.name);
        let _ = writeln!(out, "    Institution:     {}", program.institution);
        let _ = writeln!(out, "    Ideal duration:  {}", terms(d.ideal));
        let _ = writeln!(out, "    Min duration:    {}", terms(d.min));
        let _ = writeln!(out, "    Max duration:    {}", terms(d.max));
        out.push_str("\n    Disciplines:\n");
        for category in Category::ALL {
            let _ = writeln!(
                out,
                "      {:<20} {}",
                category.label(),
                program.disciplines(category).len()
            );
        }
    }

    fn cmd_curriculum(&self, args: &str, out: &mut String) {
        let Some(program) = self.program_arg("/curriculum", args, out) else {
            return;
        };
        let _ = writeln!(out, "\n  {}", program.name);
        if program.discipline_count() == 0 {
            out.push_str("    No disciplines found for this program.\n");
            return;
        }
        for category in [
            Category::Mandatory,
            Category::RestrictedElective,
            Category::FreeElective,
        ] {
            let list = self.query.curriculum(program, category);
            if list.is_empty() {
                continue;
            }
            let _ = writeln!(out, "\n    {}", category.label());
            for d in list {
                let d = d.borrow();
                let _ = writeln!(out, "      {} - {}", d.code(), d.name());
            }
        }
    }

    fn cmd_discipline(&self, args: &str, out: &mut String) {
        if args.is_empty() {
            out.push_str("  Usage: /discipline <code|name>\n");
            return;
        }
        let discipline = match self.query.find_discipline(args) {
            Ok(d) => d,
            Err(e) => {
                let _ = writeln!(out, "  {e}");
                return;
            }
        };
        let d = discipline.borrow();
        let w = d.workload();
        let _ = writeln!(out, "\n  {} ({})", d.name(), d.code());
        let _ = writeln!(
            out,
            "    Credits:  {} lecture, {} work",
            w.lecture_credits, w.work_credits
        );
        let _ = writeln!(out, "    Hours:    {} total", w.total_hours);
        if w.internship_hours > 0 || w.practice_hours > 0 || w.advanced_activity_units > 0 {
            let _ = writeln!(
                out,
                "    Other:    {} internship, {} practice, {} ATPA",
                w.internship_hours, w.practice_hours, w.advanced_activity_units
            );
        }
        if !d.programs().is_empty() {
            out.push_str("\n    Offered in:\n");
            for (i, name) in d.programs().iter().enumerate() {
                let _ = writeln!(out, "      {}. {name}", i + 1);
            }
        }
    }

    fn cmd_common(&self, out: &mut String) {
        let common = self.query.common_disciplines();
        if common.is_empty() {
            out.push_str("  No discipline is shared by more than one program.\n");
            return;
        }
        out.push('\n');
        for d in common {
            let d = d.borrow();
            let _ = writeln!(
                out,
                "  - {} - {} (used in {} programs)",
                d.code(),
                d.name(),
                d.programs().len()
            );
        }
    }

    fn cmd_search(&self, args: &str, out: &mut String) {
        if args.is_empty() {
            out.push_str("  Usage: /search <term>\n");
            return;
        }
        let found = self.query.search_programs(args);
        if found.is_empty() {
            out.push_str("  No programs found.\n");
            return;
        }
        out.push('\n');
        for program in found {
            let _ = writeln!(out, "  - {} ({})", program.name, program.institution);
        }
    }

    fn cmd_stats(&self, out: &mut String) {
        let stats = self.query.stats();
        if stats.institutions == 0 {
            out.push_str("  No data to compute statistics from.\n");
            return;
        }
        out.push('\n');
        let _ = writeln!(out, "  Institutions:        {}", stats.institutions);
        let _ = writeln!(out, "  Programs:            {}", stats.programs);
        let _ = writeln!(out, "  Unique disciplines:  {}", stats.disciplines);
        if let Some((name, count)) = &stats.most_programs {
            let _ = writeln!(out, "  Most programs:       {name} ({count})");
        }
        if let Some((name, count)) = &stats.most_mandatory {
            let _ = writeln!(out, "  Most mandatory:      {name} ({count} disciplines)");
        }
        match stats.average_ideal_duration {
            Some(avg) => {
                let _ = writeln!(out, "  Avg ideal duration:  {avg:.1} terms");
            }
            None => out.push_str("  Avg ideal duration:  unknown\n"),
        }
        if stats.programs_without_ideal_duration > 0 {
            let _ = writeln!(
                out,
                "  Unknown duration:    {} programs",
                stats.programs_without_ideal_duration
            );
        }
        if stats.unknown_durations > 0 {
            let _ = writeln!(
                out,
                "  Unparsed bounds:     {} of {}",
                stats.unknown_durations,
                stats.programs * 3
            );
        }
        if !stats.most_shared.is_empty() {
            out.push_str("\n  Most shared disciplines:\n");
            for (i, (code, name, count)) in stats.most_shared.iter().enumerate() {
                let _ = writeln!(out, "    {}. {name} ({code}) - {count} programs", i + 1);
            }
        }
    }
}

fn terms(value: u32) -> String {
    if value == 0 {
        "unknown".to_string()
    } else {
        format!("{value} terms")
    }
}

/// Run the interactive console.
pub fn run(dataset: &CurriculumDataset) -> anyhow::Result<()> {
    eprintln!();
    eprintln!(
        "  \x1b[32m\u{25c9}\x1b[0m \x1b[1mcurriculum v{}\x1b[0m \x1b[90m{} institutions, {} programs, {} disciplines\x1b[0m",
        env!("CARGO_PKG_VERSION"),
        dataset.institutions.len(),
        dataset.programs.len(),
        dataset.disciplines.len()
    );
    eprintln!();
    eprintln!(
        "    Press \x1b[36m/\x1b[0m to browse commands, \x1b[90mTab\x1b[0m to complete, \x1b[90m/exit\x1b[0m to quit."
    );
    eprintln!();

    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .completion_type(CompletionType::List)
        .completion_prompt_limit(20)
        .build();

    let mut rl: Editor<ConsoleHelper, rustyline::history::DefaultHistory> =
        Editor::with_config(config)?;
    rl.set_helper(Some(ConsoleHelper::new(dataset)));
    rl.bind_sequence(
        KeyEvent::from('\t'),
        EventHandler::Conditional(Box::new(TabCompleteOrAcceptHint)),
    );

    let hist_path = history_path();
    if hist_path.exists() {
        let _ = rl.load_history(&hist_path);
    }

    let console = Console::new(dataset);
    let prompt = " \x1b[36mcurriculum>\x1b[0m ";

    loop {
        match rl.readline(prompt) {
            Ok(line) => {
                let mut out = String::new();
                let flow = console.execute(&line, &mut out);
                print!("{out}");
                if flow == Flow::Exit {
                    eprintln!("  \x1b[90m\u{2728}\x1b[0m Goodbye!");
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                eprintln!("  \x1b[90m(Ctrl+C)\x1b[0m Type \x1b[1m/exit\x1b[0m to quit.");
            }
            Err(ReadlineError::Eof) => {
                eprintln!("  \x1b[90m\u{2728}\x1b[0m Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("  Error: {err}");
                break;
            }
        }
    }

    let _ = rl.save_history(&hist_path);

    Ok(())
}
