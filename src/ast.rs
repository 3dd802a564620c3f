// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Abstract Syntax Tree types for parsed shell commands.

use super::token::Span;

/// A sequential list of items separated by `;`, `&`, or newlines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandList {
    /// The items in this list, in source order.
    pub items: Vec<ListItem>,
    /// Source span covering the entire list.
    pub span: Span,
}

/// One item of a [`CommandList`]: a boolean chain plus whether it was
/// launched in the background (followed by `&` rather than `;`/newline).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem {
    /// The boolean (`&&`/`||`) chain for this item.
    pub node: AndOrList,
    /// True if this item runs in the background; its completion is awaited
    /// at the close of the enclosing list rather than inline.
    pub background: bool,
    /// Source span.
    pub span: Span,
}

/// A chain of commands connected by `&&` or `||`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AndOrList {
    /// First command in the chain.
    pub first: Command,
    /// Rest of the chain: (operator, command) pairs.
    pub rest: Vec<(LogicalOp, Command)>,
    /// Source span covering the entire chain.
    pub span: Span,
}

/// Logical operator for AND/OR chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    /// `&&` - execute next if previous succeeded
    And,
    /// `||` - execute next if previous failed
    Or,
}

/// A single command in the AST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// A simple command (command name with arguments).
    Simple(SimpleCommand),
    /// A pipeline of two commands connected by `|` or `|&`.
    Pipeline(Pipeline),
    /// A subshell: `(command_list)`.
    Subshell(Subshell),
}

impl Command {
    /// Returns the span covering the entire command.
    pub fn span(&self) -> Span {
        match self {
            Command::Simple(c) => c.span,
            Command::Pipeline(p) => p.span,
            Command::Subshell(s) => s.span,
        }
    }

    /// Flatten a left-deep `Pipeline` chain into an ordered list of stages.
    ///
    /// `a | b | c` parses as `Pipeline(Pipeline(a, b), c)`; this walks that
    /// shape back into `[a, b, c]` so the evaluator can spawn every stage
    /// without recursing through the tree by hand.
    pub fn pipeline_stages(&self) -> Vec<&Command> {
        match self {
            Command::Pipeline(p) => {
                let mut stages = p.left.pipeline_stages();
                stages.push(&p.right);
                stages
            }
            other => vec![other],
        }
    }
}

/// A pipeline connecting two commands: `left | right` or `left |& right`.
///
/// An N-stage pipeline is represented as a left-deep chain of these nodes;
/// see [`Command::pipeline_stages`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    /// Left-hand (upstream) side.
    pub left: Box<Command>,
    /// Right-hand (downstream) side.
    pub right: Box<Command>,
    /// True for `|&` (also splice stderr into the pipe).
    pub stderr_too: bool,
    /// Source span covering the entire pipeline.
    pub span: Span,
}

/// A subshell executes commands against a cloned, discarded context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subshell {
    /// The commands to execute in the subshell.
    pub body: Box<CommandList>,
    /// Redirections attached to this subshell.
    pub redirections: Vec<Redirection>,
    /// Source span including parentheses.
    pub span: Span,
}

/// An environment variable assignment prefix.
///
/// Used for `VAR=value` prefixes in commands like `FOO=bar cmd`. A
/// `SimpleCommand` carrying only assignments and no args is the shell-local
/// assignment form (`VariableAssignment` in the data model); see
/// `exec::run` for how the evaluator distinguishes the two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvAssignment {
    /// The variable name.
    pub name: String,
    /// The assigned value.
    pub value: Word,
    /// Source span for this assignment.
    pub span: Span,
}

/// A redirection attached to a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redirection {
    /// Output redirection: `>` or `>>` or `2>` etc.
    Out {
        /// File descriptor (None = stdout/1)
        fd: Option<u32>,
        /// Target file or word to redirect to
        target: Word,
        /// True for append (`>>`), false for overwrite (`>`)
        append: bool,
    },
    /// Input redirection: `<`
    In {
        /// File descriptor (None = stdin/0)
        fd: Option<u32>,
        /// Source file to redirect from
        source: Word,
    },
    /// File descriptor duplication: `n>&m`, `n<&m`, or `n>&-` / `n<&-`
    Duplicate {
        /// Source file descriptor
        source: u32,
        /// Target file descriptor or close
        target: super::token::DupTarget,
        /// True for output dup (`>&`), false for input dup (`<&`)
        output: bool,
    },
}

impl Redirection {
    /// Span of the trailing word (target/source), if any.
    pub fn target_span(&self) -> Option<Span> {
        match self {
            Redirection::Out { target, .. } => Some(target.span),
            Redirection::In { source, .. } => Some(source.span),
            Redirection::Duplicate { .. } => None,
        }
    }
}

/// A simple command: optional env assignments, a command name, and arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleCommand {
    /// Environment variable assignments that prefix the command.
    pub env: Vec<EnvAssignment>,
    /// The command name (first word after assignments).
    pub name: Word,
    /// Command arguments (remaining words).
    pub args: Vec<Word>,
    /// Redirections attached to this command.
    pub redirections: Vec<Redirection>,
    /// Source span covering the entire command.
    pub span: Span,
}

/// A word in a command (can be literal, variable, etc.).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    /// The parts that make up this word.
    pub parts: Vec<WordPart>,
    /// Source span for this word.
    pub span: Span,
}

/// Quoting style for literal text in the AST.
///
/// Preserved from parsing so the evaluator knows variable expansion inside
/// single quotes never happens (`'$VAR'` is literal, `"$VAR"`/`$VAR` expand).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuoteStyle {
    /// Unquoted literal.
    #[default]
    Unquoted,
    /// Single-quoted literal (no expansion).
    Single,
    /// Double-quoted literal (variable/command expansion enabled).
    Double,
}

/// Command substitution body — unparsed at the token level, parsed in the AST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubstitutionBody {
    /// Unparsed source text (as produced by the lexer).
    Unparsed(String),
    /// Parsed AST (as produced by the parser).
    Parsed(Box<CommandList>),
}

/// A part of a word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordPart {
    /// Literal text with quoting information.
    Literal {
        /// The text content.
        value: String,
        /// How this literal was quoted in the source.
        quoted: QuoteStyle,
    },
    /// Variable reference (`$NAME` or `${NAME}`).
    Variable {
        /// The variable name.
        name: String,
    },
    /// Command substitution.
    CommandSubstitution {
        /// The substitution body (unparsed at token level, parsed in AST).
        body: SubstitutionBody,
        /// True if backtick syntax was used.
        backtick: bool,
    },
}

impl WordPart {
    /// Create an unquoted literal.
    pub fn literal(value: impl Into<String>) -> Self {
        WordPart::Literal {
            value: value.into(),
            quoted: QuoteStyle::Unquoted,
        }
    }

    /// Create a single-quoted literal.
    pub fn single_quoted(value: impl Into<String>) -> Self {
        WordPart::Literal {
            value: value.into(),
            quoted: QuoteStyle::Single,
        }
    }

    /// Create a double-quoted literal.
    pub fn double_quoted(value: impl Into<String>) -> Self {
        WordPart::Literal {
            value: value.into(),
            quoted: QuoteStyle::Double,
        }
    }
}

// ── Utility methods ──────────────────────────────────────────────────────

impl CommandList {
    /// Convenience wrapper around [`Parser::parse`].
    ///
    /// [`Parser::parse`]: super::parser::Parser::parse
    pub fn parse(input: &str) -> Result<Self, super::parse_error::ParseError> {
        super::parser::Parser::parse(input)
    }

    /// Count the total number of simple commands in the AST.
    pub fn count_simple_commands(&self) -> usize {
        struct Counter(usize);
        impl AstVisitor for Counter {
            fn visit_simple_command(&mut self, cmd: &SimpleCommand) {
                self.0 += 1;
                self.walk_simple_command(cmd);
            }
        }
        let mut counter = Counter(0);
        counter.visit_command_list(self);
        counter.0
    }

    /// Collect all variable names referenced in the AST.
    ///
    /// Returns a de-duplicated list of variable names in the order they
    /// first appear. Includes variables in double-quoted strings,
    /// unquoted expansions, and command substitutions.
    pub fn collect_variables(&self) -> Vec<String> {
        struct Collector(Vec<String>);
        impl AstVisitor for Collector {
            fn visit_word_part(&mut self, part: &WordPart) {
                if let WordPart::Variable { name } = part {
                    if !self.0.contains(name) {
                        self.0.push(name.clone());
                    }
                }
                self.walk_word_part(part);
            }
        }
        let mut collector = Collector(Vec::new());
        collector.visit_command_list(self);
        collector.0
    }

    /// Check if the AST contains any `$(...)` or backtick substitutions,
    /// including nested inside other substitutions.
    pub fn has_command_substitutions(&self) -> bool {
        struct Finder(bool);
        impl AstVisitor for Finder {
            fn visit_word_part(&mut self, part: &WordPart) {
                if matches!(part, WordPart::CommandSubstitution { .. }) {
                    self.0 = true;
                }
                self.walk_word_part(part);
            }
        }
        let mut finder = Finder(false);
        finder.visit_command_list(self);
        finder.0
    }

    /// Get the maximum nesting depth of subshells.
    ///
    /// Returns 0 for a flat command list. Does not count command substitutions.
    pub fn max_nesting_depth(&self) -> usize {
        struct DepthTracker {
            current: usize,
            max: usize,
        }
        impl AstVisitor for DepthTracker {
            fn visit_subshell(&mut self, subshell: &Subshell) {
                self.current += 1;
                self.max = self.max.max(self.current);
                self.walk_subshell(subshell);
                self.current -= 1;
            }
        }
        let mut tracker = DepthTracker { current: 0, max: 0 };
        tracker.visit_command_list(self);
        tracker.max
    }
}

// ── Visitor ──────────────────────────────────────────────────────────────

/// Visitor pattern for walking the shell AST.
///
/// Each `visit_*` method has a corresponding `walk_*` method. The `visit_*`
/// method is called at a node, and can call `walk_*` to descend into children.
/// To stop traversal at a node, simply don't call `walk_*`.
pub trait AstVisitor {
    fn visit_command_list(&mut self, cmd_list: &CommandList) {
        self.walk_command_list(cmd_list);
    }

    fn visit_list_item(&mut self, item: &ListItem) {
        self.walk_list_item(item);
    }

    fn visit_and_or_list(&mut self, and_or: &AndOrList) {
        self.walk_and_or_list(and_or);
    }

    fn visit_command(&mut self, command: &Command) {
        self.walk_command(command);
    }

    fn visit_simple_command(&mut self, cmd: &SimpleCommand) {
        self.walk_simple_command(cmd);
    }

    fn visit_pipeline(&mut self, pipeline: &Pipeline) {
        self.walk_pipeline(pipeline);
    }

    fn visit_subshell(&mut self, subshell: &Subshell) {
        self.walk_subshell(subshell);
    }

    fn visit_word(&mut self, word: &Word) {
        self.walk_word(word);
    }

    fn visit_word_part(&mut self, part: &WordPart) {
        self.walk_word_part(part);
    }

    fn visit_env_assignment(&mut self, assignment: &EnvAssignment) {
        self.walk_env_assignment(assignment);
    }

    fn visit_redirection(&mut self, redir: &Redirection) {
        self.walk_redirection(redir);
    }

    fn walk_command_list(&mut self, cmd_list: &CommandList) {
        for item in &cmd_list.items {
            self.visit_list_item(item);
        }
    }

    fn walk_list_item(&mut self, item: &ListItem) {
        self.visit_and_or_list(&item.node);
    }

    fn walk_and_or_list(&mut self, and_or: &AndOrList) {
        self.visit_command(&and_or.first);
        for (_, command) in &and_or.rest {
            self.visit_command(command);
        }
    }

    fn walk_command(&mut self, command: &Command) {
        match command {
            Command::Simple(cmd) => self.visit_simple_command(cmd),
            Command::Pipeline(p) => self.visit_pipeline(p),
            Command::Subshell(s) => self.visit_subshell(s),
        }
    }

    fn walk_simple_command(&mut self, cmd: &SimpleCommand) {
        for env in &cmd.env {
            self.visit_env_assignment(env);
        }
        self.visit_word(&cmd.name);
        for arg in &cmd.args {
            self.visit_word(arg);
        }
        for redir in &cmd.redirections {
            self.visit_redirection(redir);
        }
    }

    fn walk_env_assignment(&mut self, assignment: &EnvAssignment) {
        self.visit_word(&assignment.value);
    }

    fn walk_redirection(&mut self, redir: &Redirection) {
        match redir {
            Redirection::Out { target, .. } => self.visit_word(target),
            Redirection::In { source, .. } => self.visit_word(source),
            Redirection::Duplicate { .. } => {}
        }
    }

    fn walk_pipeline(&mut self, pipeline: &Pipeline) {
        self.visit_command(&pipeline.left);
        self.visit_command(&pipeline.right);
    }

    fn walk_subshell(&mut self, subshell: &Subshell) {
        self.visit_command_list(&subshell.body);
        for redir in &subshell.redirections {
            self.visit_redirection(redir);
        }
    }

    fn walk_word(&mut self, word: &Word) {
        for part in &word.parts {
            self.visit_word_part(part);
        }
    }

    fn walk_word_part(&mut self, part: &WordPart) {
        if let WordPart::CommandSubstitution { body: SubstitutionBody::Parsed(body), .. } = part {
            self.visit_command_list(body);
        }
    }
}

#[cfg(test)]
#[path = "ast_tests.rs"]
mod tests;
