//! Recursion unrolling for shading languages that forbid recursive calls.
//!
//! A group of mutually recursive functions is marked up with line-comment
//! directives:
//!
//! ```text
//! // rec:func trace            next line must declare `fn trace(`
//! // rec:endfunc trace
//! // rec:if bounce             code that only exists while deeper levels remain
//! // rec:endif bounce
//! // rec:call shade            next line calls `shade(` at the same depth
//! // rec:rec-call trace        next line calls `trace(` one level deeper
//! ```
//!
//! [`RecursiveSource::parse`] turns the text into a small IR. Then
//! [`RecursiveSource::unroll`] emits one copy of every marked function per
//! depth level. Level 0 keeps the original names; level `i` is suffixed
//! `_d{i}`. The last level drops every depth block, so the call graph ends
//! there.

use thiserror::Error;

/// Grammar and structure errors in marked shader source.
///
/// These point at a broken template rather than bad input data; no shader is
/// built from a source that produces one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranspileError {
    #[error("line {line}: unknown directive `rec:{directive}`")]
    UnknownDirective { line: usize, directive: String },

    #[error("line {line}: malformed directive `{text}`")]
    MalformedDirective { line: usize, text: String },

    #[error("line {line}: `rec:func {name}` opened inside function `{open}`")]
    NestedFunction { line: usize, name: String, open: String },

    #[error("line {line}: expected `fn {name}(` after `rec:func {name}`")]
    MissingDeclaration { line: usize, name: String },

    #[error("line {line}: `rec:{directive} {found}` does not close `{expected}`")]
    MismatchedEnd {
        line: usize,
        directive: &'static str,
        expected: String,
        found: String,
    },

    #[error("line {line}: `rec:{directive}` outside any marked function")]
    OutsideFunction { line: usize, directive: String },

    #[error("line {line}: depth block `{name}` opened inside depth block `{open}`")]
    NestedBlock { line: usize, name: String, open: String },

    #[error("line {line}: function `{function}` closed inside depth block `{block}`")]
    UnclosedBlock {
        line: usize,
        function: String,
        block: String,
    },

    #[error("function `{name}` is never closed")]
    UnclosedFunction { name: String },

    #[error("line {line}: function `{name}` is marked twice")]
    DuplicateFunction { line: usize, name: String },

    #[error("line {line}: call marker for `{callee}` is not followed by a call to it")]
    MissingCallSite { line: usize, callee: String },

    #[error("line {line}: `{callee}` is not a marked function")]
    UnknownCallee { line: usize, callee: String },

    #[error("line {line}: call to `{callee}` in `{function}` has no `rec:call` or `rec:rec-call` marker")]
    UnmarkedCall {
        line: usize,
        function: String,
        callee: String,
    },

    #[error("line {line}: recursive call to `{callee}` outside a depth block never terminates")]
    UnguardedRecursion { line: usize, callee: String },

    #[error("maximum depth must be at least 1")]
    ZeroDepth,

    #[error("scene marker `scene:{0}` not found")]
    MissingSceneMarker(&'static str),
}

/// How a marked call site is retargeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// Stays on the caller's depth level.
    Forward,
    /// Targets the next depth level.
    Recursive,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallSite {
    pub kind: CallKind,
    pub callee: String,
    /// 1-based line of the call in the original source.
    pub line: usize,
    text: String,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Call(CallSite),
    Block(DepthBlock),
}

/// Code kept only on levels that may still recurse.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthBlock {
    pub name: String,
    body: Vec<Node>,
}

/// One marked function.
#[derive(Debug, Clone, PartialEq)]
pub struct RecFunction {
    pub name: String,
    declaration: String,
    body: Vec<Node>,
}

impl RecFunction {
    /// Depth blocks in source order.
    pub fn blocks(&self) -> impl Iterator<Item = &DepthBlock> {
        self.body.iter().filter_map(|node| match node {
            Node::Block(block) => Some(block),
            _ => None,
        })
    }

    /// Every marked call, including those inside depth blocks.
    pub fn calls(&self) -> Vec<&CallSite> {
        let mut calls = Vec::new();
        collect_calls(&self.body, &mut calls);
        calls
    }
}

fn collect_calls<'a>(nodes: &'a [Node], out: &mut Vec<&'a CallSite>) {
    for node in nodes {
        match node {
            Node::Call(call) => out.push(call),
            Node::Block(block) => collect_calls(&block.body, out),
            Node::Text(_) => {}
        }
    }
}

/// Parsed source: unmarked code plus the marked recursive group.
#[derive(Debug, Clone, PartialEq)]
pub struct RecursiveSource {
    regular: Vec<String>,
    functions: Vec<RecFunction>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Directive<'a> {
    Func(&'a str),
    EndFunc(&'a str),
    If(&'a str),
    EndIf(&'a str),
    Call(&'a str),
    RecCall(&'a str),
}

/// Recognize `// rec:<kind> <name>`. Other lines are ordinary code.
fn parse_directive(line_no: usize, line: &str) -> Result<Option<Directive<'_>>, TranspileError> {
    let Some(rest) = line.trim_start().strip_prefix("//") else {
        return Ok(None);
    };
    let Some(rest) = rest.trim_start().strip_prefix("rec:") else {
        return Ok(None);
    };

    let mut parts = rest.split_whitespace();
    let (Some(kind), Some(name), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(TranspileError::MalformedDirective {
            line: line_no,
            text: line.trim().to_string(),
        });
    };

    let directive = match kind {
        "func" => Directive::Func(name),
        "endfunc" => Directive::EndFunc(name),
        "if" => Directive::If(name),
        "endif" => Directive::EndIf(name),
        "call" => Directive::Call(name),
        "rec-call" => Directive::RecCall(name),
        _ => {
            return Err(TranspileError::UnknownDirective {
                line: line_no,
                directive: kind.to_string(),
            })
        }
    };
    Ok(Some(directive))
}

/// Function being collected by the parser.
struct OpenFunction {
    name: String,
    declaration: String,
    body: Vec<Node>,
    block: Option<DepthBlock>,
}

impl OpenFunction {
    fn push(&mut self, node: Node) {
        match &mut self.block {
            Some(block) => block.body.push(node),
            None => self.body.push(node),
        }
    }
}

impl RecursiveSource {
    /// Parse marked source text.
    pub fn parse(source: &str) -> Result<Self, TranspileError> {
        let mut regular = Vec::new();
        let mut functions: Vec<RecFunction> = Vec::new();
        let mut open: Option<OpenFunction> = None;
        // plain lines inside marked functions, checked once the group is known
        let mut plain = Vec::new();

        let mut lines = source.lines().enumerate().map(|(i, text)| (i + 1, text));
        while let Some((line_no, text)) = lines.next() {
            let Some(directive) = parse_directive(line_no, text)? else {
                match &mut open {
                    Some(function) => {
                        plain.push((line_no, function.name.clone(), text));
                        function.push(Node::Text(text.to_string()));
                    }
                    None => regular.push(text.to_string()),
                }
                continue;
            };

            match directive {
                Directive::Func(name) => {
                    if let Some(function) = &open {
                        return Err(TranspileError::NestedFunction {
                            line: line_no,
                            name: name.to_string(),
                            open: function.name.clone(),
                        });
                    }
                    if functions.iter().any(|f| f.name == name) {
                        return Err(TranspileError::DuplicateFunction {
                            line: line_no,
                            name: name.to_string(),
                        });
                    }
                    let pattern = format!("fn {name}(");
                    let declaration = match lines.next() {
                        Some((_, next)) if next.contains(&pattern) => next.to_string(),
                        _ => {
                            return Err(TranspileError::MissingDeclaration {
                                line: line_no,
                                name: name.to_string(),
                            })
                        }
                    };
                    open = Some(OpenFunction {
                        name: name.to_string(),
                        declaration,
                        body: Vec::new(),
                        block: None,
                    });
                }
                Directive::EndFunc(name) => {
                    let Some(function) = open.take() else {
                        return Err(TranspileError::OutsideFunction {
                            line: line_no,
                            directive: "endfunc".into(),
                        });
                    };
                    if function.name != name {
                        return Err(TranspileError::MismatchedEnd {
                            line: line_no,
                            directive: "endfunc",
                            expected: function.name,
                            found: name.to_string(),
                        });
                    }
                    if let Some(block) = function.block {
                        return Err(TranspileError::UnclosedBlock {
                            line: line_no,
                            function: function.name,
                            block: block.name,
                        });
                    }
                    functions.push(RecFunction {
                        name: function.name,
                        declaration: function.declaration,
                        body: function.body,
                    });
                }
                Directive::If(name) => {
                    let Some(function) = &mut open else {
                        return Err(TranspileError::OutsideFunction {
                            line: line_no,
                            directive: "if".into(),
                        });
                    };
                    if let Some(block) = &function.block {
                        return Err(TranspileError::NestedBlock {
                            line: line_no,
                            name: name.to_string(),
                            open: block.name.clone(),
                        });
                    }
                    function.block = Some(DepthBlock {
                        name: name.to_string(),
                        body: Vec::new(),
                    });
                }
                Directive::EndIf(name) => {
                    let Some(function) = &mut open else {
                        return Err(TranspileError::OutsideFunction {
                            line: line_no,
                            directive: "endif".into(),
                        });
                    };
                    let Some(block) = function.block.take() else {
                        return Err(TranspileError::OutsideFunction {
                            line: line_no,
                            directive: "endif".into(),
                        });
                    };
                    if block.name != name {
                        return Err(TranspileError::MismatchedEnd {
                            line: line_no,
                            directive: "endif",
                            expected: block.name,
                            found: name.to_string(),
                        });
                    }
                    function.body.push(Node::Block(block));
                }
                Directive::Call(callee) | Directive::RecCall(callee) => {
                    let kind = if matches!(directive, Directive::Call(_)) {
                        CallKind::Forward
                    } else {
                        CallKind::Recursive
                    };
                    let Some(function) = &mut open else {
                        return Err(TranspileError::OutsideFunction {
                            line: line_no,
                            directive: match kind {
                                CallKind::Forward => "call".into(),
                                CallKind::Recursive => "rec-call".into(),
                            },
                        });
                    };
                    let call_site = lines
                        .next()
                        .filter(|(next_no, next)| {
                            !matches!(parse_directive(*next_no, next), Ok(Some(_)) | Err(_))
                                && find_call(next, callee).is_some()
                        });
                    let Some((call_line, text)) = call_site else {
                        return Err(TranspileError::MissingCallSite {
                            line: line_no,
                            callee: callee.to_string(),
                        });
                    };
                    if kind == CallKind::Recursive && function.block.is_none() {
                        return Err(TranspileError::UnguardedRecursion {
                            line: call_line,
                            callee: callee.to_string(),
                        });
                    }
                    function.push(Node::Call(CallSite {
                        kind,
                        callee: callee.to_string(),
                        line: call_line,
                        text: text.to_string(),
                    }));
                }
            }
        }

        if let Some(function) = open {
            return Err(TranspileError::UnclosedFunction { name: function.name });
        }

        let source = Self { regular, functions };
        for function in &source.functions {
            for call in function.calls() {
                if source.function(&call.callee).is_none() {
                    return Err(TranspileError::UnknownCallee {
                        line: call.line,
                        callee: call.callee.clone(),
                    });
                }
            }
        }
        for (line, function, text) in plain {
            let code = text.find("//").map_or(text, |at| &text[..at]);
            if let Some(callee) = source.functions.iter().find(|f| find_call(code, &f.name).is_some()) {
                return Err(TranspileError::UnmarkedCall {
                    line,
                    function,
                    callee: callee.name.clone(),
                });
            }
        }
        Ok(source)
    }

    /// Marked functions in declaration order.
    pub fn functions(&self) -> &[RecFunction] {
        &self.functions
    }

    pub fn function(&self, name: &str) -> Option<&RecFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Unmarked lines, in order.
    pub fn regular(&self) -> &[String] {
        &self.regular
    }

    /// Emit the regular code followed by `max_depth` specialized copies of
    /// every marked function.
    pub fn unroll(&self, max_depth: u32) -> Result<String, TranspileError> {
        if max_depth == 0 {
            return Err(TranspileError::ZeroDepth);
        }

        let mut out = String::new();
        for line in &self.regular {
            out.push_str(line);
            out.push('\n');
        }

        for depth in 0..max_depth {
            let leaf = depth + 1 == max_depth;
            for function in &self.functions {
                out.push('\n');
                out.push_str(&rename_call(&function.declaration, &function.name, &specialized_name(&function.name, depth)));
                out.push('\n');
                emit_nodes(&function.body, depth, leaf, &mut out);
            }
        }
        Ok(out)
    }
}

fn emit_nodes(nodes: &[Node], depth: u32, leaf: bool, out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => {
                out.push_str(text);
                out.push('\n');
            }
            Node::Call(call) => {
                let target = match call.kind {
                    CallKind::Forward => specialized_name(&call.callee, depth),
                    CallKind::Recursive => specialized_name(&call.callee, depth + 1),
                };
                out.push_str(&rename_call(&call.text, &call.callee, &target));
                out.push('\n');
            }
            Node::Block(block) => {
                if !leaf {
                    emit_nodes(&block.body, depth, leaf, out);
                }
            }
        }
    }
}

/// Name of the copy of `name` at `depth`.
pub fn specialized_name(name: &str, depth: u32) -> String {
    if depth == 0 {
        name.to_string()
    } else {
        format!("{name}_d{depth}")
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Byte offset of the first `name(` in `line` that is not the tail of a
/// longer identifier.
fn find_call(line: &str, name: &str) -> Option<usize> {
    let pattern = format!("{name}(");
    let mut from = 0;
    while let Some(offset) = line[from..].find(&pattern) {
        let at = from + offset;
        let standalone = line[..at].chars().next_back().is_none_or(|c| !is_ident_char(c));
        if standalone {
            return Some(at);
        }
        from = at + pattern.len();
    }
    None
}

/// Replace every standalone `name(` in `line` with `target(`.
fn rename_call(line: &str, name: &str, target: &str) -> String {
    let mut out = String::with_capacity(line.len() + 4);
    let mut rest = line;
    while let Some(at) = find_call(rest, name) {
        out.push_str(&rest[..at]);
        out.push_str(target);
        rest = &rest[at + name.len()..];
    }
    out.push_str(rest);
    out
}
