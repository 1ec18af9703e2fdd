use crate::project::{Block, BlockMap, Input, InputValue, Primitive, PrimitiveKind, Target};
use crate::tables;
use regex::{Captures, Regex};
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::{debug, warn};

pub const INDENT_STEP: usize = 2;

/// Reporter nesting beyond this renders as a placeholder. Also bounds
/// cyclic input references.
const MAX_EXPRESSION_DEPTH: usize = 128;

const INPUT_PLACEHOLDER: &str = "[?]";
const FIELD_PLACEHOLDER: &str = "?";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub root_id: String,
    pub text: String,
    /// The walk hit a block it had already rendered and stopped there.
    pub truncated: bool,
}

pub fn resolve_field(block: &Block, field_name: &str) -> String {
    let Some(field) = block.fields.get(field_name) else {
        return FIELD_PLACEHOLDER.to_string();
    };
    let mut value = field.value().to_string();
    if let Some(label) = tables::field_label(field_name, &value) {
        value = label.to_string();
    }
    if tables::is_lowercase_constant(&value) {
        value = value.to_lowercase();
    }
    let value = strip_sentinel(&value);
    if tables::is_dropdown_field(field_name) && !tables::is_name_reporter(&block.opcode) {
        format!("[{} v]", value)
    } else {
        value.to_string()
    }
}

pub fn resolve_input(block: &Block, input_name: &str, blocks: &BlockMap) -> String {
    input_text(block, input_name, blocks, 0)
}

pub fn render_block(block: &Block, blocks: &BlockMap, indent: usize) -> String {
    indent_lines(&block_text(block, blocks, 0), indent)
}

/// Ids of blocks that start a script: never some block's `next`, no parent.
/// Order follows the block table.
pub fn script_roots(target: &Target) -> Vec<&str> {
    let referenced: HashSet<&str> = target
        .blocks
        .values()
        .filter_map(|b| b.next.as_deref())
        .collect();
    target
        .blocks
        .iter()
        .filter(|(id, block)| !referenced.contains(id) && block.parent.is_none())
        .map(|(id, _)| id)
        .collect()
}

pub fn render_script(root_id: &str, blocks: &BlockMap) -> Script {
    let mut walker = ScriptWalker::new(blocks);
    walker.walk(root_id);
    Script {
        root_id: root_id.to_string(),
        text: walker.lines.join("\n"),
        truncated: walker.truncated,
    }
}

pub fn convert_target(target: &Target) -> Vec<Script> {
    let scripts: Vec<Script> = script_roots(target)
        .into_iter()
        .map(|root| render_script(root, &target.blocks))
        .filter(|script| !script.text.trim().is_empty())
        .collect();
    debug!(
        target = %target.name,
        scripts = scripts.len(),
        blocks = target.blocks.len(),
        "converted target"
    );
    scripts
}

pub fn scripts_for_target(target: &Target) -> Vec<String> {
    convert_target(target).into_iter().map(|s| s.text).collect()
}

enum Work<'a> {
    Chain { id: &'a str, indent: usize },
    Line(String),
}

struct ScriptWalker<'a> {
    blocks: &'a BlockMap,
    visited: HashSet<&'a str>,
    lines: Vec<String>,
    truncated: bool,
}

impl<'a> ScriptWalker<'a> {
    fn new(blocks: &'a BlockMap) -> Self {
        Self {
            blocks,
            visited: HashSet::new(),
            lines: Vec::new(),
            truncated: false,
        }
    }

    fn walk(&mut self, root_id: &str) {
        let mut pending = match self.blocks.get_key_value(root_id) {
            Some((key, _)) => vec![Work::Chain { id: key, indent: 0 }],
            None => return,
        };
        while let Some(work) = pending.pop() {
            match work {
                Work::Line(line) => self.lines.push(line),
                Work::Chain { id, indent } => self.walk_chain(id, indent, &mut pending),
            }
        }
    }

    // Stops at a C-block after queueing its body, `end` and continuation in
    // reverse so they pop in output order.
    fn walk_chain(&mut self, start: &'a str, indent: usize, pending: &mut Vec<Work<'a>>) {
        let mut current = Some(start);
        while let Some(id) = current {
            let Some((key, block)) = self.blocks.get_key_value(id) else {
                break;
            };
            if !self.visited.insert(key) {
                warn!(block = %id, "cyclic block chain, truncating script");
                self.lines
                    .push(format!("{}// Cyclic block chain at {}", spaces(indent), id));
                self.truncated = true;
                break;
            }
            self.lines.push(render_block(block, self.blocks, indent));
            current = block.next.as_deref();
            if !tables::is_c_block(&block.opcode) {
                continue;
            }
            if let Some(next) = current.and_then(|next| self.known_id(next)) {
                pending.push(Work::Chain { id: next, indent });
            }
            pending.push(Work::Line(format!("{}end", spaces(indent))));
            if block.opcode == "control_if_else" {
                self.push_substack(block, "SUBSTACK2", indent, pending);
                pending.push(Work::Line(format!("{}else", spaces(indent))));
            }
            self.push_substack(block, "SUBSTACK", indent, pending);
            break;
        }
    }

    fn push_substack(&self, block: &Block, slot: &str, indent: usize, pending: &mut Vec<Work<'a>>) {
        if let Some(start) = block
            .inputs
            .get(slot)
            .and_then(Input::block_id)
            .and_then(|id| self.known_id(id))
        {
            pending.push(Work::Chain {
                id: start,
                indent: indent + INDENT_STEP,
            });
        }
    }

    fn known_id(&self, id: &str) -> Option<&'a str> {
        self.blocks.get_key_value(id).map(|(key, _)| key)
    }
}

fn block_text(block: &Block, blocks: &BlockMap, depth: usize) -> String {
    let Some(template) = tables::template(&block.opcode) else {
        debug!(opcode = %block.opcode, "no template for opcode");
        return format!("// Unknown block: {}", block.opcode);
    };
    match block.opcode.as_str() {
        "procedures_definition" => definition_text(block, blocks),
        "procedures_call" => call_text(block, blocks, depth),
        _ => fill_template(template, block, blocks, depth),
    }
}

fn fill_template(template: &str, block: &Block, blocks: &BlockMap, depth: usize) -> String {
    placeholder_re()
        .replace_all(template, |caps: &Captures| {
            let name = &caps[1];
            if block.inputs.contains_key(name) && !tables::is_substack_input(name) {
                input_text(block, name, blocks, depth)
            } else if block.fields.contains_key(name) {
                resolve_field(block, name)
            } else {
                FIELD_PLACEHOLDER.to_string()
            }
        })
        .into_owned()
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([A-Za-z0-9_]+)\}").expect("placeholder pattern is valid"))
}

fn input_text(block: &Block, input_name: &str, blocks: &BlockMap, depth: usize) -> String {
    let Some(input) = block.inputs.get(input_name) else {
        return INPUT_PLACEHOLDER.to_string();
    };
    if depth >= MAX_EXPRESSION_DEPTH {
        warn!(opcode = %block.opcode, "expression nesting too deep");
        return INPUT_PLACEHOLDER.to_string();
    }
    // Prefer what is actually plugged in; the covered shadow is a fallback.
    match input.value().or_else(|| input.obscured_shadow()) {
        Some(value) => value_text(value, input_name, blocks, depth),
        None => INPUT_PLACEHOLDER.to_string(),
    }
}

fn value_text(value: &InputValue, input_name: &str, blocks: &BlockMap, depth: usize) -> String {
    match value {
        InputValue::Block(id) => match blocks.get(id) {
            Some(referenced) => {
                let text = block_text(referenced, blocks, depth + 1);
                wrap_for_shape(&referenced.opcode, text)
            }
            None => format!("[{}]", id),
        },
        InputValue::Primitive(primitive) => primitive_text(primitive, input_name),
    }
}

fn primitive_text(primitive: &Primitive, input_name: &str) -> String {
    if input_name == "colorParam" {
        if let Some(label) = tables::pen_color_param_label(&primitive.value) {
            return label.to_string();
        }
    }
    let value = primitive.value.as_str();
    match primitive.kind {
        kind if kind.is_numeric() => format!("({})", value),
        PrimitiveKind::Broadcast => format!("[{} v]", strip_sentinel(value)),
        PrimitiveKind::Variable => format!("({})", value),
        PrimitiveKind::List => format!("({} :: list)", value),
        _ => format!("[{}]", value),
    }
}

fn wrap_for_shape(opcode: &str, text: String) -> String {
    if tables::is_boolean_opcode(opcode) {
        ensure_wrapped(text, '<', '>')
    } else if tables::is_menu_opcode(opcode) {
        text
    } else {
        ensure_wrapped(text, '(', ')')
    }
}

fn ensure_wrapped(text: String, open: char, close: char) -> String {
    let trimmed = text.trim();
    if trimmed.starts_with(open) && trimmed.ends_with(close) {
        trimmed.to_string()
    } else {
        format!("{}{}{}", open, trimmed, close)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArgSlot {
    Text,
    Boolean,
}

/// Replaces `%s`/`%n`/`%b` in a proccode strictly left to right.
fn substitute_proccode(proccode: &str, mut fill: impl FnMut(ArgSlot) -> String) -> String {
    let mut out = String::with_capacity(proccode.len());
    let mut chars = proccode.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '%' {
            let slot = match chars.peek() {
                Some('s') | Some('n') => Some(ArgSlot::Text),
                Some('b') => Some(ArgSlot::Boolean),
                _ => None,
            };
            if let Some(slot) = slot {
                chars.next();
                out.push_str(&fill(slot));
                continue;
            }
        }
        out.push(c);
    }
    out
}

fn definition_text(block: &Block, blocks: &BlockMap) -> String {
    let prototype = block
        .inputs
        .get("custom_block")
        .and_then(Input::block_id)
        .and_then(|id| blocks.get(id));
    let Some(mutation) = prototype.and_then(|p| p.mutation.as_ref()) else {
        debug!("procedure definition without prototype mutation");
        return "define ?".to_string();
    };
    let Some(names) = mutation.argument_names() else {
        debug!("procedure prototype with unreadable argumentnames");
        return "define ?".to_string();
    };
    let proccode = mutation.proccode.as_deref().unwrap_or(FIELD_PLACEHOLDER);
    let mut names = names.into_iter();
    let signature = substitute_proccode(proccode, |slot| match (names.next(), slot) {
        (Some(name), ArgSlot::Text) => format!("({})", name),
        (Some(name), ArgSlot::Boolean) => format!("<{}>", name),
        (None, _) => FIELD_PLACEHOLDER.to_string(),
    });
    format!("define {}", signature)
}

fn call_text(block: &Block, blocks: &BlockMap, depth: usize) -> String {
    let Some(mutation) = &block.mutation else {
        return FIELD_PLACEHOLDER.to_string();
    };
    let Some(argument_ids) = mutation.argument_ids() else {
        debug!("procedure call with unreadable argumentids");
        return FIELD_PLACEHOLDER.to_string();
    };
    let proccode = mutation.proccode.as_deref().unwrap_or(FIELD_PLACEHOLDER);
    let mut ids = argument_ids.iter();
    substitute_proccode(proccode, |_| match ids.next() {
        Some(id) => input_text(block, id, blocks, depth),
        None => FIELD_PLACEHOLDER.to_string(),
    })
}

/// `_random_` -> `random`, `_mouse_` -> `mouse`.
fn strip_sentinel(value: &str) -> &str {
    if value.len() > 1 && value.starts_with('_') && value.ends_with('_') {
        value.trim_matches('_')
    } else {
        value
    }
}

fn indent_lines(text: &str, indent: usize) -> String {
    let pad = spaces(indent);
    text.split('\n')
        .map(|line| format!("{}{}", pad, line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn spaces(n: usize) -> String {
    " ".repeat(n)
}
