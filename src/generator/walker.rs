//! Command walker shared by case sections, subroutine sections and sub-forms

use tracing::debug;

use crate::command::{AssignOp, Assignment, Command, CommandKind};

use super::condition::{self, Condition};
use super::context::Context;
use super::graphics::{emit_box, emit_call};
use super::output::emit_text;
use super::position::py_float;
use super::text::term;

/// Layout and definition commands with no statement of their own
const SKIPPED: &[&str] = &[
    "SETLKF", "SETPAGEDEF", "INDEXFONT", "INDEXCOLOR", "INDEXBAT", "SETUNIT", "ORITL", "PORT", "LAND", "SETFTSW",
    "SETFORM",
];

/// Words that mark an assignment as mangled source
const MALFORMED_WORDS: &[&str] = &["IF", "ELSE", "THEN", "ENDIF", "PAGEBRK", "{", "}", "%"];

/// Walk one command list. An OUTLINE opened at this level is closed here.
pub fn walk_commands(ctx: &mut Context, commands: &[Command]) {
    let mut opened = false;
    let mut idx = 0;
    while idx < commands.len() {
        if commands[idx].is_output() && ctx.ensure_outline() {
            opened = true;
        }
        idx += emit_command(ctx, commands, idx);
    }
    if opened {
        ctx.close_outline();
    }
}

/// Walk a body one level deeper.
fn walk_indented(ctx: &mut Context, commands: &[Command]) {
    ctx.out.indent();
    walk_commands(ctx, commands);
    ctx.out.dedent();
}

/// Emit `commands[idx]`, returning how many siblings were consumed.
fn emit_command(ctx: &mut Context, commands: &[Command], idx: usize) -> usize {
    let command = &commands[idx];
    match &command.kind {
        CommandKind::Conditional { condition, body: Some(body) } => {
            let else_body = match commands.get(idx + 1).map(|c| &c.kind) {
                Some(CommandKind::Else { body: Some(else_body) }) => Some(else_body.as_slice()),
                _ => None,
            };
            open_if(ctx, &condition::convert(condition));
            walk_indented(ctx, body);
            if let Some(else_body) = else_body {
                ctx.out.line("ELSE;");
                walk_indented(ctx, else_body);
            }
            ctx.out.line("ENDIF;");
            if else_body.is_some() {
                2
            } else {
                1
            }
        }
        CommandKind::Conditional { condition, body: None } => emit_flat_if(ctx, condition, commands, idx),
        CommandKind::Else { body } => {
            debug!(line = command.line, "ELSE without a matching IF");
            if let Some(body) = body {
                ctx.out.line("/* ELSE branch without matching IF */");
                walk_commands(ctx, body);
            }
            1
        }
        CommandKind::EndIf | CommandKind::Definition { .. } => 1,
        CommandKind::Assignment(assignment) => {
            emit_assignment(ctx, assignment);
            1
        }
        CommandKind::TextOutput(output) => {
            emit_text(ctx, output);
            1
        }
        CommandKind::ResourceCall(call) => {
            emit_call(ctx, call);
            1
        }
        CommandKind::Move { x, y } => {
            emit_move(ctx, x, y.as_deref());
            1
        }
        CommandKind::NewLine { amount } => {
            emit_new_line(ctx, amount.as_deref());
            1
        }
        CommandKind::DrawBox { args } => {
            emit_box(ctx, args);
            1
        }
        CommandKind::SetFont(font) => {
            ctx.section.font = ctx.font_alias(font);
            1
        }
        CommandKind::SetColor(color) => {
            ctx.section.color = Some(ctx.color_alias(color));
            1
        }
        CommandKind::Generic { name, args } => {
            emit_generic(ctx, name, args);
            1
        }
    }
}

fn open_if(ctx: &mut Context, condition: &Condition) {
    for statement in &condition.hoisted {
        ctx.out.line(statement);
    }
    ctx.out.line(condition.if_line());
    ctx.out.line("THEN;");
}

/// IF whose branches follow as siblings up to the matching ELSE and ENDIF.
fn emit_flat_if(ctx: &mut Context, condition: &[String], commands: &[Command], idx: usize) -> usize {
    let mut depth = 0usize;
    let mut else_idx = None;
    let mut endif_idx = None;
    for (offset, sibling) in commands[idx + 1..].iter().enumerate() {
        let pos = idx + 1 + offset;
        match &sibling.kind {
            CommandKind::Conditional { body: None, .. } => depth += 1,
            CommandKind::EndIf if depth == 0 => {
                endif_idx = Some(pos);
                break;
            }
            CommandKind::EndIf => depth -= 1,
            CommandKind::Else { .. } if depth == 0 && else_idx.is_none() => else_idx = Some(pos),
            _ => {}
        }
    }

    let end = endif_idx.unwrap_or(commands.len());
    let then_end = else_idx.unwrap_or(end);

    open_if(ctx, &condition::convert(condition));
    walk_indented(ctx, &commands[idx + 1..then_end]);
    if let Some(else_idx) = else_idx {
        ctx.out.line("ELSE;");
        ctx.out.indent();
        if let CommandKind::Else { body: Some(body) } = &commands[else_idx].kind {
            walk_commands(ctx, body);
        }
        walk_commands(ctx, &commands[else_idx + 1..end]);
        ctx.out.dedent();
    }
    ctx.out.line("ENDIF;");

    match endif_idx {
        Some(endif_idx) => endif_idx - idx + 1,
        None => commands.len() - idx,
    }
}

fn increment(name: &str, op: AssignOp) -> String {
    let sign = if op == AssignOp::Decrement { '-' } else { '+' };
    format!("{} = {} {} 1;", name, name, sign)
}

pub fn emit_assignment(ctx: &mut Context, assignment: &Assignment) {
    let target = assignment.target.trim_start_matches('/');
    let value = match assignment.op {
        AssignOp::Increment | AssignOp::Decrement => {
            ctx.out.line(increment(target, assignment.op));
            return;
        }
        AssignOp::Set => match &assignment.value {
            Some(value) => value.as_str(),
            None => return,
        },
    };

    let (name, value) = if matches!(target, "++" | "--" | "+" | "-" | "*" | "/") {
        (value.trim_start_matches('/'), assignment.target.as_str())
    } else {
        (target, value)
    };

    let mangled = value == "-"
        || value == "="
        || MALFORMED_WORDS.iter().any(|word| name.contains(word) || value.contains(word));
    if mangled {
        ctx.out.line(format!("/* {} = {}; */", name, value));
        return;
    }

    match value {
        "++" => ctx.out.line(increment(name, AssignOp::Increment)),
        "--" => ctx.out.line(increment(name, AssignOp::Decrement)),
        _ => ctx.out.line(format!("{} = {};", name, term(value))),
    }
}

fn emit_move(ctx: &mut Context, x: &str, y: Option<&str>) {
    let Ok(x_value) = x.parse::<f64>() else {
        debug!("Non-numeric move operand {:?}", x);
        return;
    };
    match y.map(str::parse::<f64>) {
        Some(Ok(y_value)) => ctx.section.cursor.move_to(x_value, y_value),
        Some(Err(_)) => debug!("Non-numeric MOVETO operand {:?}", y),
        None => ctx.section.cursor.move_horizontal(x_value),
    }
}

fn emit_new_line(ctx: &mut Context, amount: Option<&str>) {
    let amount = amount.and_then(|a| a.parse::<f64>().ok());
    let y = match amount {
        Some(value) if value < 0.0 => {
            ctx.section.cursor.back_up(value.abs().round() as u32);
            return;
        }
        Some(value) => format!("SAME+{} MM", py_float(value)),
        None => "NEXT".to_string(),
    };
    let font = ctx.section.font.clone();
    ctx.out.line("OUTPUT ''");
    ctx.out.line(format!("    FONT {} NORMAL", font));
    ctx.out.line(format!("    POSITION (SAME) ({});", y));
    ctx.section.cursor.after_new_line();
}

fn emit_generic(ctx: &mut Context, name: &str, args: &[String]) {
    match name {
        "SETLSP" => match args.first() {
            Some(spacing) => ctx.out.line(format!("SETUNITS LINESP {} MM;", spacing)),
            None => ctx.out.line("SETUNITS LINESP AUTO;"),
        },
        "FOR" => {
            let params: Vec<String> = args.iter().map(|a| term(a)).collect();
            ctx.out.line(format!("FOR {};", params.join(" ")));
        }
        "ENDFOR" => ctx.out.line("ENDFOR;"),
        "GETINTV" => emit_substring(ctx, args),
        "CACHE" => ctx.section.cache = args.to_vec(),
        "CLIP" | "ENDCLIP" => {
            ctx.out.line("/* Note: DFA does not support CLIP/ENDCLIP. */");
            ctx.out.line(
                "/* Use MARGIN, SHEET/LOGICALPAGE dimensions, WIDTH on TEXT, or image size params instead */",
            );
        }
        "PAGEBRK" | "NEWFRAME" => ctx.out.line("USE LP NEXT;"),
        "NEWFRONT" => ctx.out.line("USE LP NEXT SIDE FRONT;"),
        "NEWBACK" => ctx.out.line("USE LP NEXT SIDE BACK;"),
        skipped if SKIPPED.contains(&skipped) => {}
        other => {
            debug!("Unsupported command {} {:?}", other, args);
            ctx.out.line(format!("/* VIPP command not directly supported: {} */", other));
        }
    }
}

/// `/R src start len GETINTV`: VIPP offsets are 0-based, SUBSTR is 1-based.
fn emit_substring(ctx: &mut Context, args: &[String]) {
    let [result, source, start, length] = args else {
        ctx.out.line("/* VIPP command not directly supported: GETINTV */");
        return;
    };
    let start = match start.parse::<i64>() {
        Ok(start) => (start + 1).to_string(),
        Err(_) => format!("{} + 1", start),
    };
    ctx.out.line(format!(
        "{} = SUBSTR({}, {}, {}, '');",
        result.trim_start_matches('/'),
        term(source),
        start,
        length
    ));
}
