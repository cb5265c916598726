//! Boxes, rules, segments and images

use tracing::debug;

use crate::command::{ResourceCall, ResourceKind};

use super::context::Context;
use super::position::py_float;
use super::text::unparen;
use super::walker::walk_commands;

/// Boxes taller than this are drawn as BOX, thinner ones as RULE
const BOX_MIN_HEIGHT: f64 = 1.0;

/// Smallest drawable dimension
const MIN_DIMENSION: f64 = 0.01;

/// Thickness keywords used as the fourth DRAWB operand
fn thickness_keyword(keyword: &str) -> f64 {
    match keyword {
        "LTHN" => 0.1,
        "LMED" => 0.2,
        "LTHK" => 0.5,
        _ => 0.2,
    }
}

fn shade(style: &str) -> Option<u32> {
    [("S1", 100), ("S2", 75), ("S3", 50), ("S4", 25)]
        .iter()
        .find(|(marker, _)| style.contains(marker))
        .map(|(_, percent)| *percent)
}

fn line_type(style: &str) -> &'static str {
    match style {
        "LDSH" | "L_DSH" => "DASHED",
        "LDOT" | "L_DOT" => "DOTTED",
        _ => "SOLID",
    }
}

/// `x y width height style DRAWB`
pub fn emit_box(ctx: &mut Context, args: &[String]) {
    if args.len() < 4 {
        return;
    }
    if !ctx.section.box_anchored {
        ctx.out.line("POSY = $SL_CURRY;");
        ctx.out.line("POSX = $SL_CURRX;");
        ctx.section.box_anchored = true;
    }

    let parsed = (args[0].parse::<f64>(), args[1].parse::<f64>(), args[2].parse::<f64>());
    let (Ok(x), Ok(y), Ok(length)) = parsed else {
        debug!("DRAWB with non-numeric geometry: {:?}", args);
        return;
    };
    let (thickness, thickness_text) = match args[3].parse::<f64>() {
        Ok(value) => (value, args[3].clone()),
        Err(_) => {
            let value = thickness_keyword(&args[3]);
            (value, py_float(value))
        }
    };
    let style = args.get(4).map(String::as_str).unwrap_or("R_S1");

    let (color, shade) = if ctx.is_declared_color(style) {
        (Some(ctx.color_alias(style)), Some(shade(style).unwrap_or(100)))
    } else {
        let color = match style.chars().next() {
            Some(c @ ('R' | 'G' | 'B' | 'F')) => Some(c.to_string()),
            Some('S') => Some("F".to_string()),
            _ => None,
        };
        (color, shade(style))
    };
    let line_type = line_type(style);

    let width = if length >= MIN_DIMENSION { length } else { 0.1 };
    let height = if thickness >= MIN_DIMENSION { thickness } else { 0.1 };
    let position = format!("POSITION (POSX+{} MM) (POSY+{} MM)", py_float(x), py_float(y.abs()));

    if thickness > BOX_MIN_HEIGHT {
        ctx.out.line("BOX");
        ctx.out.indent();
        ctx.out.line(position);
        ctx.out.line(format!("WIDTH {} MM", py_float(width)));
        ctx.out.line(format!("HEIGHT {} MM", py_float(height)));
        if let Some(color) = color {
            ctx.out.line(format!("COLOR {}", color));
        }
        match shade {
            Some(shade) => ctx.out.line(format!("THICKNESS 0 TYPE {} SHADE {};", line_type, shade)),
            None => ctx.out.line(format!("THICKNESS MEDIUM TYPE {};", line_type)),
        }
        ctx.out.dedent();
    } else {
        let direction = if width >= thickness { "ACROSS" } else { "DOWN" };
        ctx.out.line("RULE");
        ctx.out.indent();
        ctx.out.line(position);
        ctx.out.line(format!("DIRECTION {}", direction));
        if let Some(color) = color {
            ctx.out.line(format!("COLOR {}", color));
        }
        ctx.out.line(format!("LENGTH {} MM", py_float(width)));
        ctx.out.line(format!("THICKNESS {} MM TYPE {}", thickness_text, line_type));
        ctx.out.line(";");
        ctx.out.dedent();
    }
}

/// `[ w h ]` area size among CACHE operands.
fn cache_area(args: &[String]) -> Option<(i64, i64)> {
    let open = args.iter().position(|a| a == "[")?;
    match args.get(open + 1..open + 4)? {
        [w, h, close] if close == "]" => Some((w.parse().ok()?, h.parse().ok()?)),
        _ => None,
    }
}

fn split_extension(file_name: &str) -> (&str, Option<String>) {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) => (stem, Some(ext.to_ascii_lowercase())),
        None => (file_name, None),
    }
}

/// Dispatch SCALL and ICALL.
pub fn emit_call(ctx: &mut Context, call: &ResourceCall) {
    match call.kind {
        ResourceKind::Segment => emit_segment(ctx, call),
        ResourceKind::Image => emit_image(ctx, call),
    }
}

fn emit_segment(ctx: &mut Context, call: &ResourceCall) {
    let cache = std::mem::take(&mut ctx.section.cache);
    let file_name = cache
        .iter()
        .find_map(|arg| unparen(arg).map(str::to_string))
        .unwrap_or_else(|| call.name.trim_matches(|c| c == '(' || c == ')' || c == '/').to_string());
    if file_name.is_empty() {
        return;
    }

    let (stem, extension) = split_extension(&file_name);
    match extension.as_deref() {
        None => emit_subroutine_call(ctx, stem),
        Some("jpg" | "jpeg" | "tif" | "tiff") => {
            let other = if matches!(extension.as_deref(), Some("jpg" | "jpeg")) { "JPG" } else { "TIF" };
            ctx.out.line("CREATEOBJECT IOBDLL(IOBDEFS)");
            ctx.out.indent();
            ctx.out.line("POSITION (SAME) (SAME)");
            ctx.out.line("PARAMETERS");
            ctx.out.indent();
            ctx.out.line(format!("('FILENAME'='{}')", stem));
            ctx.out.line("('OBJECTTYPE'='1')");
            ctx.out.line(format!("('OTHERTYPES'='{}')", other));
            if let Some((w, h)) = cache_area(&cache) {
                ctx.out.line(format!("('XOBJECTAREASIZE'='{}')", w));
                ctx.out.line(format!("('YOBJECTAREASIZE'='{}')", h));
            }
            ctx.out.line("('OBJECTMAPPING'='2');");
            ctx.out.dedent();
            ctx.out.dedent();
        }
        Some("eps") => {
            let cursor = &ctx.section.cursor;
            let x = if cursor.x_is_set() { format!("{} MM-$MR_LEFT", py_float(cursor.x)) } else { "SAME".to_string() };
            ctx.out.line(format!("SEGMENT {}", stem));
            ctx.out.indent();
            ctx.out.line(format!("POSITION ({}) (0 MM-$MR_TOP+&CORSEGMENT);", x));
            ctx.out.dedent();
        }
        Some(_) => emit_segment_at_cursor(ctx, stem),
    }
    ctx.section.cursor.release();
}

fn emit_segment_at_cursor(ctx: &mut Context, name: &str) {
    let cursor = ctx.section.cursor.clone();
    ctx.out.line(format!("SEGMENT {}", name));
    ctx.out.indent();
    if !cursor.x_is_set() && !cursor.y_is_set() {
        ctx.out.line("POSITION (SAME) (SAME);");
    } else {
        let x = if cursor.x_is_set() { format!("{} MM-$MR_LEFT", py_float(cursor.x)) } else { "SAME".to_string() };
        let y = if cursor.y_is_set() {
            format!("{} MM-$MR_TOP+&CORSEGMENT", py_float(cursor.y))
        } else {
            "SAME".to_string()
        };
        ctx.out.line(format!("POSITION ({}) ({});", x, y));
    }
    ctx.out.dedent();
}

/// Inline a small subroutine, call a large one, or place an external segment.
fn emit_subroutine_call(ctx: &mut Context, name: &str) {
    let project = ctx.project;
    let Some(body) = project.subroutine(name) else {
        emit_segment_at_cursor(ctx, name);
        return;
    };

    if body.len() > ctx.config.subroutines.inline_threshold {
        ctx.request_routine(name);
        ctx.out.line(format!("USE FORMAT SR_{};", name));
        return;
    }
    if !ctx.enter_inline(name) {
        ctx.warn(format!("Recursive subroutine call to {} not inlined", name));
        ctx.out.line(format!("/* Recursive subroutine call: {} */", name));
        return;
    }
    ctx.out.line(format!("/* Inlined subroutine: {} ({} commands) */", name, body.len()));
    walk_commands(ctx, body);
    ctx.leave_inline();
}

/// `(name) [scale] ICALL`
fn emit_image(ctx: &mut Context, call: &ResourceCall) {
    let name = unparen(&call.name).unwrap_or(&call.name).trim_start_matches('/');
    if name.is_empty() {
        return;
    }
    let scale = call
        .args
        .iter()
        .find(|arg| arg.parse::<f64>().is_ok())
        .cloned()
        .unwrap_or_else(|| "1.0".to_string());
    let cursor = ctx.section.cursor.clone();
    ctx.out.line(format!("IMAGE '{}'", name));
    ctx.out.indent();
    ctx.out.line(format!("POSITION ({} MM-$MR_LEFT) ({} MM-$MR_TOP)", py_float(cursor.x), py_float(cursor.y)));
    ctx.out.line(format!("SCALE {}", scale));
    ctx.out.line(";");
    ctx.out.dedent();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConverterConfig;
    use crate::generator::malformed::MalformedDetector;
    use crate::models::{ColorDef, Project};

    fn render_with(project: &Project, setup: impl FnOnce(&mut Context)) -> Vec<String> {
        let config = ConverterConfig::default();
        let detector = MalformedDetector::default();
        let mut ctx = Context::new(&config, project, &detector, None);
        setup(&mut ctx);
        ctx.out.lines().to_vec()
    }

    fn render(setup: impl FnOnce(&mut Context)) -> Vec<String> {
        render_with(&Project::default(), setup)
    }

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn segment(name: &str) -> ResourceCall {
        ResourceCall { kind: ResourceKind::Segment, name: name.to_string(), args: Vec::new() }
    }

    #[test]
    fn test_rule_from_thin_box() {
        let lines = render(|ctx| emit_box(ctx, &args(&["0", "-13.5", "193", "0.001", "XDRK"])));
        assert_eq!(
            lines,
            vec![
                "POSY = $SL_CURRY;",
                "POSX = $SL_CURRX;",
                "RULE",
                "    POSITION (POSX+0.0 MM) (POSY+13.5 MM)",
                "    DIRECTION ACROSS",
                "    LENGTH 193.0 MM",
                "    THICKNESS 0.001 MM TYPE SOLID",
                "    ;",
            ]
        );
    }

    #[test]
    fn test_filled_box_with_shade() {
        let lines = render(|ctx| emit_box(ctx, &args(&["10", "5", "50", "20", "R_S2"])));
        assert_eq!(lines[2], "BOX");
        assert_eq!(lines[4], "    WIDTH 50.0 MM");
        assert_eq!(lines[5], "    HEIGHT 20.0 MM");
        assert_eq!(lines[6], "    COLOR R");
        assert_eq!(lines[7], "    THICKNESS 0 TYPE SOLID SHADE 75;");
    }

    #[test]
    fn test_anchor_once_per_outline() {
        let lines = render(|ctx| {
            emit_box(ctx, &args(&["0", "0", "10", "LMED", "LDSH"]));
            emit_box(ctx, &args(&["0", "0", "0.005", "LTHK"]));
        });
        assert_eq!(lines.iter().filter(|l| l.as_str() == "POSY = $SL_CURRY;").count(), 1);
        assert!(lines.contains(&"    THICKNESS 0.2 MM TYPE DASHED".to_string()));
        assert!(lines.contains(&"    DIRECTION DOWN".to_string()));
        assert!(lines.contains(&"    LENGTH 0.1 MM".to_string()));
    }

    #[test]
    fn test_declared_color_style() {
        let mut project = Project::default();
        project.document.colors.insert("LMED".into(), ColorDef { alias: "LMED".into(), name: "LMED".into() });
        let lines = render_with(&project, |ctx| emit_box(ctx, &args(&["0", "0", "40", "8", "LMED"])));
        assert!(lines.contains(&"    COLOR LMED".to_string()));
        assert!(lines.contains(&"    THICKNESS 0 TYPE SOLID SHADE 100;".to_string()));
    }

    #[test]
    fn test_box_needs_four_numeric_args() {
        assert!(render(|ctx| emit_box(ctx, &args(&["0", "0", "10"]))).is_empty());
        let lines = render(|ctx| emit_box(ctx, &args(&["a", "0", "10", "1"])));
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_jpg_with_cache_area() {
        let lines = render(|ctx| {
            ctx.section.cache = args(&["(logo.jpg)", "[", "185", "44", "]"]);
            emit_call(ctx, &segment(""));
        });
        assert_eq!(lines[0], "CREATEOBJECT IOBDLL(IOBDEFS)");
        assert_eq!(lines[3], "        ('FILENAME'='logo')");
        assert_eq!(lines[5], "        ('OTHERTYPES'='JPG')");
        assert_eq!(lines[6], "        ('XOBJECTAREASIZE'='185')");
        assert_eq!(lines[7], "        ('YOBJECTAREASIZE'='44')");
        assert_eq!(lines[8], "        ('OBJECTMAPPING'='2');");
    }

    #[test]
    fn test_cache_is_consumed_once() {
        let lines = render(|ctx| {
            ctx.section.cache = args(&["(scan.TIF)"]);
            emit_call(ctx, &segment(""));
            emit_call(ctx, &segment("(TXNB.ps)"));
        });
        assert!(lines.contains(&"        ('OTHERTYPES'='TIF')".to_string()));
        assert!(lines.contains(&"SEGMENT TXNB".to_string()));
    }

    #[test]
    fn test_eps_segment() {
        let lines = render(|ctx| {
            ctx.section.cursor.move_to(12.0, 80.0);
            emit_call(ctx, &segment("(logo.eps)"));
        });
        assert_eq!(lines, vec!["SEGMENT logo", "    POSITION (12.0 MM-$MR_LEFT) (0 MM-$MR_TOP+&CORSEGMENT);"]);
    }

    #[test]
    fn test_unknown_segment_positions() {
        let lines = render(|ctx| emit_call(ctx, &segment("(SIGN)")));
        assert_eq!(lines, vec!["SEGMENT SIGN", "    POSITION (SAME) (SAME);"]);

        let lines = render(|ctx| {
            ctx.section.cursor.move_to(10.0, 20.0);
            emit_call(ctx, &segment("SIGN"));
            emit_call(ctx, &segment("SIGN"));
        });
        assert_eq!(lines[1], "    POSITION (10.0 MM-$MR_LEFT) (20.0 MM-$MR_TOP+&CORSEGMENT);");
        assert_eq!(lines[3], "    POSITION (SAME) (SAME);");
    }

    #[test]
    fn test_image_call() {
        let call = ResourceCall { kind: ResourceKind::Image, name: "(photo.tif)".into(), args: args(&["0.5"]) };
        let lines = render(|ctx| {
            ctx.section.cursor.move_to(5.0, 6.0);
            emit_call(ctx, &call);
        });
        assert_eq!(
            lines,
            vec![
                "IMAGE 'photo.tif'",
                "    POSITION (5.0 MM-$MR_LEFT) (6.0 MM-$MR_TOP)",
                "    SCALE 0.5",
                "    ;",
            ]
        );
    }
}
