//! Text output translation (SH, SHL, SHR, SHr, SHC, SHP)

use crate::command::TextOutput;

use super::context::Context;
use super::position::{position, py_float, Coord};
use super::text::{chunks, classify, font_segments, interpolate, numpicture, quote, text_items, Source};

/// Literals longer than this are set as a TEXT block
const BASELINE_THRESHOLD: usize = 50;

/// Column width for justified TEXT blocks
const JUSTIFY_WIDTH: f64 = 193.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
    Center,
    Justify,
}

impl Align {
    fn from_code(code: &str) -> Option<Self> {
        match code.trim().parse::<f64>().ok()? as i64 {
            0 => Some(Align::Left),
            1 => Some(Align::Right),
            2 => Some(Align::Center),
            3 => Some(Align::Justify),
            _ => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Align::Left => "LEFT",
            Align::Right => "RIGHT",
            Align::Center => "CENTER",
            Align::Justify => "JUSTIFY",
        }
    }
}

/// Alignment implied by the show command.
pub fn alignment(output: &TextOutput) -> Option<Align> {
    match output.keyword.as_str() {
        "SHL" => Some(Align::Left),
        "SHR" | "SHr" => Some(Align::Right),
        "SHC" => Some(Align::Center),
        "SHP" => output.align.as_deref().and_then(Align::from_code),
        _ => None,
    }
}

fn column_width(output: &TextOutput) -> Option<f64> {
    let width = output.width.as_deref()?.trim().parse::<f64>().ok()?;
    (width > 0.0).then_some(width)
}

/// What goes into a TEXT or OUTPUT statement
enum Content {
    /// Expression printed as is (`VAR`, `'a' ! VAR`, `NUMPICTURE(...)`)
    Expression(String),
    /// Literal text, quoted on output
    Literal(String),
}

/// Translate one show command at the current cursor.
pub fn emit_text(ctx: &mut Context, output: &TextOutput) {
    let Some(source) = classify(&output.source) else {
        return;
    };
    let align = alignment(output);
    let width = column_width(output);

    match source {
        Source::Variable(name) => {
            let expression = match &output.picture {
                Some(picture) => format!("NUMPICTURE({},{})", name, numpicture(picture)),
                None => name,
            };
            match width {
                Some(width) => text_with_width(ctx, &format!("({})", expression), width, align),
                None => simple_output(ctx, Content::Expression(expression), align),
            }
            ctx.section.cursor.after_output(false);
        }
        Source::Literal(text) => emit_literal(ctx, &text, align, width),
    }
}

fn emit_literal(ctx: &mut Context, text: &str, align: Option<Align>, width: Option<f64>) {
    if let Some(width) = width {
        text_with_width(ctx, &text_items(text), width, align);
        ctx.section.cursor.after_output(false);
        return;
    }

    let segments = font_segments(text, &ctx.section.font);
    if segments.len() > 1 {
        font_switched(ctx, &segments, align);
        ctx.section.cursor.after_output(false);
        return;
    }
    // A single leading switch only changes the font
    let (text, switched_font) = match segments.first() {
        Some((font, segment)) if segment.len() != text.len() => (segment.as_str(), Some(ctx.font_alias(font))),
        _ => (text, None),
    };
    let previous_font = switched_font.map(|font| std::mem::replace(&mut ctx.section.font, font));

    if let Some(expression) = interpolate(text) {
        simple_output(ctx, Content::Expression(expression), align);
        ctx.section.cursor.after_output(false);
    } else if text.chars().count() > BASELINE_THRESHOLD || text.contains("**") || align == Some(Align::Justify) {
        text_baseline(ctx, text, align);
        ctx.section.cursor.after_output(true);
    } else {
        simple_output(ctx, Content::Literal(text.to_string()), align);
        ctx.section.cursor.after_output(false);
    }

    if let Some(font) = previous_font {
        ctx.section.font = font;
    }
}

fn current_position(ctx: &Context) -> String {
    let cursor = &ctx.section.cursor;
    position(&cursor.x_coord(), &cursor.y_coord(), ctx.correction().as_deref())
}

/// `OUTPUT x FONT f NORMAL POSITION ... [COLOR c] [ALIGN a NOPAD];`
fn simple_output(ctx: &mut Context, content: Content, align: Option<Align>) {
    let line = match content {
        Content::Expression(expression) => format!("OUTPUT {}", expression),
        Content::Literal(text) => format!("OUTPUT {}", quote(&text)),
    };
    let font_line = format!("FONT {} NORMAL", ctx.section.font);
    let position_line = current_position(ctx);
    let color = ctx.section.color.clone();

    ctx.out.line(line);
    ctx.out.indent();
    ctx.out.line(font_line);
    ctx.out.line(position_line);
    if let Some(color) = color {
        ctx.out.line(format!("COLOR {}", color));
    }
    match align {
        Some(Align::Justify) | None => ctx.out.line(";"),
        Some(align) => ctx.out.line(format!("ALIGN {} NOPAD;", align.keyword())),
    }
    ctx.out.dedent();
}

/// SHP with a column width: a wrapping TEXT block.
fn text_with_width(ctx: &mut Context, items: &str, width: f64, align: Option<Align>) {
    let position_line = current_position(ctx);
    let font = ctx.section.font.clone();

    ctx.out.line("TEXT");
    ctx.out.indent();
    ctx.out.line(position_line);
    ctx.out.line(format!("WIDTH {} MM", py_float(width)));
    if let Some(align) = align {
        ctx.out.line(format!("ALIGN {}", align.keyword()));
    }
    ctx.out.line(format!("FONT {}", font));
    ctx.out.line("NORMAL");
    ctx.out.line(items);
    ctx.out.line(";");
    ctx.out.dedent();
}

/// Literal with `~~XX` switches: one TEXT block, one FONT per segment.
fn font_switched(ctx: &mut Context, segments: &[(String, String)], align: Option<Align>) {
    let cursor = ctx.section.cursor.clone();
    let correction = ctx.correction();

    ctx.out.line("TEXT");
    ctx.out.indent();
    if align == Some(Align::Right) {
        let x = Coord::keyword("LEFT-$MR_LEFT");
        ctx.out.line(position(&x, &cursor.y_coord(), correction.as_deref()));
        if cursor.x_is_set() {
            ctx.out.line(format!("WIDTH {} MM", py_float(cursor.x)));
        }
        ctx.out.line("ALIGN RIGHT");
    } else {
        ctx.out.line(position(&cursor.x_coord(), &cursor.y_coord(), correction.as_deref()));
    }

    for (font, segment) in segments {
        if segment.trim().is_empty() {
            continue;
        }
        let font = ctx.font_alias(font);
        ctx.out.line(format!("FONT {} NORMAL", font));
        ctx.out.line(text_items(segment));
    }
    ctx.out.line(";");
    ctx.out.dedent();
}

/// Long or justified literal: a TEXT block split into short lines.
fn text_baseline(ctx: &mut Context, text: &str, align: Option<Align>) {
    let font = ctx.section.font.clone();

    ctx.out.line("TEXT");
    ctx.out.indent();
    ctx.out.line("POSITION SAME SAME BASELINE");
    if align == Some(Align::Justify) {
        ctx.out.line(format!("WIDTH {} MM", py_float(JUSTIFY_WIDTH)));
    }
    ctx.out.line(format!("FONT {}", font));
    if let Some(align) = align {
        ctx.out.line(format!("ALIGN {}", align.keyword()));
    }
    let parts = chunks(text);
    let last = parts.len().saturating_sub(1);
    for (idx, chunk) in parts.iter().enumerate() {
        if idx == last {
            ctx.out.line(format!("{};", quote(chunk)));
        } else {
            ctx.out.line(quote(chunk));
        }
    }
    ctx.out.dedent();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConverterConfig;
    use crate::generator::malformed::MalformedDetector;
    use crate::models::Project;

    fn show(keyword: &str, source: &str) -> TextOutput {
        TextOutput {
            keyword: keyword.to_string(),
            source: source.to_string(),
            interpolate: false,
            picture: None,
            width: None,
            align: None,
        }
    }

    fn render(setup: impl FnOnce(&mut Context)) -> Vec<String> {
        let config = ConverterConfig::default();
        let project = Project::default();
        let detector = MalformedDetector::default();
        let mut ctx = Context::new(&config, &project, &detector, None);
        setup(&mut ctx);
        ctx.out.lines().to_vec()
    }

    #[test]
    fn test_literal_at_explicit_position() {
        let lines = render(|ctx| {
            ctx.section.cursor.move_to(24.0, 49.91);
            emit_text(ctx, &show("SHL", "(Account)"));
        });
        assert_eq!(
            lines,
            vec![
                "OUTPUT 'Account'",
                "    FONT ARIAL08 NORMAL",
                "    POSITION (24.0 MM-$MR_LEFT) (49.91 MM-$MR_TOP+&CORFONT8)",
                "    ALIGN LEFT NOPAD;",
            ]
        );
    }

    #[test]
    fn test_variable_is_never_quoted() {
        let lines = render(|ctx| emit_text(ctx, &show("SH", "/VAR_NAME")));
        assert_eq!(lines[0], "OUTPUT VAR_NAME");
        assert_eq!(lines[2], "    POSITION (SAME) (SAME)");
        assert_eq!(lines[3], "    ;");

        let lines = render(|ctx| emit_text(ctx, &show("SH", "$$PAGE")));
        assert_eq!(lines[0], "OUTPUT $$PAGE");
    }

    #[test]
    fn test_second_output_advances() {
        let lines = render(|ctx| {
            emit_text(ctx, &show("SHR", "FLD3"));
            emit_text(ctx, &show("SHR", "FLD4"));
        });
        assert_eq!(lines[6], "    POSITION (SAME) (NEXT)");
        assert_eq!(lines[7], "    ALIGN RIGHT NOPAD;");
    }

    #[test]
    fn test_numpicture_output() {
        let mut output = show("SHR", "VAR_AMT");
        output.picture = Some("(@@@,@@#.##)".to_string());
        let lines = render(|ctx| emit_text(ctx, &output));
        assert_eq!(lines[0], "OUTPUT NUMPICTURE(VAR_AMT,'###,##0.00')");
    }

    #[test]
    fn test_interpolated_literal() {
        let lines = render(|ctx| emit_text(ctx, &show("SH", "(Dear $$VAR_NAME.,)")));
        assert_eq!(lines[0], "OUTPUT 'Dear ' ! VAR_NAME ! ','");
    }

    #[test]
    fn test_quotes_are_doubled() {
        let lines = render(|ctx| emit_text(ctx, &show("SH", "(It's)")));
        assert_eq!(lines[0], "OUTPUT 'It''s'");
    }

    #[test]
    fn test_color_is_emitted() {
        let lines = render(|ctx| {
            ctx.section.color = Some("R".to_string());
            emit_text(ctx, &show("SHC", "(x)"));
        });
        assert_eq!(lines[3], "    COLOR R");
        assert_eq!(lines[4], "    ALIGN CENTER NOPAD;");
    }

    #[test]
    fn test_long_literal_uses_text_baseline() {
        let text = "This sentence is deliberately long so that it has to be set as a TEXT block and split over lines.";
        let lines = render(|ctx| emit_text(ctx, &show("SHL", &format!("({})", text))));
        assert_eq!(lines[0], "TEXT");
        assert_eq!(lines[1], "    POSITION SAME SAME BASELINE");
        assert_eq!(lines[2], "    FONT ARIAL08");
        assert_eq!(lines[3], "    ALIGN LEFT");
        assert!(lines.len() >= 6);
        assert!(lines.last().is_some_and(|l| l.ends_with("';")));
    }

    #[test]
    fn test_text_block_sets_lastmax() {
        let text = "x".repeat(60);
        let lines = render(|ctx| {
            emit_text(ctx, &show("SH", &format!("({})", text)));
            emit_text(ctx, &show("SH", "(after)"));
        });
        assert!(lines.iter().any(|l| l == "    POSITION (SAME) (LASTMAX+6 MM)"));
    }

    #[test]
    fn test_shp_with_width() {
        let mut output = show("SHP", "VAR_DESC");
        output.width = Some("80".to_string());
        output.align = Some("3".to_string());
        let lines = render(|ctx| emit_text(ctx, &output));
        assert_eq!(
            lines,
            vec![
                "TEXT",
                "    POSITION (SAME) (SAME)",
                "    WIDTH 80.0 MM",
                "    ALIGN JUSTIFY",
                "    FONT ARIAL08",
                "    NORMAL",
                "    (VAR_DESC)",
                "    ;",
            ]
        );
    }

    #[test]
    fn test_font_switches() {
        let lines = render(|ctx| emit_text(ctx, &show("SH", "(~~FAHello ~~FB$$VAR_X.)")));
        assert_eq!(lines[0], "TEXT");
        assert_eq!(lines[2], "    FONT FA NORMAL");
        assert_eq!(lines[3], "    'Hello '");
        assert_eq!(lines[4], "    FONT FB NORMAL");
        assert_eq!(lines[5], "    (VAR_X)");
        assert_eq!(lines[6], "    ;");
    }

    #[test]
    fn test_right_aligned_font_switches() {
        let lines = render(|ctx| {
            ctx.section.cursor.move_to(190.0, 30.0);
            emit_text(ctx, &show("SHR", "(~~F1A~~F2B)"));
        });
        assert_eq!(lines[1], "    POSITION (LEFT-$MR_LEFT) (30.0 MM-$MR_TOP+&CORFONT8)");
        assert_eq!(lines[2], "    WIDTH 190.0 MM");
        assert_eq!(lines[3], "    ALIGN RIGHT");
    }

    #[test]
    fn test_empty_source_emits_nothing() {
        assert!(render(|ctx| emit_text(ctx, &show("SH", ""))).is_empty());
    }

    #[test]
    fn test_shp_alignment_codes() {
        let mut output = show("SHP", "(x)");
        output.align = Some("1".to_string());
        assert_eq!(alignment(&output), Some(Align::Right));
        output.align = Some("9".to_string());
        assert_eq!(alignment(&output), None);
        assert_eq!(alignment(&show("SH", "(x)")), None);
    }
}
