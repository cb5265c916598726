//! Sub-form program layout

use crate::config::SubformMode;
use crate::models::SubForm;

use super::context::Context;
use super::scaffold::{metadata_lines, routine_formats, BANNER};
use super::walker::walk_commands;

const MARGINS: &str = "MARGIN TOP 0 MM BOTTOM 0 MM LEFT 0 MM RIGHT 0 MM;";

fn origin_outline(ctx: &mut Context, opener: &str) {
    ctx.out.line(opener);
    ctx.out.indent();
    ctx.out.line("POSITION (0 MM) (0 MM)");
    ctx.out.line("DIRECTION ACROSS;");
    ctx.out.blank();
}

/// Form body inside an OUTLINE that is already open.
fn form_body(ctx: &mut Context, form: &SubForm) {
    ctx.begin_section(0.0, 0.0);
    ctx.section.outline_open = true;
    walk_commands(ctx, &form.commands);
    ctx.section.outline_open = false;
}

/// Write the whole program for `form`.
pub fn form_program(ctx: &mut Context, form: &SubForm) {
    let name = form.format_name();
    ctx.out.line(format!("/* FRM DFA File: {} */", form.file_name));
    ctx.out.line(BANNER);
    metadata_lines(ctx, &form.metadata);
    ctx.out.blank();

    match ctx.config.layout.subform_mode {
        SubformMode::Standalone => {
            ctx.out.line(format!("DOCFORMAT {};", name));
            ctx.out.indent();
            ctx.out.line(MARGINS);
            ctx.out.line("SETUNITS LINESP AUTO;");
            ctx.out.blank();
            origin_outline(ctx, "OUTLINE");
            form_body(ctx, form);
            ctx.out.dedent();
            ctx.out.line("ENDIO;");
            ctx.out.dedent();
            ctx.out.blank();
            ctx.out.line(format!("/* END OF FRM DOCFORMAT {} */", name));
        }
        SubformMode::Include => {
            ctx.out.line(format!("/* External Format: {} */", form.file_name));
            ctx.out.blank();
            origin_outline(ctx, "OUTLINE ");
            form_body(ctx, form);
            ctx.out.set_level(0);
            ctx.out.line("ENDIO;");
        }
    }
    ctx.out.blank();
    routine_formats(ctx, 0.0, 0.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConverterConfig;
    use crate::generator::malformed::MalformedDetector;
    use crate::models::{Metadata, PrimaryDocument, Project};
    use crate::structure::build_form;

    fn render(config: &ConverterConfig, form: &SubForm) -> Vec<String> {
        let project = Project::new(PrimaryDocument::default(), vec![form.clone()]);
        let detector = MalformedDetector::default();
        let mut ctx = Context::new(config, &project, &detector, Some(&form.renames));
        form_program(&mut ctx, form);
        ctx.out.lines().to_vec()
    }

    #[test]
    fn test_include_mode() {
        let mut form = build_form("casiof.frm", "20 30 MOVETO (Hello) SHL\n");
        form.metadata = Metadata { title: Some("Front".into()), ..Default::default() };
        let lines = render(&ConverterConfig::default(), &form);
        assert_eq!(lines[0], "/* FRM DFA File: casiof.frm */");
        assert_eq!(lines[1], BANNER);
        assert_eq!(lines[2], "/* Original Title: Front */");
        assert_eq!(lines[4], "/* External Format: casiof.frm */");
        assert_eq!(lines[6], "OUTLINE ");
        assert_eq!(lines[7], "    POSITION (0 MM) (0 MM)");
        assert!(lines.contains(&"    OUTPUT 'Hello'".to_string()));
        assert!(lines.contains(&"        POSITION (20.0 MM-$MR_LEFT) (30.0 MM-$MR_TOP+&CORFONT8)".to_string()));
        assert!(!lines.iter().any(|l| l.trim() == "POSITION LEFT NEXT"));
        assert_eq!(lines.iter().filter(|l| l.as_str() == "ENDIO;").count(), 1);
    }

    #[test]
    fn test_standalone_mode() {
        let mut config = ConverterConfig::default();
        config.layout.subform_mode = SubformMode::Standalone;
        let form = build_form("casio_tnc.frm", "(Terms) SH\n");
        let lines = render(&config, &form);
        assert_eq!(lines[3], "DOCFORMAT CASIO_TNC;");
        assert_eq!(lines[4], "    MARGIN TOP 0 MM BOTTOM 0 MM LEFT 0 MM RIGHT 0 MM;");
        assert_eq!(lines[7], "    OUTLINE");
        assert!(lines.contains(&"    ENDIO;".to_string()));
        assert!(lines.contains(&"/* END OF FRM DOCFORMAT CASIO_TNC */".to_string()));
    }

    #[test]
    fn test_renamed_font_is_used() {
        let mut form = build_form("b.frm", "/F1 /ARIALB 9 INDEXFONT\nF1 (x) SH\n");
        form.renames.fonts.insert("F1".into(), "F1_1".into());
        let lines = render(&ConverterConfig::default(), &form);
        assert!(lines.contains(&"        FONT F1_1 NORMAL".to_string()));
    }
}
