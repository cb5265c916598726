//! Translation behavior checked through whole-document output:
//! conditional reconstruction, vertical positioning, subroutine inlining
//! and stub formats for unreferenced record prefixes.

use vipp2dfa::config::ConverterConfig;
use vipp2dfa::generator::Translator;
use vipp2dfa::models::Project;
use vipp2dfa::structure::build_document;

fn translate_with(config: ConverterConfig, source: &str) -> String {
    let project = Project::new(build_document("test.dbm", source), Vec::new());
    Translator::new(config).with_date("2025-01-31").translate_document(&project).text
}

fn translate(source: &str) -> String {
    translate_with(ConverterConfig::default(), source)
}

/// A single `HD` record case. Bodies include output so the case gets a format.
fn case(body: &str) -> String {
    format!("CASE PREFIX\n(HD) {{ {} }}\nENDCASE\n", body)
}

fn trimmed(text: &str) -> Vec<&str> {
    text.lines().map(str::trim).collect()
}

/// Lines from `start` up to and including the first line equal to `end`.
fn span<'a>(lines: &[&'a str], start: &str, end: &str) -> Vec<&'a str> {
    let Some(from) = lines.iter().position(|l| l.starts_with(start)) else {
        return Vec::new();
    };
    let to = lines[from..].iter().position(|l| *l == end).map_or(lines.len(), |i| from + i + 1);
    lines[from..to].to_vec()
}

// ============================================================================
// Conditionals
// ============================================================================

#[test]
fn test_postfix_if_else() {
    let text = translate(&case("VAR_A (X) eq { /VAR_B 1 SETVAR } IF { /VAR_B 2 SETVAR } ELSE (x) SH"));
    let lines = trimmed(&text);
    assert_eq!(
        span(&lines, "IF ISTRUE(NOSPACE(VAR_A)", "ENDIF;"),
        vec!["IF ISTRUE(NOSPACE(VAR_A) == 'X');", "THEN;", "VAR_B = 1;", "ELSE;", "VAR_B = 2;", "ENDIF;"]
    );
}

#[test]
fn test_prefix_flat_if_else() {
    let text = translate(&case("IF VAR_A (X) eq\n/VAR_B 1 SETVAR\nELSE\n/VAR_B 2 SETVAR\nENDIF\n(x) SH"));
    let lines = trimmed(&text);
    assert_eq!(
        span(&lines, "IF ISTRUE(NOSPACE(VAR_A)", "ENDIF;"),
        vec!["IF ISTRUE(NOSPACE(VAR_A) == 'X');", "THEN;", "VAR_B = 1;", "ELSE;", "VAR_B = 2;", "ENDIF;"]
    );
}

#[test]
fn test_numeric_comparison_is_not_trimmed() {
    let text = translate(&case("VAR_N 0 gt { /VAR_B 1 SETVAR } IF (x) SH"));
    assert!(trimmed(&text).contains(&"IF ISTRUE(VAR_N > 0);"));
}

#[test]
fn test_nested_conditionals_balance() {
    let text = translate(&case("VAR_A (X) eq { VAR_B (Y) eq { /VAR_C 1 SETVAR } IF } IF (x) SH"));
    let lines = trimmed(&text);
    let ifs = lines.iter().filter(|l| l.starts_with("IF ISTRUE(")).count();
    let endifs = lines.iter().filter(|l| **l == "ENDIF;").count();
    assert_eq!(ifs, 2);
    assert!(endifs >= 2);
}

// ============================================================================
// Vertical positioning
// ============================================================================

#[test]
fn test_negative_new_lines_fold_into_next() {
    let text = translate(&case("(a) SH -4 NL (b) SH -1 NL (c) SH -5 NL (d) SH"));
    let lines = trimmed(&text);
    assert!(lines.contains(&"POSITION (SAME) (NEXT-($LINESP*#3))"));
    assert!(lines.contains(&"POSITION (SAME) (NEXT-($LINESP*#4))"));
    assert!(!lines.iter().any(|l| l.contains("#0")));
}

#[test]
fn test_positive_new_line_amount() {
    let text = translate(&case("(a) SH 0.3 NL (b) SH"));
    assert!(trimmed(&text).contains(&"POSITION (SAME) (SAME+0.3 MM);"));
}

#[test]
fn test_moveto_is_absolute() {
    let text = translate(&case("20 30 MOVETO (x) SHL"));
    assert!(trimmed(&text).contains(&"POSITION (20.0 MM-$MR_LEFT) (30.0 MM-$MR_TOP+&CORFONT8)"));
}

// ============================================================================
// Text and formatting
// ============================================================================

#[test]
fn test_vsub_interpolates_variables() {
    let text = translate(&case("(Dear $$VAR_NAME.,) VSUB SH"));
    assert!(trimmed(&text).contains(&"OUTPUT 'Dear ' ! VAR_NAME ! ','"));
}

#[test]
fn test_numeric_pictures() {
    let text = translate(&case("VAR_A (@@@,@@@,@@@,@@#.##) FORMAT SHR VAR_B (@@#) FORMAT SHR"));
    let lines = trimmed(&text);
    assert!(lines.contains(&"OUTPUT NUMPICTURE(VAR_A,'#,##0.00')"));
    assert!(lines.contains(&"OUTPUT NUMPICTURE(VAR_B,'##0')"));
}

// ============================================================================
// Subroutines
// ============================================================================

fn subroutine_source(name: &str, count: usize) -> String {
    let body: Vec<String> = (0..count).map(|i| format!("(line{}) SH", i)).collect();
    format!("/{} {{ {} }} XGFRESDEF\n{}", name, body.join(" "), case(&format!("({}) SCALL", name)))
}

#[test]
fn test_subroutine_at_threshold_is_inlined() {
    let text = translate(&subroutine_source("FIVE", 5));
    assert!(text.contains("/* Inlined subroutine: FIVE (5 commands) */"));
    assert!(!text.contains("DOCFORMAT SR_FIVE;"));
}

#[test]
fn test_subroutine_over_threshold_gets_format() {
    let text = translate(&subroutine_source("SIX", 6));
    assert!(text.contains("USE FORMAT SR_SIX;"));
    assert!(text.contains("DOCFORMAT SR_SIX;"));
    assert!(!text.contains("/* Inlined subroutine: SIX"));
}

#[test]
fn test_inline_threshold_is_configurable() {
    let mut config = ConverterConfig::default();
    config.subroutines.inline_threshold = 10;
    let text = translate_with(config, &subroutine_source("SIX", 6));
    assert!(text.contains("/* Inlined subroutine: SIX (6 commands) */"));
}

// ============================================================================
// Stub formats
// ============================================================================

#[test]
fn test_stub_for_commented_prefix() {
    let source = format!("{}% PREFIX eq (ZZ) {{ }} IF\n", case("(x) SH"));
    let text = translate(&source);
    let lines = trimmed(&text);
    assert!(lines.contains(&"DOCFORMAT DF_HD;"));
    assert!(lines.contains(&"DOCFORMAT DF_ZZ;"));
    assert!(lines.contains(&"/* ZZ Prefix not found or commented out */"));
    assert!(lines.contains(&"/* END OF STUB DOCFORMATS */"));
}

#[test]
fn test_no_stubs_when_all_prefixes_exist() {
    let text = translate(&case("(x) SH"));
    assert!(!text.contains("END OF STUB DOCFORMATS"));
}
