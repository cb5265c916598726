//! DocDEF program generation
//!
//! A [`Translator`] holds only the configuration and the compiled
//! malformed-line patterns, so one instance can be shared by worker
//! threads. Each call builds its own [`Context`] and returns a finished
//! [`Program`].
//!
//! # Example
//!
//! ```
//! use vipp2dfa::config::ConverterConfig;
//! use vipp2dfa::generator::Translator;
//! use vipp2dfa::models::Project;
//! use vipp2dfa::structure::build_document;
//!
//! let document = build_document("demo.dbm", "CASE PREFIX\n(HD) { 20 40 MOVETO (Hello) SHL }\nENDCASE\n");
//! let project = Project::new(document, Vec::new());
//! let program = Translator::new(ConverterConfig::default()).translate_document(&project);
//! assert!(program.text.contains("DOCFORMAT DF_HD;"));
//! ```

pub mod condition;
pub mod context;
pub mod graphics;
pub mod malformed;
pub mod output;
pub mod position;
pub mod scaffold;
pub mod subform;
pub mod text;
pub mod walker;

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::ConverterConfig;
use crate::models::{Project, SubForm};

use self::context::Context;
use self::malformed::MalformedDetector;

/// Generated program text with the warnings collected while writing it
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// DOCDEF or format name
    pub name: String,
    pub text: String,
    pub warnings: Vec<String>,
}

/// Translates parsed projects into DocDEF programs
#[derive(Debug, Clone)]
pub struct Translator {
    config: ConverterConfig,
    detector: MalformedDetector,
    /// Fixed conversion date; today's UTC date when unset
    date: Option<String>,
}

impl Translator {
    pub fn new(config: ConverterConfig) -> Self {
        let detector = MalformedDetector::new(&config.malformed);
        Self { config, detector, date: None }
    }

    /// Stamp programs with `date` instead of today's date.
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    fn context<'a>(&'a self, project: &'a Project, form: Option<&'a SubForm>) -> Context<'a> {
        Context::new(&self.config, project, &self.detector, form.map(|f| &f.renames))
    }

    /// Program for the project's primary document.
    pub fn translate_document(&self, project: &Project) -> Program {
        let date = self.date.clone().unwrap_or_else(scaffold::conversion_date);
        let mut ctx = self.context(project, None);

        scaffold::header(&mut ctx, &date);
        scaffold::formats(&mut ctx);
        scaffold::format_group(&mut ctx);
        scaffold::fonts(&mut ctx);
        scaffold::colors(&mut ctx);
        scaffold::main_format(&mut ctx);
        let generated = scaffold::case_formats(&mut ctx);
        scaffold::routine_formats(&mut ctx, 20.0, 40.0);
        scaffold::stubs(&mut ctx, &generated);
        scaffold::before_first_doc(&mut ctx);
        scaffold::before_doc(&mut ctx);

        let mut warnings = self.validate_conversion(project, &ctx.registry);
        debug!(sections = generated.len(), "Document program written");
        let (text, section_warnings) = ctx.into_output();
        warnings.extend(section_warnings);
        Program { name: project.document.docdef_name(), text, warnings }
    }

    /// Program for one sub-form of `project`.
    pub fn translate_form(&self, project: &Project, form: &SubForm) -> Program {
        let mut ctx = self.context(project, Some(form));
        subform::form_program(&mut ctx, form);
        let (text, warnings) = ctx.into_output();
        Program { name: form.format_name(), text, warnings }
    }

    /// Structural problems worth reporting after a document translation.
    pub fn validate_conversion(&self, project: &Project, registry: &BTreeMap<String, String>) -> Vec<String> {
        let mut warnings = Vec::new();
        if project.document.wizvar_fields.is_empty() {
            warnings.push("No field names detected - using defaults".to_string());
        }
        if self.config.input.record_length < 2048 {
            warnings.push("RECORD-LENGTH may be too small for complex data".to_string());
        }
        if registry.is_empty() {
            warnings.push("No format registry built - dynamic routing disabled".to_string());
        }
        if project.document.cases.is_empty() {
            warnings.push("No CASE blocks found - document may not process data correctly".to_string());
        }
        warnings
    }
}
