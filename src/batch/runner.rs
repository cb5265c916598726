//! Conversion runs over a single document or a whole source tree.
//!
//! Project groups are independent, so a directory run translates them on a
//! rayon pool. Every translation builds its own generator context, and the
//! shared [`Translator`] holds nothing mutable.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::{debug, error, info, warn};

use super::{
    discover_sources, group_by_directory, sibling_forms, source_kind, write_report, BatchError, ConversionRecord,
    ProjectGroup, SourceKind, DOCUMENT_SUCCESS, FORM_SUCCESS,
};
use crate::config::ConverterConfig;
use crate::generator::Translator;
use crate::models::{Project, SubForm};
use crate::resolver::resolve_conflicts;
use crate::resources::copy_resources;
use crate::structure::{build_document, build_form, read_source, LoadError};

/// Default number of parallel jobs (uses available parallelism).
fn default_jobs() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// Sub-forms parsed once per group, keyed back to their source paths.
#[derive(Debug, Default)]
struct LoadedForms {
    forms: Vec<SubForm>,
    paths: BTreeMap<String, PathBuf>,
}

/// Runs conversions and writes their outputs.
#[derive(Debug)]
pub struct BatchRunner {
    translator: Translator,
    output_dir: PathBuf,
    report: bool,
    copy_resources: bool,
    jobs: usize,
}

impl BatchRunner {
    pub fn new(config: ConverterConfig) -> Self {
        let output_dir = config.output.dir.clone();
        let report = config.output.report;
        let copy_resources = config.output.copy_resources;
        let jobs = config.output.jobs.unwrap_or_else(default_jobs).max(1);
        Self { translator: Translator::new(config), output_dir, report, copy_resources, jobs }
    }

    /// Replace the translator, keeping output settings.
    pub fn with_translator(mut self, translator: Translator) -> Self {
        self.translator = translator;
        self
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Convert a `.dbm` file or every project below a directory.
    pub fn run(&self, input: &Path) -> Result<Vec<ConversionRecord>, BatchError> {
        if input.is_dir() {
            self.run_directory(input)
        } else {
            self.run_single(input)
        }
    }

    /// Convert one primary document together with the sub-forms beside it.
    pub fn run_single(&self, path: &Path) -> Result<Vec<ConversionRecord>, BatchError> {
        if !path.is_file() {
            return Err(BatchError::NotFound(path.to_path_buf()));
        }
        match source_kind(path) {
            Some(SourceKind::Document) => {}
            Some(SourceKind::Form) => return Err(BatchError::StandaloneSubForm(path.to_path_buf())),
            None => return Err(LoadError::UnsupportedFile(path.to_path_buf()).into()),
        }

        fs::create_dir_all(&self.output_dir)?;
        let forms = self.load_forms(&sibling_forms(path)?);
        let resource_root = path.parent().filter(|d| !d.as_os_str().is_empty()).unwrap_or(Path::new("."));
        let records = self.convert_document(path, &forms, resource_root);
        self.finish(records)
    }

    /// Convert every project group found below `root`.
    pub fn run_directory(&self, root: &Path) -> Result<Vec<ConversionRecord>, BatchError> {
        if !root.is_dir() {
            return Err(BatchError::NotFound(root.to_path_buf()));
        }

        fs::create_dir_all(&self.output_dir)?;
        let groups = group_by_directory(discover_sources(root)?);
        info!("Found {} project groups in {}", groups.len(), root.display());

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
            .map_err(|e| BatchError::ThreadPool(e.to_string()))?;
        let per_group: Vec<Vec<ConversionRecord>> =
            pool.install(|| groups.par_iter().map(|group| self.convert_group(group, root)).collect());

        self.finish(per_group.into_iter().flatten().collect())
    }

    fn finish(&self, records: Vec<ConversionRecord>) -> Result<Vec<ConversionRecord>, BatchError> {
        if self.report && !records.is_empty() {
            write_report(&self.output_dir, &records)?;
        }
        Ok(records)
    }

    fn convert_group(&self, group: &ProjectGroup, resource_root: &Path) -> Vec<ConversionRecord> {
        if group.documents.is_empty() {
            warn!("Skipping {}: FRM files without a DBM", group.dir.display());
            return Vec::new();
        }
        let forms = self.load_forms(&group.forms);
        group.documents.iter().flat_map(|document| self.convert_document(document, &forms, resource_root)).collect()
    }

    /// Parse sub-forms, logging and skipping the unreadable ones.
    fn load_forms(&self, paths: &[PathBuf]) -> LoadedForms {
        let mut loaded = LoadedForms::default();
        for path in paths {
            let content = match read_source(path) {
                Ok(content) => content,
                Err(e) => {
                    error!("Error parsing FRM file {}: {}", path.display(), e);
                    continue;
                }
            };
            let form = build_form(&file_name(path), &content);
            loaded.paths.insert(form.file_name.clone(), path.clone());
            loaded.forms.push(form);
        }
        loaded
    }

    /// Translate one document and its sub-forms, sub-form records first.
    fn convert_document(&self, path: &Path, loaded: &LoadedForms, resource_root: &Path) -> Vec<ConversionRecord> {
        info!("Processing DBM file: {}", path.display());
        let source = path.display().to_string();
        let content = match read_source(path) {
            Ok(content) => content,
            Err(e) => {
                error!("Error converting {}: {}", source, e);
                return vec![ConversionRecord::error(source, e.to_string())];
            }
        };

        let name = file_name(path);
        let mut project = Project::new(build_document(&name, &content), loaded.forms.clone());
        let renames = resolve_conflicts(&mut project);
        debug!(renames = renames.len(), "Resolved alias conflicts for {}", name);

        let mut records = Vec::new();
        for form in &project.forms {
            let form_source = loaded.paths.get(&form.file_name).map_or_else(|| form.file_name.clone(), |p| p.display().to_string());
            let program = self.translator.translate_form(&project, form);
            let output = self.output_path(&form.file_name);
            match fs::write(&output, &program.text) {
                Ok(()) => {
                    info!("Converted FRM {} -> {}", form_source, output.display());
                    records.push(ConversionRecord::success(form_source, output.display().to_string(), FORM_SUCCESS));
                }
                Err(e) => error!("Error converting FRM file {}: {}", form_source, e),
            }
        }

        let program = self.translator.translate_document(&project);
        for warning in &program.warnings {
            warn!(file = %name, "{}", warning);
        }
        let output = self.output_path(&name);
        match fs::write(&output, &program.text) {
            Ok(()) => {
                info!("Converted {} -> {}", source, output.display());
                records.push(ConversionRecord::success(source, output.display().to_string(), DOCUMENT_SUCCESS));
            }
            Err(e) => {
                error!("Error converting {}: {}", source, e);
                records.push(ConversionRecord::error(source, format!("Failed to write {}: {}", output.display(), e)));
            }
        }

        if self.copy_resources {
            let sources = std::iter::once(project.document.raw.as_str()).chain(project.forms.iter().map(|f| f.raw.as_str()));
            copy_resources(sources, resource_root, &self.output_dir);
        }
        records
    }

    fn output_path(&self, file_name: &str) -> PathBuf {
        let stem = Path::new(file_name).file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        self.output_dir.join(format!("{}.dfa", stem))
    }
}

fn file_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{ConversionStatus, REPORT_FILE};
    use tempfile::TempDir;

    const DOCUMENT: &str = "/ARIAL8 /ARIAL 8 INDEXFONT\nCASE PREFIX\n(HD) { 20 40 MOVETO (Hello) SHL }\nENDCASE\n";
    const FORM: &str = "/ARIAL8 /ARIAL 8 INDEXFONT\n10 10 MOVETO (Form text) SHL\n";

    fn runner(output: &Path, report: bool) -> BatchRunner {
        let mut config = ConverterConfig::default();
        config.output.dir = output.to_path_buf();
        config.output.report = report;
        config.output.jobs = Some(2);
        BatchRunner::new(config)
    }

    #[test]
    fn test_jobs_minimum() {
        let mut config = ConverterConfig::default();
        config.output.jobs = Some(0);
        assert_eq!(BatchRunner::new(config).jobs(), 1);
    }

    #[test]
    fn test_run_single_with_forms() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        fs::write(input.path().join("main.dbm"), DOCUMENT).unwrap();
        fs::write(input.path().join("form.frm"), FORM).unwrap();

        let records = runner(output.path(), false).run_single(&input.path().join("main.dbm")).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].message, FORM_SUCCESS);
        assert_eq!(records[1].message, DOCUMENT_SUCCESS);
        assert!(output.path().join("main.dfa").exists());
        assert!(output.path().join("form.dfa").exists());
        assert!(!output.path().join(REPORT_FILE).exists());
    }

    #[test]
    fn test_run_single_rejects_form() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        fs::write(input.path().join("form.frm"), FORM).unwrap();

        let err = runner(output.path(), false).run_single(&input.path().join("form.frm")).unwrap_err();
        assert!(matches!(err, BatchError::StandaloneSubForm(_)));
        assert_eq!(err.to_string(), "Cannot convert standalone FRM file. Please provide a DBM file.");
    }

    #[test]
    fn test_run_single_rejects_other_extensions() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        fs::write(input.path().join("job.jdt"), "").unwrap();

        let err = runner(output.path(), false).run_single(&input.path().join("job.jdt")).unwrap_err();
        assert!(matches!(err, BatchError::Load(LoadError::UnsupportedFile(_))));
    }

    #[test]
    fn test_run_missing_input() {
        let output = TempDir::new().unwrap();
        let err = runner(output.path(), false).run(Path::new("/no/such/input.dbm")).unwrap_err();
        assert!(matches!(err, BatchError::NotFound(_)));
    }

    #[test]
    fn test_run_directory_writes_report() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        fs::create_dir_all(input.path().join("a")).unwrap();
        fs::create_dir_all(input.path().join("b")).unwrap();
        fs::create_dir_all(input.path().join("orphans")).unwrap();
        fs::write(input.path().join("a/one.DBM"), DOCUMENT).unwrap();
        fs::write(input.path().join("a/shared.frm"), FORM).unwrap();
        fs::write(input.path().join("b/two.dbm"), DOCUMENT).unwrap();
        fs::write(input.path().join("orphans/lonely.frm"), FORM).unwrap();

        let records = runner(output.path(), true).run_directory(input.path()).unwrap();

        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.status == ConversionStatus::Success));
        assert!(output.path().join("one.dfa").exists());
        assert!(output.path().join("shared.dfa").exists());
        assert!(output.path().join("two.dfa").exists());
        assert!(!output.path().join("lonely.dfa").exists());

        let report = fs::read_to_string(output.path().join(REPORT_FILE)).unwrap();
        let parsed: Vec<ConversionRecord> = serde_json::from_str(&report).unwrap();
        assert_eq!(parsed, records);
    }

    #[test]
    fn test_empty_directory_writes_no_report() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let records = runner(output.path(), true).run_directory(input.path()).unwrap();
        assert!(records.is_empty());
        assert!(!output.path().join(REPORT_FILE).exists());
    }
}
