//! End-to-end extraction and injection through the public API.

#![allow(clippy::unwrap_used)]
#![allow(clippy::indexing_slicing)]
#![allow(clippy::panic)]

use std::path::{
    Path,
    PathBuf,
};

use pretty_assertions::assert_eq;
use svg_translate::batch::{
    BatchOptions,
    FailureKind,
    FileStatus,
    start_injects,
};
use svg_translate::discover::expand_inputs;
use svg_translate::extract::{
    ExtractOptions,
    extract_file,
};
use svg_translate::inject::{
    InjectOptions,
    MappingSource,
    get_target_path,
    inject,
};
use svg_translate::mapping::{
    load_all_mappings,
    load_mapping_file,
    save_mapping,
};
use svg_translate::prepare::{
    PrepareError,
    StructureIssue,
};
use svg_translate::svg::Document;
use svg_translate::{
    Error,
    TranslationMapping,
    extract,
};
use tempfile::TempDir;

const TRANSLATED: &str = r#"<svg xmlns="http://www.w3.org/2000/svg"><switch><text id="t1-fr" systemLanguage="fr"><tspan id="s1-fr">Bonjour</tspan></text><text id="t1-ar" systemLanguage="ar"><tspan id="s1-ar">مرحبا</tspan></text><text id="t1"><tspan id="s1">Hello</tspan></text></switch><switch><text id="t2-fr" systemLanguage="fr"><tspan id="s2a-fr">Deux</tspan><tspan id="s2b-fr">lignes</tspan></text><text id="t2"><tspan id="s2a">Two</tspan><tspan id="s2b">lines</tspan></text></switch></svg>"#;

const UNTRANSLATED: &str = r#"<svg xmlns="http://www.w3.org/2000/svg"><switch><text id="t1"><tspan id="s1">Hello</tspan></text></switch><switch><text id="t2"><tspan id="s2a">Two</tspan><tspan id="s2b">lines</tspan></text></switch></svg>"#;

const ANTI_PHASE_SOURCE: &str = r#"<svg xmlns="http://www.w3.org/2000/svg"><switch><text systemLanguage="ar"><tspan>لكنها موصولة بشكل معاكس</tspan></text><text><tspan>but are connected in anti-phase</tspan></text></switch></svg>"#;

const ANTI_PHASE_TARGET: &str = r#"<svg xmlns="http://www.w3.org/2000/svg"><text x="5" y="9">but are connected in anti-phase</text></svg>"#;

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn variant_text(path: &Path, lang: &str) -> Option<String> {
    let doc = Document::load(path).unwrap();
    doc.elements_by_name("text")
        .into_iter()
        .find(|&text| doc.attribute(text, "systemLanguage") == Some(lang))
        .map(|text| doc.text_content(text))
}

#[test]
fn test_round_trip_restores_variants() {
    let dir = TempDir::new().unwrap();
    let source = write(&dir, "source.svg", TRANSLATED);
    let target = write(&dir, "target.svg", UNTRANSLATED);

    let mapping = extract_file(&source, &ExtractOptions::default()).unwrap();
    let outcome =
        inject(&target, MappingSource::Mapping(&mapping), &InjectOptions::default()).unwrap();

    assert_eq!(outcome.stats.inserted_translations, 3);
    assert_eq!(extract(&outcome.document, true).unwrap(), mapping);

    let mut expected = TranslationMapping::new();
    expected.insert("Hello", "ar", "مرحبا");
    expected.insert("Hello", "fr", "Bonjour");
    expected.insert("Two lines", "fr", "Deux\nlignes");
    assert_eq!(mapping, expected);
}

#[test]
fn test_anti_phase_label_gets_arabic() {
    let dir = TempDir::new().unwrap();
    let source = write(&dir, "source.svg", ANTI_PHASE_SOURCE);
    let target = write(&dir, "target.svg", ANTI_PHASE_TARGET);
    let mapping_path = dir.path().join("mapping.json");

    let mapping = extract_file(&source, &ExtractOptions::default()).unwrap();
    assert_eq!(
        mapping.get("but are connected in anti-phase").and_then(|t| t.get("ar")).map(String::as_str),
        Some("لكنها موصولة بشكل معاكس")
    );
    save_mapping(&mapping_path, &mapping).unwrap();

    let output = dir.path().join("out/translated.svg");
    let options = InjectOptions {
        save_result: true,
        output_file: Some(output.clone()),
        ..InjectOptions::default()
    };
    let outcome = inject(&target, MappingSource::Files(&[mapping_path]), &options).unwrap();

    assert_eq!(outcome.saved_to, Some(output.clone()));
    assert_eq!(variant_text(&output, "ar").as_deref(), Some("لكنها موصولة بشكل معاكس"));
    // The input file is untouched.
    assert_eq!(std::fs::read_to_string(&target).unwrap(), ANTI_PHASE_TARGET);
}

#[test]
fn test_overwrite_controls_existing_variants() {
    let dir = TempDir::new().unwrap();
    let mut mapping = TranslationMapping::new();
    mapping.insert("Hello", "fr", "Salut");

    let kept = write(&dir, "kept.svg", TRANSLATED);
    let options = InjectOptions { save_result: true, ..InjectOptions::default() };
    let outcome = inject(&kept, MappingSource::Mapping(&mapping), &options).unwrap();
    assert_eq!(outcome.stats.skipped_translations, 1);
    assert_eq!(variant_text(&kept, "fr").as_deref(), Some("Bonjour"));

    let replaced = write(&dir, "replaced.svg", TRANSLATED);
    let options = InjectOptions { save_result: true, overwrite: true, ..InjectOptions::default() };
    let outcome = inject(&replaced, MappingSource::Mapping(&mapping), &options).unwrap();
    assert_eq!(outcome.stats.updated_translations, 1);
    assert_eq!(variant_text(&replaced, "fr").as_deref(), Some("Salut"));
}

#[test]
fn test_target_path_in_output_dir() {
    let dir = TempDir::new().unwrap();
    let output_dir = dir.path().join("out/sub");

    let target = get_target_path("a/b.svg", None, Some(output_dir.as_path())).unwrap();

    assert_eq!(target, output_dir.join("b.svg"));
    assert!(output_dir.is_dir());
}

#[test]
fn test_mapping_files_are_merged() {
    let dir = TempDir::new().unwrap();
    let first = write(&dir, "first.json", r#"{"Hello": {"fr": "Bonjour"}}"#);
    let second = write(&dir, "second.json", r#"{"Hello": {"de": "Hallo"}, "Bye": {"fr": "Salut"}}"#);

    let mapping = load_all_mappings(&[first, second]).unwrap();

    assert_eq!(mapping.len(), 2);
    let hello: Vec<&str> = mapping.get("Hello").unwrap().keys().map(String::as_str).collect();
    assert_eq!(hello, vec!["de", "fr"]);
}

#[test]
fn test_saved_mapping_loads_back() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested/mapping.json");
    let mut mapping = TranslationMapping::new();
    mapping.insert("Hello", "fr", "Bonjour");

    save_mapping(&path, &mapping).unwrap();

    assert_eq!(load_mapping_file(&path).unwrap(), mapping);
}

#[test]
fn test_nested_spans_are_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "nested.svg", "<svg><text><tspan>a<tspan>b</tspan></tspan></text></svg>");

    let result = extract_file(&path, &ExtractOptions::default());

    match result {
        Err(Error::Prepare(PrepareError::Structure(e))) => {
            assert_eq!(e.issue, StructureIssue::NestedTspans);
            assert!(e.to_string().starts_with("structure-error-nested-tspans-not-supported"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_batch_continues_past_missing_file() {
    let dir = TempDir::new().unwrap();
    let good = write(&dir, "good.svg", UNTRANSLATED);
    let missing = dir.path().join("missing.svg");
    let mut mapping = TranslationMapping::new();
    mapping.insert("Hello", "fr", "Bonjour");

    let output_dir = dir.path().join("out");
    let options = BatchOptions { output_dir: Some(output_dir.clone()), ..BatchOptions::default() };
    let report = start_injects(&[missing, good], &mapping, &options);

    assert_eq!(report.saved_done, 1);
    assert_eq!(report.no_save, 1);
    assert!(matches!(
        report.results[0].status,
        FileStatus::Failed { kind: FailureKind::Io, .. }
    ));
    assert_eq!(variant_text(&output_dir.join("good.svg"), "fr").as_deref(), Some("Bonjour"));
}

#[test]
fn test_missing_input_path_is_reported_per_file() {
    let dir = TempDir::new().unwrap();
    write(&dir, "good.svg", UNTRANSLATED);
    let missing = dir.path().join("gone.svg");
    let mut mapping = TranslationMapping::new();
    mapping.insert("Hello", "fr", "Bonjour");

    let inputs = [missing.clone(), dir.path().to_path_buf()];
    let targets = expand_inputs(&inputs, &["**/*.svg".to_string()], &[]).unwrap();
    assert_eq!(targets, vec![missing, dir.path().join("good.svg")]);

    let options =
        BatchOptions { output_dir: Some(dir.path().join("out")), ..BatchOptions::default() };
    let report = start_injects(&targets, &mapping, &options);

    assert_eq!(report.saved_done, 1);
    assert_eq!(report.errors.get(&FailureKind::Io), Some(&1));
}
