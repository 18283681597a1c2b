use std::fs;

use ragdb_core::config::Settings;
use ragdb_core::traits::Generator;
use ragdb_core::Error;
use ragdb_generate::{build_prompt, generator_from_settings, DeterministicGenerator, ModelGenerator};
use tempfile::TempDir;

#[test]
fn deterministic_generator_echoes_trimmed_context() {
    let generator = DeterministicGenerator;
    let answer = generator.generate("Are pets allowed?", "  Pets are not allowed in the building.\n").unwrap();
    assert_eq!(answer, "Answer: Pets are not allowed in the building.");
    assert_eq!(generator.generate("q", "").unwrap(), "Answer: ");
}

#[test]
fn prompt_places_context_before_question() {
    let prompt = build_prompt("Are pets allowed?", "Pets are not allowed.");
    assert_eq!(
        prompt,
        "Answer the question using only the provided context.\nContext:\nPets are not allowed.\n\nQuestion: Are pets allowed?"
    );
}

#[test]
fn default_settings_pick_deterministic_generator() {
    let tmp = TempDir::new().unwrap();
    let generator = generator_from_settings(&Settings::default(), tmp.path()).unwrap();
    assert_eq!(generator.name(), "deterministic");
}

#[test]
fn missing_model_directory_fails_at_construction() {
    let tmp = TempDir::new().unwrap();
    let mut settings = Settings::default();
    settings.generation.model_dir = Some("models/absent".to_string());
    let err = generator_from_settings(&settings, tmp.path()).err().unwrap();
    assert!(matches!(err, Error::Generation(_)), "got {err:?}");
}

#[test]
fn incomplete_model_directory_names_missing_file() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("config.json"), "{}").unwrap();
    let err = ModelGenerator::load(tmp.path(), 16).err().unwrap();
    match err {
        Error::Generation(msg) => assert!(msg.contains("tokenizer.json"), "{msg}"),
        other => panic!("unexpected error {other:?}"),
    }
}
