// tests/config_loading.rs

use std::error::Error;
use std::path::PathBuf;

use assetforge::config::{load_and_validate, load_from_str};
use assetforge::errors::AssetforgeError;
use assetforge::types::{ChangeWhileCompiling, OutputStyle, PipelineKind};

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn minimal_config_gets_defaults() -> TestResult {
    let cfg = load_from_str(
        r#"
        [styles]
        path = "src/styles"
        file = "main.scss"
        output = "build/css/styles.css"
        "#,
    )?;

    assert_eq!(cfg.config.changes_while_compiling, ChangeWhileCompiling::Queue);
    assert!(!cfg.config.use_hash);
    assert!(cfg.scripts.is_none());

    let styles = cfg.pipeline(PipelineKind::Styles).ok_or("styles missing")?;
    assert_eq!(styles.entry(), PathBuf::from("src/styles/main.scss"));
    assert!(!styles.compiler.source_map);
    assert_eq!(styles.compiler.output_style, OutputStyle::Expanded);
    assert!(styles.watch_extra.is_empty());
    assert!(!styles.notifications);
    Ok(())
}

#[test]
fn full_config_round_trips_every_field() -> TestResult {
    let cfg = load_from_str(
        r#"
        [config]
        changes_while_compiling = "drop"
        use_hash = true

        [scripts]
        path = "src/scripts"
        file = "main.js"
        output = "build/js/bundle.js"
        notifications = true
        exclude = ["src/scripts/**/*.test.js"]

        [scripts.compiler]
        source_map = true
        target = "es2015"

        [styles]
        path = "src/styles"
        file = "main.scss"
        output = "build/css/styles.css"
        watch_extra = "config/tokens.yml"

        [styles.compiler]
        output_style = "compressed"
        load_paths = ["node_modules"]
        "#,
    )?;

    assert_eq!(cfg.config.changes_while_compiling, ChangeWhileCompiling::Drop);
    assert!(cfg.config.use_hash);

    let kinds: Vec<_> = cfg.pipelines().map(|(kind, _)| kind).collect();
    assert_eq!(kinds, vec![PipelineKind::Scripts, PipelineKind::Styles]);

    let scripts = cfg.scripts.as_ref().ok_or("scripts missing")?;
    assert!(scripts.compiler.source_map);
    assert!(scripts.notifications);
    assert_eq!(scripts.exclude, vec!["src/scripts/**/*.test.js".to_string()]);
    assert_eq!(
        scripts.compiler.extra.get("target").and_then(|v| v.as_str()),
        Some("es2015")
    );

    let styles = cfg.styles.as_ref().ok_or("styles missing")?;
    assert_eq!(styles.watch_extra, vec![PathBuf::from("config/tokens.yml")]);
    assert_eq!(styles.compiler.output_style, OutputStyle::Compressed);
    assert_eq!(styles.compiler.load_paths, vec![PathBuf::from("node_modules")]);
    Ok(())
}

#[test]
fn config_without_pipelines_is_rejected() {
    let err = load_from_str("[config]\nuse_hash = true\n").unwrap_err();
    assert!(matches!(err, AssetforgeError::ConfigError(_)), "{err:?}");
}

#[test]
fn unknown_policy_is_rejected() {
    let err = load_from_str(
        r#"
        [config]
        changes_while_compiling = "restart"

        [scripts]
        path = "src"
        file = "main.js"
        output = "out.js"
        "#,
    )
    .unwrap_err();
    assert!(matches!(err, AssetforgeError::TomlError(_)), "{err:?}");
}

#[test]
fn unknown_section_key_is_rejected() {
    let err = load_from_str(
        r#"
        [styles]
        path = "src"
        file = "main.scss"
        output = "out.css"
        wacth_extra = "typo"
        "#,
    )
    .unwrap_err();
    assert!(matches!(err, AssetforgeError::TomlError(_)), "{err:?}");
}

#[test]
fn shared_output_is_rejected() {
    let err = load_from_str(
        r#"
        [scripts]
        path = "src"
        file = "main.js"
        output = "build/out"

        [styles]
        path = "src"
        file = "main.scss"
        output = "build/out"
        "#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("both write"), "{err}");
}

#[test]
fn loads_from_disk() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("Assetforge.toml");
    std::fs::write(
        &path,
        "[scripts]\npath = \"src\"\nfile = \"main.js\"\noutput = \"build/app.js\"\n",
    )?;

    let cfg = load_and_validate(&path)?;
    assert!(cfg.scripts.is_some());

    let missing = load_and_validate(dir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(missing, AssetforgeError::IoError(_)), "{missing:?}");
    Ok(())
}
