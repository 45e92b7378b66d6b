// src/config/validate.rs

use globset::Glob;

use crate::config::model::{ConfigFile, PipelineConfig, RawConfigFile};
use crate::errors::{AssetforgeError, Result};
use crate::script::ScriptTarget;
use crate::types::PipelineKind;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = AssetforgeError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.scripts, raw.styles))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_pipeline(cfg)?;
    if let Some(scripts) = &cfg.scripts {
        validate_pipeline(PipelineKind::Scripts, scripts)?;
    }
    if let Some(styles) = &cfg.styles {
        validate_pipeline(PipelineKind::Styles, styles)?;
    }
    ensure_distinct_outputs(cfg)?;
    Ok(())
}

fn ensure_has_pipeline(cfg: &RawConfigFile) -> Result<()> {
    if cfg.scripts.is_none() && cfg.styles.is_none() {
        return Err(AssetforgeError::ConfigError(
            "config must contain a [scripts] or [styles] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_pipeline(kind: PipelineKind, p: &PipelineConfig) -> Result<()> {
    if p.file.trim().is_empty() {
        return Err(AssetforgeError::ConfigError(format!(
            "[{kind}].file must not be empty"
        )));
    }
    if p.output.as_os_str().is_empty() {
        return Err(AssetforgeError::ConfigError(format!(
            "[{kind}].output must not be empty"
        )));
    }
    if p.output == p.entry() {
        return Err(AssetforgeError::ConfigError(format!(
            "[{kind}].output must not overwrite the entry file {:?}",
            p.entry()
        )));
    }
    if kind == PipelineKind::Scripts {
        if let Some(target) = &p.compiler.target {
            ScriptTarget::parse(target).map_err(|e| {
                AssetforgeError::ConfigError(format!(
                    "[scripts.compiler].target {target:?} is not a valid target: {e}"
                ))
            })?;
        }
    }
    for pattern in &p.exclude {
        Glob::new(pattern).map_err(|e| {
            AssetforgeError::ConfigError(format!(
                "[{kind}].exclude has invalid glob {pattern:?}: {e}"
            ))
        })?;
    }
    Ok(())
}

fn ensure_distinct_outputs(cfg: &RawConfigFile) -> Result<()> {
    if let (Some(scripts), Some(styles)) = (&cfg.scripts, &cfg.styles) {
        if scripts.output == styles.output {
            return Err(AssetforgeError::ConfigError(format!(
                "[scripts] and [styles] both write {:?}",
                scripts.output
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(text: &str) -> RawConfigFile {
        toml::from_str(text).unwrap()
    }

    #[test]
    fn rejects_config_without_pipelines() {
        let err = ConfigFile::try_from(raw("[config]\nuse_hash = true\n")).unwrap_err();
        assert!(err.to_string().contains("[scripts] or [styles]"), "{err}");
    }

    #[test]
    fn rejects_shared_output() {
        let err = ConfigFile::try_from(raw(
            "[scripts]\npath = \"a\"\nfile = \"m.js\"\noutput = \"out\"\n\
             [styles]\npath = \"b\"\nfile = \"m.scss\"\noutput = \"out\"\n",
        ))
        .unwrap_err();
        assert!(err.to_string().contains("both write"), "{err}");
    }

    #[test]
    fn rejects_invalid_exclude_glob() {
        let err = ConfigFile::try_from(raw(
            "[styles]\npath = \"b\"\nfile = \"m.scss\"\noutput = \"o.css\"\nexclude = [\"a/[\"]\n",
        ))
        .unwrap_err();
        assert!(err.to_string().contains("invalid glob"), "{err}");
    }

    #[test]
    fn rejects_output_over_entry() {
        let err = ConfigFile::try_from(raw(
            "[styles]\npath = \"b\"\nfile = \"m.scss\"\noutput = \"b/m.scss\"\n",
        ))
        .unwrap_err();
        assert!(err.to_string().contains("overwrite the entry"), "{err}");
    }

    #[test]
    fn rejects_unknown_script_target() {
        let err = ConfigFile::try_from(raw(
            "[scripts]\npath = \"a\"\nfile = \"m.js\"\noutput = \"o.js\"\n\
             [scripts.compiler]\ntarget = \"netscape4\"\n",
        ))
        .unwrap_err();
        assert!(err.to_string().contains("not a valid target"), "{err}");
    }

    #[test]
    fn accepts_script_target_and_extensions() {
        let cfg = ConfigFile::try_from(raw(
            "[scripts]\npath = \"a\"\nfile = \"index.es6\"\noutput = \"o.js\"\n\
             [scripts.compiler]\ntarget = \"es2017\"\nextensions = [\".es6\"]\n",
        ))
        .unwrap();
        let scripts = cfg.scripts.unwrap();
        assert_eq!(scripts.compiler.target.as_deref(), Some("es2017"));
        assert_eq!(scripts.compiler.extensions, vec![".es6".to_string()]);
        assert!(scripts.compiler.extra.is_empty());
    }
}
