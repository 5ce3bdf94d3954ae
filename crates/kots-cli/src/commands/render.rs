//! Render command - upstream manifests to base, midstream and overlays

use console::style;
use kots_core::{ManifestFile, RegistryOptions};
use kots_render::{RenderOptions, RenderSummary};
use kots_template::Engine;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use crate::RegistryArgs;
use crate::error::{CliError, Result};

pub fn run(
    source: &Path,
    render_dir: &Path,
    overwrite: bool,
    exclude_kots_kinds: bool,
    registry_args: &RegistryArgs,
    namespace: Option<&str>,
) -> Result<()> {
    if !source.is_dir() {
        return Err(CliError::input(format!(
            "source {} is not a directory",
            source.display()
        )));
    }

    let registry = registry_options(registry_args)?;
    let engine = Engine::builder().strict(true).build();
    let files = load_files(source, &engine)?;
    tracing::debug!(count = files.len(), source = %source.display(), "loaded upstream files");

    let file_count = files.len();
    let options = RenderOptions {
        render_dir: render_dir.to_path_buf(),
        overwrite,
        exclude_kots_kinds,
        registry,
        namespace: namespace.map(str::to_string),
    };
    let summary = kots_render::render(files, &options)?;

    print_summary(file_count, &summary);
    Ok(())
}

/// Flags first, then the config file
fn registry_options(args: &RegistryArgs) -> Result<RegistryOptions> {
    let flags = RegistryOptions {
        endpoint: args.registry_endpoint.clone().unwrap_or_default(),
        namespace: args.registry_namespace.clone().unwrap_or_default(),
        username: args.registry_username.clone().unwrap_or_default(),
        password: args.registry_password.clone().unwrap_or_default(),
    };

    let Some(path) = &args.registry_config else {
        return Ok(flags);
    };

    let from_file = RegistryOptions::from_file(path).map_err(|e| {
        CliError::input_with_help(
            e.to_string(),
            "the registry config is YAML with endpoint, namespace, username and password keys",
        )
    })?;
    Ok(flags.or(from_file))
}

/// Read every regular file under `source`, evaluating templates in YAML files
fn load_files(source: &Path, engine: &Engine) -> Result<Vec<ManifestFile>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = entry.map_err(|e| CliError::Io {
            message: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let rel_path = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| CliError::Other {
                message: e.to_string(),
            })?
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");

        let content = fs::read(entry.path())?;
        let file = ManifestFile::new(rel_path, content);

        let content = if file.is_yaml() {
            engine.render_manifest(&file.path, &file.content)?
        } else {
            file.content
        };

        files.push(ManifestFile::new(file.path, content));
    }

    Ok(files)
}

fn print_summary(file_count: usize, summary: &RenderSummary) {
    println!(
        "{} {} file(s)",
        style("Rendered").green().bold(),
        file_count
    );
    println!(
        "  {} {} ({} resources)",
        style("wrote").green(),
        summary.base_dir.display(),
        summary.base.resources.len()
    );
    println!(
        "  {} {} ({} resources, {} patches, {} images)",
        style("wrote").green(),
        summary.midstream_dir.display(),
        summary.midstream.resources.len(),
        summary.midstream.patches_strategic_merge.len(),
        summary.midstream.images.len()
    );
    println!(
        "  {} {}",
        style("overlays").dim(),
        summary.overlays_dir.display()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_flags_take_precedence_over_config() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("registry.yaml");
        fs::write(
            &config,
            "endpoint: file.example.com\nnamespace: file-ns\nusername: file-user\n",
        )
        .unwrap();

        let args = RegistryArgs {
            registry_endpoint: Some("flag.example.com".to_string()),
            registry_config: Some(config),
            ..Default::default()
        };

        let options = registry_options(&args).unwrap();
        assert_eq!(options.endpoint, "flag.example.com");
        assert_eq!(options.namespace, "file-ns");
        assert_eq!(options.username, "file-user");
        assert!(options.password.is_empty());
    }

    #[test]
    fn test_missing_registry_config_is_input_error() {
        let args = RegistryArgs {
            registry_config: Some("/nonexistent/registry.yaml".into()),
            ..Default::default()
        };
        assert!(matches!(
            registry_options(&args),
            Err(CliError::Input { .. })
        ));
    }

    #[test]
    fn test_load_files_templates_yaml_only() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("nested")).unwrap();
        fs::write(
            dir.path().join("nested/cm.yaml"),
            "name: repl{{ ToLower(\"WEB\") }}\n",
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "repl{{ untouched }}").unwrap();

        let files = load_files(dir.path(), &Engine::default()).unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path, "nested/cm.yaml");
        assert_eq!(files[0].content, b"name: web\n");
        assert_eq!(files[1].path, "notes.txt");
        assert_eq!(files[1].content, b"repl{{ untouched }}");
    }

    #[test]
    fn test_load_files_keeps_prometheus_rules_intact() {
        let dir = TempDir::new().unwrap();
        let rule = r#"apiVersion: monitoring.coreos.com/v1
kind: PrometheusRule
metadata:
  name: alerts
spec:
  groups:
    - name: nodes
      rules:
        - alert: InstanceDown
          expr: up == 0
          annotations:
            summary: "{{ $labels.instance }} down"
"#;
        fs::write(dir.path().join("alerts.yaml"), rule).unwrap();

        let files = load_files(dir.path(), &Engine::default()).unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].content, rule.as_bytes());
    }
}
