//! Template engine based on MiniJinja

use minijinja::syntax::SyntaxConfig;
use minijinja::{Environment, Error, ErrorKind};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::{Arc, Mutex};

use crate::error::{EngineError, Result, TemplateError};
use crate::functions;

/// Expression markers. Plain `{{ }}` is left alone so that manifests
/// carrying Prometheus or Helm-style braces pass through untouched.
pub const VARIABLE_START: &str = "repl{{";
pub const BLOCK_START: &str = "repl{%";
pub const COMMENT_START: &str = "repl{#";

/// Every function registered in the environment
pub const FUNCTION_NAMES: &[&str] = &[
    "Now",
    "NowFmt",
    "ToLower",
    "ToUpper",
    "TrimSpace",
    "Trim",
    "UrlEncode",
    "Base64Encode",
    "Base64Decode",
    "Split",
    "RandomString",
    "Add",
    "Sub",
    "Mult",
    "Div",
    "ParseBool",
    "ParseFloat",
    "ParseInt",
    "ParseUint",
    "HumanSize",
];

/// Template engine builder
pub struct EngineBuilder {
    strict_mode: bool,
    rng_seed: Option<u64>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            strict_mode: true,
            rng_seed: None,
        }
    }

    /// Set strict mode (fail on undefined variables)
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict_mode = strict;
        self
    }

    /// Seed the random source used by `RandomString`
    ///
    /// Without a seed the engine draws from OS entropy.
    pub fn rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    pub fn build(self) -> Engine {
        let rng = match self.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Engine {
            strict_mode: self.strict_mode,
            rng: Arc::new(Mutex::new(rng)),
        }
    }
}

/// The template engine
pub struct Engine {
    strict_mode: bool,
    rng: Arc<Mutex<StdRng>>,
}

impl Default for Engine {
    fn default() -> Self {
        EngineBuilder::new().build()
    }
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Create a configured MiniJinja environment
    fn create_environment(&self) -> std::result::Result<Environment<'static>, Error> {
        let mut env = Environment::new();
        env.set_syntax(
            SyntaxConfig::builder()
                .variable_delimiters(VARIABLE_START, "}}")
                .block_delimiters(BLOCK_START, "%}")
                .comment_delimiters(COMMENT_START, "#}")
                .build()?,
        );

        if self.strict_mode {
            env.set_undefined_behavior(minijinja::UndefinedBehavior::Strict);
        } else {
            env.set_undefined_behavior(minijinja::UndefinedBehavior::Lenient);
        }
        env.set_keep_trailing_newline(true);
        // Manifests are YAML; never escape output, whatever the file extension
        env.set_auto_escape_callback(|_| minijinja::AutoEscape::None);

        env.add_function("Now", functions::now);
        env.add_function("NowFmt", functions::now_fmt);
        env.add_function("ToLower", functions::to_lower);
        env.add_function("ToUpper", functions::to_upper);
        env.add_function("TrimSpace", functions::trim_space);
        env.add_function("Trim", functions::trim);
        env.add_function("UrlEncode", functions::url_encode);
        env.add_function("Base64Encode", functions::base64_encode);
        env.add_function("Base64Decode", functions::base64_decode);
        env.add_function("Split", functions::split);
        env.add_function("Add", functions::add);
        env.add_function("Sub", functions::sub);
        env.add_function("Mult", functions::mult);
        env.add_function("Div", functions::div);
        env.add_function("ParseBool", functions::parse_bool);
        env.add_function("ParseFloat", functions::parse_float);
        env.add_function("ParseInt", functions::parse_int);
        env.add_function("ParseUint", functions::parse_uint);
        env.add_function("HumanSize", functions::human_size);

        let rng = Arc::clone(&self.rng);
        env.add_function(
            "RandomString",
            move |length: usize, charset: Option<String>| -> std::result::Result<String, Error> {
                let charset = functions::expand_charset(
                    charset.as_deref().unwrap_or(functions::DEFAULT_RANDOM_CHARSET),
                );
                let mut rng = rng.lock().map_err(|_| {
                    Error::new(ErrorKind::InvalidOperation, "random source lock poisoned")
                })?;
                Ok(functions::random_string(&mut *rng, length, &charset))
            },
        );

        Ok(env)
    }

    /// Render a single template string
    pub fn render_string(&self, template: &str, template_name: &str) -> Result<String> {
        let mut env = self.create_environment().map_err(|e| {
            EngineError::Template(TemplateError::from_minijinja(e, template_name, template))
        })?;

        env.add_template_owned(template_name.to_string(), template.to_string())
            .map_err(|e| {
                EngineError::Template(TemplateError::from_minijinja(e, template_name, template))
            })?;

        let tmpl = env.get_template(template_name).map_err(|e| {
            EngineError::Template(TemplateError::from_minijinja(e, template_name, template))
        })?;

        tmpl.render(minijinja::context! {}).map_err(|e| {
            EngineError::Template(TemplateError::from_minijinja(e, template_name, template))
        })
    }

    /// Evaluate a manifest file
    ///
    /// Binary files and files without `repl{{`/`repl{%` markers come back
    /// unchanged, whatever other braces they contain.
    pub fn render_manifest(&self, path: &str, content: &[u8]) -> Result<Vec<u8>> {
        let Ok(source) = std::str::from_utf8(content) else {
            return Ok(content.to_vec());
        };
        if !has_template_markers(source) {
            return Ok(content.to_vec());
        }

        tracing::debug!(path, "evaluating template functions");
        Ok(self.render_string(source, path)?.into_bytes())
    }
}

fn has_template_markers(source: &str) -> bool {
    [VARIABLE_START, BLOCK_START, COMMENT_START]
        .iter()
        .any(|marker| source.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_functions() {
        let engine = Engine::default();
        let out = engine
            .render_string(
                r#"name: repl{{ ToLower("MyApp") }}
size: repl{{ HumanSize(2000000) }}
sum: repl{{ Add(1, 2) }}
enc: repl{{ Base64Encode("user:pass") }}
"#,
                "test.yaml",
            )
            .unwrap();

        assert_eq!(
            out,
            "name: myapp\nsize: 2MB\nsum: 3\nenc: dXNlcjpwYXNz\n"
        );
    }

    #[test]
    fn test_random_string_is_seeded() {
        let template = r#"repl{{ RandomString(16) }}"#;
        let a = Engine::builder().rng_seed(9).build().render_string(template, "a").unwrap();
        let b = Engine::builder().rng_seed(9).build().render_string(template, "b").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.chars().count(), 16);

        let digits = Engine::builder()
            .rng_seed(9)
            .build()
            .render_string(r#"repl{{ RandomString(8, "[0-9]") }}"#, "c")
            .unwrap();
        assert!(digits.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_decode_failure_renders_empty() {
        let out = Engine::default()
            .render_string(r#"v: "repl{{ Base64Decode("%%%") }}""#, "x")
            .unwrap();
        assert_eq!(out, r#"v: """#);
    }

    #[test]
    fn test_unknown_function_is_error() {
        let err = Engine::default()
            .render_string("repl{{ KubeSeal(1) }}", "sealed.yaml")
            .unwrap_err();
        match err {
            EngineError::Template(te) => {
                assert!(te.message.starts_with("sealed.yaml"));
                assert!(te.suggestion.is_some());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_division_by_zero_is_error() {
        assert!(Engine::default().render_string("repl{{ Div(1, 0) }}", "x").is_err());
    }

    #[test]
    fn test_render_manifest_passthrough() {
        let engine = Engine::default();
        let plain = b"apiVersion: v1\nkind: ConfigMap\n";
        assert_eq!(engine.render_manifest("cm.yaml", plain).unwrap(), plain.to_vec());

        let binary = [0xff, 0xfe, 0x00];
        assert_eq!(engine.render_manifest("icon.png", &binary).unwrap(), binary.to_vec());

        let templated = b"image: repl{{ ToLower(\"NGINX\") }}\n";
        assert_eq!(
            engine.render_manifest("d.yaml", templated).unwrap(),
            b"image: nginx\n".to_vec()
        );
    }

    #[test]
    fn test_plain_braces_pass_through() {
        let engine = Engine::default();
        let rule = br#"apiVersion: monitoring.coreos.com/v1
kind: PrometheusRule
metadata:
  name: alerts
spec:
  groups:
    - name: nodes
      rules:
        - alert: InstanceDown
          annotations:
            summary: "{{ $labels.instance }} down"
            runbook: "{% raw %}"
"#;
        assert_eq!(engine.render_manifest("alerts.yaml", rule).unwrap(), rule.to_vec());
    }

    #[test]
    fn test_plain_braces_kept_next_to_expressions() {
        let out = Engine::default()
            .render_string(
                "summary: \"{{ $labels.instance }} on repl{{ ToUpper(\"prod\") }}\"\n",
                "mixed.yaml",
            )
            .unwrap();
        assert_eq!(out, "summary: \"{{ $labels.instance }} on PROD\"\n");
    }
}
