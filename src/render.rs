//! Rendering of the service unit and init script.
//!
//! Templates are embedded at build time and use `{{token}}` placeholders, so
//! rendering is a plain substitution with no escaping of relation values.
use crate::agent::AgentConfig;
use crate::templates;
use crate::util::write_atomic;
use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Substitution values available to templates.
pub type RenderContext = BTreeMap<&'static str, String>;

/// Build the context shared by every rendered artifact.
pub fn render_context(config: &AgentConfig, options: &str) -> RenderContext {
    let mut context = RenderContext::new();
    context.insert("options", options.to_string());
    context.insert("port", config.port.to_string());
    context
}

/// Substitute every `{{token}}` the template names in a single pass.
///
/// Only the template is scanned for tokens; substituted values are emitted
/// verbatim, so relation-supplied text containing braces passes through
/// untouched. A token missing from the context is an error: it means a
/// template and the context have drifted apart.
pub fn render_template(template: &str, context: &RenderContext) -> Result<String> {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        rendered.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let end = after_open
            .find("}}")
            .ok_or_else(|| anyhow!("unterminated template token {}", &rest[start..]))?;
        let token = &after_open[..end];
        let value = context
            .get(token)
            .ok_or_else(|| anyhow!("unresolved template token {{{{{token}}}}}"))?;
        rendered.push_str(value);
        rest = &after_open[end + 2..];
    }
    rendered.push_str(rest);
    Ok(rendered)
}

/// Render the unit file to every unit path and the init script to its path.
///
/// Returns the written paths, in write order.
pub fn render_service_files(config: &AgentConfig, options: &str) -> Result<Vec<PathBuf>> {
    let context = render_context(config, options);
    let unit = render_template(templates::CHRONOGRAF_SERVICE, &context)?;
    let init = render_template(templates::INIT_SH, &context)?;

    let mut written = Vec::new();
    for unit_path in &config.unit_paths {
        let dest = config.rooted(unit_path);
        write_atomic(&dest, unit.as_bytes())?;
        written.push(dest);
    }
    let dest = config.rooted(&config.init_script_path);
    write_atomic(&dest, init.as_bytes())?;
    make_executable(&dest)?;
    written.push(dest);

    tracing::debug!(files = written.len(), "rendered service files");
    Ok(written)
}

#[cfg(unix)]
fn make_executable(path: &std::path::Path) -> Result<()> {
    use anyhow::Context;
    use std::os::unix::fs::PermissionsExt;
    let mut permissions = std::fs::metadata(path)
        .with_context(|| format!("inspect {}", path.display()))?
        .permissions();
    permissions.set_mode(0o755);
    std::fs::set_permissions(path, permissions)
        .with_context(|| format!("chmod {}", path.display()))
}

#[cfg(not(unix))]
fn make_executable(_path: &std::path::Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::default_config;

    #[test]
    fn substitutes_known_tokens() {
        let mut context = RenderContext::new();
        context.insert("options", "--influxdb-url http://h:1".to_string());
        let rendered = render_template("run {{options}} now", &context).expect("render");
        assert_eq!(rendered, "run --influxdb-url http://h:1 now");
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let mut context = RenderContext::new();
        context.insert("options", "--influxdb-password a{{b}}c{{port}}d{{".to_string());
        context.insert("port", "8888".to_string());
        let rendered =
            render_template("run {{options}} on {{port}}", &context).expect("render");
        assert_eq!(rendered, "run --influxdb-password a{{b}}c{{port}}d{{ on 8888");
    }

    #[test]
    fn braces_in_passwords_reach_rendered_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = default_config();
        config.root = dir.path().to_path_buf();

        let options = "--influxdb-password ab{{cd --kapacitor-password x{{port}}y}}";
        let written = render_service_files(&config, options).expect("render files");
        for path in &written {
            let text = std::fs::read_to_string(path).expect("read rendered");
            assert!(text.contains(options), "{text}");
        }
    }

    #[test]
    fn unterminated_tokens_are_rejected() {
        assert!(render_template("run {{options", &RenderContext::new()).is_err());
    }

    #[test]
    fn unknown_tokens_are_rejected() {
        let err = render_template("run {{missing}}", &RenderContext::new())
            .expect_err("unresolved token");
        assert!(err.to_string().contains("{{missing}}"), "{err}");
    }

    #[test]
    fn writes_units_and_init_script_under_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = default_config();
        config.root = dir.path().to_path_buf();

        let written = render_service_files(&config, "--influxdb-url http://10.0.0.5:8086")
            .expect("render files");
        assert_eq!(written.len(), 3);
        for path in &written {
            assert!(path.starts_with(dir.path()), "{}", path.display());
            let text = std::fs::read_to_string(path).expect("read rendered");
            assert!(text.contains("--influxdb-url http://10.0.0.5:8086"), "{text}");
            assert!(text.contains("--port 8888"), "{text}");
        }
        assert!(dir
            .path()
            .join("lib/systemd/system/chronograf.service")
            .is_file());
        assert!(dir
            .path()
            .join("usr/lib/chronograf/scripts/init.sh")
            .is_file());
    }
}
