//! String template rendering utilities.

use std::collections::HashMap;

pub struct TemplateVars;

impl TemplateVars {
    pub const INSTALL_DIR: &'static str = "installDir";
    pub const ARCHIVE_DIR: &'static str = "archiveDir";
    pub const ARCHIVE: &'static str = "archive";
    pub const MODULE_NAME: &'static str = "moduleName";
    pub const VERSION: &'static str = "version";
    pub const REMOTE_ROOT: &'static str = "remoteRoot";
}

/// Replace every known `{{name}}` in one left-to-right pass. Substituted
/// values are not scanned again; unknown placeholders are left as they are.
pub fn render_map(template: &str, variables: &HashMap<String, String>) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            rest = &rest[start..];
            break;
        };

        match variables.get(&after[..end]) {
            Some(value) => result.push_str(value),
            None => result.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }

    result.push_str(rest);
    result
}

/// Names of `{{placeholders}}` still present after rendering.
pub fn unresolved(rendered: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = rendered;

    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            break;
        };
        names.push(after[..end].to_string());
        rest = &after[end + 2..];
    }

    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_replaces_all_occurrences() {
        let mut vars = HashMap::new();
        vars.insert("remoteRoot".to_string(), "/home/val/valkyrie".to_string());

        assert_eq!(
            render_map("{{remoteRoot}}/lib:{{remoteRoot}}/bin", &vars),
            "/home/val/valkyrie/lib:/home/val/valkyrie/bin"
        );
    }

    #[test]
    fn substituted_values_are_not_rendered_again() {
        let mut vars = HashMap::new();
        vars.insert("remoteRoot".to_string(), "/opt/{{version}}".to_string());
        vars.insert("version".to_string(), "0.1.0".to_string());

        assert_eq!(
            render_map("{{remoteRoot}}/lib-{{version}}", &vars),
            "/opt/{{version}}/lib-0.1.0"
        );
    }

    #[test]
    fn unknown_and_unterminated_placeholders_are_kept() {
        let mut vars = HashMap::new();
        vars.insert("version".to_string(), "0.1.0".to_string());

        assert_eq!(render_map("{{nope}}-{{version}}", &vars), "{{nope}}-0.1.0");
        assert_eq!(render_map("v{{version}} {{open", &vars), "v0.1.0 {{open");
    }

    #[test]
    fn unresolved_lists_leftover_placeholders() {
        assert_eq!(unresolved("{{a}}/x/{{b}}"), vec!["a", "b"]);
        assert!(unresolved("/plain/path").is_empty());
    }
}
